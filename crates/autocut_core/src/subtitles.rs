//! ASS subtitle composition.
//!
//! Turns transcript segments (or placeholder lines when there is no
//! transcript) into a complete ASS document and writes it atomically.

use std::fmt;
use std::io::Write;
use std::path::Path;

use crate::catalog::Position;
use crate::error::Result;
use crate::options::SubtitleSelection;
use crate::types::{TranscriptSegment, VideoInfo};

/// Gap left between consecutive synthesized lines.
pub const LINE_GAP_SECONDS: f64 = 0.1;
/// Upper bound on the length of a synthesized line.
pub const MAX_LINE_SECONDS: f64 = 3.0;
/// Shortest event we will emit; one ASS time unit.
pub const MIN_EVENT_SECONDS: f64 = 0.01;

const STYLE_FORMAT: &str = "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding";
const EVENT_FORMAT: &str = "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";

// ---------------------------------------------------------------------------
// SubtitleLook
// ---------------------------------------------------------------------------

/// Fully resolved visual parameters for the single `Default` style.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleLook {
    pub font: String,
    pub size: u32,
    pub outline: u32,
    pub animation: String,
    pub position: Position,
    /// ASS colour literal.
    pub color: String,
}

impl From<SubtitleSelection> for SubtitleLook {
    fn from(sel: SubtitleSelection) -> Self {
        Self {
            font: sel.style.font.to_string(),
            size: sel.style.size,
            outline: sel.style.outline,
            animation: sel.style.animation.to_string(),
            position: sel.position,
            color: sel.color.value.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DialogueEvent {
    pub start: f64,
    pub end: f64,
    /// Text as written to the file, override block included.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleDocument {
    pub play_res_x: u32,
    pub play_res_y: u32,
    pub look: SubtitleLook,
    pub events: Vec<DialogueEvent>,
}

impl SubtitleDocument {
    /// Write the document to `path`. The content goes to a temporary file in
    /// the same directory first and is renamed into place once synced, so
    /// readers never observe a partial file.
    pub fn write_atomic(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(self.to_string().as_bytes())?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(path)?;
        Ok(())
    }
}

impl fmt::Display for SubtitleDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let look = &self.look;
        writeln!(f, "[Script Info]")?;
        writeln!(f, "Title: AutoCut Subtitles")?;
        writeln!(f, "ScriptType: v4.00+")?;
        writeln!(f, "PlayResX: {}", self.play_res_x)?;
        writeln!(f, "PlayResY: {}", self.play_res_y)?;
        writeln!(f)?;
        writeln!(f, "[V4+ Styles]")?;
        writeln!(f, "{STYLE_FORMAT}")?;
        writeln!(
            f,
            "Style: Default,{},{},{},&H000000FF,&H00000000,&H80000000,1,0,0,0,100,100,2,0,1,{},0,{},20,20,{},1",
            look.font,
            look.size,
            look.color,
            look.outline,
            look.position.alignment(),
            look.position.margin_v(),
        )?;
        writeln!(f)?;
        writeln!(f, "[Events]")?;
        writeln!(f, "{EVENT_FORMAT}")?;
        for ev in &self.events {
            writeln!(
                f,
                "Dialogue: 0,{},{},Default,,0,0,0,,{}",
                format_ass_time(ev.start),
                format_ass_time(ev.end),
                ev.text
            )?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// Lines shown when there is nothing to transcribe.
pub fn placeholder_lines(montage_type: &str) -> Vec<String> {
    vec![
        "AutoCut".to_string(),
        "Automatic montage".to_string(),
        format!("Style: {montage_type}"),
        "Powered by AI".to_string(),
    ]
}

/// Build the subtitle document.
///
/// With a non-empty transcript every segment becomes one event. Otherwise
/// `fallback_lines` are spread evenly over the video duration.
pub fn compose(
    segments: &[TranscriptSegment],
    info: &VideoInfo,
    look: &SubtitleLook,
    fallback_lines: &[String],
) -> SubtitleDocument {
    let spoken: Vec<&TranscriptSegment> = segments
        .iter()
        .filter(|s| !s.text.trim().is_empty())
        .collect();

    let events = if spoken.is_empty() {
        layout_lines(fallback_lines, info.duration)
            .into_iter()
            .map(|(start, end, text)| event(start, end, text, look))
            .collect()
    } else {
        spoken
            .into_iter()
            .map(|s| event(s.start, s.end, &s.text, look))
            .collect()
    };

    SubtitleDocument {
        play_res_x: info.width,
        play_res_y: info.height,
        look: look.clone(),
        events,
    }
}

fn event(start: f64, end: f64, text: &str, look: &SubtitleLook) -> DialogueEvent {
    let start = start.max(0.0);
    let end = if end > start { end } else { start + MIN_EVENT_SECONDS };
    // one event per line: embedded newlines become ASS hard breaks
    let text = text.trim().replace("\r\n", "\n").replace('\n', r"\N");
    DialogueEvent {
        start,
        end,
        text: format!("{}{}", look.animation, text),
    }
}

/// Partition `duration` across `lines`, at most `MAX_LINE_SECONDS` each,
/// leaving `LINE_GAP_SECONDS` before the next line starts.
fn layout_lines(lines: &[String], duration: f64) -> Vec<(f64, f64, &str)> {
    let lines: Vec<&str> = if lines.is_empty() {
        vec!["AutoCut"]
    } else {
        lines.iter().map(String::as_str).collect()
    };

    if duration.is_nan() || duration <= 0.0 {
        return vec![(0.0, MIN_EVENT_SECONDS, lines[0])];
    }

    let per_line = MAX_LINE_SECONDS.min(duration / lines.len() as f64);
    lines
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let start = i as f64 * per_line;
            let end = (i + 1) as f64 * per_line - LINE_GAP_SECONDS;
            (start, end, text)
        })
        .collect()
}

/// Format seconds as `H:MM:SS.CC`.
pub fn format_ass_time(seconds: f64) -> String {
    let total_cs = (seconds.max(0.0) * 100.0).round() as u64;
    let cs = total_cs % 100;
    let total_secs = total_cs / 100;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;
    format!("{hours}:{mins:02}:{secs:02}.{cs:02}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
