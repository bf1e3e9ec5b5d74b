//! Speech-to-text adapters.
//!
//! The engine itself is external. `WhisperCli` drives a whisper.cpp style
//! command-line binary and reads back its JSON report.

use async_trait::async_trait;
use autocut_core::types::TranscriptSegment;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{RenderError, Result};
use crate::tools::stderr_tail;

/// Turns an audio file into timed text. Dropping a pending call stops the
/// engine.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<Vec<TranscriptSegment>>;
}

/// Produces no segments, so subtitles fall back to placeholder lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTranscriber;

#[async_trait]
impl Transcriber for NoTranscriber {
    async fn transcribe(&self, _audio: &Path) -> Result<Vec<TranscriptSegment>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone)]
pub struct WhisperCli {
    pub binary: PathBuf,
    pub model: PathBuf,
    pub language: Option<String>,
}

impl WhisperCli {
    pub fn new(binary: impl Into<PathBuf>, model: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            model: model.into(),
            language: None,
        }
    }

    fn args(&self, audio: &Path, out_prefix: &Path) -> Vec<String> {
        let mut args = vec![
            "-m".to_string(),
            self.model.to_string_lossy().to_string(),
            "-f".to_string(),
            audio.to_string_lossy().to_string(),
            "-oj".to_string(),
            "-of".to_string(),
            out_prefix.to_string_lossy().to_string(),
            "-np".to_string(),
        ];
        if let Some(lang) = &self.language {
            args.push("-l".to_string());
            args.push(lang.clone());
        }
        args
    }
}

#[async_trait]
impl Transcriber for WhisperCli {
    async fn transcribe(&self, audio: &Path) -> Result<Vec<TranscriptSegment>> {
        if !audio.exists() {
            return Err(RenderError::FileNotFound(audio.to_path_buf()));
        }
        let out_prefix = audio.with_extension("transcript");

        let output = Command::new(&self.binary)
            .args(self.args(audio, &out_prefix))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| RenderError::TranscriberExec(e.to_string()))?;

        if !output.status.success() {
            return Err(RenderError::TranscriberFailed(stderr_tail(&output.stderr, 5)));
        }

        let report_path = out_prefix.with_extension("transcript.json");
        let report = tokio::fs::read(&report_path).await?;
        let _ = tokio::fs::remove_file(&report_path).await;
        parse_whisper_json(&report)
    }
}

// ---------------------------------------------------------------------------
// whisper.cpp JSON report
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WhisperReport {
    #[serde(default)]
    transcription: Vec<WhisperEntry>,
}

#[derive(Debug, Deserialize)]
struct WhisperEntry {
    offsets: WhisperOffsets,
    text: String,
}

/// Milliseconds from the start of the audio.
#[derive(Debug, Deserialize)]
struct WhisperOffsets {
    from: u64,
    to: u64,
}

/// Parse a whisper.cpp `-oj` report into ordered segments, dropping blank
/// entries.
pub fn parse_whisper_json(data: &[u8]) -> Result<Vec<TranscriptSegment>> {
    let report: WhisperReport = serde_json::from_slice(data)?;
    let mut segments: Vec<TranscriptSegment> = report
        .transcription
        .into_iter()
        .filter(|e| !e.text.trim().is_empty())
        .map(|e| {
            TranscriptSegment::new(
                e.offsets.from as f64 / 1000.0,
                e.offsets.to as f64 / 1000.0,
                e.text.trim(),
            )
        })
        .collect();
    segments.sort_by(|a, b| a.start.total_cmp(&b.start));
    Ok(segments)
}
