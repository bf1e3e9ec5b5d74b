//! Style clone: reference-video analysis and the library of cloned styles.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use autocut_core::catalog::{
    resolve_color, resolve_subtitle_style, Position, DEFAULT_COLOR, DEFAULT_SUBTITLE_STYLE,
};
use autocut_core::filters::ColorAdjust;
use autocut_core::subtitles::SubtitleLook;
use autocut_core::types::VideoInfo;
use autocut_render::error::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

pub const CLONED_FONT: &str = "Impact";
pub const CLONED_FONT_SIZE: u32 = 58;
pub const CLONED_OUTLINE: u32 = 5;
/// Cuts per second above which a reference is assumed to zoom.
const ZOOM_CUT_THRESHOLD: f64 = 0.3;

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Raw measurements taken from a reference video.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleMetrics {
    pub color_tone: String,
    pub colors: ColorAdjust,
    /// Scene cuts per second.
    pub cut_frequency: f64,
    pub has_burned_subtitles: bool,
}

/// Extracts editing-style measurements from a video.
#[async_trait]
pub trait StyleAnalyzer: Send + Sync {
    async fn analyze(&self, video: &Path, info: &VideoInfo) -> Result<StyleMetrics>;
}

/// Stub analyzer: neutral colors, 0.2 cuts per second, burned-in subtitles
/// assumed. Real frame analysis is not implemented.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderAnalyzer;

#[async_trait]
impl StyleAnalyzer for PlaceholderAnalyzer {
    async fn analyze(&self, _video: &Path, _info: &VideoInfo) -> Result<StyleMetrics> {
        Ok(StyleMetrics {
            color_tone: "neutral".to_string(),
            colors: ColorAdjust::NEUTRAL,
            cut_frequency: 0.2,
            has_burned_subtitles: true,
        })
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleProfile {
    pub style_id: String,
    pub name: String,
    pub subtitle_position: Position,
    pub subtitle_size: u32,
    pub subtitle_color: String,
    pub subtitle_font: String,
    pub cut_frequency: f64,
    pub has_zoom: bool,
    pub zoom_intensity: f64,
    pub color_tone: String,
    #[serde(flatten)]
    pub colors: ColorAdjust,
    pub original_duration: f64,
    pub original_resolution: String,
}

impl StyleProfile {
    pub fn from_metrics(
        style_id: &str,
        name: &str,
        info: &VideoInfo,
        metrics: StyleMetrics,
    ) -> Self {
        let subtitle_position = if metrics.has_burned_subtitles {
            Position::Center
        } else {
            Position::Bottom
        };
        Self {
            style_id: style_id.to_string(),
            name: name.to_string(),
            subtitle_position,
            subtitle_size: CLONED_FONT_SIZE,
            subtitle_color: DEFAULT_COLOR.to_string(),
            subtitle_font: CLONED_FONT.to_string(),
            cut_frequency: metrics.cut_frequency,
            has_zoom: metrics.cut_frequency > ZOOM_CUT_THRESHOLD,
            zoom_intensity: (metrics.cut_frequency * 2.0).min(1.0),
            color_tone: metrics.color_tone,
            colors: metrics.colors,
            original_duration: info.duration,
            original_resolution: format!("{}x{}", info.width, info.height),
        }
    }

    /// Subtitle look of a render that uses this profile: the profile's font,
    /// size and position with a heavy outline, white text and the pop-in
    /// animation.
    pub fn subtitle_look(&self) -> SubtitleLook {
        SubtitleLook {
            font: self.subtitle_font.clone(),
            size: self.subtitle_size,
            outline: CLONED_OUTLINE,
            animation: resolve_subtitle_style(DEFAULT_SUBTITLE_STYLE)
                .into_inner()
                .animation
                .to_string(),
            position: self.subtitle_position,
            color: resolve_color(DEFAULT_COLOR).into_inner().value.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Library
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StyleEntry {
    Analyzing { name: String },
    Ready { style: StyleProfile },
    Failed { name: String, error: String },
}

impl StyleEntry {
    pub fn is_finished(&self) -> bool {
        !matches!(self, StyleEntry::Analyzing { .. })
    }
}

const FINISHED_CAPACITY: usize = 64;

/// Cloned styles keyed by style id. Kept in memory for the process lifetime.
///
/// Every finished analysis is published on a broadcast channel.
pub struct StyleLibrary {
    entries: RwLock<HashMap<String, StyleEntry>>,
    finished: broadcast::Sender<(String, StyleEntry)>,
}

impl Default for StyleLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleLibrary {
    pub fn new() -> Self {
        let (finished, _) = broadcast::channel(FINISHED_CAPACITY);
        Self {
            entries: RwLock::new(HashMap::new()),
            finished,
        }
    }

    /// Register an analysis in progress. Returns `false` if the id is taken.
    pub async fn begin(&self, style_id: &str, name: &str) -> bool {
        let mut entries = self.entries.write().await;
        if entries.contains_key(style_id) {
            return false;
        }
        entries.insert(
            style_id.to_string(),
            StyleEntry::Analyzing {
                name: name.to_string(),
            },
        );
        true
    }

    pub async fn finish(&self, style_id: &str, entry: StyleEntry) {
        let mut entries = self.entries.write().await;
        entries.insert(style_id.to_string(), entry.clone());
        let _ = self.finished.send((style_id.to_string(), entry));
    }

    pub async fn get(&self, style_id: &str) -> Option<StyleEntry> {
        self.entries.read().await.get(style_id).cloned()
    }

    /// The profile of a successfully analyzed style.
    pub async fn ready(&self, style_id: &str) -> Option<StyleProfile> {
        match self.get(style_id).await? {
            StyleEntry::Ready { style } => Some(style),
            _ => None,
        }
    }

    /// Wait until the analysis of `style_id` has finished. Returns `None` for
    /// an unknown style.
    pub async fn wait_finished(&self, style_id: &str) -> Option<StyleEntry> {
        let mut rx = self.finished.subscribe();
        loop {
            let entry = self.get(style_id).await?;
            if entry.is_finished() {
                return Some(entry);
            }
            loop {
                match rx.recv().await {
                    Ok((id, entry)) if id == style_id => return Some(entry),
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => break,
                    Err(broadcast::error::RecvError::Closed) => return self.get(style_id).await,
                }
            }
        }
    }

    /// Every style whose analysis has finished, successfully or not.
    pub async fn finished(&self) -> BTreeMap<String, StyleEntry> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|(_, e)| e.is_finished())
            .map(|(id, e)| (id.clone(), e.clone()))
            .collect()
    }
}
