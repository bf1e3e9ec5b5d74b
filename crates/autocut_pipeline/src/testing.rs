//! In-process stand-ins for ffmpeg, ffprobe and the transcriber.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use autocut_core::types::TranscriptSegment;
use autocut_render::error::{RenderError, Result};
use autocut_render::tools::MediaTools;
use autocut_render::transcribe::Transcriber;

pub const PORTRAIT_PROBE: &str = r#"{
    "streams": [{"codec_type": "video", "width": 1080, "height": 1920, "r_frame_rate": "30/1"}],
    "format": {"duration": "9.0"}
}"#;

pub const LANDSCAPE_PROBE: &str = r#"{
    "streams": [{"codec_type": "video", "width": 1920, "height": 1080, "r_frame_rate": "25/1"}],
    "format": {"duration": "9.0"}
}"#;

/// Records every ffmpeg invocation. Audio extraction writes an empty WAV and
/// renders write a small output file, so downstream file checks behave.
pub struct FakeTools {
    /// `None` makes ffprobe fail.
    pub probe_json: Option<&'static str>,
    pub probe_delay: Option<Duration>,
    pub fail_audio: bool,
    /// Renders write a partial file, wait this long, then finish the output.
    pub render_delay: Option<Duration>,
    /// Number of render calls that fail before renders start succeeding.
    pub render_failures: AtomicUsize,
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl Default for FakeTools {
    fn default() -> Self {
        Self {
            probe_json: Some(PORTRAIT_PROBE),
            probe_delay: None,
            fail_audio: false,
            render_delay: None,
            render_failures: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeTools {
    pub fn failing_renders(count: usize) -> Self {
        Self {
            render_failures: AtomicUsize::new(count),
            ..Self::default()
        }
    }

    pub fn audio_calls(&self) -> Vec<Vec<String>> {
        self.calls_where(|args| is_audio(args))
    }

    pub fn render_calls(&self) -> Vec<Vec<String>> {
        self.calls_where(|args| !is_audio(args))
    }

    fn calls_where(&self, f: impl Fn(&[String]) -> bool) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|args| f(args))
            .cloned()
            .collect()
    }
}

fn is_audio(args: &[String]) -> bool {
    args.iter().any(|a| a == "pcm_s16le")
}

#[async_trait]
impl MediaTools for FakeTools {
    async fn ffprobe(&self, _path: &Path) -> Result<Vec<u8>> {
        if let Some(delay) = self.probe_delay {
            tokio::time::sleep(delay).await;
        }
        match self.probe_json {
            Some(json) => Ok(json.as_bytes().to_vec()),
            None => Err(RenderError::FfprobeFailed("Invalid data found".into())),
        }
    }

    async fn ffmpeg(&self, args: &[String]) -> Result<()> {
        self.calls.lock().unwrap().push(args.to_vec());
        let target = args.last().expect("output path");

        if is_audio(args) {
            if self.fail_audio {
                return Err(RenderError::FfmpegFailed("no audio stream".into()));
            }
            std::fs::write(target, b"")?;
            return Ok(());
        }

        let remaining = self.render_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.render_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(RenderError::FfmpegFailed(format!(
                "encoder error ({remaining} left)"
            )));
        }
        if let Some(delay) = self.render_delay {
            std::fs::write(target, b"partial")?;
            tokio::time::sleep(delay).await;
        }
        std::fs::write(target, b"rendered")?;
        Ok(())
    }
}

/// Returns fixed segments, or fails when built with `broken()`.
#[derive(Clone)]
pub struct FakeTranscriber {
    segments: Option<Vec<TranscriptSegment>>,
    calls: Arc<AtomicUsize>,
}

impl FakeTranscriber {
    pub fn silent() -> Self {
        Self::with_segments(Vec::new())
    }

    pub fn with_segments(segments: Vec<TranscriptSegment>) -> Self {
        Self {
            segments: Some(segments),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn broken() -> Self {
        Self {
            segments: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _audio: &Path) -> Result<Vec<TranscriptSegment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.segments
            .clone()
            .ok_or_else(|| RenderError::TranscriberFailed("model not loaded".into()))
    }
}
