use autocut_core::types::{Resolution, VideoInfo};
use serde::Deserialize;
use std::path::Path;

use crate::error::Result;
use crate::tools::MediaTools;

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    #[serde(default)]
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Probe a video file. Fields ffprobe does not report take the fallback
/// values of `VideoInfo::FALLBACK`.
pub async fn probe_video(tools: &dyn MediaTools, path: &Path) -> Result<VideoInfo> {
    let stdout = tools.ffprobe(path).await?;
    let probe: FfprobeOutput = serde_json::from_slice(&stdout)?;
    Ok(parse_probe_output(&probe))
}

/// Probe a video file, substituting `VideoInfo::FALLBACK` if probing fails.
/// Metadata problems never fail a job.
pub async fn probe_or_fallback(tools: &dyn MediaTools, path: &Path) -> Resolution<VideoInfo> {
    match probe_video(tools, path).await {
        Ok(info) => Resolution::Matched(info),
        Err(e) => {
            tracing::warn!("probe of {} failed, using defaults: {}", path.display(), e);
            Resolution::Defaulted(VideoInfo::FALLBACK)
        }
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn parse_probe_output(probe: &FfprobeOutput) -> VideoInfo {
    let fallback = VideoInfo::FALLBACK;
    let video_stream = probe.streams.iter().find(|s| s.codec_type == "video");

    let width = video_stream
        .and_then(|s| s.width)
        .filter(|w| *w > 0)
        .unwrap_or(fallback.width);
    let height = video_stream
        .and_then(|s| s.height)
        .filter(|h| *h > 0)
        .unwrap_or(fallback.height);

    let fps = video_stream
        .and_then(|s| s.r_frame_rate.as_deref())
        .and_then(parse_frame_rate)
        .unwrap_or(fallback.fps);

    let duration = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(fallback.duration);

    VideoInfo {
        width,
        height,
        duration,
        fps,
    }
}

/// Parse ffprobe frame rate string like "30000/1001" or "30/1" into f64.
fn parse_frame_rate(rate: &str) -> Option<f64> {
    if let Some((num, den)) = rate.split_once('/') {
        let n: f64 = num.parse().ok()?;
        let d: f64 = den.parse().ok()?;
        if d == 0.0 {
            return None;
        }
        Some(n / d)
    } else {
        rate.parse().ok()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use async_trait::async_trait;

    struct CannedProbe(std::result::Result<&'static str, &'static str>);

    #[async_trait]
    impl MediaTools for CannedProbe {
        async fn ffprobe(&self, _path: &Path) -> Result<Vec<u8>> {
            match self.0 {
                Ok(json) => Ok(json.as_bytes().to_vec()),
                Err(msg) => Err(RenderError::FfprobeFailed(msg.to_string())),
            }
        }

        async fn ffmpeg(&self, _args: &[String]) -> Result<()> {
            unreachable!("probe never runs ffmpeg")
        }
    }

    #[test]
    fn parse_frame_rate_fraction() {
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_frame_rate_plain_and_zero_denominator() {
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("30/0").is_none());
    }

    #[tokio::test]
    async fn probe_video_reads_stream_and_format() {
        let tools = CannedProbe(Ok(r#"{
            "streams": [
                {"codec_type": "audio", "codec_name": "aac", "channels": 2},
                {"codec_type": "video", "codec_name": "h264", "width": 720, "height": 1280, "r_frame_rate": "25/1"}
            ],
            "format": {"duration": "42.5"}
        }"#));
        let info = probe_video(&tools, Path::new("/any.mp4")).await.unwrap();

        assert_eq!(info.width, 720);
        assert_eq!(info.height, 1280);
        assert!((info.fps - 25.0).abs() < f64::EPSILON);
        assert!((info.duration - 42.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn audio_only_file_gets_fallback_canvas() {
        let tools = CannedProbe(Ok(r#"{
            "streams": [{"codec_type": "audio"}],
            "format": {"duration": "8.0"}
        }"#));
        let info = probe_video(&tools, Path::new("/any.m4a")).await.unwrap();
        assert_eq!((info.width, info.height), (1080, 1920));
        assert!((info.fps - 30.0).abs() < f64::EPSILON);
        assert!((info.duration - 8.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn missing_format_duration_is_zero() {
        let tools = CannedProbe(Ok(r#"{"streams": []}"#));
        let info = probe_video(&tools, Path::new("/any.mp4")).await.unwrap();
        assert_eq!(info.duration, 0.0);
    }

    #[tokio::test]
    async fn probe_failure_falls_back() {
        let tools = CannedProbe(Err("moov atom not found"));
        let r = probe_or_fallback(&tools, Path::new("/broken.mp4")).await;
        assert!(r.is_defaulted());
        assert_eq!(r.into_inner(), VideoInfo::FALLBACK);
    }

    #[tokio::test]
    async fn garbage_json_falls_back() {
        let tools = CannedProbe(Ok("not json at all"));
        let path = Path::new("/x.mp4");
        assert!(probe_video(&tools, path).await.is_err());
        assert!(probe_or_fallback(&tools, path).await.is_defaulted());
    }
}
