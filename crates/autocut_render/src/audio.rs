use std::path::Path;

use crate::error::Result;
use crate::tools::MediaTools;

/// Sample rate expected by the speech-to-text engine.
pub const SPEECH_SAMPLE_RATE: u32 = 16_000;

/// ffmpeg arguments that pull a mono 16 kHz PCM WAV out of `video`.
pub fn extraction_args(video: &Path, audio: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        video.to_string_lossy().to_string(),
        "-vn".to_string(),
        "-acodec".to_string(),
        "pcm_s16le".to_string(),
        "-ar".to_string(),
        SPEECH_SAMPLE_RATE.to_string(),
        "-ac".to_string(),
        "1".to_string(),
        audio.to_string_lossy().to_string(),
    ]
}

/// Extract the speech track of `video` into `audio`.
pub async fn extract_audio(tools: &dyn MediaTools, video: &Path, audio: &Path) -> Result<()> {
    if let Some(parent) = audio.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tools.ffmpeg(&extraction_args(video, audio)).await
}
