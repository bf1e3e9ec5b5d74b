use autocut_core::filters::join_chain;
use std::path::Path;

use crate::error::{RenderError, Result};
use crate::tools::MediaTools;

/// How a finished render was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The full filter chain was applied.
    Styled,
    /// The styled render failed; the output is a plain re-encode without
    /// subtitles or effects.
    Degraded { primary_error: String },
}

impl RenderOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, RenderOutcome::Degraded { .. })
    }
}

/// Styled encode: filter chain, H.264 at CRF 23, AAC 128k, faststart.
pub fn primary_args(input: &Path, output: &Path, stages: &[String]) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-vf".to_string(),
        join_chain(stages),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "fast".to_string(),
        "-crf".to_string(),
        "23".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "128k".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        output.to_string_lossy().to_string(),
    ]
}

/// Plain re-encode used when the styled encode fails.
pub fn fallback_args(input: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "ultrafast".to_string(),
        "-crf".to_string(),
        "28".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "128k".to_string(),
        output.to_string_lossy().to_string(),
    ]
}

/// Render `input` to `output` through `stages`.
///
/// If the styled encode fails the fallback encode is attempted exactly once.
/// Only when both fail is an error returned.
pub async fn render(
    tools: &dyn MediaTools,
    input: &Path,
    output: &Path,
    stages: &[String],
) -> Result<RenderOutcome> {
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let primary = match tools.ffmpeg(&primary_args(input, output, stages)).await {
        Ok(()) => return Ok(RenderOutcome::Styled),
        Err(e) => e.to_string(),
    };

    tracing::warn!("styled render failed, retrying without filters: {}", primary);

    match tools.ffmpeg(&fallback_args(input, output)).await {
        Ok(()) => Ok(RenderOutcome::Degraded {
            primary_error: primary,
        }),
        Err(fallback) => Err(RenderError::FallbackFailed {
            primary,
            fallback: fallback.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Answers ffmpeg calls from a script and records the arguments.
    struct Scripted {
        results: Mutex<VecDeque<Result<()>>>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl Scripted {
        fn new(results: Vec<Result<()>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MediaTools for Scripted {
        async fn ffprobe(&self, _path: &Path) -> Result<Vec<u8>> {
            unreachable!()
        }

        async fn ffmpeg(&self, args: &[String]) -> Result<()> {
            self.calls.lock().unwrap().push(args.to_vec());
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected ffmpeg call")
        }
    }

    fn failed(msg: &str) -> Result<()> {
        Err(RenderError::FfmpegFailed(msg.to_string()))
    }

    fn paths() -> (PathBuf, PathBuf, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (
            PathBuf::from("/up/ab12cd34.mp4"),
            dir.path().join("outputs").join("ab12cd34.mp4"),
            dir,
        )
    }

    #[test]
    fn primary_args_carry_chain_and_encoder_settings() {
        let stages = vec!["ass=/w/subs.ass".to_string(), "curves=vintage".to_string()];
        let args = primary_args(Path::new("/in.mp4"), Path::new("/out.mp4"), &stages);

        assert!(args
            .windows(2)
            .any(|w| w[0] == "-vf" && w[1] == "ass=/w/subs.ass,curves=vintage"));
        assert!(args.windows(2).any(|w| w[0] == "-preset" && w[1] == "fast"));
        assert!(args.windows(2).any(|w| w[0] == "-crf" && w[1] == "23"));
        assert!(args.windows(2).any(|w| w[0] == "-movflags" && w[1] == "+faststart"));
        assert_eq!(args.last().unwrap(), "/out.mp4");
    }

    #[test]
    fn fallback_args_have_no_filters() {
        let args = fallback_args(Path::new("/in.mp4"), Path::new("/out.mp4"));
        assert!(!args.contains(&"-vf".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "-preset" && w[1] == "ultrafast"));
        assert!(args.windows(2).any(|w| w[0] == "-crf" && w[1] == "28"));
    }

    #[tokio::test]
    async fn primary_success_is_styled() {
        let (input, output, _dir) = paths();
        let tools = Scripted::new(vec![Ok(())]);

        let outcome = render(&tools, &input, &output, &["null".to_string()])
            .await
            .unwrap();

        assert_eq!(outcome, RenderOutcome::Styled);
        assert_eq!(tools.calls().len(), 1);
        assert!(output.parent().unwrap().is_dir());
    }

    #[tokio::test]
    async fn primary_failure_runs_fallback_once() {
        let (input, output, _dir) = paths();
        let tools = Scripted::new(vec![failed("No such filter: 'ass'"), Ok(())]);

        let outcome = render(&tools, &input, &output, &["ass=x".to_string()])
            .await
            .unwrap();

        assert!(outcome.is_degraded());
        let calls = tools.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].contains(&"-vf".to_string()));
        assert!(!calls[1].contains(&"-vf".to_string()));
    }

    #[tokio::test]
    async fn both_failures_report_both_errors() {
        let (input, output, _dir) = paths();
        let tools = Scripted::new(vec![failed("bad filter"), failed("disk full")]);

        let err = render(&tools, &input, &output, &[]).await.unwrap_err();

        match err {
            RenderError::FallbackFailed { primary, fallback } => {
                assert!(primary.contains("bad filter"));
                assert!(fallback.contains("disk full"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(tools.calls().len(), 2);
    }
}
