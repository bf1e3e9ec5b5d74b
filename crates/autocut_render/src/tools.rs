use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{RenderError, Result};

/// Process boundary to ffprobe and ffmpeg.
///
/// Dropping a pending call kills the process it started, so callers bound a
/// call with `tokio::time::timeout` and nothing outlives the deadline.
#[async_trait]
pub trait MediaTools: Send + Sync {
    /// Run ffprobe on `path` and return its JSON report.
    async fn ffprobe(&self, path: &Path) -> Result<Vec<u8>>;

    /// Run ffmpeg with `args`. A non-zero exit is `RenderError::FfmpegFailed`.
    async fn ffmpeg(&self, args: &[String]) -> Result<()>;
}

/// The ffmpeg/ffprobe binaries found on `PATH` (or at explicit locations).
#[derive(Debug, Clone)]
pub struct SystemTools {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for SystemTools {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl SystemTools {
    /// Binaries that cannot be executed, with what they are needed for.
    pub fn missing(&self) -> Vec<(String, &'static str)> {
        [
            (&self.ffmpeg, "video rendering and audio extraction"),
            (&self.ffprobe, "media file analysis"),
        ]
        .into_iter()
        .filter(|(bin, _)| {
            std::process::Command::new(bin)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .is_err()
        })
        .map(|(bin, purpose)| (bin.to_string_lossy().into_owned(), purpose))
        .collect()
    }
}

#[async_trait]
impl MediaTools for SystemTools {
    async fn ffprobe(&self, path: &Path) -> Result<Vec<u8>> {
        if !path.exists() {
            return Err(RenderError::FileNotFound(path.to_path_buf()));
        }

        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| RenderError::FfprobeExec(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RenderError::FfprobeFailed(stderr.into_owned()));
        }

        Ok(output.stdout)
    }

    async fn ffmpeg(&self, args: &[String]) -> Result<()> {
        tracing::debug!("ffmpeg {}", args.join(" "));

        let output = Command::new(&self.ffmpeg)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RenderError::FfmpegNotFound
                } else {
                    RenderError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(RenderError::FfmpegFailed(format!(
                "exited with {}: {}",
                output.status,
                stderr_tail(&output.stderr, 5)
            )));
        }
        Ok(())
    }
}

/// Last `lines` non-empty lines of a process's stderr, joined with ` | `.
pub fn stderr_tail(stderr: &[u8], lines: usize) -> String {
    let text = String::from_utf8_lossy(stderr);
    let tail: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let start = tail.len().saturating_sub(lines);
    tail[start..].join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn stderr_tail_keeps_last_lines() {
        let err = b"line one\n\nline two\nline three\n  \nline four\n";
        assert_eq!(stderr_tail(err, 2), "line three | line four");
        assert_eq!(
            stderr_tail(err, 10),
            "line one | line two | line three | line four"
        );
        assert_eq!(stderr_tail(b"", 3), "");
    }

    #[tokio::test]
    async fn ffprobe_nonexistent_file_returns_error() {
        let tools = SystemTools::default();
        let result = tools
            .ffprobe(Path::new("/tmp/does_not_exist_autocut_probe_test.mp4"))
            .await;
        assert!(matches!(result, Err(RenderError::FileNotFound(_))));
    }

    #[test]
    fn missing_reports_unknown_binary() {
        let tools = SystemTools {
            ffmpeg: PathBuf::from("/nonexistent/autocut-ffmpeg"),
            ffprobe: PathBuf::from("/nonexistent/autocut-ffprobe"),
        };
        let missing = tools.missing();
        assert_eq!(missing.len(), 2);
        assert_eq!(missing[0].0, "/nonexistent/autocut-ffmpeg");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn abandoned_call_kills_the_process() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("late.mp4");
        // `sh -c <script>` stands in for an ffmpeg that is still encoding
        let tools = SystemTools {
            ffmpeg: PathBuf::from("sh"),
            ffprobe: PathBuf::from("ffprobe"),
        };
        let args = vec![
            "-c".to_string(),
            format!("sleep 1; touch '{}'", marker.display()),
        ];

        let call = tools.ffmpeg(&args);
        assert!(tokio::time::timeout(Duration::from_millis(100), call)
            .await
            .is_err());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_reports_stderr_tail() {
        let tools = SystemTools {
            ffmpeg: PathBuf::from("sh"),
            ffprobe: PathBuf::from("ffprobe"),
        };
        let args = vec![
            "-c".to_string(),
            "echo 'No such filter' >&2; exit 1".to_string(),
        ];

        let err = tools.ffmpeg(&args).await.unwrap_err();
        assert!(matches!(
            err,
            RenderError::FfmpegFailed(ref m) if m.contains("No such filter")
        ));
    }
}
