use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Outcome of a lookup that normalizes bad input instead of failing.
///
/// `Defaulted` carries the documented fallback value. It is never an error:
/// fatal conditions are reported through `Result`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution<T> {
    Matched(T),
    Defaulted(T),
}

impl<T> Resolution<T> {
    pub fn value(&self) -> &T {
        match self {
            Resolution::Matched(v) | Resolution::Defaulted(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Resolution::Matched(v) | Resolution::Defaulted(v) => v,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, Resolution::Defaulted(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolution<U> {
        match self {
            Resolution::Matched(v) => Resolution::Matched(f(v)),
            Resolution::Defaulted(v) => Resolution::Defaulted(f(v)),
        }
    }
}

// ---------------------------------------------------------------------------
// VideoInfo
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Seconds. Zero when the source could not be measured.
    pub duration: f64,
    pub fps: f64,
}

impl VideoInfo {
    /// Vertical 1080x1920 at 30 fps, used when probing fails.
    pub const FALLBACK: Self = Self {
        width: 1080,
        height: 1920,
        duration: 0.0,
        fps: 30.0,
    };
}

// ---------------------------------------------------------------------------
// TranscriptSegment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// FeatureFlags
// ---------------------------------------------------------------------------

/// Switches between the full pipeline and the reduced "lite" profile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FeatureFlags {
    /// Emit preset-driven visual filter stages after the subtitle stage.
    pub visual_filters: bool,
    /// Honour style-clone profiles attached to a request.
    pub style_clone: bool,
    /// Accept caller-supplied subtitle lines in place of transcription.
    pub literal_subtitles: bool,
}

impl FeatureFlags {
    pub const FULL: Self = Self {
        visual_filters: true,
        style_clone: true,
        literal_subtitles: true,
    };

    pub const LITE: Self = Self {
        visual_filters: false,
        style_clone: false,
        literal_subtitles: true,
    };
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self::FULL
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    pub output_url: Option<String>,
    pub error: Option<String>,
}

impl Job {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Pending,
            progress: 0,
            message: "Waiting...".to_string(),
            output_url: None,
            error: None,
        }
    }

    /// Record a pipeline checkpoint. The first checkpoint moves the job from
    /// pending to processing.
    pub fn checkpoint(&mut self, progress: u8, message: impl Into<String>) -> Result<()> {
        match self.status {
            JobStatus::Pending => self.status = JobStatus::Processing,
            JobStatus::Processing => {}
            other => {
                return Err(CoreError::InvalidTransition {
                    from: other,
                    to: JobStatus::Processing,
                })
            }
        }
        if progress < self.progress {
            return Err(CoreError::ProgressRegression {
                current: self.progress,
                requested: progress,
            });
        }
        self.progress = progress.min(100);
        self.message = message.into();
        Ok(())
    }

    pub fn complete(&mut self, output_url: impl Into<String>) -> Result<()> {
        if self.status != JobStatus::Processing {
            return Err(CoreError::InvalidTransition {
                from: self.status,
                to: JobStatus::Completed,
            });
        }
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.message = "Done!".to_string();
        self.output_url = Some(output_url.into());
        Ok(())
    }

    /// Only a processing job can fail. Progress is left where the failing
    /// stage set it.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<()> {
        if self.status != JobStatus::Processing {
            return Err(CoreError::InvalidTransition {
                from: self.status,
                to: JobStatus::Failed,
            });
        }
        let error = error.into();
        self.status = JobStatus::Failed;
        self.message = format!("Error: {error}");
        self.error = Some(error);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
