use std::path::PathBuf;
use thiserror::Error;

use autocut_core::error::CoreError;
use autocut_render::error::RenderError;

/// Errors that end a running job.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("{stage} timed out after {seconds}s")]
    Timeout { stage: &'static str, seconds: u64 },

    #[error("job not found: {0}")]
    JobMissing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors returned to callers of the service facade.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unsupported file format: {0:?}")]
    UnsupportedFormat(String),

    #[error("file not found: {0}")]
    MissingFile(PathBuf),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("style not found: {0}")]
    StyleNotFound(String),

    #[error("job {0} is not completed")]
    NotReady(String),

    #[error("output file not found: {0}")]
    OutputNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
