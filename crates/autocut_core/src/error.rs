use thiserror::Error;

use crate::types::JobStatus;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid job transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("progress cannot go backwards: {current} -> {requested}")]
    ProgressRegression { current: u8, requested: u8 },

    #[error("failed to persist subtitle file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
