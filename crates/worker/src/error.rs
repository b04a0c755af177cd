use std::path::PathBuf;

use assessor_core::error::CoreError;

/// Errors that abort a worker run.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// A domain-level error from `assessor_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type WorkerResult<T> = Result<T, WorkerError>;
