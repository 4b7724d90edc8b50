use std::path::PathBuf;

use readbatch_core::ValidationError;
use readbatch_engine::ClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
    #[error("invalid api url '{url}': {reason}")]
    ApiUrl { url: String, reason: String },
    #[error("invalid setting: {0}")]
    Setting(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("failed to write report to {}: {source}", path.display())]
    Report {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("engine stopped before the run finished")]
    EngineGone,
}
