use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// One variant per pipeline stage, so log lines name the failing stage
/// instead of hiding every cause behind a generic message.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("download error: {0}")]
    Download(String),

    #[error("error reading metadata from {path:?}: {message}")]
    Metadata { path: PathBuf, message: String },

    #[error("feed error: {0}")]
    Feed(String),

    #[error("transfer error: {0}")]
    Transfer(#[from] ssh2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
