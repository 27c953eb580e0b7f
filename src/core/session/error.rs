use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Destination already exists: {0}")]
    DestinationExists(PathBuf),
}
