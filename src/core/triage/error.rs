use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Frame directory not found: {0}")]
    FrameDirMissing(PathBuf),
    #[error("Invalid folder name: {0:?}")]
    InvalidFolderName(String),
    #[error("Destination already exists: {0}")]
    DestinationExists(PathBuf),
}
