use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot open video {path}: {reason}")]
    Unopenable { path: PathBuf, reason: String },
    #[error("Probe output is not valid JSON: {0}")]
    ProbeJson(#[from] serde_json::Error),
    #[error("Unsupported frame dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Image encode error: {0}")]
    Encode(#[from] image::ImageError),
}

impl VideoError {
    pub fn unopenable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        VideoError::Unopenable {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
