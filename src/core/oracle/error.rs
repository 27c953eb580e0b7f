use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Response contained no message")]
    EmptyResponse,
    #[error("Failed to read image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No API key configured")]
    MissingApiKey,
    #[error("Model rotation is empty")]
    NoModels,
    #[error("Unknown classification policy: {0}")]
    UnknownPolicy(String),
    #[error("Transport error: {0}")]
    Transport(String),
}
