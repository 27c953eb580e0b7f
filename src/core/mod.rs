pub mod config;
pub mod oracle;
pub mod session;
pub mod triage;
pub mod video;

pub use config::{ConfigError, PipelineConfig};
