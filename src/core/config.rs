//! Pipeline settings: defaults, named presets, `.env` / environment overrides.

use crate::core::oracle::{ClassificationPolicy, FailPolicy, DEFAULT_BATCH_SIZE};
use crate::core::oracle::groq::DEFAULT_BASE_URL;
use crate::core::triage::TriageLayout;
use crate::core::video::SamplerConfig;
use log::debug;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODELS: &[&str] = &[
    "meta-llama/llama-4-scout-17b-16e-instruct",
    "meta-llama/llama-4-maverick-17b-128e-instruct",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No models configured")]
    NoModels,
    #[error("Batch size must be at least 1")]
    ZeroBatchSize,
    #[error("Frame interval must be a positive number of seconds, got {0}")]
    InvalidInterval(f64),
    #[error("Invalid quarantine folder name: {0:?}")]
    InvalidQuarantine(String),
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub models: Vec<String>,
    pub batch_size: usize,
    pub interval_seconds: f64,
    pub jpeg_quality: u8,
    pub quarantine_dir: String,
    /// Folders of earlier passes that triage must leave alone.
    pub reserved_dirs: Vec<String>,
    pub policy: ClassificationPolicy,
    pub fail_policy: FailPolicy,
    pub request_timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            batch_size: DEFAULT_BATCH_SIZE,
            interval_seconds: 0.2,
            jpeg_quality: 90,
            quarantine_dir: ClassificationPolicy::DatasetSuitability
                .default_quarantine()
                .to_string(),
            reserved_dirs: Vec::new(),
            policy: ClassificationPolicy::DatasetSuitability,
            fail_policy: FailPolicy::Open,
            request_timeout: Duration::from_secs(120),
            temperature: 0.1,
            max_tokens: 1024,
        }
    }
}

impl PipelineConfig {
    pub fn human_presence() -> Self {
        Self::for_policy(ClassificationPolicy::HumanPresence)
    }

    pub fn dataset_suitability() -> Self {
        Self::for_policy(ClassificationPolicy::DatasetSuitability)
    }

    pub fn for_policy(policy: ClassificationPolicy) -> Self {
        Self {
            policy,
            quarantine_dir: policy.default_quarantine().to_string(),
            ..Default::default()
        }
    }

    /// Defaults overridden by `.env` and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded {}", path.display());
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = match get("FRAME_TRIAGE_POLICY") {
            Some(raw) => {
                let policy = ClassificationPolicy::from_str(&raw).map_err(|_| {
                    ConfigError::InvalidValue {
                        key: "FRAME_TRIAGE_POLICY",
                        value: raw.clone(),
                    }
                })?;
                Self::for_policy(policy)
            }
            None => Self::default(),
        };

        config.api_key = get("GROQ_API_KEY");
        if let Some(url) = get("GROQ_BASE_URL") {
            config.base_url = url;
        }
        if let Some(raw) = get("FRAME_TRIAGE_MODELS") {
            config.models = raw
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(raw) = get("FRAME_TRIAGE_BATCH_SIZE") {
            config.batch_size = parse_value("FRAME_TRIAGE_BATCH_SIZE", &raw)?;
        }
        if let Some(raw) = get("FRAME_TRIAGE_INTERVAL_SECONDS") {
            config.interval_seconds = parse_value("FRAME_TRIAGE_INTERVAL_SECONDS", &raw)?;
        }
        if let Some(dir) = get("FRAME_TRIAGE_QUARANTINE_DIR") {
            config.quarantine_dir = dir.trim().to_string();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.models.is_empty() {
            return Err(ConfigError::NoModels);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if !self.interval_seconds.is_finite() || self.interval_seconds <= 0.0 {
            return Err(ConfigError::InvalidInterval(self.interval_seconds));
        }
        self.triage_layout()?;
        Ok(())
    }

    pub fn triage_layout(&self) -> Result<TriageLayout, ConfigError> {
        let invalid = |name: &str| ConfigError::InvalidQuarantine(name.to_string());
        let mut layout =
            TriageLayout::new(self.quarantine_dir.clone()).map_err(|_| invalid(&self.quarantine_dir))?;
        for name in &self.reserved_dirs {
            layout = layout.with_reserved(name.clone()).map_err(|_| invalid(name))?;
        }
        Ok(layout)
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            interval_seconds: self.interval_seconds,
            jpeg_quality: self.jpeg_quality,
            ..Default::default()
        }
    }
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}
