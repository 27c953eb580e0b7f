//! 抽帧 + 分拣流水线

use crate::core::config::{ConfigError, PipelineConfig};
use crate::core::oracle::{FrameClassifier, GroqTransport, OracleAdapter, OracleError};
use crate::core::session::{
    derive_prefix, format_duration, group_by_prefix_in_dir, list_videos_in_dir,
    sanitize_folder_name, CollectionSummary, SessionError, VideoFile,
};
use crate::core::triage::{TriageEngine, TriageError, TriageOptions, TriageReport};
use crate::core::video::{ExtractionSummary, FfmpegOpener, FrameSampler, VideoError, VideoOpener};
use log::{info, warn};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
    #[error("Video error: {0}")]
    Video(#[from] VideoError),
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),
    #[error("Triage error: {0}")]
    Triage(#[from] TriageError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// Stop after extraction.
    pub skip_triage: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    Completed,
    NoVideos,
    NoFrames,
    TriageSkipped,
}

#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub output_dir: PathBuf,
    pub videos: CollectionSummary,
    pub extraction: ExtractionSummary,
    pub triage: Option<TriageReport>,
    pub outcome: PipelineOutcome,
}

impl PipelineSummary {
    fn early(output_dir: PathBuf, videos: CollectionSummary, outcome: PipelineOutcome) -> Self {
        Self {
            extraction: ExtractionSummary {
                output_dir: output_dir.clone(),
                ..Default::default()
            },
            output_dir,
            videos,
            triage: None,
            outcome,
        }
    }
}

/// 流水线 - videos in, a triaged frame folder out.
///
/// ```no_run
/// use frame_triage::api::FramePipeline;
/// use frame_triage::core::PipelineConfig;
/// use std::path::Path;
///
/// let config = PipelineConfig::from_env()?;
/// let mut pipeline = FramePipeline::new(config)?;
/// let summary = pipeline.run_session(
///     Path::new("Dock_Camera 01_20250101000000_20250101000100.mp4"),
///     Path::new("recordings"),
///     Path::new("frames"),
/// )?;
/// println!("{:?}", summary.outcome);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct FramePipeline {
    config: PipelineConfig,
    opener: Box<dyn VideoOpener>,
    classifier: Box<dyn FrameClassifier>,
    options: PipelineOptions,
}

impl FramePipeline {
    /// ffmpeg for decoding, Groq for classification.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let transport = GroqTransport::new(
            config.api_key.clone().unwrap_or_default(),
            config.base_url.clone(),
            config.request_timeout,
        )?
        .with_sampling(config.temperature, config.max_tokens);
        let adapter = OracleAdapter::new(transport, config.models.clone(), config.policy)?
            .with_batch_size(config.batch_size);

        info!(
            "🚀 FramePipeline: {} policy, {} models",
            config.policy,
            config.models.len()
        );
        Self::with_parts(config, Box::new(FfmpegOpener::new()), Box::new(adapter))
    }

    pub fn with_parts(
        config: PipelineConfig,
        opener: Box<dyn VideoOpener>,
        classifier: Box<dyn FrameClassifier>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            opener,
            classifier,
            options: PipelineOptions::default(),
        })
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Every recording in `source_dir` from the same session as `reference`,
    /// into `output_root/<session key>`.
    pub fn run_session(
        &mut self,
        reference: &Path,
        source_dir: &Path,
        output_root: &Path,
    ) -> Result<PipelineSummary, PipelineError> {
        let session_key = derive_prefix(reference);
        info!("🎯 Session '{}'", session_key);
        let videos = group_by_prefix_in_dir(source_dir, reference)?;
        let output_dir = output_root.join(sanitize_folder_name(&session_key));
        self.run_videos(&videos, output_dir)
    }

    /// Every recording in `input_dir`, into `output_root/<folder name>`.
    pub fn run_folder(
        &mut self,
        input_dir: &Path,
        output_root: &Path,
    ) -> Result<PipelineSummary, PipelineError> {
        let folder = input_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let videos = list_videos_in_dir(input_dir)?;
        let output_dir = output_root.join(sanitize_folder_name(&folder));
        self.run_videos(&videos, output_dir)
    }

    /// Sample `videos` into `output_dir`, then triage the result.
    pub fn run_videos(
        &mut self,
        videos: &[PathBuf],
        output_dir: PathBuf,
    ) -> Result<PipelineSummary, PipelineError> {
        let collection = CollectionSummary::from_paths(videos);
        if videos.is_empty() {
            warn!("⚠️ No videos found, nothing to do");
            return Ok(PipelineSummary::early(
                output_dir,
                collection,
                PipelineOutcome::NoVideos,
            ));
        }
        let footage: f64 = videos
            .iter()
            .filter_map(|v| VideoFile::new(v).probed(self.opener.as_ref()).duration_seconds())
            .sum();
        info!(
            "📼 {} videos, {:.2} MB, {}",
            collection.count,
            collection.total_megabytes(),
            format_duration(footage)
        );

        let sampler = FrameSampler::with_config(self.opener.as_ref(), self.config.sampler_config());
        let extraction = sampler.sample_videos(videos, &output_dir)?;

        let outcome = if extraction.frames_written == 0 {
            warn!("⚠️ No frames extracted");
            PipelineOutcome::NoFrames
        } else if self.options.skip_triage {
            info!("Triage skipped");
            PipelineOutcome::TriageSkipped
        } else {
            PipelineOutcome::Completed
        };

        let triage = if outcome == PipelineOutcome::Completed {
            Some(self.triage(&output_dir)?)
        } else {
            None
        };

        Ok(PipelineSummary {
            output_dir,
            videos: collection,
            extraction,
            triage,
            outcome,
        })
    }

    /// Triage an existing frame folder with this pipeline's classifier.
    pub fn triage(&mut self, frame_dir: &Path) -> Result<TriageReport, PipelineError> {
        let engine = self.engine()?;
        Ok(engine.triage(frame_dir, self.classifier.as_mut())?)
    }

    pub fn restore(&self, frame_dir: &Path) -> Result<usize, PipelineError> {
        Ok(self.engine()?.restore_all(frame_dir)?)
    }

    fn engine(&self) -> Result<TriageEngine, PipelineError> {
        Ok(TriageEngine::with_options(TriageOptions {
            layout: self.config.triage_layout()?,
            dry_run: self.options.dry_run,
            fail_policy: self.config.fail_policy,
        }))
    }
}
