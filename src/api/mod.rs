pub mod pipeline;

pub use pipeline::{FramePipeline, PipelineError, PipelineOptions, PipelineOutcome, PipelineSummary};
