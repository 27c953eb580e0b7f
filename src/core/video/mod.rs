//! 视频抽帧 - turn recordings into a single, gap-free sequence of stills.

pub mod error;
pub mod ffmpeg;
pub mod frame;
pub mod sampler;
pub mod source;

pub use error::VideoError;
pub use ffmpeg::FfmpegOpener;
pub use frame::{Frame, FrameNaming, SampledFrame};
pub use sampler::{step_frames, ExtractionSummary, FrameSampler, SamplerConfig};
pub use source::{MockVideoOpener, VideoMetadata, VideoOpener, VideoSource};
