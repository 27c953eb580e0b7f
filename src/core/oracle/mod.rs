//! 分类预言机 - batched remote vision classification with model rotation.
//!
//! The adapter owns the only mutable state (the rotation cursor). Every
//! failure below it turns into an `Unclassifiable` verdict instead of an
//! error, so callers always get exactly one verdict per submitted image.

pub mod adapter;
pub mod decode;
pub mod error;
pub mod groq;
pub mod policy;
pub mod transport;
pub mod verdict;

pub use adapter::{FrameClassifier, ModelRotation, OracleAdapter, OracleStats, DEFAULT_BATCH_SIZE};
pub use decode::decode_verdicts;
pub use error::OracleError;
pub use groq::GroqTransport;
pub use policy::ClassificationPolicy;
pub use transport::{EncodedImage, OracleRequest, RecordedCall, ScriptedTransport, VisionTransport};
pub use verdict::{FailPolicy, Outcome, Verdict};
