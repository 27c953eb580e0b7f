//! 分拣 - partitions a frame folder into kept frames and a quarantine
//! subfolder, driven by classifier verdicts.

pub mod engine;
pub mod error;
pub mod layout;
pub mod report;

pub use engine::{TriageEngine, TriageOptions};
pub use error::TriageError;
pub use layout::{is_image_file, TriageLayout, IMAGE_EXTENSIONS};
pub use report::{FrameFailure, TriageReport};
