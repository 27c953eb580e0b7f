//! Decoder seam. Decoding itself lives outside this crate; anything that can
//! hand out frames sequentially and report its frame rate can feed the sampler.

use super::error::VideoError;
use super::frame::Frame;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Container metadata. Both rate and count may be zero when the file lies.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VideoMetadata {
    pub frame_rate: f64,
    pub frame_count: u64,
    pub width: u32,
    pub height: u32,
}

impl VideoMetadata {
    pub fn duration_seconds(&self) -> f64 {
        if self.frame_rate > 0.0 && self.frame_rate.is_finite() {
            self.frame_count as f64 / self.frame_rate
        } else {
            0.0
        }
    }
}

pub trait VideoSource {
    fn metadata(&self) -> &VideoMetadata;

    /// `Ok(None)` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError>;
}

pub trait VideoOpener {
    fn probe(&self, path: &Path) -> Result<VideoMetadata, VideoError>;

    fn open(&self, path: &Path) -> Result<Box<dyn VideoSource>, VideoError>;
}

#[derive(Debug, Clone, Copy)]
struct MockVideo {
    frame_rate: f64,
    reported_frames: u64,
    actual_frames: u64,
}

/// 模拟解码器 - synthetic videos keyed by file name, for tests and dry runs
/// without an ffmpeg install.
pub struct MockVideoOpener {
    default: MockVideo,
    videos: HashMap<String, MockVideo>,
    unopenable: HashSet<String>,
    width: u32,
    height: u32,
}

impl MockVideoOpener {
    pub fn new(frame_rate: f64, frames: u64) -> Self {
        Self {
            default: MockVideo {
                frame_rate,
                reported_frames: frames,
                actual_frames: frames,
            },
            videos: HashMap::new(),
            unopenable: HashSet::new(),
            width: 8,
            height: 6,
        }
    }

    pub fn with_video(mut self, file_name: &str, frame_rate: f64, frames: u64) -> Self {
        self.videos.insert(
            file_name.to_string(),
            MockVideo {
                frame_rate,
                reported_frames: frames,
                actual_frames: frames,
            },
        );
        self
    }

    /// Container reports no frame count but still yields `frames`.
    pub fn with_unknown_length(mut self, file_name: &str, frame_rate: f64, frames: u64) -> Self {
        self.videos.insert(
            file_name.to_string(),
            MockVideo {
                frame_rate,
                reported_frames: 0,
                actual_frames: frames,
            },
        );
        self
    }

    pub fn with_unopenable(mut self, file_name: &str) -> Self {
        self.unopenable.insert(file_name.to_string());
        self
    }

    fn lookup(&self, path: &Path) -> Result<MockVideo, VideoError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.unopenable.contains(&name) {
            return Err(VideoError::unopenable(path, "mock: unopenable"));
        }
        Ok(self.videos.get(&name).copied().unwrap_or(self.default))
    }
}

impl VideoOpener for MockVideoOpener {
    fn probe(&self, path: &Path) -> Result<VideoMetadata, VideoError> {
        let video = self.lookup(path)?;
        Ok(VideoMetadata {
            frame_rate: video.frame_rate,
            frame_count: video.reported_frames,
            width: self.width,
            height: self.height,
        })
    }

    fn open(&self, path: &Path) -> Result<Box<dyn VideoSource>, VideoError> {
        let video = self.lookup(path)?;
        Ok(Box::new(MockSource {
            metadata: VideoMetadata {
                frame_rate: video.frame_rate,
                frame_count: video.reported_frames,
                width: self.width,
                height: self.height,
            },
            remaining: video.actual_frames,
            position: 0,
        }))
    }
}

struct MockSource {
    metadata: VideoMetadata,
    remaining: u64,
    position: u64,
}

impl VideoSource for MockSource {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;

        let (w, h) = (self.metadata.width, self.metadata.height);
        let fill = (self.position % 251) as u8;
        let frame = Frame::new(w, h, vec![fill; (w * h * 3) as usize], self.position);
        self.position += 1;
        Ok(Some(frame))
    }
}
