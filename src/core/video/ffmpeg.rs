//! ffmpeg/ffprobe backed decoder. Frames arrive as raw `rgb24` on stdout.

use super::error::VideoError;
use super::frame::Frame;
use super::source::{VideoMetadata, VideoOpener, VideoSource};
use log::{debug, warn};
use serde::Deserialize;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

/// Frames larger than this are refused rather than buffered.
const MAX_DIMENSION: u32 = 16_384;

pub struct FfmpegOpener {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegOpener {
    pub fn new() -> Self {
        Self::with_binaries("ffmpeg", "ffprobe")
    }

    pub fn with_binaries(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }
}

impl Default for FfmpegOpener {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

impl VideoOpener for FfmpegOpener {
    fn probe(&self, path: &Path) -> Result<VideoMetadata, VideoError> {
        if !path.is_file() {
            return Err(VideoError::unopenable(path, "not a file"));
        }

        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-select_streams", "v:0"])
            .args([
                "-show_entries",
                "stream=width,height,avg_frame_rate,r_frame_rate,nb_frames",
            ])
            .args(["-of", "json"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| VideoError::unopenable(path, format!("failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VideoError::unopenable(path, stderr.trim().to_string()));
        }

        parse_probe(&output.stdout).and_then(|meta| match meta {
            Some(meta) => Ok(meta),
            None => Err(VideoError::unopenable(path, "no video stream")),
        })
    }

    fn open(&self, path: &Path) -> Result<Box<dyn VideoSource>, VideoError> {
        let metadata = self.probe(path)?;
        let (width, height) = (metadata.width, metadata.height);
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(VideoError::InvalidDimensions { width, height });
        }

        let mut child = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-map", "0:v:0", "-fps_mode", "passthrough"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| VideoError::unopenable(path, format!("failed to spawn ffmpeg: {}", e)))?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(VideoError::unopenable(path, "ffmpeg stdout unavailable"));
            }
        };

        debug!(
            "🎬 ffmpeg decoding {} ({}x{} @ {:.2} fps)",
            path.display(),
            width,
            height,
            metadata.frame_rate
        );

        Ok(Box::new(FfmpegSource {
            child,
            stdout: BufReader::new(stdout),
            frame_size: width as usize * height as usize * 3,
            metadata,
            position: 0,
            finished: false,
        }))
    }
}

struct FfmpegSource {
    child: Child,
    stdout: BufReader<ChildStdout>,
    frame_size: usize,
    metadata: VideoMetadata,
    position: u64,
    finished: bool,
}

impl VideoSource for FfmpegSource {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        if self.finished {
            return Ok(None);
        }

        let mut data = vec![0u8; self.frame_size];
        match self.stdout.read_exact(&mut data) {
            Ok(()) => {
                let frame = Frame::new(self.metadata.width, self.metadata.height, data, self.position);
                self.position += 1;
                Ok(Some(frame))
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                self.finished = true;
                let status = self.child.wait()?;
                if !status.success() {
                    warn!("⚠️ ffmpeg exited with {} after {} frames", status, self.position);
                }
                Ok(None)
            }
            Err(e) => {
                self.finished = true;
                Err(VideoError::Decode(e.to_string()))
            }
        }
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

fn parse_probe(raw: &[u8]) -> Result<Option<VideoMetadata>, VideoError> {
    let probe: ProbeOutput = serde_json::from_slice(raw)?;
    let Some(stream) = probe.streams.into_iter().next() else {
        return Ok(None);
    };

    let frame_rate = stream
        .avg_frame_rate
        .as_deref()
        .map(parse_rate)
        .filter(|r| *r > 0.0)
        .or_else(|| stream.r_frame_rate.as_deref().map(parse_rate))
        .unwrap_or(0.0);

    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.trim().parse().ok())
        .unwrap_or(0);

    Ok(Some(VideoMetadata {
        frame_rate,
        frame_count,
        width: stream.width,
        height: stream.height,
    }))
}

/// `"30000/1001"` or `"25"`; anything unparsable or `x/0` is 0.
fn parse_rate(raw: &str) -> f64 {
    let raw = raw.trim();
    let value = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().unwrap_or(0.0);
            let den: f64 = den.trim().parse().unwrap_or(0.0);
            if den == 0.0 {
                0.0
            } else {
                num / den
            }
        }
        None => raw.parse().unwrap_or(0.0),
    };
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
