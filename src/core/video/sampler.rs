use super::error::VideoError;
use super::frame::{Frame, FrameNaming, SampledFrame};
use super::source::VideoOpener;
use crate::core::session::format_duration;
use log::{debug, error, info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// One still every `interval_seconds` of footage.
    pub interval_seconds: f64,
    pub jpeg_quality: u8,
    /// Downscale wider frames before writing.
    pub max_width: Option<u32>,
    pub naming: FrameNaming,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 0.2,
            jpeg_quality: 90,
            max_width: None,
            naming: FrameNaming::default(),
        }
    }
}

/// `max(1, round(frame_rate * interval))`; broken rates sample every frame.
pub fn step_frames(frame_rate: f64, interval_seconds: f64) -> u64 {
    let step = (frame_rate * interval_seconds).round();
    if step.is_finite() && step >= 1.0 {
        step as u64
    } else {
        1
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionSummary {
    pub output_dir: PathBuf,
    pub videos_processed: usize,
    pub videos_failed: usize,
    pub frames_written: u64,
    pub frames: Vec<SampledFrame>,
}

/// 抽帧器 - writes every n-th decoded frame under one continuous index space.
pub struct FrameSampler<'a> {
    opener: &'a dyn VideoOpener,
    config: SamplerConfig,
}

impl<'a> FrameSampler<'a> {
    pub fn new(opener: &'a dyn VideoOpener) -> Self {
        Self::with_config(opener, SamplerConfig::default())
    }

    pub fn with_config(opener: &'a dyn VideoOpener, config: SamplerConfig) -> Self {
        Self { opener, config }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Sample one video into `output_dir`, numbering from `start_index`.
    ///
    /// Fails only when the video cannot be opened. A decode error part-way
    /// through ends this video early; frames already written are kept and
    /// returned so the caller's numbering stays contiguous.
    pub fn sample_video(
        &self,
        video: &Path,
        output_dir: &Path,
        start_index: u64,
    ) -> Result<Vec<SampledFrame>, VideoError> {
        let mut source = self.opener.open(video)?;
        let metadata = *source.metadata();
        let step = step_frames(metadata.frame_rate, self.config.interval_seconds);

        if metadata.frame_rate <= 0.0 {
            warn!(
                "⚠️ {} reports frame rate {}, sampling every frame",
                video.display(),
                metadata.frame_rate
            );
        }
        info!(
            "🎬 {}: {:.2} fps, {}, every {}s (step {})",
            display_name(video),
            metadata.frame_rate,
            format_duration(metadata.duration_seconds()),
            self.config.interval_seconds,
            step
        );

        let mut written = Vec::new();
        let mut next_index = start_index;
        let mut decoded: u64 = 0;

        loop {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    error!("❌ Decode failed in {} after {} frames: {}", video.display(), decoded, e);
                    break;
                }
            };

            if decoded % step == 0 {
                let path = self.config.naming.path_for(output_dir, next_index);
                match self.write_frame(&frame, &path) {
                    Ok(()) => {
                        written.push(SampledFrame {
                            sequence_index: next_index,
                            source_video: video.to_path_buf(),
                            path,
                        });
                        next_index += 1;
                    }
                    Err(e) => error!("❌ Failed to write {}: {}", path.display(), e),
                }
            }
            decoded += 1;
        }

        info!("    ✓ {} frames written ({} decoded)", written.len(), decoded);
        Ok(written)
    }

    /// Sample every video in order into one folder. Indices run across the
    /// whole list with no gaps, starting after any frame already in the
    /// folder or one of its subfolders; unopenable videos are skipped.
    pub fn sample_videos(
        &self,
        videos: &[PathBuf],
        output_dir: &Path,
    ) -> Result<ExtractionSummary, VideoError> {
        let mut summary = ExtractionSummary {
            output_dir: output_dir.to_path_buf(),
            ..Default::default()
        };

        if videos.is_empty() {
            info!("No videos to process");
            return Ok(summary);
        }

        fs::create_dir_all(output_dir)?;
        let first_index = self.next_free_index(output_dir)?;
        if first_index > 0 {
            warn!(
                "⚠️ {} already holds frames, numbering from {}",
                output_dir.display(),
                first_index
            );
        }
        info!(
            "📂 Extracting {} videos into {} (every {}s)",
            videos.len(),
            output_dir.display(),
            self.config.interval_seconds
        );
        let started = Instant::now();

        for (i, video) in videos.iter().enumerate() {
            debug!("[{}/{}] {}", i + 1, videos.len(), video.display());
            match self.sample_video(video, output_dir, first_index + summary.frames_written) {
                Ok(frames) => {
                    summary.frames_written += frames.len() as u64;
                    summary.frames.extend(frames);
                    summary.videos_processed += 1;
                }
                Err(e) => {
                    error!("❌ Skipping {}: {}", video.display(), e);
                    summary.videos_failed += 1;
                }
            }
        }

        info!(
            "✅ Extraction complete: {} frames from {} videos ({} skipped) in {:.1?}",
            summary.frames_written,
            summary.videos_processed,
            summary.videos_failed,
            started.elapsed()
        );
        Ok(summary)
    }

    /// One past the highest frame index in `dir` or its direct subfolders
    /// (quarantined frames keep their names).
    fn next_free_index(&self, dir: &Path) -> Result<u64, VideoError> {
        let naming = &self.config.naming;
        let mut next = 0;
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_file() {
                if let Some(index) = naming.parse_index(&entry.file_name().to_string_lossy()) {
                    next = next.max(index + 1);
                }
            } else if file_type.is_dir() {
                for inner in fs::read_dir(entry.path())? {
                    let name = inner?.file_name();
                    if let Some(index) = naming.parse_index(&name.to_string_lossy()) {
                        next = next.max(index + 1);
                    }
                }
            }
        }
        Ok(next)
    }

    fn write_frame(&self, frame: &Frame, path: &Path) -> Result<(), VideoError> {
        if path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            )
            .into());
        }
        let img = match self.config.max_width {
            Some(max_width) => frame.fit_width(max_width)?,
            None => frame.to_image()?,
        };
        let bytes = Frame::encode(&img, &self.config.naming.extension, self.config.jpeg_quality)?;

        // never leave a half-written image under a frame name
        let partial = path.with_extension("part");
        fs::write(&partial, bytes)?;
        if let Err(e) = fs::rename(&partial, path) {
            let _ = fs::remove_file(&partial);
            return Err(e.into());
        }
        Ok(())
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::video::MockVideoOpener;
    use image::GenericImageView;
    use tempfile::TempDir;

    fn indices_on_disk(dir: &Path, naming: &FrameNaming) -> Vec<u64> {
        let mut indices: Vec<u64> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter_map(|e| naming.parse_index(&e.file_name().to_string_lossy()))
            .collect();
        indices.sort();
        indices
    }

    #[test]
    fn test_step_frames() {
        assert_eq!(step_frames(30.0, 0.2), 6);
        assert_eq!(step_frames(25.0, 0.2), 5);
        assert_eq!(step_frames(29.97, 0.2), 6);
        assert_eq!(step_frames(12.0, 0.25), 3);
        assert_eq!(step_frames(2.0, 0.2), 1);
        assert_eq!(step_frames(0.0, 0.2), 1);
        assert_eq!(step_frames(-5.0, 0.2), 1);
        assert_eq!(step_frames(f64::NAN, 0.2), 1);
    }

    #[test]
    fn test_sample_video_every_nth_frame() {
        let dir = TempDir::new().unwrap();
        let opener = MockVideoOpener::new(10.0, 25);
        let sampler = FrameSampler::new(&opener);

        // step 2 over 25 frames -> frames 0,2,...,24
        let frames = sampler
            .sample_video(Path::new("a.mp4"), dir.path(), 7)
            .unwrap();
        assert_eq!(frames.len(), 13);
        assert_eq!(frames[0].sequence_index, 7);
        assert_eq!(frames[12].sequence_index, 19);
        assert!(dir.path().join("frame_00007.jpg").is_file());
        assert!(dir.path().join("frame_00019.jpg").is_file());
        assert!(!dir.path().join("frame_00020.jpg").exists());
    }

    #[test]
    fn test_zero_frame_rate_takes_every_frame() {
        let dir = TempDir::new().unwrap();
        let opener = MockVideoOpener::new(0.0, 9);
        let sampler = FrameSampler::new(&opener);

        let frames = sampler
            .sample_video(Path::new("corrupt.mp4"), dir.path(), 0)
            .unwrap();
        assert_eq!(frames.len(), 9);
    }

    #[test]
    fn test_unopenable_video_is_an_error() {
        let dir = TempDir::new().unwrap();
        let opener = MockVideoOpener::new(10.0, 10).with_unopenable("bad.mp4");
        let sampler = FrameSampler::new(&opener);
        assert!(sampler
            .sample_video(Path::new("bad.mp4"), dir.path(), 0)
            .is_err());
    }

    #[test]
    fn test_sample_videos_continuous_numbering() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("frames");
        let opener = MockVideoOpener::new(10.0, 0)
            .with_video("a.mp4", 10.0, 20) // step 2 -> 10
            .with_video("b.mp4", 30.0, 60) // step 6 -> 10
            .with_unknown_length("c.mp4", 0.0, 3) // step 1 -> 3
            .with_unopenable("d.mp4");
        let sampler = FrameSampler::new(&opener);

        let videos: Vec<PathBuf> = ["a.mp4", "d.mp4", "b.mp4", "c.mp4"]
            .iter()
            .map(PathBuf::from)
            .collect();
        let summary = sampler.sample_videos(&videos, &out).unwrap();

        assert_eq!(summary.frames_written, 23);
        assert_eq!(summary.videos_processed, 3);
        assert_eq!(summary.videos_failed, 1);
        assert_eq!(
            indices_on_disk(&out, &sampler.config().naming),
            (0..23).collect::<Vec<u64>>()
        );
        assert_eq!(summary.frames[10].source_video, PathBuf::from("b.mp4"));
        assert_eq!(summary.frames[10].sequence_index, 10);
    }

    #[test]
    fn test_empty_list_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("frames");
        let opener = MockVideoOpener::new(10.0, 10);
        let sampler = FrameSampler::new(&opener);

        let summary = sampler.sample_videos(&[], &out).unwrap();
        assert_eq!(summary.frames_written, 0);
        assert!(!out.exists());
    }

    #[test]
    fn test_second_run_continues_numbering() {
        let dir = TempDir::new().unwrap();
        let opener = MockVideoOpener::new(5.0, 3);
        let sampler = FrameSampler::new(&opener);

        sampler
            .sample_videos(&[PathBuf::from("a.mp4")], dir.path())
            .unwrap();
        fs::write(dir.path().join("frame_00000.jpg"), b"first run").unwrap();
        // a quarantined frame from an earlier triage keeps its index reserved
        fs::create_dir(dir.path().join("not-suitable")).unwrap();
        fs::rename(
            dir.path().join("frame_00002.jpg"),
            dir.path().join("not-suitable/frame_00002.jpg"),
        )
        .unwrap();

        let summary = sampler
            .sample_videos(&[PathBuf::from("b.mp4")], dir.path())
            .unwrap();

        assert_eq!(summary.frames_written, 3);
        assert_eq!(summary.frames[0].sequence_index, 3);
        assert_eq!(fs::read(dir.path().join("frame_00000.jpg")).unwrap(), b"first run");
        assert!(!dir.path().join("frame_00002.jpg").exists());
        assert_eq!(
            indices_on_disk(dir.path(), &sampler.config().naming),
            vec![0, 1, 3, 4, 5]
        );
    }

    #[test]
    fn test_existing_frame_is_never_overwritten() {
        let dir = TempDir::new().unwrap();
        let opener = MockVideoOpener::new(5.0, 2);
        let sampler = FrameSampler::new(&opener);
        fs::write(dir.path().join("frame_00004.jpg"), b"keep").unwrap();

        let frames = sampler
            .sample_video(Path::new("a.mp4"), dir.path(), 3)
            .unwrap();

        // index 4 is taken: that write fails and the frame is dropped
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].sequence_index, 3);
        assert_eq!(fs::read(dir.path().join("frame_00004.jpg")).unwrap(), b"keep");
    }

    #[test]
    fn test_png_naming_and_downscale() {
        let dir = TempDir::new().unwrap();
        let opener = MockVideoOpener::new(1.0, 2);
        let config = SamplerConfig {
            interval_seconds: 1.0,
            max_width: Some(4),
            naming: FrameNaming::default().with_extension("png"),
            ..Default::default()
        };
        let sampler = FrameSampler::with_config(&opener, config);

        let frames = sampler
            .sample_video(Path::new("a.mp4"), dir.path(), 0)
            .unwrap();
        assert_eq!(frames.len(), 2);
        let img = image::open(dir.path().join("frame_00001.png")).unwrap();
        assert_eq!(img.width(), 4);
    }
}
