use super::error::VideoError;
use image::{ImageOutputFormat, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// 解码后的单帧 (RGB24)
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Position within the source video, zero-based.
    pub frame_number: u64,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>, frame_number: u64) -> Self {
        Self {
            width,
            height,
            data,
            frame_number,
        }
    }

    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    pub fn to_image(&self) -> Result<RgbImage, VideoError> {
        RgbImage::from_raw(self.width, self.height, self.data.clone()).ok_or(
            VideoError::InvalidDimensions {
                width: self.width,
                height: self.height,
            },
        )
    }

    /// Downscale to `max_width` keeping aspect ratio; narrower frames are untouched.
    pub fn fit_width(&self, max_width: u32) -> Result<RgbImage, VideoError> {
        let img = self.to_image()?;
        if max_width == 0 || self.width <= max_width {
            return Ok(img);
        }

        let height = ((self.height as u64 * max_width as u64) / self.width as u64).max(1) as u32;
        Ok(image::imageops::resize(
            &img,
            max_width,
            height,
            image::imageops::FilterType::Triangle,
        ))
    }

    /// Encode for the given file extension. Anything but `png` is JPEG.
    pub fn encode(
        img: &RgbImage,
        extension: &str,
        jpeg_quality: u8,
    ) -> Result<Vec<u8>, VideoError> {
        let format = if extension.eq_ignore_ascii_case("png") {
            ImageOutputFormat::Png
        } else {
            ImageOutputFormat::Jpeg(jpeg_quality.clamp(1, 100))
        };

        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, format)?;
        Ok(buffer.into_inner())
    }
}

/// A still written to disk by the sampler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampledFrame {
    /// Unique within one extraction run; never reused across videos.
    pub sequence_index: u64,
    pub source_video: PathBuf,
    pub path: PathBuf,
}

/// `{prefix}[_{token}]_{index}.{extension}` with a zero-padded index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameNaming {
    pub prefix: String,
    pub token: Option<String>,
    pub extension: String,
    pub width: usize,
}

impl FrameNaming {
    pub const MIN_WIDTH: usize = 5;

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    fn stem(&self) -> String {
        match &self.token {
            Some(token) if !token.is_empty() => format!("{}_{}", self.prefix, token),
            _ => self.prefix.clone(),
        }
    }

    pub fn file_name(&self, index: u64) -> String {
        format!(
            "{}_{:0width$}.{}",
            self.stem(),
            index,
            self.extension,
            width = self.width.max(Self::MIN_WIDTH)
        )
    }

    pub fn path_for(&self, dir: &Path, index: u64) -> PathBuf {
        dir.join(self.file_name(index))
    }

    /// Inverse of [`file_name`](Self::file_name).
    pub fn parse_index(&self, file_name: &str) -> Option<u64> {
        let rest = file_name.strip_prefix(&self.stem())?.strip_prefix('_')?;
        let digits = rest.strip_suffix(&self.extension)?.strip_suffix('.')?;
        if digits.len() < Self::MIN_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

impl Default for FrameNaming {
    fn default() -> Self {
        Self {
            prefix: "frame".to_string(),
            token: None,
            extension: "jpg".to_string(),
            width: Self::MIN_WIDTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let frame = Frame::new(4, 2, vec![255u8; 4 * 2 * 3], 30);
        assert_eq!(frame.pixel_count(), 8);
        assert_eq!(frame.frame_number, 30);
        assert!(frame.to_image().is_ok());
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let frame = Frame::new(4, 4, vec![0u8; 10], 0);
        assert!(matches!(
            frame.to_image(),
            Err(VideoError::InvalidDimensions { width: 4, height: 4 })
        ));
    }

    #[test]
    fn test_fit_width() {
        let frame = Frame::new(100, 50, vec![128u8; 100 * 50 * 3], 0);
        let img = frame.fit_width(40).unwrap();
        assert_eq!(img.dimensions(), (40, 20));

        let untouched = frame.fit_width(200).unwrap();
        assert_eq!(untouched.dimensions(), (100, 50));
    }

    #[test]
    fn test_encode_jpeg_and_png() {
        let img = Frame::new(8, 8, vec![90u8; 8 * 8 * 3], 0).to_image().unwrap();
        let jpeg = Frame::encode(&img, "jpg", 90).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let png = Frame::encode(&img, "PNG", 90).unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }

    #[test]
    fn test_default_naming() {
        let naming = FrameNaming::default();
        assert_eq!(naming.file_name(0), "frame_00000.jpg");
        assert_eq!(naming.file_name(123456), "frame_123456.jpg");
        assert_eq!(naming.parse_index("frame_00042.jpg"), Some(42));
        assert_eq!(naming.parse_index("frame_42.jpg"), None);
        assert_eq!(naming.parse_index("frame_00042.png"), None);
    }

    #[test]
    fn test_prefixed_naming_round_trip() {
        let naming = FrameNaming::default()
            .with_prefix("Dock_Camera_01")
            .with_token("20250101000000")
            .with_width(3);
        let name = naming.file_name(7);
        assert_eq!(name, "Dock_Camera_01_20250101000000_00007.jpg");
        assert_eq!(naming.parse_index(&name), Some(7));
    }

    #[test]
    fn test_lexicographic_equals_numeric() {
        let naming = FrameNaming::default();
        let mut names: Vec<String> = [10u64, 2, 99999, 100].iter().map(|i| naming.file_name(*i)).collect();
        names.sort();
        let indices: Vec<u64> = names.iter().filter_map(|n| naming.parse_index(n)).collect();
        assert_eq!(indices, vec![2, 10, 100, 99999]);
    }
}
