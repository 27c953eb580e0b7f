//! 视频收集 - directory scans and session grouping.

use super::error::SessionError;
use super::prefix::derive_prefix;
use crate::core::video::{VideoMetadata, VideoOpener};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsStr;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mkv", "mov"];

static UNSAFE_FOLDER_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\-]").expect("valid folder pattern"));
static UNDERSCORE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").expect("valid run pattern"));

/// A discovered recording. The session key is computed once on construction;
/// metadata is only filled in by [`probed`](Self::probed).
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFile {
    pub path: PathBuf,
    pub session_key: String,
    pub metadata: Option<VideoMetadata>,
}

impl VideoFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let session_key = derive_prefix(&path);
        Self {
            path,
            session_key,
            metadata: None,
        }
    }

    /// Attach probed metadata. A failed probe leaves it empty.
    pub fn probed(mut self, opener: &dyn VideoOpener) -> Self {
        match opener.probe(&self.path) {
            Ok(meta) => self.metadata = Some(meta),
            Err(e) => debug!("Probe failed for {}: {}", self.path.display(), e),
        }
        self
    }

    pub fn frame_rate(&self) -> Option<f64> {
        self.metadata.map(|m| m.frame_rate)
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        self.metadata.map(|m| m.duration_seconds())
    }

    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }
}

/// Recordings sharing one session key, in chronological (filename) order.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionGroup {
    pub session_key: String,
    pub videos: Vec<VideoFile>,
}

impl SessionGroup {
    pub fn paths(&self) -> Vec<PathBuf> {
        self.videos.iter().map(|v| v.path.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }
}

/// Case-insensitive check against [`VIDEO_EXTENSIONS`].
pub fn is_video_file(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(OsStr::to_str)
        .map(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Every video in `filenames` whose session key equals the reference's,
/// sorted by file name.
pub fn group_by_prefix<I, P>(filenames: I, reference: impl AsRef<Path>) -> Vec<PathBuf>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let reference = reference.as_ref();
    if reference.as_os_str().is_empty() {
        return Vec::new();
    }

    let key = derive_prefix(reference);
    debug!("Session key for {:?}: '{}'", reference, key);

    let mut matches: Vec<PathBuf> = filenames
        .into_iter()
        .map(|p| p.as_ref().to_path_buf())
        .filter(|p| is_video_file(p) && derive_prefix(p) == key)
        .collect();

    sort_by_file_name(&mut matches);
    matches
}

/// [`group_by_prefix`] over a directory listing. A missing directory is an
/// empty result.
pub fn group_by_prefix_in_dir(
    dir: impl AsRef<Path>,
    reference: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, SessionError> {
    let videos = list_videos_in_dir(dir)?;
    let grouped = group_by_prefix(videos, reference);
    info!("🎞️ Found {} recordings in session", grouped.len());
    Ok(grouped)
}

/// All videos directly inside `dir`, sorted by file name.
pub fn list_videos_in_dir(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, SessionError> {
    let dir = dir.as_ref();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("⚠️ Video directory not found: {}", dir.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut videos = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && is_video_file(&path) {
            videos.push(path);
        }
    }

    sort_by_file_name(&mut videos);
    Ok(videos)
}

/// Partition a listing into session groups, ordered by session key.
pub fn group_sessions<I, P>(filenames: I) -> Vec<SessionGroup>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut groups: BTreeMap<String, Vec<VideoFile>> = BTreeMap::new();
    for path in filenames {
        let path = path.as_ref();
        if !is_video_file(path) {
            continue;
        }
        let video = VideoFile::new(path);
        groups
            .entry(video.session_key.clone())
            .or_default()
            .push(video);
    }

    groups
        .into_iter()
        .map(|(session_key, mut videos)| {
            videos.sort_by_key(VideoFile::file_name);
            SessionGroup {
                session_key,
                videos,
            }
        })
        .collect()
}

/// Unique session keys across a listing, sorted.
pub fn list_available_prefixes<I, P>(filenames: I) -> Vec<String>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    filenames
        .into_iter()
        .filter(|p| is_video_file(p))
        .map(derive_prefix)
        .filter(|key| !key.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn list_available_prefixes_in_dir(dir: impl AsRef<Path>) -> Result<Vec<String>, SessionError> {
    Ok(list_available_prefixes(list_videos_in_dir(dir)?))
}

/// Size and names of a set of recordings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSummary {
    pub count: usize,
    pub total_bytes: u64,
    pub videos: Vec<String>,
}

impl CollectionSummary {
    /// Unreadable files contribute zero bytes.
    pub fn from_paths(paths: &[PathBuf]) -> Self {
        let total_bytes = paths
            .iter()
            .filter_map(|p| fs::metadata(p).ok())
            .map(|m| m.len())
            .sum();

        Self {
            count: paths.len(),
            total_bytes,
            videos: paths.iter().map(|p| file_name_of(p)).collect(),
        }
    }

    pub fn total_megabytes(&self) -> f64 {
        (self.total_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
    }
}

/// Turn a session key or folder name into a safe directory name.
pub fn sanitize_folder_name(name: &str) -> String {
    let replaced = UNSAFE_FOLDER_CHARS.replace_all(name, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&replaced, "_");
    let trimmed = collapsed.trim_matches('_');
    if trimmed.is_empty() {
        "extracted".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `1h 23m 45s`; zero hours/minutes are left out.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    let mut parts = Vec::with_capacity(3);
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    parts.push(format!("{}s", secs));
    parts.join(" ")
}

fn sort_by_file_name(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
