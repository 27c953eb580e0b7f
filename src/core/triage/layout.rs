use super::error::TriageError;
use log::warn;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Folder names inside a frame directory that are not frames: the quarantine
/// of this pass plus those of any earlier passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageLayout {
    quarantine: String,
    reserved: Vec<String>,
}

impl TriageLayout {
    pub fn new(quarantine: impl Into<String>) -> Result<Self, TriageError> {
        let quarantine = quarantine.into();
        validate_folder_name(&quarantine)?;
        Ok(Self {
            quarantine,
            reserved: Vec::new(),
        })
    }

    /// Also skip `name` when listing, e.g. `no-human` from an earlier pass.
    pub fn with_reserved(mut self, name: impl Into<String>) -> Result<Self, TriageError> {
        let name = name.into();
        validate_folder_name(&name)?;
        if name != self.quarantine && !self.reserved.contains(&name) {
            self.reserved.push(name);
        }
        Ok(self)
    }

    pub fn quarantine(&self) -> &str {
        &self.quarantine
    }

    pub fn reserved(&self) -> &[String] {
        &self.reserved
    }

    pub fn quarantine_dir(&self, frame_dir: &Path) -> PathBuf {
        frame_dir.join(&self.quarantine)
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        name == self.quarantine || self.reserved.iter().any(|r| r == name)
    }

    /// Image files directly inside `frame_dir`, sorted by name.
    pub fn list_frames(&self, frame_dir: &Path) -> Result<Vec<PathBuf>, TriageError> {
        if !frame_dir.is_dir() {
            return Err(TriageError::FrameDirMissing(frame_dir.to_path_buf()));
        }

        let mut frames = Vec::new();
        for entry in fs::read_dir(frame_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if self.is_excluded(&name.to_string_lossy()) {
                continue;
            }
            let path = entry.path();
            if entry.file_type()?.is_file() && is_image_file(&path) {
                frames.push(path);
            }
        }
        frames.sort();
        Ok(frames)
    }
}

impl Default for TriageLayout {
    fn default() -> Self {
        Self {
            quarantine: "not-suitable".to_string(),
            reserved: Vec::new(),
        }
    }
}

pub(crate) fn validate_folder_name(name: &str) -> Result<(), TriageError> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');
    if invalid {
        return Err(TriageError::InvalidFolderName(name.to_string()));
    }
    Ok(())
}

/// Move `file` into `dest_dir` under the same name. Never overwrites.
///
/// Falls back to copy + remove when a plain rename is refused (different
/// filesystems). If the copy or the removal of the source fails, the copy is
/// deleted again, so the file always ends up in exactly one place.
pub fn move_into(file: &Path, dest_dir: &Path) -> Result<PathBuf, TriageError> {
    let name = file
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let dest = dest_dir.join(name);
    if dest.exists() {
        return Err(TriageError::DestinationExists(dest));
    }

    match fs::rename(file, &dest) {
        Ok(()) => Ok(dest),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(e.into()),
        Err(e) => {
            warn!("rename {} failed ({}), copying instead", file.display(), e);
            copy_then_remove(file, &dest, |from, to| fs::copy(from, to))?;
            Ok(dest)
        }
    }
}

/// Copy `file` to `dest`, then remove `file`. On any failure `dest` is
/// deleted again and `file` stays where it was.
fn copy_then_remove<F>(file: &Path, dest: &Path, copy: F) -> io::Result<()>
where
    F: Fn(&Path, &Path) -> io::Result<u64>,
{
    if let Err(copy_err) = copy(file, dest) {
        let _ = fs::remove_file(dest);
        return Err(copy_err);
    }
    if let Err(remove_err) = fs::remove_file(file) {
        let _ = fs::remove_file(dest);
        return Err(remove_err);
    }
    Ok(())
}
