//! Session key derivation.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// `{source}{Camera|IPCamera} NN_{14 digits}_{14 digits}`
static SESSION_WITH_TIMESTAMPS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?(?:Camera|IPCamera)\s+\d+)_\d{14}_\d{14}$").expect("valid session pattern")
});

/// Camera marker anywhere, trailing content ignored.
static SESSION_CAMERA_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?(?:Camera|IPCamera)\s+\d+)").expect("valid camera pattern")
});

static TIMESTAMP_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{14}$").expect("valid timestamp pattern"));

/// Derive the session key of a recording.
///
/// Tried in order, first hit wins:
/// 1. camera marker + index followed by exactly two 14-digit timestamps
/// 2. camera marker + index, whatever follows
/// 3. underscore segments before the first 14-digit segment
/// 4. the whole stem
///
/// ```
/// use frame_triage::core::session::derive_prefix;
///
/// assert_eq!(
///     derive_prefix("Winposh Regent_Camera 07_20251215110142_20251215110647.mp4"),
///     "Winposh Regent_Camera 07"
/// );
/// ```
pub fn derive_prefix(filename: impl AsRef<Path>) -> String {
    let stem = file_stem(filename.as_ref());

    if let Some(caps) = SESSION_WITH_TIMESTAMPS.captures(&stem) {
        return caps[1].to_string();
    }

    if let Some(caps) = SESSION_CAMERA_ONLY.captures(&stem) {
        return caps[1].to_string();
    }

    let head: Vec<&str> = stem
        .split('_')
        .take_while(|part| !TIMESTAMP_SEGMENT.is_match(part))
        .collect();

    if head.is_empty() {
        stem
    } else {
        head.join("_")
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
