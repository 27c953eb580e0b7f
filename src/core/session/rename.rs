//! Rename loose recordings into the `{Location}_Camera NN_{start}_{end}` form
//! so that [`derive_prefix`](super::derive_prefix) groups them as one session.

use super::collector::list_videos_in_dir;
use super::error::SessionError;
use crate::core::video::VideoOpener;
use chrono::{Duration, NaiveDateTime};
use log::{error, info, warn};
use std::fs;
use std::path::Path;

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlan {
    pub from: String,
    pub to: String,
}

pub fn standard_filename(
    location: &str,
    camera: u32,
    start: NaiveDateTime,
    duration_seconds: f64,
) -> String {
    format_name(location, camera, start, end_time(start, duration_seconds))
}

fn format_name(location: &str, camera: u32, start: NaiveDateTime, end: NaiveDateTime) -> String {
    format!(
        "{}_Camera {:02}_{}_{}.mp4",
        location,
        camera,
        start.format(TIMESTAMP_FORMAT),
        end.format(TIMESTAMP_FORMAT)
    )
}

pub fn sanitize_location(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "Unknown".to_string();
    }
    trimmed.replace([' ', '-'], "_")
}

/// Plan names for every video in `dir`. Each recording starts where the
/// previous one ended; unprobeable files count as zero length.
pub fn plan_renames(
    dir: impl AsRef<Path>,
    location: &str,
    camera: u32,
    start: NaiveDateTime,
    opener: &dyn VideoOpener,
) -> Result<Vec<RenamePlan>, SessionError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(SessionError::NotADirectory(dir.to_path_buf()));
    }

    let location = sanitize_location(location);
    let mut cursor = start;
    let mut plan = Vec::new();

    for path in list_videos_in_dir(dir)? {
        let duration = match opener.probe(&path) {
            Ok(meta) => meta.duration_seconds(),
            Err(e) => {
                warn!("⚠️ Could not probe {}: {}", path.display(), e);
                0.0
            }
        };

        let from = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let end = end_time(cursor, duration);
        plan.push(RenamePlan {
            from,
            to: format_name(&location, camera, cursor, end),
        });
        cursor = end;
    }

    Ok(plan)
}

/// Apply a plan. Existing destinations are left alone. Returns the number of
/// files renamed.
pub fn execute_renames(dir: impl AsRef<Path>, plan: &[RenamePlan]) -> usize {
    let dir = dir.as_ref();
    let mut renamed = 0;

    for entry in plan {
        if entry.from == entry.to {
            renamed += 1;
            continue;
        }

        let src = dir.join(&entry.from);
        let dst = dir.join(&entry.to);
        if dst.exists() {
            let e = SessionError::DestinationExists(dst);
            error!("❌ {}: {}", entry.from, e);
            continue;
        }

        match fs::rename(&src, &dst) {
            Ok(()) => {
                info!("✓ {} → {}", entry.from, entry.to);
                renamed += 1;
            }
            Err(e) => error!("❌ {}: {}", entry.from, e),
        }
    }

    renamed
}

/// `start + duration`. Durations that do not fit the calendar (corrupt
/// frame rates) count as zero.
fn end_time(start: NaiveDateTime, duration_seconds: f64) -> NaiveDateTime {
    if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
        return start;
    }
    let end = Duration::try_milliseconds((duration_seconds * 1000.0) as i64)
        .and_then(|d| start.checked_add_signed(d));
    match end {
        Some(end) => end,
        None => {
            warn!(
                "⚠️ Duration {}s out of range, treating as zero",
                duration_seconds
            );
            start
        }
    }
}
