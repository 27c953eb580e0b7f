//! 会话分组 - groups raw recordings that belong to one camera session.
//!
//! Recordings are named `{Source}_Camera NN_{start}_{end}.mp4`; the text up to
//! the camera index is the session key, and because both timestamps are
//! zero-padded, filename order is chronological order.

pub mod collector;
pub mod error;
pub mod prefix;
pub mod rename;

pub use collector::{
    format_duration, group_by_prefix, group_by_prefix_in_dir, group_sessions, is_video_file,
    list_available_prefixes, list_available_prefixes_in_dir, list_videos_in_dir,
    sanitize_folder_name, CollectionSummary, SessionGroup, VideoFile, VIDEO_EXTENSIONS,
};
pub use error::SessionError;
pub use prefix::derive_prefix;
pub use rename::{
    execute_renames, plan_renames, sanitize_location, standard_filename, RenamePlan,
    TIMESTAMP_FORMAT,
};
