//! Stored file metadata and operation outcomes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Suffix of files that are still being written.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Size and modification time of a stored file, read at access time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// A file currently present in the store.
#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub filename: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

impl StoredFile {
    /// Whether this is an in-progress download rather than a finished file.
    pub fn is_partial(&self) -> bool {
        self.filename.ends_with(PARTIAL_SUFFIX)
    }

    /// Age of the file relative to `now`, from its modification time.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.modified
    }
}

/// Result of a delete attempt that did not hit an I/O error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The file existed and was removed.
    Deleted,
    /// There was nothing to remove.
    NotFound,
}
