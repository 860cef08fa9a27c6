//! Directory-backed file store.

use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncSeekExt, Take};
use vidrelay_common::paths::validate_filename;
use vidrelay_common::{Error, Result};

use crate::models::{DeleteOutcome, FileStat, StoredFile, PARTIAL_SUFFIX};

/// A single directory of media files addressed by filename.
///
/// Cheap to clone; clones share the same root.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: Arc<PathBuf>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
        }
    }

    /// The store directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the store directory if it does not exist yet.
    pub async fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(self.root.as_path()).await?;
        Ok(())
    }

    /// Join a validated filename onto the root.
    ///
    /// The result is lexically inside the root; use [`FileStore::stat`] or
    /// the open methods to also reject symlinks that point elsewhere.
    pub fn path_for(&self, filename: &str) -> Result<PathBuf> {
        validate_filename(filename)?;
        Ok(self.root.join(filename))
    }

    /// Resolve an existing file and check that its canonical path still
    /// lives under the canonical root.
    async fn resolve_existing(&self, filename: &str) -> Result<PathBuf> {
        let path = self.path_for(filename)?;

        let canonical = fs::canonicalize(&path)
            .await
            .map_err(|e| not_found_or_io(e, filename))?;
        let root = fs::canonicalize(self.root.as_path())
            .await
            .map_err(|e| not_found_or_io(e, filename))?;

        if !canonical.starts_with(&root) {
            tracing::warn!(filename, "Rejected path resolving outside the store root");
            return Err(Error::invalid_filename(filename));
        }

        Ok(canonical)
    }

    /// Whether a regular file with this name exists.
    pub async fn exists(&self, filename: &str) -> bool {
        self.stat(filename).await.is_ok()
    }

    /// Size and modification time, read from the filesystem now.
    pub async fn stat(&self, filename: &str) -> Result<FileStat> {
        let path = self.resolve_existing(filename).await?;
        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| not_found_or_io(e, filename))?;

        if !metadata.is_file() {
            return Err(Error::not_found(filename));
        }

        Ok(FileStat {
            size: metadata.len(),
            modified: DateTime::<Utc>::from(metadata.modified()?),
        })
    }

    /// Open a file for reading, along with the size and mtime of the opened
    /// handle.
    ///
    /// The stat comes from the handle, so it always describes the bytes the
    /// handle reads even if the name is replaced right after the open.
    pub async fn open(&self, filename: &str) -> Result<(File, FileStat)> {
        let path = self.resolve_existing(filename).await?;
        let file = File::open(&path)
            .await
            .map_err(|e| not_found_or_io(e, filename))?;

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(Error::not_found(filename));
        }

        let stat = FileStat {
            size: metadata.len(),
            modified: DateTime::<Utc>::from(metadata.modified()?),
        };
        Ok((file, stat))
    }

    /// Open a reader limited to the inclusive byte range `[start, end]`.
    ///
    /// The caller is responsible for checking the range against the file
    /// size; reads past the end simply return fewer bytes.
    pub async fn open_range(&self, filename: &str, start: u64, end: u64) -> Result<Take<File>> {
        let (file, _) = self.open(filename).await?;
        Self::take_range(file, start, end).await
    }

    /// Limit an already opened file to the inclusive byte range `[start, end]`.
    pub async fn take_range(mut file: File, start: u64, end: u64) -> Result<Take<File>> {
        if end < start {
            return Err(Error::invalid_input(format!(
                "range end {end} before start {start}"
            )));
        }

        file.seek(SeekFrom::Start(start)).await?;
        Ok(file.take(end - start + 1))
    }

    /// Remove a file. A missing file is reported, not treated as an error.
    pub async fn delete(&self, filename: &str) -> Result<DeleteOutcome> {
        let path = self.path_for(filename)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(DeleteOutcome::Deleted),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(DeleteOutcome::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Enumerate the regular files in the store, including partial downloads.
    ///
    /// Entries that disappear or fail to stat while listing are skipped.
    pub async fn list(&self) -> Result<Vec<StoredFile>> {
        let mut entries = match fs::read_dir(self.root.as_path()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Some(filename) = entry.file_name().to_str().map(str::to_owned) else {
                tracing::debug!(path = ?entry.path(), "Skipping non UTF-8 filename");
                continue;
            };
            if validate_filename(&filename).is_err() {
                tracing::debug!(filename, "Skipping entry that is not addressable by name");
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!(filename, error = %e, "Skipping entry that failed to stat");
                    continue;
                }
            };

            let modified = match metadata.modified() {
                Ok(t) => DateTime::<Utc>::from(t),
                Err(e) => {
                    tracing::debug!(filename, error = %e, "Skipping entry without mtime");
                    continue;
                }
            };

            files.push(StoredFile {
                path: entry.path(),
                filename,
                size: metadata.len(),
                modified,
            });
        }

        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(files)
    }

    /// Create (or truncate) the partial file a download writes into.
    ///
    /// `token` tells concurrent downloads of the same name apart, so each
    /// writes its own partial file and the last commit wins.
    pub async fn create_partial(&self, filename: &str, token: &str) -> Result<File> {
        let path = self.path_for(&partial_name(filename, token))?;
        Ok(File::create(&path).await?)
    }

    /// Move a finished partial file into place under its final name.
    ///
    /// An existing file with the same name is replaced.
    pub async fn commit_partial(&self, filename: &str, token: &str) -> Result<StoredFile> {
        let partial = self.path_for(&partial_name(filename, token))?;
        let path = self.path_for(filename)?;

        fs::rename(&partial, &path)
            .await
            .map_err(|e| not_found_or_io(e, filename))?;

        let stat = self.stat(filename).await?;
        Ok(StoredFile {
            filename: filename.to_string(),
            path,
            size: stat.size,
            modified: stat.modified,
        })
    }

    /// Remove a partial file after a failed download.
    pub async fn discard_partial(&self, filename: &str, token: &str) -> Result<DeleteOutcome> {
        self.delete(&partial_name(filename, token)).await
    }
}

fn partial_name(filename: &str, token: &str) -> String {
    format!("{filename}.{token}{PARTIAL_SUFFIX}")
}

fn not_found_or_io(e: std::io::Error, filename: &str) -> Error {
    if e.kind() == ErrorKind::NotFound {
        Error::not_found(filename)
    } else {
        Error::Io(e)
    }
}
