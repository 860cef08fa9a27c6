//! One pass of the retention sweep.

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use vidrelay_common::Result;
use vidrelay_store::{DeleteOutcome, FileStore, StoredFile};

/// Files deleted concurrently within one pass.
const SWEEP_CONCURRENCY: usize = 8;

/// Counters for a single sweep pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Files examined.
    pub scanned: usize,
    /// Expired files removed by this pass.
    pub deleted: usize,
    /// Expired files that were already gone when deletion was attempted.
    pub already_gone: usize,
    /// Files younger than the TTL.
    pub skipped: usize,
    /// Expired files that could not be removed.
    pub failed: usize,
}

/// What happened when a deletion trigger fired for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionResult {
    Deleted,
    AlreadyGone,
    Failed,
}

/// Delete one file on behalf of a retention trigger.
///
/// Never returns an error: a missing file is the expected outcome when the
/// other trigger got there first, and I/O failures are logged and left for
/// the next sweep.
pub async fn delete_expired(store: &FileStore, filename: &str, trigger: &str) -> DeletionResult {
    match store.delete(filename).await {
        Ok(DeleteOutcome::Deleted) => {
            tracing::info!(filename, trigger, "Deleted expired file");
            DeletionResult::Deleted
        }
        Ok(DeleteOutcome::NotFound) => {
            tracing::debug!(filename, trigger, "Expired file already removed");
            DeletionResult::AlreadyGone
        }
        Err(e) => {
            tracing::warn!(filename, trigger, error = %e, "Failed to delete expired file");
            DeletionResult::Failed
        }
    }
}

/// Whether a file modified at `file.modified` has outlived `ttl` at `now`.
pub fn is_expired(file: &StoredFile, ttl: Duration, now: DateTime<Utc>) -> bool {
    match chrono::Duration::from_std(ttl) {
        Ok(ttl) => file.age(now) > ttl,
        Err(_) => false,
    }
}

/// Scan the store once and delete every file older than `ttl`.
///
/// Files are evaluated independently: a slow or failing delete does not
/// hold back the others. Only a failure to list the directory is returned.
pub async fn sweep_expired(
    store: &FileStore,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<SweepReport> {
    let files = store.list().await?;

    let mut report = SweepReport {
        scanned: files.len(),
        ..SweepReport::default()
    };

    let (expired, fresh): (Vec<_>, Vec<_>) =
        files.into_iter().partition(|f| is_expired(f, ttl, now));
    report.skipped = fresh.len();

    let results: Vec<DeletionResult> = stream::iter(expired)
        .map(|file| async move { delete_expired(store, &file.filename, "sweep").await })
        .buffer_unordered(SWEEP_CONCURRENCY)
        .collect()
        .await;

    for result in results {
        match result {
            DeletionResult::Deleted => report.deleted += 1,
            DeletionResult::AlreadyGone => report.already_gone += 1,
            DeletionResult::Failed => report.failed += 1,
        }
    }

    Ok(report)
}

/// Time from `now` until the next multiple of `interval` since the epoch.
///
/// With an hourly interval this is the top of the next hour. Exactly on a
/// boundary the delay is zero.
pub fn delay_until_next_boundary(now: DateTime<Utc>, interval: Duration) -> Duration {
    let interval_ms = interval.as_millis().max(1) as i64;
    let elapsed = now.timestamp_millis().rem_euclid(interval_ms);
    if elapsed == 0 {
        Duration::ZERO
    } else {
        Duration::from_millis((interval_ms - elapsed) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const DAY: Duration = Duration::from_secs(24 * 3600);

    fn store_with(names: &[&str]) -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            std::fs::write(dir.path().join(name), b"data").unwrap();
        }
        let store = FileStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_sweep_keeps_fresh_files() {
        let (_dir, store) = store_with(&["a.mp4", "b.mp4"]);

        let report = sweep_expired(&store, DAY, Utc::now()).await.unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.deleted, 0);
        assert!(store.exists("a.mp4").await);
    }

    #[tokio::test]
    async fn test_sweep_removes_file_after_ttl() {
        let (_dir, store) = store_with(&["clip.mp4"]);
        let registered = store.stat("clip.mp4").await.unwrap().modified;

        // One hourly pass after t0 + 24h must catch it.
        let now = registered + chrono::Duration::hours(25);
        let report = sweep_expired(&store, DAY, now).await.unwrap();

        assert_eq!(report.deleted, 1);
        assert!(!store.exists("clip.mp4").await);
    }

    #[tokio::test]
    async fn test_sweep_age_must_exceed_ttl() {
        let (_dir, store) = store_with(&["clip.mp4"]);
        let modified = store.stat("clip.mp4").await.unwrap().modified;

        let report = sweep_expired(&store, DAY, modified + chrono::Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(report.skipped, 1);
        assert!(store.exists("clip.mp4").await);
    }

    #[tokio::test]
    async fn test_sweep_removes_stale_partials() {
        let (_dir, store) = store_with(&["clip.mp4.part"]);
        let now = Utc::now() + chrono::Duration::hours(48);

        let report = sweep_expired(&store, DAY, now).await.unwrap();
        assert_eq!(report.deleted, 1);
    }

    #[tokio::test]
    async fn test_sweep_on_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("gone"));

        let report = sweep_expired(&store, DAY, Utc::now()).await.unwrap();
        assert_eq!(report, SweepReport::default());
    }

    #[tokio::test]
    async fn test_delete_expired_is_idempotent() {
        let (_dir, store) = store_with(&["clip.mp4"]);

        assert_eq!(
            delete_expired(&store, "clip.mp4", "one-shot").await,
            DeletionResult::Deleted
        );
        assert_eq!(
            delete_expired(&store, "clip.mp4", "sweep").await,
            DeletionResult::AlreadyGone
        );
        assert_eq!(
            delete_expired(&store, "never-existed.mp4", "sweep").await,
            DeletionResult::AlreadyGone
        );
    }

    #[tokio::test]
    async fn test_delete_expired_invalid_name_fails_softly() {
        let (_dir, store) = store_with(&[]);
        assert_eq!(
            delete_expired(&store, "../escape.mp4", "one-shot").await,
            DeletionResult::Failed
        );
    }

    #[test]
    fn test_delay_until_top_of_hour() {
        let hour = Duration::from_secs(3600);

        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 15, 0).unwrap();
        assert_eq!(
            delay_until_next_boundary(now, hour),
            Duration::from_secs(45 * 60)
        );

        let on_the_hour = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();
        assert_eq!(delay_until_next_boundary(on_the_hour, hour), Duration::ZERO);

        let just_after = on_the_hour + chrono::Duration::milliseconds(1);
        assert_eq!(
            delay_until_next_boundary(just_after, hour),
            Duration::from_millis(3_599_999)
        );
    }
}
