//! Retention scheduler: one-shot deletions plus the recurring sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use vidrelay_store::FileStore;

use super::sweep::{delay_until_next_boundary, delete_expired, sweep_expired, SweepReport};
use crate::config::StorageConfig;

/// How long files live and how often the store is swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub ttl: Duration,
    pub sweep_interval: Duration,
}

impl From<&StorageConfig> for RetentionPolicy {
    fn from(config: &StorageConfig) -> Self {
        Self {
            ttl: config.ttl(),
            sweep_interval: config.sweep_interval(),
        }
    }
}

/// A one-shot deletion waiting for its fire time.
#[derive(Debug, Clone, Serialize)]
pub struct PendingDeletion {
    pub id: Uuid,
    pub filename: String,
    pub registered_at: DateTime<Utc>,
    pub fire_at: DateTime<Utc>,
}

struct Lifecycle {
    /// Cancelled by `stop()`; shared by the sweep loop and every one-shot task.
    cancel: CancellationToken,
    sweep: Option<JoinHandle<()>>,
}

struct Inner {
    store: FileStore,
    policy: RetentionPolicy,
    pending: DashMap<Uuid, PendingDeletion>,
    lifecycle: Mutex<Lifecycle>,
}

/// Deletes stored files once they outlive the TTL.
///
/// Two independent triggers target the same files and may race:
/// - a one-shot deletion registered when a file is stored, and
/// - a sweep on a fixed cadence that removes anything older than the TTL.
///
/// Whichever fires second finds the file gone and only logs it.
#[derive(Clone)]
pub struct RetentionScheduler {
    inner: Arc<Inner>,
}

impl RetentionScheduler {
    pub fn new(store: FileStore, policy: RetentionPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                policy,
                pending: DashMap::new(),
                lifecycle: Mutex::new(Lifecycle {
                    cancel: CancellationToken::new(),
                    sweep: None,
                }),
            }),
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.inner.policy
    }

    /// Start the recurring sweep.
    ///
    /// Returns `false` without doing anything when the sweep is already
    /// running.
    pub fn start(&self) -> bool {
        let mut lifecycle = self.inner.lifecycle.lock();
        if lifecycle.sweep.as_ref().is_some_and(|h| !h.is_finished()) {
            tracing::debug!("Retention sweep already running");
            return false;
        }

        let inner = self.inner.clone();
        let cancel = lifecycle.cancel.clone();
        lifecycle.sweep = Some(tokio::spawn(run_sweep_loop(inner, cancel)));

        tracing::info!(
            ttl_secs = self.inner.policy.ttl.as_secs(),
            interval_secs = self.inner.policy.sweep_interval.as_secs(),
            "Retention scheduler started"
        );
        true
    }

    /// Stop the sweep and drop every pending one-shot deletion.
    ///
    /// Files whose one-shot deletion is dropped are still caught by the
    /// sweep after the next `start()`. Waits for the sweep task to exit.
    pub async fn stop(&self) {
        let sweep = {
            let mut lifecycle = self.inner.lifecycle.lock();
            lifecycle.cancel.cancel();
            lifecycle.cancel = CancellationToken::new();
            lifecycle.sweep.take()
        };

        let dropped = self.inner.pending.len();
        self.inner.pending.clear();

        if let Some(handle) = sweep {
            if let Err(e) = handle.await {
                tracing::warn!("Retention sweep task ended abnormally: {}", e);
            }
        }

        tracing::info!(dropped_pending = dropped, "Retention scheduler stopped");
    }

    /// Whether the recurring sweep is running.
    pub fn is_running(&self) -> bool {
        self.inner
            .lifecycle
            .lock()
            .sweep
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Register a freshly stored file: delete it once the TTL has elapsed.
    ///
    /// There is no way to cancel an individual deletion; re-registering the
    /// same filename schedules a second one and both fire.
    pub fn schedule_deletion(&self, filename: &str) -> Uuid {
        let id = Uuid::new_v4();
        let ttl = self.inner.policy.ttl;
        let registered_at = Utc::now();
        let fire_at = fire_time(registered_at, ttl);

        // Token first: a `stop()` that lands before the insert cancels this
        // task, which then removes its own entry.
        let cancel = self.inner.lifecycle.lock().cancel.clone();

        self.inner.pending.insert(
            id,
            PendingDeletion {
                id,
                filename: filename.to_string(),
                registered_at,
                fire_at,
            },
        );

        tracing::debug!(task_id = %id, filename, fire_at = %fire_at, "Scheduled one-shot deletion");

        let inner = self.inner.clone();
        let filename = filename.to_string();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(ttl) => {
                    delete_expired(&inner.store, &filename, "one-shot").await;
                }
                _ = cancel.cancelled() => {
                    tracing::debug!(filename = %filename, "One-shot deletion cancelled");
                }
            }
            inner.pending.remove(&id);
        });

        id
    }

    /// Pending one-shot deletions, soonest first.
    pub fn pending(&self) -> Vec<PendingDeletion> {
        let mut pending: Vec<_> = self
            .inner
            .pending
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        pending.sort_by_key(|p| p.fire_at);
        pending
    }

    /// Run one sweep pass now, outside the regular cadence.
    pub async fn sweep_now(&self) -> vidrelay_common::Result<SweepReport> {
        sweep_expired(&self.inner.store, self.inner.policy.ttl, Utc::now()).await
    }
}

/// `registered_at + ttl`, saturating at the latest representable time.
fn fire_time(registered_at: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| registered_at.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Sweep on every interval boundary until cancelled.
///
/// Ticks never queue up behind a slow pass: missed ticks are skipped.
async fn run_sweep_loop(inner: Arc<Inner>, cancel: CancellationToken) {
    let interval = inner.policy.sweep_interval.max(Duration::from_millis(1));
    let first = Instant::now() + delay_until_next_boundary(Utc::now(), interval);

    let mut ticker = tokio::time::interval_at(first, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancel.cancelled() => break,
        }

        match sweep_expired(&inner.store, inner.policy.ttl, Utc::now()).await {
            Ok(report) if report.deleted > 0 || report.failed > 0 => {
                tracing::info!(
                    scanned = report.scanned,
                    deleted = report.deleted,
                    already_gone = report.already_gone,
                    failed = report.failed,
                    "Retention sweep finished"
                );
            }
            Ok(report) => {
                tracing::debug!(scanned = report.scanned, "Retention sweep found nothing to delete");
            }
            Err(e) => {
                tracing::warn!("Retention sweep could not list the store: {}", e);
            }
        }
    }

    tracing::debug!("Retention sweep loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(names: &[&str]) -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            std::fs::write(dir.path().join(name), b"data").unwrap();
        }
        let store = FileStore::new(dir.path());
        (dir, store)
    }

    fn policy(ttl: Duration) -> RetentionPolicy {
        RetentionPolicy {
            ttl,
            sweep_interval: Duration::from_secs(3600),
        }
    }

    async fn wait_until_gone(store: &FileStore, name: &str) -> bool {
        for _ in 0..100 {
            if !store.exists(name).await {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_one_shot_deletes_after_ttl() {
        let (_dir, store) = store_with(&["clip.mp4"]);
        let scheduler = RetentionScheduler::new(store.clone(), policy(Duration::from_millis(50)));

        let id = scheduler.schedule_deletion("clip.mp4");
        assert_eq!(scheduler.pending().len(), 1);
        assert_eq!(scheduler.pending()[0].id, id);
        assert!(store.exists("clip.mp4").await);

        assert!(wait_until_gone(&store, "clip.mp4").await);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(scheduler.pending().is_empty());
    }

    #[tokio::test]
    async fn test_one_shot_tolerates_missing_file() {
        let (_dir, store) = store_with(&[]);
        let scheduler = RetentionScheduler::new(store, policy(Duration::from_millis(10)));

        scheduler.schedule_deletion("never-existed.mp4");
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(scheduler.pending().is_empty());
    }

    #[tokio::test]
    async fn test_sweep_then_one_shot() {
        let (_dir, store) = store_with(&["clip.mp4"]);
        let scheduler = RetentionScheduler::new(store.clone(), policy(Duration::from_millis(100)));

        scheduler.schedule_deletion("clip.mp4");
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Sweep wins the race; one-shot then finds nothing.
        let now = Utc::now() + chrono::Duration::hours(1);
        let report = sweep_expired(&store, Duration::from_millis(100), now)
            .await
            .unwrap();
        assert_eq!(report.deleted, 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!store.exists("clip.mp4").await);
        assert!(scheduler.pending().is_empty());
    }

    #[tokio::test]
    async fn test_one_shot_then_sweep() {
        let (_dir, store) = store_with(&["clip.mp4"]);
        let scheduler = RetentionScheduler::new(store.clone(), policy(Duration::from_millis(10)));

        scheduler.schedule_deletion("clip.mp4");
        assert!(wait_until_gone(&store, "clip.mp4").await);

        let report = scheduler.sweep_now().await.unwrap();
        assert_eq!(report.scanned, 0);
        assert!(!store.exists("clip.mp4").await);
    }

    #[tokio::test]
    async fn test_start_is_idempotent_and_stop_cancels() {
        let (_dir, store) = store_with(&["clip.mp4"]);
        let scheduler = RetentionScheduler::new(store.clone(), policy(Duration::from_secs(3600)));

        assert!(scheduler.start());
        assert!(!scheduler.start());
        assert!(scheduler.is_running());

        scheduler.schedule_deletion("clip.mp4");
        assert_eq!(scheduler.pending().len(), 1);

        scheduler.stop().await;
        assert!(!scheduler.is_running());
        assert!(scheduler.pending().is_empty());
        assert!(store.exists("clip.mp4").await);

        // Can be started again after a stop.
        assert!(scheduler.start());
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_stop_prevents_one_shot_from_firing() {
        let (_dir, store) = store_with(&["clip.mp4"]);
        let scheduler = RetentionScheduler::new(store.clone(), policy(Duration::from_millis(50)));

        scheduler.schedule_deletion("clip.mp4");
        scheduler.stop().await;

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(store.exists("clip.mp4").await);
    }

    #[tokio::test]
    async fn test_scheduling_after_stop_is_tracked_and_fires() {
        let (_dir, store) = store_with(&["old.mp4", "new.mp4"]);
        let scheduler = RetentionScheduler::new(store.clone(), policy(Duration::from_millis(50)));

        scheduler.schedule_deletion("old.mp4");
        scheduler.stop().await;

        let id = scheduler.schedule_deletion("new.mp4");
        let pending = scheduler.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);

        assert!(wait_until_gone(&store, "new.mp4").await);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(scheduler.pending().is_empty());
        assert!(store.exists("old.mp4").await);
    }

    #[test]
    fn test_fire_time() {
        let now = Utc::now();
        assert_eq!(
            fire_time(now, Duration::from_secs(3600)),
            now + chrono::Duration::hours(1)
        );
        assert_eq!(fire_time(now, Duration::MAX), DateTime::<Utc>::MAX_UTC);
    }

    #[tokio::test]
    async fn test_sweep_loop_runs_on_boundary() {
        let (_dir, store) = store_with(&["clip.mp4"]);
        // 1 ms TTL, 50 ms cadence: the first boundary is at most 50 ms away.
        let scheduler = RetentionScheduler::new(
            store.clone(),
            RetentionPolicy {
                ttl: Duration::from_millis(1),
                sweep_interval: Duration::from_millis(50),
            },
        );

        tokio::time::sleep(Duration::from_millis(5)).await;
        scheduler.start();
        assert!(wait_until_gone(&store, "clip.mp4").await);
        scheduler.stop().await;
    }
}
