//! Background dispatch of replication runs.
//!
//! Saves call [`ReplicationScheduler::trigger`] and return immediately. A
//! single worker performs the runs; triggers that arrive while a run is in
//! flight collapse into one follow-up run.

use crate::replication::{ReplicationJob, ReplicationReport};
use chrono::{DateTime, Utc};
use fondita_core::error::{FonditaError, Result};
use fondita_core::publish::PublishOutcome;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncState {
    Idle,
    Queued,
    Running,
    Published,
    NoChanges,
    Failed,
}

/// Outcome of the most recent replication, as served by `/api/sync-status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub enabled: bool,
    pub state: SyncState,
    pub last_error: Option<String>,
    pub last_finished_at: Option<DateTime<Utc>>,
    pub last_commit: Option<String>,
}

impl SyncStatus {
    fn initial(enabled: bool) -> Self {
        Self {
            enabled,
            state: SyncState::Idle,
            last_error: None,
            last_finished_at: None,
            last_commit: None,
        }
    }
}

struct Inner {
    job: Arc<ReplicationJob>,
    status: RwLock<SyncStatus>,
    wake: Notify,
    /// A trigger arrived while a run was in flight. Only touched under the
    /// `status` write lock.
    follow_up: AtomicBool,
}

impl Inner {
    fn new(job: Arc<ReplicationJob>) -> Self {
        Self {
            job,
            status: RwLock::new(SyncStatus::initial(true)),
            wake: Notify::new(),
            follow_up: AtomicBool::new(false),
        }
    }

    async fn set_state(&self, state: SyncState) {
        self.status.write().await.state = state;
    }

    async fn execute(&self) -> Result<ReplicationReport> {
        self.set_state(SyncState::Running).await;
        let result = self.job.run().await;

        let mut status = self.status.write().await;
        status.last_finished_at = Some(Utc::now());
        match &result {
            Ok(report) => {
                status.last_error = None;
                match &report.outcome {
                    PublishOutcome::Published { commit } => {
                        status.state = SyncState::Published;
                        status.last_commit = Some(commit.clone());
                    }
                    PublishOutcome::NoChanges => status.state = SyncState::NoChanges,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Replication failed");
                status.state = SyncState::Failed;
                status.last_error = Some(e.to_string());
            }
        }
        if self.follow_up.swap(false, Ordering::Relaxed) {
            status.state = SyncState::Queued;
        }
        result
    }
}

/// Owns the replication worker.
///
/// A disabled scheduler accepts triggers and ignores them.
#[derive(Clone)]
pub struct ReplicationScheduler {
    inner: Option<Arc<Inner>>,
    disabled_status: SyncStatus,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
    cancel: CancellationToken,
}

impl ReplicationScheduler {
    /// Spawns the worker. It stops when `cancel` fires.
    pub fn start(job: Arc<ReplicationJob>, cancel: CancellationToken) -> Self {
        let inner = Arc::new(Inner::new(job));

        let worker_inner = inner.clone();
        let worker_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            tracing::info!("Replication worker started");
            loop {
                tokio::select! {
                    _ = worker_cancel.cancelled() => break,
                    _ = worker_inner.wake.notified() => {
                        // Errors are recorded in the status
                        let _ = worker_inner.execute().await;
                    }
                }
            }
            tracing::info!("Replication worker stopped");
        });

        Self {
            inner: Some(inner),
            disabled_status: SyncStatus::initial(false),
            worker: Arc::new(Mutex::new(Some(handle))),
            cancel,
        }
    }

    pub fn disabled() -> Self {
        Self {
            inner: None,
            disabled_status: SyncStatus::initial(false),
            worker: Arc::new(Mutex::new(None)),
            cancel: CancellationToken::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Requests a run without waiting for it.
    pub async fn trigger(&self) {
        let Some(inner) = &self.inner else {
            tracing::debug!("Replication disabled, trigger ignored");
            return;
        };
        {
            let mut status = inner.status.write().await;
            if status.state == SyncState::Running {
                inner.follow_up.store(true, Ordering::Relaxed);
            } else {
                status.state = SyncState::Queued;
            }
        }
        // At most one stored permit, so bursts coalesce
        inner.wake.notify_one();
    }

    /// Runs replication and waits for the result.
    pub async fn run_now(&self) -> Result<ReplicationReport> {
        match &self.inner {
            Some(inner) => inner.execute().await,
            None => Err(FonditaError::ReplicationUnavailable(
                "replication is disabled".to_string(),
            )),
        }
    }

    pub async fn status(&self) -> SyncStatus {
        match &self.inner {
            Some(inner) => inner.status.read().await.clone(),
            None => self.disabled_status.clone(),
        }
    }

    /// Cancels the worker and waits for an in-flight run to finish.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.worker.lock().await.take() {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::ReplicationSettings;
    use fondita_core::clock::SystemClock;
    use fondita_core::image::UploadPolicy;
    use fondita_core::menu::{MenuDocument, MenuRepository};
    use fondita_infrastructure::{
        FileSystemImageStore, InMemoryPublishRepository, JsonMenuRepository,
    };
    use std::time::Duration;
    use tempfile::TempDir;

    async fn job(temp_dir: &TempDir, tree: &InMemoryPublishRepository) -> Arc<ReplicationJob> {
        let menu = Arc::new(JsonMenuRepository::new(temp_dir.path().join("menu.json")));
        menu.save(&MenuDocument::empty()).await.unwrap();
        let images = Arc::new(
            FileSystemImageStore::new(temp_dir.path().join("img"), UploadPolicy::default())
                .await
                .unwrap(),
        );
        let settings = ReplicationSettings {
            public_dir: temp_dir.path().join("public"),
            static_assets: Vec::new(),
            always_keep_images: Vec::new(),
            week_days: 5,
        };
        Arc::new(ReplicationJob::new(
            Arc::new(tree.clone()),
            menu,
            images,
            settings,
            Arc::new(SystemClock),
        ))
    }

    async fn wait_until<F>(scheduler: &ReplicationScheduler, done: F) -> SyncStatus
    where
        F: Fn(&SyncStatus) -> bool,
    {
        for _ in 0..300 {
            let status = scheduler.status().await;
            if done(&status) {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("scheduler never reached the expected status");
    }

    #[tokio::test]
    async fn test_trigger_runs_in_background() {
        let temp_dir = TempDir::new().unwrap();
        let tree = InMemoryPublishRepository::new();
        let cancel = CancellationToken::new();
        let scheduler = ReplicationScheduler::start(job(&temp_dir, &tree).await, cancel);

        assert_eq!(scheduler.status().await.state, SyncState::Idle);
        scheduler.trigger().await;

        let status = wait_until(&scheduler, |s| s.state == SyncState::Published).await;
        assert!(status.last_commit.is_some());
        assert_eq!(tree.commits().await.len(), 1);

        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_run_now_reports_failures() {
        let temp_dir = TempDir::new().unwrap();
        let tree = InMemoryPublishRepository::new();
        tree.fail_sync_with("offline").await;
        let scheduler =
            ReplicationScheduler::start(job(&temp_dir, &tree).await, CancellationToken::new());

        let err = scheduler.run_now().await.unwrap_err();
        assert!(err.is_replication_failure());

        let status = scheduler.status().await;
        assert_eq!(status.state, SyncState::Failed);
        assert!(status.last_error.unwrap().contains("offline"));

        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_burst_of_triggers_coalesces() {
        let temp_dir = TempDir::new().unwrap();
        let tree = InMemoryPublishRepository::new();
        let scheduler =
            ReplicationScheduler::start(job(&temp_dir, &tree).await, CancellationToken::new());

        for _ in 0..10 {
            scheduler.trigger().await;
        }
        wait_until(&scheduler, |s| s.last_commit.is_some()).await;
        wait_until(&scheduler, |s| {
            matches!(s.state, SyncState::Published | SyncState::NoChanges)
        })
        .await;

        // Unchanged content never produces a second commit
        assert_eq!(tree.commits().await.len(), 1);
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_trigger_during_run_reports_queued_afterwards() {
        let temp_dir = TempDir::new().unwrap();
        let tree = InMemoryPublishRepository::new();
        let inner = Arc::new(Inner::new(job(&temp_dir, &tree).await));
        // No worker, so the follow-up run stays pending
        let scheduler = ReplicationScheduler {
            inner: Some(inner.clone()),
            disabled_status: SyncStatus::initial(false),
            worker: Arc::new(Mutex::new(None)),
            cancel: CancellationToken::new(),
        };

        inner.set_state(SyncState::Running).await;
        scheduler.trigger().await;
        assert_eq!(scheduler.status().await.state, SyncState::Running);

        inner.execute().await.unwrap();
        let status = scheduler.status().await;
        assert_eq!(status.state, SyncState::Queued);
        assert!(status.last_commit.is_some());

        inner.execute().await.unwrap();
        assert_eq!(scheduler.status().await.state, SyncState::NoChanges);
    }

    #[tokio::test]
    async fn test_disabled_scheduler() {
        let scheduler = ReplicationScheduler::disabled();
        scheduler.trigger().await;
        assert!(!scheduler.status().await.enabled);
        assert!(matches!(
            scheduler.run_now().await,
            Err(FonditaError::ReplicationUnavailable(_))
        ));
    }
}
