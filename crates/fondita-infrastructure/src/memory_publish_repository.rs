//! In-memory [`PublishRepository`] used by tests and dry runs.
//!
//! Files live in a map; a "commit" snapshots the map when it differs from the
//! previous snapshot. Failures can be injected to exercise error paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fondita_core::error::{FonditaError, Result};
use fondita_core::publish::{PublishOutcome, PublishRepository};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// A recorded commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommit {
    pub id: String,
    pub message: String,
    pub files: BTreeMap<String, Vec<u8>>,
}

#[derive(Debug, Default)]
struct TreeState {
    files: BTreeMap<String, (Vec<u8>, DateTime<Utc>)>,
    commits: Vec<RecordedCommit>,
    fail_sync: Option<String>,
    failing_pushes: usize,
    push_attempts: usize,
}

impl TreeState {
    fn head_files(&self) -> BTreeMap<String, Vec<u8>> {
        self.commits
            .last()
            .map(|commit| commit.files.clone())
            .unwrap_or_default()
    }

    fn current_files(&self) -> BTreeMap<String, Vec<u8>> {
        self.files
            .iter()
            .map(|(path, (bytes, _))| (path.clone(), bytes.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryPublishRepository {
    state: Arc<Mutex<TreeState>>,
}

impl InMemoryPublishRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the "remote" with an initial commit holding `files`.
    pub async fn seed(&self, files: impl IntoIterator<Item = (&str, &[u8])>) {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let files: BTreeMap<String, Vec<u8>> = files
            .into_iter()
            .map(|(path, bytes)| (path.to_string(), bytes.to_vec()))
            .collect();
        state.files = files
            .iter()
            .map(|(path, bytes)| (path.clone(), (bytes.clone(), now)))
            .collect();
        state.commits.push(RecordedCommit {
            id: Uuid::new_v4().simple().to_string(),
            message: "seed".to_string(),
            files,
        });
    }

    /// Makes the next `sync_to_remote_head` calls fail with `message`.
    pub async fn fail_sync_with(&self, message: impl Into<String>) {
        self.state.lock().await.fail_sync = Some(message.into());
    }

    /// Makes the next `count` push attempts fail.
    pub async fn fail_pushes(&self, count: usize) {
        self.state.lock().await.failing_pushes = count;
    }

    pub async fn commits(&self) -> Vec<RecordedCommit> {
        self.state.lock().await.commits.clone()
    }

    pub async fn push_attempts(&self) -> usize {
        self.state.lock().await.push_attempts
    }

    /// Current contents of `path` in the working tree.
    pub async fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .await
            .files
            .get(path)
            .map(|(bytes, _)| bytes.clone())
    }
}

#[async_trait]
impl PublishRepository for InMemoryPublishRepository {
    async fn sync_to_remote_head(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(message) = state.fail_sync.clone() {
            return Err(FonditaError::ReplicationUnavailable(message));
        }

        // Keep timestamps of files whose content matches the head
        let head = state.head_files();
        let now = Utc::now();
        let previous = std::mem::take(&mut state.files);
        state.files = head
            .into_iter()
            .map(|(path, bytes)| {
                let modified = match previous.get(&path) {
                    Some((old, modified)) if *old == bytes => *modified,
                    _ => now,
                };
                (path, (bytes, modified))
            })
            .collect();
        Ok(())
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .files
            .insert(path.to_string(), (contents.to_vec(), Utc::now()));
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<()> {
        self.state.lock().await.files.remove(path);
        Ok(())
    }

    async fn list_files(&self, dir: &str) -> Result<BTreeSet<String>> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        let state = self.state.lock().await;
        Ok(state
            .files
            .keys()
            .filter_map(|path| path.strip_prefix(&prefix))
            .filter(|name| !name.contains('/') && !name.starts_with('.'))
            .map(str::to_string)
            .collect())
    }

    async fn modified_at(&self, path: &str) -> Result<Option<DateTime<Utc>>> {
        let state = self.state.lock().await;
        Ok(state.files.get(path).map(|(_, modified)| *modified))
    }

    async fn commit_and_push_if_dirty(&self, message: &str) -> Result<PublishOutcome> {
        let mut state = self.state.lock().await;
        let current = state.current_files();
        if current == state.head_files() {
            return Ok(PublishOutcome::NoChanges);
        }

        // Push is tried twice before giving up
        let mut pushed = false;
        for _ in 0..2 {
            state.push_attempts += 1;
            if state.failing_pushes > 0 {
                state.failing_pushes -= 1;
            } else {
                pushed = true;
                break;
            }
        }
        if !pushed {
            return Err(FonditaError::PublishFailed("push rejected".to_string()));
        }

        let id = Uuid::new_v4().simple().to_string();
        state.commits.push(RecordedCommit {
            id: id.clone(),
            message: message.to_string(),
            files: current,
        });
        Ok(PublishOutcome::Published { commit: id })
    }
}
