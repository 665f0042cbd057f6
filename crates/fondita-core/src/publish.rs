//! Production repository abstraction.
//!
//! The replication job publishes the static site by mutating a working tree
//! and committing it. This trait isolates that policy from any particular
//! version-control tool so the job can run against an in-memory fake.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// Result of [`PublishRepository::commit_and_push_if_dirty`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum PublishOutcome {
    /// The tree had no net changes; nothing was committed.
    NoChanges,
    /// A commit was created and pushed.
    Published { commit: String },
}

impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

/// A working tree mirroring the production site.
///
/// All paths are relative to the tree root and use `/` separators.
#[async_trait]
pub trait PublishRepository: Send + Sync {
    /// Brings the tree to the remote's current head, discarding local drift.
    ///
    /// Clones on first use. Failures map to `ReplicationUnavailable`.
    async fn sync_to_remote_head(&self) -> Result<()>;

    /// Writes `contents` to `path`, creating parent directories.
    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<()>;

    /// Deletes `path`. A missing file is not an error.
    async fn delete_file(&self, path: &str) -> Result<()>;

    /// Lists the file names directly inside `dir`. A missing directory is empty.
    async fn list_files(&self, dir: &str) -> Result<BTreeSet<String>>;

    /// Last modification time of `path`, or `None` when it does not exist.
    async fn modified_at(&self, path: &str) -> Result<Option<DateTime<Utc>>>;

    /// Stages everything; commits and pushes only when something changed.
    ///
    /// Failures map to `PublishFailed`.
    async fn commit_and_push_if_dirty(&self, message: &str) -> Result<PublishOutcome>;
}
