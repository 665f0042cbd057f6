//! JSON file-based MenuRepository implementation.

use crate::storage::AtomicJsonFile;
use async_trait::async_trait;
use fondita_core::error::{FonditaError, Result};
use fondita_core::menu::{MenuDocument, MenuRepository};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A repository implementation that stores the menu document as a single
/// pretty-printed JSON file.
///
/// Writes are serialized in-process by an async mutex and across processes by
/// the file lock inside [`AtomicJsonFile`]. Readers never take the mutex: the
/// rename in `save` guarantees they see either the old or the new document.
#[derive(Clone)]
pub struct JsonMenuRepository {
    file: Arc<AtomicJsonFile<MenuDocument>>,
    write_lock: Arc<Mutex<()>>,
}

impl JsonMenuRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Arc::new(AtomicJsonFile::new(path.into())),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[async_trait]
impl MenuRepository for JsonMenuRepository {
    async fn load(&self) -> Result<MenuDocument> {
        let file = self.file.clone();
        let loaded = tokio::task::spawn_blocking(move || file.load())
            .await
            .map_err(|e| FonditaError::internal(format!("Failed to join task: {}", e)))??;

        loaded.ok_or_else(|| {
            FonditaError::not_found("MenuDocument", self.file.path().display().to_string())
        })
    }

    async fn save(&self, document: &MenuDocument) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let file = self.file.clone();
        let document = document.clone();
        tokio::task::spawn_blocking(move || file.save(&document))
            .await
            .map_err(|e| FonditaError::internal(format!("Failed to join task: {}", e)))??;

        tracing::debug!(path = %self.file.path().display(), "Menu document saved");
        Ok(())
    }
}
