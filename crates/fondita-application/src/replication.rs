//! Replication of the menu to the production repository.
//!
//! A run rebuilds the production tree from scratch on top of the remote head:
//! generated scripts and snapshots, static assets, and the images the menu
//! needs. Whatever that leaves different from the head is committed.

use crate::render::{is_rewritable_asset, relativize_image_urls, render_artifacts};
use chrono::{DateTime, Utc};
use fondita_core::clock::Clock;
use fondita_core::config::RootConfig;
use fondita_core::error::{FonditaError, Result};
use fondita_core::image::ImageStore;
use fondita_core::menu::{MenuDocument, MenuRepository};
use fondita_core::publish::{PublishOutcome, PublishRepository};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Directory inside the production tree that holds images.
const TREE_IMAGE_DIR: &str = "img";

/// What a run copies besides the generated artifacts.
#[derive(Debug, Clone)]
pub struct ReplicationSettings {
    /// Source directory of the static assets
    pub public_dir: PathBuf,
    /// Asset files copied from `public_dir` into the tree root
    pub static_assets: Vec<String>,
    /// Images never treated as orphans
    pub always_keep_images: Vec<String>,
    pub week_days: usize,
}

impl ReplicationSettings {
    pub fn from_config(config: &RootConfig, public_dir: PathBuf) -> Self {
        Self {
            public_dir,
            static_assets: config.replication.static_assets.clone(),
            always_keep_images: config.replication.always_keep_images.clone(),
            week_days: config.storage.week_days,
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationReport {
    pub outcome: PublishOutcome,
    /// Version token of the published document
    pub version: String,
    pub artifacts_written: usize,
    pub assets_copied: Vec<String>,
    /// Configured assets that were not found in the source directory
    pub assets_missing: Vec<String>,
    pub images_copied: Vec<String>,
    pub images_deleted: Vec<String>,
    pub image_delete_failures: usize,
    /// Image references dropped because the file no longer exists
    pub images_cleared: Vec<String>,
    pub finished_at: DateTime<Utc>,
}

/// Publishes the current menu to the production repository.
///
/// Runs are serialized: a second caller waits for the first to finish.
pub struct ReplicationJob {
    repository: Arc<dyn PublishRepository>,
    menu: Arc<dyn MenuRepository>,
    images: Arc<dyn ImageStore>,
    settings: ReplicationSettings,
    clock: Arc<dyn Clock>,
    run_lock: Mutex<()>,
}

impl ReplicationJob {
    pub fn new(
        repository: Arc<dyn PublishRepository>,
        menu: Arc<dyn MenuRepository>,
        images: Arc<dyn ImageStore>,
        settings: ReplicationSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            menu,
            images,
            settings,
            clock,
            run_lock: Mutex::new(()),
        }
    }

    pub async fn run(&self) -> Result<ReplicationReport> {
        let _guard = self.run_lock.lock().await;
        tracing::info!("Replication started");

        self.repository
            .sync_to_remote_head()
            .await
            .map_err(|e| match e {
                FonditaError::ReplicationUnavailable(_) => e,
                other => FonditaError::ReplicationUnavailable(other.to_string()),
            })?;

        let (mut document, mut existing_images, mut images_cleared) =
            self.load_snapshot().await?;

        // Images go first so one deleted mid-run is dropped from the render
        let mut keep = self.keep_set(&document);
        let (images_copied, vanished) = self.copy_images(&keep, &existing_images).await?;
        if !vanished.is_empty() {
            for name in &vanished {
                existing_images.remove(name);
            }
            images_cleared.extend(document.clear_missing_images(&existing_images));
            keep = self.keep_set(&document);
        }
        let version = document.version();

        let artifacts = render_artifacts(&document)?;
        for artifact in &artifacts {
            self.repository
                .write_file(&artifact.path, &artifact.contents)
                .await?;
        }

        let (assets_copied, assets_missing) = self.copy_static_assets().await?;
        let (images_deleted, image_delete_failures) = self.delete_orphans(&keep).await?;

        let message = format!(
            "Actualización automática: {}",
            self.clock.now().format("%Y-%m-%d %H:%M:%S UTC")
        );
        let outcome = self.repository.commit_and_push_if_dirty(&message).await?;

        let report = ReplicationReport {
            outcome,
            version,
            artifacts_written: artifacts.len(),
            assets_copied,
            assets_missing,
            images_copied,
            images_deleted,
            image_delete_failures,
            images_cleared,
            finished_at: self.clock.now(),
        };

        match &report.outcome {
            PublishOutcome::Published { commit } => tracing::info!(
                commit = %commit,
                images_copied = report.images_copied.len(),
                images_deleted = report.images_deleted.len(),
                "Replication published"
            ),
            PublishOutcome::NoChanges => tracing::info!("Replication found nothing to publish"),
        }
        Ok(report)
    }

    /// Loads and normalizes the document, clearing dangling image references.
    async fn load_snapshot(&self) -> Result<(MenuDocument, BTreeSet<String>, Vec<String>)> {
        let mut document = self
            .menu
            .load()
            .await
            .map_err(|e| FonditaError::SourceDataUnavailable(e.to_string()))?;
        document.normalize(self.settings.week_days);

        let existing = self
            .images
            .list()
            .await
            .map_err(|e| FonditaError::SourceDataUnavailable(e.to_string()))?;
        let cleared = document.clear_missing_images(&existing);
        for image in &cleared {
            tracing::warn!(image = %image, "Publishing day without its missing image");
        }
        Ok((document, existing, cleared))
    }

    /// Referenced images plus the always-kept set.
    fn keep_set(&self, document: &MenuDocument) -> BTreeSet<String> {
        let mut keep = document.referenced_images();
        keep.extend(self.settings.always_keep_images.iter().cloned());
        keep
    }

    async fn copy_static_assets(&self) -> Result<(Vec<String>, Vec<String>)> {
        let mut copied = Vec::new();
        let mut missing = Vec::new();

        for asset in &self.settings.static_assets {
            let source = self.settings.public_dir.join(asset);
            let bytes = match tokio::fs::read(&source).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::warn!(asset = %asset, "Static asset not found, skipping");
                    missing.push(asset.clone());
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let bytes = if is_rewritable_asset(asset) {
                match String::from_utf8(bytes) {
                    Ok(text) => relativize_image_urls(&text).into_bytes(),
                    Err(raw) => raw.into_bytes(),
                }
            } else {
                bytes
            };

            self.repository.write_file(asset, &bytes).await?;
            copied.push(asset.clone());
        }
        Ok((copied, missing))
    }

    /// Copies keep-set images that are absent from the tree or older there.
    ///
    /// Returns the copied names and the names that disappeared from the
    /// image store since it was listed.
    async fn copy_images(
        &self,
        keep: &BTreeSet<String>,
        existing: &BTreeSet<String>,
    ) -> Result<(Vec<String>, Vec<String>)> {
        let mut copied = Vec::new();
        let mut vanished = Vec::new();
        for name in keep.iter().filter(|name| existing.contains(*name)) {
            let dest = format!("{}/{}", TREE_IMAGE_DIR, name);
            let Some(source_modified) = self.images.modified_at(name).await? else {
                tracing::warn!(image = %name, "Image removed during replication, skipping");
                vanished.push(name.clone());
                continue;
            };
            let dest_modified = self.repository.modified_at(&dest).await?;
            if dest_modified.is_some_and(|dest| dest >= source_modified) {
                continue;
            }

            let bytes = match self.images.read(name).await {
                Ok(bytes) => bytes,
                Err(e) if e.is_not_found() => {
                    tracing::warn!(image = %name, "Image removed during replication, skipping");
                    vanished.push(name.clone());
                    continue;
                }
                Err(e) => return Err(e),
            };
            self.repository.write_file(&dest, &bytes).await?;
            tracing::debug!(image = %name, "Image copied to production tree");
            copied.push(name.clone());
        }
        Ok((copied, vanished))
    }

    /// Deletes tree images outside the keep-set. Failures are only counted.
    async fn delete_orphans(&self, keep: &BTreeSet<String>) -> Result<(Vec<String>, usize)> {
        let mut deleted = Vec::new();
        let mut failures = 0;

        for name in self.repository.list_files(TREE_IMAGE_DIR).await? {
            if keep.contains(&name) {
                continue;
            }
            let path = format!("{}/{}", TREE_IMAGE_DIR, name);
            match self.repository.delete_file(&path).await {
                Ok(()) => {
                    tracing::debug!(image = %name, "Orphan image deleted");
                    deleted.push(name);
                }
                Err(e) => {
                    tracing::warn!(image = %name, error = %e, "Could not delete orphan image");
                    failures += 1;
                }
            }
        }
        Ok((deleted, failures))
    }
}
