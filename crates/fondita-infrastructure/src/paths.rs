//! Unified path management for Fondita's on-disk layout.
//!
//! Every location comes from [`StorageConfig`] and [`ReplicationConfig`];
//! relative entries are resolved against `storage.root`.
//!
//! # Directory Structure
//!
//! ```text
//! <root>/
//! ├── data/menu.json           # Menu document
//! ├── img/                     # Uploaded images
//! ├── public/                  # Admin and public static site
//! └── production-repo/         # Working tree of the production repository
//! ```

use fondita_core::config::{ReplicationConfig, StorageConfig};
use std::path::{Path, PathBuf};

/// Resolved filesystem locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FonditaPaths {
    root: PathBuf,
    menu_file: PathBuf,
    image_dir: PathBuf,
    public_dir: PathBuf,
    working_tree: PathBuf,
}

impl FonditaPaths {
    pub fn new(storage: &StorageConfig, replication: &ReplicationConfig) -> Self {
        let root = storage.root.clone();
        Self {
            menu_file: resolve(&root, &storage.menu_file),
            image_dir: resolve(&root, &storage.image_dir),
            public_dir: resolve(&root, &storage.public_dir),
            working_tree: resolve(&root, &replication.working_tree),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn menu_file(&self) -> &Path {
        &self.menu_file
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    pub fn working_tree(&self) -> &Path {
        &self.working_tree
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
