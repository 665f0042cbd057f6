//! Image store contract.
//!
//! Uploaded day images live in a flat directory and are referenced from the
//! menu document by bare filename.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Default maximum upload size (2 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 2 * 1024 * 1024;

/// Extensions accepted for uploads.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png"];

/// Content types accepted for uploads.
pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png"];

/// Upload limits applied by an [`ImageStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Returns true when `name` is a plain filename with no directory parts.
///
/// Image references come from clients, so anything that could walk out of the
/// image directory is refused.
pub fn is_bare_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// An abstract store for uploaded images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Validates and stores an upload, returning the generated filename.
    ///
    /// # Errors
    ///
    /// - `UnsupportedMediaType` when the extension or declared type is not an
    ///   allowed image type, or when the two disagree
    /// - `PayloadTooLarge` above the policy limit; nothing is written
    async fn put(&self, bytes: &[u8], original_name: &str, declared_mime: &str) -> Result<String>;

    /// Removes an image. A missing file is not an error.
    async fn remove(&self, filename: &str) -> Result<()>;

    /// Lists the filenames currently stored.
    async fn list(&self) -> Result<BTreeSet<String>>;

    async fn exists(&self, filename: &str) -> Result<bool>;

    async fn read(&self, filename: &str) -> Result<Vec<u8>>;

    /// Last modification time, or `None` when the file does not exist.
    async fn modified_at(&self, filename: &str) -> Result<Option<DateTime<Utc>>>;
}
