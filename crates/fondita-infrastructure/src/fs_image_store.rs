//! File system-based image store.
//!
//! Uploaded images live flat in a single directory (normally `<root>/img`).
//! The same directory is served under `/img` and copied into the production
//! tree by the replication job.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fondita_core::error::{FonditaError, Result};
use fondita_core::image::{
    ALLOWED_EXTENSIONS, ALLOWED_MIME_TYPES, ImageStore, UploadPolicy, is_bare_filename,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Infers the MIME type from a filename extension using the `mime_guess` library.
fn infer_mime_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .to_string()
}

/// Lower-cased extension of `name`, if it has one.
fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Strips parameters (`image/png; charset=...`) and normalizes case.
fn essence_of(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Checks the extension and declared type of an upload.
///
/// Returns the lower-cased extension to store the file under.
fn check_media_type(original_name: &str, declared_mime: &str) -> Result<String> {
    let extension = extension_of(original_name)
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .ok_or_else(|| {
            FonditaError::UnsupportedMediaType(format!(
                "'{}' is not a JPEG or PNG file",
                original_name
            ))
        })?;

    let declared = essence_of(declared_mime);
    if !ALLOWED_MIME_TYPES.contains(&declared.as_str()) {
        return Err(FonditaError::UnsupportedMediaType(format!(
            "content type '{}' is not allowed",
            declared_mime
        )));
    }

    // jpg and jpeg both guess to image/jpeg
    let guessed = infer_mime_type(&format!("upload.{}", extension));
    if guessed != declared {
        return Err(FonditaError::UnsupportedMediaType(format!(
            "extension '.{}' does not match content type '{}'",
            extension, declared
        )));
    }

    Ok(extension)
}

fn generate_filename(extension: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}.{}", millis, &suffix[..8], extension)
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Image store backed by a directory on the local file system.
#[derive(Debug, Clone)]
pub struct FileSystemImageStore {
    root_dir: PathBuf,
    policy: UploadPolicy,
}

impl FileSystemImageStore {
    /// Creates the store, ensuring `root_dir` exists.
    pub async fn new(root_dir: PathBuf, policy: UploadPolicy) -> Result<Self> {
        fs::create_dir_all(&root_dir).await.map_err(|e| {
            FonditaError::io(format!(
                "Failed to create image directory '{}': {}",
                root_dir.display(),
                e
            ))
        })?;

        Ok(Self { root_dir, policy })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn path_for(&self, filename: &str) -> Result<PathBuf> {
        if !is_bare_filename(filename) {
            return Err(FonditaError::validation(format!(
                "'{}' is not a valid image name",
                filename
            )));
        }
        Ok(self.root_dir.join(filename))
    }
}

#[async_trait]
impl ImageStore for FileSystemImageStore {
    async fn put(&self, bytes: &[u8], original_name: &str, declared_mime: &str) -> Result<String> {
        let extension = check_media_type(original_name, declared_mime)?;

        let size = bytes.len() as u64;
        if size > self.policy.max_bytes {
            return Err(FonditaError::PayloadTooLarge {
                size,
                limit: self.policy.max_bytes,
            });
        }

        let filename = generate_filename(&extension);
        let dest_path = self.root_dir.join(&filename);
        let tmp_path = self.root_dir.join(format!(".{}.tmp", filename));

        fs::write(&tmp_path, bytes).await.map_err(|e| {
            FonditaError::io(format!(
                "Failed to write image to '{}': {}",
                tmp_path.display(),
                e
            ))
        })?;

        if let Err(e) = fs::rename(&tmp_path, &dest_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(FonditaError::io(format!(
                "Failed to move image into '{}': {}",
                dest_path.display(),
                e
            )));
        }

        tracing::info!(filename = %filename, size, original = %original_name, "Image stored");
        Ok(filename)
    }

    async fn remove(&self, filename: &str) -> Result<()> {
        let path = self.path_for(filename)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(filename = %filename, "Image removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(filename = %filename, "Image already absent");
                Ok(())
            }
            Err(e) => Err(FonditaError::io(format!(
                "Failed to delete image '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    async fn list(&self) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        let mut entries = match fs::read_dir(&self.root_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !is_hidden(name) {
                    names.insert(name.to_string());
                }
            }
        }
        Ok(names)
    }

    async fn exists(&self, filename: &str) -> Result<bool> {
        let path = self.path_for(filename)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn read(&self, filename: &str) -> Result<Vec<u8>> {
        let path = self.path_for(filename)?;
        fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FonditaError::not_found("Image", filename)
            } else {
                FonditaError::io(format!("Failed to read image '{}': {}", path.display(), e))
            }
        })
    }

    async fn modified_at(&self, filename: &str) -> Result<Option<DateTime<Utc>>> {
        let path = self.path_for(filename)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(Some(DateTime::<Utc>::from(meta.modified()?))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
