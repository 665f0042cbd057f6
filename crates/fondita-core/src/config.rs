//! Configuration model.
//!
//! Every field has a default so an empty or missing `fondita.toml` is valid.
//! Loading and environment overrides live in the infrastructure crate.

use crate::error::{FonditaError, Result};
use crate::image::{DEFAULT_MAX_UPLOAD_BYTES, UploadPolicy};
use crate::menu::MAX_WEEK_DAYS;
use crate::session::SessionPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

const REDACTED: &str = "<redacted>";

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct RootConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub uploads: UploadConfig,
    pub replication: ReplicationConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origin allowed to call the API with credentials, if any
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origin: None,
        }
    }
}

/// On-disk layout. Relative paths resolve against `root`.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub menu_file: PathBuf,
    pub image_dir: PathBuf,
    pub public_dir: PathBuf,
    /// Schedule length the document is padded/truncated to (5 or 7)
    pub week_days: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            menu_file: PathBuf::from("data/menu.json"),
            image_dir: PathBuf::from("img"),
            public_dir: PathBuf::from("public"),
            week_days: 5,
        }
    }
}

#[derive(Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub admin_user: String,
    pub admin_pass: String,
    pub idle_timeout_minutes: i64,
    pub max_lifetime_minutes: i64,
    pub sweep_interval_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_user: String::new(),
            admin_pass: String::new(),
            idle_timeout_minutes: 30,
            max_lifetime_minutes: 12 * 60,
            sweep_interval_minutes: 5,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("admin_user", &self.admin_user)
            .field("admin_pass", &REDACTED)
            .field("idle_timeout_minutes", &self.idle_timeout_minutes)
            .field("max_lifetime_minutes", &self.max_lifetime_minutes)
            .field("sweep_interval_minutes", &self.sweep_interval_minutes)
            .finish()
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ReplicationConfig {
    pub enabled: bool,
    /// HTTPS URL of the production repository
    pub remote_url: String,
    pub branch: String,
    /// Token injected into `remote_url` for push access
    pub access_token: String,
    /// User name paired with the token (defaults to the URL owner)
    pub access_user: Option<String>,
    pub working_tree: PathBuf,
    pub timeout_secs: u64,
    pub author_name: String,
    pub author_email: String,
    /// Files copied from the public dir into the tree root
    pub static_assets: Vec<String>,
    /// Images kept in the tree even when the menu does not reference them
    pub always_keep_images: Vec<String>,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            remote_url: String::new(),
            branch: "main".to_string(),
            access_token: String::new(),
            access_user: None,
            working_tree: PathBuf::from("production-repo"),
            timeout_secs: 60,
            author_name: "Fondita Bot".to_string(),
            author_email: "bot@fondita.local".to_string(),
            static_assets: ["index.html", "estilos.css", "menu.js", "preguntas.js", "scoll.js"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            always_keep_images: ["logo.png", "portada-login.jpg", "portada.avif"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl fmt::Debug for ReplicationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token: &dyn fmt::Debug = if self.access_token.is_empty() {
            &""
        } else {
            &REDACTED
        };
        f.debug_struct("ReplicationConfig")
            .field("enabled", &self.enabled)
            .field("remote_url", &self.remote_url)
            .field("branch", &self.branch)
            .field("access_token", token)
            .field("access_user", &self.access_user)
            .field("working_tree", &self.working_tree)
            .field("timeout_secs", &self.timeout_secs)
            .field("static_assets", &self.static_assets)
            .field("always_keep_images", &self.always_keep_images)
            .finish()
    }
}

impl RootConfig {
    /// Checks settings the server cannot run without.
    pub fn validate(&self) -> Result<()> {
        if self.auth.admin_user.trim().is_empty() || self.auth.admin_pass.is_empty() {
            return Err(FonditaError::config(
                "admin credentials are required (ADMIN_USER / ADMIN_PASS)",
            ));
        }
        if self.storage.week_days == 0 || self.storage.week_days > MAX_WEEK_DAYS {
            return Err(FonditaError::config(format!(
                "storage.week_days must be between 1 and {}",
                MAX_WEEK_DAYS
            )));
        }
        if self.auth.idle_timeout_minutes <= 0 || self.auth.sweep_interval_minutes <= 0 {
            return Err(FonditaError::config(
                "auth timeouts must be positive numbers of minutes",
            ));
        }
        if self.replication.enabled && self.replication.remote_url.trim().is_empty() {
            return Err(FonditaError::config(
                "replication.remote_url is required when replication is enabled",
            ));
        }
        Ok(())
    }

    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            idle_timeout: chrono::Duration::minutes(self.auth.idle_timeout_minutes),
            max_lifetime: chrono::Duration::minutes(self.auth.max_lifetime_minutes),
            sweep_interval: chrono::Duration::minutes(self.auth.sweep_interval_minutes),
        }
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            max_bytes: self.uploads.max_bytes,
        }
    }
}
