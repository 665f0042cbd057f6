//! Configuration service implementation.
//!
//! Loads [`RootConfig`] from a TOML file and layers environment variables on
//! top. The file is optional; every field has a default.

use fondita_core::config::RootConfig;
use fondita_core::error::{FonditaError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "FONDITA_CONFIG";

/// Configuration file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "fondita.toml";

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Loads the root configuration.
///
/// Environment lookups go through an injectable function so tests never have
/// to touch the process environment.
#[derive(Clone)]
pub struct ConfigService {
    path: PathBuf,
    env: EnvLookup,
}

impl std::fmt::Debug for ConfigService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigService")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl ConfigService {
    /// Uses the process environment, reading the file named by
    /// `FONDITA_CONFIG` (default `fondita.toml`).
    pub fn from_env() -> Self {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::new(path, |key| std::env::var(key).ok())
    }

    pub fn new<F>(path: impl Into<PathBuf>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            path: path.into(),
            env: Arc::new(env),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file, applies overrides and validates the result.
    pub fn load(&self) -> Result<RootConfig> {
        let mut config = self.load_file()?;
        self.apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    fn load_file(&self) -> Result<RootConfig> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No config file, using defaults");
                return Ok(RootConfig::default());
            }
            Err(e) => {
                return Err(FonditaError::config(format!(
                    "Failed to read '{}': {}",
                    self.path.display(),
                    e
                )));
            }
        };

        toml::from_str(&content).map_err(|e| {
            FonditaError::config(format!("Invalid config '{}': {}", self.path.display(), e))
        })
    }

    fn var(&self, key: &str) -> Option<String> {
        (self.env)(key).filter(|value| !value.trim().is_empty())
    }

    fn apply_env_overrides(&self, config: &mut RootConfig) -> Result<()> {
        if let Some(port) = self.var("PORT") {
            config.server.port = port
                .trim()
                .parse()
                .map_err(|_| {
                    FonditaError::config(format!("PORT '{}' is not a port number", port))
                })?;
        }
        if let Some(root) = self.var("FONDITA_ROOT") {
            config.storage.root = PathBuf::from(root);
        }
        if let Some(user) = self.var("ADMIN_USER") {
            config.auth.admin_user = user;
        }
        if let Some(pass) = self.var("ADMIN_PASS") {
            config.auth.admin_pass = pass;
        }
        if let Some(token) = self.var("GH_TOKEN") {
            config.replication.access_token = token;
        }
        if let Some(url) = self.var("PRODUCTION_REPO_URL") {
            config.replication.remote_url = url;
        }
        if let Some(branch) = self.var("PRODUCTION_BRANCH") {
            config.replication.branch = branch;
        }
        if let Some(enabled) = self.var("SYNC_ENABLED") {
            config.replication.enabled = parse_flag(&enabled).ok_or_else(|| {
                FonditaError::config(format!("SYNC_ENABLED '{}' is not a boolean", enabled))
            })?;
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn service(path: PathBuf, vars: &[(&str, &str)]) -> ConfigService {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConfigService::new(path, move |key| vars.get(key).cloned())
    }

    #[test]
    fn test_missing_file_with_env_credentials() {
        let temp_dir = TempDir::new().unwrap();
        let config = service(
            temp_dir.path().join("absent.toml"),
            &[
                ("ADMIN_USER", "admin"),
                ("ADMIN_PASS", "secret"),
                ("SYNC_ENABLED", "false"),
                ("PORT", "8080"),
            ],
        )
        .load()
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.admin_user, "admin");
        assert!(!config.replication.enabled);
    }

    #[test]
    fn test_env_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fondita.toml");
        std::fs::write(
            &path,
            r#"
            [auth]
            admin_user = "file-admin"
            admin_pass = "file-pass"

            [replication]
            remote_url = "https://github.com/Owner/site.git"
            branch = "gh-pages"
            "#,
        )
        .unwrap();

        let config = service(
            path,
            &[("PRODUCTION_BRANCH", "main"), ("GH_TOKEN", "ghp_x"), ("ADMIN_USER", "")],
        )
        .load()
        .unwrap();

        assert_eq!(config.auth.admin_user, "file-admin");
        assert_eq!(config.replication.branch, "main");
        assert_eq!(config.replication.access_token, "ghp_x");
    }

    #[test]
    fn test_missing_credentials_fail() {
        let temp_dir = TempDir::new().unwrap();
        let err = service(temp_dir.path().join("absent.toml"), &[("SYNC_ENABLED", "0")])
            .load()
            .unwrap_err();
        assert!(matches!(err, FonditaError::Config(_)));
    }

    #[test]
    fn test_bad_values_are_config_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fondita.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();
        assert!(matches!(
            service(path, &[]).load(),
            Err(FonditaError::Config(_))
        ));

        let err = service(
            temp_dir.path().join("absent.toml"),
            &[("PORT", "eighty")],
        )
        .load()
        .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
