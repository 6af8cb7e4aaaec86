//! Configuration loading for nss-updatedb
//!
//! A system-wide file wins over the per-user one, so cron jobs and
//! administrators running by hand agree on the cache locations.

pub mod schema;

pub use schema::Config;

use crate::error::{UpdateDbError, UpdateDbResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// System-wide configuration file
pub const SYSTEM_CONFIG_PATH: &str = "/etc/nss-updatedb/config.toml";

/// Locates, validates and writes the configuration file
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Manager for the default configuration file
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Manager for an explicit file (`--config` / `NSS_UPDATEDB_CONFIG`)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// `/etc/nss-updatedb/config.toml` if it exists, else the per-user file
    pub fn default_config_path() -> PathBuf {
        let system = PathBuf::from(SYSTEM_CONFIG_PATH);
        if system.exists() {
            return system;
        }
        user_config_path()
    }

    /// Load and validate the configuration
    ///
    /// A missing file yields the built-in defaults, which publish to
    /// `/var/db`. A file that parses but names relative or shared cache
    /// paths is rejected before any map is touched.
    pub async fn load(&self) -> UpdateDbResult<Config> {
        if !fs::try_exists(&self.config_path).await.unwrap_or(false) {
            debug!(
                "No config at {}, publishing to {} and {}",
                self.config_path.display(),
                Config::default().maps.passwd.display(),
                Config::default().maps.group.display()
            );
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load and validate a specific file
    pub async fn load_from_file(&self, path: &Path) -> UpdateDbResult<Config> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            UpdateDbError::io(format!("reading config from {}", path.display()), e)
        })?;

        let invalid = |reason: String| UpdateDbError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        };
        let config: Config = toml::from_str(&content).map_err(|e| invalid(e.to_string()))?;
        config.validate().map_err(invalid)?;

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Validate and write `config`, creating the directory if needed
    pub async fn save(&self, config: &Config) -> UpdateDbResult<()> {
        config
            .validate()
            .map_err(|reason| UpdateDbError::ConfigInvalid {
                path: self.config_path.clone(),
                reason,
            })?;
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            UpdateDbError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    async fn ensure_config_dir(&self) -> UpdateDbResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| UpdateDbError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// The file this manager reads and writes
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nss-updatedb")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("nonexistent.toml"));

        let config = manager.load().await.unwrap();
        assert_eq!(config.maps.passwd, PathBuf::from("/var/db/passwd.db"));
    }

    #[tokio::test]
    async fn save_then_load_keeps_map_paths() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("nested").join("config.toml"));

        let mut config = Config::default();
        config.maps.group = PathBuf::from("/srv/group.db");
        manager.save(&config).await.unwrap();

        let loaded = manager.load().await.unwrap();
        assert_eq!(loaded.maps.group, PathBuf::from("/srv/group.db"));
    }

    #[tokio::test]
    async fn invalid_toml_is_reported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[maps\npasswd = 1").unwrap();

        let err = ConfigManager::with_path(path).load().await.unwrap_err();
        assert!(matches!(err, UpdateDbError::ConfigInvalid { .. }));
    }

    #[tokio::test]
    async fn relative_cache_path_is_rejected_on_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[maps]\npasswd = \"passwd.db\"\n").unwrap();

        let err = ConfigManager::with_path(path).load().await.unwrap_err();
        assert!(matches!(err, UpdateDbError::ConfigInvalid { ref reason, .. }
            if reason.contains("maps.passwd")));
    }

    #[tokio::test]
    async fn invalid_config_is_not_saved() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let manager = ConfigManager::with_path(path.clone());

        let mut config = Config::default();
        config.general.log_format = "xml".to_string();

        assert!(manager.save(&config).await.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn user_path_is_namespaced() {
        assert!(user_config_path().ends_with("nss-updatedb/config.toml"));
    }
}
