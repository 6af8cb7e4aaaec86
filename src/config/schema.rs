//! Configuration schema for nss-updatedb
//!
//! Configuration is read from `/etc/nss-updatedb/config.toml` when present,
//! otherwise from `~/.config/nss-updatedb/config.toml`.

use crate::record::MapKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache file locations
    pub maps: MapsConfig,

    /// Record source settings
    pub sources: SourcesConfig,

    /// Update behaviour
    pub update: UpdateConfig,
}

impl Config {
    /// Cache path configured for a map
    pub fn map_path(&self, map: MapKind) -> &Path {
        match map {
            MapKind::Passwd => &self.maps.passwd,
            MapKind::Group => &self.maps.group,
        }
    }

    /// Check the settings a cron run would otherwise trip over
    ///
    /// Cache paths must be absolute and distinct, since the working
    /// directory of a scheduled run is arbitrary and both maps publish by
    /// rename.
    pub fn validate(&self) -> Result<(), String> {
        for map in MapKind::ALL {
            let path = self.map_path(map);
            if !path.is_absolute() {
                return Err(format!(
                    "maps.{} must be an absolute path, got '{}'",
                    map,
                    path.display()
                ));
            }
            if path.file_name().is_none() {
                return Err(format!("maps.{} has no file name", map));
            }
        }

        if self.maps.passwd == self.maps.group {
            return Err(format!(
                "maps.passwd and maps.group both point at {}",
                self.maps.passwd.display()
            ));
        }

        if self.sources.getent.trim().is_empty() {
            return Err("sources.getent must not be empty".to_string());
        }

        match self.general.log_format.as_str() {
            "text" | "json" => Ok(()),
            other => Err(format!(
                "general.log_format must be \"text\" or \"json\", got \"{}\"",
                other
            )),
        }
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Where each map's cache is published
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapsConfig {
    /// passwd cache file
    pub passwd: PathBuf,

    /// group cache file
    pub group: PathBuf,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            passwd: MapKind::Passwd.default_path(),
            group: MapKind::Group.default_path(),
        }
    }
}

/// Record source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// getent binary used for NSS-backed services
    pub getent: String,

    /// passwd file read by the `files` service
    pub passwd_file: PathBuf,

    /// group file read by the `files` service
    pub group_file: PathBuf,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            getent: "getent".to_string(),
            passwd_file: PathBuf::from("/etc/passwd"),
            group_file: PathBuf::from("/etc/group"),
        }
    }
}

/// Update behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Keep the existing cache when the name service returned no records
    pub refuse_empty: bool,

    /// Create the cache directory if it is missing
    pub create_dirs: bool,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            refuse_empty: false,
            create_dirs: true,
        }
    }
}
