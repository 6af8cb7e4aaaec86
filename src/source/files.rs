//! Flat file source (`/etc/passwd`, `/etc/group`)

use crate::error::{UpdateDbError, UpdateDbResult};
use crate::record::{GroupEntry, MapKind, PasswdEntry};
use crate::source::parse::{parse_group, parse_passwd};
use crate::source::RecordSource;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Reads entries straight from passwd/group formatted files
pub struct FilesSource {
    passwd_file: PathBuf,
    group_file: PathBuf,
}

impl FilesSource {
    /// Create a source reading the given files
    pub fn new(passwd_file: PathBuf, group_file: PathBuf) -> Self {
        Self {
            passwd_file,
            group_file,
        }
    }

    async fn read(&self, path: &Path, map: MapKind) -> UpdateDbResult<String> {
        debug!("Reading {} entries from {}", map, path.display());
        fs::read_to_string(path)
            .await
            .map_err(|e| UpdateDbError::Source {
                service: self.name().to_string(),
                map,
                reason: format!("reading {}: {}", path.display(), e),
            })
    }
}

#[async_trait]
impl RecordSource for FilesSource {
    fn name(&self) -> &str {
        "files"
    }

    async fn passwd_entries(&self) -> UpdateDbResult<Vec<PasswdEntry>> {
        let content = self.read(&self.passwd_file, MapKind::Passwd).await?;
        Ok(parse_passwd(
            &content,
            &self.passwd_file.display().to_string(),
        ))
    }

    async fn group_entries(&self) -> UpdateDbResult<Vec<GroupEntry>> {
        let content = self.read(&self.group_file, MapKind::Group).await?;
        Ok(parse_group(&content, &self.group_file.display().to_string()))
    }
}
