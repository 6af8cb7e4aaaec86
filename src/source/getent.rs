//! `getent` source for NSS-backed name services (ldap, sss, nis, ...)
//!
//! Runs `getent -s <service> <map>` and parses its flat-file output.

use crate::error::{UpdateDbError, UpdateDbResult};
use crate::record::{GroupEntry, MapKind, PasswdEntry};
use crate::source::parse::{parse_group, parse_passwd};
use crate::source::RecordSource;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Exit status getent uses when the map has no entries
const EXIT_NO_ENTRIES: i32 = 2;

/// Enumerates a map through the system's NSS modules
pub struct GetentSource {
    program: String,
    service: String,
}

impl GetentSource {
    /// Create a source for `service`, running `program` as getent
    pub fn new(program: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            service: service.into(),
        }
    }

    /// Run getent for one map and return its stdout
    async fn enumerate(&self, map: MapKind) -> UpdateDbResult<String> {
        let map_name = map.to_string();
        let args = ["-s", self.service.as_str(), map_name.as_str()];
        debug!("Executing: {} {:?}", self.program, args);

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| UpdateDbError::command_failed(format!("{} {:?}", self.program, args), e))?;

        match output.status.code() {
            Some(0) => Ok(String::from_utf8_lossy(&output.stdout).into_owned()),
            Some(EXIT_NO_ENTRIES) => {
                debug!("{} has no {} entries", self.service, map);
                Ok(String::new())
            }
            _ => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let reason = if stderr.trim().is_empty() {
                    format!("{} exited with {}", self.program, output.status)
                } else {
                    stderr.trim().to_string()
                };
                Err(UpdateDbError::Source {
                    service: self.service.clone(),
                    map,
                    reason,
                })
            }
        }
    }
}

#[async_trait]
impl RecordSource for GetentSource {
    fn name(&self) -> &str {
        &self.service
    }

    async fn passwd_entries(&self) -> UpdateDbResult<Vec<PasswdEntry>> {
        let output = self.enumerate(MapKind::Passwd).await?;
        Ok(parse_passwd(&output, "getent passwd"))
    }

    async fn group_entries(&self) -> UpdateDbResult<Vec<GroupEntry>> {
        let output = self.enumerate(MapKind::Group).await?;
        Ok(parse_group(&output, "getent group"))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::StatusKind;
    use std::os::unix::fs::PermissionsExt;
    use serial_test::serial;
    use std::path::PathBuf;
    use tempfile::TempDir;

    // Tests that write and exec a script run serially, so no concurrent
    // fork can hold the script open for writing (ETXTBSY).

    /// Write a fake getent that prints `stdout` and exits with `code`
    fn fake_getent(dir: &TempDir, stdout: &str, code: i32) -> PathBuf {
        let path = dir.path().join("getent");
        let script = format!("#!/bin/sh\nprintf '%s' '{}'\nexit {}\n", stdout, code);
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    #[serial]
    async fn parses_getent_output() {
        let dir = TempDir::new().unwrap();
        let program = fake_getent(&dir, "alice:*:1000:1000:Alice:/home/alice:/bin/sh\n", 0);

        let source = GetentSource::new(program.display().to_string(), "ldap");
        let users = source.passwd_entries().await.unwrap();

        assert_eq!(users.len(), 1);
        assert_eq!(users[0].name, "alice");
        assert_eq!(users[0].passwd.as_deref(), Some("*"));
    }

    #[tokio::test]
    #[serial]
    async fn no_entries_is_empty() {
        let dir = TempDir::new().unwrap();
        let program = fake_getent(&dir, "", EXIT_NO_ENTRIES);

        let source = GetentSource::new(program.display().to_string(), "ldap");
        assert!(source.group_entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn failure_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let program = fake_getent(&dir, "", 1);

        let source = GetentSource::new(program.display().to_string(), "ldap");
        let err = source.group_entries().await.unwrap_err();
        assert_eq!(err.kind(), StatusKind::Unavailable);
        assert!(matches!(err, UpdateDbError::Source { .. }));
    }

    #[tokio::test]
    async fn missing_program_is_command_failure() {
        let source = GetentSource::new("/nonexistent/getent", "ldap");
        let err = source.passwd_entries().await.unwrap_err();
        assert!(matches!(err, UpdateDbError::CommandFailed { .. }));
    }
}
