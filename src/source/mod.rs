//! Name service backends that enumerate identity records
//!
//! A source yields every entry of a map; the cache session never talks to
//! the directory itself.

pub mod files;
pub mod getent;
pub mod parse;

pub use files::FilesSource;
pub use getent::GetentSource;

use crate::config::Config;
use crate::error::{UpdateDbError, UpdateDbResult};
use crate::record::{GroupEntry, PasswdEntry};
use async_trait::async_trait;
use tracing::debug;

/// Abstract record enumeration interface
///
/// Implementations:
/// - `files`: flat `/etc/passwd` and `/etc/group` style files
/// - anything else: `getent -s <service>` against the system's NSS modules
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Name service this source reads from
    fn name(&self) -> &str;

    /// Enumerate all user entries
    async fn passwd_entries(&self) -> UpdateDbResult<Vec<PasswdEntry>>;

    /// Enumerate all group entries
    async fn group_entries(&self) -> UpdateDbResult<Vec<GroupEntry>>;
}

/// Pick the source for a name service
///
/// `db` is refused: it is the service that reads the cache this tool
/// writes.
pub fn for_service(service: &str, config: &Config) -> UpdateDbResult<Box<dyn RecordSource>> {
    match service {
        "db" => Err(UpdateDbError::UnsupportedService(service.to_string())),
        "files" => {
            debug!("Using flat files source");
            Ok(Box::new(FilesSource::new(
                config.sources.passwd_file.clone(),
                config.sources.group_file.clone(),
            )))
        }
        other => {
            debug!("Using getent source for service {}", other);
            Ok(Box::new(GetentSource::new(
                config.sources.getent.clone(),
                other,
            )))
        }
    }
}
