//! Cache build sessions and atomic publish
//!
//! A session owns a staging store next to the final cache path. Records are
//! inserted under their three keys, then `commit` syncs the store, renames it
//! over the final path and hard-links the final path back to the staging
//! name. Readers that already had the old file open keep the old inode.

use crate::cache::keys::{display_key, RecordKeys};
use crate::cache::store::{InsertOutcome, OrderedStore};
use crate::cache::table::TableStore;
use crate::error::{UpdateDbError, UpdateDbResult};
use crate::record::{CacheRecord, GroupEntry, PasswdEntry};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Session backed by the on-disk table store
pub type TableSession = CacheSession<TableStore>;

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting records
    Building,
    /// Published to the final path
    Committed,
    /// Build abandoned
    Aborted,
    /// Resources released
    Closed,
}

/// Counters collected while a session is built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Records indexed (equals the next sequence number)
    pub records: u64,
    /// Keys newly written
    pub keys_written: u64,
    /// Keys skipped because an earlier record already owned them
    pub duplicate_keys: u64,
    /// Records refused for lack of a name
    pub rejected: u64,
}

/// One in-progress cache build
#[derive(Debug)]
pub struct CacheSession<S: OrderedStore> {
    final_path: PathBuf,
    staging_path: PathBuf,
    store: Option<S>,
    sequence: u64,
    stats: SessionStats,
    state: SessionState,
    #[cfg(test)]
    before_link: Option<fn(&Path)>,
}

impl<S: OrderedStore> CacheSession<S> {
    /// Start a build for `final_path`
    ///
    /// The staging store is created exclusively in the same directory, so
    /// the later rename never crosses filesystems and never truncates a
    /// staging file belonging to a concurrent build.
    pub fn open(final_path: impl Into<PathBuf>) -> UpdateDbResult<Self> {
        let final_path = final_path.into();
        let staging_path = staging_path_for(&final_path)?;

        let store = S::create_exclusive(&staging_path).map_err(|e| UpdateDbError::StoreCreate {
            path: staging_path.clone(),
            source: e,
        })?;

        debug!(
            "Opened cache session for {} (staging {})",
            final_path.display(),
            staging_path.display()
        );

        Ok(Self {
            final_path,
            staging_path,
            store: Some(store),
            sequence: 0,
            stats: SessionStats::default(),
            state: SessionState::Building,
            #[cfg(test)]
            before_link: None,
        })
    }

    /// Path the cache is published to
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Path of the staging store
    pub fn staging_path(&self) -> &Path {
        &self.staging_path
    }

    /// Sequence number the next record will get
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Counters so far
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The underlying store, while the session holds one
    pub fn store(&self) -> Option<&S> {
        self.store.as_ref()
    }

    /// Index a user record
    pub fn insert_user(&mut self, entry: &PasswdEntry) -> UpdateDbResult<()> {
        self.insert(entry)
    }

    /// Index a group record
    pub fn insert_group(&mut self, entry: &GroupEntry) -> UpdateDbResult<()> {
        self.insert(entry)
    }

    /// Index a record under its name, id and sequence keys
    ///
    /// A key that is already present is left alone and the remaining keys
    /// are still written. The sequence advances once per indexed record,
    /// however many of its keys were new.
    pub fn insert<R: CacheRecord>(&mut self, record: &R) -> UpdateDbResult<()> {
        if self.state != SessionState::Building {
            return Err(UpdateDbError::SessionFinished(self.final_path.clone()));
        }

        let value = match record.to_cache_value() {
            Ok(value) => value,
            Err(e) => {
                if matches!(e, UpdateDbError::MissingName { .. }) {
                    self.stats.rejected += 1;
                }
                return Err(e);
            }
        };
        let keys = RecordKeys::encode(record.name(), record.id(), self.sequence)?;

        let store = self
            .store
            .as_mut()
            .ok_or_else(|| UpdateDbError::SessionFinished(self.final_path.clone()))?;

        for key in keys.iter() {
            let outcome = store.insert_if_absent(key, value.as_bytes()).map_err(|e| {
                UpdateDbError::StoreInsert {
                    key: display_key(key),
                    source: e,
                }
            })?;

            match outcome {
                InsertOutcome::Inserted => self.stats.keys_written += 1,
                InsertOutcome::KeyExists => {
                    debug!("Ignoring duplicate key {}", display_key(key));
                    self.stats.duplicate_keys += 1;
                }
            }
        }

        self.sequence += 1;
        self.stats.records = self.sequence;
        Ok(())
    }

    /// Publish the staged store at the final path
    ///
    /// Steps: sync, rename staging over final, hard-link final back to the
    /// staging name. A failure after the rename is reported but not rolled
    /// back.
    pub fn commit(&mut self) -> UpdateDbResult<()> {
        if self.state != SessionState::Building {
            return Err(UpdateDbError::SessionFinished(self.final_path.clone()));
        }

        let store = self
            .store
            .as_mut()
            .ok_or_else(|| UpdateDbError::SessionFinished(self.final_path.clone()))?;
        store.sync().map_err(|e| UpdateDbError::StoreSync {
            path: self.staging_path.clone(),
            source: e,
        })?;

        fs::rename(&self.staging_path, &self.final_path).map_err(|e| UpdateDbError::Publish {
            step: "rename",
            from: self.staging_path.clone(),
            to: self.final_path.clone(),
            source: e,
        })?;

        // From here on the final path holds the new generation.
        self.state = SessionState::Committed;

        #[cfg(test)]
        if let Some(hook) = self.before_link {
            hook(&self.staging_path);
        }

        fs::hard_link(&self.final_path, &self.staging_path).map_err(|e| {
            UpdateDbError::Publish {
                step: "link",
                from: self.final_path.clone(),
                to: self.staging_path.clone(),
                source: e,
            }
        })?;

        info!(
            "Published {} records to {}",
            self.sequence,
            self.final_path.display()
        );
        Ok(())
    }

    /// Abandon the build
    ///
    /// Always fails: the caller gets `Unavailable` back and the staging
    /// store is discarded when the session is closed.
    pub fn abort(&mut self) -> UpdateDbResult<()> {
        if self.state == SessionState::Building {
            self.state = SessionState::Aborted;
        }
        warn!("Aborted cache build for {}", self.final_path.display());
        Err(UpdateDbError::Aborted(self.final_path.clone()))
    }

    /// Release the store and remove the staging name
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }

        if let Some(mut store) = self.store.take() {
            if let Err(e) = store.close() {
                warn!("Failed to close store {}: {}", self.staging_path.display(), e);
            }
        }

        match fs::remove_file(&self.staging_path) {
            Ok(()) => debug!("Removed {}", self.staging_path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", self.staging_path.display(), e),
        }

        self.state = SessionState::Closed;
    }
}

impl<S: OrderedStore> Drop for CacheSession<S> {
    fn drop(&mut self) {
        self.release();
    }
}

/// `<dir>/.<file>.tmp-<random>` next to the final path
fn staging_path_for(final_path: &Path) -> UpdateDbResult<PathBuf> {
    let file_name = final_path
        .file_name()
        .ok_or_else(|| UpdateDbError::PathInvalid {
            path: final_path.to_path_buf(),
            reason: "cache path has no file name".to_string(),
        })?;

    let suffix = format!(".tmp-{}", Uuid::new_v4().simple());
    let mut staging_name = OsString::new();
    staging_name
        .try_reserve_exact(1 + file_name.len() + suffix.len())
        .map_err(|e| UpdateDbError::out_of_memory("deriving staging path", e))?;
    staging_name.push(".");
    staging_name.push(file_name);
    staging_name.push(&suffix);

    Ok(final_path.with_file_name(staging_name))
}
