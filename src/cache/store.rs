//! Ordered key-value store interface
//!
//! A cache session only needs four things from its storage engine:
//! exclusive creation, insert-if-absent, a durable sync and close.
//! Anything implementing [`OrderedStore`] can back a session.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a storage engine
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} already exists")]
    Exists(PathBuf),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Engine {
        context: String,
        #[source]
        source: redb::Error,
    },

    #[error("corrupt cache file: {0}")]
    Corrupt(String),

    #[error("store is closed")]
    Closed,
}

impl StoreError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Wrap any redb error with context
    pub fn engine(context: impl Into<String>, source: impl Into<redb::Error>) -> Self {
        Self::Engine {
            context: context.into(),
            source: source.into(),
        }
    }
}

/// Outcome of an insert-if-absent write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The key was absent and now holds the value
    Inserted,
    /// The key already held a value, which was left untouched
    KeyExists,
}

/// Storage engine consumed by a cache session
pub trait OrderedStore {
    /// Create a new, empty store at `path`, failing if anything exists there
    fn create_exclusive(path: &Path) -> StoreResult<Self>
    where
        Self: Sized;

    /// Store `value` under `key` unless the key is already present
    fn insert_if_absent(&mut self, key: &[u8], value: &[u8]) -> StoreResult<InsertOutcome>;

    /// Flush everything inserted so far to stable storage
    fn sync(&mut self) -> StoreResult<()>;

    /// Release the engine's resources. Further calls return [`StoreError::Closed`].
    fn close(&mut self) -> StoreResult<()>;
}

/// In-memory ordered map implementing [`OrderedStore`]
///
/// Nothing is written to disk. Used for dry runs and for exercising
/// sessions without a storage engine.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
    closed: bool,
}

impl MemoryStore {
    /// Look up a key
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }
}

impl OrderedStore for MemoryStore {
    fn create_exclusive(_path: &Path) -> StoreResult<Self> {
        Ok(Self::default())
    }

    fn insert_if_absent(&mut self, key: &[u8], value: &[u8]) -> StoreResult<InsertOutcome> {
        self.ensure_open()?;
        match self.entries.entry(key.to_vec()) {
            Entry::Occupied(_) => Ok(InsertOutcome::KeyExists),
            Entry::Vacant(slot) => {
                slot.insert(value.to_vec());
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    fn sync(&mut self) -> StoreResult<()> {
        self.ensure_open()
    }

    fn close(&mut self) -> StoreResult<()> {
        self.ensure_open()?;
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_if_absent_keeps_first_value() {
        let mut store = MemoryStore::create_exclusive(Path::new("/tmp/test.db")).unwrap();

        assert_eq!(
            store.insert_if_absent(b".alice", b"first").unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.insert_if_absent(b".alice", b"second").unwrap(),
            InsertOutcome::KeyExists
        );
        assert_eq!(store.get(b".alice"), Some(&b"first"[..]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn iter_is_ordered() {
        let mut store = MemoryStore::create_exclusive(Path::new("x")).unwrap();
        store.insert_if_absent(b"=2", b"b").unwrap();
        store.insert_if_absent(b".z", b"a").unwrap();
        store.insert_if_absent(b"01", b"c").unwrap();

        let keys: Vec<&[u8]> = store.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![&b".z"[..], &b"01"[..], &b"=2"[..]]);
    }

    #[test]
    fn closed_store_rejects_operations() {
        let mut store = MemoryStore::create_exclusive(Path::new("x")).unwrap();
        store.close().unwrap();

        assert!(matches!(
            store.insert_if_absent(b"k", b"v"),
            Err(StoreError::Closed)
        ));
        assert!(matches!(store.sync(), Err(StoreError::Closed)));
        assert!(matches!(store.close(), Err(StoreError::Closed)));
    }
}
