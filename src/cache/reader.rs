//! Read side of a published cache
//!
//! A reader keeps the database it opened. Publishing a new generation
//! renames a different inode over the path, so an open reader keeps
//! answering from the generation it started with until it is reopened.

use crate::cache::keys::{self, SEQUENCE_PREFIX};
use crate::cache::store::{StoreError, StoreResult};
use crate::cache::table::{count_keys, open_existing, CACHE_TABLE};
use redb::{Database, ReadOnlyTable, ReadableTable};
use std::path::{Path, PathBuf};

/// Point lookups against a published cache file
pub struct CacheReader {
    path: PathBuf,
    db: Database,
    count: u64,
}

impl std::fmt::Debug for CacheReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheReader")
            .field("path", &self.path)
            .field("count", &self.count)
            .finish()
    }
}

impl CacheReader {
    /// Open the cache at `path`
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let db = open_existing(path)?;
        let count = count_keys(&db)?;

        Ok(Self {
            path: path.to_path_buf(),
            db,
            count,
        })
    }

    /// Number of keys in the table
    pub fn len(&self) -> u64 {
        self.count
    }

    /// Whether the table holds no keys
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Look up a raw key
    pub fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let table = self.table()?;
        let value = table
            .get(key)
            .map_err(|e| StoreError::engine("reading key", e))?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    /// Value stored under `.name`
    pub fn by_name(&self, name: &str) -> StoreResult<Option<Vec<u8>>> {
        self.get(&keys::name_key(name))
    }

    /// Value stored under `=id`
    pub fn by_id(&self, id: i64) -> StoreResult<Option<Vec<u8>>> {
        self.get(&keys::id_key(id))
    }

    /// Value stored under `0index`
    pub fn by_index(&self, index: u64) -> StoreResult<Option<Vec<u8>>> {
        self.get(&keys::sequence_key(index))
    }

    /// All entries in key order
    pub fn entries(&self) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let table = self.table()?;
        let mut entries = Vec::new();
        for item in table
            .iter()
            .map_err(|e| StoreError::engine("iterating cache table", e))?
        {
            let (key, value) = item.map_err(|e| StoreError::engine("reading entry", e))?;
            entries.push((key.value().to_vec(), value.value().to_vec()));
        }
        Ok(entries)
    }

    /// Number of records, i.e. of enumeration keys
    pub fn record_count(&self) -> StoreResult<u64> {
        let table = self.table()?;
        let start = [SEQUENCE_PREFIX];
        let end = [SEQUENCE_PREFIX + 1];
        let mut count = 0;
        for item in table
            .range(&start[..]..&end[..])
            .map_err(|e| StoreError::engine("scanning enumeration keys", e))?
        {
            item.map_err(|e| StoreError::engine("reading entry", e))?;
            count += 1;
        }
        Ok(count)
    }

    fn table(&self) -> StoreResult<ReadOnlyTable<&'static [u8], &'static [u8]>> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| StoreError::engine("starting read transaction", e))?;
        txn.open_table(CACHE_TABLE)
            .map_err(|e| StoreError::engine("opening cache table", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::OrderedStore;
    use crate::cache::table::TableStore;
    use std::fs;
    use tempfile::TempDir;

    fn write_table(dir: &TempDir, entries: &[(&str, &str)]) -> PathBuf {
        let path = dir.path().join("cache.db");
        let mut store = TableStore::create_exclusive(&path).unwrap();
        for (key, value) in entries {
            store
                .insert_if_absent(key.as_bytes(), value.as_bytes())
                .unwrap();
        }
        store.sync().unwrap();
        store.close().unwrap();
        path
    }

    #[test]
    fn point_lookups() {
        let dir = TempDir::new().unwrap();
        let path = write_table(
            &dir,
            &[
                (".alice", "alice:x:1000:1000:::"),
                ("=1000", "alice:x:1000:1000:::"),
                ("00", "alice:x:1000:1000:::"),
            ],
        );

        let reader = CacheReader::open(&path).unwrap();
        assert_eq!(reader.len(), 3);
        assert_eq!(
            reader.by_name("alice").unwrap().as_deref(),
            Some(&b"alice:x:1000:1000:::"[..])
        );
        assert!(reader.by_id(1000).unwrap().is_some());
        assert!(reader.by_index(0).unwrap().is_some());
        assert!(reader.by_name("bob").unwrap().is_none());
        assert!(reader.by_id(1).unwrap().is_none());
        assert_eq!(reader.record_count().unwrap(), 1);
    }

    #[test]
    fn negative_id_lookup() {
        let dir = TempDir::new().unwrap();
        let path = write_table(&dir, &[("=-2", "nobody:x:-2:-2:::")]);

        let reader = CacheReader::open(&path).unwrap();
        assert_eq!(
            reader.by_id(-2).unwrap(),
            Some(b"nobody:x:-2:-2:::".to_vec())
        );
        assert!(reader.by_id(2).unwrap().is_none());
    }

    #[test]
    fn enumeration_count_ignores_other_keys() {
        let dir = TempDir::new().unwrap();
        let path = write_table(
            &dir,
            &[("00", "a"), ("01", "b"), ("010", "k"), (".a", "a"), ("=1", "a")],
        );

        let reader = CacheReader::open(&path).unwrap();
        assert_eq!(reader.record_count().unwrap(), 3);
        assert_eq!(reader.entries().unwrap().len(), 5);
        assert_eq!(reader.entries().unwrap()[0].0, b".a".to_vec());
    }

    #[test]
    fn empty_table() {
        let dir = TempDir::new().unwrap();
        let path = write_table(&dir, &[]);
        let reader = CacheReader::open(&path).unwrap();

        assert!(reader.is_empty());
        assert!(reader.get(b"00").unwrap().is_none());
        assert!(reader.entries().unwrap().is_empty());
    }

    #[test]
    fn missing_file() {
        let dir = TempDir::new().unwrap();
        let err = CacheReader::open(dir.path().join("nope.db")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn foreign_file_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.db");
        fs::write(&path, b"definitely not a cache table, just some text").unwrap();
        assert!(matches!(
            CacheReader::open(&path),
            Err(StoreError::Corrupt(_))
        ));
        assert_eq!(
            fs::read(&path).unwrap(),
            b"definitely not a cache table, just some text"
        );
    }
}
