//! redb-backed table store
//!
//! Every key of a cache lives in one redb table of raw byte strings. Inserts
//! go through a single write transaction that stays open until `sync`
//! commits it durably.

use crate::cache::store::{InsertOutcome, OrderedStore, StoreError, StoreResult};
use redb::{Builder, Database, ReadableTable, TableDefinition, WriteTransaction};
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// The single table holding `.name`, `=id` and `0seq` keys
pub const CACHE_TABLE: TableDefinition<'static, &'static [u8], &'static [u8]> =
    TableDefinition::new("nss_cache");

/// Leading bytes of every redb file
const REDB_SIGNATURE: &[u8] = b"redb";

/// Permission bits of a freshly created cache file
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

/// Cache file implementing [`OrderedStore`] on top of redb
pub struct TableStore {
    path: PathBuf,
    db: Option<Database>,
    txn: Option<WriteTransaction>,
    inserted: u64,
}

impl std::fmt::Debug for TableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableStore")
            .field("path", &self.path)
            .field("open", &self.db.is_some())
            .field("inserted", &self.inserted)
            .finish()
    }
}

impl TableStore {
    /// Number of keys inserted through this store
    pub fn len(&self) -> u64 {
        self.inserted
    }

    /// Whether no key has been inserted
    pub fn is_empty(&self) -> bool {
        self.inserted == 0
    }

    /// Current write transaction, started on first use
    fn write_txn(&mut self) -> StoreResult<&WriteTransaction> {
        let db = self.db.as_ref().ok_or(StoreError::Closed)?;
        if self.txn.is_none() {
            let txn = db
                .begin_write()
                .map_err(|e| StoreError::engine("starting write transaction", e))?;
            self.txn = Some(txn);
        }
        self.txn.as_ref().ok_or(StoreError::Closed)
    }
}

impl OrderedStore for TableStore {
    fn create_exclusive(path: &Path) -> StoreResult<Self> {
        let mut options = OpenOptions::new();
        options.read(true).write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(FILE_MODE);
        }

        let file = options.open(path).map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                StoreError::Exists(path.to_path_buf())
            } else {
                StoreError::io(format!("creating {}", path.display()), e)
            }
        })?;

        let db = Builder::new()
            .create_file(file)
            .map_err(|e| StoreError::engine(format!("initializing {}", path.display()), e))?;

        debug!("Created table store at {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            db: Some(db),
            txn: None,
            inserted: 0,
        })
    }

    fn insert_if_absent(&mut self, key: &[u8], value: &[u8]) -> StoreResult<InsertOutcome> {
        let txn = self.write_txn()?;
        let mut table = txn
            .open_table(CACHE_TABLE)
            .map_err(|e| StoreError::engine("opening cache table", e))?;

        let exists = table
            .get(key)
            .map_err(|e| StoreError::engine("reading key", e))?
            .is_some();
        if exists {
            return Ok(InsertOutcome::KeyExists);
        }

        table
            .insert(key, value)
            .map_err(|e| StoreError::engine("writing key", e))?;
        drop(table);

        self.inserted += 1;
        Ok(InsertOutcome::Inserted)
    }

    fn sync(&mut self) -> StoreResult<()> {
        // The table must exist even when nothing was inserted
        let txn = self.write_txn()?;
        txn.open_table(CACHE_TABLE)
            .map_err(|e| StoreError::engine("opening cache table", e))?;

        let txn = self.txn.take().ok_or(StoreError::Closed)?;
        txn.commit()
            .map_err(|e| StoreError::engine(format!("committing {}", self.path.display()), e))?;

        debug!("Committed {} keys to {}", self.inserted, self.path.display());
        Ok(())
    }

    fn close(&mut self) -> StoreResult<()> {
        let db = self.db.take().ok_or(StoreError::Closed)?;
        if let Some(txn) = self.txn.take() {
            txn.abort()
                .map_err(|e| StoreError::engine("discarding uncommitted keys", e))?;
        }
        drop(db);
        Ok(())
    }
}

/// Open an existing cache file without ever initializing a new one
///
/// redb would format a file it does not recognize, so the signature is
/// checked first and foreign files are reported as corrupt untouched.
pub(crate) fn open_existing(path: &Path) -> StoreResult<Database> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| StoreError::io(format!("opening {}", path.display()), e))?;

    let mut signature = [0u8; REDB_SIGNATURE.len()];
    match file.read_exact(&mut signature) {
        Ok(()) if signature == REDB_SIGNATURE => {}
        Ok(()) => {
            return Err(StoreError::Corrupt(format!(
                "{} is not a cache table",
                path.display()
            )))
        }
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(StoreError::Corrupt(format!("{} is truncated", path.display())))
        }
        Err(e) => return Err(StoreError::io(format!("reading {}", path.display()), e)),
    }

    open_file(file, path)
}

fn open_file(file: File, path: &Path) -> StoreResult<Database> {
    Builder::new().create_file(file).map_err(|e| match e {
        redb::DatabaseError::Storage(redb::StorageError::Corrupted(reason)) => {
            StoreError::Corrupt(reason)
        }
        other => StoreError::engine(format!("opening {}", path.display()), other),
    })
}

/// Count the keys of a committed table
pub(crate) fn count_keys(db: &Database) -> StoreResult<u64> {
    use redb::ReadableTableMetadata;

    let txn = db
        .begin_read()
        .map_err(|e| StoreError::engine("starting read transaction", e))?;
    let table = txn
        .open_table(CACHE_TABLE)
        .map_err(|e| StoreError::engine("opening cache table", e))?;
    table
        .len()
        .map_err(|e| StoreError::engine("counting keys", e))
}
