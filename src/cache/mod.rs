//! Identity lookup cache
//!
//! Builds a read-optimized cache of passwd or group records and publishes
//! it atomically. Each record is stored three times, under keys that share
//! one ordered store:
//!
//! | Key | Form | Lookup |
//! |-----|------|--------|
//! | Name | `.` + name | `getpwnam` / `getgrnam` |
//! | Id | `=` + decimal uid/gid | `getpwuid` / `getgrgid` |
//! | Sequence | `0` + decimal position | enumeration |
//!
//! Keys are insert-if-absent: when two records share a name or id, the
//! first one owns that key and both still get their own sequence key.
//!
//! On disk the store is a single redb table of raw byte keys and values;
//! readers use point lookups in a read transaction.
//!
//! # Publish protocol
//!
//! 1. Sync the staging store
//! 2. Rename staging over the final path (atomic for readers)
//! 3. Hard-link the final path back to the staging name
//!
//! There is no rollback if step 2 or 3 fails.

pub mod keys;
pub mod reader;
pub mod session;
pub mod store;
pub mod table;

pub use keys::RecordKeys;
pub use reader::CacheReader;
pub use session::{CacheSession, SessionState, SessionStats, TableSession};
pub use store::{InsertOutcome, MemoryStore, OrderedStore, StoreError, StoreResult};
pub use table::TableStore;
