//! Lookup command - query a published cache

use crate::cache::{keys, CacheReader, StoreError};
use crate::cli::args::{LookupArgs, LookupKey};
use crate::config::Config;
use crate::error::{UpdateDbError, UpdateDbResult};
use std::path::Path;

/// Execute the lookup command
///
/// Prints the stored value. A missing key prints nothing and fails with
/// the not-found status.
pub async fn execute(args: LookupArgs, config: &Config) -> UpdateDbResult<()> {
    let path = args
        .db
        .clone()
        .unwrap_or_else(|| config.map_path(args.map).to_path_buf());

    let key = raw_key(&args.key).ok_or_else(|| UpdateDbError::KeyNotFound {
        map: args.map,
        key: "(none)".to_string(),
    })?;

    let reader = CacheReader::open(&path).map_err(|e| read_error(&path, e))?;

    match reader.get(&key).map_err(|e| read_error(&path, e))? {
        Some(value) => {
            println!("{}", String::from_utf8_lossy(&value));
            Ok(())
        }
        None => Err(UpdateDbError::KeyNotFound {
            map: args.map,
            key: keys::display_key(&key),
        }),
    }
}

fn raw_key(key: &LookupKey) -> Option<Vec<u8>> {
    if let Some(name) = &key.name {
        Some(keys::name_key(name))
    } else if let Some(id) = key.id {
        Some(keys::id_key(id))
    } else {
        key.index.map(keys::sequence_key)
    }
}

fn read_error(path: &Path, source: StoreError) -> UpdateDbError {
    UpdateDbError::StoreRead {
        path: path.to_path_buf(),
        source,
    }
}
