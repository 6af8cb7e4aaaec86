//! Lookup key encoding
//!
//! Every record is reachable through three keys, distinguished by a
//! one-byte prefix so they can share a single ordered store.

use crate::error::{UpdateDbError, UpdateDbResult};
use std::fmt;

/// Prefix of the key that resolves a record by name
pub const NAME_PREFIX: u8 = b'.';

/// Prefix of the key that resolves a record by uid/gid
pub const ID_PREFIX: u8 = b'=';

/// Prefix of the key that resolves a record by enumeration position
pub const SEQUENCE_PREFIX: u8 = b'0';

/// The three keys a single record is stored under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKeys {
    pub name: Vec<u8>,
    pub id: Vec<u8>,
    pub sequence: Vec<u8>,
}

impl RecordKeys {
    /// Encode the keys for a record at position `sequence`
    pub fn encode(name: &str, id: i64, sequence: u64) -> UpdateDbResult<Self> {
        Ok(Self {
            name: reserve_name_key(name)?,
            id: id_key(id),
            sequence: sequence_key(sequence),
        })
    }

    /// Keys in the order they are written
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        [
            self.name.as_slice(),
            self.id.as_slice(),
            self.sequence.as_slice(),
        ]
        .into_iter()
    }
}

/// `.` followed by the name, byte for byte
pub fn name_key(name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(name.len() + 1);
    key.push(NAME_PREFIX);
    key.extend_from_slice(name.as_bytes());
    key
}

// Names come from the directory and are unbounded, so the session
// reserves them fallibly.
fn reserve_name_key(name: &str) -> UpdateDbResult<Vec<u8>> {
    let mut key = Vec::new();
    key.try_reserve_exact(name.len() + 1)
        .map_err(|e| UpdateDbError::out_of_memory(format!("encoding name key for {}", name), e))?;
    key.push(NAME_PREFIX);
    key.extend_from_slice(name.as_bytes());
    Ok(key)
}

/// `=` followed by the decimal id, signed only when negative
pub fn id_key(id: i64) -> Vec<u8> {
    prefixed_decimal(ID_PREFIX, id)
}

/// `0` followed by the decimal sequence number
pub fn sequence_key(sequence: u64) -> Vec<u8> {
    prefixed_decimal(SEQUENCE_PREFIX, sequence)
}

fn prefixed_decimal(prefix: u8, n: impl fmt::Display) -> Vec<u8> {
    let digits = n.to_string();
    let mut key = Vec::with_capacity(digits.len() + 1);
    key.push(prefix);
    key.extend_from_slice(digits.as_bytes());
    key
}

/// Render a key for log and error messages
pub fn display_key(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}
