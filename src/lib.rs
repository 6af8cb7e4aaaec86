//! nss-updatedb - identity lookup caches with atomic publish
//!
//! Enumerates passwd and group records from a name service, indexes them
//! by name, id and enumeration order, and publishes the result so that
//! readers only ever see a complete cache.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod record;
pub mod source;
pub mod ui;
pub mod update;

pub use error::{StatusKind, UpdateDbError, UpdateDbResult};
