//! Error types for nss-updatedb
//!
//! All modules use `UpdateDbResult<T>` as their return type. Every error
//! collapses onto one of three status kinds, which decide how the caller
//! reacts and which exit code the CLI reports.

use crate::cache::store::StoreError;
use crate::record::MapKind;
use std::collections::TryReserveError;
use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Result type alias for nss-updatedb operations
pub type UpdateDbResult<T> = Result<T, UpdateDbError>;

/// Coarse outcome class of a failed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    /// An allocation failed; retrying later may succeed
    ResourceExhausted,
    /// The store, filesystem or name service failed; the build is abandoned
    Unavailable,
    /// A record had no primary name; only that record is rejected
    NotFound,
}

impl StatusKind {
    /// Short human-readable status, as printed after `passwd... `
    pub fn describe(&self) -> &'static str {
        match self {
            Self::ResourceExhausted => "out of memory",
            Self::Unavailable => "nameservice unavailable",
            Self::NotFound => "not found",
        }
    }

    /// sysexits(3) code reported by the CLI
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NotFound => 67,
            Self::Unavailable => 69,
            Self::ResourceExhausted => 75,
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

impl From<StatusKind> for ExitCode {
    fn from(kind: StatusKind) -> Self {
        ExitCode::from(kind.exit_code())
    }
}

/// All errors that can occur in nss-updatedb
#[derive(Error, Debug)]
pub enum UpdateDbError {
    // Allocation errors
    #[error("Out of memory while {context}")]
    OutOfMemory {
        context: String,
        #[source]
        source: TryReserveError,
    },

    // Record errors
    #[error("{map} record has no name")]
    MissingName { map: MapKind },

    #[error("No {map} entry for key {key}")]
    KeyNotFound { map: MapKind, key: String },

    // Store errors
    #[error("Failed to create cache store at {path}: {source}")]
    StoreCreate {
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    #[error("Failed to insert key '{key}' into cache store: {source}")]
    StoreInsert {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to sync cache store {path}: {source}")]
    StoreSync {
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    #[error("Failed to read cache {path}: {source}")]
    StoreRead {
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    // Publish errors
    #[error("Failed to {step} {from} -> {to}: {source}")]
    Publish {
        step: &'static str,
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache build for {0} aborted")]
    Aborted(PathBuf),

    #[error("Cache session for {0} is already finished")]
    SessionFinished(PathBuf),

    #[error("Refusing to replace {path}: no {map} records were retrieved")]
    EmptyMap { map: MapKind, path: PathBuf },

    // Name service errors
    #[error("Cannot run nss-updatedb against nss_db")]
    UnsupportedService(String),

    #[error("Name service '{service}' failed to enumerate {map}: {reason}")]
    Source {
        service: String,
        map: MapKind,
        reason: String,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid path: {path}: {reason}")]
    PathInvalid { path: PathBuf, reason: String },

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl UpdateDbError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an allocation failure with context
    pub fn out_of_memory(context: impl Into<String>, source: TryReserveError) -> Self {
        Self::OutOfMemory {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Status class of this error
    pub fn kind(&self) -> StatusKind {
        match self {
            Self::OutOfMemory { .. } => StatusKind::ResourceExhausted,
            Self::MissingName { .. } | Self::KeyNotFound { .. } => StatusKind::NotFound,
            _ => StatusKind::Unavailable,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedService(_) => {
                Some("Pick the name service the cache is built from, e.g. ldap or files")
            }
            Self::StoreCreate { .. } | Self::Publish { .. } => {
                Some("Check that the cache directory exists and is writable")
            }
            Self::EmptyMap { .. } => Some("Set update.refuse_empty = false to publish empty maps"),
            Self::CommandFailed { .. } => Some("Is getent installed? See sources.getent"),
            _ => None,
        }
    }
}
