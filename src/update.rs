//! Map update orchestration
//!
//! Enumerates one map from a record source, indexes every record into a
//! fresh session and publishes it over the configured cache path.

use crate::cache::{CacheSession, MemoryStore, OrderedStore, SessionStats, TableSession};
use crate::config::schema::UpdateConfig;
use crate::error::{StatusKind, UpdateDbError, UpdateDbResult};
use crate::record::{CacheRecord, MapKind};
use crate::source::RecordSource;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Knobs for a single map update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Build in memory and publish nothing
    pub dry_run: bool,
    /// Keep the existing cache when no record was indexed
    pub refuse_empty: bool,
    /// Create the cache directory when it is missing
    pub create_dirs: bool,
}

impl UpdateOptions {
    /// Options taken from the `[update]` config section
    pub fn from_config(config: &UpdateConfig) -> Self {
        Self {
            dry_run: false,
            refuse_empty: config.refuse_empty,
            create_dirs: config.create_dirs,
        }
    }

    /// Same options with dry-run toggled
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Summary of a finished map update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub map: MapKind,
    pub path: PathBuf,
    pub records: u64,
    pub keys_written: u64,
    pub duplicate_keys: u64,
    pub rejected: u64,
    pub dry_run: bool,
}

impl UpdateReport {
    fn new(map: MapKind, path: &Path, stats: SessionStats, dry_run: bool) -> Self {
        Self {
            map,
            path: path.to_path_buf(),
            records: stats.records,
            keys_written: stats.keys_written,
            duplicate_keys: stats.duplicate_keys,
            rejected: stats.rejected,
            dry_run,
        }
    }
}

/// Rebuild the cache for `map` at `final_path` from `source`
///
/// Any failure leaves the previously published cache in place.
pub async fn update_map(
    source: &dyn RecordSource,
    map: MapKind,
    final_path: &Path,
    options: UpdateOptions,
) -> UpdateDbResult<UpdateReport> {
    debug!(
        "Updating {} from {} into {}",
        map,
        source.name(),
        final_path.display()
    );

    if options.create_dirs && !options.dry_run {
        ensure_parent_dir(final_path).await?;
    }

    let path = final_path.to_path_buf();
    let publish_task = match map {
        MapKind::Passwd => {
            let entries = source.passwd_entries().await?;
            tokio::task::spawn_blocking(move || publish(&entries, &path, options))
        }
        MapKind::Group => {
            let entries = source.group_entries().await?;
            tokio::task::spawn_blocking(move || publish(&entries, &path, options))
        }
    };

    publish_task
        .await
        .map_err(|e| UpdateDbError::Task(format!("publishing {}: {}", map, e)))?
}

fn publish<R: CacheRecord>(
    records: &[R],
    final_path: &Path,
    options: UpdateOptions,
) -> UpdateDbResult<UpdateReport> {
    if options.dry_run {
        build::<MemoryStore, R>(CacheSession::open(final_path)?, records, options)
    } else {
        build::<_, R>(TableSession::open(final_path)?, records, options)
    }
}

fn build<S: OrderedStore, R: CacheRecord>(
    mut session: CacheSession<S>,
    records: &[R],
    options: UpdateOptions,
) -> UpdateDbResult<UpdateReport> {
    for record in records {
        match session.insert(record) {
            Ok(()) => {}
            Err(e) if e.kind() == StatusKind::NotFound => {
                warn!("Skipping {} record: {}", R::MAP, e);
            }
            Err(e) => {
                let _ = session.abort();
                return Err(e);
            }
        }
    }

    let stats = session.stats();
    if options.refuse_empty && stats.records == 0 {
        let _ = session.abort();
        return Err(UpdateDbError::EmptyMap {
            map: R::MAP,
            path: session.final_path().to_path_buf(),
        });
    }

    let report = UpdateReport::new(R::MAP, session.final_path(), stats, options.dry_run);

    if options.dry_run {
        info!(
            "Dry run: {} {} records would be published to {}",
            stats.records,
            R::MAP,
            report.path.display()
        );
    } else {
        session.commit()?;
    }

    session.close();
    Ok(report)
}

async fn ensure_parent_dir(path: &Path) -> UpdateDbResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).await.map_err(|e| {
                UpdateDbError::io(format!("creating cache directory {}", parent.display()), e)
            })
        }
        _ => Ok(()),
    }
}
