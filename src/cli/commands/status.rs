//! Status command - report on the published caches

use crate::cache::CacheReader;
use crate::cli::args::{OutputFormat, StatusArgs};
use crate::config::Config;
use crate::error::UpdateDbResult;
use crate::record::MapKind;
use crate::ui::{self, UiContext};
use chrono::{DateTime, Local};
use console::style;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;

/// State of one map's cache file
#[derive(Debug, Serialize)]
pub struct MapStatus {
    pub map: MapKind,
    pub path: PathBuf,
    pub present: bool,
    pub size: Option<u64>,
    pub modified: Option<DateTime<Local>>,
    pub entries: Option<u64>,
    pub records: Option<u64>,
    pub readable: Option<bool>,
    pub error: Option<String>,
}

/// Execute the status command
pub async fn execute(args: StatusArgs, config: &Config) -> UpdateDbResult<()> {
    let mut statuses = Vec::new();
    for map in MapKind::ALL {
        statuses.push(inspect(map, config.map_path(map)).await);
    }

    match args.format {
        OutputFormat::Table => print_table(&statuses),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&statuses)?),
        OutputFormat::Plain => print_plain(&statuses),
    }

    Ok(())
}

/// Collect the status of the cache at `path`
pub async fn inspect(map: MapKind, path: &Path) -> MapStatus {
    let mut status = MapStatus {
        map,
        path: path.to_path_buf(),
        present: false,
        size: None,
        modified: None,
        entries: None,
        records: None,
        readable: None,
        error: None,
    };

    let metadata = match fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(_) => return status,
    };

    status.present = true;
    status.size = Some(metadata.len());
    status.modified = metadata.modified().ok().map(DateTime::<Local>::from);

    match CacheReader::open(path) {
        Ok(reader) => {
            status.readable = Some(true);
            status.entries = Some(reader.len());
            match reader.record_count() {
                Ok(records) => status.records = Some(records),
                Err(e) => status.error = Some(e.to_string()),
            }
        }
        Err(e) => {
            status.readable = Some(false);
            status.error = Some(e.to_string());
        }
    }

    status
}

fn print_table(statuses: &[MapStatus]) {
    let ctx = UiContext::detect();

    for status in statuses {
        ui::section(&ctx, &format!("{} ({})", status.map, status.path.display()));

        if !status.present {
            ui::step_warn(&ctx, "not published");
            continue;
        }

        if let Some(size) = status.size {
            ui::key_value(&ctx, "size", &format!("{} bytes", size));
        }
        if let Some(modified) = status.modified {
            ui::key_value(&ctx, "modified", &modified.format("%Y-%m-%d %H:%M:%S").to_string());
        }
        if let Some(records) = status.records {
            ui::key_value(&ctx, "records", &records.to_string());
        }
        if let Some(entries) = status.entries {
            ui::key_value(&ctx, "keys", &entries.to_string());
        }
        if let Some(ok) = status.readable {
            let value = if ok { "yes" } else { "no" };
            ui::key_value_status(&ctx, "readable", value, ok);
        }
        if let Some(ref error) = status.error {
            ui::step_error(&ctx, error);
        }
    }

    println!();
    let healthy = statuses
        .iter()
        .filter(|s| s.readable == Some(true))
        .count();
    println!(
        "{}",
        style(format!("{}/{} caches readable", healthy, statuses.len())).bold()
    );
}

fn print_plain(statuses: &[MapStatus]) {
    for status in statuses {
        let state = match (status.present, status.readable) {
            (false, _) => "missing",
            (true, Some(true)) => "ok",
            (true, _) => "invalid",
        };
        println!(
            "{} {} {} {}",
            status.map,
            state,
            status.records.unwrap_or(0),
            status.path.display()
        );
    }
}
