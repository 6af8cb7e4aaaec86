//! Update command - rebuild caches from a name service

use crate::cli::args::UpdateArgs;
use crate::config::Config;
use crate::error::UpdateDbResult;
use crate::source;
use crate::ui::{self, TaskSpinner, UiContext};
use crate::update::{update_map, UpdateOptions};
use tracing::info;

/// Execute the update command
///
/// Maps are rebuilt one after the other; the first failure stops the run.
pub async fn execute(args: UpdateArgs, config: &Config) -> UpdateDbResult<()> {
    let source = source::for_service(&args.service, config)?;
    let options = UpdateOptions::from_config(&config.update).dry_run(args.dry_run);
    let ctx = UiContext::detect();

    for map in args.maps() {
        let path = args
            .path_override(map)
            .cloned()
            .unwrap_or_else(|| config.map_path(map).to_path_buf());

        let mut spinner = TaskSpinner::new(&ctx);
        spinner.start(&format!("Enumerating {} from {}", map, source.name()));
        let result = update_map(source.as_ref(), map, &path, options).await;
        spinner.clear();

        match result {
            Ok(report) => {
                ui::map_status(&map.to_string(), "done.");
                info!(
                    "{}: {} records, {} keys, {} duplicate keys, {} rejected",
                    map,
                    report.records,
                    report.keys_written,
                    report.duplicate_keys,
                    report.rejected
                );
            }
            Err(e) => {
                ui::map_status(&map.to_string(), &format!("{}.", e.kind()));
                return Err(e);
            }
        }
    }

    Ok(())
}
