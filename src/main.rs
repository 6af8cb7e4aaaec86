//! nss-updatedb - build nss_db style passwd and group caches
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use nss_updatedb::cli::args::LogFormat;
use nss_updatedb::cli::{Cli, Commands};
use nss_updatedb::config::ConfigManager;
use nss_updatedb::error::UpdateDbResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            e.kind().into()
        }
    }
}

async fn run() -> UpdateDbResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    let log_format = cli
        .log_format
        .unwrap_or_else(|| LogFormat::from_config(&config.general.log_format));
    init_logging(cli.verbose, log_format);
    debug!("Loaded configuration from {}", config_manager.path().display());

    match cli.command {
        Commands::Update(args) => nss_updatedb::cli::commands::update(args, &config).await,
        Commands::Lookup(args) => nss_updatedb::cli::commands::lookup(args, &config).await,
        Commands::Status(args) => nss_updatedb::cli::commands::status(args, &config).await,
        Commands::Config(args) => {
            nss_updatedb::cli::commands::config(args, &config, &config_manager).await
        }
    }
}

/// Logs go to stderr: 0 = warn, 1 = info, 2+ = debug
fn init_logging(verbose: u8, format: LogFormat) {
    let filter = match verbose {
        0 => EnvFilter::new("nss_updatedb=warn"),
        1 => EnvFilter::new("nss_updatedb=info"),
        _ => EnvFilter::new("nss_updatedb=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
