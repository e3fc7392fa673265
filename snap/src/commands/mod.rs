// Command handlers for droplet operations

use anyhow::{Context, Result};
use chrono::Local;
use tracing::debug;

use crate::cli::{Args, Command};
use snap_config::{ConfigLoader, SnapshotConfig};
use snap_logging::{init_subscriber, LogOptions};
use snap_provider::{AdapterOptions, DigitalOcean, HttpClient};

// Individual command modules
pub mod list;
pub mod snap;

/// Main command dispatcher
#[must_use = "command execution results should be handled"]
pub fn execute_command(args: Args) -> Result<()> {
    let config = ConfigLoader::new(args.config.clone()).load(args.overrides())?;

    let log_options = LogOptions {
        level: LogOptions::level_for(args.trace, args.quiet).to_string(),
        file: config.log.clone(),
        ..LogOptions::default()
    };
    let _guard = init_subscriber(&log_options).context("Failed to initialize logging")?;
    debug!("Resolved configuration: {:?}", config);

    config.validate()?;
    let adapter = build_adapter(&config)?;

    match args.command {
        Command::Snap(_) => {
            debug!("Handling snap command");
            snap::handle_snap(&adapter, &config, Local::now().date_naive())
        }
        Command::List => {
            debug!("Handling list command");
            list::handle_list(&adapter)
        }
    }
}

fn build_adapter(config: &SnapshotConfig) -> Result<DigitalOcean<HttpClient>> {
    let client = HttpClient::new(config.api_url.as_str(), config.token()?)?;
    Ok(DigitalOcean::with_defaults(
        client,
        AdapterOptions::from(config),
    )?)
}
