//! CLI module graph and command dispatch.

pub mod cleanup;
pub mod command;
pub mod diagnostic;
pub mod metrics;
pub mod output;
pub mod publish;
pub mod watch;

use url::Url;

use self::command::{Cli, Commands};
use self::output::OutputConfig;
use crate::error::{ConfigError, Result};
use crate::infrastructure::bootstrap::{build_connection, build_services};
use crate::infrastructure::config::settings::Config;

/// Run the parsed command line to completion.
///
/// # Errors
///
/// Returns a rendered report for any failure, including configuration
/// errors found before the command starts.
pub async fn run(cli: Cli) -> miette::Result<()> {
    output::configure(OutputConfig::new(cli.json, cli.quiet, cli.verbose));
    dispatch(&cli)
        .await
        .map_err(|e| diagnostic::report(e, &cli.config))
}

async fn dispatch(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    config.init_logging();

    match &cli.command {
        Commands::Cleanup(args) => {
            cleanup::execute_cleanup(&build_services(&config)?, &config.retention, args)
        }
        Commands::PruneMetrics(args) => {
            cleanup::execute_prune(&build_services(&config)?, &config.retention, args)
        }
        Commands::Metrics(command) => metrics::execute(&build_services(&config)?.aggregator, command),
        Commands::Publish(args) => publish::execute(&build_services(&config)?, args),
        Commands::Watch(args) => {
            let address = args
                .url
                .clone()
                .unwrap_or_else(|| config.connection.url.clone());
            check_feed_address(&address)?;
            watch::execute(build_connection(&config), address).await
        }
    }
}

/// Load the configuration and apply the global verbosity flags.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(level) = level_override(cli.quiet, cli.verbose) {
        config.logging.level = level.to_string();
    }
    Ok(config)
}

const fn level_override(quiet: bool, verbose: u8) -> Option<&'static str> {
    match (quiet, verbose) {
        (_, 0) if quiet => Some("warn"),
        (_, 0) => None,
        (_, 1) => Some("debug"),
        _ => Some("trace"),
    }
}

fn check_feed_address(address: &str) -> Result<()> {
    let url = Url::parse(address)?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(ConfigError::InvalidValue {
            field: "connection.url",
            reason: format!("scheme must be ws or wss, got {}", url.scheme()),
        }
        .into());
    }
    Ok(())
}
