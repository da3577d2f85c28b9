//! stationq - live station queue client

use clap::Parser;
use tracing::{error, info};

use stationq_cli::{cli::Cli, commands::CommandDispatcher, config::AppConfig, error::Result};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = match load_configuration(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = CommandDispatcher::execute(cli.command, config).await {
        error!("Command execution failed: {}", e);
        std::process::exit(1);
    }

    info!("stationq exited successfully");
    Ok(())
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Load file configuration, then environment and command line overrides
fn load_configuration(cli: &Cli) -> Result<AppConfig> {
    AppConfig::load_with_overrides(cli.config.as_deref(), cli.token.clone())
}
