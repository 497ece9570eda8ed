//! Agent entry point

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use evacagent::cli::Cli;
use evacagent::Config;

fn setup_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    tokio::select! {
        result = evacagent::run_agent(cli.port, config.agent) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
            Ok(())
        }
    }
}
