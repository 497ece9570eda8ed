//! Backend entry point

use clap::Parser;
use eyre::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use evacbackend::cli::Cli;

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

    let listener = TcpListener::bind(("127.0.0.1", cli.port))
        .await
        .context(format!("Failed to bind port {}", cli.port))?;

    tokio::select! {
        result = evacbackend::serve(listener) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
            Ok(())
        }
    }
}
