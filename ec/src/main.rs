//! Coordinator entry point

use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use evaccoord::cli::Cli;
use evaccoord::{BackendGateway, Config, CoordServer};

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

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    if let Some(port) = cli.backend_port {
        config.coordinator.backend_port = port;
    }

    let gateway = BackendGateway::new(&config.coordinator.backend_host, config.coordinator.backend_port);
    let server = CoordServer::new(config.coordinator, Arc::new(gateway));
    let registry = server.registry();

    let listener = TcpListener::bind(("127.0.0.1", cli.port))
        .await
        .context(format!("Failed to bind port {}", cli.port))?;

    tokio::select! {
        result = server.run(listener) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
            registry.close_all().await;
            Ok(())
        }
    }
}
