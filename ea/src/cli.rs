//! CLI definition for the Agent binary

use clap::Parser;
use std::path::PathBuf;

/// Evacuation guidance Agent
#[derive(Debug, Parser)]
#[command(name = "ea", about = "Simulated evacuee agent", version)]
pub struct Cli {
    /// Coordinator port to connect to
    #[arg(value_name = "PORT")]
    pub port: u16,

    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
