//! CLI definition for the Coordinator binary

use clap::Parser;
use std::path::PathBuf;

/// Evacuation guidance Coordinator
#[derive(Debug, Parser)]
#[command(name = "ec", about = "Evacuation guidance coordinator", version)]
pub struct Cli {
    /// Port to listen on for agent connections
    #[arg(value_name = "PORT")]
    pub port: u16,

    /// Backend port override
    #[arg(short = 'b', long = "backend-port")]
    pub backend_port: Option<u16>,

    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
