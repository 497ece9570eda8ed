//! CLI definition for the Backend binary

use clap::Parser;

/// Evacuation guidance Backend
#[derive(Debug, Parser)]
#[command(name = "eb", about = "Map and shelter data backend", version)]
pub struct Cli {
    /// Port to listen on for coordinator connections
    #[arg(value_name = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
