//! Evacuation Backend
//!
//! Serves map and shelter data to the Coordinator over persistent
//! newline-delimited JSON connections. The data is synthesized: three named
//! shelters scattered around the requested location plus an opaque map
//! descriptor.

pub mod cli;
pub mod data;
pub mod server;

pub use server::serve;
