//! Evacuation Agent
//!
//! A simulated evacuee: connects to the Coordinator, reports a jittered
//! starting position, picks a shelter from the offered list, and walks the
//! planned route one waypoint per step while sampling its own link quality.

pub mod agent;
pub mod cli;
pub mod config;
pub mod traversal;

pub use agent::{run_agent, Agent, AgentEvent, Flow};
pub use config::{AgentConfig, Config};
pub use traversal::Traversal;
