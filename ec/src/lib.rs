//! Evacuation Coordinator
//!
//! The Coordinator accepts persistent agent connections, fetches map and
//! shelter data from the Backend exactly once per session, plans straight-line
//! evacuation routes, and regenerates them on a fixed timer while the agent's
//! link holds up. Every session is an independent actor: a single event
//! channel serializes inbound messages, backend responses, and regeneration
//! ticks, so session state needs no further synchronization.
//!
//! # Modules
//!
//! - [`geo`] - great-circle distance and waypoint interpolation
//! - [`planner`] - route planning and the arrival policy
//! - [`session`] - per-session state and its invariants
//! - [`engine`] - the protocol engine driving one session
//! - [`gateway`] - backend fetch seam and TCP client
//! - [`server`] - accept loop and session registry
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod engine;
pub mod gateway;
pub mod geo;
pub mod planner;
pub mod server;
pub mod session;

pub use config::{Config, CoordinatorConfig};
pub use engine::{Flow, RegenTimer, SessionEngine, SessionEvent};
pub use gateway::{BackendGateway, ShelterSource};
pub use server::{CoordServer, SessionRegistry};
pub use session::{Phase, RouteOutcome, SessionState};
