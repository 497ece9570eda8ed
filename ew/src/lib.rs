//! Shared wire protocol for the evacuation guidance simulation
//!
//! Agent, Coordinator, and Backend exchange `{type, payload}` envelopes as
//! single lines of JSON over persistent TCP connections. This crate holds the
//! value types, the envelope enums for each direction, and the line codec.

pub mod codec;
pub mod envelope;
mod types;

pub use codec::{MAX_LINE_BYTES, WireError, decode_line, encode_line, read_frame};
pub use envelope::{AgentMessage, BackendRequest, BackendResponse, CoordMessage};
pub use types::{CombinedData, Coordinate, MapDescriptor, Route, Shelter};
