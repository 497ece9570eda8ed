//! Message envelopes, one enum per direction
//!
//! Every message is `{"type": "...", "payload": ...}` with a camelCase type
//! tag; serde's adjacent tagging reproduces the wire format exactly. A unit
//! variant omits the payload field entirely.

use serde::{Deserialize, Serialize};

use crate::types::{CombinedData, Coordinate, Route, Shelter};

/// Agent -> Coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum AgentMessage {
    /// Periodic position report
    AgentLocation(Coordinate),

    /// The shelter the agent chose from the offered list
    SelectedShelter(Coordinate),

    /// Link-quality sample (true = good)
    SignalStatus(bool),

    /// Optional acknowledgement of the completion notice
    EvacComplete,
}

/// Coordinator -> Agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum CoordMessage {
    /// Shelter candidates around the agent's first reported position
    SheltersData(Vec<Shelter>),

    /// A freshly planned route; an empty list means "already arrived"
    RouteData(Route),

    /// Terminal notice with a human-readable message
    EvacComplete(String),
}

/// Coordinator -> Backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum BackendRequest {
    /// Ask for map and shelter data around a location
    LocationInfo(Coordinate),
}

/// Backend -> Coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum BackendResponse {
    /// Map descriptor and shelter list in one answer
    CombinedData(CombinedData),
}
