//! Value types carried in protocol payloads

use serde::{Deserialize, Serialize};

/// A WGS84 position in decimal degrees. Wire fields are `lat`/`lng`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// One shelter candidate produced by the Backend.
///
/// The location serializes flattened, so a shelter travels as
/// `{"id": 1, "name": "Shelter A", "lat": ..., "lng": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shelter {
    pub id: u32,
    pub name: String,
    #[serde(flatten)]
    pub location: Coordinate,
}

/// An ordered waypoint sequence from current position toward a destination,
/// exclusive of the starting point and inclusive of the destination.
///
/// The empty route is a sentinel meaning "already arrived". Routes are
/// replaced wholesale on every regeneration and never mutated in place, so
/// in-flight consumers always see a consistent snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Route(Vec<Coordinate>);

impl Route {
    pub fn new(waypoints: Vec<Coordinate>) -> Self {
        Self(waypoints)
    }

    /// The "already arrived" sentinel.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn waypoints(&self) -> &[Coordinate] {
        &self.0
    }

    /// The destination, when the route has one.
    pub fn last(&self) -> Option<Coordinate> {
        self.0.last().copied()
    }
}

/// Map data around a location. Produced by the Backend and passed through the
/// Coordinator untouched; only the Agent side ever renders it.
pub type MapDescriptor = serde_json::Value;

/// The Backend's one-shot answer: map descriptor plus shelter candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedData {
    pub map: MapDescriptor,
    pub shelters: Vec<Shelter>,
}
