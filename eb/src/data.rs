//! Synthesized map and shelter data
//!
//! The Backend fabricates plausible data around whatever location it is
//! asked about: three named shelters scattered a few hundred meters away and
//! an opaque map descriptor the Coordinator passes through untouched.

use rand::Rng;

use evacwire::{CombinedData, Coordinate, MapDescriptor, Shelter};

/// Shelter scatter bounds, in decimal degrees from the query point.
const OFFSET_MIN_DEG: f64 = 0.001;
const OFFSET_MAX_DEG: f64 = 0.003;

/// A signed offset with magnitude in `[OFFSET_MIN_DEG, OFFSET_MAX_DEG)`.
fn random_offset<R: Rng>(rng: &mut R) -> f64 {
    let magnitude = rng.random_range(OFFSET_MIN_DEG..OFFSET_MAX_DEG);
    if rng.random_bool(0.5) { magnitude } else { -magnitude }
}

/// Three shelter candidates scattered around `location`.
pub fn shelters_around<R: Rng>(rng: &mut R, location: Coordinate) -> Vec<Shelter> {
    ["Shelter A", "Shelter B", "Shelter C"]
        .iter()
        .enumerate()
        .map(|(i, name)| Shelter {
            id: i as u32 + 1,
            name: name.to_string(),
            location: Coordinate::new(
                location.lat + random_offset(rng),
                location.lng + random_offset(rng),
            ),
        })
        .collect()
}

/// Map descriptor for the area around `location`.
pub fn map_around(location: Coordinate) -> MapDescriptor {
    serde_json::json!({
        "area": format!("Map data around ({}, {}) within 3km", location.lat, location.lng),
    })
}

/// The combined answer for one locationInfo request.
pub fn combined_data<R: Rng>(rng: &mut R, location: Coordinate) -> CombinedData {
    CombinedData {
        map: map_around(location),
        shelters: shelters_around(rng, location),
    }
}
