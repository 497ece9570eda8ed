//! Great-circle distance and straight-line route interpolation
//!
//! Interpolation is linear in degree space, not geodesic: distances in this
//! simulation are a few hundred meters, where the error is negligible.

use evacwire::{Coordinate, Route};

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates, via the haversine formula.
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Divide the straight line from `start` to `end` into `steps` equal
/// increments, returning the `steps` waypoints past `start`; the last one
/// equals `end`. Callers clamp `steps` to at least 1.
pub fn interpolate(start: Coordinate, end: Coordinate, steps: usize) -> Route {
    debug_assert!(steps >= 1, "interpolate requires at least one step");
    let d_lat = (end.lat - start.lat) / steps as f64;
    let d_lng = (end.lng - start.lng) / steps as f64;

    let waypoints = (1..=steps)
        .map(|i| Coordinate::new(start.lat + d_lat * i as f64, start.lng + d_lng * i as f64))
        .collect();
    Route::new(waypoints)
}

/// Latitude offset in degrees corresponding to `meters` of northward travel.
/// Test helper for building coordinate pairs a known distance apart.
#[cfg(test)]
pub(crate) fn northward_degrees(meters: f64) -> f64 {
    (meters / EARTH_RADIUS_M).to_degrees()
}
