//! Route planning
//!
//! `plan_route` is the single source of the completion signal: an empty route
//! means "arrived", and nothing else in the Coordinator ever declares arrival.

use evacwire::{Coordinate, Route};
use tracing::debug;

use crate::geo;

/// Meters of travel represented by one route step.
const METERS_PER_STEP: f64 = 10.0;

/// Step counts below this collapse to "arrived". Deliberately coarse: a
/// destination under 20m away is treated the same as one already reached.
const ARRIVAL_THRESHOLD_STEPS: usize = 2;

/// Plan a route from `start` to `end`.
///
/// Unset endpoints are a no-op guard, not an error: the result is an empty
/// route and the caller decides whether that means anything. Pure and
/// idempotent - identical inputs always yield identical routes.
pub fn plan_route(start: Option<Coordinate>, end: Option<Coordinate>) -> Route {
    let (Some(start), Some(end)) = (start, end) else {
        return Route::empty();
    };

    let distance = geo::distance_meters(start, end);
    let steps = (distance / METERS_PER_STEP).floor() as usize;

    if steps < ARRIVAL_THRESHOLD_STEPS {
        debug!(distance_m = distance, steps, "plan_route: within arrival threshold");
        return Route::empty();
    }

    debug!(distance_m = distance, steps, "plan_route: interpolating");
    geo::interpolate(start, end, steps)
}
