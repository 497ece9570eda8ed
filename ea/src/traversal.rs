//! Route traversal state
//!
//! Tracks the agent's progress along the most recent route. Routes arrive
//! wholesale, so a new one restarts progress from its first waypoint.

use evacwire::{Coordinate, Route};

#[derive(Debug, Default)]
pub struct Traversal {
    route: Route,
    next: usize,
}

impl Traversal {
    /// Replace the route being followed and restart from its first waypoint.
    pub fn follow(&mut self, route: Route) {
        self.route = route;
        self.next = 0;
    }

    /// Step to the next waypoint, returning it, or None when the route is
    /// exhausted.
    pub fn advance(&mut self) -> Option<Coordinate> {
        let waypoint = self.route.waypoints().get(self.next).copied()?;
        self.next += 1;
        Some(waypoint)
    }

    pub fn exhausted(&self) -> bool {
        self.next >= self.route.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route_of(points: &[(f64, f64)]) -> Route {
        Route::new(points.iter().map(|&(lat, lng)| Coordinate::new(lat, lng)).collect())
    }

    #[test]
    fn test_advance_walks_waypoints_in_order() {
        let mut traversal = Traversal::default();
        traversal.follow(route_of(&[(1.0, 1.0), (2.0, 2.0)]));

        assert_eq!(traversal.advance(), Some(Coordinate::new(1.0, 1.0)));
        assert_eq!(traversal.advance(), Some(Coordinate::new(2.0, 2.0)));
        assert_eq!(traversal.advance(), None);
        assert!(traversal.exhausted());
    }

    #[test]
    fn test_new_route_restarts_progress() {
        let mut traversal = Traversal::default();
        traversal.follow(route_of(&[(1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]));
        traversal.advance();
        traversal.advance();

        traversal.follow(route_of(&[(5.0, 5.0)]));
        assert_eq!(traversal.advance(), Some(Coordinate::new(5.0, 5.0)));
        assert!(traversal.exhausted());
    }

    #[test]
    fn test_empty_route_is_immediately_exhausted() {
        let mut traversal = Traversal::default();
        traversal.follow(Route::empty());

        assert!(traversal.exhausted());
        assert_eq!(traversal.advance(), None);
    }
}
