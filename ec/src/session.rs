//! Per-session state
//!
//! One [`SessionState`] per agent connection, owned exclusively by that
//! session's engine task. Mutators return plain values describing what the
//! engine must do next - the state machine never calls back into the
//! protocol layer.

use evacwire::{Coordinate, MapDescriptor, Route, Shelter};

/// Protocol phase of one agent session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Connected; no location received yet
    AwaitingFirstLocation,
    /// Backend fetch in flight
    AwaitingShelterData,
    /// Shelters sent; waiting for the agent's choice
    AwaitingShelterSelection,
    /// Regeneration timer active
    Routing,
    /// Evacuation finished (terminal)
    Complete,
    /// Connection lost (terminal, from any phase)
    Disconnected,
}

/// Result of applying a freshly planned route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Route stored; evacuation continues.
    Replaced,
    /// The empty route ended the evacuation in this same step.
    Completed,
    /// Evacuation was already over; nothing changed.
    AlreadyComplete,
}

/// The authoritative state of one evacuation session.
#[derive(Debug)]
pub struct SessionState {
    pub agent_location: Option<Coordinate>,
    pub shelters: Option<Vec<Shelter>>,
    pub selected_shelter: Option<Coordinate>,
    pub current_route: Option<Route>,
    /// Opaque map data held for the session; never inspected.
    pub map: Option<MapDescriptor>,
    /// true = the agent's link can receive fresh planning data.
    pub link_quality: bool,
    pub evacuation_active: bool,
    pub phase: Phase,
    /// Guards the at-most-once Backend fetch.
    data_fetched: bool,
    /// Guards the at-most-once regeneration timer start.
    regeneration_started: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            agent_location: None,
            shelters: None,
            selected_shelter: None,
            current_route: None,
            map: None,
            link_quality: true,
            evacuation_active: true,
            phase: Phase::AwaitingFirstLocation,
            data_fetched: false,
            regeneration_started: false,
        }
    }

    /// Record a position report.
    ///
    /// Returns true exactly once per session: when this location must trigger
    /// the one-time Backend fetch. The guard flips here, synchronously, so
    /// later locations arriving while the fetch is still in flight only
    /// update the field.
    pub fn record_agent_location(&mut self, location: Coordinate) -> bool {
        self.agent_location = Some(location);

        if self.data_fetched {
            return false;
        }
        self.data_fetched = true;
        self.phase = Phase::AwaitingShelterData;
        true
    }

    /// Store the Backend's answer and move on to shelter selection.
    pub fn store_combined_data(&mut self, map: MapDescriptor, shelters: Vec<Shelter>) {
        self.map = Some(map);
        self.shelters = Some(shelters);
        self.phase = Phase::AwaitingShelterSelection;
    }

    pub fn record_shelter_selection(&mut self, location: Coordinate) {
        self.selected_shelter = Some(location);
    }

    pub fn record_link_quality(&mut self, good: bool) {
        self.link_quality = good;
    }

    /// Replace the current route wholesale.
    ///
    /// An empty route while evacuation is active flips `evacuation_active`
    /// in this same step - there is never an "empty route but still active"
    /// state. Applying any route after completion is a no-op.
    pub fn apply_route(&mut self, route: Route) -> RouteOutcome {
        if !self.evacuation_active {
            return RouteOutcome::AlreadyComplete;
        }

        let arrived = route.is_empty();
        self.current_route = Some(route);

        if arrived {
            self.evacuation_active = false;
            self.phase = Phase::Complete;
            RouteOutcome::Completed
        } else {
            self.phase = Phase::Routing;
            RouteOutcome::Replaced
        }
    }

    /// Returns true the first time only; the caller starts the timer then.
    pub fn mark_regeneration_started(&mut self) -> bool {
        if self.regeneration_started {
            return false;
        }
        self.regeneration_started = true;
        true
    }

    pub fn data_fetched(&self) -> bool {
        self.data_fetched
    }

    pub fn regeneration_started(&self) -> bool {
        self.regeneration_started
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HERE: Coordinate = Coordinate { lat: 35.68, lng: 139.767 };
    const THERE: Coordinate = Coordinate { lat: 35.681, lng: 139.768 };

    #[test]
    fn test_first_location_triggers_fetch_once() {
        let mut state = SessionState::new();

        assert!(state.record_agent_location(HERE));
        assert_eq!(state.phase, Phase::AwaitingShelterData);

        // Duplicates while the fetch is outstanding update the field only
        assert!(!state.record_agent_location(THERE));
        assert!(!state.record_agent_location(HERE));
        assert_eq!(state.agent_location, Some(HERE));
        assert!(state.data_fetched());
    }

    #[test]
    fn test_store_combined_data_advances_phase() {
        let mut state = SessionState::new();
        state.record_agent_location(HERE);

        state.store_combined_data(serde_json::json!({"area": "test"}), vec![]);
        assert_eq!(state.phase, Phase::AwaitingShelterSelection);
        assert!(state.shelters.is_some());
    }

    #[test]
    fn test_apply_nonempty_route_enters_routing() {
        let mut state = SessionState::new();
        let route = Route::new(vec![THERE]);

        assert_eq!(state.apply_route(route.clone()), RouteOutcome::Replaced);
        assert_eq!(state.phase, Phase::Routing);
        assert!(state.evacuation_active);
        assert_eq!(state.current_route, Some(route));
    }

    #[test]
    fn test_empty_route_completes_in_same_step() {
        let mut state = SessionState::new();

        assert_eq!(state.apply_route(Route::empty()), RouteOutcome::Completed);
        assert!(!state.evacuation_active);
        assert_eq!(state.phase, Phase::Complete);
    }

    #[test]
    fn test_completion_is_idempotent() {
        let mut state = SessionState::new();
        state.apply_route(Route::empty());

        // Neither a second empty route nor a late non-empty one changes anything
        assert_eq!(state.apply_route(Route::empty()), RouteOutcome::AlreadyComplete);
        assert_eq!(state.apply_route(Route::new(vec![THERE])), RouteOutcome::AlreadyComplete);
        assert_eq!(state.phase, Phase::Complete);
        assert!(state.current_route.unwrap().is_empty());
    }

    #[test]
    fn test_regeneration_starts_at_most_once() {
        let mut state = SessionState::new();

        assert!(state.mark_regeneration_started());
        assert!(!state.mark_regeneration_started());
        assert!(state.regeneration_started());
    }

    #[test]
    fn test_link_quality_defaults_good() {
        let mut state = SessionState::new();
        assert!(state.link_quality);

        state.record_link_quality(false);
        assert!(!state.link_quality);
        state.record_link_quality(true);
        assert!(state.link_quality);
    }
}
