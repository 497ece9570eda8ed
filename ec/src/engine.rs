//! Coordinator protocol engine
//!
//! One [`SessionEngine`] task per agent connection. Everything that can touch
//! session state - inbound messages, the backend response, regeneration
//! ticks, connection close - arrives on one event channel and is handled in
//! arrival order, which is the whole concurrency story for a session.
//!
//! Route regeneration is timer-driven only: location updates during routing
//! mutate state but never plan. A tick with a degraded link is skipped
//! silently - a dropped planning cycle, not a retry.

use std::sync::Arc;
use std::time::Duration;

use eyre::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use evacwire::{AgentMessage, CombinedData, CoordMessage, Coordinate, Route, WireError};

use crate::config::CoordinatorConfig;
use crate::gateway::ShelterSource;
use crate::planner;
use crate::session::{Phase, RouteOutcome, SessionState};

/// Text of the terminal notice sent to the agent.
const EVAC_COMPLETE_NOTICE: &str = "Evacuation complete. You have reached the shelter.";

/// Events serialized onto a session's channel.
#[derive(Debug)]
pub enum SessionEvent {
    /// A decoded message from the agent
    Inbound(AgentMessage),

    /// A line that failed to decode; logged and dropped
    Malformed(WireError),

    /// Result of the one-time backend fetch
    BackendData(Result<CombinedData>),

    /// Regeneration timer tick
    Tick,

    /// The agent connection closed (either side)
    Closed,
}

/// Whether the session keeps running after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Terminate,
}

/// Scoped handle for the regeneration interval task.
///
/// Dropping the handle aborts the task, so a torn-down session can never
/// receive another tick.
#[derive(Debug)]
pub struct RegenTimer {
    handle: JoinHandle<()>,
}

impl RegenTimer {
    /// Spawn an interval task feeding [`SessionEvent::Tick`] into `events_tx`
    /// every `period`. The first tick fires one period from now.
    pub fn start(period: Duration, events_tx: mpsc::Sender<SessionEvent>) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // interval's first tick completes immediately; swallow it so the
            // cadence starts a full period after the route was first sent
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if events_tx.send(SessionEvent::Tick).await.is_err() {
                    break;
                }
            }
        });
        Self { handle }
    }
}

impl Drop for RegenTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// The protocol engine for one agent session.
pub struct SessionEngine {
    session_id: Uuid,
    config: CoordinatorConfig,
    state: SessionState,
    shelter_source: Arc<dyn ShelterSource>,
    /// Clone handed to the fetch task and the regeneration timer.
    events_tx: mpsc::Sender<SessionEvent>,
    /// Drained by the connection's writer task.
    outbound: mpsc::Sender<CoordMessage>,
    regen_timer: Option<RegenTimer>,
}

impl SessionEngine {
    pub fn new(
        session_id: Uuid,
        config: CoordinatorConfig,
        shelter_source: Arc<dyn ShelterSource>,
        events_tx: mpsc::Sender<SessionEvent>,
        outbound: mpsc::Sender<CoordMessage>,
    ) -> Self {
        Self {
            session_id,
            config,
            state: SessionState::new(),
            shelter_source,
            events_tx,
            outbound,
            regen_timer: None,
        }
    }

    /// Run the session to completion.
    ///
    /// Consumes the engine and returns when the evacuation completes, the
    /// connection closes, or the event channel is exhausted. The regeneration
    /// timer is released before the state is dropped.
    pub async fn run(mut self, mut events: mpsc::Receiver<SessionEvent>) {
        info!(session_id = %self.session_id, "session started");

        while let Some(event) = events.recv().await {
            if self.handle_event(event).await == Flow::Terminate {
                break;
            }
        }

        // Cancel the timer before the session state goes away
        self.regen_timer.take();
        info!(session_id = %self.session_id, phase = ?self.state.phase, "session ended");
    }

    /// Dispatch one event. Exposed for tests that drive the engine directly.
    pub async fn handle_event(&mut self, event: SessionEvent) -> Flow {
        match event {
            SessionEvent::Inbound(msg) => self.handle_inbound(msg).await,
            SessionEvent::Malformed(err) => {
                warn!(session_id = %self.session_id, error = %err, "dropping malformed message");
                Flow::Continue
            }
            SessionEvent::BackendData(result) => self.handle_backend_data(result).await,
            SessionEvent::Tick => self.handle_tick().await,
            SessionEvent::Closed => {
                debug!(session_id = %self.session_id, phase = ?self.state.phase, "connection closed");
                self.state.phase = Phase::Disconnected;
                Flow::Terminate
            }
        }
    }

    async fn handle_inbound(&mut self, msg: AgentMessage) -> Flow {
        match msg {
            AgentMessage::AgentLocation(location) => {
                let fetch_needed = self.state.record_agent_location(location);
                if fetch_needed {
                    self.spawn_fetch(location);
                }
                Flow::Continue
            }
            AgentMessage::SelectedShelter(location) => self.handle_selection(location).await,
            AgentMessage::SignalStatus(good) => {
                debug!(session_id = %self.session_id, good, "link quality reported");
                self.state.record_link_quality(good);
                Flow::Continue
            }
            AgentMessage::EvacComplete => {
                debug!(session_id = %self.session_id, "agent acknowledged completion");
                Flow::Continue
            }
        }
    }

    /// Issue the one-time backend fetch. `data_fetched` already flipped in
    /// `record_agent_location`, so a duplicate location racing the response
    /// can never get here.
    fn spawn_fetch(&self, location: Coordinate) {
        let source = Arc::clone(&self.shelter_source);
        let events_tx = self.events_tx.clone();
        let session_id = self.session_id;

        tokio::spawn(async move {
            debug!(%session_id, "requesting shelter data from backend");
            let result = source.fetch(location).await;
            // Session may already be gone; nothing to deliver to then
            let _ = events_tx.send(SessionEvent::BackendData(result)).await;
        });
    }

    async fn handle_backend_data(&mut self, result: Result<CombinedData>) -> Flow {
        match result {
            Ok(data) => {
                info!(session_id = %self.session_id, shelters = data.shelters.len(), "shelter data received");
                let shelters = data.shelters.clone();
                self.state.store_combined_data(data.map, data.shelters);
                self.send(CoordMessage::SheltersData(shelters)).await
            }
            Err(err) => {
                // No retry: the session stalls awaiting shelter data and the
                // stall is visible here in the logs
                warn!(session_id = %self.session_id, error = %err, "backend fetch failed; session stalled");
                Flow::Continue
            }
        }
    }

    async fn handle_selection(&mut self, shelter: Coordinate) -> Flow {
        if self.state.agent_location.is_none() {
            warn!(session_id = %self.session_id, "shelter selected before any agent location; ignoring");
            return Flow::Continue;
        }
        // Nothing was offered yet, so there is nothing valid to select; this
        // also keeps a selection racing the backend fetch out of Routing
        if self.state.shelters.is_none() {
            warn!(session_id = %self.session_id, "shelter selected before shelter data arrived; ignoring");
            return Flow::Continue;
        }

        self.state.record_shelter_selection(shelter);
        info!(session_id = %self.session_id, lat = shelter.lat, lng = shelter.lng, "shelter selected");

        let route = planner::plan_route(self.state.agent_location, self.state.selected_shelter);
        self.dispatch_route(route).await
    }

    async fn handle_tick(&mut self) -> Flow {
        if !self.state.evacuation_active {
            return Flow::Continue;
        }
        if self.state.agent_location.is_none() || self.state.selected_shelter.is_none() {
            return Flow::Continue;
        }
        if !self.state.link_quality {
            debug!(session_id = %self.session_id, "link degraded; skipping regeneration tick");
            return Flow::Continue;
        }

        let route = planner::plan_route(self.state.agent_location, self.state.selected_shelter);
        debug!(session_id = %self.session_id, steps = route.len(), "regenerated route");
        self.dispatch_route(route).await
    }

    /// Apply a planned route and emit the matching messages. Shared by the
    /// initial selection and every timer tick.
    async fn dispatch_route(&mut self, route: Route) -> Flow {
        match self.state.apply_route(route.clone()) {
            RouteOutcome::Replaced => {
                if self.send(CoordMessage::RouteData(route)).await == Flow::Terminate {
                    return Flow::Terminate;
                }
                if self.state.mark_regeneration_started() {
                    self.regen_timer = Some(RegenTimer::start(
                        self.config.regen_interval(),
                        self.events_tx.clone(),
                    ));
                    debug!(session_id = %self.session_id, period = ?self.config.regen_interval(), "regeneration timer started");
                }
                Flow::Continue
            }
            RouteOutcome::Completed => {
                // The agent still sees the terminal (empty) plan before the notice
                let _ = self.send(CoordMessage::RouteData(route)).await;
                let _ = self.send(CoordMessage::EvacComplete(EVAC_COMPLETE_NOTICE.to_string())).await;
                self.regen_timer.take();
                info!(session_id = %self.session_id, "evacuation complete");
                Flow::Terminate
            }
            RouteOutcome::AlreadyComplete => Flow::Continue,
        }
    }

    async fn send(&self, msg: CoordMessage) -> Flow {
        if self.outbound.send(msg).await.is_err() {
            // Writer gone means the connection is gone
            debug!(session_id = %self.session_id, "outbound channel closed");
            return Flow::Terminate;
        }
        Flow::Continue
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }
}
