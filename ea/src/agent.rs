//! Simulated evacuee
//!
//! One actor loop per agent process. The coordinator connection, the step
//! timer, and the link-quality sampler all feed a single event channel, so
//! agent state is touched from one place only.
//!
//! The agent walks the most recent route one waypoint per step tick and
//! reports its position after every step, moving or not. Link quality is
//! sampled on its own cadence; a degraded sample freezes movement until the
//! next good one, but position reports keep flowing.

use rand::Rng;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use eyre::{Context, Result};

use evacwire::{decode_line, encode_line, read_frame, AgentMessage, CoordMessage, Coordinate, WireError};

use crate::config::AgentConfig;
use crate::traversal::Traversal;

/// Events serialized onto the agent's channel.
#[derive(Debug)]
pub enum AgentEvent {
    /// A decoded message from the Coordinator
    Server(CoordMessage),

    /// A line that failed to decode; logged and dropped
    Malformed(WireError),

    /// Time to walk one waypoint and report position
    StepTick,

    /// Time to sample link quality
    SignalTick,

    /// The connection closed
    Closed,
}

/// Whether the agent keeps running after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Terminate,
}

/// Repeating timer feeding a fixed event into the agent's channel.
/// Dropping it aborts the task.
#[derive(Debug)]
struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    fn start(
        period: std::time::Duration,
        events_tx: mpsc::Sender<AgentEvent>,
        make_event: fn() -> AgentEvent,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // skip the immediate first tick
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if events_tx.send(make_event()).await.is_err() {
                    break;
                }
            }
        });
        Self { handle }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// The agent actor.
pub struct Agent {
    config: AgentConfig,
    location: Coordinate,
    traversal: Traversal,
    signal_good: bool,
    events_tx: mpsc::Sender<AgentEvent>,
    outbound: mpsc::Sender<AgentMessage>,
    step_timer: Option<Ticker>,
    signal_timer: Option<Ticker>,
}

impl Agent {
    pub fn new(
        config: AgentConfig,
        location: Coordinate,
        events_tx: mpsc::Sender<AgentEvent>,
        outbound: mpsc::Sender<AgentMessage>,
    ) -> Self {
        Self {
            config,
            location,
            traversal: Traversal::default(),
            signal_good: true,
            events_tx,
            outbound,
            step_timer: None,
            signal_timer: None,
        }
    }

    /// A starting position jittered around the configured origin.
    pub fn starting_location(config: &AgentConfig) -> Coordinate {
        let mut rng = rand::rng();
        let jitter = config.jitter_deg;
        Coordinate::new(
            config.origin_lat + rng.random_range(-jitter..jitter),
            config.origin_lng + rng.random_range(-jitter..jitter),
        )
    }

    /// Run the actor loop. The initial position report goes out before the
    /// first event is handled.
    pub async fn run(mut self, mut events: mpsc::Receiver<AgentEvent>) {
        info!(lat = self.location.lat, lng = self.location.lng, "agent started");

        if self.send(AgentMessage::AgentLocation(self.location)).await == Flow::Terminate {
            return;
        }

        while let Some(event) = events.recv().await {
            if self.handle_event(event).await == Flow::Terminate {
                break;
            }
        }

        self.step_timer.take();
        self.signal_timer.take();
        info!("agent stopped");
    }

    pub async fn handle_event(&mut self, event: AgentEvent) -> Flow {
        match event {
            AgentEvent::Server(msg) => self.handle_server(msg).await,
            AgentEvent::Malformed(err) => {
                warn!(error = %err, "dropping malformed message");
                Flow::Continue
            }
            AgentEvent::StepTick => self.handle_step().await,
            AgentEvent::SignalTick => self.handle_signal_sample().await,
            AgentEvent::Closed => {
                info!("coordinator closed the connection");
                Flow::Terminate
            }
        }
    }

    async fn handle_server(&mut self, msg: CoordMessage) -> Flow {
        match msg {
            CoordMessage::SheltersData(shelters) => {
                if shelters.is_empty() {
                    warn!("no shelters offered; staying put");
                    return Flow::Continue;
                }
                let pick = rand::rng().random_range(0..shelters.len());
                let shelter = &shelters[pick];
                info!(id = shelter.id, name = %shelter.name, "shelter selected");
                self.send(AgentMessage::SelectedShelter(shelter.location)).await
            }
            CoordMessage::RouteData(route) => {
                debug!(steps = route.len(), "route received");
                self.traversal.follow(route);
                self.start_timers();
                Flow::Continue
            }
            CoordMessage::EvacComplete(notice) => {
                info!(%notice, "evacuation complete");
                // Best-effort acknowledgement; the session is ending anyway
                let _ = self.outbound.send(AgentMessage::EvacComplete).await;
                Flow::Terminate
            }
        }
    }

    async fn handle_step(&mut self) -> Flow {
        if self.signal_good {
            if let Some(waypoint) = self.traversal.advance() {
                self.location = waypoint;
                debug!(lat = waypoint.lat, lng = waypoint.lng, "stepped to waypoint");
            }
        }
        // Position reports keep flowing even while frozen
        self.send(AgentMessage::AgentLocation(self.location)).await
    }

    async fn handle_signal_sample(&mut self) -> Flow {
        let good = !rand::rng().random_bool(self.config.bad_signal_ratio);
        self.signal_good = good;
        debug!(good, "link quality sampled");
        self.send(AgentMessage::SignalStatus(good)).await
    }

    /// Arm both timers. The first route arms them; later routes find them
    /// already running.
    fn start_timers(&mut self) {
        if self.step_timer.is_none() {
            self.step_timer = Some(Ticker::start(
                self.config.step_interval(),
                self.events_tx.clone(),
                || AgentEvent::StepTick,
            ));
            self.signal_timer = Some(Ticker::start(
                self.config.signal_interval(),
                self.events_tx.clone(),
                || AgentEvent::SignalTick,
            ));
        }
    }

    async fn send(&self, msg: AgentMessage) -> Flow {
        if self.outbound.send(msg).await.is_err() {
            debug!("outbound channel closed");
            return Flow::Terminate;
        }
        Flow::Continue
    }

    pub fn location(&self) -> Coordinate {
        self.location
    }

    pub fn signal_good(&self) -> bool {
        self.signal_good
    }
}

/// Connect to the Coordinator and run the actor until the evacuation
/// completes or the connection drops.
pub async fn run_agent(port: u16, config: AgentConfig) -> Result<()> {
    let stream = TcpStream::connect(("127.0.0.1", port))
        .await
        .context(format!("Failed to connect to coordinator on port {port}"))?;
    let (read_half, mut write_half) = stream.into_split();

    let (events_tx, events_rx) = mpsc::channel(32);
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<AgentMessage>(32);

    let location = Agent::starting_location(&config);
    let agent = Agent::new(config, location, events_tx.clone(), outbound_tx);

    // Reader: one decoded event per line, then Closed
    let reader_task = tokio::spawn(async move {
        let mut reader = BufReader::new(read_half);
        let mut line = String::new();

        loop {
            line.clear();
            match read_frame(&mut reader, &mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    let event = match decode_line::<CoordMessage>(&line) {
                        Ok(msg) => AgentEvent::Server(msg),
                        Err(err) => AgentEvent::Malformed(err),
                    };
                    if events_tx.send(event).await.is_err() {
                        return;
                    }
                }
                Err(err @ WireError::TooLarge(_)) => {
                    if events_tx.send(AgentEvent::Malformed(err)).await.is_err() {
                        return;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "socket read failed");
                    break;
                }
            }
        }
        let _ = events_tx.send(AgentEvent::Closed).await;
    });

    // Writer: drains the agent's outbound queue onto the socket
    let writer_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let encoded = match encode_line(&msg) {
                Ok(encoded) => encoded,
                Err(err) => {
                    warn!(error = %err, "failed to encode outbound message");
                    continue;
                }
            };
            if let Err(err) = write_half.write_all(encoded.as_bytes()).await {
                debug!(error = %err, "socket write failed");
                break;
            }
        }
        let _ = write_half.shutdown().await;
    });

    agent.run(events_rx).await;

    reader_task.abort();
    let _ = writer_task.await;
    Ok(())
}
