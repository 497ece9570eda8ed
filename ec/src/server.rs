//! Agent-facing TCP server
//!
//! Accepts agent connections and wires each one to its own
//! [`SessionEngine`](crate::engine::SessionEngine) task. The connection is
//! split into a reader task (lines in, decoded to events) and a writer task
//! (outbound messages, encoded to lines); all session logic lives in the
//! engine between them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use eyre::{Context, Result};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use evacwire::{decode_line, encode_line, read_frame, AgentMessage, WireError};

use crate::config::CoordinatorConfig;
use crate::engine::{SessionEngine, SessionEvent};
use crate::gateway::ShelterSource;

/// Live sessions, keyed by session id.
///
/// Holds each session's event sender so shutdown can signal every session.
/// The map is touched briefly from several tasks; senders are cloned out
/// before any await.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<Uuid, mpsc::Sender<SessionEvent>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, id: Uuid, events_tx: mpsc::Sender<SessionEvent>) {
        self.inner.lock().unwrap().insert(id, events_tx);
    }

    fn remove(&self, id: &Uuid) {
        self.inner.lock().unwrap().remove(id);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ask every live session to shut down.
    pub async fn close_all(&self) {
        let senders: Vec<_> = {
            let map = self.inner.lock().unwrap();
            map.values().cloned().collect()
        };

        info!(sessions = senders.len(), "closing all sessions");
        for sender in senders {
            let _ = sender.send(SessionEvent::Closed).await;
        }
    }
}

/// The Coordinator's accept loop plus per-session plumbing.
pub struct CoordServer {
    config: CoordinatorConfig,
    source: Arc<dyn ShelterSource>,
    registry: SessionRegistry,
}

impl CoordServer {
    pub fn new(config: CoordinatorConfig, source: Arc<dyn ShelterSource>) -> Self {
        Self {
            config,
            source,
            registry: SessionRegistry::new(),
        }
    }

    pub fn registry(&self) -> SessionRegistry {
        self.registry.clone()
    }

    /// Accept agent connections until the listener fails.
    pub async fn run(&self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr().context("Failed to read listener address")?;
        info!(%addr, "coordinator listening for agents");

        loop {
            let (stream, peer) = listener.accept().await.context("Failed to accept agent connection")?;
            debug!(%peer, "agent connected");
            self.spawn_session(stream);
        }
    }

    /// Stand up the reader/writer/engine tasks for one connection.
    pub fn spawn_session(&self, stream: TcpStream) {
        let session_id = Uuid::now_v7();
        let (events_tx, events_rx) = mpsc::channel(self.config.channel_buffer);
        let (outbound_tx, mut outbound_rx) = mpsc::channel(self.config.channel_buffer);

        let engine = SessionEngine::new(
            session_id,
            self.config.clone(),
            Arc::clone(&self.source),
            events_tx.clone(),
            outbound_tx,
        );

        self.registry.insert(session_id, events_tx.clone());
        let registry = self.registry.clone();

        let (read_half, mut write_half) = stream.into_split();

        // Reader: one decoded event per line, then Closed
        let reader_task = tokio::spawn(async move {
            let mut reader = BufReader::new(read_half);
            let mut line = String::new();

            loop {
                line.clear();
                match read_frame(&mut reader, &mut line).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let event = match decode_line::<AgentMessage>(&line) {
                            Ok(msg) => SessionEvent::Inbound(msg),
                            Err(err) => SessionEvent::Malformed(err),
                        };
                        if events_tx.send(event).await.is_err() {
                            return;
                        }
                    }
                    Err(err @ WireError::TooLarge(_)) => {
                        if events_tx.send(SessionEvent::Malformed(err)).await.is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        warn!(%session_id, error = %err, "agent socket read failed");
                        break;
                    }
                }
            }
            let _ = events_tx.send(SessionEvent::Closed).await;
        });

        // Writer: drains the engine's outbound queue onto the socket
        let writer_task = tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let encoded = match encode_line(&msg) {
                    Ok(encoded) => encoded,
                    Err(err) => {
                        warn!(%session_id, error = %err, "failed to encode outbound message");
                        continue;
                    }
                };
                if let Err(err) = write_half.write_all(encoded.as_bytes()).await {
                    debug!(%session_id, error = %err, "agent socket write failed");
                    break;
                }
            }
            let _ = write_half.shutdown().await;
        });

        tokio::spawn(async move {
            engine.run(events_rx).await;
            registry.remove(&session_id);
            // The engine owned the last outbound sender, so the writer drains
            // and exits on its own; the reader may still be blocked in read
            reader_task.abort();
            let _ = writer_task.await;
        });
    }
}
