//! Integration tests for the Coordinator
//!
//! These run a real Backend and a real Coordinator on ephemeral ports and
//! drive them with a scripted agent over a plain TCP stream.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use eyre::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};

use evaccoord::{BackendGateway, CoordServer, CoordinatorConfig, SessionRegistry, ShelterSource};
use evacwire::{
    decode_line, encode_line, AgentMessage, CombinedData, CoordMessage, Coordinate, Shelter,
};

const TOKYO: Coordinate = Coordinate { lat: 35.68, lng: 139.767 };

async fn spawn_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = evacbackend::serve(listener).await;
    });
    addr
}

async fn spawn_coordinator(config: CoordinatorConfig, source: Arc<dyn ShelterSource>) -> (SocketAddr, SessionRegistry) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = CoordServer::new(config, source);
    let registry = server.registry();
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });
    (addr, registry)
}

struct ScriptedAgent {
    reader: BufReader<OwnedReadHalf>,
    writer: tokio::net::tcp::OwnedWriteHalf,
    line: String,
}

impl ScriptedAgent {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer,
            line: String::new(),
        }
    }

    async fn send(&mut self, msg: AgentMessage) {
        let encoded = encode_line(&msg).unwrap();
        self.writer.write_all(encoded.as_bytes()).await.unwrap();
    }

    async fn recv(&mut self) -> CoordMessage {
        self.line.clear();
        let read = tokio::time::timeout(Duration::from_secs(5), self.reader.read_line(&mut self.line))
            .await
            .expect("timed out waiting for coordinator message")
            .unwrap();
        assert_ne!(read, 0, "connection closed while expecting a message");
        decode_line(&self.line).unwrap()
    }

    /// The coordinator closed the connection (clean EOF).
    async fn recv_eof(&mut self) {
        self.line.clear();
        let read = tokio::time::timeout(Duration::from_secs(5), self.reader.read_line(&mut self.line))
            .await
            .expect("timed out waiting for EOF")
            .unwrap();
        assert_eq!(read, 0, "expected EOF, got: {}", self.line.trim());
    }
}

#[tokio::test]
async fn test_full_evacuation_against_real_backend() {
    let backend_addr = spawn_backend().await;
    let config = CoordinatorConfig {
        regen_interval_secs: 1,
        backend_port: backend_addr.port(),
        ..Default::default()
    };
    let gateway = BackendGateway::new("127.0.0.1", backend_addr.port());
    let (coord_addr, _registry) = spawn_coordinator(config, Arc::new(gateway)).await;

    let mut agent = ScriptedAgent::connect(coord_addr).await;
    agent.send(AgentMessage::AgentLocation(TOKYO)).await;

    // Backend-synthesized shelters flow through untouched
    let shelters = match agent.recv().await {
        CoordMessage::SheltersData(shelters) => shelters,
        other => panic!("expected sheltersData, got {other:?}"),
    };
    assert_eq!(shelters.len(), 3);
    assert_eq!(shelters[0].name, "Shelter A");

    let target = shelters[0].location;
    agent.send(AgentMessage::SelectedShelter(target)).await;

    let route = match agent.recv().await {
        CoordMessage::RouteData(route) => route,
        other => panic!("expected routeData, got {other:?}"),
    };
    assert!(!route.is_empty(), "shelters scatter at least ~110m away");
    let destination = route.last().unwrap();
    assert!((destination.lat - target.lat).abs() < 1e-9);
    assert!((destination.lng - target.lng).abs() < 1e-9);

    // Arrive; the next regeneration tick plans the empty route
    agent.send(AgentMessage::AgentLocation(target)).await;

    loop {
        match agent.recv().await {
            // Ticks before the location report lands may replan the old route
            CoordMessage::RouteData(route) if !route.is_empty() => continue,
            CoordMessage::RouteData(route) => {
                assert!(route.is_empty());
                break;
            }
            other => panic!("expected routeData, got {other:?}"),
        }
    }
    assert!(matches!(agent.recv().await, CoordMessage::EvacComplete(_)));
    agent.recv_eof().await;
}

struct CountingSource {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl ShelterSource for CountingSource {
    async fn fetch(&self, location: Coordinate) -> Result<CombinedData> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CombinedData {
            map: serde_json::json!({"area": "test"}),
            shelters: vec![Shelter {
                id: 1,
                name: "Shelter A".to_string(),
                location: Coordinate::new(location.lat + 0.002, location.lng),
            }],
        })
    }
}

#[tokio::test]
async fn test_sessions_are_independent_and_fetch_once_each() {
    let source = Arc::new(CountingSource { calls: AtomicUsize::new(0) });
    let config = CoordinatorConfig {
        regen_interval_secs: 3600,
        ..Default::default()
    };
    let (coord_addr, registry) = spawn_coordinator(config, source.clone()).await;

    let mut first = ScriptedAgent::connect(coord_addr).await;
    let mut second = ScriptedAgent::connect(coord_addr).await;

    // Each session fetches once, even across repeated location reports
    first.send(AgentMessage::AgentLocation(TOKYO)).await;
    second.send(AgentMessage::AgentLocation(Coordinate::new(36.0, 140.0))).await;
    assert!(matches!(first.recv().await, CoordMessage::SheltersData(_)));
    assert!(matches!(second.recv().await, CoordMessage::SheltersData(_)));

    first.send(AgentMessage::AgentLocation(TOKYO)).await;
    second.send(AgentMessage::AgentLocation(Coordinate::new(36.0, 140.0))).await;

    // One session selecting a shelter must not emit anything to the other
    first.send(AgentMessage::SelectedShelter(Coordinate::new(35.682, 139.767))).await;
    assert!(matches!(first.recv().await, CoordMessage::RouteData(_)));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    assert_eq!(registry.len(), 2);
}

#[tokio::test]
async fn test_shutdown_closes_live_sessions() {
    let source = Arc::new(CountingSource { calls: AtomicUsize::new(0) });
    let (coord_addr, registry) = spawn_coordinator(CoordinatorConfig::default(), source).await;

    let mut agent = ScriptedAgent::connect(coord_addr).await;
    agent.send(AgentMessage::AgentLocation(TOKYO)).await;
    assert!(matches!(agent.recv().await, CoordMessage::SheltersData(_)));
    assert_eq!(registry.len(), 1);

    registry.close_all().await;
    agent.recv_eof().await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_gateway_fetches_from_real_backend() {
    let backend_addr = spawn_backend().await;
    let gateway = BackendGateway::new("127.0.0.1", backend_addr.port());

    let data = gateway.fetch(TOKYO).await.unwrap();
    assert_eq!(data.shelters.len(), 3);
    assert_eq!(data.map["area"], "Map data around (35.68, 139.767) within 3km");

    // The gateway reconnects per fetch; a second call works the same way
    let again = gateway.fetch(Coordinate::new(36.0, 140.0)).await.unwrap();
    assert_eq!(again.shelters.len(), 3);
}
