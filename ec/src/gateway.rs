//! Backend Gateway client
//!
//! The Backend is an external collaborator reached over the same line
//! protocol as everything else: one `locationInfo` request, one
//! `combinedData` answer, then the connection is closed. The trait seam
//! exists so engine tests can substitute a stub source.

use async_trait::async_trait;
use eyre::{Context, Result, eyre};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use evacwire::{BackendRequest, BackendResponse, CombinedData, Coordinate};

/// Source of map and shelter data around a location.
#[async_trait]
pub trait ShelterSource: Send + Sync {
    /// Fetch the map descriptor and shelter candidates around `location`.
    ///
    /// Called at most once per session; the caller owns that guarantee.
    async fn fetch(&self, location: Coordinate) -> Result<CombinedData>;
}

/// TCP client for the Backend Gateway.
#[derive(Debug, Clone)]
pub struct BackendGateway {
    addr: String,
}

impl BackendGateway {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            addr: format!("{host}:{port}"),
        }
    }
}

#[async_trait]
impl ShelterSource for BackendGateway {
    async fn fetch(&self, location: Coordinate) -> Result<CombinedData> {
        debug!(addr = %self.addr, "BackendGateway: connecting");
        let mut stream = TcpStream::connect(&self.addr)
            .await
            .context("Failed to connect to backend")?;

        let request = evacwire::encode_line(&BackendRequest::LocationInfo(location))
            .context("Failed to serialize backend request")?;
        stream
            .write_all(request.as_bytes())
            .await
            .context("Failed to send location to backend")?;
        stream.flush().await.context("Failed to flush backend request")?;

        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        let bytes_read = evacwire::read_frame(&mut reader, &mut line)
            .await
            .context("Failed to read backend response")?;
        if bytes_read == 0 {
            return Err(eyre!("Backend closed the connection without responding"));
        }

        let BackendResponse::CombinedData(data) =
            evacwire::decode_line(&line).context("Failed to parse backend response")?;
        debug!(shelters = data.shelters.len(), "BackendGateway: received combined data");
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evacwire::Shelter;
    use tokio::io::AsyncBufReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_fetch_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // Mock backend that answers one request
        let mock = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(&mut stream);
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();

            let request: BackendRequest = evacwire::decode_line(&line).unwrap();
            let BackendRequest::LocationInfo(location) = request;
            assert_eq!(location, Coordinate::new(35.68, 139.767));

            let response = BackendResponse::CombinedData(CombinedData {
                map: serde_json::json!({"area": "test"}),
                shelters: vec![Shelter {
                    id: 1,
                    name: "Shelter A".to_string(),
                    location: Coordinate::new(35.681, 139.768),
                }],
            });
            let line = evacwire::encode_line(&response).unwrap();
            stream.write_all(line.as_bytes()).await.unwrap();
        });

        let gateway = BackendGateway::new("127.0.0.1", port);
        let data = gateway.fetch(Coordinate::new(35.68, 139.767)).await.unwrap();
        assert_eq!(data.shelters.len(), 1);
        assert_eq!(data.shelters[0].name, "Shelter A");

        mock.await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_fails_when_backend_hangs_up() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let mock = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let gateway = BackendGateway::new("127.0.0.1", port);
        let result = gateway.fetch(Coordinate::new(35.68, 139.767)).await;
        assert!(result.is_err());

        mock.await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_fails_when_nothing_listens() {
        // Port from a listener we immediately drop
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let gateway = BackendGateway::new("127.0.0.1", port);
        let result = gateway.fetch(Coordinate::new(35.68, 139.767)).await;
        assert!(result.is_err());
    }
}
