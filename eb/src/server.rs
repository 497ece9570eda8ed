//! Backend request loop
//!
//! Serves locationInfo requests over persistent newline-delimited JSON
//! connections. Each connection may ask any number of times; malformed lines
//! are logged and dropped without closing the connection.

use eyre::{Context, Result};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use evacwire::{decode_line, encode_line, read_frame, BackendRequest, BackendResponse, WireError};

use crate::data;

/// Accept Coordinator connections until the listener fails.
pub async fn serve(listener: TcpListener) -> Result<()> {
    let addr = listener.local_addr().context("Failed to read listener address")?;
    info!(%addr, "backend listening");

    loop {
        let (stream, peer) = listener.accept().await.context("Failed to accept connection")?;
        debug!(%peer, "coordinator connected");
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream).await {
                warn!(%peer, error = %err, "connection handler failed");
            }
            debug!(%peer, "coordinator disconnected");
        });
    }
}

/// Answer requests on one connection until it closes.
async fn handle_connection(stream: TcpStream) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = match read_frame(&mut reader, &mut line).await {
            Ok(n) => n,
            Err(err @ WireError::TooLarge(_)) => {
                warn!(error = %err, "dropping oversized request");
                continue;
            }
            Err(err) => return Err(err).context("Failed to read request"),
        };
        if bytes_read == 0 {
            return Ok(());
        }

        let request = match decode_line::<BackendRequest>(&line) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "dropping malformed request");
                continue;
            }
        };

        let BackendRequest::LocationInfo(location) = request;
        debug!(lat = location.lat, lng = location.lng, "serving location info");

        // ThreadRng must not live across the write await
        let response = {
            let mut rng = rand::rng();
            BackendResponse::CombinedData(data::combined_data(&mut rng, location))
        };

        let encoded = encode_line(&response).context("Failed to encode response")?;
        write_half
            .write_all(encoded.as_bytes())
            .await
            .context("Failed to write response")?;
        write_half.flush().await.context("Failed to flush response")?;
    }
}
