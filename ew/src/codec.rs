//! Line codec: one JSON envelope per `\n`-terminated line

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Upper bound on a single frame. Routes dominate frame size; a 64KB line
/// fits several thousand waypoints.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Errors from decoding an inbound line. Receivers log these and drop the
/// frame; a decode failure never closes the connection. `Io` is the
/// exception: the stream itself failed and the connection is done.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("invalid message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message too large: {0} bytes (limit {MAX_LINE_BYTES})")]
    TooLarge(usize),

    #[error("empty frame")]
    Empty,

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Read one `\n`-terminated frame into `line`, enforcing [`MAX_LINE_BYTES`]
/// while reading rather than after, so an oversized frame never buffers
/// whole.
///
/// Returns the bytes read; 0 means clean EOF. On `TooLarge` the rest of the
/// offending line has already been discarded, so the next call resumes at
/// the following frame.
pub async fn read_frame<R>(reader: &mut R, line: &mut String) -> Result<usize, WireError>
where
    R: AsyncBufRead + Unpin,
{
    // One extra byte distinguishes "exactly at the limit" from "over it"
    let mut limited = (&mut *reader).take((MAX_LINE_BYTES + 1) as u64);
    let bytes_read = limited.read_line(line).await?;
    if bytes_read <= MAX_LINE_BYTES || line.ends_with('\n') {
        return Ok(bytes_read);
    }

    // Oversized: skip ahead to the next newline in bounded chunks
    let mut dropped = bytes_read;
    let mut chunk = String::new();
    loop {
        chunk.clear();
        let mut limited = (&mut *reader).take(MAX_LINE_BYTES as u64);
        let skipped = limited.read_line(&mut chunk).await?;
        if skipped == 0 {
            break;
        }
        dropped += skipped;
        if chunk.ends_with('\n') {
            break;
        }
    }
    line.clear();
    Err(WireError::TooLarge(dropped))
}

/// Serialize a message as a single newline-terminated JSON line.
pub fn encode_line<T: Serialize>(msg: &T) -> Result<String, WireError> {
    let mut line = serde_json::to_string(msg)?;
    line.push('\n');
    Ok(line)
}

/// Parse one received line into a message.
pub fn decode_line<T: DeserializeOwned>(line: &str) -> Result<T, WireError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(WireError::Empty);
    }
    if trimmed.len() > MAX_LINE_BYTES {
        return Err(WireError::TooLarge(trimmed.len()));
    }
    Ok(serde_json::from_str(trimmed)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::AgentMessage;
    use crate::types::Coordinate;

    #[test]
    fn test_encode_appends_newline() {
        let line = encode_line(&AgentMessage::SignalStatus(true)).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.trim(), r#"{"type":"signalStatus","payload":true}"#);
    }

    #[test]
    fn test_decode_trims_line_ending() {
        let msg: AgentMessage = decode_line("{\"type\":\"signalStatus\",\"payload\":false}\r\n").unwrap();
        assert_eq!(msg, AgentMessage::SignalStatus(false));
    }

    #[test]
    fn test_decode_rejects_empty_frame() {
        let result = decode_line::<AgentMessage>("  \n");
        assert!(matches!(result, Err(WireError::Empty)));
    }

    #[test]
    fn test_decode_rejects_unparseable_json() {
        let result = decode_line::<AgentMessage>("not json at all");
        assert!(matches!(result, Err(WireError::Json(_))));
    }

    #[test]
    fn test_decode_rejects_unknown_type_tag() {
        let result = decode_line::<AgentMessage>(r#"{"type":"teleport","payload":{}}"#);
        assert!(matches!(result, Err(WireError::Json(_))));
    }

    #[test]
    fn test_decode_rejects_oversized_frame() {
        let huge = format!(r#"{{"type":"agentLocation","payload":"{}"}}"#, "x".repeat(MAX_LINE_BYTES));
        let result = decode_line::<AgentMessage>(&huge);
        assert!(matches!(result, Err(WireError::TooLarge(_))));
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let msg = AgentMessage::AgentLocation(Coordinate::new(35.68, 139.767));
        let line = encode_line(&msg).unwrap();
        let parsed: AgentMessage = decode_line(&line).unwrap();
        assert_eq!(parsed, msg);
    }

    #[tokio::test]
    async fn test_read_frame_reads_successive_lines() {
        let data = b"{\"type\":\"signalStatus\",\"payload\":true}\n{\"type\":\"evacComplete\"}\n";
        let mut reader = tokio::io::BufReader::new(&data[..]);
        let mut line = String::new();

        assert!(read_frame(&mut reader, &mut line).await.unwrap() > 0);
        assert_eq!(line.trim(), r#"{"type":"signalStatus","payload":true}"#);

        line.clear();
        assert!(read_frame(&mut reader, &mut line).await.unwrap() > 0);
        assert_eq!(line.trim(), r#"{"type":"evacComplete"}"#);

        line.clear();
        assert_eq!(read_frame(&mut reader, &mut line).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_read_frame_rejects_oversized_line_and_resyncs() {
        // A line well past the cap, followed by a normal frame
        let mut data = vec![b'x'; MAX_LINE_BYTES * 3];
        data.push(b'\n');
        data.extend_from_slice(b"{\"type\":\"signalStatus\",\"payload\":false}\n");
        let mut reader = tokio::io::BufReader::new(&data[..]);
        let mut line = String::new();

        let result = read_frame(&mut reader, &mut line).await;
        assert!(matches!(result, Err(WireError::TooLarge(_))));
        assert!(line.is_empty(), "rejected frame must not leak into the buffer");

        // The stream resumes at the frame after the oversized one
        assert!(read_frame(&mut reader, &mut line).await.unwrap() > 0);
        let msg: AgentMessage = decode_line(&line).unwrap();
        assert_eq!(msg, AgentMessage::SignalStatus(false));
    }

    #[tokio::test]
    async fn test_read_frame_accepts_line_at_the_limit() {
        // Padding with trailing spaces keeps the JSON valid after trim
        let payload = r#"{"type":"signalStatus","payload":true}"#;
        let mut data = payload.to_string();
        data.push_str(&" ".repeat(MAX_LINE_BYTES - payload.len() - 1));
        data.push('\n');
        let bytes = data.into_bytes();
        let mut reader = tokio::io::BufReader::new(&bytes[..]);
        let mut line = String::new();

        assert_eq!(read_frame(&mut reader, &mut line).await.unwrap(), MAX_LINE_BYTES);
        let msg: AgentMessage = decode_line(&line).unwrap();
        assert_eq!(msg, AgentMessage::SignalStatus(true));
    }
}
