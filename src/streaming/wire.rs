//! Wire format serialization and framing
//!
//! # Framing
//!
//! Every TCP frame and every UDP datagram uses the same layout:
//!
//! ```text
//! ┌──────────────────┬──────────────────────────┐
//! │ Length (4 bytes) │ Payload (variable)       │
//! │ Big-endian u32   │ JSON or Postcard binary  │
//! └──────────────────┴──────────────────────────┘
//! ```
//!
//! - **Maximum frame size**: 1MB; larger frames close the connection
//! - **Deserialization failure**: logged and discarded by the caller
//!
//! # Wire Formats
//!
//! - **JSON** (default): human-readable, easy to drive from scripts
//! - **Postcard**: compact binary for high-rate state intake

use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest accepted payload
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Length prefix size
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Supported wire formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Binary format using postcard - fast and compact
    Postcard,
    /// JSON format - human-readable for debugging
    #[default]
    Json,
}

/// Serializer for the configured wire format
#[derive(Debug, Clone, Copy)]
pub struct Serializer {
    format: WireFormat,
}

impl Serializer {
    /// Create a new serializer for the given format
    pub fn new(format: WireFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Serialize a message to bytes
    pub fn serialize<T: Serialize>(&self, msg: &T) -> Result<Vec<u8>> {
        match self.format {
            WireFormat::Postcard => Ok(postcard::to_allocvec(msg)?),
            WireFormat::Json => Ok(serde_json::to_vec(msg)?),
        }
    }

    /// Deserialize bytes to a message
    pub fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        match self.format {
            WireFormat::Postcard => Ok(postcard::from_bytes(bytes)?),
            WireFormat::Json => Ok(serde_json::from_slice(bytes)?),
        }
    }

    /// Serialize into `buffer` as a complete length-prefixed frame.
    ///
    /// The buffer is cleared first so callers can reuse it.
    pub fn encode_frame<T: Serialize>(&self, msg: &T, buffer: &mut Vec<u8>) -> Result<()> {
        let payload = self.serialize(msg)?;
        if payload.len() > MAX_FRAME_SIZE {
            return Err(Error::Serialization(format!(
                "Message too large: {} bytes",
                payload.len()
            )));
        }
        buffer.clear();
        buffer.reserve(LENGTH_PREFIX_SIZE + payload.len());
        buffer.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        buffer.extend_from_slice(&payload);
        Ok(())
    }
}

/// Create a serializer for the given wire format
pub fn create_serializer(format: WireFormat) -> Serializer {
    Serializer::new(format)
}

/// Write one frame and flush.
pub fn write_frame<W: Write>(writer: &mut W, frame: &[u8]) -> Result<()> {
    writer.write_all(frame)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame payload into `buffer`.
///
/// Returns `Ok(false)` when the read timed out before any byte of the
/// length prefix arrived, so callers can poll shutdown flags. A timeout once
/// a frame has started is an error; the stream has lost its frame boundary.
pub fn read_frame<R: Read>(reader: &mut R, buffer: &mut Vec<u8>) -> Result<bool> {
    let mut len_buf = [0u8; LENGTH_PREFIX_SIZE];
    let mut filled = 0;
    while filled < LENGTH_PREFIX_SIZE {
        match reader.read(&mut len_buf[filled..]) {
            Ok(0) => return Err(Error::Io(std::io::ErrorKind::UnexpectedEof.into())),
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e)
                if filled == 0
                    && (e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut) =>
            {
                return Ok(false);
            }
            Err(e) => return Err(Error::Io(e)),
        }
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(Error::Other(format!("Message too large: {} bytes", len)));
    }

    buffer.clear();
    buffer.resize(len, 0);
    reader.read_exact(buffer)?;
    Ok(true)
}

/// Extract the payload of a length-prefixed datagram.
pub fn datagram_payload(datagram: &[u8]) -> Option<&[u8]> {
    if datagram.len() < LENGTH_PREFIX_SIZE {
        log::warn!("Datagram too short: {} bytes", datagram.len());
        return None;
    }
    let len = u32::from_be_bytes([datagram[0], datagram[1], datagram[2], datagram[3]]) as usize;
    if len + LENGTH_PREFIX_SIZE > datagram.len() {
        log::warn!(
            "Datagram incomplete: expected {} + 4 bytes, got {}",
            len,
            datagram.len()
        );
        return None;
    }
    Some(&datagram[LENGTH_PREFIX_SIZE..LENGTH_PREFIX_SIZE + len])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::messages::Request;
    use std::io::Cursor;

    #[test]
    fn test_frame_layout() {
        let serializer = Serializer::new(WireFormat::Json);
        let mut buffer = Vec::new();
        serializer.encode_frame(&Request::ListWaypoints, &mut buffer).unwrap();

        let payload = br#""ListWaypoints""#;
        assert_eq!(&buffer[..4], &(payload.len() as u32).to_be_bytes());
        assert_eq!(&buffer[4..], payload);
    }

    #[test]
    fn test_read_frame_from_stream() {
        let serializer = Serializer::new(WireFormat::Postcard);
        let request = Request::AddWaypoint {
            x: 1.0,
            y: 2.0,
            z: 3.0,
            yaw: 0.0,
            index: -1,
        };
        let mut frame = Vec::new();
        serializer.encode_frame(&request, &mut frame).unwrap();
        // Two frames back to back
        let mut stream = frame.clone();
        stream.extend_from_slice(&frame);

        let mut cursor = Cursor::new(stream);
        let mut buffer = Vec::new();
        for _ in 0..2 {
            assert!(read_frame(&mut cursor, &mut buffer).unwrap());
            let decoded: Request = serializer.deserialize(&buffer).unwrap();
            assert_eq!(decoded, request);
        }
        assert!(matches!(read_frame(&mut cursor, &mut buffer), Err(Error::Io(_))));
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut bytes = ((MAX_FRAME_SIZE + 1) as u32).to_be_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 8]);
        let mut buffer = Vec::new();
        assert!(read_frame(&mut Cursor::new(bytes), &mut buffer).is_err());
    }

    /// Serves scripted chunks, then times out
    struct ChunkedReader {
        chunks: Vec<Vec<u8>>,
    }

    impl Read for ChunkedReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.chunks.is_empty() {
                return Err(std::io::ErrorKind::TimedOut.into());
            }
            let chunk = self.chunks.remove(0);
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            if n < chunk.len() {
                self.chunks.insert(0, chunk[n..].to_vec());
            }
            Ok(n)
        }
    }

    #[test]
    fn test_timeout_before_frame_is_idle() {
        let mut reader = ChunkedReader { chunks: Vec::new() };
        let mut buffer = Vec::new();
        assert!(!read_frame(&mut reader, &mut buffer).unwrap());
    }

    #[test]
    fn test_timeout_inside_length_prefix_is_error() {
        let mut reader = ChunkedReader {
            chunks: vec![vec![0, 0]],
        };
        let mut buffer = Vec::new();
        assert!(matches!(
            read_frame(&mut reader, &mut buffer),
            Err(Error::Io(ref e)) if e.kind() == std::io::ErrorKind::TimedOut
        ));
    }

    #[test]
    fn test_length_prefix_split_across_reads() {
        let mut reader = ChunkedReader {
            chunks: vec![vec![0, 0], vec![0], vec![3, b'a'], b"bc".to_vec()],
        };
        let mut buffer = Vec::new();
        assert!(read_frame(&mut reader, &mut buffer).unwrap());
        assert_eq!(buffer, b"abc");
    }

    #[test]
    fn test_datagram_payload() {
        let mut datagram = 3u32.to_be_bytes().to_vec();
        datagram.extend_from_slice(b"abcdef");
        assert_eq!(datagram_payload(&datagram), Some(&b"abc"[..]));
        assert_eq!(datagram_payload(&[0, 0]), None);
        assert_eq!(datagram_payload(&[0, 0, 0, 9, 1]), None);
    }

    #[test]
    fn test_wire_format_from_config_string() {
        #[derive(Deserialize)]
        struct Holder {
            format: WireFormat,
        }
        let holder: Holder = toml::from_str("format = \"postcard\"").unwrap();
        assert_eq!(holder.format, WireFormat::Postcard);
    }
}
