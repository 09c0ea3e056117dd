//! Broker client implementations
//!
//! Contains LogClient, UdpClient, FileClient, and the in-memory MemoryClient.

mod file;
mod log;
mod memory;
mod udp;

pub use self::file::{FileClient, FileConnection};
pub use self::log::{LogClient, LogConnection};
pub use self::memory::{MemoryClient, MemoryConnection, SentMessage};
pub use self::udp::{UdpClient, UdpConnection, WireFormat, DEFAULT_MAX_PACKET_SIZE, MAX_PACKET_SIZE_PROPERTY};

use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Record written by the UDP and file clients for each message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub destination: String,
    /// Milliseconds since the Unix epoch at send time
    pub timestamp_ms: i64,
    pub payload: Bytes,
}

impl Envelope {
    pub fn new(destination: &str, payload: &Bytes) -> Self {
        Self {
            destination: destination.to_string(),
            timestamp_ms: Utc::now().timestamp_millis(),
            payload: payload.clone(),
        }
    }
}
