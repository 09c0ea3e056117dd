//! UdpClient - fire-and-forget datagram per message

use bytes::Bytes;
use contracts::{BrokerClient, BrokerConnection, ClientProperties, ContractError};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::UdpSocket;
use tracing::{debug, instrument};

use super::Envelope;

/// Optional property bounding the encoded envelope size
pub const MAX_PACKET_SIZE_PROPERTY: &str = "max.packet.size";

/// Default datagram size limit
pub const DEFAULT_MAX_PACKET_SIZE: usize = 65_000;

/// Envelope encoding (`value.serializer`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    /// JSON (human-readable, larger)
    #[default]
    Json,
    /// Bincode (binary, compact)
    Bincode,
}

impl WireFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "json" => Some(Self::Json),
            "bincode" => Some(Self::Bincode),
            _ => None,
        }
    }

    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, String> {
        match self {
            Self::Json => serde_json::to_vec(envelope).map_err(|e| format!("json error: {e}")),
            Self::Bincode => {
                bincode::serialize(envelope).map_err(|e| format!("bincode error: {e}"))
            }
        }
    }
}

/// Settings read from client properties
#[derive(Debug, Clone, PartialEq, Eq)]
struct UdpSettings {
    addr: SocketAddr,
    format: WireFormat,
    max_packet_size: usize,
}

impl UdpSettings {
    fn from_properties(properties: &ClientProperties) -> Result<Self, ContractError> {
        let raw_addr = properties.address().unwrap_or_default();
        let addr: SocketAddr = raw_addr
            .parse()
            .map_err(|e| ContractError::broker_connection(raw_addr, format!("invalid address: {e}")))?;

        let format = WireFormat::from_name(properties.serializer()).ok_or_else(|| {
            ContractError::broker_connection(
                raw_addr,
                format!("unknown serializer '{}'", properties.serializer()),
            )
        })?;

        let max_packet_size = match properties.get(MAX_PACKET_SIZE_PROPERTY) {
            Some(raw) => raw.parse().map_err(|e| {
                ContractError::broker_connection(
                    raw_addr,
                    format!("invalid {MAX_PACKET_SIZE_PROPERTY} '{raw}': {e}"),
                )
            })?,
            None => DEFAULT_MAX_PACKET_SIZE,
        };

        Ok(Self {
            addr,
            format,
            max_packet_size,
        })
    }
}

/// Client that sends each message as one UDP datagram
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpClient;

impl UdpClient {
    pub fn new() -> Self {
        Self
    }
}

impl BrokerClient for UdpClient {
    type Connection = UdpConnection;

    fn kind(&self) -> &'static str {
        "udp"
    }

    #[instrument(name = "udp_client_open", skip(self, properties))]
    async fn open(&self, properties: &ClientProperties) -> Result<UdpConnection, ContractError> {
        let settings = UdpSettings::from_properties(properties)?;
        let bind_addr = if settings.addr.is_ipv6() {
            "[::]:0"
        } else {
            "0.0.0.0:0"
        };

        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(settings.addr).await?;

        debug!(
            target_addr = %settings.addr,
            format = ?settings.format,
            max_packet_size = settings.max_packet_size,
            "UdpClient connected"
        );

        Ok(UdpConnection {
            socket,
            settings,
            closed: AtomicBool::new(false),
        })
    }
}

/// Connected UDP socket shared by all workers
pub struct UdpConnection {
    socket: UdpSocket,
    settings: UdpSettings,
    closed: AtomicBool,
}

impl UdpConnection {
    pub fn peer(&self) -> SocketAddr {
        self.settings.addr
    }

    fn prepare_datagram(&self, destination: &str, payload: &Bytes) -> Result<Vec<u8>, ContractError> {
        let data = self
            .settings
            .format
            .encode(&Envelope::new(destination, payload))
            .map_err(|e| ContractError::broker_send(destination, e))?;

        if data.len() > self.settings.max_packet_size {
            return Err(ContractError::broker_send(
                destination,
                format!(
                    "envelope of {} bytes exceeds {MAX_PACKET_SIZE_PROPERTY} {}",
                    data.len(),
                    self.settings.max_packet_size
                ),
            ));
        }

        Ok(data)
    }
}

impl BrokerConnection for UdpConnection {
    #[instrument(
        name = "udp_connection_send",
        skip(self, payload),
        fields(peer = %self.settings.addr, bytes = payload.len())
    )]
    async fn send(&self, destination: &str, payload: &Bytes) -> Result<(), ContractError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ContractError::broker_send(destination, "connection closed"));
        }

        let data = self.prepare_datagram(destination, payload)?;
        let sent = self
            .socket
            .send(&data)
            .await
            .map_err(|e| ContractError::broker_send(destination, e.to_string()))?;

        debug!(sent, "Datagram sent");
        Ok(())
    }

    #[instrument(name = "udp_connection_close", skip(self))]
    async fn close(&self) -> Result<(), ContractError> {
        self.closed.store(true, Ordering::Release);
        debug!(peer = %self.settings.addr, "UdpClient closed");
        Ok(())
    }
}
