//! LogClient - logs each message via tracing

use bytes::Bytes;
use contracts::{
    payload_preview, BrokerClient, BrokerConnection, ClientProperties, ContractError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, instrument};

/// Client whose connections only log what they are given
#[derive(Debug, Clone, Copy, Default)]
pub struct LogClient;

impl LogClient {
    pub fn new() -> Self {
        Self
    }
}

impl BrokerClient for LogClient {
    type Connection = LogConnection;

    fn kind(&self) -> &'static str {
        "log"
    }

    async fn open(&self, properties: &ClientProperties) -> Result<LogConnection, ContractError> {
        let address = properties.address().unwrap_or("log").to_string();
        info!(
            address = %address,
            properties = properties.len(),
            "LogClient connection opened"
        );
        Ok(LogConnection {
            address,
            closed: AtomicBool::new(false),
        })
    }
}

/// Connection that logs message summaries
pub struct LogConnection {
    address: String,
    closed: AtomicBool,
}

impl BrokerConnection for LogConnection {
    #[instrument(name = "log_connection_send", skip(self, payload), fields(address = %self.address))]
    async fn send(&self, destination: &str, payload: &Bytes) -> Result<(), ContractError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ContractError::broker_send(destination, "connection closed"));
        }
        info!(
            destination = %destination,
            bytes = payload.len(),
            preview = %payload_preview(payload),
            "Message published"
        );
        Ok(())
    }

    #[instrument(name = "log_connection_close", skip(self))]
    async fn close(&self) -> Result<(), ContractError> {
        self.closed.store(true, Ordering::Release);
        info!(address = %self.address, "LogClient connection closed");
        Ok(())
    }
}
