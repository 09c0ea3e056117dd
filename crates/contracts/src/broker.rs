//! Broker client seam
//!
//! The publisher never speaks a wire protocol itself. A [`BrokerClient`] opens
//! a [`BrokerConnection`] from flat client properties; the connection is then
//! shared by every pool worker.

use bytes::Bytes;
use std::collections::BTreeMap;
use std::future::Future;

use crate::ContractError;

/// Required property: broker address
pub const BOOTSTRAP_SERVERS_PROPERTY: &str = "bootstrap.servers";

/// Required property: payload serialization mode
pub const SERIALIZER_PROPERTY: &str = "value.serializer";

/// Serialization mode used unless overridden
pub const DEFAULT_SERIALIZER: &str = "json";

/// Flat client configuration handed to [`BrokerClient::open`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientProperties {
    entries: BTreeMap<String, String>,
}

impl ClientProperties {
    /// Create properties holding the two required entries
    pub fn with_address(address: impl Into<String>) -> Self {
        let mut properties = Self::default();
        properties.insert(BOOTSTRAP_SERVERS_PROPERTY, address);
        properties.insert(SERIALIZER_PROPERTY, DEFAULT_SERIALIZER);
        properties
    }

    /// Insert or replace an entry, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Look up an entry
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Broker address (`bootstrap.servers`)
    pub fn address(&self) -> Option<&str> {
        self.get(BOOTSTRAP_SERVERS_PROPERTY)
    }

    /// Serialization mode (`value.serializer`)
    pub fn serializer(&self) -> &str {
        self.get(SERIALIZER_PROPERTY).unwrap_or(DEFAULT_SERIALIZER)
    }

    /// Iterate entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are set
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Extend<(String, String)> for ClientProperties {
    fn extend<T: IntoIterator<Item = (String, String)>>(&mut self, iter: T) {
        self.entries.extend(iter);
    }
}

/// Open connection to a broker
///
/// One connection is shared by all pool workers, so `send` must tolerate
/// concurrent callers. Clients that cannot must serialize internally.
#[trait_variant::make(BrokerConnection: Send)]
pub trait LocalBrokerConnection: Send + Sync + 'static {
    /// Deliver one payload to a destination
    ///
    /// # Errors
    /// Returns send error (should include destination context)
    async fn send(&self, destination: &str, payload: &Bytes) -> Result<(), ContractError>;

    /// Release the connection
    async fn close(&self) -> Result<(), ContractError>;
}

/// Broker client factory
///
/// Abstracts how a connection is opened so real transports and in-memory
/// test clients share the same adapter code.
pub trait BrokerClient: Send + Sync + 'static {
    /// Connection type produced by this client
    type Connection: BrokerConnection;

    /// Human readable client kind (used for logging)
    fn kind(&self) -> &'static str;

    /// Open a connection from client properties
    ///
    /// # Errors
    /// Returns `BrokerConnection` error when the broker cannot be reached or
    /// the properties are unusable
    fn open(
        &self,
        properties: &ClientProperties,
    ) -> impl Future<Output = Result<Self::Connection, ContractError>> + Send;
}
