//! PublishRequest - one outbound message
//!
//! Typed replacement for the per-message property map: a destination plus an
//! opaque payload, validated when constructed.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ContractError;

/// Per-message property carrying the destination name
pub const DESTINATION_PROPERTY: &str = "topic";

/// Bytes of payload kept in log lines and drop records
pub const PAYLOAD_PREVIEW_LEN: usize = 64;

/// Leading bytes of a payload as lossy UTF-8, at most [`PAYLOAD_PREVIEW_LEN`]
pub fn payload_preview(payload: &[u8]) -> String {
    let end = payload.len().min(PAYLOAD_PREVIEW_LEN);
    String::from_utf8_lossy(&payload[..end]).into_owned()
}

/// Message to publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    /// Logical target within the broker (topic / queue name)
    pub destination: String,

    /// Opaque message body
    pub payload: Bytes,
}

impl PublishRequest {
    /// Create a request
    ///
    /// # Errors
    /// Returns `InvalidRequest` if the destination is empty or blank
    pub fn new(
        destination: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Result<Self, ContractError> {
        let destination = destination.into();
        if destination.trim().is_empty() {
            return Err(ContractError::invalid_request("destination cannot be empty"));
        }

        Ok(Self {
            destination,
            payload: payload.into(),
        })
    }

    /// Build a request from a loosely typed per-message property map
    ///
    /// # Errors
    /// Returns `InvalidRequest` if the `topic` property is missing or empty
    pub fn from_properties(
        properties: &HashMap<String, String>,
        payload: impl Into<Bytes>,
    ) -> Result<Self, ContractError> {
        let destination = properties.get(DESTINATION_PROPERTY).ok_or_else(|| {
            ContractError::invalid_request(format!("missing '{DESTINATION_PROPERTY}' property"))
        })?;
        Self::new(destination.clone(), payload)
    }

    /// Payload size in bytes
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    pub fn payload_preview(&self) -> String {
        payload_preview(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request() {
        let request = PublishRequest::new("orders", "hello").unwrap();
        assert_eq!(request.destination, "orders");
        assert_eq!(request.payload, Bytes::from_static(b"hello"));
        assert_eq!(request.payload_len(), 5);
    }

    #[test]
    fn test_blank_destination_rejected() {
        let err = PublishRequest::new("  ", "hello").unwrap_err();
        assert!(matches!(err, ContractError::InvalidRequest { .. }));
    }

    #[test]
    fn test_from_properties() {
        let properties = HashMap::from([("topic".to_string(), "events".to_string())]);
        let request = PublishRequest::from_properties(&properties, "x").unwrap();
        assert_eq!(request.destination, "events");
    }

    #[test]
    fn test_from_properties_missing_topic() {
        let err = PublishRequest::from_properties(&HashMap::new(), "x").unwrap_err();
        assert!(err.to_string().contains("topic"));
    }

    #[test]
    fn test_payload_preview_is_bounded() {
        let request = PublishRequest::new("orders", vec![b'x'; 200]).unwrap();
        assert_eq!(request.payload_preview().len(), PAYLOAD_PREVIEW_LEN);

        assert_eq!(payload_preview(b"short"), "short");
        assert_eq!(payload_preview(&[0xff, b'a']), "\u{fffd}a");
    }
}
