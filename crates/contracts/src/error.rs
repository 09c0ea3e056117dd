//! Layered error definitions
//!
//! Categorized by source: config / request / broker

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Request Errors =====
    /// Publish request rejected at the boundary
    #[error("invalid publish request: {message}")]
    InvalidRequest { message: String },

    // ===== Broker Errors =====
    /// Broker connection could not be opened
    #[error("broker connection error for '{address}': {message}")]
    BrokerConnection { address: String, message: String },

    /// Send to a destination failed
    #[error("send to '{destination}' failed: {message}")]
    BrokerSend {
        destination: String,
        message: String,
    },

    /// No open connection for the adapter
    #[error("adapter '{adapter}' has no open broker connection")]
    NotConnected { adapter: String },

    /// Operation the adapter does not provide
    #[error("operation not supported: {operation}")]
    Unsupported { operation: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create broker connection error
    pub fn broker_connection(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BrokerConnection {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Create broker send error
    pub fn broker_send(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BrokerSend {
            destination: destination.into(),
            message: message.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ContractError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|field| field.to_string())
            .unwrap_or_else(|| "<root>".to_string());
        Self::ConfigValidation {
            field,
            message: errors.to_string(),
        }
    }
}
