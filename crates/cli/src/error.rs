//! Error types for CLI operations.

use std::path::Path;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Requested adapter is not configured
    #[error("Adapter '{name}' not found (configured: {available})")]
    AdapterNotFound { name: String, available: String },

    /// Neither arguments nor stdin provided a message
    #[error("No messages to publish")]
    NoMessages,

    /// Adapter could not be brought up
    #[error("Failed to start adapter '{adapter}': {message}")]
    AdapterStartup { adapter: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: &Path) -> Self {
        Self::ConfigNotFound {
            path: path.display().to_string(),
        }
    }

    pub fn adapter_not_found<'a>(
        name: impl Into<String>,
        available: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self::AdapterNotFound {
            name: name.into(),
            available: available.into_iter().collect::<Vec<_>>().join(", "),
        }
    }

    pub fn adapter_startup(adapter: impl Into<String>, source: impl std::fmt::Display) -> Self {
        Self::AdapterStartup {
            adapter: adapter.into(),
            message: source.to_string(),
        }
    }
}
