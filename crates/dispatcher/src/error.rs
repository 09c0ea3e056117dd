//! Dispatcher error types

use contracts::ContractError;
use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Pool built outside a tokio runtime
    #[error("pool '{pool}' must be created inside a tokio runtime")]
    NoRuntime { pool: String },

    /// Pool configuration could not be resolved
    #[error("pool '{pool}' configuration rejected: {source}")]
    PoolConfig {
        pool: String,
        #[source]
        source: ContractError,
    },

    /// Broker connection could not be opened
    #[error("adapter '{adapter}' failed to connect: {source}")]
    Connection {
        adapter: String,
        #[source]
        source: ContractError,
    },

    /// Contract-level error
    #[error("contract error: {0}")]
    Contract(#[from] ContractError),
}

impl DispatcherError {
    /// Create a connection error
    pub fn connection(adapter: impl Into<String>, source: ContractError) -> Self {
        Self::Connection {
            adapter: adapter.into(),
            source,
        }
    }
}
