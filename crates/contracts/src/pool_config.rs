//! PoolConfig - Dispatch pool sizing
//!
//! Resolved once when the pool is built; fixed for the pool's lifetime.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use crate::ContractError;

/// Default number of workers kept alive
pub const DEFAULT_MIN_WORKERS: usize = 8;

/// Default upper bound on concurrent workers
pub const DEFAULT_MAX_WORKERS: usize = 100;

/// Default idle time before a surplus worker retires (ms)
pub const DEFAULT_KEEP_ALIVE_MS: u64 = 20_000;

/// Default backlog queue capacity
pub const DEFAULT_BACKLOG_CAPACITY: usize = 10_000;

/// Bounded worker pool configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PoolConfig {
    /// Workers kept alive even when idle
    pub min_workers: usize,

    /// Upper bound on concurrent workers, must be >= 1
    #[validate(range(min = 1, message = "max_workers must be at least 1"))]
    pub max_workers: usize,

    /// Idle time after which workers above `min_workers` retire
    pub keep_alive_ms: u64,

    /// Capacity of the backlog queue, must be > 0
    #[validate(range(min = 1, message = "backlog_capacity must be at least 1"))]
    pub backlog_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_workers: DEFAULT_MIN_WORKERS,
            max_workers: DEFAULT_MAX_WORKERS,
            keep_alive_ms: DEFAULT_KEEP_ALIVE_MS,
            backlog_capacity: DEFAULT_BACKLOG_CAPACITY,
        }
    }
}

impl PoolConfig {
    /// Keep-alive as a `Duration`
    pub fn keep_alive(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms)
    }

    /// Check every invariant, returning the config unchanged when it holds
    ///
    /// # Errors
    /// - `max_workers` or `backlog_capacity` is zero
    /// - `min_workers` exceeds `max_workers`
    pub fn validated(self) -> Result<Self, ContractError> {
        self.validate()?;

        if self.min_workers > self.max_workers {
            return Err(ContractError::config_validation(
                "min_workers / max_workers",
                format!(
                    "min_workers ({}) must be <= max_workers ({})",
                    self.min_workers, self.max_workers
                ),
            ));
        }

        Ok(self)
    }
}
