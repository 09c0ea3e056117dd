//! PoolManager - initialize-once owner of a shared dispatch pool

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use contracts::{BrokerConnection, ContractError, PoolConfig};
use tracing::{debug, instrument};

use crate::error::DispatcherError;
use crate::pool::DispatchPool;

/// Owns at most one [`DispatchPool`] shared by every adapter given this
/// manager
///
/// The first successful `ensure_initialized*` call builds the pool; later
/// calls return it unchanged.
pub struct PoolManager<C> {
    pool: OnceLock<Arc<DispatchPool<C>>>,
    init_lock: Mutex<()>,
}

impl<C: BrokerConnection> PoolManager<C> {
    pub fn new() -> Self {
        Self {
            pool: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    /// Return the pool, building it from `config` if none exists yet
    ///
    /// # Errors
    /// - `config` violates a `PoolConfig` invariant
    /// - No tokio runtime is available
    pub fn ensure_initialized(
        &self,
        name: &str,
        config: PoolConfig,
    ) -> Result<Arc<DispatchPool<C>>, DispatcherError> {
        if let Some(pool) = self.pool.get() {
            if pool.config() != &config {
                debug!(
                    pool = %pool.name(),
                    requested = ?config,
                    active = ?pool.config(),
                    "Pool already initialized, requested configuration ignored"
                );
            }
            return Ok(Arc::clone(pool));
        }
        self.ensure_initialized_with(name, || Ok(config))
    }

    /// Return the pool, building it if none exists yet
    ///
    /// `resolve` runs only in the caller that actually builds the pool.
    ///
    /// # Errors
    /// - `resolve` fails, or its result violates a `PoolConfig` invariant
    /// - No tokio runtime is available
    #[instrument(name = "pool_manager_ensure_initialized", skip(self, resolve))]
    pub fn ensure_initialized_with<F>(
        &self,
        name: &str,
        resolve: F,
    ) -> Result<Arc<DispatchPool<C>>, DispatcherError>
    where
        F: FnOnce() -> Result<PoolConfig, ContractError>,
    {
        if let Some(pool) = self.pool.get() {
            return Ok(Arc::clone(pool));
        }

        let _guard = self.init_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pool) = self.pool.get() {
            return Ok(Arc::clone(pool));
        }

        let config = resolve()
            .and_then(PoolConfig::validated)
            .map_err(|source| DispatcherError::PoolConfig {
                pool: name.to_string(),
                source,
            })?;
        let pool = Arc::new(DispatchPool::new(name, config)?);

        Ok(Arc::clone(self.pool.get_or_init(|| pool)))
    }

    /// The pool, if initialized
    pub fn pool(&self) -> Option<Arc<DispatchPool<C>>> {
        self.pool.get().cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.pool.get().is_some()
    }
}

impl<C: BrokerConnection> Default for PoolManager<C> {
    fn default() -> Self {
        Self::new()
    }
}
