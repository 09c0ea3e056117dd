//! ConnectionSlot - the adapter's shared, replaceable broker connection

use std::sync::{Arc, PoisonError, RwLock};

/// Holder for the current connection
///
/// Workers clone the `Arc` and release the lock before sending, so a slow
/// send never blocks `connect` / `disconnect`.
pub struct ConnectionSlot<C> {
    inner: RwLock<Option<Arc<C>>>,
}

impl<C> ConnectionSlot<C> {
    /// Create an empty slot
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    /// Current connection, if any
    pub fn current(&self) -> Option<Arc<C>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install a connection, returning the one it replaces
    pub fn install(&self, connection: C) -> Option<Arc<C>> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::new(connection))
    }

    /// Remove and return the current connection
    pub fn take(&self) -> Option<Arc<C>> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn is_connected(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl<C> Default for ConnectionSlot<C> {
    fn default() -> Self {
        Self::new()
    }
}
