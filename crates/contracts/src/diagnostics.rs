//! Diagnostics records - the only surface for drops and delivery failures

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Why a message was dropped at submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropCause {
    /// Backlog queue saturated and no worker slot free
    BacklogFull,
    /// Pool has been shut down
    PoolClosed,
    /// Adapter published before its pool was initialized
    PoolNotInitialized,
}

impl DropCause {
    /// Stable label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BacklogFull => "backlog full",
            Self::PoolClosed => "pool closed",
            Self::PoolNotInitialized => "pool not initialized",
        }
    }
}

impl fmt::Display for DropCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message discarded instead of being queued
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropRecord {
    pub adapter: String,
    pub tenant: String,
    pub destination: String,
    pub payload_len: usize,
    /// Leading bytes of the payload, lossy UTF-8
    pub payload_preview: String,
    pub cause: DropCause,
}

/// A queued message whose send failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryFailure {
    pub adapter: String,
    pub tenant: String,
    pub destination: String,
    pub error: String,
}

/// An optional client property entry that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedProperty {
    pub adapter: String,
    pub entry: String,
}

/// Structured diagnostic record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    Dropped(DropRecord),
    DeliveryFailed(DeliveryFailure),
    MalformedProperty(MalformedProperty),
}

impl Diagnostic {
    /// Name of the adapter the record belongs to
    pub fn adapter(&self) -> &str {
        match self {
            Self::Dropped(record) => &record.adapter,
            Self::DeliveryFailed(failure) => &failure.adapter,
            Self::MalformedProperty(property) => &property.adapter,
        }
    }
}

/// Receiver of diagnostic records
///
/// Called from submitting threads and pool workers alike; implementations
/// must not block.
pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, diagnostic: Diagnostic);
}

impl<T: DiagnosticsSink + ?Sized> DiagnosticsSink for Arc<T> {
    fn record(&self, diagnostic: Diagnostic) {
        (**self).record(diagnostic);
    }
}
