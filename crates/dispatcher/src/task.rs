//! PublishTask - one unit of work executed by a pool worker

use std::fmt;
use std::sync::Arc;

use contracts::{
    BrokerConnection, ContractError, DeliveryFailure, Diagnostic, DiagnosticsSink, DropCause,
    DropRecord, MalformedProperty, PublishRequest,
};
use tracing::{debug, error, instrument, warn};

use crate::connection::ConnectionSlot;

/// State shared by an adapter and every task it submits
pub struct AdapterContext<C> {
    name: String,
    tenant: String,
    connection: ConnectionSlot<C>,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl<C> AdapterContext<C> {
    /// Create a context with an empty connection slot
    pub fn new(
        name: impl Into<String>,
        tenant: impl Into<String>,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            name: name.into(),
            tenant: tenant.into(),
            connection: ConnectionSlot::new(),
            diagnostics,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn connection(&self) -> &ConnectionSlot<C> {
        &self.connection
    }

    /// Log and record a message rejected at submission
    pub fn report_drop(&self, request: &PublishRequest, cause: DropCause) {
        let preview = request.payload_preview();
        warn!(
            adapter = %self.name,
            tenant = %self.tenant,
            destination = %request.destination,
            bytes = request.payload_len(),
            preview = %preview,
            cause = %cause,
            "Message dropped"
        );
        self.diagnostics.record(Diagnostic::Dropped(DropRecord {
            adapter: self.name.clone(),
            tenant: self.tenant.clone(),
            destination: request.destination.clone(),
            payload_len: request.payload_len(),
            payload_preview: preview,
            cause,
        }));
    }

    /// Log and record a send that failed inside a worker
    pub fn report_failure(&self, destination: &str, error: impl fmt::Display) {
        let error = error.to_string();
        error!(
            adapter = %self.name,
            tenant = %self.tenant,
            destination = %destination,
            error = %error,
            "Delivery failed"
        );
        self.diagnostics
            .record(Diagnostic::DeliveryFailed(DeliveryFailure {
                adapter: self.name.clone(),
                tenant: self.tenant.clone(),
                destination: destination.to_string(),
                error,
            }));
    }

    /// Record an optional property entry that was skipped
    pub fn report_malformed(&self, entry: impl Into<String>) {
        self.diagnostics
            .record(Diagnostic::MalformedProperty(MalformedProperty {
                adapter: self.name.clone(),
                entry: entry.into(),
            }));
    }
}

/// Result of running one task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Failed,
}

/// Send one payload to one destination
///
/// Immutable once built. Never retried or requeued: a failed send is
/// reported and the task is gone.
pub struct PublishTask<C> {
    request: PublishRequest,
    context: Arc<AdapterContext<C>>,
}

impl<C> PublishTask<C> {
    pub fn new(request: PublishRequest, context: Arc<AdapterContext<C>>) -> Self {
        Self { request, context }
    }

    pub fn request(&self) -> &PublishRequest {
        &self.request
    }

    pub fn context(&self) -> &Arc<AdapterContext<C>> {
        &self.context
    }
}

impl<C: BrokerConnection> PublishTask<C> {
    /// Hand the payload to the adapter's current connection
    ///
    /// Every failure is reported here; nothing is returned to the worker
    /// except whether the send went through.
    #[instrument(
        name = "publish_task_run",
        skip(self),
        fields(adapter = %self.context.name, destination = %self.request.destination)
    )]
    pub async fn run(self) -> Delivery {
        let Some(connection) = self.context.connection.current() else {
            let error = ContractError::NotConnected {
                adapter: self.context.name.clone(),
            };
            self.context.report_failure(&self.request.destination, error);
            return Delivery::Failed;
        };

        match connection
            .send(&self.request.destination, &self.request.payload)
            .await
        {
            Ok(()) => {
                debug!(bytes = self.request.payload_len(), "Delivered");
                Delivery::Delivered
            }
            Err(e) => {
                self.context.report_failure(&self.request.destination, e);
                Delivery::Failed
            }
        }
    }
}

impl<C> fmt::Debug for PublishTask<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishTask")
            .field("adapter", &self.context.name)
            .field("destination", &self.request.destination)
            .field("payload_len", &self.request.payload_len())
            .finish()
    }
}
