//! EventAdapter - init / connect / publish / disconnect for one output adapter

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use config_loader::{client_properties, resolve_pool_config};
use contracts::{
    AdapterConfig, BrokerClient, BrokerConnection, ContractError, DiagnosticsSink, DropCause,
    PublishRequest,
};
use tracing::{debug, info, instrument, warn};

use crate::error::DispatcherError;
use crate::manager::PoolManager;
use crate::pool::DispatchPool;
use crate::task::{AdapterContext, PublishTask};

/// What happened to a published message
///
/// `Enqueued` only means a worker will attempt the send; delivery failures
/// surface through diagnostics, never here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Enqueued,
    Dropped(DropCause),
}

impl PublishOutcome {
    pub fn is_enqueued(&self) -> bool {
        matches!(self, Self::Enqueued)
    }

    pub fn drop_cause(&self) -> Option<DropCause> {
        match self {
            Self::Enqueued => None,
            Self::Dropped(cause) => Some(*cause),
        }
    }
}

/// One output adapter bound to a broker client and a shared pool
pub struct EventAdapter<B: BrokerClient> {
    config: AdapterConfig,
    global: HashMap<String, String>,
    client: B,
    manager: Arc<PoolManager<B::Connection>>,
    context: Arc<AdapterContext<B::Connection>>,
    pool: OnceLock<Arc<DispatchPool<B::Connection>>>,
}

impl<B: BrokerClient> EventAdapter<B> {
    /// Create an adapter; nothing is started until `init` / `connect`
    pub fn new(
        config: AdapterConfig,
        global: HashMap<String, String>,
        client: B,
        manager: Arc<PoolManager<B::Connection>>,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        let context = Arc::new(AdapterContext::new(
            config.name.clone(),
            config.tenant.clone(),
            diagnostics,
        ));

        Self {
            config,
            global,
            client,
            manager,
            context,
            pool: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn tenant(&self) -> &str {
        &self.config.tenant
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn client(&self) -> &B {
        &self.client
    }

    pub fn is_connected(&self) -> bool {
        self.context.connection().is_connected()
    }

    /// The shared pool, once `init` has succeeded
    pub fn pool(&self) -> Option<&Arc<DispatchPool<B::Connection>>> {
        self.pool.get()
    }

    /// Make sure the shared pool exists
    ///
    /// Pool configuration is resolved from the global properties only when
    /// this adapter is the one that builds the pool.
    ///
    /// # Errors
    /// - A global override is unparseable or violates a pool invariant
    /// - No tokio runtime is available
    #[instrument(
        name = "event_adapter_init",
        skip(self),
        fields(adapter = %self.config.name, client = self.client.kind())
    )]
    pub fn init(&self) -> Result<(), DispatcherError> {
        let pool_name = format!("{}-{}", self.client.kind(), self.config.name);
        let pool = self
            .manager
            .ensure_initialized_with(&pool_name, || resolve_pool_config(&self.global))?;

        let pool = self.pool.get_or_init(|| pool);
        debug!(pool = %pool.name(), "Adapter attached to pool");
        Ok(())
    }

    /// Open a broker connection and install it for the workers
    ///
    /// A previously installed connection is replaced and closed.
    ///
    /// # Errors
    /// Returns `Connection` when the client cannot open the connection
    #[instrument(
        name = "event_adapter_connect",
        skip(self),
        fields(adapter = %self.config.name, client = self.client.kind())
    )]
    pub async fn connect(&self) -> Result<(), DispatcherError> {
        let (properties, malformed) = client_properties(
            &self.config.broker_address,
            self.config.optional_properties.as_deref(),
        );
        for entry in malformed {
            self.context.report_malformed(entry);
        }

        let connection = self
            .client
            .open(&properties)
            .await
            .map_err(|source| DispatcherError::connection(&self.config.name, source))?;

        if let Some(previous) = self.context.connection().install(connection) {
            close_connection(&self.config.name, previous.as_ref()).await;
        }

        info!(
            broker_address = %self.config.broker_address,
            properties = properties.len(),
            "Adapter connected"
        );
        Ok(())
    }

    /// Submit a message without waiting
    ///
    /// A rejected message is reported to diagnostics and dropped.
    pub fn publish(&self, request: PublishRequest) -> PublishOutcome {
        let Some(pool) = self.pool.get() else {
            self.context
                .report_drop(&request, DropCause::PoolNotInitialized);
            return PublishOutcome::Dropped(DropCause::PoolNotInitialized);
        };

        match pool.submit(PublishTask::new(request, Arc::clone(&self.context))) {
            Ok(()) => PublishOutcome::Enqueued,
            Err(rejection) => {
                self.context
                    .report_drop(rejection.task.request(), rejection.cause);
                PublishOutcome::Dropped(rejection.cause)
            }
        }
    }

    /// Build a request from a per-message property map and publish it
    ///
    /// # Errors
    /// Returns `InvalidRequest` when the `topic` property is missing or blank
    pub fn publish_with_properties(
        &self,
        properties: &HashMap<String, String>,
        payload: impl Into<bytes::Bytes>,
    ) -> Result<PublishOutcome, ContractError> {
        let request = PublishRequest::from_properties(properties, payload)?;
        Ok(self.publish(request))
    }

    /// Close the connection if one is open
    ///
    /// Tasks still queued will fail with "not connected". Close errors are
    /// logged only.
    #[instrument(name = "event_adapter_disconnect", skip(self), fields(adapter = %self.config.name))]
    pub async fn disconnect(&self) {
        match self.context.connection().take() {
            Some(connection) => {
                close_connection(&self.config.name, connection.as_ref()).await;
                info!("Adapter disconnected");
            }
            None => debug!("Adapter not connected, nothing to close"),
        }
    }

    /// Connection testing is not offered by this adapter
    pub async fn test_connect(&self) -> Result<(), DispatcherError> {
        Err(ContractError::Unsupported {
            operation: "test_connect".to_string(),
        }
        .into())
    }
}

async fn close_connection<C: BrokerConnection>(adapter: &str, connection: &C) {
    if let Err(e) = connection.close().await {
        warn!(adapter = %adapter, error = %e, "Closing broker connection failed");
    }
}
