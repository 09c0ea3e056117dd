//! Publish session - drives one adapter from startup to drain.
//!
//! The broker client is chosen from the adapter's configured kind; the rest
//! of the session is generic over [`BrokerClient`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use contracts::{AdapterConfig, BrokerClient, ClientKind, DiagnosticsSink, PublishRequest, PublisherBlueprint};
use dispatcher::{EventAdapter, FileClient, LogClient, PoolManager, UdpClient};
use observability::{
    record_backlog_depth, record_pool_workers, record_publish_outcome, record_submit_latency_us,
    RecordingDiagnostics, Tee, TracingDiagnostics,
};
use tracing::{debug, info, warn};

use super::PublishStats;
use crate::error::CliError;

/// Backlog and worker gauges are sampled every this many submissions
const GAUGE_SAMPLE_INTERVAL: u64 = 64;

/// Publish session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Loaded publisher configuration
    pub blueprint: PublisherBlueprint,

    /// Adapter to use (None = first configured)
    pub adapter: Option<String>,

    /// Destination for every message
    pub destination: String,

    /// Message payloads in submission order
    pub messages: Vec<String>,

    /// Times each message is published
    pub repeat: u64,

    /// How long to wait for queued messages at the end
    pub drain_timeout: Duration,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// One publish run against a single adapter
pub struct PublishSession {
    config: SessionConfig,
}

impl PublishSession {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Run the session to completion
    pub async fn run(self) -> Result<PublishStats> {
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let adapter = self.select_adapter()?.clone();
        info!(
            adapter = %adapter.name,
            client = ?adapter.client,
            broker_address = %adapter.broker_address,
            "Adapter selected"
        );

        match adapter.client {
            ClientKind::Log => self.run_with(&adapter, LogClient::new()).await,
            ClientKind::Udp => self.run_with(&adapter, UdpClient::new()).await,
            ClientKind::File => self.run_with(&adapter, FileClient::new()).await,
        }
    }

    fn select_adapter(&self) -> Result<&AdapterConfig, CliError> {
        let blueprint = &self.config.blueprint;
        let found = match &self.config.adapter {
            Some(name) => blueprint.adapter(name),
            None => blueprint.adapters.first(),
        };

        found.ok_or_else(|| {
            CliError::adapter_not_found(
                self.config.adapter.clone().unwrap_or_default(),
                blueprint.adapters.iter().map(|a| a.name.as_str()),
            )
        })
    }

    async fn run_with<B: BrokerClient>(&self, config: &AdapterConfig, client: B) -> Result<PublishStats> {
        let start_time = Instant::now();

        let recording = Arc::new(RecordingDiagnostics::new());
        let diagnostics: Arc<dyn DiagnosticsSink> = Arc::new(Tee::new(
            TracingDiagnostics::new(),
            Arc::clone(&recording),
        ));

        let adapter = EventAdapter::new(
            config.clone(),
            self.config.blueprint.global.clone(),
            client,
            Arc::new(PoolManager::new()),
            diagnostics,
        );

        adapter
            .init()
            .map_err(|e| CliError::adapter_startup(&config.name, e))?;
        adapter
            .connect()
            .await
            .map_err(|e| CliError::adapter_startup(&config.name, e))?;

        let mut stats = PublishStats {
            adapter: config.name.clone(),
            ..Default::default()
        };

        for message in &self.config.messages {
            for _ in 0..self.config.repeat {
                let request = PublishRequest::new(self.config.destination.clone(), message.clone())?;

                let submit_start = Instant::now();
                let outcome = adapter.publish(request);
                let latency_us = submit_start.elapsed().as_secs_f64() * 1_000_000.0;

                stats.published += 1;
                stats.submit_latency_us.push(latency_us);
                record_submit_latency_us(adapter.name(), latency_us);
                record_publish_outcome(adapter.name(), outcome.drop_cause());

                if outcome.is_enqueued() {
                    stats.enqueued += 1;
                } else {
                    stats.dropped += 1;
                }

                if stats.published % GAUGE_SAMPLE_INTERVAL == 0 {
                    if let Some(pool) = adapter.pool() {
                        record_backlog_depth(pool.name(), pool.backlog_len());
                        record_pool_workers(pool.name(), pool.live_workers());
                    }
                }
            }
        }

        debug!(
            published = stats.published,
            dropped = stats.dropped,
            "All messages submitted, draining pool"
        );

        stats.drained = true;
        if let Some(pool) = adapter.pool() {
            if tokio::time::timeout(self.config.drain_timeout, pool.shutdown())
                .await
                .is_err()
            {
                warn!(
                    timeout_secs = self.config.drain_timeout.as_secs_f64(),
                    backlog = pool.backlog_len(),
                    "Drain timeout expired with messages still queued"
                );
                stats.drained = false;
            }

            let snapshot = pool.metrics();
            stats.delivered = snapshot.delivered;
            stats.failed = snapshot.failed;
            stats.peak_workers = snapshot.peak_workers;
        }

        adapter.disconnect().await;

        stats.malformed_properties = recording.malformed().len();
        stats.duration = start_time.elapsed();
        Ok(stats)
    }
}
