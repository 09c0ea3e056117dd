//! `publish` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use crate::cli::PublishArgs;
use crate::error::CliError;
use crate::pipeline::{PublishSession, SessionConfig};

/// Execute the `publish` command
pub async fn run_publish(args: &PublishArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        adapters = blueprint.adapters.len(),
        global_overrides = blueprint.global.len(),
        "Configuration loaded"
    );

    let messages = if args.messages.is_empty() {
        read_stdin_messages().await?
    } else {
        args.messages.clone()
    };
    if messages.is_empty() {
        return Err(CliError::NoMessages.into());
    }

    let session = PublishSession::new(SessionConfig {
        blueprint,
        adapter: args.adapter.clone(),
        destination: args.destination.clone(),
        messages,
        repeat: args.repeat,
        drain_timeout: Duration::from_secs(args.drain_timeout),
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    });

    let shutdown_signal = setup_shutdown_signal();

    info!(destination = %args.destination, "Starting publish session...");

    tokio::select! {
        result = session.run() => {
            let stats = result.context("Publish session failed")?;
            info!(
                adapter = %stats.adapter,
                published = stats.published,
                dropped = stats.dropped,
                delivered = stats.delivered,
                failed = stats.failed,
                duration_secs = stats.duration.as_secs_f64(),
                "Publish session completed"
            );
            stats.print_summary();
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, abandoning queued messages");
        }
    }

    info!("Event Publisher finished");
    Ok(())
}

/// Read one message per non-empty line from stdin
async fn read_stdin_messages() -> Result<Vec<String>, CliError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut messages = Vec::new();
    while let Some(line) = lines.next_line().await? {
        if !line.trim().is_empty() {
            messages.push(line);
        }
    }
    Ok(messages)
}

/// Setup Ctrl+C and SIGTERM signal handlers
///
/// A handler that cannot be installed is logged and never fires.
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
