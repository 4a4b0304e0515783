//! devcap Capacity Engine
//!
//! Consumes assignment lifecycle events and reconciles engineer calendars
//! with task person-day budgets. Events arrive as JSON lines on stdin (the
//! development transport); each line is one assignment event.

use std::sync::Arc;

use anyhow::Result;
use devcap_capacity_engine::{
    config::Config,
    handler::AssignmentLifecycleHandler,
    stores::MemoryStore,
    worker::AssignmentEventWorker,
};
use devcap_events::AssignmentEvent;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to DEVCAP_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting devcap capacity engine");
    info!(event_buffer = config.event_buffer, "Configuration loaded");

    let store = Arc::new(MemoryStore::new());
    let handler = Arc::new(AssignmentLifecycleHandler::new(
        store.clone(),
        store.clone(),
        store.clone(),
    ));
    let worker = AssignmentEventWorker::new(handler);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (event_tx, event_rx) = mpsc::channel::<AssignmentEvent>(config.event_buffer);

    // Worker drains the channel in the background.
    let worker_handle = tokio::spawn({
        let shutdown_rx = shutdown_rx.clone();
        async move {
            worker.run(event_rx, shutdown_rx).await;
        }
    });

    // Feed events from stdin. A malformed line is logged and skipped.
    let reader_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<AssignmentEvent>(line) {
                        Ok(event) => {
                            if event_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "Skipping malformed event line"),
                    }
                }
                Ok(None) => {
                    info!("Event input closed");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read event input");
                    break;
                }
            }
        }
    });

    // Wait for shutdown signal (Ctrl+C) or input exhaustion. On input
    // exhaustion the closed channel lets the worker drain what is queued;
    // Ctrl+C cuts it short.
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            let _ = shutdown_tx.send(true);
        }
        _ = reader_handle => {}
    }

    info!("Waiting for worker to shut down...");
    let shutdown_timeout = std::time::Duration::from_secs(10);
    if let Err(e) = tokio::time::timeout(shutdown_timeout, worker_handle).await {
        warn!(error = %e, "Event worker did not shut down in time");
    }

    info!("Capacity engine stopped");
    Ok(())
}
