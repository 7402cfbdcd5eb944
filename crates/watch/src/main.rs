//! `imgbench-watch`: keep the local imgbench cache in sync with a backend.
//!
//! Opens a session from the on-disk cache, refreshes the catalog and runs,
//! follows every unfinished run until it ends, and logs what happens.
//! Stops cleanly on Ctrl-C.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imgbench_cache::{CacheStore, FileStorage};
use imgbench_client::BackendApi;
use imgbench_sync::events::SyncEvent;
use imgbench_sync::Session;

use config::WatchConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imgbench_watch=debug,imgbench_sync=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WatchConfig::from_env().context("Invalid configuration")?;
    tracing::info!(
        api_base = %config.api_base,
        cache_dir = %config.cache_dir.display(),
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        "Loaded watch configuration",
    );

    // --- Backend client ---
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let backend = Arc::new(BackendApi::with_client(http, config.api_base.clone()));

    // --- Cache ---
    let store = Arc::new(CacheStore::new(Arc::new(FileStorage::new(
        config.cache_dir.clone(),
    ))));

    // --- Session ---
    let session = Session::open(backend, store, config.sync_config()).await;
    let event_handle = tokio::spawn(log_events(session.runs.subscribe()));

    if let Err(e) = session.refresh_all().await {
        tracing::warn!(error = %e, "Catalog refresh failed, following cached runs only");
        if let Err(e) = session.resume().await {
            tracing::error!(error = %e, "Failed to fetch runs");
        }
    }

    let runs = session.runs.runs().await;
    tracing::info!(
        runs = runs.len(),
        polling = session.runs.scheduler().active_count().await,
        "Watching runs, press Ctrl-C to stop",
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    session.shutdown().await;
    event_handle.abort();
    Ok(())
}

/// Log sync events until the channel closes.
async fn log_events(mut events: broadcast::Receiver<SyncEvent>) {
    loop {
        match events.recv().await {
            Ok(SyncEvent::RunFinished { run_id, status }) => {
                tracing::info!(%run_id, %status, "Run finished");
            }
            Ok(SyncEvent::RunUpdated { run_id, status }) => {
                tracing::debug!(%run_id, %status, "Run updated");
            }
            Ok(SyncEvent::PollStarted { run_id }) => {
                tracing::debug!(%run_id, "Polling started");
            }
            Ok(SyncEvent::PollStopped { run_id }) => {
                tracing::debug!(%run_id, "Polling stopped");
            }
            Ok(SyncEvent::CatalogRefreshed { entity, count }) => {
                tracing::debug!(entity, count, "Catalog list refreshed");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event log fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
