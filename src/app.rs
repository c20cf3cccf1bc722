//! Application wiring and run loop
//!
//! Resolves the data directory, builds the events service and drives the
//! 1 Hz sweep until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use crate::config::{EVENTS_FILE_NAME, SETTINGS_FILE_NAME, SWEEP_INTERVAL_SECS};
use crate::notify::LogNotifier;
use crate::services::{EventsService, EventsSettings};
use crate::store::EventStore;

/// Resolve the data directory: `CHIME_DATA_DIR` when set, `./data`
/// otherwise.
pub fn data_dir() -> PathBuf {
    std::env::var_os("CHIME_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"))
}

/// Build the events service and run the sweep loop until Ctrl-C.
pub async fn run() -> anyhow::Result<()> {
    let data_dir = data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {:?}", data_dir))?;
    tracing::info!("Data directory: {:?}", data_dir);

    let mut settings = EventsSettings::load(&data_dir.join(SETTINGS_FILE_NAME)).await;
    settings.validate();

    let store = EventStore::open(data_dir.join(EVENTS_FILE_NAME))
        .await
        .context("failed to open the event store")?;
    tracing::info!("Tracking {} events", store.count());

    let mut service = EventsService::new(store, settings, Arc::new(LogNotifier));

    let mut interval =
        tokio::time::interval(std::time::Duration::from_secs(SWEEP_INTERVAL_SECS));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = service.update_events().await {
                    tracing::error!("Error sweeping events: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                service.save_events().await.context("final save failed")?;
                break;
            }
        }
    }

    Ok(())
}
