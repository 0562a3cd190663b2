// src/main.rs

mod config;
mod error;
mod geometry;
mod health;
mod metrics;
mod notifier;
mod recorder;
mod store;
mod timefmt;
mod types;
mod watcher;

use anyhow::Result;
use metrics::WatcherMetrics;
use notifier::{LogNotifier, Notifier, SmsNotifier};
use recorder::ViolationRecorder;
use std::sync::Arc;
use store::{
    FirestoreStore, MemoryStore, PresenceStore, VehicleStore, ViolationStore, ZoneStore,
};
use tokio::sync::watch;
use tracing::info;
use types::{Config, NotifierMode, StoreBackend, Strategy};
use watcher::{ContainmentWatcher, DwellWatcher, ViolationTrigger};

struct Stores {
    presences: Arc<dyn PresenceStore>,
    zones: Arc<dyn ZoneStore>,
    vehicles: Arc<dyn VehicleStore>,
    violations: Arc<dyn ViolationStore>,
}

fn build_stores(config: &Config) -> Result<Stores> {
    Ok(match config.store.backend {
        StoreBackend::Memory => {
            let store = Arc::new(MemoryStore::new());
            Stores {
                presences: store.clone(),
                zones: store.clone(),
                vehicles: store.clone(),
                violations: store,
            }
        }
        StoreBackend::Firestore => {
            let store = Arc::new(FirestoreStore::from_env()?);
            Stores {
                presences: store.clone(),
                zones: store.clone(),
                vehicles: store.clone(),
                violations: store,
            }
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());
    let config = Config::load(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "parking_violation_detection={}",
            config.logging.level
        ))
        .init();

    info!("🚙 No-Parking Violation Watcher Starting");
    info!("✓ Configuration loaded from {config_path}");

    let stores = build_stores(&config)?;
    let notifier: Arc<dyn Notifier> = match config.notifier.mode {
        NotifierMode::Sms => Arc::new(SmsNotifier::from_env()?),
        NotifierMode::Log => Arc::new(LogNotifier),
    };
    let recorder = Arc::new(ViolationRecorder::new(
        stores.violations.clone(),
        stores.vehicles.clone(),
        notifier,
    ));

    let trigger: Arc<dyn ViolationTrigger> = match config.watcher.strategy {
        Strategy::Dwell => Arc::new(DwellWatcher::new(
            stores.presences.clone(),
            recorder,
            &config.watcher.dwell,
        )),
        Strategy::Containment => Arc::new(ContainmentWatcher::new(
            stores.zones.clone(),
            stores.vehicles.clone(),
            recorder,
            &config.watcher.containment,
        )),
    };
    info!("✓ Strategy: {}", trigger.name());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let metrics = Arc::new(WatcherMetrics::new());

    let health_handle = tokio::spawn(health::serve(
        config.health.bind.clone(),
        config.health.message.clone(),
        shutdown_rx.clone(),
    ));
    let watcher_handle = tokio::spawn(watcher::run_watcher(trigger, metrics, shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    watcher_handle.await?;
    health_handle.await??;
    info!("✓ Shutdown complete");
    Ok(())
}
