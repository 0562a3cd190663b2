// src/watcher/containment.rs
//
// Containment strategy: any vehicle whose last known position lies
// inside a zone polygon is an immediate violation, no dwell test. At
// most one violation per vehicle per cycle; the first containing zone
// wins and the zone order is the store's enumeration order, so the
// outcome is repeatable within a run.

use crate::error::StoreError;
use crate::recorder::{ViolationFacts, ViolationRecorder};
use crate::store::{VehicleStore, ZoneStore};
use crate::timefmt::{self, ExitTime};
use crate::types::ContainmentConfig;
use crate::watcher::{CycleReport, ViolationTrigger};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct ContainmentWatcher {
    zones: Arc<dyn ZoneStore>,
    vehicles: Arc<dyn VehicleStore>,
    recorder: Arc<ViolationRecorder>,
    period: Duration,
}

impl ContainmentWatcher {
    pub fn new(
        zones: Arc<dyn ZoneStore>,
        vehicles: Arc<dyn VehicleStore>,
        recorder: Arc<ViolationRecorder>,
        config: &ContainmentConfig,
    ) -> Self {
        Self {
            zones,
            vehicles,
            recorder,
            period: Duration::from_secs(config.period_secs),
        }
    }

    pub async fn sweep(&self) -> Result<CycleReport, StoreError> {
        // Zones are re-read every cycle and immutable within one.
        let zones = self.zones.list_zones().await?;
        let vehicles = self.vehicles.list_with_position().await?;

        let mut report = CycleReport::default();
        for vehicle in vehicles {
            report.scanned += 1;
            let Some(position) = vehicle.last_position else {
                continue;
            };
            for zone in &zones {
                if !zone.quad.contains(position) {
                    continue;
                }
                debug!(
                    "{} at {:.6},{:.6} inside {}",
                    vehicle.plate, position.lat, position.lon, zone.name
                );
                let entry_timestamp = vehicle
                    .observed_at
                    .clone()
                    .unwrap_or_else(|| timefmt::format_wire(timefmt::now_ist()));
                self.recorder
                    .record(ViolationFacts {
                        zone_name: zone.name.clone(),
                        vehicle_plate: vehicle.plate.clone(),
                        entry_timestamp,
                        exit_timestamp: ExitTime::StillActive,
                        contact_address: vehicle.contact_address.clone(),
                    })
                    .await?;
                report.violations += 1;
                // First containing zone wins; on to the next vehicle.
                break;
            }
        }
        Ok(report)
    }
}

#[async_trait]
impl ViolationTrigger for ContainmentWatcher {
    fn name(&self) -> &'static str {
        "containment"
    }

    fn period(&self) -> Duration {
        self.period
    }

    async fn run_cycle(&self) -> Result<CycleReport, StoreError> {
        self.sweep().await
    }
}
