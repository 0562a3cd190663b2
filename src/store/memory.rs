// src/store/memory.rs
//
// In-process store backend. Implements all four interfaces over
// mutex-guarded maps; `create_if_absent` is atomic under the violations
// lock. Used for local runs and as the test double.

use crate::error::StoreError;
use crate::store::{DocId, PresenceStore, VehicleStore, ViolationStore, ZoneStore};
use crate::types::{ActivePresence, VehicleSnapshot, Violation, ZonePolygon};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct MemoryStore {
    presences: Mutex<HashMap<DocId, ActivePresence>>,
    zones: Mutex<Vec<ZonePolygon>>,
    vehicles: Mutex<HashMap<String, VehicleSnapshot>>,
    violations: Mutex<HashMap<String, Violation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Seeding and inspection helpers. Record ingestion is an external
/// system in production; these exist for tests and local experiments.
#[cfg(test)]
impl MemoryStore {
    pub async fn insert_presence(&self, presence: ActivePresence) -> DocId {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NEXT_DOC: AtomicU64 = AtomicU64::new(0);
        let id = DocId(format!(
            "presence/{}",
            NEXT_DOC.fetch_add(1, Ordering::Relaxed)
        ));
        self.presences.lock().await.insert(id.clone(), presence);
        id
    }

    pub async fn insert_zone(&self, zone: ZonePolygon) {
        self.zones.lock().await.push(zone);
    }

    pub async fn insert_vehicle(&self, vehicle: VehicleSnapshot) {
        self.vehicles.lock().await.insert(vehicle.plate.clone(), vehicle);
    }

    pub async fn violations(&self) -> Vec<Violation> {
        self.violations.lock().await.values().cloned().collect()
    }

    pub async fn presence_count(&self) -> usize {
        self.presences.lock().await.len()
    }
}

#[async_trait]
impl PresenceStore for MemoryStore {
    async fn list_presences(&self) -> Result<Vec<(DocId, ActivePresence)>, StoreError> {
        let mut entries: Vec<_> = self
            .presences
            .lock()
            .await
            .iter()
            .map(|(id, p)| (id.clone(), p.clone()))
            .collect();
        entries.sort_by(|(a, _), (b, _)| a.0.cmp(&b.0));
        Ok(entries)
    }

    async fn delete_presence(&self, id: &DocId) -> Result<(), StoreError> {
        self.presences.lock().await.remove(id);
        Ok(())
    }
}

#[async_trait]
impl ZoneStore for MemoryStore {
    async fn list_zones(&self) -> Result<Vec<ZonePolygon>, StoreError> {
        Ok(self.zones.lock().await.clone())
    }
}

#[async_trait]
impl VehicleStore for MemoryStore {
    async fn find_by_plate(&self, plate: &str) -> Result<Option<VehicleSnapshot>, StoreError> {
        Ok(self.vehicles.lock().await.get(plate).cloned())
    }

    async fn list_with_position(&self) -> Result<Vec<VehicleSnapshot>, StoreError> {
        let mut snapshots: Vec<_> = self
            .vehicles
            .lock()
            .await
            .values()
            .filter(|v| v.last_position.is_some())
            .cloned()
            .collect();
        snapshots.sort_by(|a, b| a.plate.cmp(&b.plate));
        Ok(snapshots)
    }
}

#[async_trait]
impl ViolationStore for MemoryStore {
    async fn create_if_absent(&self, violation: &Violation) -> Result<bool, StoreError> {
        let mut violations = self.violations.lock().await;
        if violations.contains_key(&violation.id) {
            return Ok(false);
        }
        violations.insert(violation.id.clone(), violation.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timefmt::ExitTime;
    use crate::types::ViolationKind;
    use std::sync::Arc;

    fn violation(id: &str) -> Violation {
        Violation {
            id: id.to_string(),
            zone_name: "MallLot".to_string(),
            vehicle_plate: "KA01AB1234".to_string(),
            entry_timestamp: "2024-01-01 10:00 AM".to_string(),
            exit_timestamp: ExitTime::StillActive,
            kind: ViolationKind::NoParking,
        }
    }

    #[tokio::test]
    async fn test_create_if_absent_detects_collision() {
        let store = MemoryStore::new();
        assert!(store.create_if_absent(&violation("VID_07")).await.unwrap());
        assert!(!store.create_if_absent(&violation("VID_07")).await.unwrap());
        assert_eq!(store.violations().await.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_claims_on_same_id_yield_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create_if_absent(&violation("VID_42")).await.unwrap()
            }));
        }
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_delete_presence_removes_record() {
        let store = MemoryStore::new();
        let id = store
            .insert_presence(ActivePresence {
                zone_name: "MallLot".to_string(),
                vehicle_plate: "KA01AB1234".to_string(),
                entry_timestamp: "2024-01-01 10:00 AM".to_string(),
                latitude: None,
                longitude: None,
            })
            .await;
        assert_eq!(store.presence_count().await, 1);
        store.delete_presence(&id).await.unwrap();
        assert_eq!(store.presence_count().await, 0);
    }
}
