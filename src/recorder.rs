// src/recorder.rs
//
// Shared recording path for both watcher strategies. Allocates the
// violation id, persists the record exactly once, then hands off to the
// notifier. Id uniqueness is enforced by the store's atomic
// check-exists-then-create, so multiple process instances are safe.

use crate::error::{NotifyError, StoreError};
use crate::notifier::{alert_message, Notifier};
use crate::store::{VehicleStore, ViolationStore};
use crate::timefmt::ExitTime;
use crate::types::{Violation, ViolationKind};
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Allocation attempts before giving up. The id space is only 100 wide;
/// exhausting 10 random draws means the store is effectively full (or
/// unreachable behind a conflict storm) and the cycle should abort.
const MAX_ID_ATTEMPTS: u32 = 10;

/// Facts a watcher hands over when it judges a presence to be a
/// violation.
#[derive(Debug, Clone)]
pub struct ViolationFacts {
    pub zone_name: String,
    pub vehicle_plate: String,
    /// Wire-format entry timestamp.
    pub entry_timestamp: String,
    pub exit_timestamp: ExitTime,
    /// Contact address when the triggering strategy already has it;
    /// otherwise looked up by plate.
    pub contact_address: Option<String>,
}

pub struct ViolationRecorder {
    violations: Arc<dyn ViolationStore>,
    vehicles: Arc<dyn VehicleStore>,
    notifier: Arc<dyn Notifier>,
}

impl ViolationRecorder {
    pub fn new(
        violations: Arc<dyn ViolationStore>,
        vehicles: Arc<dyn VehicleStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            violations,
            vehicles,
            notifier,
        }
    }

    /// Record one violation. Returns the assigned id.
    ///
    /// The random-suffix draw plus `create_if_absent` retries until an
    /// unclaimed id is found, bounded at MAX_ID_ATTEMPTS. Notification
    /// runs after the write and can never undo it.
    pub async fn record(&self, facts: ViolationFacts) -> Result<String, StoreError> {
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let id = format!("VID_{:02}", rand::thread_rng().gen_range(0..100));
            let violation = Violation {
                id: id.clone(),
                zone_name: facts.zone_name.clone(),
                vehicle_plate: facts.vehicle_plate.clone(),
                entry_timestamp: facts.entry_timestamp.clone(),
                exit_timestamp: facts.exit_timestamp.clone(),
                kind: ViolationKind::NoParking,
            };
            if self.violations.create_if_absent(&violation).await? {
                info!(
                    "violation {id} recorded: {} in {} since {}",
                    facts.vehicle_plate, facts.zone_name, facts.entry_timestamp
                );
                if let Err(err) = self.dispatch_alert(&facts).await {
                    warn!("alert for {id} not delivered: {err}");
                }
                return Ok(id);
            }
            debug!("violation id {id} already taken (attempt {attempt}), redrawing");
        }
        Err(StoreError::IdSpaceExhausted {
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    async fn dispatch_alert(&self, facts: &ViolationFacts) -> Result<(), NotifyError> {
        let contact = match &facts.contact_address {
            Some(address) => Some(address.clone()),
            None => match self.vehicles.find_by_plate(&facts.vehicle_plate).await {
                Ok(snapshot) => snapshot.and_then(|v| v.contact_address),
                Err(err) => {
                    // Lookup trouble downgrades to "no contact"; the
                    // violation is already persisted.
                    warn!("contact lookup for {} failed: {err}", facts.vehicle_plate);
                    None
                }
            },
        };
        let Some(address) = contact else {
            info!("no contact address registered for {}", facts.vehicle_plate);
            return Ok(());
        };
        self.notifier
            .notify(&address, &alert_message(&facts.vehicle_plate))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::VehicleSnapshot;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl RecordingNotifier {
        fn new(fail: bool) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, address: &str, body: &str) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError("gateway down".to_string()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((address.to_string(), body.to_string()));
            Ok(())
        }
    }

    fn facts() -> ViolationFacts {
        ViolationFacts {
            zone_name: "MallLot".to_string(),
            vehicle_plate: "KA01AB1234".to_string(),
            entry_timestamp: "2024-01-01 10:00 AM".to_string(),
            exit_timestamp: ExitTime::StillActive,
            contact_address: None,
        }
    }

    fn recorder_over(
        store: Arc<MemoryStore>,
        notifier: Arc<RecordingNotifier>,
    ) -> ViolationRecorder {
        ViolationRecorder::new(store.clone(), store, notifier)
    }

    #[tokio::test]
    async fn test_record_assigns_vid_and_persists() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new(false));
        let recorder = recorder_over(store.clone(), notifier);

        let id = recorder.record(facts()).await.unwrap();
        assert!(id.starts_with("VID_"));
        assert_eq!(id.len(), 6);

        let violations = store.violations().await;
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].id, id);
        assert_eq!(violations[0].exit_timestamp, ExitTime::StillActive);
    }

    #[tokio::test]
    async fn test_notifies_registered_contact() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_vehicle(VehicleSnapshot {
                plate: "KA01AB1234".to_string(),
                last_position: None,
                contact_address: Some("+911234567890".to_string()),
                observed_at: None,
            })
            .await;
        let notifier = Arc::new(RecordingNotifier::new(false));
        let recorder = recorder_over(store, notifier.clone());

        recorder.record(facts()).await.unwrap();

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "+911234567890");
        assert!(sent[0].1.contains("KA01AB1234"));
    }

    #[tokio::test]
    async fn test_missing_contact_is_not_an_error() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new(false));
        let recorder = recorder_over(store.clone(), notifier.clone());

        assert!(recorder.record(facts()).await.is_ok());
        assert!(notifier.sent.lock().unwrap().is_empty());
        assert_eq!(store.violations().await.len(), 1);
    }

    #[tokio::test]
    async fn test_notify_failure_never_undoes_the_record() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_vehicle(VehicleSnapshot {
                plate: "KA01AB1234".to_string(),
                last_position: None,
                contact_address: Some("+911234567890".to_string()),
                observed_at: None,
            })
            .await;
        let notifier = Arc::new(RecordingNotifier::new(true));
        let recorder = recorder_over(store.clone(), notifier);

        assert!(recorder.record(facts()).await.is_ok());
        assert_eq!(store.violations().await.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_recordings_get_distinct_ids() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new(false));
        let recorder = Arc::new(recorder_over(store.clone(), notifier));

        let mut handles = Vec::new();
        for _ in 0..2 {
            let recorder = recorder.clone();
            handles.push(tokio::spawn(async move { recorder.record(facts()).await }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap());
        }
        assert_ne!(ids[0], ids[1]);
        assert_eq!(store.violations().await.len(), 2);
    }

    #[tokio::test]
    async fn test_full_id_space_exhausts_retries() {
        let store = Arc::new(MemoryStore::new());
        for n in 0..100 {
            let taken = Violation {
                id: format!("VID_{n:02}"),
                zone_name: "MallLot".to_string(),
                vehicle_plate: "OTHER".to_string(),
                entry_timestamp: "2024-01-01 09:00 AM".to_string(),
                exit_timestamp: ExitTime::StillActive,
                kind: ViolationKind::NoParking,
            };
            assert!(store.create_if_absent(&taken).await.unwrap());
        }
        let notifier = Arc::new(RecordingNotifier::new(false));
        let recorder = recorder_over(store, notifier);

        let err = recorder.record(facts()).await.unwrap_err();
        assert!(matches!(err, StoreError::IdSpaceExhausted { attempts: 10 }));
    }
}
