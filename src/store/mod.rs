// src/store/mod.rs
//
// The engine owns no persistent state. Everything shared between
// watcher cycles (and between process instances) lives behind these
// four store interfaces; the only cross-instance coordination point is
// ViolationStore::create_if_absent, which the backend must make atomic.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::types::{ActivePresence, VehicleSnapshot, Violation, ZonePolygon};
use async_trait::async_trait;

/// Opaque store document id. For Firestore this is the full document
/// resource name; the memory backend uses a counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocId(pub String);

#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Full-collection enumeration; every cycle re-reads the world.
    async fn list_presences(&self) -> Result<Vec<(DocId, ActivePresence)>, StoreError>;

    async fn delete_presence(&self, id: &DocId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ZoneStore: Send + Sync {
    /// Returns the well-formed zones only. Malformed documents (missing
    /// corner, unparsable coordinate) are logged and skipped, never
    /// fatal.
    async fn list_zones(&self) -> Result<Vec<ZonePolygon>, StoreError>;
}

#[async_trait]
pub trait VehicleStore: Send + Sync {
    async fn find_by_plate(&self, plate: &str) -> Result<Option<VehicleSnapshot>, StoreError>;

    /// Snapshots that carry a last known position.
    async fn list_with_position(&self) -> Result<Vec<VehicleSnapshot>, StoreError>;
}

#[async_trait]
pub trait ViolationStore: Send + Sync {
    /// Atomic check-exists-then-create keyed on the violation id.
    /// Returns `false` when the id was already taken (caller retries
    /// with a fresh id). Concurrent callers racing the same id must see
    /// exactly one `true`.
    async fn create_if_absent(&self, violation: &Violation) -> Result<bool, StoreError>;
}
