use crate::geometry::{GeoPoint, ZoneQuad};
use crate::timefmt::ExitTime;
use serde::{Deserialize, Serialize};

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub watcher: WatcherConfig,
    pub store: StoreConfig,
    pub notifier: NotifierConfig,
    pub health: HealthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Which detection strategy to run. The two are alternatives, not a
    /// pair; exactly one watcher task is spawned.
    pub strategy: Strategy,
    #[serde(default)]
    pub dwell: DwellConfig,
    #[serde(default)]
    pub containment: ContainmentConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Dwell,
    Containment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DwellConfig {
    /// Dwell time beyond which a presence becomes a violation.
    #[serde(default = "default_dwell_threshold_secs")]
    pub threshold_secs: u64,
    #[serde(default = "default_dwell_period_secs")]
    pub period_secs: u64,
}

impl Default for DwellConfig {
    fn default() -> Self {
        Self {
            threshold_secs: default_dwell_threshold_secs(),
            period_secs: default_dwell_period_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainmentConfig {
    #[serde(default = "default_containment_period_secs")]
    pub period_secs: u64,
}

impl Default for ContainmentConfig {
    fn default() -> Self {
        Self {
            period_secs: default_containment_period_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process store, for local runs and tests.
    Memory,
    /// Firestore REST backend; credentials come from the environment.
    Firestore,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    pub mode: NotifierMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierMode {
    Sms,
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_health_bind")]
    pub bind: String,
    #[serde(default = "default_health_message")]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

fn default_dwell_threshold_secs() -> u64 {
    120
}

fn default_dwell_period_secs() -> u64 {
    1
}

fn default_containment_period_secs() -> u64 {
    5
}

fn default_health_bind() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_health_message() -> String {
    "violation watcher running".to_string()
}

// ============================================================================
// DOMAIN RECORDS
// ============================================================================

/// A vehicle's unresolved occupancy of a zone. Exists only until a
/// watcher judges it; the dwell watcher deletes it the moment it does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivePresence {
    pub zone_name: String,
    pub vehicle_plate: String,
    /// Wire-format civil timestamp of zone entry (IST).
    pub entry_timestamp: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A monitored no-parking area, decoded from the store's four
/// `"lat,long"` corner fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonePolygon {
    pub name: String,
    pub quad: ZoneQuad,
}

/// Last known state of a registered vehicle. Owned by the ingestion
/// system; read-only here.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSnapshot {
    pub plate: String,
    pub last_position: Option<GeoPoint>,
    pub contact_address: Option<String>,
    pub observed_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationKind {
    NoParking,
}

/// Immutable record of a confirmed infraction. Written exactly once by
/// the recorder, never mutated or deleted by this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Unique id, format `VID_<nn>`.
    pub id: String,
    pub zone_name: String,
    pub vehicle_plate: String,
    pub entry_timestamp: String,
    pub exit_timestamp: ExitTime,
    pub kind: ViolationKind,
}
