// src/store/firestore.rs
//
// Firestore REST backend. Collections mirror the ingestion side:
//   geofence_entries  - ActivePresence documents
//   no_parking        - zone polygons (corner fields c1..c4, "lat,long")
//   vehicles          - registered vehicle snapshots
//   violation_details - violation records, keyed by violation id
//
// The atomic check-exists-then-create the recorder relies on maps to
// `createDocument?documentId=<id>`: Firestore answers ALREADY_EXISTS
// when the id is taken, which is safe across process instances.

use crate::error::StoreError;
use crate::geometry::{parse_coordinate, ZoneQuad};
use crate::store::{DocId, PresenceStore, VehicleStore, ViolationStore, ZoneStore};
use crate::types::{ActivePresence, VehicleSnapshot, Violation, ZonePolygon};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

const PRESENCE_COLLECTION: &str = "geofence_entries";
const ZONE_COLLECTION: &str = "no_parking";
const VEHICLE_COLLECTION: &str = "vehicles";
const VIOLATION_COLLECTION: &str = "violation_details";

pub struct FirestoreStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
}

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: HashMap<String, FieldValue>,
}

#[derive(Debug, Deserialize)]
struct RunQueryRow {
    document: Option<Document>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldValue {
    string_value: Option<String>,
    double_value: Option<f64>,
}

impl FirestoreStore {
    pub fn from_env() -> Result<Self> {
        let project_id = std::env::var("FIRESTORE_PROJECT_ID")
            .context("FIRESTORE_PROJECT_ID is not set")?;
        let token =
            std::env::var("FIRESTORE_API_TOKEN").context("FIRESTORE_API_TOKEN is not set")?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: format!(
                "https://firestore.googleapis.com/v1/projects/{project_id}/databases/(default)/documents"
            ),
            token,
        })
    }

    async fn list_collection(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let response = self
            .client
            .get(format!("{}/{collection}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|err| StoreError::Unreachable(err.to_string()))?;
        if !response.status().is_success() {
            return Err(StoreError::Rejected(format!(
                "list {collection}: HTTP {}",
                response.status()
            )));
        }
        let body: ListDocumentsResponse = response
            .json()
            .await
            .map_err(|err| StoreError::Rejected(err.to_string()))?;
        Ok(body.documents)
    }
}

fn string_field(fields: &HashMap<String, FieldValue>, name: &str) -> Option<String> {
    fields.get(name).and_then(|v| v.string_value.clone())
}

fn double_field(fields: &HashMap<String, FieldValue>, name: &str) -> Option<f64> {
    fields.get(name).and_then(|v| v.double_value)
}

fn presence_from_fields(fields: &HashMap<String, FieldValue>) -> Option<ActivePresence> {
    Some(ActivePresence {
        zone_name: string_field(fields, "zoneName")?,
        vehicle_plate: string_field(fields, "vehiclePlate")?,
        entry_timestamp: string_field(fields, "entryTimestamp")?,
        latitude: double_field(fields, "latitude"),
        longitude: double_field(fields, "longitude"),
    })
}

fn zone_from_fields(fields: &HashMap<String, FieldValue>) -> Option<ZonePolygon> {
    let name = string_field(fields, "name")?;
    let mut corners = Vec::with_capacity(4);
    for key in ["c1", "c2", "c3", "c4"] {
        let raw = string_field(fields, key)?;
        match parse_coordinate(&raw) {
            Ok(point) => corners.push(point),
            Err(err) => {
                warn!("zone {name:?}: corner {key} unparsable: {err}");
                return None;
            }
        }
    }
    let vertices = [corners[0], corners[1], corners[2], corners[3]];
    match ZoneQuad::new(vertices) {
        Ok(quad) => {
            for (i, corner) in quad.vertices().iter().enumerate() {
                debug!("zone {name:?} c{}: {:.6},{:.6}", i + 1, corner.lat, corner.lon);
            }
            Some(ZonePolygon { name, quad })
        }
        Err(err) => {
            warn!("zone {name:?} skipped: {err}");
            None
        }
    }
}

fn vehicle_from_fields(fields: &HashMap<String, FieldValue>) -> Option<VehicleSnapshot> {
    let plate = string_field(fields, "vehiclePlate")?;
    let last_position = string_field(fields, "lastPosition").and_then(|raw| {
        match parse_coordinate(&raw) {
            Ok(point) => Some(point),
            Err(err) => {
                warn!("vehicle {plate}: position unparsable: {err}");
                None
            }
        }
    });
    Some(VehicleSnapshot {
        plate,
        last_position,
        contact_address: string_field(fields, "contactAddress"),
        observed_at: string_field(fields, "observedAt"),
    })
}

fn violation_to_fields(violation: &Violation) -> serde_json::Value {
    json!({
        "fields": {
            "zoneName": { "stringValue": violation.zone_name },
            "vehiclePlate": { "stringValue": violation.vehicle_plate },
            "entryTimestamp": { "stringValue": violation.entry_timestamp },
            "exitTimestamp": { "stringValue": violation.exit_timestamp.as_wire() },
            "kind": { "stringValue": "NoParking" },
        }
    })
}

#[async_trait]
impl PresenceStore for FirestoreStore {
    async fn list_presences(&self) -> Result<Vec<(DocId, ActivePresence)>, StoreError> {
        let documents = self.list_collection(PRESENCE_COLLECTION).await?;
        let mut presences = Vec::with_capacity(documents.len());
        for doc in documents {
            match presence_from_fields(&doc.fields) {
                Some(presence) => presences.push((DocId(doc.name), presence)),
                None => warn!("presence document {} missing fields, skipped", doc.name),
            }
        }
        Ok(presences)
    }

    async fn delete_presence(&self, id: &DocId) -> Result<(), StoreError> {
        // DocId holds the full resource name returned by list.
        let response = self
            .client
            .delete(format!("https://firestore.googleapis.com/v1/{}", id.0))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|err| StoreError::Unreachable(err.to_string()))?;
        if !response.status().is_success() {
            return Err(StoreError::Rejected(format!(
                "delete {}: HTTP {}",
                id.0,
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ZoneStore for FirestoreStore {
    async fn list_zones(&self) -> Result<Vec<ZonePolygon>, StoreError> {
        let documents = self.list_collection(ZONE_COLLECTION).await?;
        Ok(documents
            .iter()
            .filter_map(|doc| zone_from_fields(&doc.fields))
            .collect())
    }
}

#[async_trait]
impl VehicleStore for FirestoreStore {
    async fn find_by_plate(&self, plate: &str) -> Result<Option<VehicleSnapshot>, StoreError> {
        let query = json!({
            "structuredQuery": {
                "from": [{ "collectionId": VEHICLE_COLLECTION }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": "vehiclePlate" },
                        "op": "EQUAL",
                        "value": { "stringValue": plate },
                    }
                },
                "limit": 1,
            }
        });
        let response = self
            .client
            .post(format!("{}:runQuery", self.base_url))
            .bearer_auth(&self.token)
            .json(&query)
            .send()
            .await
            .map_err(|err| StoreError::Unreachable(err.to_string()))?;
        if !response.status().is_success() {
            return Err(StoreError::Rejected(format!(
                "runQuery {VEHICLE_COLLECTION}: HTTP {}",
                response.status()
            )));
        }
        let rows: Vec<RunQueryRow> = response
            .json()
            .await
            .map_err(|err| StoreError::Rejected(err.to_string()))?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.document)
            .find_map(|doc| vehicle_from_fields(&doc.fields)))
    }

    async fn list_with_position(&self) -> Result<Vec<VehicleSnapshot>, StoreError> {
        let documents = self.list_collection(VEHICLE_COLLECTION).await?;
        Ok(documents
            .iter()
            .filter_map(|doc| vehicle_from_fields(&doc.fields))
            .filter(|v| v.last_position.is_some())
            .collect())
    }
}

#[async_trait]
impl ViolationStore for FirestoreStore {
    async fn create_if_absent(&self, violation: &Violation) -> Result<bool, StoreError> {
        let response = self
            .client
            .post(format!(
                "{}/{VIOLATION_COLLECTION}?documentId={}",
                self.base_url, violation.id
            ))
            .bearer_auth(&self.token)
            .json(&violation_to_fields(violation))
            .send()
            .await
            .map_err(|err| StoreError::Unreachable(err.to_string()))?;
        if response.status() == reqwest::StatusCode::CONFLICT {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(StoreError::Rejected(format!(
                "create {}: HTTP {}",
                violation.id,
                response.status()
            )));
        }
        Ok(true)
    }
}
