// src/geometry.rs
//
// Flat-plane geometry for zone containment. City-scale zones are small
// enough that treating lat/lon as planar x/y is accurate to well under
// a metre, so no projection is applied.

use crate::error::ParseError;
use serde::{Deserialize, Serialize};

/// Tolerance for the on-segment test. Roughly 0.1 mm at the equator,
/// far below GPS resolution.
const EDGE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Parse a `"lat,long"` wire string as stored in the zone documents
/// (`c1`..`c4` fields) and vehicle position fields.
pub fn parse_coordinate(raw: &str) -> Result<GeoPoint, ParseError> {
    let mut parts = raw.splitn(2, ',');
    let lat = parts
        .next()
        .and_then(|p| p.trim().parse::<f64>().ok())
        .ok_or_else(|| ParseError::Coordinate(raw.to_string()))?;
    let lon = parts
        .next()
        .and_then(|p| p.trim().parse::<f64>().ok())
        .ok_or_else(|| ParseError::Coordinate(raw.to_string()))?;
    Ok(GeoPoint::new(lat, lon))
}

/// A monitored zone boundary: four ordered corners forming a simple
/// closed quadrilateral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneQuad {
    vertices: [GeoPoint; 4],
}

impl ZoneQuad {
    /// Build a quad from four ordered corners. Rejects degenerate input
    /// (repeated corners); self-intersecting quads are the zone
    /// author's problem and are not detected here.
    pub fn new(vertices: [GeoPoint; 4]) -> Result<Self, ParseError> {
        for i in 0..4 {
            for j in (i + 1)..4 {
                if vertices[i] == vertices[j] {
                    return Err(ParseError::Coordinate(format!(
                        "corners {} and {} coincide",
                        i + 1,
                        j + 1
                    )));
                }
            }
        }
        Ok(Self { vertices })
    }

    pub fn vertices(&self) -> &[GeoPoint; 4] {
        &self.vertices
    }

    /// Boundary-inclusive point-in-polygon test.
    ///
    /// Convention: a point exactly on an edge or vertex counts as
    /// contained. The edge test runs first so the ray-cast parity below
    /// never decides a boundary point; this keeps the boundary outcome
    /// deterministic for identical inputs.
    pub fn contains(&self, p: GeoPoint) -> bool {
        for i in 0..4 {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % 4];
            if on_segment(a, b, p) {
                return true;
            }
        }

        // Standard ray casting: count edge crossings of a horizontal
        // ray extending in +lon from the point.
        let mut inside = false;
        let mut j = 3;
        for i in 0..4 {
            let vi = self.vertices[i];
            let vj = self.vertices[j];
            if (vi.lat > p.lat) != (vj.lat > p.lat) {
                let cross_lon =
                    (vj.lon - vi.lon) * (p.lat - vi.lat) / (vj.lat - vi.lat) + vi.lon;
                if p.lon < cross_lon {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

fn on_segment(a: GeoPoint, b: GeoPoint, p: GeoPoint) -> bool {
    let cross = (b.lat - a.lat) * (p.lon - a.lon) - (b.lon - a.lon) * (p.lat - a.lat);
    if cross.abs() > EDGE_EPSILON {
        return false;
    }
    let within_lat = p.lat >= a.lat.min(b.lat) - EDGE_EPSILON
        && p.lat <= a.lat.max(b.lat) + EDGE_EPSILON;
    let within_lon = p.lon >= a.lon.min(b.lon) - EDGE_EPSILON
        && p.lon <= a.lon.max(b.lon) + EDGE_EPSILON;
    within_lat && within_lon
}
