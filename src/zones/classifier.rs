//! Zone Classifier
//!
//! Resolves a coordinate to exactly one agro-climatic zone, or fails with
//! `ZoneUnresolved`. Never defaults to a zone.
//!
//! Resolution order:
//! 1. Outside the national bounding box -> unresolved
//! 2. Inside one or more zone boundaries -> that zone (nearest centroid
//!    breaks overlaps, then zone number)
//! 3. Nearest centroid within `max_distance_km` -> that zone
//! 4. Otherwise -> unresolved

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::table::{Zone, ZoneTable};
use crate::config::ZoneConfig;
use crate::error::EngineError;
use crate::model::Coordinate;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres
pub fn haversine_km(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().min(1.0).asin();
    EARTH_RADIUS_KM * c
}

/// How the zone was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    WithinBoundary,
    NearestCentroid,
}

#[derive(Debug, Clone, Serialize)]
pub struct ZoneMatch {
    pub zone: Zone,
    /// Distance to the zone centroid
    pub distance_km: f64,
    pub method: MatchMethod,
}

#[derive(Debug, Clone)]
pub struct ZoneClassifier {
    table: Arc<ZoneTable>,
    config: ZoneConfig,
}

impl ZoneClassifier {
    pub fn new(table: Arc<ZoneTable>, config: ZoneConfig) -> Self {
        Self { table, config }
    }

    pub fn table(&self) -> &ZoneTable {
        &self.table
    }

    pub fn classify(&self, coordinate: &Coordinate) -> Result<ZoneMatch, EngineError> {
        let unresolved = |reason: String| EngineError::ZoneUnresolved {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            reason,
        };

        if !coordinate.is_valid() {
            return Err(unresolved("coordinate is not a valid latitude/longitude".into()));
        }
        if !self.config.national_bounds.contains(coordinate) {
            return Err(unresolved("outside the national bounding box".into()));
        }

        // (zone, distance) for every zone, in table order
        let distances: Vec<(&Zone, f64)> = self
            .table
            .iter()
            .map(|zone| (zone, haversine_km(coordinate, &zone.centroid)))
            .collect();

        let inside = distances
            .iter()
            .filter(|(zone, _)| zone.contains(coordinate))
            .min_by(|a, b| nearest_first(a, b));

        if let Some((zone, distance_km)) = inside {
            debug!(zone = %zone.id, distance_km, "Zone resolved within boundary");
            return Ok(ZoneMatch {
                zone: (*zone).clone(),
                distance_km: *distance_km,
                method: MatchMethod::WithinBoundary,
            });
        }

        let nearest = distances
            .iter()
            .min_by(|a, b| nearest_first(a, b))
            .ok_or_else(|| unresolved("zone table is empty".into()))?;

        let (zone, distance_km) = nearest;
        if *distance_km <= self.config.max_distance_km {
            debug!(zone = %zone.id, distance_km, "Zone resolved by nearest centroid");
            Ok(ZoneMatch {
                zone: (*zone).clone(),
                distance_km: *distance_km,
                method: MatchMethod::NearestCentroid,
            })
        } else {
            Err(unresolved(format!(
                "nearest zone {} is {:.1} km away (limit {:.1} km)",
                zone.id, distance_km, self.config.max_distance_km
            )))
        }
    }
}

fn nearest_first(a: &(&Zone, f64), b: &(&Zone, f64)) -> std::cmp::Ordering {
    a.1.total_cmp(&b.1).then(a.0.number.cmp(&b.0.number))
}
