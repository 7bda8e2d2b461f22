//! Farm requests and fused farm profiles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::EngineError;
use crate::model::{Coordinate, ProvenanceTier, SourceKind, SourceReading};
use crate::quality::{vegetation_health, SoilDescriptors, VegetationHealth};
use crate::varieties::VarietyCategory;
use crate::zones::{MatchMethod, Zone};

/// Land-management practice adopted (or planned) by the farmer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Practice {
    AgroforestryIntegration,
    ResidueManagement,
    CoverCropping,
    ReducedTillage,
    AlternateWettingDrying,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FarmerPreferences {
    pub practices: Vec<Practice>,
    /// Categories the farmer does not want recommended
    pub excluded_categories: Vec<VarietyCategory>,
    /// Overrides the configured top-K for this request
    pub top_k: Option<usize>,
}

/// One farm recommendation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmRequest {
    pub farm_id: String,
    pub coordinate: Coordinate,
    #[serde(default)]
    pub preferences: FarmerPreferences,
    /// Source kinds to fetch; all kinds when absent
    #[serde(default)]
    pub sources: Option<Vec<SourceKind>>,
    /// End of the observation window; now when absent
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
}

impl FarmRequest {
    pub fn new(farm_id: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            farm_id: farm_id.into(),
            coordinate,
            preferences: FarmerPreferences::default(),
            sources: None,
            as_of: None,
        }
    }

    /// Reject requests whose source override names no kind at all
    pub fn validate(&self) -> Result<(), EngineError> {
        match &self.sources {
            Some(kinds) if kinds.is_empty() => Err(EngineError::InvalidRequest {
                farm_id: self.farm_id.clone(),
                reason: "source override lists no source kinds".to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Requested kinds, deduplicated, in canonical order
    pub fn requested_sources(&self) -> Vec<SourceKind> {
        match &self.sources {
            None => SourceKind::ALL.to_vec(),
            Some(kinds) => SourceKind::ALL
                .into_iter()
                .filter(|k| kinds.contains(k))
                .collect(),
        }
    }
}

/// Outcome of one source kind for a farm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceSlot {
    Accepted(SourceReading),
    /// Cascade reached UNAVAILABLE; the tiers that were tried
    Missing { exhausted: Vec<ProvenanceTier> },
    NotRequested,
}

impl SourceSlot {
    pub fn reading(&self) -> Option<&SourceReading> {
        match self {
            SourceSlot::Accepted(r) => Some(r),
            _ => None,
        }
    }

    pub fn tier(&self) -> ProvenanceTier {
        match self {
            SourceSlot::Accepted(r) => r.tier,
            _ => ProvenanceTier::Unavailable,
        }
    }
}

static NOT_REQUESTED: SourceSlot = SourceSlot::NotRequested;

/// Fused, read-only view of one farm
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FarmProfile {
    pub farm_id: String,
    pub coordinate: Coordinate,
    pub zone: Zone,
    pub zone_method: MatchMethod,
    pub zone_distance_km: f64,
    pub sources: BTreeMap<SourceKind, SourceSlot>,
    pub preferences: FarmerPreferences,
    pub soil: Option<SoilDescriptors>,
    pub vegetation: Option<VegetationHealth>,
    /// Aggregate profile confidence in [0, 1]
    pub confidence: f64,
}

impl FarmProfile {
    /// Build a profile; every kind not given a slot is recorded as not requested
    pub fn new(
        farm_id: impl Into<String>,
        coordinate: Coordinate,
        zone: Zone,
        zone_method: MatchMethod,
        zone_distance_km: f64,
        mut sources: BTreeMap<SourceKind, SourceSlot>,
        preferences: FarmerPreferences,
    ) -> Self {
        for kind in SourceKind::ALL {
            sources.entry(kind).or_insert(SourceSlot::NotRequested);
        }
        let soil = sources
            .get(&SourceKind::Soil)
            .and_then(SourceSlot::reading)
            .and_then(SourceReading::soil)
            .map(SoilDescriptors::from_payload);
        let vegetation = sources
            .get(&SourceKind::Satellite)
            .and_then(SourceSlot::reading)
            .and_then(SourceReading::satellite)
            .map(vegetation_health);

        Self {
            farm_id: farm_id.into(),
            coordinate,
            zone,
            zone_method,
            zone_distance_km,
            sources,
            preferences,
            soil,
            vegetation,
            confidence: 0.0,
        }
    }

    pub fn slot(&self, kind: SourceKind) -> &SourceSlot {
        self.sources.get(&kind).unwrap_or(&NOT_REQUESTED)
    }

    pub fn reading(&self, kind: SourceKind) -> Option<&SourceReading> {
        self.slot(kind).reading()
    }

    pub fn accepted(&self) -> impl Iterator<Item = &SourceReading> {
        self.sources.values().filter_map(SourceSlot::reading)
    }

    pub fn missing_kinds(&self) -> Vec<SourceKind> {
        self.sources
            .iter()
            .filter(|(_, slot)| matches!(slot, SourceSlot::Missing { .. }))
            .map(|(kind, _)| *kind)
            .collect()
    }

    /// Repaired soil pH, if a usable soil reading was accepted
    pub fn soil_ph(&self) -> Option<f64> {
        self.soil.and_then(|s| s.ph)
    }
}
