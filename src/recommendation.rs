//! Recommendation output
//!
//! The only artifact handed to persistence, reporting and UI layers.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::cascade::{CascadeResult, TierAttempt};
use crate::error::EngineError;
use crate::model::{ProvenanceTier, SourceKind};
use crate::profile::{FarmProfile, SourceSlot};
use crate::quality::{SoilDescriptors, VegetationHealth};
use crate::scoring::{
    CarbonEstimate, Dimension, DimensionScore, FarmCarbonScenario, SourceContribution,
};
use crate::varieties::VarietyCategory;
use crate::zones::{ClimateRegime, MatchMethod};

/// One variety scored against one farm
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuitabilityResult {
    pub variety_id: String,
    pub name: String,
    pub category: VarietyCategory,
    /// Suitability in [0, 1]
    pub score: f64,
    /// Confidence in [0, 1]
    pub confidence: f64,
    pub carbon_potential: CarbonEstimate,
    pub dimensions: Vec<DimensionScore>,
    pub excluded: Vec<Dimension>,
    pub excluded_weight_fraction: f64,
    pub reduced_certainty: bool,
    pub contributing: Vec<String>,
    pub limiting: Vec<String>,
    /// Readings behind the scored dimensions, with their tiers
    pub provenance: Vec<SourceContribution>,
}

impl SuitabilityResult {
    /// Primary ranking key
    pub fn weighted_score(&self) -> f64 {
        self.score * self.confidence
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneSummary {
    pub id: String,
    pub number: u8,
    pub name: String,
    pub climate: ClimateRegime,
    pub method: MatchMethod,
    pub distance_km: f64,
}

impl ZoneSummary {
    pub fn from_profile(profile: &FarmProfile) -> Self {
        Self {
            id: profile.zone.id.clone(),
            number: profile.zone.number,
            name: profile.zone.name.clone(),
            climate: profile.zone.climate,
            method: profile.zone_method,
            distance_km: profile.zone_distance_km,
        }
    }
}

/// Per-source provenance for the data-quality summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub kind: SourceKind,
    pub tier: ProvenanceTier,
    /// Quality of the accepted reading; None when unavailable or not requested
    pub quality: Option<f64>,
    pub requested: bool,
    pub attempts: Vec<TierAttempt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct DataQualitySummary {
    pub sources: Vec<SourceSummary>,
    /// Kinds that reached UNAVAILABLE
    pub unavailable: Vec<SourceKind>,
    /// Human-readable `SourceUnavailable` reasons
    pub warnings: Vec<String>,
    /// Any accepted reading came from a fallback tier
    pub degraded: bool,
}

impl DataQualitySummary {
    /// Build from the cascade results; kinds without a result were not requested
    pub fn from_cascades(results: &[CascadeResult]) -> Self {
        let mut summary = DataQualitySummary::default();
        for kind in SourceKind::ALL {
            let Some(result) = results.iter().find(|r| r.kind == kind) else {
                summary.sources.push(SourceSummary {
                    kind,
                    tier: ProvenanceTier::Unavailable,
                    quality: None,
                    requested: false,
                    attempts: Vec::new(),
                });
                continue;
            };

            let reading = result.slot.reading();
            match &result.slot {
                SourceSlot::Accepted(r) => summary.degraded |= r.tier != ProvenanceTier::Primary,
                SourceSlot::Missing { exhausted } => {
                    summary.unavailable.push(kind);
                    summary.warnings.push(
                        EngineError::SourceUnavailable {
                            kind,
                            exhausted: exhausted.clone(),
                        }
                        .to_string(),
                    );
                }
                SourceSlot::NotRequested => {}
            }
            summary.sources.push(SourceSummary {
                kind,
                tier: result.final_tier(),
                quality: reading.map(|r| r.quality),
                requested: true,
                attempts: result.attempts.clone(),
            });
        }
        summary
    }

    /// Build from an already-fused profile; no per-tier attempt log
    pub fn from_profile(profile: &FarmProfile) -> Self {
        let results: Vec<CascadeResult> = profile
            .sources
            .iter()
            .filter(|(_, slot)| !matches!(slot, SourceSlot::NotRequested))
            .map(|(kind, slot)| CascadeResult {
                kind: *kind,
                slot: slot.clone(),
                attempts: Vec::new(),
            })
            .collect();
        Self::from_cascades(&results)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecommendationStatus {
    Ok,
    /// Every candidate scored 0 for the zone
    NoEligibleVarieties { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub farm_id: String,
    pub zone: ZoneSummary,
    pub status: RecommendationStatus,
    /// Ranked results per category, best first
    pub categories: BTreeMap<VarietyCategory, Vec<SuitabilityResult>>,
    /// Request-level confidence; never above the weakest contributing source
    pub confidence: f64,
    pub data_quality: DataQualitySummary,
    pub carbon_scenario: Option<FarmCarbonScenario>,
    pub soil: Option<SoilDescriptors>,
    pub vegetation: Option<VegetationHealth>,
}

impl Recommendation {
    pub fn results(&self, category: VarietyCategory) -> &[SuitabilityResult] {
        self.categories.get(&category).map_or(&[], Vec::as_slice)
    }

    pub fn top(&self, category: VarietyCategory) -> Option<&SuitabilityResult> {
        self.results(category).first()
    }

    pub fn all_results(&self) -> impl Iterator<Item = &SuitabilityResult> {
        self.categories.values().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.values().all(Vec::is_empty)
    }
}
