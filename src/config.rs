//! Engine configuration
//!
//! One explicit configuration object passed at engine construction. Every
//! field has a default, so a partial JSON file only overrides what it names.
//! The weighting constants are illustrative defaults, not validated values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::EngineError;
use crate::model::{ProvenanceTier, SourceKind, ToleranceRange};
use crate::profile::Practice;
use crate::varieties::{VarietyCategory, WaterRequirement};
use crate::zones::BoundingBox;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub quality: QualityConfig,
    pub cascade: CascadeConfig,
    pub confidence: ConfidenceConfig,
    pub scoring: ScoringConfig,
    pub zones: ZoneConfig,
    pub carbon: CarbonConfig,
    pub ranking: RankingConfig,
}

impl EngineConfig {
    /// Load from a JSON file. Does not validate; the engine validates at
    /// construction.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine config: {:?}", path))?;
        serde_json::from_str(&contents).with_context(|| "Failed to parse engine config JSON")
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.quality.validate()?;
        self.cascade.validate()?;
        self.confidence.validate()?;
        self.scoring.validate()?;
        self.zones.validate()?;
        self.carbon.validate()?;
        self.ranking.validate()?;
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> EngineError {
    EngineError::Configuration(msg.into())
}

fn check_weights(section: &str, weights: &[(&str, f64)]) -> Result<(), EngineError> {
    for (name, w) in weights {
        if !w.is_finite() || *w < 0.0 {
            return Err(invalid(format!("{section}.{name} must be a finite non-negative weight, got {w}")));
        }
    }
    let total: f64 = weights.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return Err(invalid(format!("{section} weights sum to zero")));
    }
    Ok(())
}

fn check_unit(name: &str, value: f64) -> Result<(), EngineError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(format!("{name} must lie in [0, 1], got {value}")));
    }
    Ok(())
}

fn check_range(name: &str, range: &ToleranceRange) -> Result<(), EngineError> {
    if !range.is_well_formed() {
        return Err(invalid(format!("{name} is inverted or non-finite: [{}, {}]", range.min, range.max)));
    }
    Ok(())
}

fn check_positive(name: &str, value: f64) -> Result<(), EngineError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(format!("{name} must be positive, got {value}")));
    }
    Ok(())
}

// ============================================================================
// Quality
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Minimum quality score for a reading to be accepted
    pub threshold: f64,
    /// Acceptance threshold at the RELAXED tier (higher tolerance)
    pub relaxed_threshold: f64,
    pub satellite: SatelliteWeights,
    pub soil: SoilWeights,
    pub weather: WeatherWeights,
    pub price: PriceWeights,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            relaxed_threshold: 0.5,
            satellite: SatelliteWeights::default(),
            soil: SoilWeights::default(),
            weather: WeatherWeights::default(),
            price: PriceWeights::default(),
        }
    }
}

impl QualityConfig {
    fn validate(&self) -> Result<(), EngineError> {
        check_unit("quality.threshold", self.threshold)?;
        check_unit("quality.relaxed_threshold", self.relaxed_threshold)?;
        if self.relaxed_threshold > self.threshold {
            return Err(invalid("quality.relaxed_threshold must not exceed quality.threshold"));
        }
        let s = &self.satellite;
        check_weights(
            "quality.satellite",
            &[
                ("cloud_free_fraction", s.cloud_free_fraction),
                ("valid_pixel_density", s.valid_pixel_density),
                ("temporal_consistency", s.temporal_consistency),
                ("spatial_completeness", s.spatial_completeness),
            ],
        )?;
        let s = &self.soil;
        check_weights(
            "quality.soil",
            &[
                ("depth_coverage", s.depth_coverage),
                ("uncertainty", s.uncertainty),
                ("property_completeness", s.property_completeness),
            ],
        )?;
        let w = &self.weather;
        check_weights(
            "quality.weather",
            &[
                ("temporal_completeness", w.temporal_completeness),
                ("station_agreement", w.station_agreement),
                ("recency", w.recency),
            ],
        )?;
        let p = &self.price;
        check_weights(
            "quality.price",
            &[
                ("historical_deviation", p.historical_deviation),
                ("market_coverage", p.market_coverage),
                ("recency", p.recency),
            ],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SatelliteWeights {
    pub cloud_free_fraction: f64,
    pub valid_pixel_density: f64,
    pub temporal_consistency: f64,
    pub spatial_completeness: f64,
}

impl Default for SatelliteWeights {
    fn default() -> Self {
        Self {
            cloud_free_fraction: 0.3,
            valid_pixel_density: 0.2,
            temporal_consistency: 0.3,
            spatial_completeness: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoilWeights {
    pub depth_coverage: f64,
    pub uncertainty: f64,
    pub property_completeness: f64,
}

impl Default for SoilWeights {
    fn default() -> Self {
        Self {
            depth_coverage: 0.4,
            uncertainty: 0.4,
            property_completeness: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherWeights {
    pub temporal_completeness: f64,
    pub station_agreement: f64,
    pub recency: f64,
}

impl Default for WeatherWeights {
    fn default() -> Self {
        Self {
            temporal_completeness: 0.4,
            station_agreement: 0.3,
            recency: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceWeights {
    pub historical_deviation: f64,
    pub market_coverage: f64,
    pub recency: f64,
}

impl Default for PriceWeights {
    fn default() -> Self {
        Self {
            historical_deviation: 0.5,
            market_coverage: 0.25,
            recency: 0.25,
        }
    }
}

// ============================================================================
// Cascade
// ============================================================================

/// Acquisition parameters for one fetch tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionParams {
    /// Observation window length ending at the request time
    pub window_days: i64,
    /// Maximum cloud-cover fraction accepted by the provider (satellite)
    pub max_cloud_cover: f64,
}

impl Default for AcquisitionParams {
    fn default() -> Self {
        Self {
            window_days: 30,
            max_cloud_cover: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationConfig {
    /// Search radius for neighbouring readings
    pub radius_km: f64,
    /// Accepted neighbours needed to synthesize a reading
    pub min_neighbors: usize,
    /// Synthesized quality is capped at this fraction of the best neighbour
    pub quality_cap_factor: f64,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            radius_km: 50.0,
            min_neighbors: 2,
            quality_cap_factor: 0.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    pub primary: AcquisitionParams,
    pub relaxed: AcquisitionParams,
    /// Timeout for one tier attempt
    pub tier_timeout_ms: u64,
    /// Deadline for a source kind's whole cascade
    pub cascade_timeout_ms: u64,
    pub interpolation: InterpolationConfig,
    /// Quality assigned to historical-baseline readings
    pub baseline_quality: f64,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            primary: AcquisitionParams::default(),
            relaxed: AcquisitionParams {
                window_days: 90,
                max_cloud_cover: 0.5,
            },
            tier_timeout_ms: 5_000,
            cascade_timeout_ms: 15_000,
            interpolation: InterpolationConfig::default(),
            baseline_quality: 0.5,
        }
    }
}

impl CascadeConfig {
    fn validate(&self) -> Result<(), EngineError> {
        for (name, params) in [("cascade.primary", &self.primary), ("cascade.relaxed", &self.relaxed)] {
            if params.window_days <= 0 {
                return Err(invalid(format!("{name}.window_days must be positive")));
            }
            check_unit(&format!("{name}.max_cloud_cover"), params.max_cloud_cover)?;
        }
        if self.relaxed.window_days < self.primary.window_days {
            return Err(invalid("cascade.relaxed window must not be narrower than primary"));
        }
        if self.tier_timeout_ms == 0 || self.cascade_timeout_ms == 0 {
            return Err(invalid("cascade timeouts must be positive"));
        }
        check_positive("cascade.interpolation.radius_km", self.interpolation.radius_km)?;
        if self.interpolation.min_neighbors == 0 {
            return Err(invalid("cascade.interpolation.min_neighbors must be at least 1"));
        }
        check_unit("cascade.interpolation.quality_cap_factor", self.interpolation.quality_cap_factor)?;
        check_unit("cascade.baseline_quality", self.baseline_quality)
    }
}

// ============================================================================
// Confidence
// ============================================================================

/// Multiplicative discount per provenance tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierDiscounts {
    pub primary: f64,
    pub relaxed: f64,
    pub interpolated: f64,
    pub historical_baseline: f64,
}

impl Default for TierDiscounts {
    fn default() -> Self {
        Self {
            primary: 1.0,
            relaxed: 0.85,
            interpolated: 0.6,
            historical_baseline: 0.4,
        }
    }
}

impl TierDiscounts {
    pub fn for_tier(&self, tier: ProvenanceTier) -> f64 {
        match tier {
            ProvenanceTier::Primary => self.primary,
            ProvenanceTier::Relaxed => self.relaxed,
            ProvenanceTier::Interpolated => self.interpolated,
            ProvenanceTier::HistoricalBaseline => self.historical_baseline,
            ProvenanceTier::Unavailable => 0.0,
        }
    }
}

/// Per-kind weight, used for confidence aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceWeights {
    pub satellite: f64,
    pub soil: f64,
    pub weather: f64,
    pub price: f64,
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self {
            satellite: 0.2,
            soil: 0.35,
            weather: 0.3,
            price: 0.15,
        }
    }
}

impl SourceWeights {
    pub fn for_kind(&self, kind: SourceKind) -> f64 {
        match kind {
            SourceKind::Satellite => self.satellite,
            SourceKind::Soil => self.soil,
            SourceKind::Weather => self.weather,
            SourceKind::Price => self.price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub tier_discounts: TierDiscounts,
    pub source_weights: SourceWeights,
    /// Cap for results built entirely from historical baselines
    pub baseline_ceiling: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            tier_discounts: TierDiscounts::default(),
            source_weights: SourceWeights::default(),
            baseline_ceiling: 0.5,
        }
    }
}

impl ConfidenceConfig {
    fn validate(&self) -> Result<(), EngineError> {
        let d = &self.tier_discounts;
        for (name, v) in [
            ("primary", d.primary),
            ("relaxed", d.relaxed),
            ("interpolated", d.interpolated),
            ("historical_baseline", d.historical_baseline),
        ] {
            check_unit(&format!("confidence.tier_discounts.{name}"), v)?;
        }
        if !(d.primary >= d.relaxed && d.relaxed >= d.interpolated && d.interpolated >= d.historical_baseline) {
            return Err(invalid("confidence.tier_discounts must not increase with tier depth"));
        }
        let w = &self.source_weights;
        check_weights(
            "confidence.source_weights",
            &[
                ("satellite", w.satellite),
                ("soil", w.soil),
                ("weather", w.weather),
                ("price", w.price),
            ],
        )?;
        check_unit("confidence.baseline_ceiling", self.baseline_ceiling)
    }
}

// ============================================================================
// Scoring
// ============================================================================

/// Relative agronomic importance of each suitability dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionWeights {
    pub zone_eligibility: f64,
    pub soil_ph: f64,
    pub temperature: f64,
    pub rainfall: f64,
    pub moisture: f64,
    pub vegetation: f64,
    pub market: f64,
}

impl Default for DimensionWeights {
    fn default() -> Self {
        Self {
            zone_eligibility: 0.30,
            soil_ph: 0.25,
            temperature: 0.15,
            rainfall: 0.10,
            moisture: 0.10,
            vegetation: 0.05,
            market: 0.05,
        }
    }
}

/// Distance beyond a tolerance band at which a dimension scores 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionMargins {
    pub soil_ph: f64,
    pub temperature_c: f64,
    pub rainfall_mm: f64,
    pub dry_days: f64,
    pub ndvi: f64,
    pub price_index: f64,
}

impl Default for DimensionMargins {
    fn default() -> Self {
        Self {
            soil_ph: 1.0,
            temperature_c: 6.0,
            rainfall_mm: 600.0,
            dry_days: 60.0,
            ndvi: 0.3,
            price_index: 0.5,
        }
    }
}

/// One value per variety water requirement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterDemand {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl WaterDemand {
    pub fn for_requirement(&self, requirement: WaterRequirement) -> f64 {
        match requirement {
            WaterRequirement::Low => self.low,
            WaterRequirement::Medium => self.medium,
            WaterRequirement::High => self.high,
        }
    }
}

/// Moisture availability against a variety's water requirement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoistureConfig {
    /// Annual rainfall below which the variety runs short of water
    pub min_rainfall_mm: WaterDemand,
    /// Drought-stress days tolerated without loss
    pub dry_days_tolerated: WaterDemand,
    /// Heat-stress days beyond which the stress penalty applies
    pub heat_stress_limit_days: f64,
    /// Drought-stress days beyond which the stress penalty applies
    pub drought_stress_limit_days: f64,
    /// Subtracted from the moisture score under extreme stress
    pub stress_penalty: f64,
}

impl Default for MoistureConfig {
    fn default() -> Self {
        Self {
            min_rainfall_mm: WaterDemand {
                low: 400.0,
                medium: 800.0,
                high: 1200.0,
            },
            dry_days_tolerated: WaterDemand {
                low: 150.0,
                medium: 90.0,
                high: 45.0,
            },
            heat_stress_limit_days: 60.0,
            drought_stress_limit_days: 180.0,
            stress_penalty: 0.25,
        }
    }
}

impl MoistureConfig {
    fn validate(&self) -> Result<(), EngineError> {
        for (name, demand) in [
            ("min_rainfall_mm", &self.min_rainfall_mm),
            ("dry_days_tolerated", &self.dry_days_tolerated),
        ] {
            for (level, v) in [("low", demand.low), ("medium", demand.medium), ("high", demand.high)] {
                if !v.is_finite() || v < 0.0 {
                    return Err(invalid(format!(
                        "scoring.moisture.{name}.{level} must be finite and non-negative, got {v}"
                    )));
                }
            }
        }
        check_positive("scoring.moisture.heat_stress_limit_days", self.heat_stress_limit_days)?;
        check_positive("scoring.moisture.drought_stress_limit_days", self.drought_stress_limit_days)?;
        check_unit("scoring.moisture.stress_penalty", self.stress_penalty)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: DimensionWeights,
    pub margins: DimensionMargins,
    pub moisture: MoistureConfig,
    /// NDVI band considered healthy vegetation
    pub vegetation_band: ToleranceRange,
    /// Price index band considered a favourable market
    pub market_band: ToleranceRange,
    /// Dimensions scoring below this are reported as limiting
    pub limiting_below: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: DimensionWeights::default(),
            margins: DimensionMargins::default(),
            moisture: MoistureConfig::default(),
            vegetation_band: ToleranceRange::new(0.4, 1.0),
            market_band: ToleranceRange::new(1.0, 3.0),
            limiting_below: 0.5,
        }
    }
}

impl ScoringConfig {
    fn validate(&self) -> Result<(), EngineError> {
        let w = &self.weights;
        check_weights(
            "scoring.weights",
            &[
                ("zone_eligibility", w.zone_eligibility),
                ("soil_ph", w.soil_ph),
                ("temperature", w.temperature),
                ("rainfall", w.rainfall),
                ("moisture", w.moisture),
                ("vegetation", w.vegetation),
                ("market", w.market),
            ],
        )?;
        let m = &self.margins;
        for (name, v) in [
            ("soil_ph", m.soil_ph),
            ("temperature_c", m.temperature_c),
            ("rainfall_mm", m.rainfall_mm),
            ("dry_days", m.dry_days),
            ("ndvi", m.ndvi),
            ("price_index", m.price_index),
        ] {
            check_positive(&format!("scoring.margins.{name}"), v)?;
        }
        self.moisture.validate()?;
        check_range("scoring.vegetation_band", &self.vegetation_band)?;
        check_range("scoring.market_band", &self.market_band)?;
        check_unit("scoring.limiting_below", self.limiting_below)
    }
}

// ============================================================================
// Zones
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// Nearest-centroid fallback is refused beyond this distance
    pub max_distance_km: f64,
    /// Coordinates outside this box never resolve
    pub national_bounds: BoundingBox,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            max_distance_km: 500.0,
            national_bounds: BoundingBox::new(6.0, 37.5, 68.0, 97.5),
        }
    }
}

impl ZoneConfig {
    fn validate(&self) -> Result<(), EngineError> {
        check_positive("zones.max_distance_km", self.max_distance_km)?;
        let b = &self.national_bounds;
        check_range("zones.national_bounds latitude", &ToleranceRange::new(b.lat_min, b.lat_max))?;
        check_range("zones.national_bounds longitude", &ToleranceRange::new(b.lon_min, b.lon_max))
    }
}

// ============================================================================
// Carbon
// ============================================================================

/// Additive carbon terms (t CO2e/ha/yr) for adopted practices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeTerms {
    pub agroforestry_integration: f64,
    pub residue_management: f64,
    pub cover_cropping: f64,
    pub reduced_tillage: f64,
    pub alternate_wetting_drying: f64,
}

impl Default for PracticeTerms {
    fn default() -> Self {
        Self {
            agroforestry_integration: 1.5,
            residue_management: 0.5,
            cover_cropping: 0.6,
            reduced_tillage: 0.4,
            alternate_wetting_drying: 0.8,
        }
    }
}

impl PracticeTerms {
    pub fn term(&self, practice: Practice) -> f64 {
        match practice {
            Practice::AgroforestryIntegration => self.agroforestry_integration,
            Practice::ResidueManagement => self.residue_management,
            Practice::CoverCropping => self.cover_cropping,
            Practice::ReducedTillage => self.reduced_tillage,
            Practice::AlternateWettingDrying => self.alternate_wetting_drying,
        }
    }
}

/// Weights and prices for the blended farm-level carbon scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub rice_share: f64,
    pub primary_crop_share: f64,
    pub secondary_crop_share: f64,
    pub agroforestry_share: f64,
    /// Fraction of sequestration convertible to credits
    pub credit_efficiency: f64,
    pub price_per_credit: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            rice_share: 0.4,
            primary_crop_share: 0.3,
            secondary_crop_share: 0.2,
            agroforestry_share: 0.1,
            credit_efficiency: 0.85,
            price_per_credit: 25.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarbonConfig {
    pub rice_bounds: ToleranceRange,
    pub crops_bounds: ToleranceRange,
    pub agroforestry_bounds: ToleranceRange,
    pub practices: PracticeTerms,
    /// Soil organic carbon (%) at which the SOC adjustment is zero
    pub soc_reference_pct: f64,
    /// Adjustment per SOC percentage point below the reference
    pub soc_adjustment_per_pct: f64,
    /// Absolute cap on the SOC adjustment
    pub soc_adjustment_cap: f64,
    pub scenario: ScenarioConfig,
}

impl Default for CarbonConfig {
    fn default() -> Self {
        Self {
            rice_bounds: ToleranceRange::new(2.0, 10.0),
            crops_bounds: ToleranceRange::new(2.0, 8.0),
            agroforestry_bounds: ToleranceRange::new(4.0, 15.0),
            practices: PracticeTerms::default(),
            soc_reference_pct: 1.5,
            soc_adjustment_per_pct: 0.4,
            soc_adjustment_cap: 1.0,
            scenario: ScenarioConfig::default(),
        }
    }
}

impl CarbonConfig {
    pub fn bounds(&self, category: VarietyCategory) -> ToleranceRange {
        match category {
            VarietyCategory::Rice => self.rice_bounds,
            VarietyCategory::Crops => self.crops_bounds,
            VarietyCategory::Agroforestry => self.agroforestry_bounds,
        }
    }

    fn validate(&self) -> Result<(), EngineError> {
        for category in VarietyCategory::ALL {
            let bounds = self.bounds(category);
            check_range(&format!("carbon.{}_bounds", category.as_str()), &bounds)?;
            if bounds.min < 0.0 {
                return Err(invalid(format!("carbon.{}_bounds must be non-negative", category.as_str())));
            }
        }
        let p = &self.practices;
        for (name, v) in [
            ("agroforestry_integration", p.agroforestry_integration),
            ("residue_management", p.residue_management),
            ("cover_cropping", p.cover_cropping),
            ("reduced_tillage", p.reduced_tillage),
            ("alternate_wetting_drying", p.alternate_wetting_drying),
        ] {
            if !v.is_finite() {
                return Err(invalid(format!("carbon.practices.{name} must be finite")));
            }
        }
        if !self.soc_reference_pct.is_finite()
            || !self.soc_adjustment_per_pct.is_finite()
            || !self.soc_adjustment_cap.is_finite()
            || self.soc_adjustment_cap < 0.0
        {
            return Err(invalid("carbon soil-carbon adjustment must be finite with a non-negative cap"));
        }
        let s = &self.scenario;
        check_weights(
            "carbon.scenario",
            &[
                ("rice_share", s.rice_share),
                ("primary_crop_share", s.primary_crop_share),
                ("secondary_crop_share", s.secondary_crop_share),
                ("agroforestry_share", s.agroforestry_share),
            ],
        )?;
        check_unit("carbon.scenario.credit_efficiency", s.credit_efficiency)?;
        if !s.price_per_credit.is_finite() || s.price_per_credit < 0.0 {
            return Err(invalid("carbon.scenario.price_per_credit must be non-negative"));
        }
        Ok(())
    }
}

// ============================================================================
// Ranking
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Results kept per category
    pub top_k: usize,
    /// Optional cap across all categories
    pub max_total: Option<usize>,
    /// Seat the best entry of every viable category before truncating
    pub diversity: bool,
    /// Results at or below this score are not eligible
    pub min_suitability: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_total: None,
            diversity: true,
            min_suitability: 0.0,
        }
    }
}

impl RankingConfig {
    fn validate(&self) -> Result<(), EngineError> {
        if self.top_k == 0 {
            return Err(invalid("ranking.top_k must be at least 1"));
        }
        if self.max_total == Some(0) {
            return Err(invalid("ranking.max_total must be at least 1 when set"));
        }
        check_unit("ranking.min_suitability", self.min_suitability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "quality": { "threshold": 0.7 }, "ranking": { "top_k": 3 } }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.quality.threshold, 0.7);
        assert_eq!(config.quality.satellite.cloud_free_fraction, 0.3);
        assert_eq!(config.ranking.top_k, 3);
        assert_eq!(config.confidence.baseline_ceiling, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = EngineConfig::default();
        config.scoring.weights.soil_ph = -0.1;
        assert!(matches!(config.validate(), Err(EngineError::Configuration(_))));
    }

    #[test]
    fn test_zero_weight_sum_rejected() {
        let mut config = EngineConfig::default();
        config.quality.soil = SoilWeights {
            depth_coverage: 0.0,
            uncertainty: 0.0,
            property_completeness: 0.0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_monotone_discounts_rejected() {
        let mut config = EngineConfig::default();
        config.confidence.tier_discounts.interpolated = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_carbon_bounds_rejected() {
        let mut config = EngineConfig::default();
        config.carbon.rice_bounds = ToleranceRange::new(10.0, 2.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_threshold_outside_unit_rejected() {
        let mut config = EngineConfig::default();
        config.quality.threshold = 1.2;
        assert!(config.validate().is_err());
        let mut config = EngineConfig::default();
        config.ranking.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_moisture_settings_validated() {
        let m = MoistureConfig::default();
        assert_eq!(m.dry_days_tolerated.for_requirement(WaterRequirement::High), 45.0);
        assert_eq!(m.min_rainfall_mm.for_requirement(WaterRequirement::Low), 400.0);

        let mut config = EngineConfig::default();
        config.scoring.moisture.stress_penalty = 1.5;
        assert!(config.validate().is_err());
        let mut config = EngineConfig::default();
        config.scoring.moisture.dry_days_tolerated.medium = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_discount_lookup() {
        let d = TierDiscounts::default();
        assert_eq!(d.for_tier(ProvenanceTier::Relaxed), 0.85);
        assert_eq!(d.for_tier(ProvenanceTier::Unavailable), 0.0);
    }
}
