//! Suitability Scorer
//!
//! Scores one variety against one fused farm profile across seven dimensions:
//!
//! | Dimension        | Source    | Default weight |
//! |------------------|-----------|----------------|
//! | Zone eligibility | zone      | 0.30           |
//! | Soil pH          | soil      | 0.25           |
//! | Temperature      | weather   | 0.15           |
//! | Rainfall         | weather   | 0.10           |
//! | Moisture         | weather   | 0.10           |
//! | Vegetation vigour| satellite | 0.05           |
//! | Market outlook   | price     | 0.05           |
//!
//! Moisture availability weighs rainfall shortfall and drought-stress days
//! against the variety's water requirement. Extreme heat or drought stress
//! costs a further penalty.
//!
//! Zone eligibility is a hard constraint: an ineligible variety scores 0.
//! A dimension whose source has no accepted reading is excluded and the
//! remaining weights renormalized; the result is flagged reduced-certainty.

use serde::Serialize;

use super::comparator::{compare_to_band, BandComparison};
use crate::config::ScoringConfig;
use crate::model::{SourceKind, ToleranceRange, WeatherPayload};
use crate::profile::FarmProfile;
use crate::varieties::{VarietyRecord, WaterRequirement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    ZoneEligibility,
    SoilPh,
    Temperature,
    Rainfall,
    Moisture,
    Vegetation,
    Market,
}

impl Dimension {
    pub const ALL: [Dimension; 7] = [
        Dimension::ZoneEligibility,
        Dimension::SoilPh,
        Dimension::Temperature,
        Dimension::Rainfall,
        Dimension::Moisture,
        Dimension::Vegetation,
        Dimension::Market,
    ];

    /// Source kind feeding this dimension; None for zone eligibility
    pub fn source(&self) -> Option<SourceKind> {
        match self {
            Dimension::ZoneEligibility => None,
            Dimension::SoilPh => Some(SourceKind::Soil),
            Dimension::Temperature | Dimension::Rainfall | Dimension::Moisture => {
                Some(SourceKind::Weather)
            }
            Dimension::Vegetation => Some(SourceKind::Satellite),
            Dimension::Market => Some(SourceKind::Price),
        }
    }

    pub fn weight(&self, config: &ScoringConfig) -> f64 {
        let w = &config.weights;
        match self {
            Dimension::ZoneEligibility => w.zone_eligibility,
            Dimension::SoilPh => w.soil_ph,
            Dimension::Temperature => w.temperature,
            Dimension::Rainfall => w.rainfall,
            Dimension::Moisture => w.moisture,
            Dimension::Vegetation => w.vegetation,
            Dimension::Market => w.market,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Dimension::ZoneEligibility => "zone eligibility",
            Dimension::SoilPh => "soil pH",
            Dimension::Temperature => "temperature",
            Dimension::Rainfall => "rainfall",
            Dimension::Moisture => "moisture availability",
            Dimension::Vegetation => "vegetation vigour",
            Dimension::Market => "market outlook",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionScore {
    pub dimension: Dimension,
    pub score: f64,
    pub weight: f64,
    /// Band comparison for banded dimensions
    pub comparison: Option<BandComparison>,
}

/// Numeric part of a suitability result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuitabilityScore {
    /// Weighted score in [0, 1]; 0 when the zone is ineligible
    pub score: f64,
    pub eligible: bool,
    pub dimensions: Vec<DimensionScore>,
    pub excluded: Vec<Dimension>,
    /// Weight share of the excluded dimensions, in [0, 1]
    pub excluded_weight_fraction: f64,
    pub reduced_certainty: bool,
    pub contributing: Vec<String>,
    pub limiting: Vec<String>,
}

impl SuitabilityScore {
    /// Source kinds behind the dimensions that were actually scored
    pub fn contributing_sources(&self) -> Vec<SourceKind> {
        let mut kinds: Vec<SourceKind> = self
            .dimensions
            .iter()
            .filter_map(|d| d.dimension.source())
            .collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }
}

#[derive(Debug, Clone)]
pub struct SuitabilityScorer {
    config: ScoringConfig,
}

impl SuitabilityScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, profile: &FarmProfile, variety: &VarietyRecord) -> SuitabilityScore {
        let eligible = variety.is_eligible_in(&profile.zone.id);
        let total_weight: f64 = Dimension::ALL.iter().map(|d| d.weight(&self.config)).sum();

        let mut dimensions = Vec::with_capacity(Dimension::ALL.len());
        let mut excluded = Vec::new();
        for dimension in Dimension::ALL {
            let weight = dimension.weight(&self.config);
            match self.evaluate(dimension, profile, variety, eligible) {
                Some((score, comparison)) => dimensions.push(DimensionScore {
                    dimension,
                    score,
                    weight,
                    comparison,
                }),
                None => excluded.push(dimension),
            }
        }

        let used_weight: f64 = dimensions.iter().map(|d| d.weight).sum();
        let weighted = if eligible && used_weight > 0.0 {
            dimensions.iter().map(|d| d.score * d.weight).sum::<f64>() / used_weight
        } else {
            0.0
        };
        let excluded_weight_fraction = if total_weight > 0.0 {
            ((total_weight - used_weight) / total_weight).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let mut contributing = Vec::new();
        let mut limiting = Vec::new();
        for d in &dimensions {
            let label = match (&d.comparison, d.dimension) {
                (Some(c), Dimension::SoilPh) => c.format_with_context("soil pH", ""),
                (Some(c), Dimension::Temperature) => c.format_with_context("mean temperature", " C"),
                (Some(c), Dimension::Rainfall) => c.format_with_context("annual rainfall", " mm"),
                (Some(c), Dimension::Moisture) => c.format_with_context("drought-stress days", ""),
                (Some(c), Dimension::Vegetation) => c.format_with_context("NDVI", ""),
                (Some(c), Dimension::Market) => c.format_with_context("price index", ""),
                _ if eligible => format!("eligible in {}", profile.zone.name),
                _ => format!("not grown in {}", profile.zone.name),
            };
            if d.score < self.config.limiting_below {
                limiting.push(label);
            } else {
                contributing.push(label);
            }
        }

        SuitabilityScore {
            score: weighted.clamp(0.0, 1.0),
            eligible,
            reduced_certainty: !excluded.is_empty(),
            dimensions,
            excluded,
            excluded_weight_fraction,
            contributing,
            limiting,
        }
    }

    /// Score one dimension, or None when its data is missing
    fn evaluate(
        &self,
        dimension: Dimension,
        profile: &FarmProfile,
        variety: &VarietyRecord,
        eligible: bool,
    ) -> Option<(f64, Option<BandComparison>)> {
        let margins = &self.config.margins;
        let banded = |value: f64, band: ToleranceRange, margin: f64| -> Option<(f64, Option<BandComparison>)> {
            if !value.is_finite() {
                return None;
            }
            let c = compare_to_band(value, band, margin);
            Some((c.score, Some(c)))
        };

        match dimension {
            Dimension::ZoneEligibility => Some((if eligible { 1.0 } else { 0.0 }, None)),
            Dimension::SoilPh => {
                let ph = profile.soil_ph()?;
                banded(ph, variety.ph_range, margins.soil_ph)
            }
            Dimension::Temperature => {
                let weather = profile.reading(SourceKind::Weather)?.weather()?;
                banded(weather.mean_temp_c, variety.temp_range_c, margins.temperature_c)
            }
            Dimension::Rainfall => {
                let weather = profile.reading(SourceKind::Weather)?.weather()?;
                banded(weather.annual_rainfall_mm, variety.rainfall_range_mm, margins.rainfall_mm)
            }
            Dimension::Moisture => {
                let weather = profile.reading(SourceKind::Weather)?.weather()?;
                self.moisture(weather, variety.water_requirement)
            }
            Dimension::Vegetation => {
                let satellite = profile.reading(SourceKind::Satellite)?.satellite()?;
                banded(satellite.ndvi, self.config.vegetation_band, margins.ndvi)
            }
            Dimension::Market => {
                let price = profile.reading(SourceKind::Price)?.price()?;
                banded(price.index_for(variety.category), self.config.market_band, margins.price_index)
            }
        }
    }

    /// Dry spells against the tolerated days, capped by any rainfall
    /// shortfall, less the stress penalty when heat or drought is extreme
    fn moisture(
        &self,
        weather: &WeatherPayload,
        requirement: WaterRequirement,
    ) -> Option<(f64, Option<BandComparison>)> {
        let m = &self.config.moisture;
        let margins = &self.config.margins;
        if !weather.drought_stress_days.is_finite() || !weather.annual_rainfall_mm.is_finite() {
            return None;
        }

        let tolerated = ToleranceRange::new(0.0, m.dry_days_tolerated.for_requirement(requirement));
        let dry = compare_to_band(weather.drought_stress_days, tolerated, margins.dry_days);
        let shortfall = (m.min_rainfall_mm.for_requirement(requirement) - weather.annual_rainfall_mm).max(0.0);
        let rain = (1.0 - shortfall / margins.rainfall_mm).clamp(0.0, 1.0);

        let stressed = weather.heat_stress_days > m.heat_stress_limit_days
            || weather.drought_stress_days > m.drought_stress_limit_days;
        let penalty = if stressed { m.stress_penalty } else { 0.0 };
        Some(((dry.score.min(rain) - penalty).max(0.0), Some(dry)))
    }
}
