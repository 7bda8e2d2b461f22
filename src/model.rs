//! Core data model
//!
//! Coordinates, source kinds, provenance tiers and the per-kind payload and
//! quality-vector shapes. Each source kind carries its own fixed factor set
//! so that quality weighting stays exhaustive at compile time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::varieties::VarietyCategory;

// ============================================================================
// Coordinates
// ============================================================================

/// Decimal-degree coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Finite and on the globe
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Closed interval used for tolerances, climate ranges and bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceRange {
    pub min: f64,
    pub max: f64,
}

impl ToleranceRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    pub fn is_well_formed(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

// ============================================================================
// Source kinds and provenance tiers
// ============================================================================

/// Independent data feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Satellite,
    Soil,
    Weather,
    Price,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Satellite,
        SourceKind::Soil,
        SourceKind::Weather,
        SourceKind::Price,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Satellite => "satellite",
            SourceKind::Soil => "soil",
            SourceKind::Weather => "weather",
            SourceKind::Price => "price",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fallback level that produced a reading.
///
/// Declaration order is cascade order: a greater tier is a later, lower
/// confidence tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProvenanceTier {
    Primary,
    Relaxed,
    Interpolated,
    HistoricalBaseline,
    Unavailable,
}

impl ProvenanceTier {
    /// Tiers that can produce a reading, in cascade order
    pub const PRODUCING: [ProvenanceTier; 4] = [
        ProvenanceTier::Primary,
        ProvenanceTier::Relaxed,
        ProvenanceTier::Interpolated,
        ProvenanceTier::HistoricalBaseline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProvenanceTier::Primary => "PRIMARY",
            ProvenanceTier::Relaxed => "RELAXED",
            ProvenanceTier::Interpolated => "INTERPOLATED",
            ProvenanceTier::HistoricalBaseline => "HISTORICAL_BASELINE",
            ProvenanceTier::Unavailable => "UNAVAILABLE",
        }
    }

    /// The tier the cascade moves to when this one is rejected
    pub fn next(&self) -> Option<ProvenanceTier> {
        match self {
            ProvenanceTier::Primary => Some(ProvenanceTier::Relaxed),
            ProvenanceTier::Relaxed => Some(ProvenanceTier::Interpolated),
            ProvenanceTier::Interpolated => Some(ProvenanceTier::HistoricalBaseline),
            ProvenanceTier::HistoricalBaseline => Some(ProvenanceTier::Unavailable),
            ProvenanceTier::Unavailable => None,
        }
    }

    /// Directly observed (fetched from the provider rather than synthesized)
    pub fn is_observed(&self) -> bool {
        matches!(self, ProvenanceTier::Primary | ProvenanceTier::Relaxed)
    }
}

impl fmt::Display for ProvenanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Time windows
// ============================================================================

/// Observation window requested from a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Window of `days` ending at `end`
    pub fn ending_at(end: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: end - Duration::days(days.max(0)),
            end,
        }
    }

    /// Same end, start pushed back to cover `days`
    pub fn widened_to(&self, days: i64) -> Self {
        let widened = TimeWindow::ending_at(self.end, days);
        if widened.start < self.start {
            widened
        } else {
            *self
        }
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

// ============================================================================
// Quality vectors (raw, per kind)
// ============================================================================

/// Satellite acquisition quality factors, each normalized to [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SatelliteQuality {
    pub cloud_free_fraction: Option<f64>,
    pub valid_pixel_density: Option<f64>,
    pub temporal_consistency: Option<f64>,
    pub spatial_completeness: Option<f64>,
}

/// Soil survey quality factors
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SoilQuality {
    /// Fraction of requested depth layers present
    pub depth_coverage: Option<f64>,
    /// Stated prediction uncertainty (0 = certain, 1 = no information)
    pub uncertainty: Option<f64>,
    /// Fraction of requested properties present
    pub property_completeness: Option<f64>,
}

/// Weather record quality factors
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherQuality {
    /// Fraction of days in the window with a record
    pub temporal_completeness: Option<f64>,
    /// Agreement between neighbouring stations/models
    pub station_agreement: Option<f64>,
    /// 1.0 for data ending at the window end, decaying with lag
    pub recency: Option<f64>,
}

/// Market price quality factors
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceQuality {
    /// Deviation from historical bounds (0 = inside, 1 = far outside)
    pub historical_deviation: Option<f64>,
    /// Fraction of reference markets reporting
    pub market_coverage: Option<f64>,
    pub recency: Option<f64>,
}

/// Raw quality vector, tagged by source kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QualityVector {
    Satellite(SatelliteQuality),
    Soil(SoilQuality),
    Weather(WeatherQuality),
    Price(PriceQuality),
}

impl QualityVector {
    pub fn kind(&self) -> SourceKind {
        match self {
            QualityVector::Satellite(_) => SourceKind::Satellite,
            QualityVector::Soil(_) => SourceKind::Soil,
            QualityVector::Weather(_) => SourceKind::Weather,
            QualityVector::Price(_) => SourceKind::Price,
        }
    }
}

// ============================================================================
// Payloads (per kind)
// ============================================================================

/// Vegetation indices
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SatellitePayload {
    pub ndvi: f64,
    pub evi: f64,
    pub lai: f64,
}

/// Topsoil properties
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilPayload {
    /// pH in water. Providers sometimes report pH x 10 or pH x 100;
    /// use [`crate::quality::normalize_ph`] before comparing.
    pub ph: f64,
    pub clay_pct: f64,
    pub sand_pct: f64,
    pub silt_pct: f64,
    /// Soil organic carbon (%)
    pub soc_pct: f64,
    /// Cation exchange capacity (mmol/kg as delivered by the soil grid)
    pub cec: f64,
}

/// Seasonal weather aggregates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherPayload {
    pub annual_rainfall_mm: f64,
    pub mean_temp_c: f64,
    pub mean_humidity_pct: f64,
    pub heat_stress_days: f64,
    pub drought_stress_days: f64,
}

/// Price index per category, relative to the historical mean (1.0 = average)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePayload {
    pub rice_index: f64,
    pub crops_index: f64,
    pub agroforestry_index: f64,
}

impl PricePayload {
    pub fn index_for(&self, category: VarietyCategory) -> f64 {
        match category {
            VarietyCategory::Rice => self.rice_index,
            VarietyCategory::Crops => self.crops_index,
            VarietyCategory::Agroforestry => self.agroforestry_index,
        }
    }
}

/// Observation payload, tagged by source kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourcePayload {
    Satellite(SatellitePayload),
    Soil(SoilPayload),
    Weather(WeatherPayload),
    Price(PricePayload),
}

impl SourcePayload {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourcePayload::Satellite(_) => SourceKind::Satellite,
            SourcePayload::Soil(_) => SourceKind::Soil,
            SourcePayload::Weather(_) => SourceKind::Weather,
            SourcePayload::Price(_) => SourceKind::Price,
        }
    }

    /// Weighted mean of same-kind payloads.
    ///
    /// Returns None when the list is empty, weights sum to zero, or kinds
    /// are mixed.
    pub fn weighted_mean(items: &[(SourcePayload, f64)]) -> Option<SourcePayload> {
        let (first, _) = items.first()?;
        let kind = first.kind();
        if items.iter().any(|(p, _)| p.kind() != kind) {
            return None;
        }
        let total: f64 = items.iter().map(|(_, w)| w.max(0.0)).sum();
        if total <= 0.0 || !total.is_finite() {
            return None;
        }

        // Blend field-by-field through a flat vector view
        let mut acc = vec![0.0; first.fields().len()];
        for (payload, weight) in items {
            let w = weight.max(0.0) / total;
            for (slot, value) in acc.iter_mut().zip(payload.fields()) {
                *slot += w * value;
            }
        }
        Some(first.with_fields(&acc))
    }

    fn fields(&self) -> Vec<f64> {
        match self {
            SourcePayload::Satellite(p) => vec![p.ndvi, p.evi, p.lai],
            SourcePayload::Soil(p) => vec![p.ph, p.clay_pct, p.sand_pct, p.silt_pct, p.soc_pct, p.cec],
            SourcePayload::Weather(p) => vec![
                p.annual_rainfall_mm,
                p.mean_temp_c,
                p.mean_humidity_pct,
                p.heat_stress_days,
                p.drought_stress_days,
            ],
            SourcePayload::Price(p) => vec![p.rice_index, p.crops_index, p.agroforestry_index],
        }
    }

    fn with_fields(&self, f: &[f64]) -> SourcePayload {
        match self {
            SourcePayload::Satellite(_) => SourcePayload::Satellite(SatellitePayload {
                ndvi: f[0],
                evi: f[1],
                lai: f[2],
            }),
            SourcePayload::Soil(_) => SourcePayload::Soil(SoilPayload {
                ph: f[0],
                clay_pct: f[1],
                sand_pct: f[2],
                silt_pct: f[3],
                soc_pct: f[4],
                cec: f[5],
            }),
            SourcePayload::Weather(_) => SourcePayload::Weather(WeatherPayload {
                annual_rainfall_mm: f[0],
                mean_temp_c: f[1],
                mean_humidity_pct: f[2],
                heat_stress_days: f[3],
                drought_stress_days: f[4],
            }),
            SourcePayload::Price(_) => SourcePayload::Price(PricePayload {
                rice_index: f[0],
                crops_index: f[1],
                agroforestry_index: f[2],
            }),
        }
    }
}

// ============================================================================
// Readings
// ============================================================================

/// One raw observation as delivered by a provider, before assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub payload: SourcePayload,
    pub quality: QualityVector,
    pub observed_at: DateTime<Utc>,
}

/// An assessed observation, stamped with the tier that produced it.
///
/// Never mutated; a deeper tier produces a new reading instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReading {
    pub kind: SourceKind,
    pub payload: SourcePayload,
    pub raw_quality: Option<QualityVector>,
    pub observed_at: DateTime<Utc>,
    pub tier: ProvenanceTier,
    /// Assessed quality score in [0, 1]
    pub quality: f64,
}

impl SourceReading {
    pub fn satellite(&self) -> Option<&SatellitePayload> {
        match &self.payload {
            SourcePayload::Satellite(p) => Some(p),
            _ => None,
        }
    }

    pub fn soil(&self) -> Option<&SoilPayload> {
        match &self.payload {
            SourcePayload::Soil(p) => Some(p),
            _ => None,
        }
    }

    pub fn weather(&self) -> Option<&WeatherPayload> {
        match &self.payload {
            SourcePayload::Weather(p) => Some(p),
            _ => None,
        }
    }

    pub fn price(&self) -> Option<&PricePayload> {
        match &self.payload {
            SourcePayload::Price(p) => Some(p),
            _ => None,
        }
    }
}
