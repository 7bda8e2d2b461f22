//! Variety reference records

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

use crate::model::ToleranceRange;

/// Recommendation category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarietyCategory {
    Rice,
    Crops,
    Agroforestry,
}

impl VarietyCategory {
    pub const ALL: [VarietyCategory; 3] = [
        VarietyCategory::Rice,
        VarietyCategory::Crops,
        VarietyCategory::Agroforestry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VarietyCategory::Rice => "rice",
            VarietyCategory::Crops => "crops",
            VarietyCategory::Agroforestry => "agroforestry",
        }
    }
}

impl fmt::Display for VarietyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaterRequirement {
    Low,
    Medium,
    High,
}

/// Market standing of a variety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketValue {
    Good,
    High,
    Premium,
}

/// Variety as stored in the reference file.
///
/// Tolerance ranges are optional; missing ones are derived from the zone
/// table and soil preference when the database is built.
#[derive(Debug, Clone, Deserialize)]
pub struct VarietyEntry {
    pub id: String,
    pub name: String,
    pub category: VarietyCategory,
    pub zones: Vec<String>,
    pub soil_preference: String,
    pub water_requirement: WaterRequirement,
    pub market_value: MarketValue,
    /// Base sequestration range (t CO2e/ha/yr) as `[low, high]`
    pub carbon_potential: [f64; 2],
    #[serde(default)]
    pub ph_range: Option<ToleranceRange>,
    #[serde(default)]
    pub rainfall_range_mm: Option<ToleranceRange>,
    #[serde(default)]
    pub temp_range_c: Option<ToleranceRange>,
}

/// Immutable variety reference record with resolved tolerances
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarietyRecord {
    pub id: String,
    pub name: String,
    pub category: VarietyCategory,
    /// Eligible zone ids
    pub zones: SmallVec<[String; 2]>,
    pub soil_preference: String,
    pub water_requirement: WaterRequirement,
    pub market_value: MarketValue,
    pub ph_range: ToleranceRange,
    pub rainfall_range_mm: ToleranceRange,
    pub temp_range_c: ToleranceRange,
    pub carbon_potential: ToleranceRange,
}

impl VarietyRecord {
    pub fn is_eligible_in(&self, zone_id: &str) -> bool {
        self.zones.iter().any(|z| z == zone_id)
    }

    /// Midpoint of the declared carbon range
    pub fn base_carbon(&self) -> f64 {
        self.carbon_potential.midpoint()
    }
}

/// pH tolerance implied by a soil preference label
pub fn ph_range_for(category: VarietyCategory, soil_preference: &str) -> ToleranceRange {
    if category == VarietyCategory::Agroforestry {
        return ToleranceRange::new(6.0, 8.0);
    }
    let pref = soil_preference.to_ascii_lowercase();
    if pref.contains("acidic") {
        ToleranceRange::new(5.5, 6.5)
    } else if pref.contains("alkaline") || pref.contains("saline") {
        ToleranceRange::new(7.5, 8.5)
    } else if pref.contains("neutral") {
        ToleranceRange::new(6.5, 7.5)
    } else {
        ToleranceRange::new(6.0, 7.5)
    }
}
