//! Soil and vegetation descriptors
//!
//! Categorical summaries derived from accepted soil and satellite payloads:
//! pH status, texture class, nutrient status and vegetation health. They are
//! reported alongside the farm profile; scoring uses the numeric values.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::{SatellitePayload, SoilPayload};

/// Repair a provider pH value.
///
/// Soil grids often deliver pH x 10 (e.g. 65 for 6.5), occasionally pH x 100.
/// Non-positive or non-finite values are treated as missing, never as
/// neutral.
pub fn normalize_ph(raw: f64) -> Option<f64> {
    if !raw.is_finite() || raw <= 0.0 {
        return None;
    }
    let ph = if raw > 100.0 {
        raw / 100.0
    } else if raw > 14.0 {
        raw / 10.0
    } else {
        raw
    };
    if ph > 14.0 {
        warn!(raw, "pH value outside any known scale");
        return None;
    }
    Some(ph)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhStatus {
    VeryAcidic,
    Acidic,
    SlightlyAcidic,
    Neutral,
    SlightlyAlkaline,
    Alkaline,
    VeryAlkaline,
}

impl PhStatus {
    pub fn from_ph(ph: f64) -> Self {
        if ph < 5.5 {
            PhStatus::VeryAcidic
        } else if ph < 6.0 {
            PhStatus::Acidic
        } else if ph < 6.8 {
            PhStatus::SlightlyAcidic
        } else if ph <= 7.2 {
            PhStatus::Neutral
        } else if ph <= 7.8 {
            PhStatus::SlightlyAlkaline
        } else if ph <= 8.5 {
            PhStatus::Alkaline
        } else {
            PhStatus::VeryAlkaline
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PhStatus::VeryAcidic => "Very Acidic",
            PhStatus::Acidic => "Acidic",
            PhStatus::SlightlyAcidic => "Slightly Acidic",
            PhStatus::Neutral => "Neutral",
            PhStatus::SlightlyAlkaline => "Slightly Alkaline",
            PhStatus::Alkaline => "Alkaline",
            PhStatus::VeryAlkaline => "Very Alkaline",
        }
    }
}

/// USDA texture class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureClass {
    Sand,
    LoamySand,
    SandyLoam,
    Loam,
    SiltLoam,
    Silt,
    SandyClayLoam,
    ClayLoam,
    SiltyClayLoam,
    SandyClay,
    SiltyClay,
    Clay,
}

impl TextureClass {
    /// Classify clay/sand/silt percentages. Fractions are renormalized to
    /// sum to 100 first; returns None when all three are zero.
    pub fn classify(clay: f64, sand: f64, silt: f64) -> Option<Self> {
        let total = clay + sand + silt;
        if !total.is_finite() || total <= 0.0 {
            return None;
        }
        let clay = clay / total * 100.0;
        let sand = sand / total * 100.0;
        let silt = silt / total * 100.0;

        let class = if sand >= 85.0 {
            TextureClass::Sand
        } else if sand >= 70.0 && clay <= 15.0 {
            TextureClass::LoamySand
        } else if (sand >= 43.0 && clay <= 7.0) || (sand >= 52.0 && (7.0..=20.0).contains(&clay)) {
            TextureClass::SandyLoam
        } else if (7.0..=27.0).contains(&clay) && (28.0..=50.0).contains(&silt) && sand <= 52.0 {
            TextureClass::Loam
        } else if silt >= 50.0 && (12.0..=27.0).contains(&clay) {
            TextureClass::SiltLoam
        } else if silt >= 80.0 && clay <= 12.0 {
            TextureClass::Silt
        } else if (20.0..=35.0).contains(&clay) && silt <= 28.0 && sand >= 45.0 {
            TextureClass::SandyClayLoam
        } else if (27.0..=40.0).contains(&clay) && (20.0..=45.0).contains(&sand) {
            TextureClass::ClayLoam
        } else if (27.0..=40.0).contains(&clay) && sand <= 20.0 {
            TextureClass::SiltyClayLoam
        } else if clay >= 35.0 && sand >= 45.0 {
            TextureClass::SandyClay
        } else if clay >= 40.0 && silt >= 40.0 {
            TextureClass::SiltyClay
        } else if clay >= 40.0 {
            TextureClass::Clay
        } else {
            TextureClass::Loam
        };
        Some(class)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TextureClass::Sand => "Sand",
            TextureClass::LoamySand => "Loamy Sand",
            TextureClass::SandyLoam => "Sandy Loam",
            TextureClass::Loam => "Loam",
            TextureClass::SiltLoam => "Silt Loam",
            TextureClass::Silt => "Silt",
            TextureClass::SandyClayLoam => "Sandy Clay Loam",
            TextureClass::ClayLoam => "Clay Loam",
            TextureClass::SiltyClayLoam => "Silty Clay Loam",
            TextureClass::SandyClay => "Sandy Clay",
            TextureClass::SiltyClay => "Silty Clay",
            TextureClass::Clay => "Clay",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NutrientStatus {
    Excellent,
    Good,
    Moderate,
    Poor,
    Variable,
}

impl NutrientStatus {
    /// From soil organic carbon (%) and CEC (mmol/kg)
    pub fn from_soc_cec(soc_pct: f64, cec: f64) -> Self {
        let soc_high = soc_pct >= 3.0;
        let soc_medium = (1.0..3.0).contains(&soc_pct);
        let cec_high = cec >= 250.0;
        let cec_medium = (100.0..250.0).contains(&cec);

        if soc_high && cec_high {
            NutrientStatus::Excellent
        } else if (soc_high && cec_medium) || (soc_medium && cec_high) {
            NutrientStatus::Good
        } else if soc_medium && cec_medium {
            NutrientStatus::Moderate
        } else if soc_pct < 1.0 || cec < 100.0 {
            NutrientStatus::Poor
        } else {
            NutrientStatus::Variable
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VegetationHealth {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl VegetationHealth {
    pub fn from_ndvi(ndvi: f64) -> Self {
        if ndvi > 0.6 {
            VegetationHealth::Excellent
        } else if ndvi > 0.4 {
            VegetationHealth::Good
        } else if ndvi > 0.2 {
            VegetationHealth::Fair
        } else {
            VegetationHealth::Poor
        }
    }
}

/// Soil summary for the farm profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilDescriptors {
    /// Repaired pH, None when the provider value was unusable
    pub ph: Option<f64>,
    pub ph_status: Option<PhStatus>,
    pub texture: Option<TextureClass>,
    pub nutrient_status: NutrientStatus,
}

impl SoilDescriptors {
    pub fn from_payload(soil: &SoilPayload) -> Self {
        let ph = normalize_ph(soil.ph);
        Self {
            ph,
            ph_status: ph.map(PhStatus::from_ph),
            texture: TextureClass::classify(soil.clay_pct, soil.sand_pct, soil.silt_pct),
            nutrient_status: NutrientStatus::from_soc_cec(soil.soc_pct, soil.cec),
        }
    }
}

pub fn vegetation_health(satellite: &SatellitePayload) -> VegetationHealth {
    VegetationHealth::from_ndvi(satellite.ndvi)
}
