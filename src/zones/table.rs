//! Zone Reference Table
//!
//! The 15 agro-climatic zones, with their boundary boxes, centroids and
//! characteristic climate descriptors. Loaded once at startup; read-only
//! afterwards.

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::EngineError;
use crate::model::{Coordinate, ToleranceRange};

/// Broad climate regime of a zone.
///
/// Drives the carbon climate multiplier and the temperature tolerance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClimateRegime {
    /// Year-round warmth, heavy monsoon (West Coast, Islands)
    HumidTropical,
    /// Hot summers, wet monsoon, mild winters (Gangetic plains)
    HumidSubtropical,
    /// Moderate rainfall, distinct dry season (plateaus, east coast)
    SubHumid,
    /// Low, erratic rainfall (Gujarat, Trans-Gangetic)
    SemiArid,
    /// Desert margins (Western Dry)
    Arid,
    /// Cool highland climates (Himalayan zones)
    Temperate,
}

impl ClimateRegime {
    /// Default multiplier on variety base carbon potential
    pub fn carbon_multiplier(&self) -> f64 {
        match self {
            ClimateRegime::HumidTropical => 1.15,
            ClimateRegime::HumidSubtropical => 1.05,
            ClimateRegime::SubHumid => 1.0,
            ClimateRegime::SemiArid => 0.9,
            ClimateRegime::Arid => 0.8,
            ClimateRegime::Temperate => 0.95,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ClimateRegime::HumidTropical => "Humid tropical",
            ClimateRegime::HumidSubtropical => "Humid subtropical",
            ClimateRegime::SubHumid => "Sub-humid",
            ClimateRegime::SemiArid => "Semi-arid",
            ClimateRegime::Arid => "Arid",
            ClimateRegime::Temperate => "Temperate",
        }
    }
}

/// Latitude/longitude box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    pub const fn new(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Self {
        Self { lat_min, lat_max, lon_min, lon_max }
    }

    pub fn contains(&self, c: &Coordinate) -> bool {
        self.lat_min <= c.latitude
            && c.latitude <= self.lat_max
            && self.lon_min <= c.longitude
            && c.longitude <= self.lon_max
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.lat_min + self.lat_max) / 2.0,
            (self.lon_min + self.lon_max) / 2.0,
        )
    }

    fn is_well_formed(&self) -> bool {
        [self.lat_min, self.lat_max, self.lon_min, self.lon_max]
            .iter()
            .all(|v| v.is_finite())
            && self.lat_min < self.lat_max
            && self.lon_min < self.lon_max
    }
}

/// Agro-climatic zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub number: u8,
    pub name: String,
    /// One or more boxes; a coordinate inside any of them is inside the zone
    pub boundary: Vec<BoundingBox>,
    pub centroid: Coordinate,
    pub climate: ClimateRegime,
    pub rainfall_range_mm: ToleranceRange,
    pub temp_range_c: ToleranceRange,
    pub elevation: String,
    pub states: Vec<String>,
    /// Overrides the regime default when set
    #[serde(default)]
    pub carbon_multiplier: Option<f64>,
}

impl Zone {
    pub fn contains(&self, c: &Coordinate) -> bool {
        self.boundary.iter().any(|b| b.contains(c))
    }

    pub fn carbon_multiplier(&self) -> f64 {
        self.carbon_multiplier
            .unwrap_or_else(|| self.climate.carbon_multiplier())
    }
}

/// Immutable zone table with id lookup
#[derive(Debug, Clone)]
pub struct ZoneTable {
    zones: Vec<Zone>,
    index: FxHashMap<String, usize>,
}

impl ZoneTable {
    /// Build and validate a table
    pub fn from_zones(zones: Vec<Zone>) -> Result<Self, EngineError> {
        if zones.is_empty() {
            return Err(EngineError::Configuration("zone table is empty".into()));
        }
        let mut index = FxHashMap::default();
        for (i, zone) in zones.iter().enumerate() {
            if zone.boundary.is_empty() || !zone.boundary.iter().all(BoundingBox::is_well_formed) {
                return Err(EngineError::Configuration(format!(
                    "zone {} has a malformed boundary",
                    zone.id
                )));
            }
            if !zone.centroid.is_valid() {
                return Err(EngineError::Configuration(format!(
                    "zone {} has an invalid centroid",
                    zone.id
                )));
            }
            if !zone.rainfall_range_mm.is_well_formed() || !zone.temp_range_c.is_well_formed() {
                return Err(EngineError::Configuration(format!(
                    "zone {} has inverted climate ranges",
                    zone.id
                )));
            }
            if index.insert(zone.id.clone(), i).is_some() {
                return Err(EngineError::Configuration(format!(
                    "duplicate zone id {}",
                    zone.id
                )));
            }
        }
        Ok(Self { zones, index })
    }

    /// Load a zone table from JSON
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read zone table: {:?}", path))?;
        let zones: Vec<Zone> = serde_json::from_str(&contents)
            .with_context(|| "Failed to parse zone table JSON")?;
        Ok(Self::from_zones(zones)?)
    }

    pub fn get(&self, id: &str) -> Option<&Zone> {
        self.index.get(id).map(|&i| &self.zones[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// The 15 agro-climatic zones of India
    pub fn builtin() -> Self {
        let zones = builtin_zones();
        let index = zones
            .iter()
            .enumerate()
            .map(|(i, z)| (z.id.clone(), i))
            .collect();
        Self { zones, index }
    }
}

// ============================================================================
// Built-in zone rows
// ============================================================================

struct ZoneRow {
    id: &'static str,
    number: u8,
    name: &'static str,
    boundary: &'static [BoundingBox],
    centroid: Option<(f64, f64)>,
    climate: ClimateRegime,
    rainfall: (f64, f64),
    temp: (f64, f64),
    elevation: &'static str,
    states: &'static [&'static str],
}

static ZONE_ROWS: &[ZoneRow] = &[
    ZoneRow {
        id: "zone_1_western_himalayan", number: 1, name: "Western Himalayan Region",
        boundary: &[BoundingBox::new(28.0, 37.0, 74.0, 80.0)], centroid: None,
        climate: ClimateRegime::Temperate, rainfall: (1000.0, 2500.0), temp: (5.0, 25.0),
        elevation: "High", states: &["Jammu & Kashmir", "Himachal Pradesh", "Uttarakhand"],
    },
    ZoneRow {
        id: "zone_2_eastern_himalayan", number: 2, name: "Eastern Himalayan Region",
        boundary: &[BoundingBox::new(26.0, 30.0, 88.0, 98.0)], centroid: None,
        climate: ClimateRegime::Temperate, rainfall: (1500.0, 3000.0), temp: (8.0, 28.0),
        elevation: "High", states: &["Sikkim", "Darjeeling", "Arunachal Pradesh"],
    },
    ZoneRow {
        id: "zone_3_lower_gangetic", number: 3, name: "Lower Gangetic Plains Region",
        boundary: &[BoundingBox::new(22.0, 26.0, 86.0, 92.0)], centroid: None,
        climate: ClimateRegime::HumidSubtropical, rainfall: (1200.0, 1800.0), temp: (15.0, 38.0),
        elevation: "Low", states: &["West Bengal", "Bihar"],
    },
    ZoneRow {
        id: "zone_4_middle_gangetic", number: 4, name: "Middle Gangetic Plains Region",
        boundary: &[BoundingBox::new(24.0, 27.0, 82.0, 88.0)], centroid: None,
        climate: ClimateRegime::HumidSubtropical, rainfall: (1000.0, 1500.0), temp: (12.0, 40.0),
        elevation: "Low", states: &["Eastern UP", "Bihar"],
    },
    ZoneRow {
        id: "zone_5_upper_gangetic", number: 5, name: "Upper Gangetic Plains Region",
        boundary: &[BoundingBox::new(26.0, 31.0, 77.0, 84.0)], centroid: None,
        climate: ClimateRegime::SubHumid, rainfall: (600.0, 1200.0), temp: (8.0, 42.0),
        elevation: "Low", states: &["Western UP", "Uttarakhand", "Delhi"],
    },
    ZoneRow {
        id: "zone_6_trans_gangetic", number: 6, name: "Trans-Gangetic Plains Region",
        boundary: &[BoundingBox::new(28.0, 33.0, 74.0, 78.0)], centroid: None,
        climate: ClimateRegime::SemiArid, rainfall: (300.0, 800.0), temp: (2.0, 45.0),
        elevation: "Low", states: &["Punjab", "Haryana", "Delhi", "Rajasthan"],
    },
    ZoneRow {
        id: "zone_7_eastern_plateau", number: 7, name: "Eastern Plateau and Hills Region",
        boundary: &[BoundingBox::new(21.0, 25.0, 82.0, 88.0)], centroid: None,
        climate: ClimateRegime::SubHumid, rainfall: (1000.0, 1600.0), temp: (15.0, 40.0),
        elevation: "Medium", states: &["Jharkhand", "Chhattisgarh", "Madhya Pradesh", "Odisha"],
    },
    ZoneRow {
        id: "zone_8_central_plateau", number: 8, name: "Central Plateau and Hills Region",
        boundary: &[BoundingBox::new(21.0, 26.0, 74.0, 82.0)], centroid: None,
        climate: ClimateRegime::SubHumid, rainfall: (800.0, 1400.0), temp: (12.0, 42.0),
        elevation: "Medium", states: &["Madhya Pradesh", "Rajasthan", "Uttar Pradesh"],
    },
    ZoneRow {
        id: "zone_9_western_plateau", number: 9, name: "Western Plateau and Hills Region",
        boundary: &[BoundingBox::new(17.0, 24.0, 72.0, 77.0)], centroid: None,
        climate: ClimateRegime::SemiArid, rainfall: (500.0, 1200.0), temp: (15.0, 40.0),
        elevation: "Medium", states: &["Maharashtra", "Madhya Pradesh", "Rajasthan"],
    },
    ZoneRow {
        id: "zone_10_southern_plateau", number: 10, name: "Southern Plateau and Hills Region",
        boundary: &[BoundingBox::new(12.0, 20.0, 74.0, 80.0)], centroid: None,
        climate: ClimateRegime::SubHumid, rainfall: (600.0, 1400.0), temp: (20.0, 35.0),
        elevation: "Medium", states: &["Karnataka", "Andhra Pradesh", "Telangana", "Tamil Nadu"],
    },
    ZoneRow {
        id: "zone_11_east_coast", number: 11, name: "East Coast Plains and Hills Region",
        boundary: &[BoundingBox::new(17.0, 22.0, 82.0, 87.0)], centroid: None,
        climate: ClimateRegime::SubHumid, rainfall: (1000.0, 1400.0), temp: (22.0, 38.0),
        elevation: "Low", states: &["Odisha", "Andhra Pradesh", "Tamil Nadu"],
    },
    ZoneRow {
        id: "zone_12_west_coast", number: 12, name: "West Coast Plains and Ghats Region",
        boundary: &[BoundingBox::new(8.0, 17.0, 72.0, 77.0)], centroid: None,
        climate: ClimateRegime::HumidTropical, rainfall: (2000.0, 4000.0), temp: (22.0, 32.0),
        elevation: "Low", states: &["Kerala", "Karnataka", "Goa", "Maharashtra"],
    },
    ZoneRow {
        id: "zone_13_gujarat", number: 13, name: "Gujarat Plains and Hills Region",
        boundary: &[BoundingBox::new(20.0, 25.0, 68.0, 75.0)], centroid: None,
        climate: ClimateRegime::SemiArid, rainfall: (400.0, 1200.0), temp: (15.0, 42.0),
        elevation: "Low to medium", states: &["Gujarat", "Rajasthan"],
    },
    ZoneRow {
        id: "zone_14_western_dry", number: 14, name: "Western Dry Region",
        boundary: &[BoundingBox::new(24.0, 30.0, 69.0, 76.0)], centroid: None,
        climate: ClimateRegime::Arid, rainfall: (100.0, 500.0), temp: (5.0, 48.0),
        elevation: "Low", states: &["Rajasthan", "Gujarat"],
    },
    ZoneRow {
        // Andaman & Nicobar plus Lakshadweep; the mainland coast is not island
        id: "zone_15_island", number: 15, name: "Island Region",
        boundary: &[
            BoundingBox::new(6.0, 14.0, 92.0, 94.0),
            BoundingBox::new(8.0, 12.5, 71.0, 74.0),
        ],
        centroid: Some((11.0, 92.7)),
        climate: ClimateRegime::HumidTropical, rainfall: (1500.0, 3500.0), temp: (24.0, 32.0),
        elevation: "Low", states: &["Andaman & Nicobar", "Lakshadweep"],
    },
];

fn builtin_zones() -> Vec<Zone> {
    ZONE_ROWS
        .iter()
        .map(|row| Zone {
            id: row.id.to_string(),
            number: row.number,
            name: row.name.to_string(),
            boundary: row.boundary.to_vec(),
            centroid: row
                .centroid
                .map(|(lat, lon)| Coordinate::new(lat, lon))
                .unwrap_or_else(|| row.boundary[0].center()),
            climate: row.climate,
            rainfall_range_mm: ToleranceRange::new(row.rainfall.0, row.rainfall.1),
            temp_range_c: ToleranceRange::new(row.temp.0, row.temp.1),
            elevation: row.elevation.to_string(),
            states: row.states.iter().map(|s| s.to_string()).collect(),
            carbon_multiplier: None,
        })
        .collect()
}
