//! Historical baseline table
//!
//! Long-run averages per zone and source kind. A missing entry means the
//! cascade for that kind ends at UNAVAILABLE rather than inventing a value.

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::model::{
    PricePayload, SatellitePayload, SoilPayload, SourceKind, SourcePayload, WeatherPayload,
};
use crate::zones::{ClimateRegime, Zone, ZoneTable};

/// Baseline payloads for one zone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneBaseline {
    pub satellite: Option<SatellitePayload>,
    pub soil: Option<SoilPayload>,
    pub weather: Option<WeatherPayload>,
    pub price: Option<PricePayload>,
}

impl ZoneBaseline {
    pub fn get(&self, kind: SourceKind) -> Option<SourcePayload> {
        match kind {
            SourceKind::Satellite => self.satellite.map(SourcePayload::Satellite),
            SourceKind::Soil => self.soil.map(SourcePayload::Soil),
            SourceKind::Weather => self.weather.map(SourcePayload::Weather),
            SourceKind::Price => self.price.map(SourcePayload::Price),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaselineTable {
    zones: FxHashMap<String, ZoneBaseline>,
}

impl BaselineTable {
    /// Table with no baselines at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// Weather and price baselines for every zone.
    ///
    /// Weather comes from the zone's characteristic climate; price indices
    /// are 1.0 by definition (the historical mean). Satellite and soil have no
    /// built-in baseline.
    pub fn from_zones(zones: &ZoneTable) -> Self {
        let zones = zones
            .iter()
            .map(|zone| {
                let baseline = ZoneBaseline {
                    weather: Some(climate_normal(zone)),
                    price: Some(PricePayload {
                        rice_index: 1.0,
                        crops_index: 1.0,
                        agroforestry_index: 1.0,
                    }),
                    ..ZoneBaseline::default()
                };
                (zone.id.clone(), baseline)
            })
            .collect();
        Self { zones }
    }

    /// Load a table keyed by zone id
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read baseline table: {:?}", path))?;
        serde_json::from_str(&contents).with_context(|| "Failed to parse baseline table JSON")
    }

    pub fn with_zone(mut self, zone_id: impl Into<String>, baseline: ZoneBaseline) -> Self {
        self.zones.insert(zone_id.into(), baseline);
        self
    }

    pub fn lookup(&self, zone_id: &str, kind: SourceKind) -> Option<SourcePayload> {
        self.zones.get(zone_id).and_then(|b| b.get(kind))
    }
}

fn climate_normal(zone: &Zone) -> WeatherPayload {
    let (humidity, drought_days) = match zone.climate {
        ClimateRegime::HumidTropical => (80.0, 15.0),
        ClimateRegime::HumidSubtropical => (70.0, 30.0),
        ClimateRegime::SubHumid => (60.0, 45.0),
        ClimateRegime::SemiArid => (45.0, 75.0),
        ClimateRegime::Arid => (30.0, 120.0),
        ClimateRegime::Temperate => (60.0, 20.0),
    };
    WeatherPayload {
        annual_rainfall_mm: zone.rainfall_range_mm.midpoint(),
        mean_temp_c: zone.temp_range_c.midpoint(),
        mean_humidity_pct: humidity,
        heat_stress_days: ((zone.temp_range_c.max - 35.0) * 5.0).max(0.0),
        drought_stress_days: drought_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_builtin_covers_weather_and_price_only() {
        let table = BaselineTable::from_zones(&ZoneTable::builtin());
        let zone = "zone_12_west_coast";
        match table.lookup(zone, SourceKind::Weather) {
            Some(SourcePayload::Weather(w)) => {
                assert_relative_eq!(w.annual_rainfall_mm, 3000.0);
                assert_relative_eq!(w.mean_temp_c, 27.0);
            }
            other => panic!("unexpected baseline {:?}", other),
        }
        assert!(table.lookup(zone, SourceKind::Price).is_some());
        assert!(table.lookup(zone, SourceKind::Soil).is_none());
        assert!(table.lookup(zone, SourceKind::Satellite).is_none());
        assert!(table.lookup("zone_99", SourceKind::Weather).is_none());
    }

    #[test]
    fn test_json_keyed_by_zone() {
        let json = r#"{"zone_12_west_coast": {"soil": {"ph": 5.6, "clay_pct": 30.0,
            "sand_pct": 40.0, "silt_pct": 30.0, "soc_pct": 2.0, "cec": 150.0}}}"#;
        let table: BaselineTable = serde_json::from_str(json).unwrap();
        assert!(table.lookup("zone_12_west_coast", SourceKind::Soil).is_some());
        assert!(table.lookup("zone_12_west_coast", SourceKind::Weather).is_none());
    }
}
