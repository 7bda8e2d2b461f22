//! Variety Database
//!
//! The built-in 147-variety reference set (rice, crops, agroforestry across
//! the 15 zones), or a caller-supplied file in the same format. Read-only
//! after construction.

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use std::fs;
use std::path::Path;

use super::record::{ph_range_for, VarietyCategory, VarietyEntry, VarietyRecord};
use crate::error::EngineError;
use crate::model::ToleranceRange;
use crate::zones::ZoneTable;

const BUILTIN_VARIETIES: &str = include_str!("../../data/varieties.json");

#[derive(Debug, Clone)]
pub struct VarietyDatabase {
    records: Vec<VarietyRecord>,
    index: FxHashMap<String, usize>,
}

impl VarietyDatabase {
    /// Built-in reference set, resolved against `zones`
    pub fn builtin(zones: &ZoneTable) -> Result<Self> {
        Self::from_json(BUILTIN_VARIETIES, zones).with_context(|| "Built-in variety database is invalid")
    }

    /// Load a variety file
    pub fn load(path: &Path, zones: &ZoneTable) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read variety database: {:?}", path))?;
        Self::from_json(&contents, zones)
            .with_context(|| format!("Invalid variety database: {:?}", path))
    }

    pub fn from_json(json: &str, zones: &ZoneTable) -> Result<Self> {
        let entries: Vec<VarietyEntry> =
            serde_json::from_str(json).with_context(|| "Failed to parse variety JSON")?;
        Ok(Self::from_entries(entries, zones)?)
    }

    pub fn from_entries(entries: Vec<VarietyEntry>, zones: &ZoneTable) -> Result<Self, EngineError> {
        let mut records = Vec::with_capacity(entries.len());
        let mut index = FxHashMap::default();

        for entry in entries {
            let record = resolve(entry, zones)?;
            if index.insert(record.id.clone(), records.len()).is_some() {
                return Err(EngineError::Configuration(format!("duplicate variety id {}", record.id)));
            }
            records.push(record);
        }

        Ok(Self { records, index })
    }

    pub fn get(&self, id: &str) -> Option<&VarietyRecord> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &VarietyRecord> {
        self.records.iter()
    }

    pub fn by_category(&self, category: VarietyCategory) -> impl Iterator<Item = &VarietyRecord> {
        self.records.iter().filter(move |r| r.category == category)
    }

    /// Categories with at least one record
    pub fn categories(&self) -> Vec<VarietyCategory> {
        VarietyCategory::ALL
            .into_iter()
            .filter(|c| self.records.iter().any(|r| r.category == *c))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Resolve tolerances: explicit values win; otherwise climate ranges span the
/// eligible zones and pH follows the soil preference.
fn resolve(entry: VarietyEntry, zones: &ZoneTable) -> Result<VarietyRecord, EngineError> {
    let bad = |msg: String| EngineError::Configuration(format!("variety {}: {}", entry.id, msg));

    if entry.zones.is_empty() {
        return Err(bad("no eligible zones".into()));
    }
    let mut eligible = Vec::with_capacity(entry.zones.len());
    for id in &entry.zones {
        let zone = zones.get(id).ok_or_else(|| bad(format!("unknown zone {}", id)))?;
        eligible.push(zone);
    }

    let span = |pick: fn(&crate::zones::Zone) -> ToleranceRange| {
        eligible.iter().map(|z| pick(z)).fold(
            ToleranceRange::new(f64::INFINITY, f64::NEG_INFINITY),
            |acc, r| ToleranceRange::new(acc.min.min(r.min), acc.max.max(r.max)),
        )
    };

    let rainfall = entry.rainfall_range_mm.unwrap_or_else(|| span(|z| z.rainfall_range_mm));
    let temp = entry.temp_range_c.unwrap_or_else(|| span(|z| z.temp_range_c));
    let ph = entry
        .ph_range
        .unwrap_or_else(|| ph_range_for(entry.category, &entry.soil_preference));
    let carbon = ToleranceRange::new(entry.carbon_potential[0], entry.carbon_potential[1]);

    for (name, range) in [("rainfall", &rainfall), ("temperature", &temp), ("pH", &ph), ("carbon", &carbon)] {
        if !range.is_well_formed() {
            return Err(bad(format!("inverted {} range", name)));
        }
    }
    if carbon.min < 0.0 {
        return Err(bad("negative carbon potential".into()));
    }

    Ok(VarietyRecord {
        id: entry.id.clone(),
        name: entry.name.clone(),
        category: entry.category,
        zones: entry.zones.iter().cloned().collect(),
        soil_preference: entry.soil_preference.clone(),
        water_requirement: entry.water_requirement,
        market_value: entry.market_value,
        ph_range: ph,
        rainfall_range_mm: rainfall,
        temp_range_c: temp,
        carbon_potential: carbon,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> VarietyDatabase {
        VarietyDatabase::builtin(&ZoneTable::builtin()).unwrap()
    }

    #[test]
    fn test_builtin_has_147_entries() {
        let db = db();
        assert_eq!(db.len(), 147);
        assert_eq!(db.categories(), VarietyCategory::ALL.to_vec());
        assert_eq!(db.by_category(VarietyCategory::Rice).count(), 59);
    }

    #[test]
    fn test_climate_ranges_come_from_home_zone() {
        let db = db();
        let jyothi = db.get("RICE_045").unwrap();
        assert_eq!(jyothi.name, "Jyothi");
        assert!(jyothi.is_eligible_in("zone_12_west_coast"));
        assert_eq!(jyothi.rainfall_range_mm, ToleranceRange::new(2000.0, 4000.0));
        assert_eq!(jyothi.temp_range_c, ToleranceRange::new(22.0, 32.0));
        assert_eq!(jyothi.ph_range, ToleranceRange::new(5.5, 6.5));
    }

    #[test]
    fn test_every_zone_has_candidates() {
        let zones = ZoneTable::builtin();
        let db = VarietyDatabase::builtin(&zones).unwrap();
        for zone in zones.iter() {
            assert!(db.iter().any(|v| v.is_eligible_in(&zone.id)), "{} has no varieties", zone.id);
        }
    }

    #[test]
    fn test_unknown_zone_rejected() {
        let json = r#"[{"id": "X", "name": "X", "category": "rice", "zones": ["zone_99"],
            "soil_preference": "Neutral", "water_requirement": "Low", "market_value": "Good",
            "carbon_potential": [2.0, 3.0]}]"#;
        assert!(VarietyDatabase::from_json(json, &ZoneTable::builtin()).is_err());
    }

    #[test]
    fn test_explicit_range_overrides_derivation() {
        let json = r#"[{"id": "X", "name": "X", "category": "crops", "zones": ["zone_12_west_coast"],
            "soil_preference": "Neutral", "water_requirement": "Low", "market_value": "Good",
            "carbon_potential": [2.0, 3.0], "ph_range": {"min": 5.0, "max": 5.8}}]"#;
        let db = VarietyDatabase::from_json(json, &ZoneTable::builtin()).unwrap();
        assert_eq!(db.get("X").unwrap().ph_range, ToleranceRange::new(5.0, 5.8));
    }
}
