//! Carbon Potential Estimator
//!
//! value = base midpoint × zone climate multiplier
//!       + Σ applicable practice terms
//!       + soil organic carbon adjustment
//!
//! then clamped to the category bounds. Clamping is the last step and is
//! unconditional: every estimate leaving this module lies inside the bounds.

use serde::Serialize;
use smallvec::SmallVec;

use crate::config::CarbonConfig;
use crate::model::SoilPayload;
use crate::profile::Practice;
use crate::varieties::{VarietyCategory, VarietyRecord};
use crate::zones::Zone;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarbonEstimate {
    /// t CO2e/ha/yr, inside the category bounds
    pub value: f64,
    pub base: f64,
    pub climate_multiplier: f64,
    pub practice_bonus: f64,
    pub soc_adjustment: f64,
    /// True when the unclamped value fell outside the bounds
    pub clamped: bool,
}

/// Role a top pick plays in the farm-level blend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioRole {
    Rice,
    PrimaryCrop,
    SecondaryCrop,
    Agroforestry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioPick {
    pub role: ScenarioRole,
    pub variety_id: String,
    pub carbon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FarmCarbonScenario {
    /// Blended t CO2e/ha/yr
    pub blended_per_ha: f64,
    pub estimated_credits: f64,
    pub estimated_revenue: f64,
    pub picks: Vec<ScenarioPick>,
}

#[derive(Debug, Clone)]
pub struct CarbonPotentialEstimator {
    config: CarbonConfig,
}

impl CarbonPotentialEstimator {
    pub fn new(config: CarbonConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CarbonConfig {
        &self.config
    }

    /// Whether a practice changes carbon for this category
    fn applies(practice: Practice, category: VarietyCategory) -> bool {
        match practice {
            Practice::AlternateWettingDrying => category == VarietyCategory::Rice,
            Practice::AgroforestryIntegration => category != VarietyCategory::Agroforestry,
            Practice::ResidueManagement | Practice::CoverCropping | Practice::ReducedTillage => true,
        }
    }

    fn practice_bonus(&self, category: VarietyCategory, practices: &[Practice]) -> f64 {
        let mut seen: SmallVec<[Practice; 5]> = SmallVec::new();
        let mut bonus = 0.0;
        for &p in practices {
            if seen.contains(&p) || !Self::applies(p, category) {
                continue;
            }
            seen.push(p);
            bonus += self.config.practices.term(p);
        }
        bonus
    }

    /// Low soil carbon leaves more room to sequester; high soil carbon less
    fn soc_adjustment(&self, soil: Option<&SoilPayload>) -> f64 {
        let Some(soc) = soil.map(|s| s.soc_pct).filter(|v| v.is_finite() && *v >= 0.0) else {
            return 0.0;
        };
        let cap = self.config.soc_adjustment_cap;
        ((self.config.soc_reference_pct - soc) * self.config.soc_adjustment_per_pct).clamp(-cap, cap)
    }

    pub fn estimate(
        &self,
        variety: &VarietyRecord,
        zone: &Zone,
        soil: Option<&SoilPayload>,
        practices: &[Practice],
    ) -> CarbonEstimate {
        let bounds = self.config.bounds(variety.category);
        let base = variety.base_carbon();
        let climate_multiplier = zone.carbon_multiplier();
        let practice_bonus = self.practice_bonus(variety.category, practices);
        let soc_adjustment = self.soc_adjustment(soil);

        let raw = base * climate_multiplier + practice_bonus + soc_adjustment;
        let (value, clamped) = if raw.is_finite() {
            let v = bounds.clamp(raw);
            (v, v != raw)
        } else {
            (bounds.min, true)
        };

        CarbonEstimate {
            value,
            base,
            climate_multiplier,
            practice_bonus,
            soc_adjustment,
            clamped,
        }
    }

    /// Blend the top picks into one farm-level figure.
    ///
    /// Each pick contributes its carbon times the fixed area share of its
    /// role. A role without a pick leaves its share of the farm unplanted,
    /// so shares are never renormalised. `None` when no pick is given.
    pub fn farm_scenario(&self, picks: Vec<ScenarioPick>) -> Option<FarmCarbonScenario> {
        let s = &self.config.scenario;
        let share = |role: ScenarioRole| match role {
            ScenarioRole::Rice => s.rice_share,
            ScenarioRole::PrimaryCrop => s.primary_crop_share,
            ScenarioRole::SecondaryCrop => s.secondary_crop_share,
            ScenarioRole::Agroforestry => s.agroforestry_share,
        };

        if picks.is_empty() {
            return None;
        }
        let blended: f64 = picks.iter().map(|p| p.carbon * share(p.role)).sum();
        let credits = blended * s.credit_efficiency;

        Some(FarmCarbonScenario {
            blended_per_ha: blended,
            estimated_credits: credits,
            estimated_revenue: credits * s.price_per_credit,
            picks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ToleranceRange;
    use crate::zones::ZoneTable;
    use approx::assert_relative_eq;
    use smallvec::smallvec;

    fn variety(category: VarietyCategory, carbon: (f64, f64)) -> VarietyRecord {
        VarietyRecord {
            id: "TEST_001".to_string(),
            name: "Test".to_string(),
            category,
            zones: smallvec!["zone_12_west_coast".to_string()],
            soil_preference: "Any".to_string(),
            water_requirement: crate::varieties::WaterRequirement::Medium,
            market_value: crate::varieties::MarketValue::Good,
            ph_range: ToleranceRange::new(5.5, 6.5),
            rainfall_range_mm: ToleranceRange::new(2000.0, 4000.0),
            temp_range_c: ToleranceRange::new(22.0, 32.0),
            carbon_potential: ToleranceRange::new(carbon.0, carbon.1),
        }
    }

    fn west_coast() -> Zone {
        ZoneTable::builtin()
            .get("zone_12_west_coast")
            .cloned()
            .unwrap()
    }

    fn soil_with_soc(soc: f64) -> SoilPayload {
        SoilPayload {
            ph: 6.0,
            clay_pct: 30.0,
            sand_pct: 35.0,
            silt_pct: 35.0,
            soc_pct: soc,
            cec: 150.0,
        }
    }

    #[test]
    fn test_base_times_multiplier() {
        let est = CarbonPotentialEstimator::new(CarbonConfig::default());
        let zone = west_coast();
        let e = est.estimate(&variety(VarietyCategory::Rice, (3.0, 5.0)), &zone, None, &[]);
        assert_relative_eq!(e.value, 4.0 * zone.carbon_multiplier(), epsilon = 1e-9);
        assert!(!e.clamped);
    }

    #[test]
    fn test_practice_applicability_and_dedup() {
        let est = CarbonPotentialEstimator::new(CarbonConfig::default());
        let zone = west_coast();
        let practices = [
            Practice::AlternateWettingDrying,
            Practice::AgroforestryIntegration,
            Practice::ResidueManagement,
            Practice::ResidueManagement,
        ];

        let rice = est.estimate(&variety(VarietyCategory::Rice, (3.0, 5.0)), &zone, None, &practices);
        assert_relative_eq!(rice.practice_bonus, 0.8 + 1.5 + 0.5, epsilon = 1e-9);

        let agro = est.estimate(&variety(VarietyCategory::Agroforestry, (6.0, 8.0)), &zone, None, &practices);
        assert_relative_eq!(agro.practice_bonus, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_soc_adjustment_capped() {
        let est = CarbonPotentialEstimator::new(CarbonConfig::default());
        let zone = west_coast();
        let v = variety(VarietyCategory::Crops, (3.0, 4.0));

        let low = est.estimate(&v, &zone, Some(&soil_with_soc(0.5)), &[]);
        assert_relative_eq!(low.soc_adjustment, 0.4, epsilon = 1e-9);

        let very_high = est.estimate(&v, &zone, Some(&soil_with_soc(9.0)), &[]);
        assert_relative_eq!(very_high.soc_adjustment, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_clamped_to_category_bounds() {
        let est = CarbonPotentialEstimator::new(CarbonConfig::default());
        let zone = west_coast();
        let all = [
            Practice::AgroforestryIntegration,
            Practice::ResidueManagement,
            Practice::CoverCropping,
            Practice::ReducedTillage,
        ];
        let high = est.estimate(&variety(VarietyCategory::Crops, (7.0, 9.0)), &zone, None, &all);
        assert_eq!(high.value, 8.0);
        assert!(high.clamped);

        let low = est.estimate(&variety(VarietyCategory::Agroforestry, (0.5, 1.0)), &zone, None, &[]);
        assert_eq!(low.value, 4.0);
    }

    #[test]
    fn test_non_finite_falls_to_min() {
        let est = CarbonPotentialEstimator::new(CarbonConfig::default());
        let e = est.estimate(
            &variety(VarietyCategory::Rice, (f64::NAN, 5.0)),
            &west_coast(),
            None,
            &[],
        );
        assert_eq!(e.value, 2.0);
        assert!(e.clamped);
    }

    #[test]
    fn test_farm_scenario_uses_fixed_shares() {
        let est = CarbonPotentialEstimator::new(CarbonConfig::default());
        let pick = |role, carbon| ScenarioPick {
            role,
            variety_id: "X".to_string(),
            carbon,
        };

        let full = est
            .farm_scenario(vec![
                pick(ScenarioRole::Rice, 5.0),
                pick(ScenarioRole::PrimaryCrop, 4.0),
                pick(ScenarioRole::SecondaryCrop, 3.0),
                pick(ScenarioRole::Agroforestry, 10.0),
            ])
            .unwrap();
        assert_relative_eq!(full.blended_per_ha, 2.0 + 1.2 + 0.6 + 1.0, epsilon = 1e-9);
        assert_relative_eq!(full.estimated_credits, full.blended_per_ha * 0.85, epsilon = 1e-9);
        assert_relative_eq!(full.estimated_revenue, full.estimated_credits * 25.0, epsilon = 1e-9);

        // Rice alone covers only its 40 % of the farm
        let rice_only = est.farm_scenario(vec![pick(ScenarioRole::Rice, 5.0)]).unwrap();
        assert_relative_eq!(rice_only.blended_per_ha, 2.0, epsilon = 1e-9);
        assert_relative_eq!(rice_only.estimated_credits, 1.7, epsilon = 1e-9);
        assert_relative_eq!(rice_only.estimated_revenue, 42.5, epsilon = 1e-9);

        // No secondary crop: its 20 % is not handed to the other roles
        let partial = est
            .farm_scenario(vec![
                pick(ScenarioRole::Rice, 5.0),
                pick(ScenarioRole::PrimaryCrop, 4.0),
                pick(ScenarioRole::Agroforestry, 10.0),
            ])
            .unwrap();
        assert_relative_eq!(partial.blended_per_ha, 2.0 + 1.2 + 1.0, epsilon = 1e-9);

        assert!(est.farm_scenario(Vec::new()).is_none());
    }
}
