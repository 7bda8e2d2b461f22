//! Recommendation Ranker
//!
//! Orders results by (score × confidence) descending, then confidence
//! descending, then variety id ascending, so equal inputs always rank the
//! same way. Keeps the top K per category without padding: a category with
//! fewer viable results returns fewer.
//!
//! With a total cap and diversity enabled, the best result of every viable
//! category is seated before the remaining slots are filled by rank.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::config::RankingConfig;
use crate::profile::FarmerPreferences;
use crate::recommendation::SuitabilityResult;
use crate::varieties::VarietyCategory;

/// Total order used everywhere results are ranked
pub fn compare_results(a: &SuitabilityResult, b: &SuitabilityResult) -> Ordering {
    b.weighted_score()
        .total_cmp(&a.weighted_score())
        .then_with(|| b.confidence.total_cmp(&a.confidence))
        .then_with(|| a.variety_id.cmp(&b.variety_id))
}

pub type RankedCategories = BTreeMap<VarietyCategory, Vec<SuitabilityResult>>;

#[derive(Debug, Clone)]
pub struct RecommendationRanker {
    config: RankingConfig,
}

impl RecommendationRanker {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    fn is_viable(&self, r: &SuitabilityResult) -> bool {
        r.score.is_finite() && r.score > self.config.min_suitability
    }

    pub fn rank(&self, results: Vec<SuitabilityResult>, preferences: &FarmerPreferences) -> RankedCategories {
        let top_k = preferences.top_k.unwrap_or(self.config.top_k).max(1);

        let mut viable: Vec<SuitabilityResult> = results
            .into_iter()
            .filter(|r| self.is_viable(r))
            .filter(|r| !preferences.excluded_categories.contains(&r.category))
            .collect();
        viable.sort_by(compare_results);

        let mut ranked: RankedCategories = BTreeMap::new();
        for r in viable {
            let bucket = ranked.entry(r.category).or_default();
            if bucket.len() < top_k {
                bucket.push(r);
            }
        }

        match self.config.max_total {
            Some(max_total) => self.truncate_total(ranked, max_total),
            None => ranked,
        }
    }

    fn truncate_total(&self, ranked: RankedCategories, max_total: usize) -> RankedCategories {
        let total: usize = ranked.values().map(Vec::len).sum();
        if total <= max_total {
            return ranked;
        }

        let mut leaders = Vec::new();
        let mut rest = Vec::new();
        for (_, results) in ranked {
            let mut iter = results.into_iter();
            if self.config.diversity {
                leaders.extend(iter.next());
            }
            rest.extend(iter);
        }
        leaders.sort_by(compare_results);
        rest.sort_by(compare_results);

        let mut kept: RankedCategories = BTreeMap::new();
        for r in leaders.into_iter().chain(rest).take(max_total) {
            kept.entry(r.category).or_default().push(r);
        }
        for bucket in kept.values_mut() {
            bucket.sort_by(compare_results);
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::CarbonEstimate;

    fn result(id: &str, category: VarietyCategory, score: f64, confidence: f64) -> SuitabilityResult {
        SuitabilityResult {
            variety_id: id.to_string(),
            name: id.to_string(),
            category,
            score,
            confidence,
            carbon_potential: CarbonEstimate {
                value: 4.0,
                base: 4.0,
                climate_multiplier: 1.0,
                practice_bonus: 0.0,
                soc_adjustment: 0.0,
                clamped: false,
            },
            dimensions: Vec::new(),
            excluded: Vec::new(),
            excluded_weight_fraction: 0.0,
            reduced_certainty: false,
            contributing: Vec::new(),
            limiting: Vec::new(),
            provenance: Vec::new(),
        }
    }

    fn ids(results: &[SuitabilityResult]) -> Vec<&str> {
        results.iter().map(|r| r.variety_id.as_str()).collect()
    }

    #[test]
    fn test_orders_by_weighted_then_confidence_then_id() {
        let ranker = RecommendationRanker::new(RankingConfig::default());
        let ranked = ranker.rank(
            vec![
                result("RICE_003", VarietyCategory::Rice, 0.8, 0.5),
                result("RICE_002", VarietyCategory::Rice, 0.5, 0.8),
                result("RICE_001", VarietyCategory::Rice, 0.8, 0.5),
                result("RICE_004", VarietyCategory::Rice, 0.9, 0.6),
            ],
            &FarmerPreferences::default(),
        );
        // 0.54, then three at 0.40: confidence 0.8 first, then id order
        assert_eq!(
            ids(&ranked[&VarietyCategory::Rice]),
            vec!["RICE_004", "RICE_002", "RICE_001", "RICE_003"]
        );
    }

    #[test]
    fn test_top_k_without_padding() {
        let ranker = RecommendationRanker::new(RankingConfig {
            top_k: 2,
            ..RankingConfig::default()
        });
        let ranked = ranker.rank(
            vec![
                result("RICE_001", VarietyCategory::Rice, 0.9, 0.9),
                result("RICE_002", VarietyCategory::Rice, 0.8, 0.9),
                result("RICE_003", VarietyCategory::Rice, 0.7, 0.9),
                result("CROP_001", VarietyCategory::Crops, 0.6, 0.9),
                result("CROP_002", VarietyCategory::Crops, 0.0, 0.9),
            ],
            &FarmerPreferences::default(),
        );
        assert_eq!(ids(&ranked[&VarietyCategory::Rice]), vec!["RICE_001", "RICE_002"]);
        assert_eq!(ids(&ranked[&VarietyCategory::Crops]), vec!["CROP_001"]);
        assert!(!ranked.contains_key(&VarietyCategory::Agroforestry));
    }

    #[test]
    fn test_preferences_override_and_exclude() {
        let ranker = RecommendationRanker::new(RankingConfig::default());
        let prefs = FarmerPreferences {
            excluded_categories: vec![VarietyCategory::Crops],
            top_k: Some(1),
            ..FarmerPreferences::default()
        };
        let ranked = ranker.rank(
            vec![
                result("RICE_001", VarietyCategory::Rice, 0.9, 0.9),
                result("RICE_002", VarietyCategory::Rice, 0.8, 0.9),
                result("CROP_001", VarietyCategory::Crops, 0.9, 0.9),
            ],
            &prefs,
        );
        assert_eq!(ids(&ranked[&VarietyCategory::Rice]), vec!["RICE_001"]);
        assert!(!ranked.contains_key(&VarietyCategory::Crops));
    }

    #[test]
    fn test_diversity_seats_every_category() {
        let results = vec![
            result("RICE_001", VarietyCategory::Rice, 0.95, 0.9),
            result("RICE_002", VarietyCategory::Rice, 0.9, 0.9),
            result("RICE_003", VarietyCategory::Rice, 0.85, 0.9),
            result("CROP_001", VarietyCategory::Crops, 0.4, 0.9),
            result("AGRO_001", VarietyCategory::Agroforestry, 0.3, 0.9),
        ];

        let diverse = RecommendationRanker::new(RankingConfig {
            max_total: Some(3),
            diversity: true,
            ..RankingConfig::default()
        })
        .rank(results.clone(), &FarmerPreferences::default());
        assert_eq!(diverse.len(), 3);
        assert_eq!(ids(&diverse[&VarietyCategory::Rice]), vec!["RICE_001"]);

        let greedy = RecommendationRanker::new(RankingConfig {
            max_total: Some(3),
            diversity: false,
            ..RankingConfig::default()
        })
        .rank(results, &FarmerPreferences::default());
        assert_eq!(greedy.len(), 1);
        assert_eq!(greedy[&VarietyCategory::Rice].len(), 3);
    }

    #[test]
    fn test_min_suitability_filter() {
        let ranker = RecommendationRanker::new(RankingConfig {
            min_suitability: 0.5,
            ..RankingConfig::default()
        });
        let ranked = ranker.rank(
            vec![
                result("RICE_001", VarietyCategory::Rice, 0.5, 0.9),
                result("RICE_002", VarietyCategory::Rice, f64::NAN, 0.9),
            ],
            &FarmerPreferences::default(),
        );
        assert!(ranked.is_empty());
    }
}
