//! Confidence Aggregator
//!
//! Per-result confidence is the source-weighted mean of each contributing
//! reading's quality times its tier discount, scaled by the share of scoring
//! weight that survived exclusion. Results built only from historical
//! baselines are capped at the configured ceiling.
//!
//! Request-level confidence is stricter: the smallest discounted source
//! confidence, scaled by coverage, so it never exceeds any contributing
//! source.

use serde::Serialize;

use crate::config::ConfidenceConfig;
use crate::model::{ProvenanceTier, SourceKind, SourceReading};

/// One reading's part in a confidence calculation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SourceContribution {
    pub kind: SourceKind,
    pub tier: ProvenanceTier,
    pub quality: f64,
}

impl From<&SourceReading> for SourceContribution {
    fn from(reading: &SourceReading) -> Self {
        Self {
            kind: reading.kind,
            tier: reading.tier,
            quality: reading.quality,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfidenceAggregator {
    config: ConfidenceConfig,
}

impl ConfidenceAggregator {
    pub fn new(config: ConfidenceConfig) -> Self {
        Self { config }
    }

    /// Quality after the tier discount, in [0, 1]
    pub fn discounted(&self, c: &SourceContribution) -> f64 {
        (c.quality * self.config.tier_discounts.for_tier(c.tier)).clamp(0.0, 1.0)
    }

    /// Confidence of one suitability result
    pub fn aggregate(&self, contributions: &[SourceContribution], excluded_fraction: f64) -> f64 {
        let mut weighted = 0.0;
        let mut total = 0.0;
        for c in contributions {
            let w = self.config.source_weights.for_kind(c.kind);
            weighted += w * self.discounted(c);
            total += w;
        }
        if contributions.is_empty() || total <= 0.0 {
            return 0.0;
        }

        let coverage = 1.0 - excluded_fraction.clamp(0.0, 1.0);
        let confidence = (weighted / total * coverage).clamp(0.0, 1.0);
        self.apply_baseline_ceiling(contributions, confidence)
    }

    /// Confidence of a whole recommendation; never above the weakest source
    pub fn request_confidence(&self, contributions: &[SourceContribution], excluded_fraction: f64) -> f64 {
        let weakest = contributions
            .iter()
            .map(|c| self.discounted(c))
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))));
        let Some(weakest) = weakest else {
            return 0.0;
        };
        let coverage = 1.0 - excluded_fraction.clamp(0.0, 1.0);
        let confidence = (weakest * coverage).clamp(0.0, 1.0);
        self.apply_baseline_ceiling(contributions, confidence)
    }

    fn apply_baseline_ceiling(&self, contributions: &[SourceContribution], confidence: f64) -> f64 {
        let all_baseline = !contributions.is_empty()
            && contributions
                .iter()
                .all(|c| c.tier == ProvenanceTier::HistoricalBaseline);
        if all_baseline {
            confidence.min(self.config.baseline_ceiling)
        } else {
            confidence
        }
    }
}
