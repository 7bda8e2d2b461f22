//! Data Quality Assessor
//!
//! Scores one reading's raw quality vector as a weighted linear combination
//! of its normalized factors, then accepts or rejects it against the
//! configured threshold.
//!
//! Missing factors contribute 0 but keep their weight in the denominator, so
//! an incomplete vector can never score higher than a complete one with the
//! same values. A vector with no factors at all scores 0 and is rejected.

use serde::Serialize;

use crate::config::QualityConfig;
use crate::model::{ProvenanceTier, QualityVector};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityAssessment {
    /// Quality score in [0, 1]
    pub score: f64,
    pub accepted: bool,
    pub factors_present: usize,
    pub factors_total: usize,
}

#[derive(Debug, Clone)]
pub struct DataQualityAssessor {
    config: QualityConfig,
}

impl DataQualityAssessor {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    pub fn threshold(&self) -> f64 {
        self.config.threshold
    }

    /// Acceptance threshold for a cascade tier; RELAXED tolerates lower quality
    pub fn threshold_for(&self, tier: ProvenanceTier) -> f64 {
        match tier {
            ProvenanceTier::Relaxed => self.config.relaxed_threshold,
            _ => self.config.threshold,
        }
    }

    pub fn assess(&self, quality: &QualityVector) -> QualityAssessment {
        self.assess_against(quality, self.config.threshold)
    }

    pub fn assess_for_tier(&self, quality: &QualityVector, tier: ProvenanceTier) -> QualityAssessment {
        self.assess_against(quality, self.threshold_for(tier))
    }

    fn assess_against(&self, quality: &QualityVector, threshold: f64) -> QualityAssessment {
        let factors = self.weighted_factors(quality);
        let factors_total = factors.len();

        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        let mut factors_present = 0;
        for (value, weight) in &factors {
            total_weight += weight;
            if let Some(v) = value {
                weighted += weight * v;
                factors_present += 1;
            }
        }

        let score = if factors_present == 0 || total_weight <= 0.0 {
            0.0
        } else {
            (weighted / total_weight).clamp(0.0, 1.0)
        };

        QualityAssessment {
            score,
            accepted: factors_present > 0 && score >= threshold,
            factors_present,
            factors_total,
        }
    }

    /// (normalized value, weight) for every factor of the vector's kind
    fn weighted_factors(&self, quality: &QualityVector) -> Vec<(Option<f64>, f64)> {
        match quality {
            QualityVector::Satellite(q) => {
                let w = &self.config.satellite;
                vec![
                    (unit(q.cloud_free_fraction), w.cloud_free_fraction),
                    (unit(q.valid_pixel_density), w.valid_pixel_density),
                    (unit(q.temporal_consistency), w.temporal_consistency),
                    (unit(q.spatial_completeness), w.spatial_completeness),
                ]
            }
            QualityVector::Soil(q) => {
                let w = &self.config.soil;
                vec![
                    (unit(q.depth_coverage), w.depth_coverage),
                    // Stated uncertainty counts against the reading
                    (unit(q.uncertainty).map(|u| 1.0 - u), w.uncertainty),
                    (unit(q.property_completeness), w.property_completeness),
                ]
            }
            QualityVector::Weather(q) => {
                let w = &self.config.weather;
                vec![
                    (unit(q.temporal_completeness), w.temporal_completeness),
                    (unit(q.station_agreement), w.station_agreement),
                    (unit(q.recency), w.recency),
                ]
            }
            QualityVector::Price(q) => {
                let w = &self.config.price;
                vec![
                    (unit(q.historical_deviation).map(|d| 1.0 - d), w.historical_deviation),
                    (unit(q.market_coverage), w.market_coverage),
                    (unit(q.recency), w.recency),
                ]
            }
        }
    }
}

/// Finite factor clamped to [0, 1]; NaN and infinities count as missing
fn unit(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite()).map(|v| v.clamp(0.0, 1.0))
}
