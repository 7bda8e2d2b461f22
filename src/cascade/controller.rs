//! Fallback Cascade Controller
//!
//! PRIMARY -> RELAXED -> INTERPOLATED -> HISTORICAL_BASELINE -> UNAVAILABLE,
//! strictly in order, one source kind at a time. Each network-bound tier runs
//! under the smaller of the per-tier timeout and what is left of the cascade
//! deadline; a timeout rejects the tier. The baseline lookup is synchronous
//! and always gets its turn.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

use super::baseline::BaselineTable;
use super::interpolation::interpolate;
use super::state::{AttemptOutcome, CascadeResult, CascadeState};
use crate::config::{AcquisitionParams, CascadeConfig};
use crate::fetch::{FetchOutcome, FetchRequest, SourceFetcher};
use crate::model::{Coordinate, ProvenanceTier, SourceKind, SourceReading, TimeWindow};
use crate::profile::SourceSlot;
use crate::quality::DataQualityAssessor;

/// Where one cascade runs
#[derive(Debug, Clone)]
pub struct CascadeTarget<'a> {
    pub kind: SourceKind,
    pub coordinate: Coordinate,
    pub zone_id: &'a str,
    pub as_of: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FallbackCascadeController {
    assessor: DataQualityAssessor,
    config: CascadeConfig,
    baseline: Arc<BaselineTable>,
}

impl FallbackCascadeController {
    pub fn new(assessor: DataQualityAssessor, config: CascadeConfig, baseline: Arc<BaselineTable>) -> Self {
        Self {
            assessor,
            config,
            baseline,
        }
    }

    pub async fn run(&self, fetcher: &dyn SourceFetcher, target: CascadeTarget<'_>) -> CascadeResult {
        let deadline = Instant::now() + Duration::from_millis(self.config.cascade_timeout_ms);
        let mut state = CascadeState::new(target.kind);

        loop {
            let tier = state.current();
            let (outcome, reading) = match tier {
                ProvenanceTier::Primary => {
                    self.observe(fetcher, &target, tier, self.config.primary, deadline).await
                }
                ProvenanceTier::Relaxed => {
                    self.observe(fetcher, &target, tier, self.config.relaxed, deadline).await
                }
                ProvenanceTier::Interpolated => self.interpolate(fetcher, &target, deadline).await,
                ProvenanceTier::HistoricalBaseline => self.baseline(&target),
                ProvenanceTier::Unavailable => break,
            };

            debug!(
                kind = %target.kind,
                tier = %tier,
                outcome = ?outcome,
                "Cascade tier finished"
            );

            if state.record(outcome) {
                if let Some(reading) = reading {
                    return CascadeResult {
                        kind: target.kind,
                        slot: SourceSlot::Accepted(reading),
                        attempts: state.into_attempts(),
                    };
                }
                break;
            }
        }

        let exhausted = state.tried();
        warn!(
            kind = %target.kind,
            zone = target.zone_id,
            tiers = ?exhausted,
            "Source unavailable after exhausting cascade"
        );
        CascadeResult {
            kind: target.kind,
            slot: SourceSlot::Missing { exhausted },
            attempts: state.into_attempts(),
        }
    }

    /// Budget for the next network call, or None when the deadline has passed
    fn budget(&self, deadline: Instant) -> Option<Duration> {
        let left = deadline.saturating_duration_since(Instant::now());
        let budget = left.min(Duration::from_millis(self.config.tier_timeout_ms));
        (!budget.is_zero()).then_some(budget)
    }

    /// Observation window for a tier; later tiers widen the primary window
    fn window_for(&self, tier: ProvenanceTier, as_of: DateTime<Utc>) -> TimeWindow {
        let primary = TimeWindow::ending_at(as_of, self.config.primary.window_days);
        match tier {
            ProvenanceTier::Primary => primary,
            _ => primary.widened_to(self.config.relaxed.window_days),
        }
    }

    async fn observe(
        &self,
        fetcher: &dyn SourceFetcher,
        target: &CascadeTarget<'_>,
        tier: ProvenanceTier,
        params: AcquisitionParams,
        deadline: Instant,
    ) -> (AttemptOutcome, Option<SourceReading>) {
        let Some(budget) = self.budget(deadline) else {
            return (AttemptOutcome::TimedOut, None);
        };
        let request = FetchRequest {
            kind: target.kind,
            coordinate: target.coordinate,
            window: self.window_for(tier, target.as_of),
            params,
            tier,
        };

        let observation = match timeout(budget, fetcher.fetch(&request)).await {
            Err(_) => return (AttemptOutcome::TimedOut, None),
            Ok(FetchOutcome::NotAvailable) => return (AttemptOutcome::NotAvailable, None),
            Ok(FetchOutcome::Failed(reason)) => return (AttemptOutcome::Failed { reason }, None),
            Ok(FetchOutcome::Observed(obs)) => obs,
        };

        if observation.payload.kind() != target.kind || observation.quality.kind() != target.kind {
            return (
                AttemptOutcome::Failed {
                    reason: format!("{} provider returned a {} payload", target.kind, observation.payload.kind()),
                },
                None,
            );
        }

        let assessment = self.assessor.assess_for_tier(&observation.quality, tier);
        if !assessment.accepted {
            return (
                AttemptOutcome::Rejected {
                    quality: assessment.score,
                    threshold: self.assessor.threshold_for(tier),
                },
                None,
            );
        }

        let reading = SourceReading {
            kind: target.kind,
            payload: observation.payload,
            raw_quality: Some(observation.quality),
            observed_at: observation.observed_at,
            tier,
            quality: assessment.score,
        };
        (AttemptOutcome::Accepted { quality: assessment.score }, Some(reading))
    }

    async fn interpolate(
        &self,
        fetcher: &dyn SourceFetcher,
        target: &CascadeTarget<'_>,
        deadline: Instant,
    ) -> (AttemptOutcome, Option<SourceReading>) {
        let Some(budget) = self.budget(deadline) else {
            return (AttemptOutcome::TimedOut, None);
        };
        let interp = &self.config.interpolation;
        let window = self.window_for(ProvenanceTier::Interpolated, target.as_of);

        let neighbors = match timeout(
            budget,
            fetcher.neighbors(target.kind, target.coordinate, window, interp.radius_km),
        )
        .await
        {
            Ok(found) => found,
            Err(_) => return (AttemptOutcome::TimedOut, None),
        };

        let same_kind: Vec<_> = neighbors
            .into_iter()
            .filter(|n| n.observation.payload.kind() == target.kind)
            .collect();

        match interpolate(&target.coordinate, &same_kind, &self.assessor, interp) {
            Ok(result) => {
                let reading = SourceReading {
                    kind: target.kind,
                    payload: result.payload,
                    raw_quality: None,
                    observed_at: result.observed_at,
                    tier: ProvenanceTier::Interpolated,
                    quality: result.quality,
                };
                (AttemptOutcome::Accepted { quality: result.quality }, Some(reading))
            }
            Err(too_few) => (
                AttemptOutcome::InsufficientNeighbors {
                    found: too_few.found,
                    required: too_few.required,
                },
                None,
            ),
        }
    }

    fn baseline(&self, target: &CascadeTarget<'_>) -> (AttemptOutcome, Option<SourceReading>) {
        match self.baseline.lookup(target.zone_id, target.kind) {
            Some(payload) => {
                let quality = self.config.baseline_quality;
                let reading = SourceReading {
                    kind: target.kind,
                    payload,
                    raw_quality: None,
                    observed_at: target.as_of,
                    tier: ProvenanceTier::HistoricalBaseline,
                    quality,
                };
                (AttemptOutcome::Accepted { quality }, Some(reading))
            }
            None => (AttemptOutcome::NoBaseline, None),
        }
    }
}
