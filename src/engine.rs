//! Recommendation Engine
//!
//! Orchestrates one farm request end to end:
//!
//! 1. Resolve the agro-climatic zone (fatal when unresolved)
//! 2. Run one fallback cascade per requested source kind, concurrently
//! 3. Fuse the accepted readings into a `FarmProfile`
//! 4. Score, attach confidence and carbon, rank
//!
//! Step 2 is async and cancellable through a `CancellationToken`; cancelling
//! one request aborts its fetch tasks and leaves other requests untouched.
//! Scoring is synchronous. Many profiles can be scored in parallel with rayon.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use futures::future::join_all;
use rayon::prelude::*;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::cascade::{BaselineTable, CascadeResult, CascadeTarget, FallbackCascadeController};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::fetch::SourceFetcher;
use crate::model::{SourceKind, SourceReading};
use crate::profile::{FarmProfile, FarmRequest, SourceSlot};
use crate::quality::DataQualityAssessor;
use crate::recommendation::{
    DataQualitySummary, Recommendation, RecommendationStatus, SuitabilityResult, ZoneSummary,
};
use crate::scoring::{
    CarbonPotentialEstimator, ConfidenceAggregator, FarmCarbonScenario, RecommendationRanker,
    ScenarioPick, ScenarioRole, SourceContribution, SuitabilityScorer,
};
use crate::varieties::{VarietyCategory, VarietyDatabase, VarietyRecord};
use crate::zones::{ZoneClassifier, ZoneMatch, ZoneTable};

pub struct RecommendationEngine {
    config: EngineConfig,
    classifier: ZoneClassifier,
    varieties: Arc<VarietyDatabase>,
    controller: Arc<FallbackCascadeController>,
    fetcher: Arc<dyn SourceFetcher>,
    scorer: SuitabilityScorer,
    confidence: ConfidenceAggregator,
    carbon: CarbonPotentialEstimator,
    ranker: RecommendationRanker,
}

impl RecommendationEngine {
    /// Validate the configuration and wire the components.
    ///
    /// Configuration errors surface here and never mid-request.
    pub fn new(
        config: EngineConfig,
        zones: Arc<ZoneTable>,
        varieties: Arc<VarietyDatabase>,
        baseline: Arc<BaselineTable>,
        fetcher: Arc<dyn SourceFetcher>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        if zones.is_empty() {
            return Err(EngineError::Configuration("zone table is empty".into()));
        }
        if varieties.is_empty() {
            return Err(EngineError::Configuration("variety database is empty".into()));
        }

        let assessor = DataQualityAssessor::new(config.quality.clone());
        let controller = FallbackCascadeController::new(assessor, config.cascade.clone(), baseline);

        tracing::info!(
            zones = zones.len(),
            varieties = varieties.len(),
            provider = fetcher.source_id(),
            "Recommendation engine ready"
        );

        Ok(Self {
            classifier: ZoneClassifier::new(zones, config.zones.clone()),
            varieties,
            controller: Arc::new(controller),
            fetcher,
            scorer: SuitabilityScorer::new(config.scoring.clone()),
            confidence: ConfidenceAggregator::new(config.confidence.clone()),
            carbon: CarbonPotentialEstimator::new(config.carbon.clone()),
            ranker: RecommendationRanker::new(config.ranking.clone()),
            config,
        })
    }

    /// Engine over the built-in zone table, variety database and baselines
    pub fn with_builtin(config: EngineConfig, fetcher: Arc<dyn SourceFetcher>) -> Result<Self> {
        let zones = Arc::new(ZoneTable::builtin());
        let varieties = Arc::new(VarietyDatabase::builtin(&zones)?);
        let baseline = Arc::new(BaselineTable::from_zones(&zones));
        Ok(Self::new(config, zones, varieties, baseline, fetcher)?)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn varieties(&self) -> &VarietyDatabase {
        &self.varieties
    }

    /// Full recommendation for one farm
    pub async fn recommend(
        &self,
        request: &FarmRequest,
        cancel: &CancellationToken,
    ) -> Result<Recommendation, EngineError> {
        request.validate()?;
        let zone_match = self.classifier.classify(&request.coordinate)?;
        tracing::info!(
            farm = %request.farm_id,
            zone = %zone_match.zone.id,
            method = ?zone_match.method,
            distance_km = zone_match.distance_km,
            "Zone resolved"
        );

        let cascades = self.fetch_sources(request, &zone_match.zone.id, cancel).await?;
        require_data(&request.farm_id, cascades.iter().map(|c| (c.kind, &c.slot)))?;

        let profile = self.build_profile(request, zone_match, &cascades);
        let degraded: Vec<_> = profile
            .accepted()
            .filter(|r| !r.tier.is_observed())
            .map(|r| r.kind)
            .collect();
        tracing::info!(
            farm = %request.farm_id,
            accepted = profile.accepted().count(),
            missing = ?profile.missing_kinds(),
            synthesized = ?degraded,
            "Farm profile fused"
        );

        Ok(self.assemble(&profile, DataQualitySummary::from_cascades(&cascades)))
    }

    /// Recommendations for many farms; each gets a child of `cancel`
    pub async fn recommend_many(
        &self,
        requests: &[FarmRequest],
        cancel: &CancellationToken,
    ) -> Vec<Result<Recommendation, EngineError>> {
        let tokens: Vec<CancellationToken> = requests.iter().map(|_| cancel.child_token()).collect();
        join_all(
            requests
                .iter()
                .zip(&tokens)
                .map(|(request, token)| self.recommend(request, token)),
        )
        .await
    }

    /// One cascade task per requested kind, joined under the cancel token
    async fn fetch_sources(
        &self,
        request: &FarmRequest,
        zone_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<CascadeResult>, EngineError> {
        let kinds = request.requested_sources();
        let as_of = request.as_of.unwrap_or_else(Utc::now);

        let mut tasks = JoinSet::new();
        for &kind in &kinds {
            let controller = Arc::clone(&self.controller);
            let fetcher = Arc::clone(&self.fetcher);
            let zone_id = zone_id.to_string();
            let coordinate = request.coordinate;
            tasks.spawn(async move {
                let target = CascadeTarget {
                    kind,
                    coordinate,
                    zone_id: &zone_id,
                    as_of,
                };
                controller.run(fetcher.as_ref(), target).await
            });
        }

        let mut results = Vec::with_capacity(kinds.len());
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    tracing::warn!(farm = %request.farm_id, "Request cancelled; source tasks aborted");
                    return Err(EngineError::Cancelled { farm_id: request.farm_id.clone() });
                }
                joined = tasks.join_next() => match joined {
                    Some(Ok(result)) => results.push(result),
                    Some(Err(e)) => {
                        tracing::warn!(farm = %request.farm_id, error = %e, "Source task failed");
                    }
                    None => break,
                },
            }
        }

        // A task that panicked leaves its kind without a result
        for kind in kinds {
            if !results.iter().any(|r: &CascadeResult| r.kind == kind) {
                results.push(CascadeResult {
                    kind,
                    slot: SourceSlot::Missing { exhausted: Vec::new() },
                    attempts: Vec::new(),
                });
            }
        }
        results.sort_by_key(|r| r.kind);
        Ok(results)
    }

    /// Fuse cascade results into a profile and attach its confidence
    pub fn build_profile(
        &self,
        request: &FarmRequest,
        zone_match: ZoneMatch,
        cascades: &[CascadeResult],
    ) -> FarmProfile {
        let sources: BTreeMap<SourceKind, SourceSlot> =
            cascades.iter().map(|c| (c.kind, c.slot.clone())).collect();
        let mut profile = FarmProfile::new(
            request.farm_id.clone(),
            request.coordinate,
            zone_match.zone,
            zone_match.method,
            zone_match.distance_km,
            sources,
            request.preferences.clone(),
        );
        profile.confidence = self.profile_confidence(&profile);
        profile
    }

    /// Weakest accepted source, scaled by the source weight that is missing
    fn profile_confidence(&self, profile: &FarmProfile) -> f64 {
        let contributions: Vec<SourceContribution> =
            profile.accepted().map(SourceContribution::from).collect();
        let weights = &self.config.confidence.source_weights;
        let total: f64 = SourceKind::ALL.iter().map(|k| weights.for_kind(*k)).sum();
        let missing: f64 = SourceKind::ALL
            .iter()
            .filter(|k| profile.reading(**k).is_none())
            .map(|k| weights.for_kind(*k))
            .sum();
        let excluded = if total > 0.0 { missing / total } else { 1.0 };
        self.confidence.request_confidence(&contributions, excluded)
    }

    /// Score one variety against one profile
    pub fn score_variety(&self, profile: &FarmProfile, variety: &VarietyRecord) -> SuitabilityResult {
        let suitability = self.scorer.score(profile, variety);
        let provenance: Vec<SourceContribution> = suitability
            .contributing_sources()
            .into_iter()
            .filter_map(|kind| profile.reading(kind))
            .map(SourceContribution::from)
            .collect();
        let confidence = self
            .confidence
            .aggregate(&provenance, suitability.excluded_weight_fraction);
        let soil = profile.reading(SourceKind::Soil).and_then(SourceReading::soil);
        let carbon_potential = self
            .carbon
            .estimate(variety, &profile.zone, soil, &profile.preferences.practices);

        SuitabilityResult {
            variety_id: variety.id.clone(),
            name: variety.name.clone(),
            category: variety.category,
            score: suitability.score,
            confidence,
            carbon_potential,
            dimensions: suitability.dimensions,
            excluded: suitability.excluded,
            excluded_weight_fraction: suitability.excluded_weight_fraction,
            reduced_certainty: suitability.reduced_certainty,
            contributing: suitability.contributing,
            limiting: suitability.limiting,
            provenance,
        }
    }

    /// Score and rank an already-fused profile
    pub fn score_profile(&self, profile: &FarmProfile) -> Result<Recommendation, EngineError> {
        require_data(&profile.farm_id, profile.sources.iter().map(|(k, s)| (*k, s)))?;
        Ok(self.assemble(profile, DataQualitySummary::from_profile(profile)))
    }

    /// Score many profiles in parallel; each profile is scored on one thread
    pub fn score_profiles_parallel(
        &self,
        profiles: &[FarmProfile],
    ) -> Vec<Result<Recommendation, EngineError>> {
        profiles.par_iter().map(|p| self.score_profile(p)).collect()
    }

    fn assemble(&self, profile: &FarmProfile, data_quality: DataQualitySummary) -> Recommendation {
        let results: Vec<SuitabilityResult> = self
            .varieties
            .iter()
            .map(|v| self.score_variety(profile, v))
            .collect();
        let categories = self.ranker.rank(results, &profile.preferences);

        let status = if categories.values().all(Vec::is_empty) {
            let reason = EngineError::NoEligibleVarieties {
                zone_id: profile.zone.id.clone(),
            };
            tracing::warn!(farm = %profile.farm_id, "{}", reason);
            RecommendationStatus::NoEligibleVarieties {
                reason: reason.to_string(),
            }
        } else {
            RecommendationStatus::Ok
        };

        let mut recommendation = Recommendation {
            farm_id: profile.farm_id.clone(),
            zone: ZoneSummary::from_profile(profile),
            status,
            categories,
            confidence: profile.confidence,
            data_quality,
            carbon_scenario: None,
            soil: profile.soil,
            vegetation: profile.vegetation,
        };
        recommendation.carbon_scenario = self.carbon_scenario(&recommendation);

        tracing::debug!(
            farm = %profile.farm_id,
            results = recommendation.all_results().count(),
            confidence = recommendation.confidence,
            "Recommendation assembled"
        );
        recommendation
    }

    fn carbon_scenario(&self, recommendation: &Recommendation) -> Option<FarmCarbonScenario> {
        let pick = |role, result: Option<&SuitabilityResult>| {
            result.map(|r| ScenarioPick {
                role,
                variety_id: r.variety_id.clone(),
                carbon: r.carbon_potential.value,
            })
        };
        let crops = recommendation.results(VarietyCategory::Crops);
        let picks: Vec<ScenarioPick> = [
            pick(ScenarioRole::Rice, recommendation.top(VarietyCategory::Rice)),
            pick(ScenarioRole::PrimaryCrop, crops.first()),
            pick(ScenarioRole::SecondaryCrop, crops.get(1)),
            pick(ScenarioRole::Agroforestry, recommendation.top(VarietyCategory::Agroforestry)),
        ]
        .into_iter()
        .flatten()
        .collect();
        self.carbon.farm_scenario(picks)
    }
}

/// Refuse to score a farm that has no accepted reading from any source
fn require_data<'a>(
    farm_id: &str,
    slots: impl IntoIterator<Item = (SourceKind, &'a SourceSlot)>,
) -> Result<(), EngineError> {
    let mut exhausted = Vec::new();
    for (kind, slot) in slots {
        match slot {
            SourceSlot::Accepted(_) => return Ok(()),
            SourceSlot::Missing { exhausted: tiers } => exhausted.push((kind, tiers.clone())),
            SourceSlot::NotRequested => {}
        }
    }
    let err = EngineError::InsufficientData { exhausted };
    tracing::warn!(farm = %farm_id, "{}", err);
    Err(err)
}
