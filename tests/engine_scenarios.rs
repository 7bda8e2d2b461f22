// End-to-end engine scenarios
//
// Runs whole farm requests through the engine with fixture providers:
// the Wayanad degraded-data farm, all-sources-missing, cancellation,
// tier timeouts, farms with no eligible variety, and batch scoring.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use reco_engine_rust::cascade::{AttemptOutcome, BaselineTable};
use reco_engine_rust::fetch::SourceFixture;
use reco_engine_rust::model::{
    QualityVector, RawObservation, SoilPayload, SoilQuality, SourcePayload, SourceReading,
    WeatherPayload, WeatherQuality,
};
use reco_engine_rust::profile::SourceSlot;
use reco_engine_rust::recommendation::DataQualitySummary;
use reco_engine_rust::{
    CancellationToken, Coordinate, EngineConfig, EngineError, FarmProfile, FarmRequest,
    FarmerPreferences, FixtureFetcher, ProvenanceTier, Recommendation, RecommendationEngine,
    RecommendationStatus, SourceKind, VarietyCategory, VarietyDatabase, ZoneClassifier, ZoneTable,
};

const WAYANAD: (f64, f64) = (11.546179, 76.41653);

fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()
}

fn wayanad_request(id: &str) -> FarmRequest {
    let mut request = FarmRequest::new(id, Coordinate::new(WAYANAD.0, WAYANAD.1));
    request.as_of = Some(as_of());
    request
}

fn engine_with(config: EngineConfig, fetcher: FixtureFetcher, baseline: BaselineTable) -> RecommendationEngine {
    let zones = Arc::new(ZoneTable::builtin());
    let varieties = Arc::new(VarietyDatabase::builtin(&zones).unwrap());
    RecommendationEngine::new(config, zones, varieties, Arc::new(baseline), Arc::new(fetcher)).unwrap()
}

fn weather_fixture(quality: f64) -> SourceFixture {
    SourceFixture {
        primary: Some(RawObservation {
            payload: SourcePayload::Weather(WeatherPayload {
                annual_rainfall_mm: 2800.0,
                mean_temp_c: 26.0,
                mean_humidity_pct: 80.0,
                heat_stress_days: 2.0,
                drought_stress_days: 0.0,
            }),
            quality: QualityVector::Weather(WeatherQuality {
                temporal_completeness: Some(quality),
                station_agreement: Some(quality),
                recency: Some(quality),
            }),
            observed_at: as_of(),
        }),
        ..SourceFixture::default()
    }
}

fn soil_fixture(delay_ms: u64) -> SourceFixture {
    SourceFixture {
        primary: Some(RawObservation {
            payload: SourcePayload::Soil(SoilPayload {
                ph: 6.0,
                clay_pct: 30.0,
                sand_pct: 40.0,
                silt_pct: 30.0,
                soc_pct: 1.2,
                cec: 150.0,
            }),
            quality: QualityVector::Soil(SoilQuality {
                depth_coverage: Some(0.9),
                uncertainty: Some(0.1),
                property_completeness: Some(0.9),
            }),
            observed_at: as_of(),
        }),
        delay_ms,
        ..SourceFixture::default()
    }
}

#[tokio::test]
async fn test_wayanad_degraded_sources() {
    let engine = engine_with(
        EngineConfig::default(),
        FixtureFetcher::wayanad_demo(as_of()),
        BaselineTable::empty(),
    );
    let rec = engine
        .recommend(&wayanad_request("wayanad"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(rec.zone.id, "zone_12_west_coast");
    assert_eq!(rec.status, RecommendationStatus::Ok);

    let source = |kind| {
        rec.data_quality
            .sources
            .iter()
            .find(|s| s.kind == kind)
            .unwrap()
    };

    // Soil passes first time
    let soil = source(SourceKind::Soil);
    assert_eq!(soil.tier, ProvenanceTier::Primary);
    assert!((soil.quality.unwrap() - 0.75).abs() < 1e-9);

    // Cloudy scene is rejected, the widened window is accepted
    let satellite = source(SourceKind::Satellite);
    assert_eq!(satellite.tier, ProvenanceTier::Relaxed);
    assert!(matches!(satellite.attempts[0].outcome, AttemptOutcome::Rejected { .. }));
    assert!(satellite.attempts[1].outcome.is_accepted());

    // Weather exhausts every tier
    let weather = source(SourceKind::Weather);
    assert_eq!(weather.tier, ProvenanceTier::Unavailable);
    assert_eq!(weather.attempts.len(), ProvenanceTier::PRODUCING.len());
    assert!(rec.data_quality.unavailable.contains(&SourceKind::Weather));
    assert!(rec.data_quality.warnings.iter().any(|w| w.contains("weather")));
    assert!(rec.data_quality.degraded);

    // Repaired pH from the x10 delivery
    let ph = rec.soil.and_then(|s| s.ph).unwrap();
    assert!((ph - 5.8).abs() < 1e-9);

    let rice = rec.results(VarietyCategory::Rice);
    assert!(!rice.is_empty());
    for r in rice {
        assert!(r.reduced_certainty);
        assert!(r.excluded_weight_fraction > 0.0);
        assert!(r.variety_id.starts_with("RICE_04"));
    }
    for r in rec.all_results() {
        assert!((0.0..=1.0).contains(&r.score));
        assert!((0.0..=1.0).contains(&r.confidence));
        assert!((2.0..=15.0).contains(&r.carbon_potential.value));
    }

    // Same farm with weather present: top rice confidence goes up
    let with_weather = engine_with(
        EngineConfig::default(),
        FixtureFetcher::wayanad_demo(as_of()).with_source(SourceKind::Weather, weather_fixture(0.9)),
        BaselineTable::empty(),
    );
    let full = with_weather
        .recommend(&wayanad_request("wayanad"), &CancellationToken::new())
        .await
        .unwrap();
    let degraded_top = rec.top(VarietyCategory::Rice).unwrap();
    let full_top = full.top(VarietyCategory::Rice).unwrap();
    assert!(degraded_top.confidence < full_top.confidence);
    assert!(!full_top.reduced_certainty);

    let scenario = rec.carbon_scenario.as_ref().unwrap();
    assert!(scenario.blended_per_ha > 0.0);
    assert!(scenario.estimated_revenue > scenario.estimated_credits);
}

#[tokio::test]
async fn test_all_sources_unavailable_is_insufficient_data() {
    let engine = engine_with(EngineConfig::default(), FixtureFetcher::default(), BaselineTable::empty());
    let err = engine
        .recommend(&wayanad_request("empty"), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        EngineError::InsufficientData { exhausted } => {
            assert_eq!(exhausted.len(), SourceKind::ALL.len());
            for (_, tiers) in exhausted {
                assert_eq!(tiers, ProvenanceTier::PRODUCING.to_vec());
            }
        }
        other => panic!("expected InsufficientData, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cancel_one_request_leaves_other_running() {
    let mut slow_satellite = SourceFixture::default();
    slow_satellite.delay_ms = 10_000;
    let fetcher = FixtureFetcher::default()
        .with_source(SourceKind::Satellite, slow_satellite)
        .with_source(SourceKind::Soil, soil_fixture(0));
    let engine = engine_with(EngineConfig::default(), fetcher, BaselineTable::empty());

    let mut slow = wayanad_request("slow");
    slow.sources = Some(vec![SourceKind::Satellite]);
    let mut fast = wayanad_request("fast");
    fast.sources = Some(vec![SourceKind::Soil]);

    let slow_token = CancellationToken::new();
    let fast_token = CancellationToken::new();
    let canceller = {
        let token = slow_token.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        }
    };

    let run = async {
        tokio::join!(
            engine.recommend(&slow, &slow_token),
            engine.recommend(&fast, &fast_token),
            canceller,
        )
    };
    let (slow_result, fast_result, ()) = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("cancellation should not wait for the slow provider");

    assert!(matches!(slow_result, Err(EngineError::Cancelled { ref farm_id }) if farm_id == "slow"));
    let fast_rec = fast_result.unwrap();
    assert_eq!(fast_rec.farm_id, "fast");
    assert!(!fast_token.is_cancelled());
}

#[tokio::test]
async fn test_tier_timeout_advances_cascade() {
    let mut config = EngineConfig::default();
    config.cascade.tier_timeout_ms = 50;
    config.cascade.cascade_timeout_ms = 1_000;

    let fetcher = FixtureFetcher::default()
        .with_source(SourceKind::Soil, soil_fixture(500))
        .with_source(SourceKind::Weather, weather_fixture(0.9));
    let engine = engine_with(config, fetcher, BaselineTable::empty());

    let mut request = wayanad_request("timeouts");
    request.sources = Some(vec![SourceKind::Soil, SourceKind::Weather]);

    let rec = tokio::time::timeout(
        Duration::from_secs(5),
        engine.recommend(&request, &CancellationToken::new()),
    )
    .await
    .unwrap()
    .unwrap();

    let soil = rec
        .data_quality
        .sources
        .iter()
        .find(|s| s.kind == SourceKind::Soil)
        .unwrap();
    assert_eq!(soil.tier, ProvenanceTier::Unavailable);
    assert_eq!(soil.attempts[0].outcome, AttemptOutcome::TimedOut);
    assert_eq!(soil.attempts[1].outcome, AttemptOutcome::TimedOut);

    let weather = rec
        .data_quality
        .sources
        .iter()
        .find(|s| s.kind == SourceKind::Weather)
        .unwrap();
    assert_eq!(weather.tier, ProvenanceTier::Primary);
    assert!(rec.soil.is_none());
}

#[tokio::test]
async fn test_no_eligible_varieties_is_reported() {
    // One variety, eligible only far from the farm
    let zones = Arc::new(ZoneTable::builtin());
    let varieties = VarietyDatabase::from_json(
        r#"[{"id": "RICE_900", "name": "Highland", "category": "rice",
             "zones": ["zone_1_western_himalayan"], "soil_preference": "Neutral",
             "water_requirement": "High", "market_value": "Good",
             "carbon_potential": [2.0, 3.0]}]"#,
        &zones,
    )
    .unwrap();
    let engine = RecommendationEngine::new(
        EngineConfig::default(),
        Arc::clone(&zones),
        Arc::new(varieties),
        Arc::new(BaselineTable::from_zones(&zones)),
        Arc::new(FixtureFetcher::wayanad_demo(as_of())),
    )
    .unwrap();

    let rec = engine
        .recommend(&wayanad_request("nothing-fits"), &CancellationToken::new())
        .await
        .unwrap();
    assert!(rec.is_empty());
    assert!(rec.carbon_scenario.is_none());
    match &rec.status {
        RecommendationStatus::NoEligibleVarieties { reason } => {
            assert!(reason.contains("zone_12_west_coast"))
        }
        other => panic!("expected NoEligibleVarieties, got {other:?}"),
    }
}

#[tokio::test]
async fn test_batch_matches_single_requests() {
    let engine = engine_with(
        EngineConfig::default(),
        FixtureFetcher::wayanad_demo(as_of()),
        BaselineTable::from_zones(&ZoneTable::builtin()),
    );

    let mut offshore = wayanad_request("offshore");
    offshore.coordinate = Coordinate::new(0.0, -30.0);
    let requests = vec![wayanad_request("a"), offshore, wayanad_request("b")];

    let outcomes = engine.recommend_many(&requests, &CancellationToken::new()).await;
    assert_eq!(outcomes.len(), 3);
    assert!(matches!(outcomes[1], Err(EngineError::ZoneUnresolved { .. })));

    let a = outcomes[0].as_ref().unwrap();
    let b = outcomes[2].as_ref().unwrap();
    let ids = |rec: &Recommendation| {
        rec.all_results().map(|r| r.variety_id.clone()).collect::<Vec<_>>()
    };
    assert_eq!(ids(a), ids(b));
    assert_eq!(a.confidence, b.confidence);
}

#[test]
fn test_parallel_scoring_matches_sequential() {
    let zones = Arc::new(ZoneTable::builtin());
    let engine = engine_with(
        EngineConfig::default(),
        FixtureFetcher::default(),
        BaselineTable::from_zones(&zones),
    );
    let classifier = ZoneClassifier::new(Arc::clone(&zones), EngineConfig::default().zones);

    // Farms along the west coast with slightly different soils
    let profiles: Vec<FarmProfile> = (0..8)
        .map(|i| {
            let coordinate = Coordinate::new(10.0 + i as f64 * 0.5, 76.0);
            let zone = classifier.classify(&coordinate).unwrap();
            let soil = SourceReading {
                kind: SourceKind::Soil,
                payload: SourcePayload::Soil(SoilPayload {
                    ph: 5.5 + i as f64 * 0.2,
                    clay_pct: 30.0,
                    sand_pct: 40.0,
                    silt_pct: 30.0,
                    soc_pct: 1.0 + i as f64 * 0.1,
                    cec: 150.0,
                }),
                raw_quality: None,
                observed_at: as_of(),
                tier: ProvenanceTier::Primary,
                quality: 0.8,
            };
            let sources = BTreeMap::from([
                (SourceKind::Soil, SourceSlot::Accepted(soil)),
                (SourceKind::Weather, SourceSlot::Missing { exhausted: ProvenanceTier::PRODUCING.to_vec() }),
            ]);
            FarmProfile::new(
                format!("farm-{i}"),
                coordinate,
                zone.zone,
                zone.method,
                zone.distance_km,
                sources,
                FarmerPreferences::default(),
            )
        })
        .collect();

    let parallel = engine.score_profiles_parallel(&profiles);
    let sequential: Vec<_> = profiles.iter().map(|p| engine.score_profile(p)).collect();
    assert_eq!(parallel, sequential);
    assert_eq!(parallel.len(), profiles.len());
    assert!(parallel.iter().all(Result::is_ok));

    let summary = DataQualitySummary::from_profile(&profiles[0]);
    assert_eq!(summary.unavailable, vec![SourceKind::Weather]);
    let satellite = summary.sources.iter().find(|s| s.kind == SourceKind::Satellite).unwrap();
    assert!(!satellite.requested);
}

fn west_coast_profile(farm_id: &str, sources: BTreeMap<SourceKind, SourceSlot>) -> FarmProfile {
    let zones = Arc::new(ZoneTable::builtin());
    let classifier = ZoneClassifier::new(zones, EngineConfig::default().zones);
    let coordinate = Coordinate::new(WAYANAD.0, WAYANAD.1);
    let zone = classifier.classify(&coordinate).unwrap();
    FarmProfile::new(
        farm_id,
        coordinate,
        zone.zone,
        zone.method,
        zone.distance_km,
        sources,
        FarmerPreferences::default(),
    )
}

#[test]
fn test_scoring_profile_without_readings_is_insufficient_data() {
    let engine = engine_with(EngineConfig::default(), FixtureFetcher::default(), BaselineTable::empty());
    let missing = || SourceSlot::Missing { exhausted: ProvenanceTier::PRODUCING.to_vec() };
    let starved = west_coast_profile(
        "starved",
        SourceKind::ALL.iter().map(|k| (*k, missing())).collect(),
    );

    match engine.score_profile(&starved) {
        Err(EngineError::InsufficientData { exhausted }) => {
            assert_eq!(exhausted.len(), SourceKind::ALL.len());
            assert!(exhausted.iter().all(|(_, tiers)| *tiers == ProvenanceTier::PRODUCING));
        }
        other => panic!("expected InsufficientData, got {other:?}"),
    }

    // Nothing requested at all is just as empty
    let unrequested = west_coast_profile("unrequested", BTreeMap::new());
    assert!(matches!(
        engine.score_profile(&unrequested),
        Err(EngineError::InsufficientData { ref exhausted }) if exhausted.is_empty()
    ));

    // A starved farm in a batch fails alone
    let weather = SourceReading {
        kind: SourceKind::Weather,
        payload: SourcePayload::Weather(WeatherPayload {
            annual_rainfall_mm: 2800.0,
            mean_temp_c: 26.0,
            mean_humidity_pct: 80.0,
            heat_stress_days: 2.0,
            drought_stress_days: 0.0,
        }),
        raw_quality: None,
        observed_at: as_of(),
        tier: ProvenanceTier::HistoricalBaseline,
        quality: 0.5,
    };
    let fed = west_coast_profile(
        "fed",
        BTreeMap::from([(SourceKind::Weather, SourceSlot::Accepted(weather))]),
    );
    let outcomes = engine.score_profiles_parallel(&[fed, starved]);
    assert!(outcomes[0].as_ref().is_ok_and(|r| !r.is_empty()));
    assert!(matches!(outcomes[1], Err(EngineError::InsufficientData { .. })));
}

#[tokio::test]
async fn test_empty_source_override_is_rejected() {
    let engine = engine_with(
        EngineConfig::default(),
        FixtureFetcher::wayanad_demo(as_of()),
        BaselineTable::empty(),
    );
    let mut request = wayanad_request("none");
    request.sources = Some(Vec::new());
    let err = engine
        .recommend(&request, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRequest { ref farm_id, .. } if farm_id == "none"));
}
