//! Fixture-backed fetcher
//!
//! Serves canned observations per source kind and tier, with an optional
//! per-attempt delay for exercising timeouts. Used by the CLI (JSON fixture
//! files) and by tests, plus one built-in demonstration farm.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use super::{FetchOutcome, FetchRequest, NeighborObservation, SourceFetcher};
use crate::model::{
    Coordinate, PricePayload, PriceQuality, ProvenanceTier, QualityVector, RawObservation,
    SatellitePayload, SatelliteQuality, SoilPayload, SoilQuality, SourceKind, SourcePayload,
    TimeWindow,
};
use crate::zones::haversine_km;

/// Canned responses for one source kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceFixture {
    pub primary: Option<RawObservation>,
    pub relaxed: Option<RawObservation>,
    pub neighbors: Vec<NeighborObservation>,
    /// Delay before every fetch of this kind
    pub delay_ms: u64,
    /// Respond with a provider error instead of data
    pub fail: bool,
}

#[derive(Debug, Default)]
pub struct FixtureFetcher {
    sources: FxHashMap<SourceKind, SourceFixture>,
    attempts: Mutex<Vec<(SourceKind, ProvenanceTier)>>,
}

impl FixtureFetcher {
    pub fn new(sources: FxHashMap<SourceKind, SourceFixture>) -> Self {
        Self {
            sources,
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Load a fixture file: an object keyed by source kind
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture file: {:?}", path))?;
        let sources: FxHashMap<SourceKind, SourceFixture> =
            serde_json::from_str(&contents).with_context(|| "Failed to parse fixture JSON")?;
        Ok(Self::new(sources))
    }

    pub fn with_source(mut self, kind: SourceKind, fixture: SourceFixture) -> Self {
        self.sources.insert(kind, fixture);
        self
    }

    /// Fetch attempts seen so far, in arrival order
    pub fn attempts(&self) -> Vec<(SourceKind, ProvenanceTier)> {
        self.attempts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Wayanad, Kerala: good soil, cloudy satellite scene that passes once the
    /// window is widened, no weather at all.
    pub fn wayanad_demo(as_of: DateTime<Utc>) -> Self {
        let soil = RawObservation {
            payload: SourcePayload::Soil(SoilPayload {
                ph: 58.0, // delivered as pH x 10
                clay_pct: 32.0,
                sand_pct: 38.0,
                silt_pct: 30.0,
                soc_pct: 2.4,
                cec: 180.0,
            }),
            quality: QualityVector::Soil(SoilQuality {
                depth_coverage: Some(0.75),
                uncertainty: Some(0.25),
                property_completeness: Some(0.75),
            }),
            observed_at: as_of,
        };
        let cloudy = |q: f64, ndvi: f64| RawObservation {
            payload: SourcePayload::Satellite(SatellitePayload { ndvi, evi: ndvi * 0.6, lai: ndvi * 5.0 }),
            quality: QualityVector::Satellite(SatelliteQuality {
                cloud_free_fraction: Some(q),
                valid_pixel_density: Some(q),
                temporal_consistency: Some(q),
                spatial_completeness: Some(q),
            }),
            observed_at: as_of,
        };
        let price = RawObservation {
            payload: SourcePayload::Price(PricePayload {
                rice_index: 1.1,
                crops_index: 1.3,
                agroforestry_index: 0.95,
            }),
            quality: QualityVector::Price(PriceQuality {
                historical_deviation: Some(0.1),
                market_coverage: Some(0.8),
                recency: Some(0.9),
            }),
            observed_at: as_of,
        };

        Self::default()
            .with_source(
                SourceKind::Soil,
                SourceFixture { primary: Some(soil), ..SourceFixture::default() },
            )
            .with_source(
                SourceKind::Satellite,
                SourceFixture {
                    primary: Some(cloudy(0.4, 0.48)),
                    relaxed: Some(cloudy(0.55, 0.62)),
                    ..SourceFixture::default()
                },
            )
            .with_source(
                SourceKind::Price,
                SourceFixture { primary: Some(price), ..SourceFixture::default() },
            )
    }

    fn record(&self, kind: SourceKind, tier: ProvenanceTier) {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push((kind, tier));
        }
    }
}

#[async_trait]
impl SourceFetcher for FixtureFetcher {
    fn source_id(&self) -> &'static str {
        "fixture"
    }

    async fn fetch(&self, request: &FetchRequest) -> FetchOutcome {
        self.record(request.kind, request.tier);
        let Some(fixture) = self.sources.get(&request.kind) else {
            return FetchOutcome::NotAvailable;
        };
        if fixture.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(fixture.delay_ms)).await;
        }
        if fixture.fail {
            return FetchOutcome::Failed(format!("fixture provider error for {}", request.kind));
        }
        let observation = match request.tier {
            ProvenanceTier::Primary => fixture.primary.as_ref(),
            ProvenanceTier::Relaxed => fixture.relaxed.as_ref(),
            _ => None,
        };
        match observation {
            Some(obs) => FetchOutcome::Observed(obs.clone()),
            None => FetchOutcome::NotAvailable,
        }
    }

    async fn neighbors(
        &self,
        kind: SourceKind,
        coordinate: Coordinate,
        window: TimeWindow,
        radius_km: f64,
    ) -> Vec<NeighborObservation> {
        self.record(kind, ProvenanceTier::Interpolated);
        let Some(fixture) = self.sources.get(&kind) else {
            return Vec::new();
        };
        fixture
            .neighbors
            .iter()
            .filter(|n| haversine_km(&coordinate, &n.coordinate) <= radius_km)
            .filter(|n| window.contains(n.observation.observed_at))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AcquisitionParams;
    use chrono::TimeZone;

    fn request(kind: SourceKind, tier: ProvenanceTier, as_of: DateTime<Utc>) -> FetchRequest {
        FetchRequest {
            kind,
            coordinate: Coordinate::new(11.546179, 76.41653),
            window: TimeWindow::ending_at(as_of, 30),
            params: AcquisitionParams::default(),
            tier,
        }
    }

    #[tokio::test]
    async fn test_demo_serves_per_tier() {
        let as_of = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let f = FixtureFetcher::wayanad_demo(as_of);

        let primary = f.fetch(&request(SourceKind::Satellite, ProvenanceTier::Primary, as_of)).await;
        let relaxed = f.fetch(&request(SourceKind::Satellite, ProvenanceTier::Relaxed, as_of)).await;
        assert!(matches!(primary, FetchOutcome::Observed(_)));
        assert_ne!(primary, relaxed);

        let weather = f.fetch(&request(SourceKind::Weather, ProvenanceTier::Primary, as_of)).await;
        assert_eq!(weather, FetchOutcome::NotAvailable);

        assert_eq!(
            f.attempts(),
            vec![
                (SourceKind::Satellite, ProvenanceTier::Primary),
                (SourceKind::Satellite, ProvenanceTier::Relaxed),
                (SourceKind::Weather, ProvenanceTier::Primary),
            ]
        );
    }

    #[tokio::test]
    async fn test_neighbors_filtered_by_radius() {
        let as_of = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let obs = |lat: f64, lon: f64| NeighborObservation {
            coordinate: Coordinate::new(lat, lon),
            observation: RawObservation {
                payload: SourcePayload::Satellite(SatellitePayload { ndvi: 0.5, evi: 0.3, lai: 2.0 }),
                quality: QualityVector::Satellite(SatelliteQuality::default()),
                observed_at: as_of,
            },
        };
        let f = FixtureFetcher::default().with_source(
            SourceKind::Satellite,
            SourceFixture {
                neighbors: vec![obs(11.56, 76.42), obs(13.0, 77.6)],
                ..SourceFixture::default()
            },
        );
        let found = f
            .neighbors(
                SourceKind::Satellite,
                Coordinate::new(11.546179, 76.41653),
                TimeWindow::ending_at(as_of, 90),
                50.0,
            )
            .await;
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_fixture_json_shape() {
        let json = r#"{
            "price": {
                "primary": {
                    "payload": {"kind": "price", "rice_index": 1.0, "crops_index": 1.0, "agroforestry_index": 1.0},
                    "quality": {"kind": "price", "market_coverage": 0.9},
                    "observed_at": "2024-06-01T00:00:00Z"
                },
                "delay_ms": 5
            }
        }"#;
        let sources: FxHashMap<SourceKind, SourceFixture> = serde_json::from_str(json).unwrap();
        let price = &sources[&SourceKind::Price];
        assert!(price.primary.is_some());
        assert!(price.relaxed.is_none());
        assert_eq!(price.delay_ms, 5);
    }
}
