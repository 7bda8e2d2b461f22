//! Spatial interpolation from neighbouring readings
//!
//! Inverse-distance weighting over accepted neighbours of the same kind,
//! each weight also scaled by the neighbour's own quality.

use crate::config::InterpolationConfig;
use crate::fetch::NeighborObservation;
use crate::model::{Coordinate, SourcePayload};
use crate::quality::DataQualityAssessor;
use crate::zones::haversine_km;
use chrono::{DateTime, Utc};

/// Distance floor so a co-located neighbour does not take all the weight
const MIN_DISTANCE_KM: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Interpolated {
    pub payload: SourcePayload,
    pub quality: f64,
    pub observed_at: DateTime<Utc>,
    pub neighbors_used: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TooFewNeighbors {
    pub found: usize,
    pub required: usize,
}

/// Synthesize a reading at `target`.
///
/// Neighbours are assessed with the standard acceptance threshold; rejected
/// ones are ignored. Fails when fewer than `min_neighbors` pass. The result's
/// quality is the mean neighbour quality, capped at `quality_cap_factor`
/// times the best neighbour, so it always sits below the best observed
/// reading.
pub fn interpolate(
    target: &Coordinate,
    neighbors: &[NeighborObservation],
    assessor: &DataQualityAssessor,
    config: &InterpolationConfig,
) -> Result<Interpolated, TooFewNeighbors> {
    let accepted: Vec<(&NeighborObservation, f64)> = neighbors
        .iter()
        .filter_map(|n| {
            let assessment = assessor.assess(&n.observation.quality);
            assessment.accepted.then_some((n, assessment.score))
        })
        .collect();

    let too_few = TooFewNeighbors {
        found: accepted.len(),
        required: config.min_neighbors,
    };
    if accepted.len() < config.min_neighbors || accepted.is_empty() {
        return Err(too_few);
    }

    let weighted: Vec<(SourcePayload, f64)> = accepted
        .iter()
        .map(|(n, quality)| {
            let d = haversine_km(target, &n.coordinate).max(MIN_DISTANCE_KM);
            (n.observation.payload, quality / d)
        })
        .collect();
    let payload = SourcePayload::weighted_mean(&weighted).ok_or(too_few)?;

    let qualities: Vec<f64> = accepted.iter().map(|(_, q)| *q).collect();
    let mean = qualities.iter().sum::<f64>() / qualities.len() as f64;
    let best = qualities.iter().cloned().fold(0.0, f64::max);
    let quality = mean.min(best * config.quality_cap_factor).clamp(0.0, 1.0);

    let observed_at = accepted
        .iter()
        .map(|(n, _)| n.observation.observed_at)
        .max()
        .ok_or(too_few)?;

    Ok(Interpolated {
        payload,
        quality,
        observed_at,
        neighbors_used: accepted.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QualityConfig;
    use crate::model::{QualityVector, RawObservation, WeatherPayload, WeatherQuality};
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn neighbor(lat: f64, lon: f64, rain: f64, q: f64) -> NeighborObservation {
        NeighborObservation {
            coordinate: Coordinate::new(lat, lon),
            observation: RawObservation {
                payload: SourcePayload::Weather(WeatherPayload {
                    annual_rainfall_mm: rain,
                    mean_temp_c: 26.0,
                    mean_humidity_pct: 80.0,
                    heat_stress_days: 0.0,
                    drought_stress_days: 10.0,
                }),
                quality: QualityVector::Weather(WeatherQuality {
                    temporal_completeness: Some(q),
                    station_agreement: Some(q),
                    recency: Some(q),
                }),
                observed_at: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            },
        }
    }

    fn assessor() -> DataQualityAssessor {
        DataQualityAssessor::new(QualityConfig::default())
    }

    #[test]
    fn test_requires_min_accepted_neighbors() {
        let target = Coordinate::new(11.5, 76.4);
        // Second neighbour fails quality and does not count
        let neighbors = vec![neighbor(11.6, 76.4, 3000.0, 0.9), neighbor(11.4, 76.4, 2000.0, 0.3)];
        let err = interpolate(&target, &neighbors, &assessor(), &InterpolationConfig::default())
            .unwrap_err();
        assert_eq!(err, TooFewNeighbors { found: 1, required: 2 });
    }

    #[test]
    fn test_equidistant_neighbors_blend_evenly() {
        let target = Coordinate::new(11.5, 76.4);
        let neighbors = vec![neighbor(11.6, 76.4, 3000.0, 0.8), neighbor(11.4, 76.4, 2000.0, 0.8)];
        let out = interpolate(&target, &neighbors, &assessor(), &InterpolationConfig::default())
            .unwrap();
        match out.payload {
            SourcePayload::Weather(w) => assert_relative_eq!(w.annual_rainfall_mm, 2500.0, epsilon = 1.0),
            other => panic!("unexpected payload {:?}", other),
        }
        assert_eq!(out.neighbors_used, 2);
    }

    #[test]
    fn test_quality_capped_below_best_neighbor() {
        let target = Coordinate::new(11.5, 76.4);
        let neighbors = vec![neighbor(11.6, 76.4, 3000.0, 0.95), neighbor(11.4, 76.4, 2000.0, 0.95)];
        let out = interpolate(&target, &neighbors, &assessor(), &InterpolationConfig::default())
            .unwrap();
        assert!(out.quality < 0.95);
        assert_relative_eq!(out.quality, 0.95 * 0.9, epsilon = 1e-9);
    }
}
