//! Engine error taxonomy
//!
//! Only request-fatal or startup-fatal conditions are returned as `Err`.
//! `SourceUnavailable` is recorded in the recommendation's data-quality
//! summary, and `NoEligibleVarieties` travels as a recommendation status.

use crate::model::{ProvenanceTier, SourceKind};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// Coordinate outside the admissible distance of every zone, or outside
    /// the national bounding box.
    #[error("zone unresolved for ({latitude:.6}, {longitude:.6}): {reason}")]
    ZoneUnresolved {
        latitude: f64,
        longitude: f64,
        reason: String,
    },

    /// One source kind exhausted its cascade.
    #[error("source {kind} unavailable after tiers {exhausted:?}")]
    SourceUnavailable {
        kind: SourceKind,
        exhausted: Vec<ProvenanceTier>,
    },

    /// Every candidate variety scored 0 for the zone.
    #[error("no eligible varieties for zone {zone_id}")]
    NoEligibleVarieties { zone_id: String },

    /// Every requested source kind reached UNAVAILABLE.
    #[error("insufficient data: all sources unavailable ({})", format_exhausted(.exhausted))]
    InsufficientData {
        exhausted: Vec<(SourceKind, Vec<ProvenanceTier>)>,
    },

    /// Request that cannot be served as written.
    #[error("invalid request {farm_id}: {reason}")]
    InvalidRequest { farm_id: String, reason: String },

    /// Malformed weights, thresholds or bounds.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("request {farm_id} cancelled")]
    Cancelled { farm_id: String },
}

fn format_exhausted(exhausted: &[(SourceKind, Vec<ProvenanceTier>)]) -> String {
    exhausted
        .iter()
        .map(|(kind, tiers)| {
            let tiers: Vec<&str> = tiers.iter().map(|t| t.as_str()).collect();
            format!("{}: {}", kind, tiers.join(" -> "))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

impl EngineError {
    /// True for errors that abort the whole request.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            EngineError::SourceUnavailable { .. } | EngineError::NoEligibleVarieties { .. }
        )
    }
}
