//! Source fetching seam
//!
//! Raw provider clients live outside the engine. The engine talks to them
//! through [`SourceFetcher`], keyed by (source kind, coordinate, time window),
//! and receives either a payload with its raw quality vector or an explicit
//! not-available signal.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AcquisitionParams;
use crate::model::{Coordinate, ProvenanceTier, RawObservation, SourceKind, TimeWindow};

pub mod fixture;

pub use fixture::{FixtureFetcher, SourceFixture};

/// One fetch attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchRequest {
    pub kind: SourceKind,
    pub coordinate: Coordinate,
    pub window: TimeWindow,
    pub params: AcquisitionParams,
    /// Cascade tier issuing the request
    pub tier: ProvenanceTier,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Observed(RawObservation),
    /// Provider has no data for this request
    NotAvailable,
    /// Transport or provider error; treated like a rejected reading
    Failed(String),
}

/// Observation at a nearby location, used for interpolation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborObservation {
    pub coordinate: Coordinate,
    pub observation: RawObservation,
}

/// External data provider for all source kinds
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Provider identifier for logs
    fn source_id(&self) -> &'static str;

    async fn fetch(&self, request: &FetchRequest) -> FetchOutcome;

    /// Observations of `kind` near `coordinate` within `window`.
    ///
    /// Providers without spatial search return nothing, which makes the
    /// interpolation tier fail over to the historical baseline.
    async fn neighbors(
        &self,
        _kind: SourceKind,
        _coordinate: Coordinate,
        _window: TimeWindow,
        _radius_km: f64,
    ) -> Vec<NeighborObservation> {
        Vec::new()
    }
}
