//! Crop and Agroforestry Recommendation Engine
//!
//! Turns a farm coordinate plus remotely sensed observations into ranked
//! variety recommendations with explicit confidence and carbon estimates.
//!
//! Module layout:
//! - `zones/`: 15 agro-climatic zones and coordinate classification
//! - `varieties/`: 147-entry variety reference database
//! - `quality/`: Per-source data quality scoring and soil descriptors
//! - `fetch/`: External data provider seam plus a fixture provider
//! - `cascade/`: PRIMARY -> RELAXED -> INTERPOLATED -> HISTORICAL_BASELINE fallback
//! - `scoring/`: Suitability, confidence, carbon potential and ranking
//! - `engine`: End-to-end orchestration of one or many farm requests
//!
//! Reference tables are loaded once and shared read-only; nothing mutable is
//! kept between requests.

pub mod error;
pub mod config;
pub mod model;
pub mod zones;
pub mod varieties;
pub mod quality;
pub mod profile;
pub mod fetch;
pub mod cascade;
pub mod scoring;
pub mod recommendation;
pub mod engine;

// Re-export commonly used types
pub use cascade::{BaselineTable, CascadeResult, FallbackCascadeController};
pub use config::EngineConfig;
pub use engine::RecommendationEngine;
pub use error::EngineError;
pub use fetch::{FetchOutcome, FetchRequest, FixtureFetcher, SourceFetcher};
pub use model::{Coordinate, ProvenanceTier, SourceKind, SourcePayload, SourceReading};
pub use profile::{FarmProfile, FarmRequest, FarmerPreferences, Practice};
pub use quality::DataQualityAssessor;
pub use recommendation::{Recommendation, RecommendationStatus, SuitabilityResult};
pub use scoring::{
    CarbonPotentialEstimator, ConfidenceAggregator, RecommendationRanker, SuitabilityScorer,
};
pub use varieties::{VarietyCategory, VarietyDatabase, VarietyRecord};
pub use zones::{Zone, ZoneClassifier, ZoneTable};

// Expose tokio-util's token so callers need not depend on it directly
pub use tokio_util::sync::CancellationToken;
