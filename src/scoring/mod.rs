//! Scoring
//!
//! Pure, synchronous scoring of one fused farm profile:
//!
//! - `comparator.rs` - Tolerance band match with linear decay
//! - `suitability.rs` - Weighted per-dimension suitability
//! - `confidence.rs` - Tier-discounted confidence aggregation
//! - `carbon.rs` - Bounded carbon potential and farm scenario
//! - `ranker.rs` - Deterministic per-category ranking

pub mod comparator;
pub mod suitability;
pub mod confidence;
pub mod carbon;
pub mod ranker;

pub use carbon::{CarbonEstimate, CarbonPotentialEstimator, FarmCarbonScenario, ScenarioPick, ScenarioRole};
pub use comparator::{compare_to_band, BandComparison, BandFit};
pub use confidence::{ConfidenceAggregator, SourceContribution};
pub use ranker::{compare_results, RankedCategories, RecommendationRanker};
pub use suitability::{Dimension, DimensionScore, SuitabilityScore, SuitabilityScorer};
