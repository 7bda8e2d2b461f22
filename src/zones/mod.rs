//! Agro-climatic zones
//!
//! - `table.rs` - Zone reference entities and the built-in 15-zone table
//! - `classifier.rs` - Coordinate to zone resolution (boundary, then nearest
//!   centroid within an admissible distance)

pub mod table;
pub mod classifier;

pub use table::{BoundingBox, ClimateRegime, Zone, ZoneTable};
pub use classifier::{haversine_km, MatchMethod, ZoneClassifier, ZoneMatch};
