//! Variety reference data
//!
//! - `record.rs` - VarietyRecord, category and agronomic descriptors
//! - `database.rs` - Built-in 147-entry database and file loading

pub mod record;
pub mod database;

pub use record::{MarketValue, VarietyCategory, VarietyEntry, VarietyRecord, WaterRequirement};
pub use database::VarietyDatabase;
