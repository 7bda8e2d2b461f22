//! Data quality
//!
//! - `assessor.rs` - Per-kind weighted quality scoring and accept/reject
//! - `soil_descriptors.rs` - pH repair, pH/texture/nutrient status, vegetation health

pub mod assessor;
pub mod soil_descriptors;

pub use assessor::{DataQualityAssessor, QualityAssessment};
pub use soil_descriptors::{
    normalize_ph, vegetation_health, NutrientStatus, PhStatus, SoilDescriptors, TextureClass,
    VegetationHealth,
};
