//! Fallback cascade
//!
//! - `state.rs` - Monotone tier cursor and attempt log
//! - `controller.rs` - Async tier driver with timeouts
//! - `interpolation.rs` - Inverse-distance synthesis from neighbours
//! - `baseline.rs` - Per-zone historical baselines

pub mod state;
pub mod controller;
pub mod interpolation;
pub mod baseline;

pub use baseline::{BaselineTable, ZoneBaseline};
pub use controller::{CascadeTarget, FallbackCascadeController};
pub use state::{AttemptOutcome, CascadeResult, CascadeState, TierAttempt};
