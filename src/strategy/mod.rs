//! Strategy system
//!
//! Everything between "which strategies exist" and "how big is the trade":
//!
//! ## Catalog
//! - `types` - Risk tiers, strategy classification, the `Strategy` record
//! - `catalog` - Read-only registry of absorbed strategies
//!
//! ## Decision
//! - `selector` - Risk/asset filtering and ranking per pilot
//! - `admission` - Pluggable gate deciding whether a strategy fires
//! - `sizing` - Risk-scaled position sizing
//! - `randomization` - Seeded randomness shared by the engine

// Shared types
pub mod types;

// Catalog
pub mod catalog;

// Decision
pub mod admission;
pub mod randomization;
pub mod selector;
pub mod sizing;

// Re-exports
pub use admission::{
    admission_probability, FixedSignalEvaluator, ProbabilisticSignalEvaluator, SignalDecision,
    SignalEvaluator,
};
pub use catalog::StrategyCatalog;
pub use randomization::{RandomizationConfig, Randomizer};
pub use selector::select_strategies_for_pilot;
pub use sizing::{PositionSizer, PositionSizingConfig, SizeExplanation, SizingContext};
pub use types::*;
