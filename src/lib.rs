//! AutoPilot Engine Library
//!
//! Per-user automated portfolio pilots: strategy selection from an absorbed
//! catalog, narrated trades, behavioral risk discovery, social proof,
//! counterfactual time travel and exit ramps.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod learning;
pub mod lifecycle;
pub mod narrative;
pub mod oracle;
pub mod pilot;
pub mod social;
pub mod store;
pub mod strategy;

// Re-export commonly used types
pub use config::Config;
pub use engine::{AutopilotEngine, CycleReport, EngineBuilder, GlobalStats, Scheduler};
pub use error::{Error, Result};
pub use events::{EngineEvent, EventBus};
pub use lifecycle::{ExitRamp, ExitStrategy, TimeTravelResult, TimeTravelScenario};
pub use pilot::{Pilot, PilotPreferences, PilotSnapshot, PilotStatus, Trade, WatchStream};
pub use strategy::{RiskDna, Strategy};
