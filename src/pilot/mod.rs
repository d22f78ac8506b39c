//! Pilot registry
//!
//! Per-user state: profile, watch stream, behavioral counters, discovered risk,
//! social proof, exit ramp and performance history. Each pilot's state sits
//! behind a single mutex (see `store::PilotHandle`); all mutation goes through it.

pub mod trade;
pub mod types;
pub mod watch;

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::learning::discovery::{BehaviorCounters, RiskDnaDiscovery};
use crate::lifecycle::exit_ramp::ExitRamp;
use crate::social::SocialProof;

pub use trade::{Trade, TradeNarrative, TradeReasoning, TradeRef, TradeSide, TradeStatus};
pub use types::{
    AssetMix, DepositMode, PerformancePoint, Pilot, PilotPreferences, PilotStatus,
    PlainEnglishLevel, TradingStyle,
};
pub use watch::{CommentaryEntry, WatchConfig, WatchStream};

/// Everything the engine tracks for one pilot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PilotState {
    pub pilot: Pilot,
    pub watch: WatchStream,
    #[serde(default)]
    pub behavior: BehaviorCounters,
    #[serde(default)]
    pub discovery: Option<RiskDnaDiscovery>,
    #[serde(default)]
    pub social_proof: Option<SocialProof>,
    #[serde(default)]
    pub exit_ramp: Option<ExitRamp>,
    #[serde(default)]
    pub history: VecDeque<PerformancePoint>,
}

impl PilotState {
    pub fn new(pilot: Pilot, recent_capacity: usize, commentary_capacity: usize) -> Self {
        let watch = WatchStream::new(&pilot.id, recent_capacity, commentary_capacity);
        Self {
            pilot,
            watch,
            behavior: BehaviorCounters::default(),
            discovery: None,
            social_proof: None,
            exit_ramp: None,
            history: VecDeque::new(),
        }
    }

    /// Append a performance point, keeping at most `capacity`
    pub fn push_history(&mut self, point: PerformancePoint, capacity: usize) {
        self.history.push_back(point);
        while self.history.len() > capacity.max(1) {
            self.history.pop_front();
        }
    }
}

/// Read-only view of a pilot returned by `get_snapshot`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PilotSnapshot {
    pub pilot: Pilot,
    pub watch_enabled: bool,
    pub pending_trades: usize,
    pub recent_trades: Vec<Trade>,
    pub history: Vec<PerformancePoint>,
    pub discovery: Option<RiskDnaDiscovery>,
    pub social_proof: Option<SocialProof>,
    pub exit_ramp: Option<ExitRamp>,
}

impl From<&PilotState> for PilotSnapshot {
    fn from(state: &PilotState) -> Self {
        Self {
            pilot: state.pilot.clone(),
            watch_enabled: state.watch.enabled,
            pending_trades: state.watch.pending_trades.len(),
            recent_trades: state.watch.recent_trades.iter().cloned().collect(),
            history: state.history.iter().cloned().collect(),
            discovery: state.discovery.clone(),
            social_proof: state.social_proof.clone(),
            exit_ramp: state.exit_ramp.clone(),
        }
    }
}
