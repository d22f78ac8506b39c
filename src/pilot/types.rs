//! Core pilot types
//!
//! Profile, preferences, capital and performance fields, and the status lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::strategy::types::RiskDna;

/// Pilot lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PilotStatus {
    Active,
    Paused,
    Exiting,
    Closed,
}

impl PilotStatus {
    /// Allowed moves: active <-> paused, active|paused -> exiting, exiting -> closed
    pub fn can_transition_to(self, next: PilotStatus) -> bool {
        use PilotStatus::*;
        matches!(
            (self, next),
            (Active, Paused) | (Paused, Active) | (Active, Exiting) | (Paused, Exiting) | (Exiting, Closed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PilotStatus::Closed)
    }
}

impl fmt::Display for PilotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PilotStatus::Active => write!(f, "active"),
            PilotStatus::Paused => write!(f, "paused"),
            PilotStatus::Exiting => write!(f, "exiting"),
            PilotStatus::Closed => write!(f, "closed"),
        }
    }
}

/// How the user funds the pilot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositMode {
    #[default]
    LumpSum,
    RecurringWeekly,
    RecurringMonthly,
    RoundUps,
}

/// How often the user expects the pilot to trade. Profile only: every style
/// gets the same top-N candidates and per-cycle trade cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingStyle {
    Passive,
    #[default]
    Balanced,
    Active,
}

/// Asset restriction chosen by the user. Unknown values are kept as `Unrecognized`
/// and treated as "accept all".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetMix {
    #[default]
    Diversified,
    StocksOnly,
    CryptoOnly,
    ForexOnly,
    YieldFocused,
    #[serde(other)]
    Unrecognized,
}

impl FromStr for AssetMix {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "diversified" => AssetMix::Diversified,
            "stocks_only" => AssetMix::StocksOnly,
            "crypto_only" => AssetMix::CryptoOnly,
            "forex_only" => AssetMix::ForexOnly,
            "yield_focused" => AssetMix::YieldFocused,
            _ => AssetMix::Unrecognized,
        })
    }
}

/// Narration tier the user wants to read, from plain metaphor to full detail
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlainEnglishLevel {
    Eli5,
    #[default]
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl PlainEnglishLevel {
    pub const ALL: [PlainEnglishLevel; 5] = [
        PlainEnglishLevel::Eli5,
        PlainEnglishLevel::Beginner,
        PlainEnglishLevel::Intermediate,
        PlainEnglishLevel::Advanced,
        PlainEnglishLevel::Expert,
    ];
}

/// Optional settings supplied at pilot creation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PilotPreferences {
    #[serde(default)]
    pub risk_dna: Option<RiskDna>,
    #[serde(default)]
    pub deposit_mode: Option<DepositMode>,
    #[serde(default)]
    pub trading_style: Option<TradingStyle>,
    #[serde(default)]
    pub asset_mix: Option<AssetMix>,
    #[serde(default)]
    pub plain_english_level: Option<PlainEnglishLevel>,
}

impl PilotPreferences {
    pub fn with_risk(mut self, risk_dna: RiskDna) -> Self {
        self.risk_dna = Some(risk_dna);
        self
    }

    pub fn with_asset_mix(mut self, asset_mix: AssetMix) -> Self {
        self.asset_mix = Some(asset_mix);
        self
    }
}

/// A user's automated portfolio instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pilot {
    pub id: String,
    pub user_id: String,

    // Profile
    pub risk_dna: RiskDna,
    /// Derived from `risk_dna`, 0-100
    pub risk_score: u8,
    pub deposit_mode: DepositMode,
    pub trading_style: TradingStyle,
    pub asset_mix: AssetMix,
    pub plain_english_level: PlainEnglishLevel,

    // Capital
    pub initial_deposit: f64,
    pub total_deposited: f64,
    pub current_value: f64,
    pub total_return: f64,
    pub total_return_percent: f64,

    // Performance
    pub win_rate: f64,
    pub best_day: f64,
    pub worst_day: f64,
    pub total_trades: u64,

    pub status: PilotStatus,
    pub autopilot_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pilot {
    /// Create an active pilot. Validation of the deposit happens in the engine.
    pub fn new(user_id: &str, initial_deposit: f64, preferences: &PilotPreferences) -> Self {
        let risk_dna = preferences.risk_dna.unwrap_or_default();
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            risk_dna,
            risk_score: risk_dna.score(),
            deposit_mode: preferences.deposit_mode.unwrap_or_default(),
            trading_style: preferences.trading_style.unwrap_or_default(),
            asset_mix: preferences.asset_mix.unwrap_or_default(),
            plain_english_level: preferences.plain_english_level.unwrap_or_default(),
            initial_deposit,
            total_deposited: initial_deposit,
            current_value: initial_deposit,
            total_return: 0.0,
            total_return_percent: 0.0,
            win_rate: 0.0,
            best_day: 0.0,
            worst_day: 0.0,
            total_trades: 0,
            status: PilotStatus::Active,
            autopilot_enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Only active pilots with autopilot on are traded
    pub fn is_tradeable(&self) -> bool {
        self.status == PilotStatus::Active && self.autopilot_enabled
    }

    /// Move to a new status, rejecting illegal transitions
    pub fn transition(&mut self, next: PilotStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::invalid_state(
                &self.id,
                format!("cannot move from {} to {}", self.status, next),
            ));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Recompute derived return fields from capital
    pub fn recompute_returns(&mut self) {
        self.total_return = self.current_value - self.total_deposited;
        self.total_return_percent = if self.total_deposited > 0.0 {
            self.total_return / self.total_deposited * 100.0
        } else {
            0.0
        };
    }

    /// Apply one day's return (fraction) to the portfolio value
    pub fn apply_day_return(&mut self, day_return: f64) {
        self.current_value *= 1.0 + day_return;
        if day_return > self.best_day {
            self.best_day = day_return;
        }
        if day_return < self.worst_day {
            self.worst_day = day_return;
        }
        self.recompute_returns();
        self.updated_at = Utc::now();
    }

    pub fn record_deposit(&mut self, amount: f64) {
        self.total_deposited += amount;
        self.current_value += amount;
        self.recompute_returns();
        self.updated_at = Utc::now();
    }
}

/// Periodic performance snapshot appended by the learning loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformancePoint {
    pub timestamp: DateTime<Utc>,
    pub current_value: f64,
    pub total_return: f64,
    pub total_return_percent: f64,
    pub day_return: f64,
    pub total_trades: u64,
}

impl PerformancePoint {
    pub fn capture(pilot: &Pilot, day_return: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            current_value: pilot.current_value,
            total_return: pilot.total_return,
            total_return_percent: pilot.total_return_percent,
            day_return,
            total_trades: pilot.total_trades,
        }
    }
}
