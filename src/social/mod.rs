//! Social Proof Aggregator
//!
//! Ranks each pilot against a cohort of pilots with a similar amount
//! deposited. A pass takes one consistent copy of every pilot's standing, then
//! ranks each subject against it. O(n^2) per pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Social proof configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialProofConfig {
    /// Cohort includes pilots whose deposits are within this fraction of the subject's
    #[serde(default = "default_cohort_band")]
    pub cohort_band: f64,
}

fn default_cohort_band() -> f64 {
    0.5
}

impl Default for SocialProofConfig {
    fn default() -> Self {
        Self {
            cohort_band: default_cohort_band(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocialTier {
    TopTen,
    Beating,
    RoomToGrow,
}

impl SocialTier {
    pub fn from_beating(beating_percent: f64) -> Self {
        if beating_percent >= 90.0 {
            SocialTier::TopTen
        } else if beating_percent >= 50.0 {
            SocialTier::Beating
        } else {
            SocialTier::RoomToGrow
        }
    }
}

impl fmt::Display for SocialTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocialTier::TopTen => write!(f, "top_ten"),
            SocialTier::Beating => write!(f, "beating"),
            SocialTier::RoomToGrow => write!(f, "room_to_grow"),
        }
    }
}

/// A pilot's rank within its cohort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialProof {
    pub pilot_id: String,
    /// Cohort members, subject included
    pub cohort_size: usize,
    /// Top-x percentile (lower is better)
    pub percentile: f64,
    /// Share of other cohort members with a strictly lower return
    pub beating_percent: f64,
    pub tier: SocialTier,
    pub message: String,
    pub computed_at: DateTime<Utc>,
}

/// Copy of the fields ranking needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub pilot_id: String,
    pub total_deposited: f64,
    pub total_return_percent: f64,
}

fn in_cohort(subject: &Standing, other: &Standing, band: f64) -> bool {
    (other.total_deposited - subject.total_deposited).abs() <= subject.total_deposited * band
}

/// Rank `subject` against every standing in `all`
pub fn rank(subject: &Standing, all: &[Standing], band: f64, now: DateTime<Utc>) -> SocialProof {
    let others: Vec<&Standing> = all
        .iter()
        .filter(|s| s.pilot_id != subject.pilot_id)
        .filter(|s| in_cohort(subject, s, band))
        .collect();

    let beating_percent = if others.is_empty() {
        100.0
    } else {
        let beaten = others
            .iter()
            .filter(|s| s.total_return_percent < subject.total_return_percent)
            .count();
        beaten as f64 / others.len() as f64 * 100.0
    };
    let percentile = 100.0 - beating_percent;
    let tier = SocialTier::from_beating(beating_percent);
    let cohort_size = others.len() + 1;

    let message = match tier {
        SocialTier::TopTen => format!(
            "You're in the top 10% of {} pilots with a similar deposit",
            cohort_size
        ),
        SocialTier::Beating => format!(
            "You're beating {:.0}% of pilots with a similar deposit",
            beating_percent
        ),
        SocialTier::RoomToGrow => format!(
            "Room to grow: {:.0}% of similar pilots are ahead right now",
            percentile
        ),
    };

    SocialProof {
        pilot_id: subject.pilot_id.clone(),
        cohort_size,
        percentile,
        beating_percent,
        tier,
        message,
        computed_at: now,
    }
}

/// Rank every standing against the full set
pub fn rank_all(all: &[Standing], band: f64, now: DateTime<Utc>) -> Vec<SocialProof> {
    all.iter().map(|subject| rank(subject, all, band, now)).collect()
}
