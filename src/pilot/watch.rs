//! Watch stream: the live feed of pending and recent trades for a pilot
//!
//! `recent_trades` is a bounded ring buffer, newest first. When full, the
//! oldest trade is evicted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::trade::Trade;

/// Capacity of the recent-trades ring buffer; configs may only lower it
pub const RECENT_TRADES_CAPACITY: usize = 20;

/// Default cap on retained commentary entries
pub const COMMENTARY_CAPACITY: usize = 100;

/// Watch stream buffer sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_recent_capacity")]
    pub recent_capacity: usize,
    #[serde(default = "default_commentary_capacity")]
    pub commentary_capacity: usize,
}

fn default_recent_capacity() -> usize {
    RECENT_TRADES_CAPACITY
}

fn default_commentary_capacity() -> usize {
    COMMENTARY_CAPACITY
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            recent_capacity: default_recent_capacity(),
            commentary_capacity: default_commentary_capacity(),
        }
    }
}

/// Timestamped narration line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentaryEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub trade_id: Option<u64>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchStream {
    pub pilot_id: String,
    pub enabled: bool,
    pub pending_trades: Vec<Trade>,
    pub recent_trades: VecDeque<Trade>,
    pub live_commentary: VecDeque<CommentaryEntry>,
    recent_capacity: usize,
    commentary_capacity: usize,
}

impl WatchStream {
    pub fn new(pilot_id: &str, recent_capacity: usize, commentary_capacity: usize) -> Self {
        let recent_capacity = recent_capacity.clamp(1, RECENT_TRADES_CAPACITY);
        let commentary_capacity = commentary_capacity.max(1);
        Self {
            pilot_id: pilot_id.to_string(),
            enabled: false,
            pending_trades: Vec::new(),
            recent_trades: VecDeque::with_capacity(recent_capacity),
            live_commentary: VecDeque::new(),
            recent_capacity,
            commentary_capacity,
        }
    }

    pub fn recent_capacity(&self) -> usize {
        self.recent_capacity
    }

    /// Add a trade awaiting execution
    pub fn queue(&mut self, trade: Trade) {
        self.pending_trades.push(trade);
    }

    pub fn has_pending(&self, trade_id: u64) -> bool {
        self.pending_trades.iter().any(|t| t.id == trade_id)
    }

    /// Remove a pending trade. Returns None if it was already taken or cancelled.
    pub fn take_pending(&mut self, trade_id: u64) -> Option<Trade> {
        let idx = self.pending_trades.iter().position(|t| t.id == trade_id)?;
        Some(self.pending_trades.remove(idx))
    }

    /// Remove every pending trade
    pub fn drain_pending(&mut self) -> Vec<Trade> {
        std::mem::take(&mut self.pending_trades)
    }

    /// Put an executed trade at the front, evicting the oldest beyond capacity
    pub fn push_executed(&mut self, trade: Trade) {
        self.recent_trades.push_front(trade);
        while self.recent_trades.len() > self.recent_capacity {
            self.recent_trades.pop_back();
        }
    }

    pub fn comment(&mut self, trade_id: Option<u64>, message: impl Into<String>) {
        self.live_commentary.push_back(CommentaryEntry {
            timestamp: Utc::now(),
            trade_id,
            message: message.into(),
        });
        while self.live_commentary.len() > self.commentary_capacity {
            self.live_commentary.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pilot::trade::fixtures::trade;
    use crate::pilot::trade::TradeSide;

    #[test]
    fn test_recent_trades_bounded_fifo() {
        let mut stream = WatchStream::new("p", RECENT_TRADES_CAPACITY, COMMENTARY_CAPACITY);
        for id in 1..=45 {
            stream.push_executed(trade(id, "p", TradeSide::Buy, 10.0, 1.0));
            assert!(stream.recent_trades.len() <= RECENT_TRADES_CAPACITY);
        }
        assert_eq!(stream.recent_trades.len(), 20);
        // Newest first, oldest (1..=25) evicted
        assert_eq!(stream.recent_trades.front().unwrap().id, 45);
        assert_eq!(stream.recent_trades.back().unwrap().id, 26);
    }

    #[test]
    fn test_take_pending_only_once() {
        let mut stream = WatchStream::new("p", 5, 5);
        stream.queue(trade(7, "p", TradeSide::Buy, 10.0, 1.0));
        assert!(stream.has_pending(7));
        assert!(stream.take_pending(7).is_some());
        assert!(stream.take_pending(7).is_none());
        assert!(!stream.has_pending(7));
    }

    #[test]
    fn test_commentary_capped() {
        let mut stream = WatchStream::new("p", 5, 3);
        for i in 0..5 {
            stream.comment(None, format!("line {}", i));
        }
        assert_eq!(stream.live_commentary.len(), 3);
        assert_eq!(stream.live_commentary.front().unwrap().message, "line 2");
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut stream = WatchStream::new("p", 0, 0);
        stream.push_executed(trade(1, "p", TradeSide::Sell, 1.0, 1.0));
        assert_eq!(stream.recent_trades.len(), 1);
        assert_eq!(stream.recent_capacity(), 1);
    }

    #[test]
    fn test_oversized_capacity_is_capped() {
        let mut stream = WatchStream::new("p", 50, COMMENTARY_CAPACITY);
        assert_eq!(stream.recent_capacity(), RECENT_TRADES_CAPACITY);
        for id in 1..=30 {
            stream.push_executed(trade(id, "p", TradeSide::Buy, 10.0, 1.0));
        }
        assert_eq!(stream.recent_trades.len(), RECENT_TRADES_CAPACITY);
    }
}
