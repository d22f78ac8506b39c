//! Pilot and trade repositories
//!
//! The engine only sees the `PilotStore` and `TradeStore` traits. Each stored
//! pilot is handed out as a `PilotHandle`: the pilot's single serialization
//! point, shared by the trading, learning and social loops.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::pilot::{PilotState, Trade};

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Shared, lockable pilot state
pub type PilotHandle = Arc<Mutex<PilotState>>;

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON document holding all pilots and trades. In-memory only when unset.
    #[serde(default)]
    pub path: Option<String>,
}

#[async_trait]
pub trait PilotStore: Send + Sync {
    /// Register a new pilot. Fails if the id is taken.
    async fn insert(&self, state: PilotState) -> Result<PilotHandle>;

    async fn get(&self, pilot_id: &str) -> Option<PilotHandle>;

    /// All pilot ids in insertion order
    async fn ids(&self) -> Vec<String>;

    async fn len(&self) -> usize;

    /// Persist pilot state. Must not be called while holding a pilot lock.
    async fn flush(&self) -> Result<()>;
}

#[async_trait]
pub trait TradeStore: Send + Sync {
    /// Append an executed trade. Ids are unique; a repeat is rejected.
    async fn append(&self, trade: Trade) -> Result<()>;

    /// Trades for one pilot, oldest first
    async fn for_pilot(&self, pilot_id: &str) -> Vec<Trade>;

    async fn count(&self) -> u64;

    /// Highest id recorded so far, 0 when empty
    async fn last_trade_id(&self) -> u64;

    async fn flush(&self) -> Result<()>;
}
