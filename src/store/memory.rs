//! In-memory repositories

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::{PilotHandle, PilotStore, TradeStore};
use crate::error::{Error, Result};
use crate::pilot::{PilotState, Trade};

#[derive(Debug, Default)]
struct TradeLog {
    by_pilot: HashMap<String, Vec<Trade>>,
    ids: HashSet<u64>,
    last_id: u64,
}

/// Pilots and trades held in process memory
#[derive(Default)]
pub struct MemoryStore {
    pilots: DashMap<String, PilotHandle>,
    /// Insertion order of pilot ids
    order: RwLock<Vec<String>>,
    trades: RwLock<TradeLog>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every trade, ordered by id
    pub async fn all_trades(&self) -> Vec<Trade> {
        let log = self.trades.read().await;
        let mut all: Vec<Trade> = log.by_pilot.values().flatten().cloned().collect();
        all.sort_by_key(|t| t.id);
        all
    }

    /// Handles in insertion order
    pub async fn handles(&self) -> Vec<PilotHandle> {
        let order = self.order.read().await;
        order
            .iter()
            .filter_map(|id| self.pilots.get(id).map(|h| h.value().clone()))
            .collect()
    }
}

#[async_trait]
impl PilotStore for MemoryStore {
    async fn insert(&self, state: PilotState) -> Result<PilotHandle> {
        let id = state.pilot.id.clone();
        let mut order = self.order.write().await;
        if self.pilots.contains_key(&id) {
            return Err(Error::InvalidInput(format!("pilot {} already exists", id)));
        }
        let handle: PilotHandle = Arc::new(Mutex::new(state));
        self.pilots.insert(id.clone(), handle.clone());
        order.push(id);
        Ok(handle)
    }

    async fn get(&self, pilot_id: &str) -> Option<PilotHandle> {
        self.pilots.get(pilot_id).map(|h| h.value().clone())
    }

    async fn ids(&self) -> Vec<String> {
        self.order.read().await.clone()
    }

    async fn len(&self) -> usize {
        self.pilots.len()
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl TradeStore for MemoryStore {
    async fn append(&self, trade: Trade) -> Result<()> {
        let mut log = self.trades.write().await;
        if !log.ids.insert(trade.id) {
            return Err(Error::DuplicateTrade(trade.id));
        }
        log.last_id = log.last_id.max(trade.id);
        log.by_pilot.entry(trade.pilot_id.clone()).or_default().push(trade);
        Ok(())
    }

    async fn for_pilot(&self, pilot_id: &str) -> Vec<Trade> {
        let log = self.trades.read().await;
        let mut trades = log.by_pilot.get(pilot_id).cloned().unwrap_or_default();
        trades.sort_by_key(|t| t.id);
        trades
    }

    async fn count(&self) -> u64 {
        self.trades.read().await.ids.len() as u64
    }

    async fn last_trade_id(&self) -> u64 {
        self.trades.read().await.last_id
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pilot::trade::fixtures::trade;
    use crate::pilot::{Pilot, PilotPreferences, TradeSide};

    fn state(user: &str) -> PilotState {
        PilotState::new(Pilot::new(user, 100.0, &PilotPreferences::default()), 20, 100)
    }

    #[tokio::test]
    async fn test_insert_keeps_order() {
        let store = MemoryStore::new();
        let a = state("a");
        let b = state("b");
        let (a_id, b_id) = (a.pilot.id.clone(), b.pilot.id.clone());
        store.insert(a).await.unwrap();
        store.insert(b).await.unwrap();

        assert_eq!(store.ids().await, vec![a_id.clone(), b_id]);
        assert_eq!(PilotStore::len(&store).await, 2);
        let handle = store.get(&a_id).await.unwrap();
        assert_eq!(handle.lock().await.pilot.user_id, "a");
        assert!(store.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_pilot_rejected() {
        let store = MemoryStore::new();
        let a = state("a");
        store.insert(a.clone()).await.unwrap();
        assert!(store.insert(a).await.is_err());
    }

    #[tokio::test]
    async fn test_trade_append_and_dedup() {
        let store = MemoryStore::new();
        store.append(trade(2, "p", TradeSide::Buy, 1.0, 1.0)).await.unwrap();
        store.append(trade(1, "p", TradeSide::Sell, 1.0, 1.0)).await.unwrap();
        store.append(trade(3, "q", TradeSide::Buy, 1.0, 1.0)).await.unwrap();

        let err = store.append(trade(2, "p", TradeSide::Buy, 1.0, 1.0)).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateTrade(2)));

        let ids: Vec<u64> = store.for_pilot("p").await.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(store.count().await, 3);
        assert_eq!(store.last_trade_id().await, 3);
        assert_eq!(store.all_trades().await.len(), 3);
    }
}
