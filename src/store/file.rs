//! JSON file persistence
//!
//! The whole registry (pilots and trades) is one JSON document. It is read
//! once on open and rewritten in full on every flush, through a temp file and
//! rename so a crash mid-write leaves the previous document intact.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::memory::MemoryStore;
use super::{PilotHandle, PilotStore, TradeStore};
use crate::error::{Error, Result};
use crate::pilot::{PilotState, Trade};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    pilots: Vec<PilotState>,
    #[serde(default)]
    trades: Vec<Trade>,
}

/// File-backed store. Reads and writes go through an in-memory copy.
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
    /// Serializes flushes; they share one temp file
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open the document at `path`, starting empty if it does not exist
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let inner = MemoryStore::new();

        if path.exists() {
            let data = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Persistence(format!("{}: {}", path.display(), e)))?;
            let document: StoreDocument = serde_json::from_str(&data)?;

            let (pilots, trades) = (document.pilots.len(), document.trades.len());
            for state in document.pilots {
                inner.insert(state).await?;
            }
            for trade in document.trades {
                inner.append(trade).await?;
            }
            info!("Loaded {} pilots and {} trades from {}", pilots, trades, path.display());
        }

        Ok(Self {
            path,
            inner,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_document(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut pilots = Vec::new();
        for handle in self.inner.handles().await {
            pilots.push(handle.lock().await.clone());
        }
        let document = StoreDocument {
            pilots,
            trades: self.inner.all_trades().await,
        };

        let data = serde_json::to_string_pretty(&document)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data)
            .await
            .map_err(|e| Error::Persistence(format!("{}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::Persistence(format!("{}: {}", self.path.display(), e)))?;

        debug!(
            "Saved {} pilots and {} trades to {}",
            document.pilots.len(),
            document.trades.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[async_trait]
impl PilotStore for JsonFileStore {
    async fn insert(&self, state: PilotState) -> Result<PilotHandle> {
        self.inner.insert(state).await
    }

    async fn get(&self, pilot_id: &str) -> Option<PilotHandle> {
        self.inner.get(pilot_id).await
    }

    async fn ids(&self) -> Vec<String> {
        self.inner.ids().await
    }

    async fn len(&self) -> usize {
        PilotStore::len(&self.inner).await
    }

    async fn flush(&self) -> Result<()> {
        self.write_document().await
    }
}

#[async_trait]
impl TradeStore for JsonFileStore {
    async fn append(&self, trade: Trade) -> Result<()> {
        self.inner.append(trade).await
    }

    async fn for_pilot(&self, pilot_id: &str) -> Vec<Trade> {
        self.inner.for_pilot(pilot_id).await
    }

    async fn count(&self) -> u64 {
        self.inner.count().await
    }

    async fn last_trade_id(&self) -> u64 {
        self.inner.last_trade_id().await
    }

    async fn flush(&self) -> Result<()> {
        self.write_document().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pilot::trade::fixtures::trade;
    use crate::pilot::{Pilot, PilotPreferences, TradeSide};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_round_trip_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("autopilot.json");

        let pilot_id = {
            let store = JsonFileStore::open(&path).await.unwrap();
            let mut state = PilotState::new(Pilot::new("u", 250.0, &PilotPreferences::default()), 20, 100);
            state.watch.enabled = true;
            let id = state.pilot.id.clone();
            store.insert(state).await.unwrap();
            store.append(trade(1, &id, TradeSide::Buy, 10.0, 2.0)).await.unwrap();
            store.append(trade(2, &id, TradeSide::Sell, 11.0, 1.0)).await.unwrap();
            PilotStore::flush(&store).await.unwrap();
            id
        };

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.ids().await, vec![pilot_id.clone()]);
        let handle = reopened.get(&pilot_id).await.unwrap();
        {
            let state = handle.lock().await;
            assert_eq!(state.pilot.total_deposited, 250.0);
            assert!(state.watch.enabled);
        }
        assert_eq!(reopened.for_pilot(&pilot_id).await.len(), 2);
        assert_eq!(reopened.last_trade_id().await, 2);
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("none.json")).await.unwrap();
        assert_eq!(PilotStore::len(&store).await, 0);
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_serialization_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path).await,
            Err(Error::Serialization(_))
        ));
    }
}
