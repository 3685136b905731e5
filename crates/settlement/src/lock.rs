//! Per-trade exclusive access
//!
//! [`TradeLockManager`] serializes all state-changing operations on a given
//! trade id. Two operations racing for the same trade are observably
//! sequential: one sees the pre-transition record, the other the
//! post-transition record, never an interleaved read.
//!
//! The hold covers a single load-mutate-persist step only. Long external
//! calls (the chain broadcast) happen between two separate holds, so queue
//! throughput never serializes on chain latency.

use crate::error::{Result, SettlementError};
use crate::store::TradeStore;
use crate::types::Trade;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Grants exclusive load-mutate-persist access to one trade at a time.
pub struct TradeLockManager {
    store: Arc<dyn TradeStore>,
    // One entry per trade id; entries live as long as the process, matching
    // the store which never deletes trades.
    locks: StdMutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl TradeLockManager {
    /// Create a lock manager over the given store.
    pub fn new(store: Arc<dyn TradeStore>) -> Self {
        Self {
            store,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks.entry(id).or_default().clone()
    }

    /// Load the trade under an exclusive hold, apply `f`, and persist the
    /// mutation if `f` succeeds.
    ///
    /// If the trade is absent this is NotFound. If `f` fails, nothing is
    /// written: the record stays exactly as loaded. The hold is released in
    /// every case once this returns.
    pub async fn with_trade<T, F>(&self, id: Uuid, f: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(&mut Trade) -> Result<T> + Send,
    {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut trade = self
            .store
            .get(id)
            .await?
            .ok_or(SettlementError::NotFound(id))?;

        let out = f(&mut trade)?;
        self.store.update(&trade).await?;
        Ok(out)
    }
}
