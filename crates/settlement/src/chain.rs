//! Chain client - trait and implementations
//!
//! The chain client is the external collaborator that performs the actual
//! on-chain transfer. The settlement core only ever sees this trait; retries
//! and redelivery are the queue/worker's business, never the client's.

use crate::error::{Result, SettlementError};
use crate::types::TradeSnapshot;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// Client trait for the settlement chain - transport agnostic.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Broadcast a settlement and return the transaction hash.
    ///
    /// May take seconds; callers must not hold a trade lock across this.
    async fn broadcast(&self, snapshot: &TradeSnapshot) -> Result<String>;

    /// Look up whether a broadcast for this trade actually landed.
    ///
    /// Used by the reconciliation sweep: a trade stuck in Settling is
    /// ambiguous until the chain answers, so the sweep asks before declaring
    /// failure.
    async fn lookup(&self, trade_id: Uuid) -> Result<Option<String>>;
}

// ==================== Simulated Implementation ====================

/// Simulated chain client.
///
/// Stands in for a real RPC node: logs the two legs of the transfer, sleeps
/// a configurable delay, and returns a random transaction hash. Successful
/// broadcasts are remembered so `lookup` can answer the reconciler.
pub struct SimulatedChain {
    delay: Duration,
    broadcasts: Mutex<HashMap<Uuid, String>>,
}

impl SimulatedChain {
    /// Create a simulated chain with the given broadcast latency.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            broadcasts: Mutex::new(HashMap::new()),
        }
    }

    fn random_tx_hash() -> String {
        // Two v4 UUIDs give 64 hex digits.
        format!(
            "0x{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        )
    }
}

#[async_trait]
impl ChainClient for SimulatedChain {
    async fn broadcast(&self, snapshot: &TradeSnapshot) -> Result<String> {
        tracing::info!(trade_id = %snapshot.trade_id, "Broadcasting settlement");
        tracing::info!(
            "  -> Transfer {} {} from {} to {}",
            snapshot.amount,
            snapshot.base_asset,
            snapshot.seller,
            snapshot.buyer
        );
        tracing::info!(
            "  -> Transfer {} {} from {} to {}",
            snapshot.total_quote_amount,
            snapshot.quote_asset,
            snapshot.buyer,
            snapshot.seller
        );

        tokio::time::sleep(self.delay).await;

        let tx_hash = Self::random_tx_hash();
        self.broadcasts
            .lock()
            .unwrap()
            .insert(snapshot.trade_id, tx_hash.clone());

        tracing::info!(trade_id = %snapshot.trade_id, tx_hash = %tx_hash, "Broadcast complete");
        Ok(tx_hash)
    }

    async fn lookup(&self, trade_id: Uuid) -> Result<Option<String>> {
        Ok(self.broadcasts.lock().unwrap().get(&trade_id).cloned())
    }
}

// ==================== Mock Implementation ====================

/// Mock chain client for testing.
pub struct MockChainClient {
    failure: Option<String>,
    delay: Duration,
    broadcast_count: AtomicUsize,
    broadcasts: Mutex<HashMap<Uuid, String>>,
    primed_lookups: Mutex<HashMap<Uuid, String>>,
}

impl MockChainClient {
    /// Create a mock that succeeds instantly.
    pub fn new() -> Self {
        Self {
            failure: None,
            delay: Duration::ZERO,
            broadcast_count: AtomicUsize::new(0),
            broadcasts: Mutex::new(HashMap::new()),
            primed_lookups: Mutex::new(HashMap::new()),
        }
    }

    /// Configure every broadcast to fail with this reason.
    pub fn with_failure(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    /// Configure an artificial broadcast delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Pretend a broadcast for this trade already landed with the given hash.
    pub fn prime_lookup(&self, trade_id: Uuid, tx_hash: impl Into<String>) {
        self.primed_lookups
            .lock()
            .unwrap()
            .insert(trade_id, tx_hash.into());
    }

    /// How many times broadcast was invoked.
    pub fn broadcast_count(&self) -> usize {
        self.broadcast_count.load(Ordering::SeqCst)
    }
}

impl Default for MockChainClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn broadcast(&self, snapshot: &TradeSnapshot) -> Result<String> {
        self.broadcast_count.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if let Some(reason) = &self.failure {
            return Err(SettlementError::Upstream(reason.clone()));
        }

        let tx_hash = format!("0xmock{}", Uuid::new_v4().simple());
        self.broadcasts
            .lock()
            .unwrap()
            .insert(snapshot.trade_id, tx_hash.clone());
        Ok(tx_hash)
    }

    async fn lookup(&self, trade_id: Uuid) -> Result<Option<String>> {
        if let Some(hash) = self.primed_lookups.lock().unwrap().get(&trade_id) {
            return Ok(Some(hash.clone()));
        }
        Ok(self.broadcasts.lock().unwrap().get(&trade_id).cloned())
    }
}
