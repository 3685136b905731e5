//! Settlement service - core business logic for the trade lifecycle
//!
//! All mutation of a trade goes through [`TradeLockManager::with_trade`];
//! nothing else writes to the store. Settlement is two short guarded
//! transactions with the chain broadcast in between:
//!
//! 1. Pending -> Settling, committed and released before the broadcast.
//! 2. Settling -> Settled (or Failed), committed after the broadcast returns.
//!
//! A crash between the two leaves the trade provably in flight (Settling),
//! where the reconciliation sweep can recover it.

use crate::chain::ChainClient;
use crate::error::{Result, SettlementError};
use crate::lock::TradeLockManager;
use crate::queue::{SettlementJob, SettlementQueue};
use crate::store::TradeStore;
use crate::types::{truncate_reason, NewTrade, Trade, TradeSnapshot, TradeStatus};
use bigdecimal::BigDecimal;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of one reconciliation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Trades whose broadcast turned out to have landed; now Settled.
    pub recovered: usize,
    /// Trades with no trace on chain; now Failed.
    pub timed_out: usize,
    /// Trades the chain could not answer for; left for the next sweep.
    pub still_ambiguous: usize,
}

/// Settlement service - owns the trade lifecycle.
pub struct SettlementService {
    store: Arc<dyn TradeStore>,
    locks: TradeLockManager,
    chain: Arc<dyn ChainClient>,
    queue: Arc<dyn SettlementQueue>,
    fee_rate: BigDecimal,
}

impl SettlementService {
    /// Create a new settlement service.
    pub fn new(
        store: Arc<dyn TradeStore>,
        chain: Arc<dyn ChainClient>,
        queue: Arc<dyn SettlementQueue>,
        fee_rate: BigDecimal,
    ) -> Self {
        Self {
            locks: TradeLockManager::new(store.clone()),
            store,
            chain,
            queue,
            fee_rate,
        }
    }

    /// Create a trade in Pending status.
    ///
    /// `total_quote_amount` and `fee_amount` are computed here, exactly once,
    /// as decimal products.
    pub async fn create_trade(&self, input: NewTrade) -> Result<Trade> {
        self.validate_new_trade(&input)?;

        let trade = Trade::new(input, &self.fee_rate);
        let trade = self.store.insert(trade).await?;

        tracing::info!(trade_id = %trade.id, status = %trade.status, "Trade created");
        Ok(trade)
    }

    /// Queue a trade for settlement.
    ///
    /// The trade must exist before anything is enqueued: NotFound surfaces to
    /// the caller here, never from inside the pipeline. Returns as soon as
    /// the job is accepted; the result is observable only via queries.
    pub async fn request_settlement(&self, trade_id: Uuid) -> Result<()> {
        self.store
            .get(trade_id)
            .await?
            .ok_or(SettlementError::NotFound(trade_id))?;

        self.queue.enqueue(SettlementJob { trade_id }).await?;

        tracing::info!(trade_id = %trade_id, "Settlement request accepted");
        Ok(())
    }

    /// Execute one settlement attempt end to end. Called by workers.
    ///
    /// NotFound and Conflict are terminal job outcomes (no retry, no state
    /// change). An upstream failure marks the trade Failed and is returned
    /// for the worker to log; it is never re-raised past the worker.
    pub async fn settle_trade(&self, trade_id: Uuid) -> Result<Trade> {
        let snapshot = self.begin_settlement(trade_id).await?;

        // The broadcast runs outside any trade lock and may take seconds.
        let tx_hash = match self.chain.broadcast(&snapshot).await {
            Ok(hash) => hash,
            Err(e) => {
                // Store the collaborator's own message, not the wrapped form.
                let reason = match &e {
                    SettlementError::Upstream(msg) => msg.clone(),
                    other => other.to_string(),
                };
                tracing::error!(trade_id = %trade_id, error = %reason, "Broadcast failed");
                self.mark_failed(trade_id, &reason).await?;
                return Err(e);
            }
        };

        match self.complete_settlement(trade_id, &tx_hash).await {
            Ok(trade) => Ok(trade),
            Err(e) => {
                // The trade may have concurrently reached a terminal state;
                // mark_failed only touches it if it is still Settling.
                self.mark_failed(trade_id, &e.to_string()).await?;
                Err(e)
            }
        }
    }

    /// First guarded transaction: Pending -> Settling.
    ///
    /// The commit is visible before this returns, so a crash after this
    /// point leaves the trade provably in flight rather than silently lost.
    pub async fn begin_settlement(&self, trade_id: Uuid) -> Result<TradeSnapshot> {
        let snapshot = self
            .locks
            .with_trade(trade_id, |trade| {
                if !trade.status.can_settle() {
                    return Err(SettlementError::Conflict {
                        trade_id: trade.id,
                        status: trade.status,
                    });
                }
                trade.status = TradeStatus::Settling;
                trade.updated_at = Utc::now();
                Ok(trade.snapshot())
            })
            .await?;

        tracing::info!(trade_id = %trade_id, status = %TradeStatus::Settling, "Trade claimed for settlement");
        Ok(snapshot)
    }

    /// Second guarded transaction: Settling -> Settled.
    pub async fn complete_settlement(&self, trade_id: Uuid, tx_hash: &str) -> Result<Trade> {
        let trade = self
            .locks
            .with_trade(trade_id, |trade| {
                if trade.status != TradeStatus::Settling {
                    return Err(SettlementError::Conflict {
                        trade_id: trade.id,
                        status: trade.status,
                    });
                }
                trade.status = TradeStatus::Settled;
                trade.on_chain_tx_hash = Some(tx_hash.to_string());
                let now = Utc::now();
                trade.settled_at = Some(now);
                trade.updated_at = now;
                Ok(trade.clone())
            })
            .await?;

        tracing::info!(trade_id = %trade_id, tx_hash = %tx_hash, status = %trade.status, "Trade settled");
        Ok(trade)
    }

    /// Mark a trade Failed with a truncated reason.
    ///
    /// Idempotent by contract: only Settling -> Failed happens; any other
    /// current status, or an absent trade, is a silent no-op. The trade may
    /// have concurrently reached a terminal state through another path, and
    /// cascading an error out of the failure path would help nobody.
    pub async fn mark_failed(&self, trade_id: Uuid, reason: &str) -> Result<()> {
        let result = self
            .locks
            .with_trade(trade_id, |trade| {
                if trade.status != TradeStatus::Settling {
                    return Ok(false);
                }
                trade.status = TradeStatus::Failed;
                trade.failure_reason = Some(truncate_reason(reason));
                trade.updated_at = Utc::now();
                Ok(true)
            })
            .await;

        match result {
            Ok(true) => {
                tracing::warn!(trade_id = %trade_id, status = %TradeStatus::Failed, reason = %reason, "Trade marked failed");
                Ok(())
            }
            Ok(false) => {
                tracing::debug!(trade_id = %trade_id, "Skipping failure mark, trade is not settling");
                Ok(())
            }
            Err(SettlementError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Cancel a Pending trade.
    ///
    /// Races against settlement on the same guard: exactly one of them wins,
    /// the other observes Conflict. An absent trade is NotFound.
    pub async fn cancel_trade(&self, trade_id: Uuid) -> Result<Trade> {
        let trade = self
            .locks
            .with_trade(trade_id, |trade| {
                if !trade.status.can_cancel() {
                    return Err(SettlementError::Conflict {
                        trade_id: trade.id,
                        status: trade.status,
                    });
                }
                trade.status = TradeStatus::Canceled;
                trade.updated_at = Utc::now();
                Ok(trade.clone())
            })
            .await?;

        tracing::info!(trade_id = %trade_id, status = %trade.status, "Trade canceled");
        Ok(trade)
    }

    /// Get a trade by id.
    pub async fn get_trade(&self, trade_id: Uuid) -> Result<Trade> {
        self.store
            .get(trade_id)
            .await?
            .ok_or(SettlementError::NotFound(trade_id))
    }

    /// List trades, optionally filtered by status, newest first.
    pub async fn list_trades(&self, status: Option<TradeStatus>) -> Result<Vec<Trade>> {
        self.store.list(status).await
    }

    /// Recover trades stuck in Settling longer than `older_than`.
    ///
    /// A stuck trade is ambiguous: the broadcast may have landed or not. The
    /// chain is asked before anything is declared. No answer means the trade
    /// stays Settling for the next sweep.
    pub async fn sweep_stuck_settlements(
        &self,
        older_than: chrono::Duration,
    ) -> Result<SweepOutcome> {
        let cutoff = Utc::now() - older_than;
        let stuck = self.store.list_settling_before(cutoff).await?;

        let mut outcome = SweepOutcome::default();
        for trade in stuck {
            match self.chain.lookup(trade.id).await {
                Ok(Some(tx_hash)) => {
                    // The broadcast actually landed; finish the settlement.
                    match self.complete_settlement(trade.id, &tx_hash).await {
                        Ok(_) => outcome.recovered += 1,
                        Err(SettlementError::Conflict { .. }) => {
                            // Another path got there first.
                            outcome.still_ambiguous += 1;
                        }
                        Err(e) => {
                            // One trade's storage trouble must not starve the
                            // rest of the sweep.
                            tracing::error!(trade_id = %trade.id, error = %e, "Failed to record recovered settlement, leaving trade for next sweep");
                            outcome.still_ambiguous += 1;
                        }
                    }
                }
                Ok(None) => {
                    let reason = format!(
                        "settlement timed out after {} seconds with no trace on chain",
                        older_than.num_seconds()
                    );
                    match self.mark_failed(trade.id, &reason).await {
                        Ok(()) => outcome.timed_out += 1,
                        Err(e) => {
                            tracing::error!(trade_id = %trade.id, error = %e, "Failed to mark timed out trade, leaving it for next sweep");
                            outcome.still_ambiguous += 1;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(trade_id = %trade.id, error = %e, "Chain lookup failed, leaving trade for next sweep");
                    outcome.still_ambiguous += 1;
                }
            }
        }

        if outcome.recovered > 0 || outcome.timed_out > 0 {
            tracing::info!(
                recovered = outcome.recovered,
                timed_out = outcome.timed_out,
                still_ambiguous = outcome.still_ambiguous,
                "Reconciliation sweep complete"
            );
        }
        Ok(outcome)
    }

    fn validate_new_trade(&self, input: &NewTrade) -> Result<()> {
        let zero = BigDecimal::from(0);

        if input.buyer.trim().is_empty() {
            return Err(SettlementError::Validation("Buyer is required".to_string()));
        }
        if input.seller.trim().is_empty() {
            return Err(SettlementError::Validation("Seller is required".to_string()));
        }
        if input.base_asset.trim().is_empty() {
            return Err(SettlementError::Validation(
                "Base asset is required".to_string(),
            ));
        }
        if input.quote_asset.trim().is_empty() {
            return Err(SettlementError::Validation(
                "Quote asset is required".to_string(),
            ));
        }
        if input.amount <= zero {
            return Err(SettlementError::Validation(
                "Amount must be greater than 0".to_string(),
            ));
        }
        if input.price <= zero {
            return Err(SettlementError::Validation(
                "Price must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainClient;
    use crate::queue::InMemoryQueue;
    use crate::store::InMemoryTradeStore;
    use std::str::FromStr;

    fn new_trade(amount: &str, price: &str) -> NewTrade {
        NewTrade {
            buyer: "wallet_buyer".to_string(),
            seller: "wallet_seller".to_string(),
            base_asset: "uBTC".to_string(),
            quote_asset: "uUSD".to_string(),
            amount: BigDecimal::from_str(amount).unwrap(),
            price: BigDecimal::from_str(price).unwrap(),
        }
    }

    fn service_with(chain: Arc<MockChainClient>) -> SettlementService {
        SettlementService::new(
            Arc::new(InMemoryTradeStore::new()),
            chain,
            Arc::new(InMemoryQueue::new(64)),
            BigDecimal::from_str("0.001").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_create_trade_economics() {
        let service = service_with(Arc::new(MockChainClient::new()));

        let trade = service
            .create_trade(new_trade("1.5", "50000.75"))
            .await
            .unwrap();

        assert_eq!(trade.total_quote_amount.to_string(), "75001.125");
        assert_eq!(trade.fee_amount.to_string(), "75.001125");
        assert_eq!(trade.status, TradeStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_trade_rejects_bad_input() {
        let service = service_with(Arc::new(MockChainClient::new()));

        let mut input = new_trade("1", "10");
        input.buyer = "".to_string();
        assert!(matches!(
            service.create_trade(input).await,
            Err(SettlementError::Validation(_))
        ));

        let input = new_trade("0", "10");
        assert!(matches!(
            service.create_trade(input).await,
            Err(SettlementError::Validation(_))
        ));

        let input = new_trade("1", "-5");
        assert!(matches!(
            service.create_trade(input).await,
            Err(SettlementError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_settle_trade_happy_path() {
        let chain = Arc::new(MockChainClient::new());
        let service = service_with(chain.clone());

        let trade = service.create_trade(new_trade("1.5", "50000.75")).await.unwrap();
        let settled = service.settle_trade(trade.id).await.unwrap();

        assert_eq!(settled.status, TradeStatus::Settled);
        assert!(settled.on_chain_tx_hash.is_some());
        assert!(settled.settled_at.is_some());
        assert_eq!(chain.broadcast_count(), 1);
    }

    #[tokio::test]
    async fn test_settle_trade_broadcast_failure() {
        let chain = Arc::new(MockChainClient::new().with_failure("network unreachable"));
        let service = service_with(chain.clone());

        let trade = service.create_trade(new_trade("1", "10")).await.unwrap();
        let err = service.settle_trade(trade.id).await.unwrap_err();
        assert!(matches!(err, SettlementError::Upstream(_)));

        let stored = service.get_trade(trade.id).await.unwrap();
        assert_eq!(stored.status, TradeStatus::Failed);
        assert_eq!(
            stored.failure_reason.as_deref(),
            Some("network unreachable")
        );
        assert!(stored.on_chain_tx_hash.is_none());
        assert!(stored.settled_at.is_none());
    }

    #[tokio::test]
    async fn test_settle_trade_not_found_is_terminal() {
        let service = service_with(Arc::new(MockChainClient::new()));
        let err = service.settle_trade(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, SettlementError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_settlement_is_conflict_and_single_broadcast() {
        let chain = Arc::new(MockChainClient::new());
        let service = service_with(chain.clone());

        let trade = service.create_trade(new_trade("1", "10")).await.unwrap();
        service.settle_trade(trade.id).await.unwrap();

        let err = service.settle_trade(trade.id).await.unwrap_err();
        assert!(matches!(err, SettlementError::Conflict { .. }));

        let stored = service.get_trade(trade.id).await.unwrap();
        assert_eq!(stored.status, TradeStatus::Settled);
        assert_eq!(chain.broadcast_count(), 1);
    }

    #[tokio::test]
    async fn test_mark_failed_is_a_noop_outside_settling() {
        let service = service_with(Arc::new(MockChainClient::new()));

        let trade = service.create_trade(new_trade("1", "10")).await.unwrap();

        // Pending: untouched.
        service.mark_failed(trade.id, "boom").await.unwrap();
        let stored = service.get_trade(trade.id).await.unwrap();
        assert_eq!(stored.status, TradeStatus::Pending);
        assert!(stored.failure_reason.is_none());

        // Absent: silent.
        service.mark_failed(Uuid::new_v4(), "boom").await.unwrap();
    }

    #[tokio::test]
    async fn test_mark_failed_truncates_reason() {
        let service = service_with(Arc::new(MockChainClient::new()));

        let trade = service.create_trade(new_trade("1", "10")).await.unwrap();
        service.begin_settlement(trade.id).await.unwrap();

        let long_reason = "e".repeat(400);
        service.mark_failed(trade.id, &long_reason).await.unwrap();

        let stored = service.get_trade(trade.id).await.unwrap();
        assert_eq!(stored.status, TradeStatus::Failed);
        assert_eq!(stored.failure_reason.unwrap().len(), 255);
    }

    #[tokio::test]
    async fn test_cancel_pending_trade() {
        let service = service_with(Arc::new(MockChainClient::new()));

        let trade = service.create_trade(new_trade("1", "10")).await.unwrap();
        let canceled = service.cancel_trade(trade.id).await.unwrap();
        assert_eq!(canceled.status, TradeStatus::Canceled);

        // Settling a canceled trade is a conflict; the record is unchanged.
        let err = service.settle_trade(trade.id).await.unwrap_err();
        assert!(matches!(
            err,
            SettlementError::Conflict {
                status: TradeStatus::Canceled,
                ..
            }
        ));
        let stored = service.get_trade(trade.id).await.unwrap();
        assert_eq!(stored.status, TradeStatus::Canceled);
    }

    #[tokio::test]
    async fn test_cancel_absent_trade_is_not_found() {
        let service = service_with(Arc::new(MockChainClient::new()));
        let err = service.cancel_trade(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, SettlementError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_cancel_non_pending_is_conflict() {
        let service = service_with(Arc::new(MockChainClient::new()));

        let trade = service.create_trade(new_trade("1", "10")).await.unwrap();
        service.begin_settlement(trade.id).await.unwrap();

        let err = service.cancel_trade(trade.id).await.unwrap_err();
        assert!(matches!(err, SettlementError::Conflict { .. }));

        let stored = service.get_trade(trade.id).await.unwrap();
        assert_eq!(stored.status, TradeStatus::Settling);
    }

    #[tokio::test]
    async fn test_request_settlement_requires_existing_trade() {
        let service = service_with(Arc::new(MockChainClient::new()));
        let err = service.request_settlement(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, SettlementError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_illegal_transitions_leave_record_unchanged() {
        let service = service_with(Arc::new(MockChainClient::new()));

        // Drive one trade to each non-Pending status and verify every
        // guarded operation rejects it without touching the record.
        let settled = {
            let t = service.create_trade(new_trade("1", "10")).await.unwrap();
            service.settle_trade(t.id).await.unwrap()
        };
        let failed = {
            let chain = Arc::new(MockChainClient::new().with_failure("x"));
            let svc = service_with(chain);
            let t = svc.create_trade(new_trade("1", "10")).await.unwrap();
            let _ = svc.settle_trade(t.id).await;
            svc.get_trade(t.id).await.unwrap()
        };
        assert_eq!(failed.status, TradeStatus::Failed);

        for id in [settled.id] {
            let before = service.get_trade(id).await.unwrap();

            assert!(matches!(
                service.begin_settlement(id).await,
                Err(SettlementError::Conflict { .. })
            ));
            assert!(matches!(
                service.cancel_trade(id).await,
                Err(SettlementError::Conflict { .. })
            ));
            assert!(matches!(
                service.complete_settlement(id, "0xdead").await,
                Err(SettlementError::Conflict { .. })
            ));

            let after = service.get_trade(id).await.unwrap();
            assert_eq!(before, after);
        }
    }

    #[tokio::test]
    async fn test_sweep_recovers_landed_broadcast() {
        let chain = Arc::new(MockChainClient::new());
        let store = Arc::new(InMemoryTradeStore::new());
        let service = SettlementService::new(
            store.clone(),
            chain.clone(),
            Arc::new(InMemoryQueue::new(8)),
            BigDecimal::from_str("0.001").unwrap(),
        );

        let trade = service.create_trade(new_trade("1", "10")).await.unwrap();
        service.begin_settlement(trade.id).await.unwrap();

        // Backdate the status change so the sweep considers it stuck.
        let mut stuck = store.get(trade.id).await.unwrap().unwrap();
        stuck.updated_at = Utc::now() - chrono::Duration::seconds(600);
        store.update(&stuck).await.unwrap();

        chain.prime_lookup(trade.id, "0xrecovered");

        let outcome = service
            .sweep_stuck_settlements(chrono::Duration::seconds(120))
            .await
            .unwrap();
        assert_eq!(outcome.recovered, 1);
        assert_eq!(outcome.timed_out, 0);

        let stored = service.get_trade(trade.id).await.unwrap();
        assert_eq!(stored.status, TradeStatus::Settled);
        assert_eq!(stored.on_chain_tx_hash.as_deref(), Some("0xrecovered"));
    }

    #[tokio::test]
    async fn test_sweep_fails_unbroadcast_trade() {
        let chain = Arc::new(MockChainClient::new());
        let store = Arc::new(InMemoryTradeStore::new());
        let service = SettlementService::new(
            store.clone(),
            chain,
            Arc::new(InMemoryQueue::new(8)),
            BigDecimal::from_str("0.001").unwrap(),
        );

        let trade = service.create_trade(new_trade("1", "10")).await.unwrap();
        service.begin_settlement(trade.id).await.unwrap();

        let mut stuck = store.get(trade.id).await.unwrap().unwrap();
        stuck.updated_at = Utc::now() - chrono::Duration::seconds(600);
        store.update(&stuck).await.unwrap();

        let outcome = service
            .sweep_stuck_settlements(chrono::Duration::seconds(120))
            .await
            .unwrap();
        assert_eq!(outcome.timed_out, 1);

        let stored = service.get_trade(trade.id).await.unwrap();
        assert_eq!(stored.status, TradeStatus::Failed);
        assert!(stored
            .failure_reason
            .unwrap()
            .contains("settlement timed out"));
    }

    #[tokio::test]
    async fn test_sweep_ignores_fresh_settling_trades() {
        let service = service_with(Arc::new(MockChainClient::new()));

        let trade = service.create_trade(new_trade("1", "10")).await.unwrap();
        service.begin_settlement(trade.id).await.unwrap();

        let outcome = service
            .sweep_stuck_settlements(chrono::Duration::seconds(120))
            .await
            .unwrap();
        assert_eq!(outcome, SweepOutcome::default());

        let stored = service.get_trade(trade.id).await.unwrap();
        assert_eq!(stored.status, TradeStatus::Settling);
    }

    #[tokio::test]
    async fn test_concurrent_settle_and_cancel_one_winner() {
        let chain = Arc::new(MockChainClient::new());
        let service = Arc::new(service_with(chain.clone()));

        let trade = service.create_trade(new_trade("1", "10")).await.unwrap();

        let settle = {
            let service = service.clone();
            tokio::spawn(async move { service.settle_trade(trade.id).await })
        };
        let cancel = {
            let service = service.clone();
            tokio::spawn(async move { service.cancel_trade(trade.id).await })
        };

        let settle_result = settle.await.unwrap();
        let cancel_result = cancel.await.unwrap();

        // Both race on the Pending guard; exactly one can win it.
        match (&settle_result, &cancel_result) {
            (Ok(settled), Err(SettlementError::Conflict { .. })) => {
                assert_eq!(settled.status, TradeStatus::Settled);
                assert_eq!(chain.broadcast_count(), 1);
            }
            (Err(SettlementError::Conflict { .. }), Ok(canceled)) => {
                assert_eq!(canceled.status, TradeStatus::Canceled);
                assert_eq!(chain.broadcast_count(), 0);
            }
            other => panic!("expected exactly one winner, got {other:?}"),
        }

        // Whatever won, the stored record is internally consistent.
        let stored = service.get_trade(trade.id).await.unwrap();
        match stored.status {
            TradeStatus::Settled => {
                assert!(stored.on_chain_tx_hash.is_some());
                assert!(stored.settled_at.is_some());
            }
            TradeStatus::Canceled => {
                assert!(stored.on_chain_tx_hash.is_none());
                assert!(stored.settled_at.is_none());
            }
            status => panic!("unexpected final status: {status}"),
        }
    }

    /// Store whose update can be made to fail for one trade id.
    struct FailingUpdateStore {
        inner: InMemoryTradeStore,
        fail_update_for: std::sync::Mutex<Option<Uuid>>,
    }

    impl FailingUpdateStore {
        fn new() -> Self {
            Self {
                inner: InMemoryTradeStore::new(),
                fail_update_for: std::sync::Mutex::new(None),
            }
        }

        fn fail_updates_for(&self, id: Uuid) {
            *self.fail_update_for.lock().unwrap() = Some(id);
        }
    }

    #[async_trait::async_trait]
    impl crate::store::TradeStore for FailingUpdateStore {
        async fn insert(&self, trade: Trade) -> Result<Trade> {
            self.inner.insert(trade).await
        }

        async fn get(&self, id: Uuid) -> Result<Option<Trade>> {
            self.inner.get(id).await
        }

        async fn update(&self, trade: &Trade) -> Result<()> {
            if *self.fail_update_for.lock().unwrap() == Some(trade.id) {
                return Err(SettlementError::Storage("disk full".to_string()));
            }
            self.inner.update(trade).await
        }

        async fn list(&self, status: Option<TradeStatus>) -> Result<Vec<Trade>> {
            self.inner.list(status).await
        }

        async fn list_settling_before(
            &self,
            cutoff: chrono::DateTime<Utc>,
        ) -> Result<Vec<Trade>> {
            self.inner.list_settling_before(cutoff).await
        }
    }

    #[tokio::test]
    async fn test_sweep_continues_past_storage_trouble() {
        let chain = Arc::new(MockChainClient::new());
        let store = Arc::new(FailingUpdateStore::new());
        let service = SettlementService::new(
            store.clone(),
            chain.clone(),
            Arc::new(InMemoryQueue::new(8)),
            BigDecimal::from_str("0.001").unwrap(),
        );

        // Two stuck trades, both with a landed broadcast on chain.
        let mut ids = Vec::new();
        for _ in 0..2 {
            let trade = service.create_trade(new_trade("1", "10")).await.unwrap();
            service.begin_settlement(trade.id).await.unwrap();

            let mut stuck = store.get(trade.id).await.unwrap().unwrap();
            stuck.updated_at = Utc::now() - chrono::Duration::seconds(600);
            store.update(&stuck).await.unwrap();
            chain.prime_lookup(trade.id, "0xrecovered");
            ids.push(trade.id);
        }

        // The first trade's terminal write fails; the sweep must still
        // recover the second.
        store.fail_updates_for(ids[0]);

        let outcome = service
            .sweep_stuck_settlements(chrono::Duration::seconds(120))
            .await
            .unwrap();
        assert_eq!(outcome.recovered, 1);
        assert_eq!(outcome.still_ambiguous, 1);
        assert_eq!(outcome.timed_out, 0);

        let broken = store.get(ids[0]).await.unwrap().unwrap();
        assert_eq!(broken.status, TradeStatus::Settling);
        let recovered = store.get(ids[1]).await.unwrap().unwrap();
        assert_eq!(recovered.status, TradeStatus::Settled);
    }
}
