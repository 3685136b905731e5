//! In-memory trade store implementation

use crate::error::{Result, SettlementError};
use crate::store::traits::TradeStore;
use crate::types::{Trade, TradeStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// In-memory trade store for testing and single-process deployments.
pub struct InMemoryTradeStore {
    trades: RwLock<HashMap<Uuid, Trade>>,
}

impl InMemoryTradeStore {
    /// Create a new in-memory trade store
    pub fn new() -> Self {
        Self {
            trades: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryTradeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TradeStore for InMemoryTradeStore {
    async fn insert(&self, trade: Trade) -> Result<Trade> {
        let mut trades = self.trades.write().unwrap();
        trades.insert(trade.id, trade.clone());
        Ok(trade)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Trade>> {
        let trades = self.trades.read().unwrap();
        Ok(trades.get(&id).cloned())
    }

    async fn update(&self, trade: &Trade) -> Result<()> {
        let mut trades = self.trades.write().unwrap();
        if trades.contains_key(&trade.id) {
            trades.insert(trade.id, trade.clone());
            Ok(())
        } else {
            Err(SettlementError::NotFound(trade.id))
        }
    }

    async fn list(&self, status: Option<TradeStatus>) -> Result<Vec<Trade>> {
        let trades = self.trades.read().unwrap();

        let mut result: Vec<Trade> = trades.values().cloned().collect();

        if let Some(status) = status {
            result.retain(|t| t.status == status);
        }

        // Newest first
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(result)
    }

    async fn list_settling_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Trade>> {
        let trades = self.trades.read().unwrap();

        Ok(trades
            .values()
            .filter(|t| t.status == TradeStatus::Settling && t.updated_at < cutoff)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NewTrade;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn create_test_trade() -> Trade {
        Trade::new(
            NewTrade {
                buyer: "wallet_buyer".to_string(),
                seller: "wallet_seller".to_string(),
                base_asset: "uBTC".to_string(),
                quote_asset: "uUSD".to_string(),
                amount: BigDecimal::from_str("1.5").unwrap(),
                price: BigDecimal::from_str("50000.75").unwrap(),
            },
            &BigDecimal::from_str("0.001").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemoryTradeStore::new();
        let trade = create_test_trade();
        let id = trade.id;

        store.insert(trade).await.unwrap();

        let retrieved = store.get(id).await.unwrap();
        assert!(retrieved.is_some());
        assert_eq!(retrieved.unwrap().id, id);
    }

    #[tokio::test]
    async fn test_update_missing_trade_fails() {
        let store = InMemoryTradeStore::new();
        let trade = create_test_trade();

        let result = store.update(&trade).await;
        assert!(matches!(result, Err(SettlementError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let store = InMemoryTradeStore::new();

        for i in 0..3 {
            let mut trade = create_test_trade();
            trade.created_at = Utc::now() + chrono::Duration::seconds(i);
            if i == 2 {
                trade.status = TradeStatus::Canceled;
            }
            store.insert(trade).await.unwrap();
        }

        let all = store.list(None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].created_at > all[1].created_at);

        let pending = store.list(Some(TradeStatus::Pending)).await.unwrap();
        assert_eq!(pending.len(), 2);

        let canceled = store.list(Some(TradeStatus::Canceled)).await.unwrap();
        assert_eq!(canceled.len(), 1);
    }

    #[tokio::test]
    async fn test_list_settling_before() {
        let store = InMemoryTradeStore::new();

        let mut stale = create_test_trade();
        stale.status = TradeStatus::Settling;
        stale.updated_at = Utc::now() - chrono::Duration::seconds(300);
        let stale_id = stale.id;
        store.insert(stale).await.unwrap();

        let mut fresh = create_test_trade();
        fresh.status = TradeStatus::Settling;
        store.insert(fresh).await.unwrap();

        let cutoff = Utc::now() - chrono::Duration::seconds(120);
        let stuck = store.list_settling_before(cutoff).await.unwrap();
        assert_eq!(stuck.len(), 1);
        assert_eq!(stuck[0].id, stale_id);
    }
}
