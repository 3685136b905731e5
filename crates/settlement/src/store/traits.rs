//! TradeStore trait definition

use crate::error::Result;
use crate::types::{Trade, TradeStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Interface for trade persistence.
///
/// Implementations can be swapped (in-memory, SQL, ...) without touching the
/// settlement logic. Trades are never deleted: terminal states stay behind
/// as an audit record.
#[async_trait]
pub trait TradeStore: Send + Sync {
    /// Persist a newly created trade.
    async fn insert(&self, trade: Trade) -> Result<Trade>;

    /// Get a trade by id, `None` if absent.
    async fn get(&self, id: Uuid) -> Result<Option<Trade>>;

    /// Overwrite an existing trade record.
    ///
    /// Errors with NotFound if the trade was never inserted.
    async fn update(&self, trade: &Trade) -> Result<()>;

    /// List trades, optionally filtered by status, newest first.
    async fn list(&self, status: Option<TradeStatus>) -> Result<Vec<Trade>>;

    /// Trades sitting in Settling whose last status change predates `cutoff`.
    ///
    /// Feed for the reconciliation sweep.
    async fn list_settling_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Trade>>;
}
