//! Settlement error types

use crate::types::TradeStatus;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur in the settlement pipeline
#[derive(Error, Debug)]
pub enum SettlementError {
    /// Referenced trade does not exist
    #[error("Trade not found: {0}")]
    NotFound(Uuid),

    /// Attempted transition violates the state machine guard
    #[error("Trade {trade_id} is not in the required state, current state: {status}")]
    Conflict { trade_id: Uuid, status: TradeStatus },

    /// The chain client raised during broadcast
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// Trade store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Malformed input at the creation boundary
    #[error("Validation error: {0}")]
    Validation(String),

    /// The settlement queue is no longer accepting jobs
    #[error("Settlement queue is closed")]
    QueueClosed,
}

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, SettlementError>;
