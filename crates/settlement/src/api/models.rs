//! API models for settlement HTTP endpoints
//!
//! Decimal fields travel as strings on the wire so no client-side float
//! rounding ever touches the economics.

use crate::types::{Trade, TradeStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to record a new trade.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTradeRequest {
    pub buyer: String,
    pub seller: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub amount: String,
    pub price: String,
}

/// Single trade in API responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct TradeResponse {
    pub trade_id: Uuid,
    pub buyer: String,
    pub seller: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub amount: String,
    pub price: String,
    pub total_quote_amount: String,
    pub fee_amount: String,
    pub fee_asset: String,
    pub status: TradeStatus,
    #[serde(default)]
    pub on_chain_tx_hash: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub settled_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Trade> for TradeResponse {
    fn from(trade: Trade) -> Self {
        Self {
            trade_id: trade.id,
            buyer: trade.buyer,
            seller: trade.seller,
            base_asset: trade.base_asset,
            quote_asset: trade.quote_asset,
            amount: trade.amount.to_string(),
            price: trade.price.to_string(),
            total_quote_amount: trade.total_quote_amount.to_string(),
            fee_amount: trade.fee_amount.to_string(),
            fee_asset: trade.fee_asset,
            status: trade.status,
            on_chain_tx_hash: trade.on_chain_tx_hash,
            failure_reason: trade.failure_reason,
            created_at: trade.created_at,
            updated_at: trade.updated_at,
            settled_at: trade.settled_at,
        }
    }
}

/// List trades request parameters.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct ListTradesParams {
    #[serde(default)]
    pub status: Option<String>,
}

/// List trades response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListTradesResponse {
    pub success: bool,
    pub total_count: u64,
    pub trades: Vec<TradeResponse>,
}

/// Acknowledgement that a settlement request was queued.
#[derive(Debug, Serialize, Deserialize)]
pub struct SettleAcceptedResponse {
    pub success: bool,
    pub trade_id: Uuid,
    pub message: String,
}

/// Error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Generic error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}
