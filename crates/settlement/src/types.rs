//! Settlement domain types
//!
//! A [`Trade`] records one bilateral agreement to exchange `base_asset` for
//! `quote_asset` at a price. Its economic fields are arbitrary-precision
//! decimals; `total_quote_amount` and `fee_amount` are computed exactly once
//! at creation and never recomputed.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum stored length of a failure reason.
pub const MAX_FAILURE_REASON_LEN: usize = 255;

/// Trade lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    /// Created, not yet queued or picked up for settlement
    Pending,
    /// A worker has claimed the trade and the broadcast is in flight
    Settling,
    /// Broadcast succeeded; terminal
    Settled,
    /// Broadcast or persistence failed; terminal
    Failed,
    /// Cancelled before settlement began; terminal
    Canceled,
}

impl Default for TradeStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl TradeStatus {
    /// Whether the trade can enter settlement from this status.
    pub fn can_settle(&self) -> bool {
        matches!(self, TradeStatus::Pending)
    }

    /// Whether the trade can be cancelled from this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, TradeStatus::Pending)
    }

    /// Terminal statuses are retained as an audit record and never leave.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TradeStatus::Settled | TradeStatus::Failed | TradeStatus::Canceled
        )
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(TradeStatus::Pending),
            "settling" => Some(TradeStatus::Settling),
            "settled" => Some(TradeStatus::Settled),
            "failed" => Some(TradeStatus::Failed),
            "canceled" => Some(TradeStatus::Canceled),
            _ => None,
        }
    }
}

impl std::fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeStatus::Pending => write!(f, "pending"),
            TradeStatus::Settling => write!(f, "settling"),
            TradeStatus::Settled => write!(f, "settled"),
            TradeStatus::Failed => write!(f, "failed"),
            TradeStatus::Canceled => write!(f, "canceled"),
        }
    }
}

/// Input for trade creation, already validated at the API boundary.
#[derive(Debug, Clone)]
pub struct NewTrade {
    pub buyer: String,
    pub seller: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub amount: BigDecimal,
    pub price: BigDecimal,
}

/// A bilateral trade progressing through settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique trade identifier
    pub id: Uuid,
    /// Wallet address of the buyer
    pub buyer: String,
    /// Wallet address of the seller
    pub seller: String,
    /// Asset being bought/sold
    pub base_asset: String,
    /// Asset used for pricing
    pub quote_asset: String,
    /// Quantity of base_asset traded
    pub amount: BigDecimal,
    /// Price per unit of base_asset in quote_asset
    pub price: BigDecimal,
    /// amount * price, fixed at creation
    pub total_quote_amount: BigDecimal,
    /// total_quote_amount * fee_rate, fixed at creation
    pub fee_amount: BigDecimal,
    /// Asset the fee is paid in (the quote asset)
    pub fee_asset: String,
    /// Current lifecycle status
    pub status: TradeStatus,
    /// On-chain transaction hash, set on entry to Settled
    pub on_chain_tx_hash: Option<String>,
    /// Failure reason, set on entry to Failed (truncated to 255 chars)
    pub failure_reason: Option<String>,
    /// Creation timestamp, immutable
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
    /// Settlement timestamp, set on entry to Settled
    pub settled_at: Option<DateTime<Utc>>,
}

impl Trade {
    /// Create a trade in Pending status, computing the quote total and fee
    /// as exact decimal products.
    pub fn new(input: NewTrade, fee_rate: &BigDecimal) -> Self {
        let total_quote_amount = &input.amount * &input.price;
        let fee_amount = &total_quote_amount * fee_rate;
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            buyer: input.buyer,
            seller: input.seller,
            base_asset: input.base_asset,
            fee_asset: input.quote_asset.clone(),
            quote_asset: input.quote_asset,
            amount: input.amount,
            price: input.price,
            total_quote_amount,
            fee_amount,
            status: TradeStatus::Pending,
            on_chain_tx_hash: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
            settled_at: None,
        }
    }

    /// Immutable snapshot of the economic fields handed to the chain client.
    pub fn snapshot(&self) -> TradeSnapshot {
        TradeSnapshot {
            trade_id: self.id,
            buyer: self.buyer.clone(),
            seller: self.seller.clone(),
            base_asset: self.base_asset.clone(),
            quote_asset: self.quote_asset.clone(),
            amount: self.amount.clone(),
            price: self.price.clone(),
            total_quote_amount: self.total_quote_amount.clone(),
        }
    }
}

/// What the chain client sees when broadcasting a settlement.
///
/// A copy rather than a borrow: the broadcast may outlive any lock on the
/// trade record, and the record must not be readable mid-flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSnapshot {
    pub trade_id: Uuid,
    pub buyer: String,
    pub seller: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub amount: BigDecimal,
    pub price: BigDecimal,
    pub total_quote_amount: BigDecimal,
}

/// Truncate a failure reason to the stored column width, on a char boundary.
pub fn truncate_reason(reason: &str) -> String {
    reason.chars().take(MAX_FAILURE_REASON_LEN).collect()
}
