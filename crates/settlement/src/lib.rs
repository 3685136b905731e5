//! Trade settlement pipeline for OpenSettle
//!
//! This crate handles the trade settlement lifecycle.
//!
//! # Features
//!
//! - Trade creation with derived economics (gross amount and fee)
//! - Asynchronous settlement through a job queue and worker pool
//! - Per-trade exclusive state transitions
//! - On-chain broadcast via a pluggable chain client
//! - Reconciliation of settlements interrupted mid-flight
//!
//! # Feature Flags
//!
//! - `api` - Enable HTTP API

pub mod chain;
pub mod error;
pub mod lock;
pub mod queue;
pub mod reconciler;
pub mod service;
pub mod store;
pub mod types;
pub mod worker;

#[cfg(feature = "api")]
pub mod api;

// Re-export main types
pub use error::{Result, SettlementError};
pub use service::{SettlementService, SweepOutcome};
pub use types::{NewTrade, Trade, TradeSnapshot, TradeStatus};

// Re-export collaborators
pub use chain::{ChainClient, MockChainClient, SimulatedChain};
pub use lock::TradeLockManager;
pub use queue::{InMemoryQueue, SettlementJob, SettlementQueue};
pub use reconciler::{spawn_reconciler, ReconcilerSettings};
pub use store::{InMemoryTradeStore, TradeStore};
pub use worker::SettlementWorkerPool;
