//! API routes for the settlement service

use crate::api::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create the settlement router
pub fn create_router(state: SettlementApiState) -> Router {
    let state = Arc::new(state);
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/trades", post(create_trade).get(list_trades))
        .route("/api/v1/trades/:trade_id", get(get_trade).delete(cancel_trade))
        .route("/api/v1/trades/:trade_id/settle", post(settle_trade))
        .with_state(state)
}
