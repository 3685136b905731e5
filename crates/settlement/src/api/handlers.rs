//! API handlers for settlement HTTP endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use bigdecimal::BigDecimal;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::models::*;
use crate::error::SettlementError;
use crate::service::SettlementService;
use crate::types::{NewTrade, TradeStatus};

pub struct SettlementApiState {
    pub service: Arc<SettlementService>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(code: StatusCode, error_code: &str, message: String) -> ApiError {
    (
        code,
        Json(ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: error_code.to_string(),
                message,
            },
        }),
    )
}

fn map_error(e: SettlementError) -> ApiError {
    let (status, code) = match &e {
        SettlementError::NotFound(_) => (StatusCode::NOT_FOUND, "TRADE_NOT_FOUND"),
        SettlementError::Conflict { .. } => (StatusCode::CONFLICT, "INVALID_STATE"),
        SettlementError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        SettlementError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
        SettlementError::Storage(_) | SettlementError::QueueClosed => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        }
    };
    error_response(status, code, e.to_string())
}

fn parse_trade_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_TRADE_ID",
            "Invalid trade ID format".to_string(),
        )
    })
}

fn parse_decimal(raw: &str, field: &str) -> Result<BigDecimal, ApiError> {
    BigDecimal::from_str(raw).map_err(|_| {
        error_response(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            format!("{field} must be a decimal number"),
        )
    })
}

/// Health check handler
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "settlement".to_string(),
    })
}

/// Create trade handler
pub async fn create_trade(
    State(state): State<Arc<SettlementApiState>>,
    Json(req): Json<CreateTradeRequest>,
) -> Result<(StatusCode, Json<TradeResponse>), ApiError> {
    let input = NewTrade {
        buyer: req.buyer,
        seller: req.seller,
        base_asset: req.base_asset,
        quote_asset: req.quote_asset,
        amount: parse_decimal(&req.amount, "amount")?,
        price: parse_decimal(&req.price, "price")?,
    };

    let trade = state.service.create_trade(input).await.map_err(map_error)?;
    Ok((StatusCode::CREATED, Json(TradeResponse::from(trade))))
}

/// Get trade handler
pub async fn get_trade(
    State(state): State<Arc<SettlementApiState>>,
    Path(trade_id): Path<String>,
) -> Result<Json<TradeResponse>, ApiError> {
    let trade_id = parse_trade_id(&trade_id)?;
    let trade = state.service.get_trade(trade_id).await.map_err(map_error)?;
    Ok(Json(TradeResponse::from(trade)))
}

/// List trades handler
pub async fn list_trades(
    State(state): State<Arc<SettlementApiState>>,
    Query(params): Query<ListTradesParams>,
) -> Result<Json<ListTradesResponse>, ApiError> {
    let status = match params.status.as_deref() {
        Some(raw) => Some(TradeStatus::parse(raw).ok_or_else(|| {
            error_response(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                format!("Unknown trade status: {raw}"),
            )
        })?),
        None => None,
    };

    let trades = state.service.list_trades(status).await.map_err(map_error)?;
    let trades: Vec<TradeResponse> = trades.into_iter().map(TradeResponse::from).collect();
    Ok(Json(ListTradesResponse {
        success: true,
        total_count: trades.len() as u64,
        trades,
    }))
}

/// Request settlement handler
///
/// Returns 202: the trade is queued, not settled. Clients observe the
/// outcome by polling the trade.
pub async fn settle_trade(
    State(state): State<Arc<SettlementApiState>>,
    Path(trade_id): Path<String>,
) -> Result<(StatusCode, Json<SettleAcceptedResponse>), ApiError> {
    let trade_id = parse_trade_id(&trade_id)?;
    state
        .service
        .request_settlement(trade_id)
        .await
        .map_err(map_error)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SettleAcceptedResponse {
            success: true,
            trade_id,
            message: format!("Trade {trade_id} has been queued for settlement."),
        }),
    ))
}

/// Cancel trade handler
pub async fn cancel_trade(
    State(state): State<Arc<SettlementApiState>>,
    Path(trade_id): Path<String>,
) -> Result<Json<TradeResponse>, ApiError> {
    let trade_id = parse_trade_id(&trade_id)?;
    let trade = state
        .service
        .cancel_trade(trade_id)
        .await
        .map_err(map_error)?;
    Ok(Json(TradeResponse::from(trade)))
}
