//! HTTP API for the settlement service

pub mod handlers;
pub mod models;
pub mod routes;

pub use handlers::SettlementApiState;
pub use routes::create_router;
