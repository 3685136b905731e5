//! Observability for OpenSettle
//!
//! Logging initialization built on `tracing`. Every settlement state
//! transition is logged with the trade id, so the log stream doubles as an
//! audit trail for the lifecycle of each trade.

pub mod logging;

pub use logging::{init_logging, LogFormat};
