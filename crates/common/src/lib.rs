//! Shared utilities for OpenSettle
//!
//! This crate provides cross-cutting pieces used by the binary and the
//! service crates.
//!
//! # Modules
//!
//! - [`shutdown`] - Graceful shutdown coordination

pub mod shutdown;

pub use shutdown::{run_until_shutdown, ShutdownController};
