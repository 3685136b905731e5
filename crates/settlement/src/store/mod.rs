//! Trade storage

pub mod memory;
pub mod traits;

pub use memory::InMemoryTradeStore;
pub use traits::TradeStore;
