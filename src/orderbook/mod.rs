//! Core order book data structures: orders, price levels, and the
//! two-sided book with best-price lookups and depth snapshots.

pub mod book;
pub mod error;
pub mod price_level;
pub mod types;

// Re-export main types for convenience
pub use book::OrderBook;
pub use error::{EngineError, EngineResult};
pub use price_level::PriceLevel;
pub use types::{
    DepthLevel, Order, OrderId, OrderSnapshot, OrderStatus, OrderType, Price, Quantity, Side,
    TopOfBook, Trade, TradeId,
};
