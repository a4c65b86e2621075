//! Single-Symbol Matching Engine
//!
//! A central limit order book (CLOB) with a price-time priority matching
//! engine for one instrument. Producers submit orders through a bounded
//! wait-free SPSC queue; a dedicated consumer thread matches them against
//! the book and reports trades and order-state transitions through
//! callbacks.
//!
//! # Features
//!
//! - **Price-Time Priority**: best price first, strict FIFO within a level
//! - **Wait-Free Submission**: bounded SPSC ring decouples producers from
//!   matching; `submit` never blocks
//! - **Single-Writer Book**: the engine thread holds exclusive write access,
//!   so matching takes no locks on the hot path
//! - **Lock-Free Order Handles**: submitters observe status and fill
//!   transitions on their retained `Arc<Order>` without synchronization
//! - **Market Data**: top-of-book, depth snapshots, and trade prints via the
//!   read-side publisher
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use orderbook_matching_engine::{MatchingEngine, Order, Side};
//!
//! let mut engine = MatchingEngine::new("AAPL");
//! engine.set_trade_callback(|trade| println!("trade {} @ {}", trade.quantity, trade.price));
//! engine.start();
//!
//! let sell = Arc::new(Order::new_limit(1, "AAPL", Side::Sell, 15000, 100));
//! let buy = Arc::new(Order::new_limit(2, "AAPL", Side::Buy, 15000, 50));
//! engine.submit(Arc::clone(&sell));
//! engine.submit(Arc::clone(&buy));
//!
//! engine.stop(); // drains every enqueued event before joining
//! assert_eq!(sell.filled_quantity(), 50);
//! ```
//!
//! # Architecture
//!
//! ```text
//! producer ──push──> EventQueue (SPSC ring) ──pop──> engine thread
//!                                                    ├─ OrderBook (BTreeMap sides)
//!                                                    │   └─ PriceLevel (FIFO)
//!                                                    ├─ trade callback
//!                                                    └─ order-update callback
//! ```
//!
//! The book is mutated only on the engine thread. External readers (e.g. the
//! market-data publisher) take a read guard via
//! [`MatchingEngine::order_book`].

pub mod engine;
pub mod marketdata;
pub mod metrics;
pub mod orderbook;
pub mod utils;

// Re-export commonly used types
pub use engine::{
    EngineStatistics, EventQueue, MatchingEngine, OrderEvent, DEFAULT_CAPACITY,
};
pub use marketdata::{MarketDataPublisher, MarketDataUpdate};
pub use metrics::EngineMetrics;
pub use orderbook::{
    DepthLevel, EngineError, EngineResult, Order, OrderBook, OrderId, OrderSnapshot, OrderStatus,
    OrderType, Price, PriceLevel, Quantity, Side, TopOfBook, Trade, TradeId,
};
