//! Read-side market-data publisher.
//!
//! Observes the order book through its exported accessors and hands tagged
//! updates to a registered callback. In production the callback would feed a
//! wire protocol; the core commits only to the update shapes.

use serde::{Deserialize, Serialize};

use crate::orderbook::book::OrderBook;
use crate::orderbook::types::{DepthLevel, Price, Quantity};
use crate::utils::time::Clock;

/// Market-data update, tagged with symbol and a microsecond timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketDataUpdate {
    TopOfBook {
        symbol: String,
        timestamp: u64,
        bid_price: Option<Price>,
        bid_quantity: Option<Quantity>,
        ask_price: Option<Price>,
        ask_quantity: Option<Quantity>,
    },
    DepthSnapshot {
        symbol: String,
        timestamp: u64,
        bids: Vec<DepthLevel>,
        asks: Vec<DepthLevel>,
    },
    Trade {
        symbol: String,
        timestamp: u64,
        price: Price,
        quantity: Quantity,
    },
}

pub type UpdateCallback = Box<dyn Fn(&MarketDataUpdate) + Send + Sync>;

/// Publishes book state and trade prints to one registered subscriber.
#[derive(Default)]
pub struct MarketDataPublisher {
    update_callback: Option<UpdateCallback>,
}

impl MarketDataPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_update_callback(
        &mut self,
        callback: impl Fn(&MarketDataUpdate) + Send + Sync + 'static,
    ) {
        self.update_callback = Some(Box::new(callback));
    }

    /// Publish the best level of each side.
    pub fn publish_top_of_book(&self, book: &OrderBook) {
        let top = book.top_of_book();
        self.publish(MarketDataUpdate::TopOfBook {
            symbol: book.symbol().to_string(),
            timestamp: Clock::monotonic_micros(),
            bid_price: top.bid_price,
            bid_quantity: top.bid_quantity,
            ask_price: top.ask_price,
            ask_quantity: top.ask_quantity,
        });
    }

    /// Publish the top `max_levels` levels of each side.
    pub fn publish_depth_snapshot(&self, book: &OrderBook, max_levels: usize) {
        self.publish(MarketDataUpdate::DepthSnapshot {
            symbol: book.symbol().to_string(),
            timestamp: Clock::monotonic_micros(),
            bids: book.bid_depth(max_levels),
            asks: book.ask_depth(max_levels),
        });
    }

    /// Publish a trade print.
    pub fn publish_trade(&self, symbol: &str, price: Price, quantity: Quantity) {
        self.publish(MarketDataUpdate::Trade {
            symbol: symbol.to_string(),
            timestamp: Clock::monotonic_micros(),
            price,
            quantity,
        });
    }

    fn publish(&self, update: MarketDataUpdate) {
        if let Some(callback) = &self.update_callback {
            callback(&update);
        }
    }
}
