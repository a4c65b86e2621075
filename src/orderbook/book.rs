use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::orderbook::price_level::PriceLevel;
use crate::orderbook::types::{DepthLevel, Order, OrderId, OrderStatus, Price, Side, TopOfBook};

/// Single-symbol order book: two price-ordered sides of resting liquidity.
///
/// Bids and asks are `BTreeMap`s keyed by price, so the best bid is the last
/// bid key and the best ask is the first ask key. An id index makes cancels
/// O(log n) locate + O(level) unlink. All mutation happens on the matching
/// engine thread.
#[derive(Debug)]
pub struct OrderBook {
    symbol: String,
    bids: BTreeMap<Price, PriceLevel>,
    asks: BTreeMap<Price, PriceLevel>,
    /// Resting order id -> (side, price) for cancel and fill-removal lookup.
    order_index: HashMap<OrderId, (Side, Price)>,
    sequence_counter: u64,
}

impl OrderBook {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            order_index: HashMap::new(),
            sequence_counter: 0,
        }
    }

    /// Admit a resting order. Assigns its sequence number and links it into
    /// the level for its price, creating the level if needed.
    ///
    /// Returns `false` without side effects if the order is for another
    /// symbol or its id is already resting.
    pub fn add(&mut self, order: Arc<Order>) -> bool {
        if order.symbol != self.symbol {
            warn!(
                order_id = order.id,
                symbol = %order.symbol,
                book = %self.symbol,
                "rejecting order for wrong symbol"
            );
            return false;
        }
        if self.order_index.contains_key(&order.id) {
            debug!(order_id = order.id, "duplicate order id, ignoring");
            return false;
        }

        self.sequence_counter += 1;
        order.assign_sequence(self.sequence_counter);

        let price = order.price;
        let side = order.side;
        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        levels
            .entry(price)
            .or_insert_with(|| PriceLevel::new(price))
            .add_order(Arc::clone(&order));
        self.order_index.insert(order.id, (side, price));

        debug!(order_id = order.id, %side, price, "order admitted to book");
        true
    }

    /// Cancel a resting order by id: mark it cancelled, unlink it, and prune
    /// the level if it becomes empty. Returns `false` if the id is not
    /// resting (unknown, already filled, or already cancelled).
    pub fn cancel(&mut self, order_id: OrderId) -> bool {
        let Some((side, price)) = self.order_index.remove(&order_id) else {
            return false;
        };
        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        if let Some(level) = levels.get_mut(&price) {
            if let Some(order) = level.remove_order(order_id) {
                order.set_status(OrderStatus::Cancelled);
                if level.is_empty() {
                    levels.remove(&price);
                }
                debug!(order_id, %side, price, "order cancelled");
                return true;
            }
        }
        false
    }

    /// Unlink a fully filled resting order, pruning its level if empty.
    /// Used by the matcher; the order's remaining quantity must be zero.
    pub(crate) fn remove_filled(&mut self, order: &Order) {
        if self.order_index.remove(&order.id).is_none() {
            return;
        }
        let levels = match order.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        if let Some(level) = levels.get_mut(&order.price) {
            level.remove_order(order.id);
            if level.is_empty() {
                levels.remove(&order.price);
            }
        }
    }

    /// Highest buy price, if any.
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next_back().copied()
    }

    /// Lowest sell price, if any.
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().copied()
    }

    /// `best_ask - best_bid` when both sides are quoted.
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Midpoint of the quoted spread. Floating point stays confined to this
    /// read-side accessor; book state and matching are integer-only.
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) as f64 / 2.0),
            _ => None,
        }
    }

    /// Best level of each side with its aggregated quantity.
    pub fn top_of_book(&self) -> TopOfBook {
        let mut top = TopOfBook::default();
        if let Some((price, level)) = self.bids.iter().next_back() {
            top.bid_price = Some(*price);
            top.bid_quantity = Some(level.total_quantity());
        }
        if let Some((price, level)) = self.asks.iter().next() {
            top.ask_price = Some(*price);
            top.ask_quantity = Some(level.total_quantity());
        }
        top
    }

    /// Top `max_levels` bid levels, best (highest price) first.
    pub fn bid_depth(&self, max_levels: usize) -> Vec<DepthLevel> {
        self.bids
            .values()
            .rev()
            .take(max_levels)
            .map(Self::depth_level)
            .collect()
    }

    /// Top `max_levels` ask levels, best (lowest price) first.
    pub fn ask_depth(&self, max_levels: usize) -> Vec<DepthLevel> {
        self.asks
            .values()
            .take(max_levels)
            .map(Self::depth_level)
            .collect()
    }

    fn depth_level(level: &PriceLevel) -> DepthLevel {
        DepthLevel {
            price: level.price(),
            quantity: level.total_quantity(),
            order_count: level.order_count(),
        }
    }

    /// Mutable handle on the best bid level, for the matcher.
    pub(crate) fn best_bid_level_mut(&mut self) -> Option<&mut PriceLevel> {
        self.bids.values_mut().next_back()
    }

    /// Mutable handle on the best ask level, for the matcher.
    pub(crate) fn best_ask_level_mut(&mut self) -> Option<&mut PriceLevel> {
        self.asks.values_mut().next()
    }

    pub fn bid_level(&self, price: Price) -> Option<&PriceLevel> {
        self.bids.get(&price)
    }

    pub fn ask_level(&self, price: Price) -> Option<&PriceLevel> {
        self.asks.get(&price)
    }

    pub fn bid_levels(&self) -> usize {
        self.bids.len()
    }

    pub fn ask_levels(&self) -> usize {
        self.asks.len()
    }

    /// Number of orders resting in the book.
    pub fn total_orders(&self) -> usize {
        self.order_index.len()
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}
