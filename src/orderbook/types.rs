use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicU8, Ordering};

use crate::utils::time::Clock;

pub type OrderId = u64;
pub type TradeId = u64;
pub type Price = i64; // Price in ticks (e.g., 1 tick = 0.01 cents)
pub type Quantity = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
    Market,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    fn as_u8(self) -> u8 {
        match self {
            OrderStatus::New => 0,
            OrderStatus::PartiallyFilled => 1,
            OrderStatus::Filled => 2,
            OrderStatus::Cancelled => 3,
            OrderStatus::Rejected => 4,
        }
    }

    fn from_u8(raw: u8) -> OrderStatus {
        match raw {
            0 => OrderStatus::New,
            1 => OrderStatus::PartiallyFilled,
            2 => OrderStatus::Filled,
            3 => OrderStatus::Cancelled,
            _ => OrderStatus::Rejected,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::New => write!(f, "NEW"),
            OrderStatus::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            OrderStatus::Filled => write!(f, "FILLED"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
            OrderStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// A single order: immutable identity plus lock-free execution state.
///
/// Identity fields are fixed at construction. Execution state lives in
/// atomics so a submitter holding an `Arc<Order>` observes status and fill
/// transitions without locks; after submission the matching engine thread is
/// the sole writer.
#[derive(Debug)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Price,
    pub quantity: Quantity,
    /// Monotonic microseconds at creation.
    pub timestamp: u64,
    filled_quantity: AtomicI64,
    status: AtomicU8,
    sequence_number: AtomicU64,
}

impl Order {
    pub fn new_limit(
        id: OrderId,
        symbol: impl Into<String>,
        side: Side,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit,
            price,
            quantity,
            timestamp: Clock::monotonic_micros(),
            filled_quantity: AtomicI64::new(0),
            status: AtomicU8::new(OrderStatus::New.as_u8()),
            sequence_number: AtomicU64::new(0),
        }
    }

    pub fn new_market(id: OrderId, symbol: impl Into<String>, side: Side, quantity: Quantity) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            price: 0, // Market orders don't carry a price
            quantity,
            timestamp: Clock::monotonic_micros(),
            filled_quantity: AtomicI64::new(0),
            status: AtomicU8::new(OrderStatus::New.as_u8()),
            sequence_number: AtomicU64::new(0),
        }
    }

    pub fn filled_quantity(&self) -> Quantity {
        self.filled_quantity.load(Ordering::Acquire)
    }

    pub fn remaining_quantity(&self) -> Quantity {
        self.quantity - self.filled_quantity()
    }

    pub fn status(&self) -> OrderStatus {
        OrderStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number.load(Ordering::Acquire)
    }

    pub fn is_filled(&self) -> bool {
        self.filled_quantity() >= self.quantity
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status(), OrderStatus::New | OrderStatus::PartiallyFilled)
    }

    /// Record an execution against this order and update its status.
    ///
    /// Engine-thread only. The status store releases the fill so readers that
    /// observe the new status also observe the new filled quantity.
    pub(crate) fn fill(&self, quantity: Quantity) {
        let filled = self.filled_quantity.fetch_add(quantity, Ordering::Relaxed) + quantity;
        let status = if filled >= self.quantity {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        self.status.store(status.as_u8(), Ordering::Release);
    }

    /// Engine-thread only.
    pub(crate) fn set_status(&self, status: OrderStatus) {
        self.status.store(status.as_u8(), Ordering::Release);
    }

    /// Assigned by the book on admission. Engine-thread only.
    pub(crate) fn assign_sequence(&self, sequence: u64) {
        self.sequence_number.store(sequence, Ordering::Release);
    }

    /// Plain-value copy of the order's current state, for serialization and
    /// reporting.
    pub fn snapshot(&self) -> OrderSnapshot {
        OrderSnapshot {
            id: self.id,
            symbol: self.symbol.clone(),
            side: self.side,
            order_type: self.order_type,
            price: self.price,
            quantity: self.quantity,
            filled_quantity: self.filled_quantity(),
            status: self.status(),
            timestamp: self.timestamp,
            sequence_number: self.sequence_number(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub id: OrderId,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Price,
    pub quantity: Quantity,
    pub filled_quantity: Quantity,
    pub status: OrderStatus,
    pub timestamp: u64,
    pub sequence_number: u64,
}

/// An executed match between one buy and one sell order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    pub symbol: String,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
    /// Monotonic microseconds at execution.
    pub timestamp: u64,
}

impl Trade {
    pub fn new(
        trade_id: TradeId,
        symbol: impl Into<String>,
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        Self {
            trade_id,
            symbol: symbol.into(),
            buy_order_id,
            sell_order_id,
            price,
            quantity,
            timestamp: Clock::monotonic_micros(),
        }
    }
}

/// Best level of each side; either side may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopOfBook {
    pub bid_price: Option<Price>,
    pub bid_quantity: Option<Quantity>,
    pub ask_price: Option<Price>,
    pub ask_quantity: Option<Quantity>,
}

/// One aggregated price level in a depth snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: Price,
    pub quantity: Quantity,
    pub order_count: usize,
}
