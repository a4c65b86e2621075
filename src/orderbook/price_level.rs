use std::collections::VecDeque;
use std::sync::Arc;

use crate::orderbook::types::{Order, OrderId, Price, Quantity};

/// All orders resting at a single price, in admission order (FIFO).
///
/// `total_quantity` aggregates the remaining quantity of every queued order.
/// Mutation happens only on the matching engine thread, so the level is plain
/// data behind `&mut`.
#[derive(Debug)]
pub struct PriceLevel {
    price: Price,
    total_quantity: Quantity,
    orders: VecDeque<Arc<Order>>,
}

impl PriceLevel {
    pub fn new(price: Price) -> Self {
        Self {
            price,
            total_quantity: 0,
            orders: VecDeque::new(),
        }
    }

    /// Append an order at the back, preserving time priority within the
    /// level. The book guarantees id uniqueness; a duplicate is ignored.
    pub fn add_order(&mut self, order: Arc<Order>) {
        if self.find_order(order.id).is_some() {
            return;
        }
        self.total_quantity += order.remaining_quantity();
        self.orders.push_back(order);
    }

    /// Unlink an order by id, subtracting its remaining quantity.
    pub fn remove_order(&mut self, order_id: OrderId) -> Option<Arc<Order>> {
        let pos = self.orders.iter().position(|o| o.id == order_id)?;
        let order = self.orders.remove(pos)?;
        self.total_quantity -= order.remaining_quantity();
        Some(order)
    }

    /// Oldest order at this price.
    pub fn front(&self) -> Option<&Arc<Order>> {
        self.orders.front()
    }

    /// Decrement the aggregate after the front order was partially or fully
    /// filled by the matcher.
    pub fn apply_fill(&mut self, delta: Quantity) {
        self.total_quantity -= delta;
    }

    pub fn find_order(&self, order_id: OrderId) -> Option<&Arc<Order>> {
        self.orders.iter().find(|o| o.id == order_id)
    }

    pub fn orders(&self) -> impl Iterator<Item = &Arc<Order>> {
        self.orders.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }
}
