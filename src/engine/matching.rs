use parking_lot::{RwLock, RwLockReadGuard};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::engine::queue::{EventConsumer, EventProducer, EventQueue, OrderEvent, DEFAULT_CAPACITY};
use crate::orderbook::book::OrderBook;
use crate::orderbook::error::{EngineError, EngineResult};
use crate::orderbook::types::{Order, OrderId, OrderStatus, OrderType, Side, Trade};

pub type TradeCallback = Box<dyn Fn(&Trade) + Send>;
pub type OrderUpdateCallback = Box<dyn Fn(&Order) + Send>;

/// Snapshot of the engine's counters. Counters are mutated only on the
/// engine thread; readers may observe a torn snapshot across fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStatistics {
    pub orders_processed: u64,
    pub trades_executed: u64,
    pub orders_cancelled: u64,
}

#[derive(Debug, Default)]
struct StatCounters {
    orders_processed: AtomicU64,
    trades_executed: AtomicU64,
    orders_cancelled: AtomicU64,
}

/// State shared between the engine handle and its consumer thread.
struct EngineShared {
    symbol: String,
    book: RwLock<OrderBook>,
    running: AtomicBool,
    trade_id_counter: AtomicU64,
    stats: StatCounters,
}

/// Single-symbol matching engine with price-time priority.
///
/// Producers push [`OrderEvent`]s through the SPSC queue via
/// [`submit`](Self::submit) / [`cancel`](Self::cancel) /
/// [`replace`](Self::replace); a dedicated consumer thread drains the queue,
/// mutates the book, and invokes the trade and order-update callbacks in
/// program order. The submission API takes `&mut self`, so one engine handle
/// is one logical producer.
pub struct MatchingEngine {
    shared: Arc<EngineShared>,
    producer: EventProducer,
    /// Present while the engine is stopped; moved onto the consumer thread
    /// by `start` and recovered by `stop`.
    worker: Option<EngineWorker>,
    handle: Option<JoinHandle<EngineWorker>>,
}

impl MatchingEngine {
    /// Engine for one instrument with the default queue capacity.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self::with_queue_capacity(symbol, DEFAULT_CAPACITY)
    }

    /// Engine with an explicit power-of-two queue capacity.
    pub fn with_queue_capacity(symbol: impl Into<String>, capacity: usize) -> Self {
        let symbol = symbol.into();
        let (producer, consumer) = EventQueue::with_capacity(capacity);
        let shared = Arc::new(EngineShared {
            book: RwLock::new(OrderBook::new(symbol.clone())),
            symbol,
            running: AtomicBool::new(false),
            trade_id_counter: AtomicU64::new(0),
            stats: StatCounters::default(),
        });
        Self {
            shared: Arc::clone(&shared),
            producer,
            worker: Some(EngineWorker {
                shared,
                consumer,
                trade_callback: None,
                order_update_callback: None,
            }),
            handle: None,
        }
    }

    /// Register the trade callback. Must be called before [`start`](Self::start).
    pub fn set_trade_callback(&mut self, callback: impl Fn(&Trade) + Send + 'static) {
        match &mut self.worker {
            Some(worker) => worker.trade_callback = Some(Box::new(callback)),
            None => warn!(symbol = %self.shared.symbol, "cannot set trade callback while running"),
        }
    }

    /// Register the order-update callback. Must be called before [`start`](Self::start).
    pub fn set_order_update_callback(&mut self, callback: impl Fn(&Order) + Send + 'static) {
        match &mut self.worker {
            Some(worker) => worker.order_update_callback = Some(Box::new(callback)),
            None => warn!(symbol = %self.shared.symbol, "cannot set order-update callback while running"),
        }
    }

    /// Spawn the consumer thread. Idempotent.
    pub fn start(&mut self) {
        if self.shared.running.swap(true, Ordering::AcqRel) {
            return;
        }
        let Some(worker) = self.worker.take() else {
            // A previous run panicked and took the consumer handle with it.
            self.shared.running.store(false, Ordering::Release);
            warn!(symbol = %self.shared.symbol, "engine worker unavailable, cannot start");
            return;
        };
        info!(symbol = %self.shared.symbol, "matching engine started");
        self.handle = Some(thread::spawn(move || worker.run()));
    }

    /// Signal shutdown, drain all enqueued events, and join the consumer
    /// thread. Idempotent.
    pub fn stop(&mut self) {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }
        // The sentinel forces the consumer to observe progress even if the
        // queue was empty. A full queue needs no sentinel: the consumer has
        // events to drain and will observe the cleared flag.
        let _ = self.producer.push(OrderEvent::Shutdown);
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(worker) => self.worker = Some(worker),
                Err(_) => error!(symbol = %self.shared.symbol, "engine thread panicked"),
            }
        }
        info!(symbol = %self.shared.symbol, "matching engine stopped");
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Validate and enqueue a new order.
    pub fn try_submit(&mut self, order: Arc<Order>) -> EngineResult<()> {
        if order.symbol != self.shared.symbol {
            return Err(EngineError::WrongSymbol);
        }
        if order.quantity <= 0 {
            return Err(EngineError::InvalidQuantity);
        }
        if self.producer.push(OrderEvent::NewOrder(order)) {
            Ok(())
        } else {
            Err(EngineError::QueueFull)
        }
    }

    /// Enqueue a new order. Returns `false` on wrong symbol, invalid
    /// quantity, or a full queue; no event is posted in those cases.
    pub fn submit(&mut self, order: Arc<Order>) -> bool {
        let order_id = order.id;
        match self.try_submit(order) {
            Ok(()) => true,
            Err(err) => {
                warn!(symbol = %self.shared.symbol, order_id, %err, "order submission rejected");
                false
            }
        }
    }

    /// Enqueue a cancel for a resting order.
    pub fn try_cancel(&mut self, order_id: OrderId) -> EngineResult<()> {
        if self.producer.push(OrderEvent::CancelOrder(order_id)) {
            Ok(())
        } else {
            Err(EngineError::QueueFull)
        }
    }

    /// Enqueue a cancel. Returns `false` only on a full queue; cancels for
    /// unknown ids are accepted and ignored by the consumer.
    pub fn cancel(&mut self, order_id: OrderId) -> bool {
        match self.try_cancel(order_id) {
            Ok(()) => true,
            Err(err) => {
                warn!(symbol = %self.shared.symbol, order_id, %err, "cancel rejected");
                false
            }
        }
    }

    /// Validate and enqueue a cancel-then-submit pair. The consumer
    /// processes the two halves back-to-back with no interleaved events,
    /// but they are not atomic at the book level.
    pub fn try_replace(&mut self, old_order_id: OrderId, order: Arc<Order>) -> EngineResult<()> {
        if order.symbol != self.shared.symbol {
            return Err(EngineError::WrongSymbol);
        }
        if order.quantity <= 0 {
            return Err(EngineError::InvalidQuantity);
        }
        if self.producer.push(OrderEvent::ReplaceOrder {
            old_order_id,
            order,
        }) {
            Ok(())
        } else {
            Err(EngineError::QueueFull)
        }
    }

    /// Enqueue a replace. Returns `false` on wrong symbol, invalid quantity,
    /// or a full queue.
    pub fn replace(&mut self, old_order_id: OrderId, order: Arc<Order>) -> bool {
        match self.try_replace(old_order_id, order) {
            Ok(()) => true,
            Err(err) => {
                warn!(symbol = %self.shared.symbol, old_order_id, %err, "replace rejected");
                false
            }
        }
    }

    /// Read-only view of the book for market-data producers. The consumer
    /// thread takes the write side per event, so readers never observe a
    /// half-applied match.
    pub fn order_book(&self) -> RwLockReadGuard<'_, OrderBook> {
        self.shared.book.read()
    }

    pub fn statistics(&self) -> EngineStatistics {
        EngineStatistics {
            orders_processed: self.shared.stats.orders_processed.load(Ordering::Relaxed),
            trades_executed: self.shared.stats.trades_executed.load(Ordering::Relaxed),
            orders_cancelled: self.shared.stats.orders_cancelled.load(Ordering::Relaxed),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.shared.symbol
    }
}

impl Drop for MatchingEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Consumer-thread half of the engine: the queue's consumer handle plus the
/// callbacks, returned to the [`MatchingEngine`] when the thread joins.
struct EngineWorker {
    shared: Arc<EngineShared>,
    consumer: EventConsumer,
    trade_callback: Option<TradeCallback>,
    order_update_callback: Option<OrderUpdateCallback>,
}

impl EngineWorker {
    fn run(mut self) -> Self {
        debug!(symbol = %self.shared.symbol, "engine thread running");
        while self.shared.running.load(Ordering::Acquire) || !self.consumer.is_empty() {
            match self.consumer.pop() {
                Some(event) => self.process_event(event),
                None => thread::yield_now(),
            }
        }
        debug!(symbol = %self.shared.symbol, "engine thread drained");
        self
    }

    fn process_event(&self, event: OrderEvent) {
        match event {
            OrderEvent::NewOrder(order) => self.process_new_order(order),
            OrderEvent::CancelOrder(order_id) => self.process_cancel(order_id),
            OrderEvent::ReplaceOrder {
                old_order_id,
                order,
            } => {
                // Cancel old, then run the replacement as a new order.
                self.process_cancel(old_order_id);
                self.process_new_order(order);
            }
            OrderEvent::Shutdown => {} // observed by the run() loop condition
        }
    }

    fn process_new_order(&self, order: Arc<Order>) {
        self.shared.stats.orders_processed.fetch_add(1, Ordering::Relaxed);

        let mut trades = Vec::new();
        {
            let mut book = self.shared.book.write();
            match order.order_type {
                OrderType::Market => self.match_market_order(&mut book, &order, &mut trades),
                OrderType::Limit => self.match_limit_order(&mut book, &order, &mut trades),
            }
        }

        // Callbacks run with no lock held, in program order: trades first,
        // then the final state of the incoming order.
        if let Some(callback) = &self.trade_callback {
            for trade in &trades {
                callback(trade);
            }
        }
        if let Some(callback) = &self.order_update_callback {
            callback(&order);
        }

        debug!(
            order_id = order.id,
            status = %order.status(),
            trades = trades.len(),
            "order processed"
        );
    }

    /// Limit matching: take the best opposite level while it is marketable
    /// against the incoming price, then rest any remainder on the book.
    fn match_limit_order(&self, book: &mut OrderBook, order: &Arc<Order>, trades: &mut Vec<Trade>) {
        while order.remaining_quantity() > 0 {
            let marketable = match order.side {
                Side::Buy => book.best_ask().map_or(false, |ask| order.price >= ask),
                Side::Sell => book.best_bid().map_or(false, |bid| order.price <= bid),
            };
            if !marketable {
                break;
            }
            if !self.execute_against_best(book, order, trades) {
                break;
            }
        }

        if order.remaining_quantity() > 0 {
            book.add(Arc::clone(order));
        }
    }

    /// Market matching: consume the best opposite level until the order is
    /// filled or liquidity runs out. Market orders never rest; any remainder
    /// is rejected.
    fn match_market_order(&self, book: &mut OrderBook, order: &Arc<Order>, trades: &mut Vec<Trade>) {
        while order.remaining_quantity() > 0 {
            let has_liquidity = match order.side {
                Side::Buy => book.best_ask().is_some(),
                Side::Sell => book.best_bid().is_some(),
            };
            if !has_liquidity {
                break;
            }
            if !self.execute_against_best(book, order, trades) {
                break;
            }
        }

        if order.remaining_quantity() > 0 {
            order.set_status(OrderStatus::Rejected);
            debug!(
                order_id = order.id,
                filled = order.filled_quantity(),
                "market order remainder rejected: insufficient liquidity"
            );
        }
    }

    /// One execution against the front of the best opposite level, at the
    /// resting order's price. Returns `false` if no counterparty exists.
    fn execute_against_best(
        &self,
        book: &mut OrderBook,
        incoming: &Arc<Order>,
        trades: &mut Vec<Trade>,
    ) -> bool {
        let level = match incoming.side {
            Side::Buy => book.best_ask_level_mut(),
            Side::Sell => book.best_bid_level_mut(),
        };
        let Some(level) = level else {
            return false;
        };
        let Some(front) = level.front() else {
            return false;
        };
        let resting = Arc::clone(front);

        // Price-time priority: the trade prints at the resting price.
        let match_price = resting.price;
        let match_quantity = incoming
            .remaining_quantity()
            .min(resting.remaining_quantity());

        incoming.fill(match_quantity);
        resting.fill(match_quantity);
        level.apply_fill(match_quantity);

        let (buy_order_id, sell_order_id) = match incoming.side {
            Side::Buy => (incoming.id, resting.id),
            Side::Sell => (resting.id, incoming.id),
        };
        let trade_id = self.shared.trade_id_counter.fetch_add(1, Ordering::Relaxed) + 1;
        trades.push(Trade::new(
            trade_id,
            self.shared.symbol.clone(),
            buy_order_id,
            sell_order_id,
            match_price,
            match_quantity,
        ));
        self.shared.stats.trades_executed.fetch_add(1, Ordering::Relaxed);
        debug!(
            trade_id,
            price = match_price,
            quantity = match_quantity,
            buy_order_id,
            sell_order_id,
            "trade executed"
        );

        if resting.is_filled() {
            book.remove_filled(&resting);
        }
        true
    }

    fn process_cancel(&self, order_id: OrderId) {
        if self.shared.book.write().cancel(order_id) {
            self.shared.stats.orders_cancelled.fetch_add(1, Ordering::Relaxed);
        } else {
            debug!(order_id, "cancel for unknown order id ignored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    type TradeLog = Arc<Mutex<Vec<Trade>>>;
    type UpdateLog = Arc<Mutex<Vec<(OrderId, OrderStatus)>>>;

    fn collecting_engine(symbol: &str) -> (MatchingEngine, TradeLog, UpdateLog) {
        let mut engine = MatchingEngine::new(symbol);
        let trades: TradeLog = Arc::new(Mutex::new(Vec::new()));
        let updates: UpdateLog = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&trades);
        engine.set_trade_callback(move |trade| sink.lock().push(trade.clone()));
        let sink = Arc::clone(&updates);
        engine.set_order_update_callback(move |order| sink.lock().push((order.id, order.status())));

        (engine, trades, updates)
    }

    fn limit(id: OrderId, side: Side, price: i64, quantity: i64) -> Arc<Order> {
        Arc::new(Order::new_limit(id, "AAPL", side, price, quantity))
    }

    fn market(id: OrderId, side: Side, quantity: i64) -> Arc<Order> {
        Arc::new(Order::new_market(id, "AAPL", side, quantity))
    }

    #[test]
    fn test_simple_cross() {
        let (mut engine, trades, _) = collecting_engine("AAPL");
        engine.start();

        let sell = limit(1, Side::Sell, 15000, 100);
        let buy = limit(2, Side::Buy, 15000, 50);
        assert!(engine.submit(Arc::clone(&sell)));
        assert!(engine.submit(Arc::clone(&buy)));
        engine.stop();

        let trades = trades.lock();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, 15000);
        assert_eq!(trades[0].quantity, 50);
        assert_eq!(trades[0].buy_order_id, 2);
        assert_eq!(trades[0].sell_order_id, 1);

        assert_eq!(buy.status(), OrderStatus::Filled);
        assert_eq!(sell.status(), OrderStatus::PartiallyFilled);
        assert_eq!(sell.filled_quantity(), 50);

        let book = engine.order_book();
        assert_eq!(book.best_ask(), Some(15000));
        assert_eq!(book.ask_level(15000).unwrap().total_quantity(), 50);
    }

    #[test]
    fn test_price_time_priority() {
        let (mut engine, trades, _) = collecting_engine("AAPL");
        engine.start();

        let sell1 = limit(1, Side::Sell, 15000, 100);
        let sell2 = limit(2, Side::Sell, 15000, 100);
        let buy = limit(3, Side::Buy, 15000, 150);
        engine.submit(Arc::clone(&sell1));
        engine.submit(Arc::clone(&sell2));
        engine.submit(Arc::clone(&buy));
        engine.stop();

        let trades = trades.lock();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].sell_order_id, 1);
        assert_eq!(trades[0].quantity, 100);
        assert_eq!(trades[1].sell_order_id, 2);
        assert_eq!(trades[1].quantity, 50);

        assert_eq!(sell1.status(), OrderStatus::Filled);
        assert_eq!(sell2.status(), OrderStatus::PartiallyFilled);
        assert_eq!(sell2.remaining_quantity(), 50);
        assert_eq!(buy.status(), OrderStatus::Filled);
    }

    #[test]
    fn test_market_order_fill() {
        let (mut engine, trades, _) = collecting_engine("AAPL");
        engine.start();

        let sell = limit(1, Side::Sell, 15000, 100);
        let buy = market(2, Side::Buy, 50);
        engine.submit(Arc::clone(&sell));
        engine.submit(Arc::clone(&buy));
        engine.stop();

        let trades = trades.lock();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, 15000);
        assert_eq!(trades[0].quantity, 50);
        assert_eq!(buy.status(), OrderStatus::Filled);
    }

    #[test]
    fn test_market_order_rejected_on_empty_book() {
        let (mut engine, trades, updates) = collecting_engine("AAPL");
        engine.start();

        let buy = market(1, Side::Buy, 10);
        engine.submit(Arc::clone(&buy));
        engine.stop();

        assert!(trades.lock().is_empty());
        assert_eq!(buy.status(), OrderStatus::Rejected);
        assert_eq!(updates.lock().as_slice(), &[(1, OrderStatus::Rejected)]);
    }

    #[test]
    fn test_market_order_partial_then_rejected() {
        let (mut engine, trades, _) = collecting_engine("AAPL");
        engine.start();

        let sell = limit(1, Side::Sell, 15000, 30);
        let buy = market(2, Side::Buy, 100);
        engine.submit(Arc::clone(&sell));
        engine.submit(Arc::clone(&buy));
        engine.stop();

        let trades = trades.lock();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].quantity, 30);
        assert_eq!(buy.status(), OrderStatus::Rejected);
        assert_eq!(buy.filled_quantity(), 30);
        // Market orders never rest
        assert_eq!(engine.order_book().total_orders(), 0);
    }

    #[test]
    fn test_price_improvement_prints_resting_price() {
        let (mut engine, trades, _) = collecting_engine("AAPL");
        engine.start();

        let buy = limit(1, Side::Buy, 15000, 100);
        let sell = limit(2, Side::Sell, 14995, 50);
        engine.submit(Arc::clone(&buy));
        engine.submit(Arc::clone(&sell));
        engine.stop();

        let trades = trades.lock();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, 15000); // resting price, not 14995
        assert_eq!(trades[0].quantity, 50);
        assert_eq!(sell.status(), OrderStatus::Filled);
        assert_eq!(buy.status(), OrderStatus::PartiallyFilled);
        assert_eq!(buy.remaining_quantity(), 50);
    }

    #[test]
    fn test_cancel_resting_order() {
        let (mut engine, _, _) = collecting_engine("AAPL");
        engine.start();

        let buy = limit(1, Side::Buy, 15000, 100);
        engine.submit(Arc::clone(&buy));
        engine.cancel(1);
        engine.stop();

        assert_eq!(engine.order_book().best_bid(), None);
        assert_eq!(buy.status(), OrderStatus::Cancelled);
        assert_eq!(engine.statistics().orders_cancelled, 1);

        // Second cancel finds nothing
        engine.start();
        engine.cancel(1);
        engine.stop();
        assert_eq!(engine.statistics().orders_cancelled, 1);
    }

    #[test]
    fn test_market_order_walks_multiple_levels() {
        let (mut engine, trades, _) = collecting_engine("AAPL");
        engine.start();

        engine.submit(limit(1, Side::Sell, 15000, 50));
        engine.submit(limit(2, Side::Sell, 15010, 50));
        let buy = market(3, Side::Buy, 75);
        engine.submit(Arc::clone(&buy));
        engine.stop();

        let trades = trades.lock();
        assert_eq!(trades.len(), 2);
        assert_eq!((trades[0].price, trades[0].quantity), (15000, 50));
        assert_eq!((trades[1].price, trades[1].quantity), (15010, 25));
        assert_eq!(buy.status(), OrderStatus::Filled);

        let book = engine.order_book();
        assert_eq!(book.best_ask(), Some(15010));
        assert_eq!(book.ask_level(15010).unwrap().total_quantity(), 25);
    }

    #[test]
    fn test_limit_order_stops_at_its_price() {
        let (mut engine, trades, _) = collecting_engine("AAPL");
        engine.start();

        engine.submit(limit(1, Side::Sell, 15000, 50));
        engine.submit(limit(2, Side::Sell, 15020, 50));
        let buy = limit(3, Side::Buy, 15010, 100);
        engine.submit(Arc::clone(&buy));
        engine.stop();

        let trades = trades.lock();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, 15000);
        assert_eq!(trades[0].quantity, 50);

        // Remainder rests at 15010; the 15020 ask is untouched
        assert_eq!(buy.status(), OrderStatus::PartiallyFilled);
        let book = engine.order_book();
        assert_eq!(book.best_bid(), Some(15010));
        assert_eq!(book.best_ask(), Some(15020));
    }

    #[test]
    fn test_replace_moves_order() {
        let (mut engine, _, updates) = collecting_engine("AAPL");
        engine.start();

        let original = limit(1, Side::Buy, 15000, 100);
        engine.submit(Arc::clone(&original));
        let replacement = limit(2, Side::Buy, 15010, 80);
        assert!(engine.replace(1, Arc::clone(&replacement)));
        engine.stop();

        assert_eq!(original.status(), OrderStatus::Cancelled);
        assert_eq!(replacement.status(), OrderStatus::New);
        let book = engine.order_book();
        assert_eq!(book.best_bid(), Some(15010));
        assert_eq!(book.total_orders(), 1);
        drop(book);

        // Both halves report: one update for the replacement's admission
        let updates = updates.lock();
        assert!(updates.contains(&(2, OrderStatus::New)));
        assert_eq!(engine.statistics().orders_cancelled, 1);
        assert_eq!(engine.statistics().orders_processed, 2);
    }

    #[test]
    fn test_replace_unknown_old_id_still_submits_new() {
        let (mut engine, _, _) = collecting_engine("AAPL");
        engine.start();

        let replacement = limit(5, Side::Sell, 15000, 40);
        assert!(engine.replace(99, Arc::clone(&replacement)));
        engine.stop();

        assert_eq!(engine.order_book().best_ask(), Some(15000));
        assert_eq!(engine.statistics().orders_cancelled, 0);
    }

    #[test]
    fn test_wrong_symbol_rejected_at_submit() {
        let (mut engine, _, _) = collecting_engine("AAPL");
        engine.start();

        let order = Arc::new(Order::new_limit(1, "MSFT", Side::Buy, 15000, 100));
        assert!(!engine.submit(Arc::clone(&order)));
        assert_eq!(
            engine.try_replace(1, Arc::new(Order::new_limit(2, "MSFT", Side::Buy, 15000, 100))),
            Err(EngineError::WrongSymbol)
        );
        engine.stop();

        // No event was posted
        assert_eq!(engine.statistics().orders_processed, 0);
        assert_eq!(order.status(), OrderStatus::New);
    }

    #[test]
    fn test_invalid_quantity_rejected_at_submit() {
        let (mut engine, _, _) = collecting_engine("AAPL");
        let order = Arc::new(Order::new_limit(1, "AAPL", Side::Buy, 15000, 0));
        assert_eq!(engine.try_submit(order), Err(EngineError::InvalidQuantity));
    }

    #[test]
    fn test_full_queue_rejects_submit() {
        let mut engine = MatchingEngine::with_queue_capacity("AAPL", 2);
        // Not started: nothing drains, and the 2-slot ring holds one event
        assert!(engine.submit(limit(1, Side::Buy, 15000, 100)));
        assert_eq!(
            engine.try_submit(limit(2, Side::Buy, 15000, 100)),
            Err(EngineError::QueueFull)
        );
        assert!(!engine.submit(limit(3, Side::Buy, 15000, 100)));
        assert_eq!(engine.try_cancel(1), Err(EngineError::QueueFull));
    }

    #[test]
    fn test_trade_ids_are_dense() {
        let (mut engine, trades, _) = collecting_engine("AAPL");
        engine.start();

        for id in 1..=5 {
            engine.submit(limit(id, Side::Sell, 15000, 10));
        }
        engine.submit(limit(6, Side::Buy, 15000, 50));
        engine.stop();

        let trades = trades.lock();
        assert_eq!(trades.len(), 5);
        for (index, trade) in trades.iter().enumerate() {
            assert_eq!(trade.trade_id, index as u64 + 1);
        }
    }

    #[test]
    fn test_statistics_counts() {
        let (mut engine, _, _) = collecting_engine("AAPL");
        engine.start();

        engine.submit(limit(1, Side::Sell, 15000, 100));
        engine.submit(limit(2, Side::Buy, 15000, 40));
        engine.submit(limit(3, Side::Buy, 14990, 10));
        engine.cancel(3);
        engine.cancel(42); // unknown, not counted
        engine.stop();

        let stats = engine.statistics();
        assert_eq!(stats.orders_processed, 3);
        assert_eq!(stats.trades_executed, 1);
        assert_eq!(stats.orders_cancelled, 1);
    }

    #[test]
    fn test_start_stop_idempotent_and_restartable() {
        let (mut engine, _, _) = collecting_engine("AAPL");
        engine.start();
        engine.start();
        assert!(engine.is_running());

        engine.submit(limit(1, Side::Buy, 15000, 100));
        engine.stop();
        engine.stop();
        assert!(!engine.is_running());
        assert_eq!(engine.order_book().best_bid(), Some(15000));

        // Restart processes new events with counters intact
        engine.start();
        engine.submit(limit(2, Side::Sell, 15000, 60));
        engine.stop();
        assert_eq!(engine.statistics().trades_executed, 1);
        assert_eq!(engine.statistics().orders_processed, 2);
    }

    #[test]
    fn test_stop_drains_pending_events() {
        let (mut engine, trades, _) = collecting_engine("AAPL");
        engine.start();

        // Enqueue a burst and stop immediately; every event must still be
        // processed before join.
        for id in 1..=100 {
            let side = if id % 2 == 0 { Side::Buy } else { Side::Sell };
            engine.submit(limit(id, side, 15000, 10));
        }
        engine.stop();

        assert_eq!(engine.statistics().orders_processed, 100);
        assert_eq!(trades.lock().len(), 50);
    }

    #[test]
    fn test_callback_order_trades_before_order_update() {
        let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let mut engine = MatchingEngine::new("AAPL");

        let sink = Arc::clone(&events);
        engine.set_trade_callback(move |trade| sink.lock().push(format!("trade:{}", trade.trade_id)));
        let sink = Arc::clone(&events);
        engine.set_order_update_callback(move |order| sink.lock().push(format!("order:{}", order.id)));

        engine.start();
        engine.submit(limit(1, Side::Sell, 15000, 50));
        engine.submit(limit(2, Side::Buy, 15000, 50));
        engine.stop();

        let events = events.lock();
        assert_eq!(
            events.as_slice(),
            &["order:1", "trade:1", "order:2"]
        );
    }
}
