//! Exchange Demo
//!
//! Scripted demonstration of the matching engine: seed a book, publish
//! market data, cross orders, send a market order, cancel, and report
//! statistics and metrics.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use orderbook_matching_engine::metrics::MetricsReporter;
use orderbook_matching_engine::utils::time::PrecisionTimestamp;
use orderbook_matching_engine::{
    EngineMetrics, MarketDataPublisher, MarketDataUpdate, MatchingEngine, Order, Side,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt().with_env_filter("info").init();

    let session_start = PrecisionTimestamp::now();
    info!("Starting exchange demo at {}", session_start.to_utc());

    // Install the Prometheus recorder so the metrics facade has a sink
    if let Err(e) = metrics_exporter_prometheus::PrometheusBuilder::new().install() {
        error!("Failed to install Prometheus recorder: {}", e);
    }

    // Metrics and periodic reporter
    let engine_metrics = Arc::new(EngineMetrics::new());
    let reporter = MetricsReporter::new(Arc::clone(&engine_metrics), Duration::from_secs(5));
    tokio::spawn(async move {
        reporter.run().await;
    });

    // Market-data publisher printing every update
    let mut publisher = MarketDataPublisher::new();
    publisher.set_update_callback(print_market_data);
    let publisher = Arc::new(publisher);

    // Matching engine for one symbol, with printing callbacks
    let mut engine = MatchingEngine::new("AAPL");

    let trade_metrics = Arc::clone(&engine_metrics);
    let trade_publisher = Arc::clone(&publisher);
    engine.set_trade_callback(move |trade| {
        info!(
            "[TRADE] id={} {} {}@{} buy_order={} sell_order={}",
            trade.trade_id,
            trade.symbol,
            trade.quantity,
            trade.price,
            trade.buy_order_id,
            trade.sell_order_id
        );
        trade_metrics
            .increment_trades_executed(trade.quantity as u64, (trade.price * trade.quantity) as u64);
        trade_publisher.publish_trade(&trade.symbol, trade.price, trade.quantity);
    });
    engine.set_order_update_callback(|order| {
        info!(
            "[ORDER] id={} {} {} px={} qty={} filled={} status={}",
            order.id,
            order.symbol,
            order.side,
            order.price,
            order.quantity,
            order.filled_quantity(),
            order.status()
        );
    });

    engine.start();

    // Build initial liquidity: five levels on each side
    info!("--- Building initial book ---");
    for i in 0..5i64 {
        let bid = Arc::new(Order::new_limit(
            1000 + i as u64,
            "AAPL",
            Side::Buy,
            15000 - i * 10,
            100,
        ));
        let ask = Arc::new(Order::new_limit(
            2000 + i as u64,
            "AAPL",
            Side::Sell,
            15100 + i * 10,
            100,
        ));
        if engine_metrics.time_submit(|| engine.submit(bid)) {
            engine_metrics.increment_orders_submitted();
        }
        if engine_metrics.time_submit(|| engine.submit(ask)) {
            engine_metrics.increment_orders_submitted();
        }
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    {
        let book = engine.order_book();
        publisher.publish_top_of_book(&book);
        publisher.publish_depth_snapshot(&book, 5);
    }

    // Cross the book with an aggressive limit buy
    info!("--- Matching orders ---");
    let aggressive_buy = Arc::new(Order::new_limit(3000, "AAPL", Side::Buy, 15100, 50));
    if engine_metrics.time_submit(|| engine.submit(aggressive_buy)) {
        engine_metrics.increment_orders_submitted();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Market sell against the bids
    let market_sell = Arc::new(Order::new_market(3001, "AAPL", Side::Sell, 75));
    if engine_metrics.time_submit(|| engine.submit(market_sell)) {
        engine_metrics.increment_orders_submitted();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    publisher.publish_top_of_book(&engine.order_book());

    // Cancel a resting bid
    info!("--- Cancelling order ---");
    if engine_metrics.time_cancel(|| engine.cancel(1001)) {
        engine_metrics.increment_orders_cancelled();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Final book gauges and statistics
    {
        let book = engine.order_book();
        if let Some(bid) = book.best_bid() {
            engine_metrics.set_best_bid(bid);
        }
        if let Some(ask) = book.best_ask() {
            engine_metrics.set_best_ask(ask);
        }
        if let Some(spread) = book.spread() {
            engine_metrics.set_spread(spread);
        }
        engine_metrics.set_resting_orders(book.total_orders() as u64);
        info!(
            "Book: bid={:?} ask={:?} spread={:?} mid={:?} resting={}",
            book.best_bid(),
            book.best_ask(),
            book.spread(),
            book.mid_price(),
            book.total_orders()
        );
    }

    let stats = engine.statistics();
    info!(
        "Statistics: processed={} trades={} cancelled={}",
        stats.orders_processed, stats.trades_executed, stats.orders_cancelled
    );

    engine.stop();
    info!(
        "Demo complete in {:.1} ms",
        session_start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(())
}

fn print_market_data(update: &MarketDataUpdate) {
    match update {
        MarketDataUpdate::TopOfBook {
            symbol,
            bid_price,
            bid_quantity,
            ask_price,
            ask_quantity,
            ..
        } => {
            info!(
                "[TOB] {} bid={:?}@{:?} ask={:?}@{:?}",
                symbol, bid_price, bid_quantity, ask_price, ask_quantity
            );
        }
        MarketDataUpdate::DepthSnapshot {
            symbol, bids, asks, ..
        } => {
            info!("[DEPTH] {}", symbol);
            for level in bids {
                info!(
                    "  bid {}@{} ({} orders)",
                    level.price, level.quantity, level.order_count
                );
            }
            for level in asks {
                info!(
                    "  ask {}@{} ({} orders)",
                    level.price, level.quantity, level.order_count
                );
            }
        }
        MarketDataUpdate::Trade {
            symbol,
            price,
            quantity,
            ..
        } => {
            info!("[TRADE UPDATE] {} {}@{}", symbol, quantity, price);
        }
    }
}
