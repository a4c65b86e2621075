use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::info;

/// Metrics for engine submissions and executions.
///
/// Counters mirror into the `metrics` facade so an installed recorder (the
/// demo binary installs Prometheus) sees everything the in-process trackers
/// see.
#[derive(Debug)]
pub struct EngineMetrics {
    submit_latency: LatencyTracker,
    cancel_latency: LatencyTracker,

    orders_submitted: AtomicU64,
    orders_cancelled: AtomicU64,
    trades_executed: AtomicU64,

    total_volume: AtomicU64,
    total_notional: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        describe_counter!("engine_orders_total", "Total orders submitted to the engine");
        describe_counter!("engine_trades_total", "Total trades executed");
        describe_counter!("engine_volume_total", "Total traded quantity");
        describe_histogram!(
            "engine_operation_duration_seconds",
            "Duration of producer-side engine operations"
        );
        describe_gauge!("engine_best_bid", "Current best bid in ticks");
        describe_gauge!("engine_best_ask", "Current best ask in ticks");
        describe_gauge!("engine_spread_ticks", "Current bid-ask spread in ticks");
        describe_gauge!("engine_resting_orders", "Orders currently resting in the book");

        Self {
            submit_latency: LatencyTracker::new("submit"),
            cancel_latency: LatencyTracker::new("cancel"),
            orders_submitted: AtomicU64::new(0),
            orders_cancelled: AtomicU64::new(0),
            trades_executed: AtomicU64::new(0),
            total_volume: AtomicU64::new(0),
            total_notional: AtomicU64::new(0),
        }
    }

    pub fn time_submit<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.submit_latency.time(f)
    }

    pub fn time_cancel<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.cancel_latency.time(f)
    }

    pub fn increment_orders_submitted(&self) {
        self.orders_submitted.fetch_add(1, Ordering::Relaxed);
        counter!("engine_orders_total", "operation" => "submit").increment(1);
    }

    pub fn increment_orders_cancelled(&self) {
        self.orders_cancelled.fetch_add(1, Ordering::Relaxed);
        counter!("engine_orders_total", "operation" => "cancel").increment(1);
    }

    pub fn increment_trades_executed(&self, quantity: u64, notional: u64) {
        self.trades_executed.fetch_add(1, Ordering::Relaxed);
        self.total_volume.fetch_add(quantity, Ordering::Relaxed);
        self.total_notional.fetch_add(notional, Ordering::Relaxed);

        counter!("engine_trades_total").increment(1);
        counter!("engine_volume_total").increment(quantity);
    }

    pub fn set_best_bid(&self, price: i64) {
        gauge!("engine_best_bid").set(price as f64);
    }

    pub fn set_best_ask(&self, price: i64) {
        gauge!("engine_best_ask").set(price as f64);
    }

    pub fn set_spread(&self, spread_ticks: i64) {
        gauge!("engine_spread_ticks").set(spread_ticks as f64);
    }

    pub fn set_resting_orders(&self, count: u64) {
        gauge!("engine_resting_orders").set(count as f64);
    }

    pub fn get_orders_submitted(&self) -> u64 {
        self.orders_submitted.load(Ordering::Relaxed)
    }

    pub fn get_orders_cancelled(&self) -> u64 {
        self.orders_cancelled.load(Ordering::Relaxed)
    }

    pub fn get_trades_executed(&self) -> u64 {
        self.trades_executed.load(Ordering::Relaxed)
    }

    pub fn get_total_volume(&self) -> u64 {
        self.total_volume.load(Ordering::Relaxed)
    }

    pub fn get_total_notional(&self) -> u64 {
        self.total_notional.load(Ordering::Relaxed)
    }

    pub fn get_latency_stats(&self) -> LatencyStats {
        LatencyStats {
            submit: self.submit_latency.get_stats(),
            cancel: self.cancel_latency.get_stats(),
        }
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency tracker for individual operations
#[derive(Debug)]
struct LatencyTracker {
    operation: &'static str,
    samples: AtomicU64,
    total_nanos: AtomicU64,
    min_nanos: AtomicU64,
    max_nanos: AtomicU64,
}

impl LatencyTracker {
    fn new(operation: &'static str) -> Self {
        Self {
            operation,
            samples: AtomicU64::new(0),
            total_nanos: AtomicU64::new(0),
            min_nanos: AtomicU64::new(u64::MAX),
            max_nanos: AtomicU64::new(0),
        }
    }

    fn time<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        self.record_latency(start.elapsed());
        result
    }

    fn record_latency(&self, duration: Duration) {
        let nanos = duration.as_nanos() as u64;

        self.samples.fetch_add(1, Ordering::Relaxed);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.min_nanos.fetch_min(nanos, Ordering::Relaxed);
        self.max_nanos.fetch_max(nanos, Ordering::Relaxed);

        histogram!("engine_operation_duration_seconds", "operation" => self.operation)
            .record(duration.as_secs_f64());
    }

    fn get_stats(&self) -> OperationLatencyStats {
        let samples = self.samples.load(Ordering::Relaxed);
        let total = self.total_nanos.load(Ordering::Relaxed);
        let min = self.min_nanos.load(Ordering::Relaxed);
        let max = self.max_nanos.load(Ordering::Relaxed);

        OperationLatencyStats {
            operation: self.operation,
            samples,
            avg_nanos: if samples > 0 { total / samples } else { 0 },
            min_nanos: if min == u64::MAX { 0 } else { min },
            max_nanos: max,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LatencyStats {
    pub submit: OperationLatencyStats,
    pub cancel: OperationLatencyStats,
}

#[derive(Debug, Clone)]
pub struct OperationLatencyStats {
    pub operation: &'static str,
    pub samples: u64,
    pub avg_nanos: u64,
    pub min_nanos: u64,
    pub max_nanos: u64,
}

impl OperationLatencyStats {
    pub fn avg_micros(&self) -> f64 {
        self.avg_nanos as f64 / 1_000.0
    }

    pub fn min_micros(&self) -> f64 {
        self.min_nanos as f64 / 1_000.0
    }

    pub fn max_micros(&self) -> f64 {
        self.max_nanos as f64 / 1_000.0
    }
}

/// Background metrics reporter
pub struct MetricsReporter {
    metrics: Arc<EngineMetrics>,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<EngineMetrics>, interval: Duration) -> Self {
        Self { metrics, interval }
    }

    pub async fn run(&self) {
        let mut interval = interval(self.interval);

        loop {
            interval.tick().await;

            let stats = self.metrics.get_latency_stats();
            info!(
                "Engine metrics - Orders: +{} -{} | Trades: {} | Volume: {} | Latency (us): submit={:.2} cancel={:.2}",
                self.metrics.get_orders_submitted(),
                self.metrics.get_orders_cancelled(),
                self.metrics.get_trades_executed(),
                self.metrics.get_total_volume(),
                stats.submit.avg_micros(),
                stats.cancel.avg_micros()
            );
        }
    }
}
