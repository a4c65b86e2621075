use chrono::{DateTime, Utc};
use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime};

static MONOTONIC_ANCHOR: OnceLock<Instant> = OnceLock::new();

/// Monotonic clock used for all internal timestamps.
///
/// Values are microseconds since an in-process anchor; they order events
/// within this process and must never be compared across processes or used
/// as identifiers.
pub struct Clock;

impl Clock {
    /// Microseconds since the process-local monotonic anchor.
    pub fn monotonic_micros() -> u64 {
        MONOTONIC_ANCHOR
            .get_or_init(Instant::now)
            .elapsed()
            .as_micros() as u64
    }
}

/// Timer for measuring operation latency
pub struct LatencyTimer {
    start: Instant,
}

impl LatencyTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Stop the timer and return elapsed duration
    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }

    /// Get elapsed time without stopping the timer
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Paired monotonic/wall-clock stamp, for human-readable reporting.
#[derive(Debug, Clone, Copy)]
pub struct PrecisionTimestamp {
    instant: Instant,
    system_time: SystemTime,
}

impl PrecisionTimestamp {
    pub fn now() -> Self {
        Self {
            instant: Instant::now(),
            system_time: SystemTime::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.instant.elapsed()
    }

    pub fn duration_since(&self, earlier: &PrecisionTimestamp) -> Duration {
        self.instant.duration_since(earlier.instant)
    }

    pub fn to_utc(&self) -> DateTime<Utc> {
        DateTime::from(self.system_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_monotonic_micros_advances() {
        let first = Clock::monotonic_micros();
        thread::sleep(Duration::from_millis(1));
        let second = Clock::monotonic_micros();

        assert!(second > first);
    }

    #[test]
    fn test_latency_timer() {
        let timer = LatencyTimer::start();
        thread::sleep(Duration::from_millis(1));
        assert!(timer.elapsed() >= Duration::from_millis(1));
        let elapsed = timer.stop();
        assert!(elapsed >= Duration::from_millis(1));
    }

    #[test]
    fn test_precision_timestamp() {
        let ts1 = PrecisionTimestamp::now();
        thread::sleep(Duration::from_millis(1));
        let ts2 = PrecisionTimestamp::now();

        assert!(ts2.duration_since(&ts1) >= Duration::from_millis(1));
        assert!(ts1.elapsed() >= Duration::from_millis(1));
    }
}
