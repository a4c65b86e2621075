//! Matching engine: the SPSC event queue that decouples submission from
//! matching, and the consumer thread that runs price-time priority matching
//! against the book.

pub mod matching;
pub mod queue;

pub use matching::{EngineStatistics, MatchingEngine, OrderUpdateCallback, TradeCallback};
pub use queue::{EventConsumer, EventProducer, EventQueue, OrderEvent, DEFAULT_CAPACITY};
