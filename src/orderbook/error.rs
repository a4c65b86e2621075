use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineError {
    /// Order symbol does not match the engine's symbol
    WrongSymbol,

    /// Order quantity must be strictly positive
    InvalidQuantity,

    /// Event queue is full; caller should surface backpressure
    QueueFull,

    /// Order not found in the book
    OrderNotFound,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::WrongSymbol => write!(f, "Wrong symbol for this engine"),
            EngineError::InvalidQuantity => write!(f, "Invalid quantity"),
            EngineError::QueueFull => write!(f, "Event queue full"),
            EngineError::OrderNotFound => write!(f, "Order not found"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
