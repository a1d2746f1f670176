// ============================================================================
// Error Taxonomy
// Rejections, backpressure, configuration and fatal invariant breaks
// ============================================================================

use crate::domain::OrderId;
use crate::numeric::{NumericError, Price, Quantity};
use std::fmt;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Why an order was refused at admission.
///
/// A rejection never mutates the book; it is a value handed back to the
/// caller and published to the outbound sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RejectReason {
    #[error("post-only order would cross the book")]
    PostOnlyWouldCross,

    #[error("insufficient liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity {
        requested: Quantity,
        available: Quantity,
    },

    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(Quantity),

    #[error("price must be at least one tick, got {0}")]
    NonPositivePrice(Price),

    #[error("unknown order type {0:?}")]
    UnknownOrderType(String),

    #[error("unknown side {0:?}")]
    UnknownSide(String),

    #[error("order id {0} is already live")]
    DuplicateOrderId(OrderId),
}

/// A broken internal invariant. The book can no longer be trusted once one
/// of these is observed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("order {order_id} would reach negative quantity {quantity}")]
    NegativeQuantity { order_id: OrderId, quantity: Quantity },

    #[error("index entry for order {order_id} points at a missing or foreign slot")]
    DanglingIndex { order_id: OrderId },

    #[error("tick arithmetic failed: {0}")]
    Arithmetic(#[from] NumericError),
}

/// Errors returned by the matching engine itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    /// A previous invariant violation stopped the engine.
    #[error("engine halted after an invariant violation")]
    Halted,
}

/// Invalid engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("instrument cannot be empty")]
    EmptyInstrument,

    #[error("tick size must be positive, got {0}")]
    NonPositiveTickSize(Price),

    #[error("{0} capacity must be positive")]
    ZeroCapacity(&'static str),
}

/// Backpressure from a full pipeline stage. Carries the rejected item back
/// so the caller can retry or drop it.
#[derive(Clone, Copy, PartialEq, Eq, Error)]
#[error("queue is full")]
pub struct QueueFull<T>(pub T);

impl<T> QueueFull<T> {
    /// Recover the item that could not be enqueued.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for QueueFull<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QueueFull(..)")
    }
}
