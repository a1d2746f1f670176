// ============================================================================
// Numeric Module
// Integer tick arithmetic for prices and quantities
// ============================================================================
//
// This module provides:
// - Price: signed integer number of price ticks
// - Quantity: signed integer number of units (negative only on malformed input)
// - NumericError: Error types for arithmetic operations
//
// Design principles:
// - No floating-point operations anywhere on the matching path
// - Checked arithmetic returns Result (no silent wrap-around)
// - Plain i64 representation, `Copy` and cheap to compare

mod errors;
mod ticks;

pub use errors::{NumericError, NumericResult};
pub use ticks::{Price, Quantity};
