// ============================================================================
// Matching Algorithm Interface
// Defines the contract for the per-step execution rule
// ============================================================================

use crate::domain::{Order, OrderBook, Trade};
use crate::error::InvariantViolation;
use crate::numeric::Price;

/// Strategy interface for the execution step.
///
/// The engine owns admission, resting and the stop cascade; an algorithm
/// only decides how one incoming order trades against the book, one trade
/// at a time, so the engine can react to every trade as it happens.
pub trait MatchingAlgorithm: Send {
    /// Execute at most one trade between `incoming` and the opposite side.
    ///
    /// Decrements `incoming.quantity` and the maker's quantity by the traded
    /// amount. Returns `Ok(None)` when nothing more can trade.
    ///
    /// # Errors
    /// Propagates book invariant violations.
    fn match_step(
        &self,
        incoming: &mut Order,
        book: &mut OrderBook,
    ) -> Result<Option<Trade>, InvariantViolation>;

    /// Get the algorithm name for logging
    fn name(&self) -> &str;

    /// Whether `incoming` may trade against a resting price.
    /// Default implementation handles market and buy/sell logic
    fn prices_cross(&self, incoming: &Order, book_price: Price) -> bool {
        incoming.crosses(book_price)
    }

    /// Run `match_step` until nothing more trades.
    fn match_order(
        &self,
        incoming: &mut Order,
        book: &mut OrderBook,
    ) -> Result<Vec<Trade>, InvariantViolation> {
        let mut trades = Vec::new();
        while incoming.quantity.is_positive() {
            match self.match_step(incoming, book)? {
                Some(trade) => trades.push(trade),
                None => break,
            }
        }
        Ok(trades)
    }
}
