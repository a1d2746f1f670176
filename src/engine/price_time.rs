// ============================================================================
// Price/Time Priority Matching Algorithm (FIFO)
// Most common in traditional exchanges (NASDAQ, NYSE, etc.)
// ============================================================================

use crate::domain::{Order, OrderBook, Trade};
use crate::error::InvariantViolation;
use crate::interfaces::MatchingAlgorithm;

/// Price/Time Priority (FIFO) matching algorithm
///
/// Orders at the same price are matched in ascending id order. The trade
/// always prints at the resting order's price.
///
/// # Example
/// ```text
/// Book:  100 x 1 (Order 1)
///        100 x 2 (Order 2)
///
/// Incoming: Buy 2 @ 100
/// Result: 1 @ 100 against order 1, then 1 @ 100 against order 2
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct PriceTimePriority;

impl PriceTimePriority {
    pub fn new() -> Self {
        Self
    }
}

impl MatchingAlgorithm for PriceTimePriority {
    fn match_step(
        &self,
        incoming: &mut Order,
        book: &mut OrderBook,
    ) -> Result<Option<Trade>, InvariantViolation> {
        if !incoming.quantity.is_positive() {
            return Ok(None);
        }
        let maker_side = incoming.side.opposite();
        let Some(best) = book.best(maker_side) else {
            return Ok(None);
        };
        if !self.prices_cross(incoming, best.price) {
            return Ok(None);
        }

        let quantity = incoming.quantity.min(best.quantity);
        let Some(fill) = book.fill_best(maker_side, quantity)? else {
            return Ok(None);
        };

        let remaining = incoming.quantity.checked_sub(quantity)?;
        if remaining.is_negative() {
            return Err(InvariantViolation::NegativeQuantity {
                order_id: incoming.id,
                quantity: remaining,
            });
        }
        incoming.quantity = remaining;

        Ok(Some(Trade::new(
            incoming.id,
            fill.maker.id,
            fill.maker.price,
            quantity,
        )))
    }

    fn name(&self) -> &str {
        "PriceTime"
    }
}
