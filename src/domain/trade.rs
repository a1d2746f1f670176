// ============================================================================
// Trade Domain Model
// ============================================================================

use crate::numeric::{NumericResult, Price, Quantity};

use super::OrderId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One match step between an incoming order and a resting order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Trade {
    /// Order ID of the aggressive order (incoming)
    pub taker_order_id: OrderId,

    /// Order ID of the passive order (resting in book)
    pub maker_order_id: OrderId,

    /// Execution price, always the maker's
    pub price: Price,

    /// Executed quantity
    pub quantity: Quantity,
}

impl Trade {
    pub fn new(
        taker_order_id: OrderId,
        maker_order_id: OrderId,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        Self {
            taker_order_id,
            maker_order_id,
            price,
            quantity,
        }
    }

    /// Calculate the notional value of the trade (price * quantity)
    ///
    /// Returns a Result because multiplication can overflow.
    pub fn notional_value(&self) -> NumericResult<i64> {
        self.price.checked_notional(self.quantity)
    }
}
