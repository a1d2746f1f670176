// ============================================================================
// Order Book Domain Model
// Two price-time ranked heaps of resting orders for one instrument
// ============================================================================

use crate::error::{InvariantViolation, RejectReason};
use crate::numeric::{NumericResult, Price, Quantity};
use std::cmp::Ordering;

use super::heap::{side_priority, HeapItem, IndexedHeap};
use super::{OrderId, RestingOrder, Side};

impl HeapItem for RestingOrder {
    #[inline]
    fn key(&self) -> OrderId {
        self.id
    }

    #[inline]
    fn priority_cmp(&self, other: &Self) -> Ordering {
        side_priority(
            self.side,
            (self.price.raw(), self.id),
            (other.price.raw(), other.id),
        )
    }
}

// ============================================================================
// Order Book Side
// ============================================================================

/// Resting orders of one side, best first.
#[derive(Debug, Clone)]
pub struct OrderBookSide {
    pub side: Side,
    orders: IndexedHeap<RestingOrder>,
}

impl OrderBookSide {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            orders: IndexedHeap::new(),
        }
    }

    /// Top-of-book order
    pub fn best(&self) -> Option<&RestingOrder> {
        self.orders.peek()
    }

    pub fn best_price(&self) -> Option<Price> {
        self.best().map(|order| order.price)
    }

    pub fn get(&self, id: OrderId) -> Option<&RestingOrder> {
        self.orders.get(id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Every resting order in priority order.
    pub fn orders(&self) -> Vec<&RestingOrder> {
        self.orders.sorted()
    }

    /// Quantity resting at prices a taker limited to `limit` would accept.
    /// `None` means any price.
    pub fn quantity_within(&self, limit: Option<Price>) -> Quantity {
        self.orders
            .iter()
            .filter(|order| match (limit, self.side) {
                (None, _) => true,
                // Taker sells into bids at or above its limit
                (Some(limit), Side::Buy) => order.price >= limit,
                // Taker buys from asks at or below its limit
                (Some(limit), Side::Sell) => order.price <= limit,
            })
            .fold(Quantity::ZERO, |acc, order| acc.saturating_add(order.quantity))
    }

    /// Depth summary: (price, total quantity) per level, best first.
    pub fn depth(&self, num_levels: usize) -> Vec<(Price, Quantity)> {
        let mut levels: Vec<(Price, Quantity)> = Vec::new();
        for order in self.orders.sorted() {
            match levels.last_mut() {
                Some((price, total)) if *price == order.price => {
                    *total = total.saturating_add(order.quantity);
                }
                _ => {
                    if levels.len() == num_levels {
                        break;
                    }
                    levels.push((order.price, order.quantity));
                }
            }
        }
        levels
    }

    fn insert(&mut self, order: RestingOrder) -> Result<(), RejectReason> {
        self.orders
            .push(order)
            .map_err(|rejected| RejectReason::DuplicateOrderId(rejected.id))
    }

    fn remove(&mut self, id: OrderId) -> Result<Option<RestingOrder>, InvariantViolation> {
        self.orders.remove(id)
    }

    /// Take `quantity` off the best order, removing it once exhausted.
    fn fill_best(&mut self, quantity: Quantity) -> Result<Option<Fill>, InvariantViolation> {
        let Some(best) = self.orders.peek_mut() else {
            return Ok(None);
        };
        let remaining = best.quantity.checked_sub(quantity)?;
        if remaining.is_negative() {
            return Err(InvariantViolation::NegativeQuantity {
                order_id: best.id,
                quantity: remaining,
            });
        }
        // Only the quantity changes, so the heap order is untouched.
        best.quantity = remaining;
        let fill = Fill {
            maker: *best,
            quantity,
        };
        if remaining.is_zero() {
            self.orders.pop();
        }
        Ok(Some(fill))
    }
}

/// Outcome of one fill against the top of a side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    /// Maker as it stands after the fill (`quantity` is what remains)
    pub maker: RestingOrder,
    pub quantity: Quantity,
}

impl Fill {
    pub fn exhausted_maker(&self) -> bool {
        self.maker.quantity.is_zero()
    }
}

// ============================================================================
// Order Book
// ============================================================================

/// Bids ranked by (price desc, id asc), asks by (price asc, id asc).
#[derive(Debug, Clone)]
pub struct OrderBook {
    tick_size: Price,
    bids: OrderBookSide,
    asks: OrderBookSide,
}

impl Default for OrderBook {
    fn default() -> Self {
        Self {
            tick_size: Price::new(1),
            bids: OrderBookSide::new(Side::Buy),
            asks: OrderBookSide::new(Side::Sell),
        }
    }
}

impl OrderBook {
    /// # Errors
    /// Returns `InvalidTickSize` if `tick_size` is not positive.
    pub fn new(tick_size: Price) -> NumericResult<Self> {
        // Probe once so every later floor is known to succeed
        Price::ZERO.floor_to_tick(tick_size)?;
        Ok(Self {
            tick_size,
            ..Self::default()
        })
    }

    pub fn tick_size(&self) -> Price {
        self.tick_size
    }

    /// Floor a price to the book's tick size.
    pub fn round_price(&self, price: Price) -> Price {
        price.floor_to_tick(self.tick_size).unwrap_or(Price::ZERO)
    }

    /// Insert a resting order after flooring its price to the tick size.
    ///
    /// # Errors
    /// Rejects non-positive quantities, prices that floor to zero or below,
    /// and ids already live on either side.
    pub fn add_order(&mut self, mut order: RestingOrder) -> Result<(), RejectReason> {
        if !order.quantity.is_positive() {
            return Err(RejectReason::NonPositiveQuantity(order.quantity));
        }
        order.price = self.round_price(order.price);
        if !order.price.is_positive() {
            return Err(RejectReason::NonPositivePrice(order.price));
        }
        if self.contains(order.id) {
            return Err(RejectReason::DuplicateOrderId(order.id));
        }
        self.side_mut(order.side).insert(order)
    }

    /// Remove a resting order. Unknown ids are a no-op.
    pub fn remove_order(
        &mut self,
        id: OrderId,
    ) -> Result<Option<RestingOrder>, InvariantViolation> {
        match self.bids.remove(id)? {
            Some(order) => Ok(Some(order)),
            None => self.asks.remove(id),
        }
    }

    pub fn best_bid(&self) -> Option<&RestingOrder> {
        self.bids.best()
    }

    pub fn best_ask(&self) -> Option<&RestingOrder> {
        self.asks.best()
    }

    pub fn best(&self, side: Side) -> Option<&RestingOrder> {
        self.side(side).best()
    }

    pub fn side(&self, side: Side) -> &OrderBookSide {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    /// Fill `quantity` against the best order of `side`.
    ///
    /// Returns `None` if that side is empty.
    ///
    /// # Errors
    /// `NegativeQuantity` if `quantity` exceeds the maker's size.
    pub fn fill_best(
        &mut self,
        side: Side,
        quantity: Quantity,
    ) -> Result<Option<Fill>, InvariantViolation> {
        self.side_mut(side).fill_best(quantity)
    }

    /// Opposite-side quantity an order from `taker_side` could reach at or
    /// better than `limit` (`None`: any price).
    pub fn available_liquidity(&self, taker_side: Side, limit: Option<Price>) -> Quantity {
        self.side(taker_side.opposite()).quantity_within(limit)
    }

    /// Whether `price` on `side` would trade against the opposite best.
    pub fn would_cross(&self, side: Side, price: Price) -> bool {
        match side {
            Side::Buy => self.asks.best_price().is_some_and(|ask| price >= ask),
            Side::Sell => self.bids.best_price().is_some_and(|bid| price <= bid),
        }
    }

    pub fn is_crossed(&self) -> bool {
        match (self.bids.best_price(), self.asks.best_price()) {
            (Some(bid), Some(ask)) => bid >= ask,
            _ => false,
        }
    }

    pub fn contains(&self, id: OrderId) -> bool {
        self.bids.get(id).is_some() || self.asks.get(id).is_some()
    }

    pub fn get(&self, id: OrderId) -> Option<&RestingOrder> {
        self.bids.get(id).or_else(|| self.asks.get(id))
    }

    pub fn len(&self) -> usize {
        self.bids.len() + self.asks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// One `SIDE: id, price, quantity` line per resting order, bids first,
    /// each side in priority order.
    pub fn snapshot_lines(&self) -> Vec<String> {
        let bids = self
            .bids
            .orders()
            .into_iter()
            .map(|o| format!("BID: {}, {}, {}", o.id, o.price, o.quantity));
        let asks = self
            .asks
            .orders()
            .into_iter()
            .map(|o| format!("ASK: {}, {}, {}", o.id, o.price, o.quantity));
        bids.chain(asks).collect()
    }

    /// Snapshot lines joined with newlines.
    pub fn snapshot_text(&self) -> String {
        self.snapshot_lines().join("\n")
    }

    /// Heap shape, index consistency and strictly positive quantities.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        for side in [&self.bids, &self.asks] {
            side.orders.check_invariants()?;
            if let Some(order) = side.orders.iter().find(|o| !o.quantity.is_positive()) {
                return Err(InvariantViolation::NegativeQuantity {
                    order_id: order.id,
                    quantity: order.quantity,
                });
            }
        }
        Ok(())
    }

    fn side_mut(&mut self, side: Side) -> &mut OrderBookSide {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resting(id: u64, side: Side, price: i64, quantity: i64) -> RestingOrder {
        RestingOrder::new(OrderId(id), side, Price::new(price), Quantity::new(quantity))
    }

    fn book_with(orders: &[(u64, Side, i64, i64)]) -> OrderBook {
        let mut book = OrderBook::default();
        for &(id, side, price, qty) in orders {
            book.add_order(resting(id, side, price, qty)).unwrap();
        }
        book
    }

    #[test]
    fn test_best_of_each_side() {
        let book = book_with(&[
            (1, Side::Buy, 99, 5),
            (2, Side::Buy, 100, 5),
            (3, Side::Sell, 103, 5),
            (4, Side::Sell, 101, 5),
        ]);
        assert_eq!(book.best_bid().map(|o| o.id), Some(OrderId(2)));
        assert_eq!(book.best_ask().map(|o| o.id), Some(OrderId(4)));
        assert!(!book.is_crossed());
    }

    #[test]
    fn test_equal_price_orders_are_fifo_by_id() {
        let book = book_with(&[
            (7, Side::Sell, 100, 1),
            (3, Side::Sell, 100, 1),
            (5, Side::Sell, 100, 1),
        ]);
        let ids: Vec<OrderId> = book.side(Side::Sell).orders().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![OrderId(3), OrderId(5), OrderId(7)]);
    }

    #[test]
    fn test_add_floors_to_tick() {
        let mut book = OrderBook::new(Price::new(5)).unwrap();
        book.add_order(resting(1, Side::Buy, 104, 1)).unwrap();
        assert_eq!(book.best_bid().unwrap().price, Price::new(100));

        assert_eq!(
            book.add_order(resting(2, Side::Buy, 4, 1)),
            Err(RejectReason::NonPositivePrice(Price::ZERO))
        );
    }

    #[test]
    fn test_add_rejects_price_that_cannot_floor() {
        let mut book = OrderBook::new(Price::new(3)).unwrap();
        assert_eq!(
            book.add_order(resting(1, Side::Sell, i64::MIN, 1)),
            Err(RejectReason::NonPositivePrice(Price::ZERO))
        );
        assert!(book.is_empty());
    }

    #[test]
    fn test_invalid_tick_size() {
        assert!(OrderBook::new(Price::ZERO).is_err());
        assert!(OrderBook::new(Price::new(-1)).is_err());
    }

    #[test]
    fn test_duplicate_id_rejected_across_sides() {
        let mut book = book_with(&[(1, Side::Buy, 100, 1)]);
        assert_eq!(
            book.add_order(resting(1, Side::Sell, 105, 1)),
            Err(RejectReason::DuplicateOrderId(OrderId(1)))
        );
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut book = book_with(&[(1, Side::Buy, 100, 1), (2, Side::Sell, 101, 1)]);
        assert_eq!(book.remove_order(OrderId(2)).unwrap().map(|o| o.id), Some(OrderId(2)));
        assert_eq!(book.remove_order(OrderId(2)).unwrap(), None);
        assert_eq!(book.remove_order(OrderId(99)).unwrap(), None);
        assert!(book.best_ask().is_none());
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_fill_best_partial_then_exhaust() {
        let mut book = book_with(&[(1, Side::Sell, 100, 5), (2, Side::Sell, 101, 5)]);

        let fill = book.fill_best(Side::Sell, Quantity::new(3)).unwrap().unwrap();
        assert_eq!(fill.maker.quantity, Quantity::new(2));
        assert!(!fill.exhausted_maker());
        assert_eq!(book.best_ask().unwrap().quantity, Quantity::new(2));

        let fill = book.fill_best(Side::Sell, Quantity::new(2)).unwrap().unwrap();
        assert!(fill.exhausted_maker());
        assert_eq!(book.best_ask().unwrap().id, OrderId(2));
        book.check_invariants().unwrap();
    }

    #[test]
    fn test_overfill_is_invariant_violation() {
        let mut book = book_with(&[(1, Side::Sell, 100, 5)]);
        assert_eq!(
            book.fill_best(Side::Sell, Quantity::new(6)),
            Err(InvariantViolation::NegativeQuantity {
                order_id: OrderId(1),
                quantity: Quantity::new(-1),
            })
        );
        assert_eq!(book.fill_best(Side::Buy, Quantity::new(1)), Ok(None));
    }

    #[test]
    fn test_available_liquidity() {
        let book = book_with(&[
            (1, Side::Sell, 100, 3),
            (2, Side::Sell, 101, 4),
            (3, Side::Sell, 105, 10),
            (4, Side::Buy, 98, 2),
            (5, Side::Buy, 97, 6),
        ]);
        assert_eq!(
            book.available_liquidity(Side::Buy, Some(Price::new(101))),
            Quantity::new(7)
        );
        assert_eq!(book.available_liquidity(Side::Buy, None), Quantity::new(17));
        assert_eq!(
            book.available_liquidity(Side::Sell, Some(Price::new(98))),
            Quantity::new(2)
        );
        assert_eq!(
            book.available_liquidity(Side::Sell, Some(Price::new(99))),
            Quantity::ZERO
        );
    }

    #[test]
    fn test_would_cross() {
        let book = book_with(&[(1, Side::Buy, 99, 1), (2, Side::Sell, 101, 1)]);
        assert!(book.would_cross(Side::Buy, Price::new(101)));
        assert!(!book.would_cross(Side::Buy, Price::new(100)));
        assert!(book.would_cross(Side::Sell, Price::new(99)));
        assert!(!OrderBook::default().would_cross(Side::Buy, Price::new(1)));
    }

    #[test]
    fn test_depth_aggregates_levels() {
        let book = book_with(&[
            (1, Side::Buy, 100, 2),
            (2, Side::Buy, 100, 3),
            (3, Side::Buy, 99, 4),
            (4, Side::Buy, 98, 1),
        ]);
        assert_eq!(
            book.side(Side::Buy).depth(2),
            vec![
                (Price::new(100), Quantity::new(5)),
                (Price::new(99), Quantity::new(4)),
            ]
        );
    }

    #[test]
    fn test_snapshot_format() {
        let book = book_with(&[
            (1, Side::Buy, 99, 5),
            (2, Side::Buy, 100, 3),
            (3, Side::Sell, 102, 7),
        ]);
        assert_eq!(
            book.snapshot_text(),
            "BID: 2, 100, 3\nBID: 1, 99, 5\nASK: 3, 102, 7"
        );
        assert_eq!(OrderBook::default().snapshot_text(), "");
    }
}
