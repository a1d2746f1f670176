// ============================================================================
// Stop Order Register
// Pending stop orders, invisible to the book until a trade reaches them
// ============================================================================

use crate::error::InvariantViolation;
use crate::numeric::Price;
use std::cmp::Ordering;

use super::heap::{side_priority, HeapItem, IndexedHeap};
use super::{Order, OrderId, Side};

/// A stop order waiting for its trigger. `order.limit_price` is the trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopOrder {
    pub order: Order,
}

impl StopOrder {
    pub fn new(order: Order) -> Self {
        Self { order }
    }

    pub fn trigger(&self) -> Price {
        self.order.limit_price
    }

    /// Whether a trade at `reference` fires this stop.
    ///
    /// Sell stops fire once the trigger is at or below the reference price,
    /// buy stops once it is at or above.
    pub fn is_triggered_by(&self, reference: Price) -> bool {
        match self.order.side {
            Side::Sell => self.trigger() <= reference,
            Side::Buy => self.trigger() >= reference,
        }
    }
}

impl HeapItem for StopOrder {
    fn key(&self) -> OrderId {
        self.order.id
    }

    // Sell stops: lowest trigger on top. Buy stops: highest trigger on top.
    // Either way the top is the first to become eligible.
    fn priority_cmp(&self, other: &Self) -> Ordering {
        side_priority(
            self.order.side,
            (self.trigger().raw(), self.order.id),
            (other.trigger().raw(), other.order.id),
        )
    }
}

/// Buy and sell stop heaps.
#[derive(Debug, Clone, Default)]
pub struct StopRegister {
    buy_stops: IndexedHeap<StopOrder>,
    sell_stops: IndexedHeap<StopOrder>,
}

impl StopRegister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a stop order. Returns it back if the id is already registered.
    pub fn register(&mut self, order: Order) -> Result<(), Order> {
        if self.contains(order.id) {
            return Err(order);
        }
        self.heap_mut(order.side)
            .push(StopOrder::new(order))
            .map_err(|stop| stop.order)
    }

    /// Drop a pending stop. Unknown ids are a no-op.
    pub fn cancel(&mut self, id: OrderId) -> Result<Option<Order>, InvariantViolation> {
        if let Some(stop) = self.sell_stops.remove(id)? {
            return Ok(Some(stop.order));
        }
        Ok(self.buy_stops.remove(id)?.map(|stop| stop.order))
    }

    /// Pop the next stop eligible at `reference`, sell stops first.
    pub fn pop_triggered(&mut self, reference: Price) -> Option<Order> {
        for heap in [&mut self.sell_stops, &mut self.buy_stops] {
            if heap.peek().is_some_and(|stop| stop.is_triggered_by(reference)) {
                return heap.pop().map(|stop| stop.order);
            }
        }
        None
    }

    /// Pop every stop eligible at `reference`, sell stops first, each side
    /// in trigger order.
    pub fn drain_triggered(&mut self, reference: Price) -> Vec<Order> {
        std::iter::from_fn(|| self.pop_triggered(reference)).collect()
    }

    pub fn contains(&self, id: OrderId) -> bool {
        self.buy_stops.contains(id) || self.sell_stops.contains(id)
    }

    pub fn len(&self) -> usize {
        self.buy_stops.len() + self.sell_stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buy_stops.is_empty() && self.sell_stops.is_empty()
    }

    pub fn pending(&self, side: Side) -> usize {
        self.heap(side).len()
    }

    fn heap(&self, side: Side) -> &IndexedHeap<StopOrder> {
        match side {
            Side::Buy => &self.buy_stops,
            Side::Sell => &self.sell_stops,
        }
    }

    fn heap_mut(&mut self, side: Side) -> &mut IndexedHeap<StopOrder> {
        match side {
            Side::Buy => &mut self.buy_stops,
            Side::Sell => &mut self.sell_stops,
        }
    }
}
