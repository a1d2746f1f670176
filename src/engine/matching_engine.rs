// ============================================================================
// Matching Engine
// Core business logic for order matching
// ============================================================================
//
// Per order:
// 1. Admission (field checks, tick flooring, duplicate ids, post-only and
//    all-or-none/fill-or-kill liquidity checks). A rejection mutates nothing.
// 2. Execution against the opposite side, one trade at a time.
// 3. Resting the remainder for types that may rest.
// 4. Stop cascade: after every trade the stop register is swept at the
//    trade price. Each fired stop runs as a market order through 1-3 (and
//    its own sweeps) before the order that traded continues or rests.
//    Orders in flight live on an explicit frame stack, not the call stack.
// ============================================================================

use crate::domain::{
    EngineConfig, MarketEvent, Order, OrderBook, OrderId, OrderType, RejectionNotice,
    RestingOrder, StopRegister, Trade,
};
use crate::error::{ConfigError, EngineError, InvariantViolation, RejectReason};
use crate::interfaces::{EventSink, MatchingAlgorithm};
use crate::numeric::{Price, Quantity};
use smallvec::SmallVec;
use tracing::{debug, error, info, warn};

use super::MatchingEngineBuilder;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Trades produced by one `process` call, kept inline for the common case.
pub type TradeList = SmallVec<[Trade; 8]>;

// ============================================================================
// Outcome Types
// ============================================================================

/// What happened to one submitted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderOutcome {
    /// Admitted and executed.
    Executed(Execution),
    /// A stop order parked in the register, waiting for its trigger.
    StopParked(OrderId),
    /// Refused at admission; nothing changed.
    Rejected(RejectionNotice),
}

impl OrderOutcome {
    /// Trades from this call, including any from fired stops.
    pub fn trades(&self) -> &[Trade] {
        match self {
            OrderOutcome::Executed(execution) => execution.trades.as_slice(),
            _ => &[],
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, OrderOutcome::Rejected(_))
    }

    pub fn rejection(&self) -> Option<&RejectionNotice> {
        match self {
            OrderOutcome::Rejected(notice) => Some(notice),
            _ => None,
        }
    }
}

/// Result of executing one admitted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
    /// Every trade in call order: the order's own, then those of fired stops
    pub trades: TradeList,
    /// Quantity of the submitted order that traded
    pub filled: Quantity,
    /// Remainder dropped because the order type cannot rest
    pub unfilled: Quantity,
    /// Whether a remainder was added to the book
    pub rested: bool,
    /// Stop orders fired during this call, in firing order
    pub triggered: SmallVec<[OrderId; 4]>,
}

/// Fill summary of a single pass through execution and resting.
#[derive(Debug, Clone, Copy, Default)]
struct Pass {
    filled: Quantity,
    unfilled: Quantity,
    rested: bool,
}

/// An order in flight: the submitted order at the bottom of the stack,
/// fired stops above it.
#[derive(Debug)]
struct Frame {
    order: Order,
    requested: Quantity,
    /// Price of this order's latest trade while stops may still fire at it
    sweep: Option<Price>,
}

impl Frame {
    fn new(order: Order) -> Self {
        Self {
            requested: order.quantity,
            order,
            sweep: None,
        }
    }
}

/// Running counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineStats {
    /// Orders handed to `process`, including stops
    pub orders_processed: u64,
    pub trades: u64,
    pub rejections: u64,
    pub stops_triggered: u64,
    /// Events the sink could not accept
    pub events_dropped: u64,
}

// ============================================================================
// Matching Engine
// ============================================================================

/// Single-threaded matching engine for one instrument.
///
/// Owns the book and the stop register outright; nothing else may touch
/// them. Every call runs to completion before returning.
pub struct MatchingEngine<S: EventSink> {
    /// Trading instrument (e.g., "BTC-USD")
    instrument: String,

    book: OrderBook,

    stops: StopRegister,

    /// Execution rule
    algorithm: Box<dyn MatchingAlgorithm>,

    /// Outbound events
    sink: S,

    last_trade_price: Option<Price>,

    stats: EngineStats,

    halted: bool,
}

impl<S: EventSink> MatchingEngine<S> {
    /// Create a new matching engine
    pub fn new(
        instrument: impl Into<String>,
        book: OrderBook,
        algorithm: Box<dyn MatchingAlgorithm>,
        sink: S,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            book,
            stops: StopRegister::new(),
            algorithm,
            sink,
            last_trade_price: None,
            stats: EngineStats::default(),
            halted: false,
        }
    }

    /// Price-time engine for a validated configuration
    pub fn from_config(config: &EngineConfig, sink: S) -> Result<Self, ConfigError> {
        MatchingEngineBuilder::from_config(config.clone()).build(sink)
    }

    /// Process one order to completion, including any stop cascade it
    /// sets off.
    ///
    /// Admission failures come back as `Ok(OrderOutcome::Rejected)`.
    ///
    /// # Errors
    /// `EngineError::Invariant` if the book broke; the engine halts and
    /// every later call returns `EngineError::Halted`.
    pub fn process(&mut self, order: Order) -> Result<OrderOutcome, EngineError> {
        self.ensure_running()?;
        self.stats.orders_processed += 1;
        match self.run(order) {
            Ok(outcome) => Ok(outcome),
            Err(violation) => Err(self.halt(violation)),
        }
    }

    /// Remove a resting order or a pending stop. Returns whether anything
    /// was removed; unknown ids are a no-op.
    pub fn cancel(&mut self, id: OrderId) -> Result<bool, EngineError> {
        self.ensure_running()?;
        let removed = match self.book.remove_order(id) {
            Ok(Some(_)) => true,
            Ok(None) => match self.stops.cancel(id) {
                Ok(stop) => stop.is_some(),
                Err(violation) => return Err(self.halt(violation)),
            },
            Err(violation) => return Err(self.halt(violation)),
        };
        debug!(order_id = %id, removed, "cancel");
        Ok(removed)
    }

    /// Publish the whole book as a `MarketEvent::Snapshot` and return the
    /// text.
    pub fn snapshot(&mut self) -> Result<String, EngineError> {
        self.ensure_running()?;
        let text = self.book.snapshot_text();
        info!(
            instrument = %self.instrument,
            resting = self.book.len(),
            "publishing book snapshot"
        );
        self.emit(MarketEvent::Snapshot(text.clone()));
        Ok(text)
    }

    pub fn best_bid(&self) -> Option<&RestingOrder> {
        self.book.best_bid()
    }

    pub fn best_ask(&self) -> Option<&RestingOrder> {
        self.book.best_ask()
    }

    /// Price of the most recent trade; `None` before the first one.
    pub fn last_trade_price(&self) -> Option<Price> {
        self.last_trade_price
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    pub fn stops(&self) -> &StopRegister {
        &self.stops
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Get the instrument name
    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn algorithm_name(&self) -> &str {
        self.algorithm.name()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    // ========================================================================
    // Private methods
    // ========================================================================

    fn ensure_running(&self) -> Result<(), EngineError> {
        if self.halted {
            Err(EngineError::Halted)
        } else {
            Ok(())
        }
    }

    fn halt(&mut self, violation: InvariantViolation) -> EngineError {
        error!(
            instrument = %self.instrument,
            %violation,
            "invariant violation, halting matching engine"
        );
        self.halted = true;
        EngineError::Invariant(violation)
    }

    fn run(&mut self, mut order: Order) -> Result<OrderOutcome, InvariantViolation> {
        if order.is_stop_order() {
            return Ok(self.park_stop(order));
        }
        if let Err(reason) = self.admit(&mut order) {
            return Ok(OrderOutcome::Rejected(self.reject(order.id, reason)));
        }

        let id = order.id;
        let mut trades = TradeList::new();
        let mut triggered = SmallVec::new();
        let mut pass = Pass::default();
        let mut frames: SmallVec<[Frame; 4]> = SmallVec::new();
        frames.push(Frame::new(order));

        while let Some(frame) = frames.last_mut() {
            if let Some(price) = frame.sweep {
                match self.stops.pop_triggered(price) {
                    Some(stop) => {
                        if let Some(fired) = self.fire(stop, &mut triggered) {
                            frames.push(Frame::new(fired));
                        }
                        continue;
                    }
                    None => frame.sweep = None,
                }
            }

            if frame.order.quantity.is_positive() {
                if let Some(trade) = self.algorithm.match_step(&mut frame.order, &mut self.book)? {
                    frame.sweep = Some(trade.price);
                    self.record_trade(trade, &mut trades);
                    continue;
                }
            }

            let Some(done) = frames.pop() else { break };
            let finished = self.finish(done)?;
            if frames.is_empty() {
                pass = finished;
            }
        }

        debug!(
            order_id = %id,
            trades = trades.len(),
            filled = %pass.filled,
            unfilled = %pass.unfilled,
            rested = pass.rested,
            "order processed"
        );
        Ok(OrderOutcome::Executed(Execution {
            trades,
            filled: pass.filled,
            unfilled: pass.unfilled,
            rested: pass.rested,
            triggered,
        }))
    }

    fn park_stop(&mut self, mut order: Order) -> OrderOutcome {
        if let Err(reason) = self.admit(&mut order) {
            return OrderOutcome::Rejected(self.reject(order.id, reason));
        }
        let id = order.id;
        let trigger = order.limit_price;
        match self.stops.register(order) {
            Ok(()) => {
                debug!(order_id = %id, trigger = %trigger, "stop parked");
                OrderOutcome::StopParked(id)
            }
            Err(order) => {
                let reason = RejectReason::DuplicateOrderId(order.id);
                OrderOutcome::Rejected(self.reject(order.id, reason))
            }
        }
    }

    /// Turn a popped stop into the market order it becomes. `None` if that
    /// order fails admission.
    fn fire(&mut self, stop: Order, triggered: &mut SmallVec<[OrderId; 4]>) -> Option<Order> {
        self.stats.stops_triggered += 1;
        triggered.push(stop.id);
        let mut fired = stop.into_triggered();
        debug!(
            order_id = %fired.id,
            side = ?fired.side,
            quantity = %fired.quantity,
            "stop triggered"
        );
        match self.admit(&mut fired) {
            Ok(()) => Some(fired),
            Err(reason) => {
                let notice = self.reject(fired.id, reason);
                debug!(%notice, "triggered stop rejected");
                None
            }
        }
    }

    /// Rest or drop whatever is left of a frame that can no longer trade.
    fn finish(&mut self, frame: Frame) -> Result<Pass, InvariantViolation> {
        let Frame {
            order, requested, ..
        } = frame;
        let mut pass = Pass {
            filled: requested.checked_sub(order.quantity)?,
            ..Pass::default()
        };
        if order.quantity.is_positive() {
            if order.order_type.can_rest() {
                // Admission already ruled out every reason this could fail.
                self.book
                    .add_order(RestingOrder::from(&order))
                    .map_err(|_| InvariantViolation::DanglingIndex { order_id: order.id })?;
                pass.rested = true;
            } else {
                debug!(
                    order_id = %order.id,
                    order_type = ?order.order_type,
                    unfilled = %order.quantity,
                    "dropping unfilled remainder"
                );
                pass.unfilled = order.quantity;
            }
        }
        Ok(pass)
    }

    /// Admission checks. Floors priced orders to the tick size in place.
    fn admit(&self, order: &mut Order) -> Result<(), RejectReason> {
        order.validate()?;
        if order.order_type.is_priced() {
            order.limit_price = self.book.round_price(order.limit_price);
            if !order.limit_price.is_positive() {
                return Err(RejectReason::NonPositivePrice(order.limit_price));
            }
        }
        if self.book.contains(order.id) || self.stops.contains(order.id) {
            return Err(RejectReason::DuplicateOrderId(order.id));
        }

        if order.order_type == OrderType::PostOnly
            && self.book.would_cross(order.side, order.limit_price)
        {
            return Err(RejectReason::PostOnlyWouldCross);
        }
        if order.order_type.requires_full_fill() {
            let available = self
                .book
                .available_liquidity(order.side, Some(order.limit_price));
            if available < order.quantity {
                return Err(RejectReason::InsufficientLiquidity {
                    requested: order.quantity,
                    available,
                });
            }
        }
        Ok(())
    }

    fn record_trade(&mut self, trade: Trade, trades: &mut TradeList) {
        debug!(
            taker = %trade.taker_order_id,
            maker = %trade.maker_order_id,
            price = %trade.price,
            quantity = %trade.quantity,
            "trade"
        );
        self.stats.trades += 1;
        self.last_trade_price = Some(trade.price);
        self.emit(MarketEvent::Trade(trade));
        trades.push(trade);
    }

    fn reject(&mut self, order_id: OrderId, reason: RejectReason) -> RejectionNotice {
        warn!(order_id = %order_id, %reason, "order rejected");
        self.stats.rejections += 1;
        let notice = RejectionNotice::new(order_id, reason);
        self.emit(MarketEvent::Rejected(notice.clone()));
        notice
    }

    fn emit(&mut self, event: MarketEvent) {
        if !self.sink.on_event(event) {
            self.stats.events_dropped += 1;
        }
    }
}

impl<S: EventSink> std::fmt::Debug for MatchingEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchingEngine")
            .field("instrument", &self.instrument)
            .field("algorithm", &self.algorithm.name())
            .field("resting", &self.book.len())
            .field("stops", &self.stops.len())
            .field("stats", &self.stats)
            .field("halted", &self.halted)
            .finish()
    }
}
