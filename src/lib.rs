// ============================================================================
// Matching Engine Library
// Single-instrument order matching core with stop cascades and lock-free I/O
// ============================================================================

//! # Tick Matching Engine
//!
//! A deterministic, single-threaded matching core for one instrument.
//!
//! ## Features
//!
//! - **Integer tick prices** with no floating point on the matching path
//! - **Seven order types**: limit, market, IOC, FOK, AON, post-only, stop
//! - **Stop cascades** driven by trade prices, run at the trade that fires them
//! - **Bounded SPSC queue** for order ingress and optional event egress
//! - **Broadcast ring bus** for market data, where slow readers skip ahead
//!
//! ## Example
//!
//! ```rust
//! use tick_matching_engine::prelude::*;
//!
//! let (mut engine, bus) = with_event_bus(&EngineConfig::new("BTC-USD")).unwrap();
//! let mut market_data = bus.subscribe();
//!
//! engine.process(Order::limit(1, Side::Sell, 50_000, 2)).unwrap();
//! let outcome = engine.process(Order::limit(2, Side::Buy, 50_000, 1)).unwrap();
//!
//! assert_eq!(outcome.trades().len(), 1);
//! assert_eq!(engine.best_ask().map(|o| o.quantity), Some(Quantity::new(1)));
//!
//! match market_data.poll() {
//!     Some(MarketEvent::Trade(trade)) => assert_eq!(trade.price, Price::new(50_000)),
//!     other => panic!("unexpected event {other:?}"),
//! }
//! ```

pub mod domain;
pub mod engine;
pub mod error;
pub mod interfaces;
pub mod numeric;
pub mod pipeline;
pub mod utils;

// Re-exports for convenience
pub mod prelude {
    pub use crate::domain::{
        EngineConfig, MarketEvent, Order, OrderBook, OrderId, OrderRequest, OrderType, OwnerId,
        RejectionNotice, RestingOrder, Side, StopRegister, Trade,
    };
    pub use crate::engine::{
        spawn, with_event_bus, with_event_queue, Command, EngineHandle, EngineStats, Execution,
        MatchingEngine, MatchingEngineBuilder, OrderOutcome, PriceTimePriority, RunnerHandle,
    };
    pub use crate::error::{ConfigError, EngineError, InvariantViolation, QueueFull, RejectReason};
    pub use crate::interfaces::{EventSink, LoggingEventSink, MatchingAlgorithm, NoOpEventSink};
    pub use crate::numeric::{Price, Quantity};
    pub use crate::pipeline::{BusHandle, BusPublisher, BusSubscriber, Consumer, Producer};
}
