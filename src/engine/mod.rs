// ============================================================================
// Engine Module
// Contains the core matching engine business logic
// ============================================================================

mod matching_engine;
mod price_time;

pub mod factory;
pub mod runner;

pub use factory::{with_event_bus, with_event_queue, MatchingEngineBuilder};
pub use matching_engine::{EngineStats, Execution, MatchingEngine, OrderOutcome, TradeList};
pub use price_time::PriceTimePriority;
pub use runner::{spawn, Command, EngineHandle, RunnerHandle};
