// ============================================================================
// Interfaces Module
// Contains all trait definitions and contracts
// ============================================================================

mod event_sink;
mod matching_algorithm;

pub use event_sink::{EventSink, LoggingEventSink, NoOpEventSink};
pub use matching_algorithm::MatchingAlgorithm;
