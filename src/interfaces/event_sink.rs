// ============================================================================
// Event Sink Interface
// Defines where the matching engine sends trades, snapshots and rejections
// ============================================================================

use crate::domain::MarketEvent;
use crate::pipeline::{BusPublisher, Producer};
use tracing::{debug, warn};

/// Outbound seam of the matching engine.
///
/// Called on the matching thread, so implementations must not block.
pub trait EventSink: Send {
    /// Deliver one event. Returns `false` if the sink had to drop it.
    fn on_event(&mut self, event: MarketEvent) -> bool;

    /// Deliver a batch. Returns how many events were dropped.
    fn on_events(&mut self, events: Vec<MarketEvent>) -> usize {
        events
            .into_iter()
            .map(|event| self.on_event(event))
            .filter(|delivered| !delivered)
            .count()
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn on_event(&mut self, _event: MarketEvent) -> bool {
        true
    }
}

/// Logs every event at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn on_event(&mut self, event: MarketEvent) -> bool {
        debug!(?event, "matching engine event");
        true
    }
}

/// Collects events in memory; handy in tests.
impl EventSink for Vec<MarketEvent> {
    fn on_event(&mut self, event: MarketEvent) -> bool {
        self.push(event);
        true
    }
}

/// Outbound SPSC queue. A full queue drops the event.
impl EventSink for Producer<MarketEvent> {
    fn on_event(&mut self, event: MarketEvent) -> bool {
        match self.push(event) {
            Ok(()) => true,
            Err(full) => {
                warn!(
                    capacity = self.capacity(),
                    event = ?full.into_inner(),
                    "outbound queue full, dropping event"
                );
                false
            }
        }
    }
}

/// Broadcast ring. Never drops on publish; slow readers skip instead.
/// The bus overwrites its oldest slot instead of refusing, so nothing is
/// dropped here and the publish never waits on a subscriber.
impl EventSink for BusPublisher<MarketEvent> {
    fn on_event(&mut self, event: MarketEvent) -> bool {
        self.publish(event);
        true
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn on_event(&mut self, event: MarketEvent) -> bool {
        (**self).on_event(event)
    }
}

/// Fan out to two sinks. Reports a drop if either sink dropped.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn on_event(&mut self, event: MarketEvent) -> bool {
        let first = self.0.on_event(event.clone());
        let second = self.1.on_event(event);
        first && second
    }
}
