// ============================================================================
// Engine Factory
// Creates matching engines wired to their outbound pipeline
// ============================================================================

use crate::domain::{EngineConfig, MarketEvent, OrderBook};
use crate::engine::{MatchingEngine, PriceTimePriority};
use crate::error::ConfigError;
use crate::interfaces::{EventSink, MatchingAlgorithm};
use crate::numeric::Price;
use crate::pipeline::{bus, queue, BusHandle, BusPublisher, Consumer, Producer};

// ============================================================================
// Factory Functions
// ============================================================================

/// Engine publishing to a fresh broadcast bus sized by `config.bus_capacity`.
///
/// # Example
/// ```
/// use tick_matching_engine::prelude::*;
/// use tick_matching_engine::engine::factory::with_event_bus;
///
/// let (mut engine, bus) = with_event_bus(&EngineConfig::new("AAPL")).unwrap();
/// let mut trades = bus.subscribe();
///
/// engine.process(Order::limit(1, Side::Sell, 100, 5)).unwrap();
/// engine.process(Order::limit(2, Side::Buy, 100, 5)).unwrap();
/// assert!(matches!(trades.poll(), Some(MarketEvent::Trade(_))));
/// ```
pub fn with_event_bus(
    config: &EngineConfig,
) -> Result<(MatchingEngine<BusPublisher<MarketEvent>>, BusHandle<MarketEvent>), ConfigError> {
    let (publisher, handle) = bus::channel(config.bus_capacity);
    let engine = MatchingEngine::from_config(config, publisher)?;
    Ok((engine, handle))
}

/// Engine writing to a point-to-point queue sized by
/// `config.outbound_capacity`. Events are dropped when it is full.
pub fn with_event_queue(
    config: &EngineConfig,
) -> Result<(MatchingEngine<Producer<MarketEvent>>, Consumer<MarketEvent>), ConfigError> {
    let (producer, consumer) = queue::bounded(config.outbound_capacity);
    let engine = MatchingEngine::from_config(config, producer)?;
    Ok((engine, consumer))
}

// ============================================================================
// Builder Pattern for Advanced Configuration
// ============================================================================

/// Builder for creating matching engines with fluent API
///
/// # Example
/// ```
/// use tick_matching_engine::prelude::*;
///
/// let engine = MatchingEngineBuilder::new("BTC-USD")
///     .with_tick_size(5)
///     .build(NoOpEventSink)
///     .unwrap();
/// assert_eq!(engine.book().tick_size(), Price::new(5));
/// ```
pub struct MatchingEngineBuilder {
    config: EngineConfig,
    algorithm: Option<Box<dyn MatchingAlgorithm>>,
}

impl MatchingEngineBuilder {
    /// Create a new builder for the specified instrument
    pub fn new(instrument: impl Into<String>) -> Self {
        Self::from_config(EngineConfig::new(instrument))
    }

    pub fn from_config(config: EngineConfig) -> Self {
        Self {
            config,
            algorithm: None,
        }
    }

    /// Set price tick size
    pub fn with_tick_size(mut self, tick_size: impl Into<Price>) -> Self {
        self.config = self.config.with_tick_size(tick_size);
        self
    }

    /// Replace the default price-time execution step
    pub fn with_algorithm(mut self, algorithm: Box<dyn MatchingAlgorithm>) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Validate the configuration and build the engine
    pub fn build<S: EventSink>(self, sink: S) -> Result<MatchingEngine<S>, ConfigError> {
        self.config.validate()?;
        let book = OrderBook::new(self.config.tick_size)
            .map_err(|_| ConfigError::NonPositiveTickSize(self.config.tick_size))?;
        let algorithm = self
            .algorithm
            .unwrap_or_else(|| Box::new(PriceTimePriority::new()));
        Ok(MatchingEngine::new(
            self.config.instrument,
            book,
            algorithm,
            sink,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Order, Side, Trade};
    use crate::error::InvariantViolation;

    /// Step that never trades, so every order rests or drops.
    struct NeverMatch;

    impl MatchingAlgorithm for NeverMatch {
        fn match_step(
            &self,
            _incoming: &mut Order,
            _book: &mut OrderBook,
        ) -> Result<Option<Trade>, InvariantViolation> {
            Ok(None)
        }

        fn name(&self) -> &str {
            "NeverMatch"
        }
    }

    #[test]
    fn test_builder_rejects_bad_config() {
        let err = MatchingEngineBuilder::new("")
            .build(Vec::<MarketEvent>::new())
            .unwrap_err();
        assert_eq!(err, ConfigError::EmptyInstrument);

        let err = MatchingEngineBuilder::new("X")
            .with_tick_size(0)
            .build(Vec::<MarketEvent>::new())
            .unwrap_err();
        assert_eq!(err, ConfigError::NonPositiveTickSize(Price::ZERO));
    }

    #[test]
    fn test_builder_defaults_to_price_time() {
        let engine = MatchingEngineBuilder::new("BTC-USD")
            .build(Vec::<MarketEvent>::new())
            .unwrap();
        assert_eq!(engine.algorithm_name(), "PriceTime");
        assert_eq!(engine.instrument(), "BTC-USD");
    }

    #[test]
    fn test_event_queue_wiring() {
        let config = EngineConfig::for_testing().with_outbound_capacity(4);
        let (mut engine, mut events) = with_event_queue(&config).unwrap();
        assert_eq!(events.capacity(), 4);

        engine.process(Order::limit(1, Side::Buy, 10, 1)).unwrap();
        engine.process(Order::limit(2, Side::Sell, 10, 1)).unwrap();
        assert!(events.pop().is_some_and(|event| event.is_trade()));
    }

    #[test]
    fn test_event_bus_wiring() {
        let config = EngineConfig::for_testing().with_bus_capacity(3);
        let (mut engine, bus) = with_event_bus(&config).unwrap();
        assert_eq!(bus.capacity(), 4);

        let mut late = bus.subscribe_from(0);
        engine.snapshot().unwrap();
        assert_eq!(late.poll(), Some(MarketEvent::Snapshot(String::new())));
    }

    #[test]
    fn test_builder_uses_custom_algorithm() {
        let mut engine = MatchingEngineBuilder::new("X")
            .with_algorithm(Box::new(NeverMatch))
            .build(Vec::<MarketEvent>::new())
            .unwrap();
        assert_eq!(engine.algorithm_name(), "NeverMatch");

        engine.process(Order::limit(1, Side::Sell, 10, 1)).unwrap();
        let outcome = engine.process(Order::limit(2, Side::Buy, 10, 1)).unwrap();
        assert!(outcome.trades().is_empty());
        assert_eq!(engine.book().len(), 2);
    }
}
