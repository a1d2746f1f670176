// ============================================================================
// Engine Configuration
// Instrument, tick size and pipeline sizing
// ============================================================================

use crate::error::ConfigError;
use crate::numeric::Price;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default capacity for every pipeline stage
pub const DEFAULT_CAPACITY: usize = 1024;

/// Configuration for one engine instance (one instrument)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// The trading instrument (e.g., "BTC-USD", "AAPL")
    pub instrument: String,

    /// Minimum price increment; every limit price is floored to a multiple
    pub tick_size: Price,

    /// Slots in the inbound order queue
    pub inbound_capacity: usize,

    /// Slots in the outbound event queue
    pub outbound_capacity: usize,

    /// Slots in the broadcast ring
    pub bus_capacity: usize,

    /// CPU core for the matching thread (honored with the `numa` feature)
    pub core_id: Option<usize>,
}

impl EngineConfig {
    /// Create a new configuration with default tick size and capacities
    pub fn new(instrument: impl Into<String>) -> Self {
        Self {
            instrument: instrument.into(),
            tick_size: Price::new(1),
            inbound_capacity: DEFAULT_CAPACITY,
            outbound_capacity: DEFAULT_CAPACITY,
            bus_capacity: DEFAULT_CAPACITY,
            core_id: None,
        }
    }

    /// Small queues so tests exercise backpressure and overwrite quickly
    pub fn for_testing() -> Self {
        Self::new("TEST")
            .with_inbound_capacity(16)
            .with_outbound_capacity(64)
            .with_bus_capacity(64)
    }

    /// Builder method: Set price tick size
    pub fn with_tick_size(mut self, tick_size: impl Into<Price>) -> Self {
        self.tick_size = tick_size.into();
        self
    }

    pub fn with_inbound_capacity(mut self, capacity: usize) -> Self {
        self.inbound_capacity = capacity;
        self
    }

    pub fn with_outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity;
        self
    }

    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }

    /// Builder method: Pin the matching thread to a core
    pub fn with_core_id(mut self, core_id: usize) -> Self {
        self.core_id = Some(core_id);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instrument.trim().is_empty() {
            return Err(ConfigError::EmptyInstrument);
        }
        if !self.tick_size.is_positive() {
            return Err(ConfigError::NonPositiveTickSize(self.tick_size));
        }
        for (name, capacity) in [
            ("inbound", self.inbound_capacity),
            ("outbound", self.outbound_capacity),
            ("bus", self.bus_capacity),
        ] {
            if capacity == 0 {
                return Err(ConfigError::ZeroCapacity(name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = EngineConfig::new("BTC-USD");

        assert_eq!(config.instrument, "BTC-USD");
        assert_eq!(config.tick_size, Price::new(1));
        assert_eq!(config.bus_capacity, DEFAULT_CAPACITY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = EngineConfig::new("AAPL")
            .with_tick_size(5)
            .with_inbound_capacity(8)
            .with_core_id(3);

        assert_eq!(config.tick_size, Price::new(5));
        assert_eq!(config.inbound_capacity, 8);
        assert_eq!(config.core_id, Some(3));
    }

    #[test]
    fn test_validation() {
        assert_eq!(
            EngineConfig::new("").validate(),
            Err(ConfigError::EmptyInstrument)
        );
        assert_eq!(
            EngineConfig::new("X").with_tick_size(0).validate(),
            Err(ConfigError::NonPositiveTickSize(Price::ZERO))
        );
        assert_eq!(
            EngineConfig::new("X").with_bus_capacity(0).validate(),
            Err(ConfigError::ZeroCapacity("bus"))
        );
    }

    #[test]
    fn test_testing_preset_is_valid() {
        assert!(EngineConfig::for_testing().validate().is_ok());
    }
}
