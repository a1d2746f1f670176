// ============================================================================
// Event Pipeline Module
// Non-blocking transfer in and out of the matching thread
// ============================================================================
//
// Two primitives:
// - `queue`: bounded single-producer/single-consumer ring. Orders in,
//   optionally events out. A full queue hands the item back.
// - `bus`: broadcast ring with one publisher and any number of subscribers.
//   The publisher overwrites the oldest slot when full; lagging subscribers
//   skip forward instead of blocking it.
//
// Both round their capacity up to the next power of two so slot lookup is
// a mask instead of a division.
// ============================================================================

pub mod bus;
pub mod queue;

pub use bus::{BusHandle, BusPublisher, BusSubscriber};
pub use queue::{Consumer, Producer};

/// Smallest power of two `>= requested`, never below 1.
#[inline]
pub fn round_capacity(requested: usize) -> usize {
    requested.max(1).next_power_of_two()
}
