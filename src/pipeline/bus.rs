// ============================================================================
// Broadcast Ring Bus
// One publisher, many independently paced subscribers
// ============================================================================
//
// Sequence numbers are global and monotonically increasing; event `n` lives
// in slot `n & mask` until event `n + capacity` overwrites it. Each slot
// stores the sequence it holds, so a subscriber can tell a fresh value from
// one that was overwritten under it.
//
// Slots are `ArcSwapOption`s. Publishing swaps in a new `Arc`; a subscriber
// takes its own `Arc` and clones the value afterwards, outside the slot, so
// a slow reader can delay nothing but itself.
//
// `tail` (next sequence to publish) is stored with Release after the slot
// write and loaded with Acquire before any slot read.
// ============================================================================

use arc_swap::ArcSwapOption;
use crossbeam::utils::CachePadded;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::round_capacity;

struct Entry<T> {
    seq: u64,
    value: T,
}

struct BusRing<T> {
    tail: CachePadded<AtomicU64>,
    mask: u64,
    slots: Box<[ArcSwapOption<Entry<T>>]>,
}

impl<T> BusRing<T> {
    fn capacity(&self) -> u64 {
        self.mask + 1
    }

    fn slot(&self, seq: u64) -> &ArcSwapOption<Entry<T>> {
        // Masked value is < capacity, which came from a usize.
        &self.slots[(seq & self.mask) as usize]
    }
}

/// Create a bus with at least `capacity` slots (rounded up to a power of two).
pub fn channel<T: Clone>(capacity: usize) -> (BusPublisher<T>, BusHandle<T>) {
    let capacity = round_capacity(capacity);
    let slots = (0..capacity)
        .map(|_| ArcSwapOption::empty())
        .collect::<Vec<_>>()
        .into_boxed_slice();
    let ring = Arc::new(BusRing {
        tail: CachePadded::new(AtomicU64::new(0)),
        mask: capacity as u64 - 1,
        slots,
    });
    (
        BusPublisher {
            ring: Arc::clone(&ring),
            next: 0,
        },
        BusHandle { ring },
    )
}

// ============================================================================
// Publisher
// ============================================================================

/// Write side. Publishing is a slot swap and an atomic store; it takes no
/// lock a subscriber could hold.
pub struct BusPublisher<T> {
    ring: Arc<BusRing<T>>,
    next: u64,
}

impl<T: Clone> BusPublisher<T> {
    /// Publish `value`, overwriting the oldest slot once the ring is full.
    /// Returns the sequence number assigned to it.
    pub fn publish(&mut self, value: T) -> u64 {
        let seq = self.next;
        self.ring
            .slot(seq)
            .store(Some(Arc::new(Entry { seq, value })));
        self.next = seq + 1;
        self.ring.tail.store(self.next, Ordering::Release);
        seq
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity() as usize
    }

    /// Handle for minting subscribers.
    pub fn handle(&self) -> BusHandle<T> {
        BusHandle {
            ring: Arc::clone(&self.ring),
        }
    }
}

impl<T> fmt::Debug for BusPublisher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusPublisher")
            .field("published", &self.next)
            .field("capacity", &self.ring.capacity())
            .finish()
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Shareable entry point for new subscribers.
pub struct BusHandle<T> {
    ring: Arc<BusRing<T>>,
}

impl<T> Clone for BusHandle<T> {
    fn clone(&self) -> Self {
        Self {
            ring: Arc::clone(&self.ring),
        }
    }
}

impl<T: Clone> BusHandle<T> {
    /// Subscribe at the current head: only events published from now on
    /// are seen.
    pub fn subscribe(&self) -> BusSubscriber<T> {
        self.subscribe_from(self.head())
    }

    /// Subscribe at an explicit sequence. A sequence that has already been
    /// overwritten is clamped forward on the first poll.
    pub fn subscribe_from(&self, seq: u64) -> BusSubscriber<T> {
        BusSubscriber {
            ring: Arc::clone(&self.ring),
            cursor: seq,
            skipped: 0,
        }
    }

    /// Sequence the next published event will get.
    pub fn head(&self) -> u64 {
        self.ring.tail.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity() as usize
    }
}

impl<T> fmt::Debug for BusHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusHandle")
            .field("capacity", &self.ring.capacity())
            .finish()
    }
}

// ============================================================================
// Subscriber
// ============================================================================

/// Read cursor owned by one consumer.
pub struct BusSubscriber<T> {
    ring: Arc<BusRing<T>>,
    cursor: u64,
    skipped: u64,
}

impl<T: Clone> BusSubscriber<T> {
    /// Next event for this subscriber, or `None` when caught up.
    ///
    /// A subscriber that fell more than `capacity` events behind jumps to
    /// the oldest event still in the ring; what it jumped over is counted
    /// in [`skipped`](Self::skipped).
    pub fn poll(&mut self) -> Option<T> {
        let capacity = self.ring.capacity();
        loop {
            let tail = self.ring.tail.load(Ordering::Acquire);
            if self.cursor >= tail {
                return None;
            }
            if tail - self.cursor > capacity {
                let oldest = tail - capacity;
                self.skipped += oldest - self.cursor;
                self.cursor = oldest;
            }

            let entry = self.ring.slot(self.cursor).load_full();
            match entry {
                Some(entry) if entry.seq == self.cursor => {
                    self.cursor += 1;
                    return Some(entry.value.clone());
                }
                // Overwritten since `tail` was loaded; reload and clamp.
                Some(entry) if entry.seq > self.cursor => continue,
                _ => return None,
            }
        }
    }

    /// Poll up to `max` events into `out`. Returns how many were read.
    pub fn poll_into(&mut self, out: &mut Vec<T>, max: usize) -> usize {
        let mut read = 0;
        while read < max {
            match self.poll() {
                Some(value) => {
                    out.push(value);
                    read += 1;
                }
                None => break,
            }
        }
        read
    }

    /// Sequence of the next event this subscriber will read.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Events lost to overwrite so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Events published but not yet read (may exceed capacity).
    pub fn lag(&self) -> u64 {
        self.ring
            .tail
            .load(Ordering::Acquire)
            .saturating_sub(self.cursor)
    }
}

impl<T> fmt::Debug for BusSubscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusSubscriber")
            .field("cursor", &self.cursor)
            .field("skipped", &self.skipped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::thread;
    use std::time::{Duration, Instant};

    /// Payload whose `Clone` takes a long time and reports when it starts.
    #[derive(Debug)]
    struct SlowClone {
        id: u32,
        cloning: Arc<AtomicBool>,
    }

    impl Clone for SlowClone {
        fn clone(&self) -> Self {
            self.cloning.store(true, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(300));
            Self {
                id: self.id,
                cloning: Arc::clone(&self.cloning),
            }
        }
    }

    #[test]
    fn test_subscribe_sees_only_later_events() {
        let (mut publisher, handle) = channel(4);
        for i in 1..=3 {
            publisher.publish(i);
        }
        let mut subscriber = handle.subscribe();
        publisher.publish(4);
        publisher.publish(5);

        assert_eq!(subscriber.poll(), Some(4));
        assert_eq!(subscriber.poll(), Some(5));
        assert_eq!(subscriber.poll(), None);
        assert_eq!(subscriber.skipped(), 0);
    }

    #[test]
    fn test_lagging_subscriber_is_clamped() {
        let (mut publisher, handle) = channel(2);
        let mut subscriber = handle.subscribe_from(0);
        for i in 1..=3 {
            publisher.publish(i);
        }

        assert_eq!(subscriber.poll(), Some(2));
        assert_eq!(subscriber.poll(), Some(3));
        assert_eq!(subscriber.poll(), None);
        assert_eq!(subscriber.skipped(), 1);
    }

    #[test]
    fn test_subscribers_are_independent() {
        let (mut publisher, handle) = channel(8);
        let mut fast = handle.subscribe();
        let mut slow = handle.clone().subscribe();

        publisher.publish("a");
        assert_eq!(fast.poll(), Some("a"));
        publisher.publish("b");
        assert_eq!(fast.poll(), Some("b"));

        assert_eq!(slow.lag(), 2);
        assert_eq!(slow.poll(), Some("a"));
        assert_eq!(slow.poll(), Some("b"));
        assert_eq!(fast.poll(), None);
    }

    #[test]
    fn test_publish_never_blocks_on_full_ring() {
        let (mut publisher, handle) = channel(4);
        let mut subscriber = handle.subscribe();
        for i in 0..100u32 {
            assert_eq!(publisher.publish(i), u64::from(i));
        }
        let mut out = Vec::new();
        assert_eq!(subscriber.poll_into(&mut out, 10), 4);
        assert_eq!(out, vec![96, 97, 98, 99]);
        assert_eq!(subscriber.skipped(), 96);
    }

    #[test]
    fn test_concurrent_subscriber_sees_increasing_values() {
        const COUNT: u64 = 50_000;
        let (mut publisher, handle) = channel(256);
        let mut subscriber = handle.subscribe_from(0);

        let reader = thread::spawn(move || {
            let mut last = None;
            let mut received = 0u64;
            while last != Some(COUNT - 1) {
                if let Some(value) = subscriber.poll() {
                    assert!(last.map_or(true, |prev| value > prev));
                    last = Some(value);
                    received += 1;
                } else {
                    thread::yield_now();
                }
            }
            (received, subscriber.skipped())
        });

        for i in 0..COUNT {
            publisher.publish(i);
        }
        let (received, skipped) = reader.join().unwrap();
        assert_eq!(received + skipped, COUNT);
    }

    #[test]
    fn test_publish_does_not_wait_for_reader_clone() {
        let (mut publisher, handle) = channel(1);
        let cloning = Arc::new(AtomicBool::new(false));
        publisher.publish(SlowClone {
            id: 1,
            cloning: Arc::clone(&cloning),
        });

        let mut subscriber = handle.subscribe_from(0);
        let reader = thread::spawn(move || subscriber.poll().map(|event| event.id));

        while !cloning.load(Ordering::SeqCst) {
            thread::yield_now();
        }
        let started = Instant::now();
        publisher.publish(SlowClone {
            id: 2,
            cloning: Arc::new(AtomicBool::new(false)),
        });
        let waited = started.elapsed();

        assert!(waited < Duration::from_millis(100), "publish waited {waited:?}");
        assert_eq!(reader.join().unwrap(), Some(1));
    }
}
