// ============================================================================
// Bounded SPSC Queue
// ============================================================================
//
// Memory ordering:
// - Producer writes the slot, then publishes `tail` with Release.
// - Consumer loads `tail` with Acquire before reading the slot, then
//   publishes `head` with Release so the producer may reuse it.
// - Producer loads `head` with Acquire before overwriting a slot.
//
// Each side caches the other side's cursor and only reloads it when the
// cached value says full (producer) or empty (consumer).
// ============================================================================

use crossbeam::utils::CachePadded;
use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::round_capacity;
use crate::error::QueueFull;

struct Ring<T> {
    /// Next slot to read; written only by the consumer
    head: CachePadded<AtomicUsize>,
    /// Next slot to write; written only by the producer
    tail: CachePadded<AtomicUsize>,
    mask: usize,
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// SAFETY: a slot is accessed by exactly one side at a time; the cursor
// handoff (Release store / Acquire load) orders those accesses.
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    fn capacity(&self) -> usize {
        self.mask + 1
    }

    fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        tail.wrapping_sub(head)
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        // Both handles are gone; plain reads are enough.
        let head = *self.head.get_mut();
        let tail = *self.tail.get_mut();
        let mut cursor = head;
        while cursor != tail {
            let slot = &mut self.slots[cursor & self.mask];
            // SAFETY: every slot in [head, tail) was written and not yet read.
            unsafe { slot.get_mut().assume_init_drop() };
            cursor = cursor.wrapping_add(1);
        }
    }
}

/// Create a queue holding at least `capacity` items (rounded up to a power
/// of two).
///
/// # Example
/// ```
/// use tick_matching_engine::pipeline::queue;
///
/// let (mut tx, mut rx) = queue::bounded(2);
/// tx.push("a").unwrap();
/// tx.push("b").unwrap();
/// assert!(tx.push("c").is_err());
/// assert_eq!(rx.pop(), Some("a"));
/// ```
pub fn bounded<T>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    let capacity = round_capacity(capacity);
    let slots = (0..capacity)
        .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
        .collect::<Vec<_>>()
        .into_boxed_slice();
    let ring = Arc::new(Ring {
        head: CachePadded::new(AtomicUsize::new(0)),
        tail: CachePadded::new(AtomicUsize::new(0)),
        mask: capacity - 1,
        slots,
    });
    (
        Producer {
            ring: Arc::clone(&ring),
            tail: 0,
            cached_head: 0,
        },
        Consumer {
            ring,
            head: 0,
            cached_tail: 0,
        },
    )
}

// ============================================================================
// Producer
// ============================================================================

/// Write end. Exactly one per queue.
pub struct Producer<T> {
    ring: Arc<Ring<T>>,
    /// Local copy of our own cursor
    tail: usize,
    cached_head: usize,
}

impl<T> Producer<T> {
    /// Enqueue `item`, or hand it back if the queue is full.
    pub fn push(&mut self, item: T) -> Result<(), QueueFull<T>> {
        self.push_with(item, |item| item)
    }

    /// Enqueue `wrap(item)`. `wrap` only runs once a slot is known to be
    /// free, so a full queue hands back the original, unwrapped item.
    pub fn push_with<U>(
        &mut self,
        item: U,
        wrap: impl FnOnce(U) -> T,
    ) -> Result<(), QueueFull<U>> {
        if !self.has_room() {
            return Err(QueueFull(item));
        }
        self.write(wrap(item));
        Ok(())
    }

    fn has_room(&mut self) -> bool {
        let capacity = self.ring.capacity();
        if self.tail.wrapping_sub(self.cached_head) == capacity {
            self.cached_head = self.ring.head.load(Ordering::Acquire);
            if self.tail.wrapping_sub(self.cached_head) == capacity {
                return false;
            }
        }
        true
    }

    fn write(&mut self, item: T) {
        let slot = &self.ring.slots[self.tail & self.ring.mask];
        // SAFETY: the slot lies outside [head, tail), so the consumer is not
        // reading it, and we are the only producer.
        unsafe { (*slot.get()).write(item) };

        self.tail = self.tail.wrapping_add(1);
        self.ring.tail.store(self.tail, Ordering::Release);
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Items currently queued. A snapshot; the consumer may be draining.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

// ============================================================================
// Consumer
// ============================================================================

/// Read end. Exactly one per queue.
pub struct Consumer<T> {
    ring: Arc<Ring<T>>,
    head: usize,
    cached_tail: usize,
}

impl<T> Consumer<T> {
    /// Dequeue the oldest item, or `None` if the queue is empty.
    pub fn pop(&mut self) -> Option<T> {
        if self.head == self.cached_tail {
            self.cached_tail = self.ring.tail.load(Ordering::Acquire);
            if self.head == self.cached_tail {
                return None;
            }
        }

        let slot = &self.ring.slots[self.head & self.ring.mask];
        // SAFETY: head < tail, so the producer finished writing this slot
        // before its Release store we just Acquired.
        let item = unsafe { (*slot.get()).assume_init_read() };

        self.head = self.head.wrapping_add(1);
        self.ring.head.store(self.head, Ordering::Release);
        Some(item)
    }

    /// Pop up to `max` items into `out`. Returns how many were moved.
    pub fn drain_into(&mut self, out: &mut Vec<T>, max: usize) -> usize {
        let mut moved = 0;
        while moved < max {
            match self.pop() {
                Some(item) => {
                    out.push(item);
                    moved += 1;
                }
                None => break,
            }
        }
        moved
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn test_capacity_two_sequence() {
        let (mut tx, mut rx) = bounded(2);
        assert!(tx.push('A').is_ok());
        assert!(tx.push('B').is_ok());
        assert_eq!(tx.push('C').map_err(QueueFull::into_inner), Err('C'));

        assert_eq!(rx.pop(), Some('A'));
        assert!(tx.push('C').is_ok());
        assert_eq!(rx.pop(), Some('B'));
        assert_eq!(rx.pop(), Some('C'));
        assert_eq!(rx.pop(), None);
    }

    #[test]
    fn test_push_with_returns_unwrapped_item_when_full() {
        let (mut tx, mut rx) = bounded::<Option<u32>>(1);
        assert!(tx.push_with(1, Some).is_ok());
        assert_eq!(tx.push_with(2, Some).map_err(QueueFull::into_inner), Err(2));
        assert_eq!(rx.pop(), Some(Some(1)));
    }

    #[test]
    fn test_capacity_rounds_up() {
        let (tx, rx) = bounded::<u8>(5);
        assert_eq!(tx.capacity(), 8);
        assert_eq!(rx.capacity(), 8);

        let (tx, _rx) = bounded::<u8>(0);
        assert_eq!(tx.capacity(), 1);
    }

    #[test]
    fn test_len_tracks_occupancy() {
        let (mut tx, mut rx) = bounded(4);
        assert!(rx.is_empty());
        for i in 0..4 {
            tx.push(i).unwrap();
        }
        assert!(tx.is_full());
        assert_eq!(rx.len(), 4);
        rx.pop();
        assert_eq!(tx.len(), 3);
    }

    #[test]
    fn test_wraps_many_times() {
        let (mut tx, mut rx) = bounded(4);
        for i in 0..1_000u32 {
            tx.push(i).unwrap();
            assert_eq!(rx.pop(), Some(i));
        }
    }

    #[test]
    fn test_drain_into() {
        let (mut tx, mut rx) = bounded(8);
        for i in 0..5 {
            tx.push(i).unwrap();
        }
        let mut out = Vec::new();
        assert_eq!(rx.drain_into(&mut out, 3), 3);
        assert_eq!(out, vec![0, 1, 2]);
        assert_eq!(rx.drain_into(&mut out, 10), 2);
        assert_eq!(out, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_drop_releases_queued_items() {
        struct Counted(Arc<AtomicUsize>);
        impl Drop for Counted {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        {
            let (mut tx, mut rx) = bounded(4);
            for _ in 0..3 {
                tx.push(Counted(Arc::clone(&drops))).unwrap();
            }
            drop(rx.pop());
            assert_eq!(drops.load(Ordering::SeqCst), 1);
        }
        assert_eq!(drops.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_cross_thread_preserves_order() {
        const COUNT: u64 = 100_000;
        let (mut tx, mut rx) = bounded(64);

        let producer = thread::spawn(move || {
            for i in 0..COUNT {
                let mut item = i;
                loop {
                    match tx.push(item) {
                        Ok(()) => break,
                        Err(QueueFull(back)) => {
                            item = back;
                            thread::yield_now();
                        }
                    }
                }
            }
        });

        let mut expected = 0;
        while expected < COUNT {
            match rx.pop() {
                Some(value) => {
                    assert_eq!(value, expected);
                    expected += 1;
                }
                None => thread::yield_now(),
            }
        }
        producer.join().unwrap();
        assert!(rx.pop().is_none());
    }
}
