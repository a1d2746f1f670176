// ============================================================================
// Indexed Heap
// Arena-backed binary heap with O(log n) removal by order id
// ============================================================================

use crate::error::InvariantViolation;
use std::cmp::Ordering;
use std::collections::HashMap;

use super::{OrderId, Side};

/// Element stored in an [`IndexedHeap`].
pub trait HeapItem {
    fn key(&self) -> OrderId;

    /// `Ordering::Less` means `self` is served before `other`.
    fn priority_cmp(&self, other: &Self) -> Ordering;
}

/// Price-time ranking shared by resting orders and stop orders.
///
/// Buy side: higher price first. Sell side: lower price first. Equal prices
/// fall back to the lower (earlier) id.
#[inline]
pub fn side_priority(side: Side, a: (i64, OrderId), b: (i64, OrderId)) -> Ordering {
    let by_price = match side {
        Side::Buy => b.0.cmp(&a.0),
        Side::Sell => a.0.cmp(&b.0),
    };
    by_price.then(a.1.cmp(&b.1))
}

/// Binary heap stored in a flat vector, with an external `id -> slot` map
/// kept in sync on every swap.
#[derive(Debug, Clone)]
pub struct IndexedHeap<T: HeapItem> {
    entries: Vec<T>,
    slots: HashMap<OrderId, usize>,
}

impl<T: HeapItem> Default for IndexedHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: HeapItem> IndexedHeap<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            slots: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: OrderId) -> bool {
        self.slots.contains_key(&key)
    }

    pub fn get(&self, key: OrderId) -> Option<&T> {
        self.slots.get(&key).and_then(|&slot| self.entries.get(slot))
    }

    /// Top-priority element.
    pub fn peek(&self) -> Option<&T> {
        self.entries.first()
    }

    /// Mutable access to the top element. Callers must not change any field
    /// that `priority_cmp` reads.
    pub(crate) fn peek_mut(&mut self) -> Option<&mut T> {
        self.entries.first_mut()
    }

    /// Insert an element. Returns it back if its key is already present.
    pub fn push(&mut self, item: T) -> Result<(), T> {
        let key = item.key();
        if self.slots.contains_key(&key) {
            return Err(item);
        }
        let slot = self.entries.len();
        self.entries.push(item);
        self.slots.insert(key, slot);
        self.sift_up(slot);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.entries.is_empty() {
            return None;
        }
        Some(self.take_slot(0))
    }

    /// Remove by key. Unknown keys are a no-op.
    ///
    /// # Errors
    /// Returns `DanglingIndex` if the slot map points at a missing entry or
    /// at an entry with a different key.
    pub fn remove(&mut self, key: OrderId) -> Result<Option<T>, InvariantViolation> {
        let Some(&slot) = self.slots.get(&key) else {
            return Ok(None);
        };
        match self.entries.get(slot) {
            Some(entry) if entry.key() == key => Ok(Some(self.take_slot(slot))),
            _ => Err(InvariantViolation::DanglingIndex { order_id: key }),
        }
    }

    /// Unordered view of every element.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// Every element in service order. O(n log n); meant for snapshots.
    pub fn sorted(&self) -> Vec<&T> {
        let mut view: Vec<&T> = self.entries.iter().collect();
        view.sort_by(|a, b| a.priority_cmp(b));
        view
    }

    /// Verify the heap property and that every map entry points home.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if self.slots.len() != self.entries.len() {
            let order_id = self
                .entries
                .iter()
                .map(HeapItem::key)
                .find(|k| !self.slots.contains_key(k))
                .or_else(|| self.slots.keys().next().copied())
                .unwrap_or(OrderId(0));
            return Err(InvariantViolation::DanglingIndex { order_id });
        }
        for (slot, entry) in self.entries.iter().enumerate() {
            if self.slots.get(&entry.key()) != Some(&slot) {
                return Err(InvariantViolation::DanglingIndex {
                    order_id: entry.key(),
                });
            }
            if slot > 0 {
                let parent = &self.entries[(slot - 1) / 2];
                if entry.priority_cmp(parent) == Ordering::Less {
                    return Err(InvariantViolation::DanglingIndex {
                        order_id: entry.key(),
                    });
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Private methods
    // ========================================================================

    fn take_slot(&mut self, slot: usize) -> T {
        let item = self.entries.swap_remove(slot);
        self.slots.remove(&item.key());
        if slot < self.entries.len() {
            self.slots.insert(self.entries[slot].key(), slot);
            // The element moved into `slot` may need to travel either way.
            self.sift_down(slot);
            self.sift_up(slot);
        }
        item
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.entries.swap(a, b);
        self.slots.insert(self.entries[a].key(), a);
        self.slots.insert(self.entries[b].key(), b);
    }

    fn sift_up(&mut self, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if self.entries[slot].priority_cmp(&self.entries[parent]) != Ordering::Less {
                break;
            }
            self.swap(slot, parent);
            slot = parent;
        }
    }

    fn sift_down(&mut self, mut slot: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * slot + 1;
            let right = left + 1;
            let mut best = slot;
            if left < len && self.entries[left].priority_cmp(&self.entries[best]) == Ordering::Less
            {
                best = left;
            }
            if right < len
                && self.entries[right].priority_cmp(&self.entries[best]) == Ordering::Less
            {
                best = right;
            }
            if best == slot {
                break;
            }
            self.swap(slot, best);
            slot = best;
        }
    }
}
