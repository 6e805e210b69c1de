//! Ordered holding structures placed between actors.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::rc::Rc;

/// Common interface of the queue variants.
///
/// Items move through a queue by ownership transfer: a pushed item belongs to
/// the queue until some actor pops it.
pub trait SimQueue<T> {
    /// Appends an item.
    fn push(&mut self, item: T);
    /// Removes the next item according to the queue's order.
    fn pop(&mut self) -> Option<T>;
    /// Number of held items.
    fn len(&self) -> usize;
    /// Whether the queue holds no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared queue handle used to wire actors together.
pub type QueueRef<T> = Rc<RefCell<dyn SimQueue<T>>>;

/// Plain FIFO queue.
pub struct Fifo<T> {
    items: VecDeque<T>,
}

impl<T> Fifo<T> {
    /// Creates an empty FIFO queue.
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Creates an empty FIFO queue behind a shared handle.
    pub fn shared() -> QueueRef<T>
    where
        T: 'static,
    {
        Rc::new(RefCell::new(Self::new()))
    }
}

impl<T> Default for Fifo<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SimQueue<T> for Fifo<T> {
    fn push(&mut self, item: T) {
        self.items.push_back(item);
    }

    fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

struct Keyed<T> {
    key: f64,
    seq: u64,
    item: T,
}

impl<T> PartialEq for Keyed<T> {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl<T> Eq for Keyed<T> {}

impl<T> PartialOrd for Keyed<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Keyed<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behavior; insertion order breaks key ties.
        other
            .key
            .total_cmp(&self.key)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-ordered queue keyed by a caller-supplied comparison value, e.g. the
/// remaining service time of a request.
pub struct MinHeap<T> {
    heap: BinaryHeap<Keyed<T>>,
    key: fn(&T) -> f64,
    seq: u64,
}

impl<T> MinHeap<T> {
    /// Creates an empty heap ordered by `key`, smallest first.
    pub fn new(key: fn(&T) -> f64) -> Self {
        Self {
            heap: BinaryHeap::new(),
            key,
            seq: 0,
        }
    }

    /// Creates an empty keyed heap behind a shared handle.
    pub fn shared(key: fn(&T) -> f64) -> QueueRef<T>
    where
        T: 'static,
    {
        Rc::new(RefCell::new(Self::new(key)))
    }
}

impl<T> SimQueue<T> for MinHeap<T> {
    fn push(&mut self, item: T) {
        let key = (self.key)(&item);
        self.heap.push(Keyed {
            key,
            seq: self.seq,
            item,
        });
        self.seq += 1;
    }

    fn pop(&mut self) -> Option<T> {
        self.heap.pop().map(|k| k.item)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_preserves_insertion_order() {
        let mut q = Fifo::new();
        for i in 0..100 {
            q.push(i);
        }
        for i in 0..100 {
            assert_eq!(q.pop(), Some(i));
        }
        assert!(q.is_empty());
    }

    #[test]
    fn min_heap_pops_smallest_key_first() {
        let mut q: MinHeap<f64> = MinHeap::new(|v| *v);
        for v in [5.0, 1.0, 3.0, 4.0, 2.0] {
            q.push(v);
        }
        for expected in [1.0, 2.0, 3.0, 4.0, 5.0] {
            assert_eq!(q.pop(), Some(expected));
        }
    }

    #[test]
    fn min_heap_breaks_ties_by_insertion_order() {
        let mut q: MinHeap<(f64, u32)> = MinHeap::new(|v| v.0);
        q.push((1.0, 0));
        q.push((1.0, 1));
        q.push((1.0, 2));
        assert_eq!(q.pop(), Some((1.0, 0)));
        assert_eq!(q.pop(), Some((1.0, 1)));
        assert_eq!(q.pop(), Some((1.0, 2)));
    }
}
