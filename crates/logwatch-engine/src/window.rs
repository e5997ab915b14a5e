//! Fixed-capacity sliding window over the most recent observations.

use std::collections::VecDeque;
use std::collections::vec_deque::Iter;

/// Insertion-ordered buffer that evicts its oldest entry on overflow.
///
/// Capacity is fixed at construction.
#[derive(Debug, Clone)]
pub struct SlidingWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> SlidingWindow<T> {
    /// Create an empty window. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an item, returning the evicted oldest item if the window was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    /// Read-only view, oldest first.
    pub fn snapshot(&self) -> Iter<'_, T> {
        self.items.iter()
    }

    /// The last `k` items (or all of them when fewer exist), oldest first.
    pub fn suffix(&self, k: usize) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        let skip = self.items.len().saturating_sub(k);
        self.items.iter().skip(skip)
    }

    pub fn newest(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn oldest(&self) -> Option<&T> {
        self.items.front()
    }
}
