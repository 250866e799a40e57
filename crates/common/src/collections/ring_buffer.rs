//! Fixed-capacity history buffer.
//!
//! A [`RingBuffer`] keeps at most `capacity` items in insertion order. Pushing
//! into a full buffer evicts the oldest item first, so the buffer always holds
//! the most recent window of a stream (decision logs, transition traces).

use std::collections::VecDeque;

/// Bounded FIFO history with oldest-first eviction.
///
/// # Examples
///
/// ```rust
/// use linkguard_common::collections::RingBuffer;
///
/// let mut history = RingBuffer::new(3);
/// for value in 1..=4 {
///     history.push(value);
/// }
///
/// assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
/// assert_eq!(history.latest(2).copied().collect::<Vec<_>>(), vec![3, 4]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RingBuffer<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Creates an empty buffer. A capacity of zero is clamped to `1`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { buf: VecDeque::with_capacity(capacity), capacity }
    }

    /// Appends `item`, returning the evicted oldest item when the buffer was
    /// already full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.is_full() { self.buf.pop_front() } else { None };
        self.buf.push_back(item);
        evicted
    }

    /// Number of retained items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.buf.len() == self.capacity
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest retained item.
    #[must_use]
    pub fn oldest(&self) -> Option<&T> {
        self.buf.front()
    }

    /// Most recently pushed item.
    #[must_use]
    pub fn newest(&self) -> Option<&T> {
        self.buf.back()
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, T> {
        self.buf.iter()
    }

    /// The last `limit` items, still ordered oldest to newest.
    pub fn latest(&self, limit: usize) -> impl Iterator<Item = &T> {
        self.buf.iter().skip(self.buf.len().saturating_sub(limit))
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl<T> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::new(1)
    }
}

impl<'a, T> IntoIterator for &'a RingBuffer<T> {
    type Item = &'a T;
    type IntoIter = std::collections::vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.buf.iter()
    }
}
