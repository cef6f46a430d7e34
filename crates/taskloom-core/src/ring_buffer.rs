//! Fixed-capacity, non-synchronized bounded FIFO.
//!
//! `RingBuffer` takes no lock of its own — the enclosing queue discipline
//! (see `taskloom::queue`) provides mutual exclusion. Capacity is always a
//! power of two so that index wraparound is a bit-mask instead of a modulo.

/// A fixed-capacity ring buffer of `T`, indexed `head..head+size` modulo
/// `capacity` via a bit mask.
///
/// Invariant: `0 <= size <= capacity` at all times.
pub struct RingBuffer<T> {
    slots: Box<[Option<T>]>,
    mask: usize,
    head: usize,
    size: usize,
}

impl<T> RingBuffer<T> {
    /// Creates a ring buffer of capacity `2^log2_capacity`.
    ///
    /// # Panics
    /// Panics if `log2_capacity` is not in `0..=30` — callers validate this
    /// at the public API boundary (see `taskloom::queue::Bounded::new`) and
    /// return a [`taskloom_core::TaskError::Invalid`] instead of reaching
    /// this panic; it exists as a defense against internal misuse.
    pub fn new(log2_capacity: u32) -> Self {
        assert!(
            log2_capacity <= 30,
            "ring buffer log2 capacity must be in 0..=30, got {log2_capacity}"
        );
        let capacity = 1usize << log2_capacity;
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        RingBuffer {
            slots: slots.into_boxed_slice(),
            mask: capacity - 1,
            head: 0,
            size: 0,
        }
    }

    /// Total capacity (always a power of two).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of elements currently stored.
    pub fn len(&self) -> usize {
        self.size
    }

    /// True if no elements are stored.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// True if the buffer is at capacity.
    pub fn is_full(&self) -> bool {
        self.size == self.capacity()
    }

    /// Appends `value`. Returns it back wrapped in `Some` without modifying
    /// the buffer if it is full, so a caller that wants to retry (a blocking
    /// `put`) doesn't lose it; a caller that wants fire-and-forget semantics
    /// (a non-blocking `offer`) can just let the returned value drop.
    pub fn offer(&mut self, value: T) -> Option<T> {
        if self.is_full() {
            return Some(value);
        }
        let idx = (self.head + self.size) & self.mask;
        self.slots[idx] = Some(value);
        self.size += 1;
        None
    }

    /// Removes and returns the oldest element, or `None` if empty.
    pub fn poll(&mut self) -> Option<T> {
        if self.size == 0 {
            return None;
        }
        let value = self.slots[self.head].take();
        self.head = (self.head + 1) & self.mask;
        self.size -= 1;
        value
    }

    /// Returns a reference to the oldest element without removing it.
    pub fn peek(&self) -> Option<&T> {
        if self.size == 0 {
            None
        } else {
            self.slots[self.head].as_ref()
        }
    }

    /// Drains all live elements in FIFO order into `out`, then resets the
    /// buffer to empty.
    pub fn drain_into(&mut self, out: &mut Vec<T>) {
        out.reserve(self.size);
        while let Some(value) = self.poll() {
            out.push(value);
        }
        self.head = 0;
        self.size = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_and_poll_preserve_fifo() {
        let mut rb: RingBuffer<i32> = RingBuffer::new(2); // capacity 4
        assert!(rb.offer(1).is_none());
        assert!(rb.offer(2).is_none());
        assert!(rb.offer(3).is_none());
        assert!(rb.offer(4).is_none());
        assert_eq!(rb.offer(5), Some(5)); // full, value handed back
        assert_eq!(rb.poll(), Some(1));
        assert_eq!(rb.poll(), Some(2));
        assert_eq!(rb.poll(), Some(3));
        assert_eq!(rb.poll(), Some(4));
        assert_eq!(rb.poll(), None);
    }

    #[test]
    fn wraparound_preserves_order() {
        let mut rb: RingBuffer<i32> = RingBuffer::new(2); // capacity 4
        for v in 0..4 {
            assert!(rb.offer(v).is_none());
        }
        assert_eq!(rb.poll(), Some(0));
        assert_eq!(rb.poll(), Some(1));
        // Buffer has 2 free slots now; wrap around the end of the array.
        assert!(rb.offer(4).is_none());
        assert!(rb.offer(5).is_none());
        assert_eq!(rb.poll(), Some(2));
        assert_eq!(rb.poll(), Some(3));
        assert_eq!(rb.poll(), Some(4));
        assert_eq!(rb.poll(), Some(5));
        assert_eq!(rb.poll(), None);
    }

    #[test]
    fn drain_recovers_exact_insertion_sequence() {
        let mut rb: RingBuffer<i32> = RingBuffer::new(3); // capacity 8
        for v in 0..5 {
            assert!(rb.offer(v).is_none());
        }
        let mut out = Vec::new();
        rb.drain_into(&mut out);
        assert_eq!(out, vec![0, 1, 2, 3, 4]);
        assert!(rb.is_empty());
        assert_eq!(rb.len(), 0);
        // The buffer is reusable after a drain.
        assert!(rb.offer(99).is_none());
        assert_eq!(rb.poll(), Some(99));
    }

    #[test]
    fn arbitrary_interleaving_preserves_fifo() {
        let mut rb: RingBuffer<i32> = RingBuffer::new(2); // capacity 4
        let mut expected = std::collections::VecDeque::new();
        let mut next = 0;
        for step in 0..200 {
            if step % 3 == 0 && !rb.is_full() {
                rb.offer(next);
                expected.push_back(next);
                next += 1;
            } else if let Some(v) = rb.poll() {
                assert_eq!(Some(v), expected.pop_front());
            }
        }
        while let Some(v) = rb.poll() {
            assert_eq!(Some(v), expected.pop_front());
        }
        assert!(expected.is_empty());
    }
}
