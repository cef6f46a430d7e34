//! Fixed-capacity FIFO task queue backed by a [`RingBuffer`].

use std::sync::Arc;
use std::time::Duration;

use taskloom_core::{RingBuffer, TaskError};

use super::base::{Discipline, QueueBase, Target};
use super::sink::Sink;
use crate::QueueHandle;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A task queue with a fixed capacity of `2^log2_capacity` entries.
/// `Sink::offer` rejects once full; `Sink::put` blocks until space frees.
pub struct BoundedQueue<R> {
    base: Arc<QueueBase<R>>,
}

impl<R> BoundedQueue<R> {
    /// Creates a queue of capacity `2^log2_capacity`.
    ///
    /// # Errors
    /// Returns [`TaskError::Invalid`] if `log2_capacity` is not in `0..=30`.
    pub fn new(log2_capacity: u32) -> Result<Self, TaskError> {
        Self::with_poll_interval(log2_capacity, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(log2_capacity: u32, poll_interval: Duration) -> Result<Self, TaskError> {
        if log2_capacity > 30 {
            return Err(TaskError::invalid(format!(
                "log2_capacity must be in 0..=30, got {log2_capacity}"
            )));
        }
        Ok(BoundedQueue {
            base: Arc::new(QueueBase::new(
                Discipline::Bounded(RingBuffer::new(log2_capacity)),
                poll_interval,
            )),
        })
    }

    pub fn sink(&self) -> Sink<R> {
        Sink {
            queue: Arc::clone(&self.base),
            target: Target::Single,
        }
    }

    pub fn handle(&self) -> QueueHandle<R> {
        Arc::clone(&self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc as StdArc;
    use std::thread;
    use taskloom_core::Callback;

    #[test]
    fn rejects_log2_capacity_above_30() {
        assert!(BoundedQueue::<u32>::new(31).is_err());
        assert!(BoundedQueue::<u32>::new(30).is_ok());
    }

    #[test]
    fn offer_rejects_past_capacity() {
        let q: BoundedQueue<u32> = BoundedQueue::new(1).unwrap(); // capacity 2
        let sink = q.sink();
        assert!(sink.offer(|| Ok(1), Callback::noop()));
        assert!(sink.offer(|| Ok(2), Callback::noop()));
        assert!(!sink.offer(|| Ok(3), Callback::noop()));
    }

    #[test]
    fn put_blocks_until_a_poll_frees_space() {
        let q: BoundedQueue<u32> = BoundedQueue::with_poll_interval(0, Duration::from_millis(5)).unwrap();
        let sink = q.sink();
        let handle = q.handle();
        assert!(sink.offer(|| Ok(1), Callback::noop())); // fills capacity 1

        let unblocked = StdArc::new(AtomicUsize::new(0));
        let u = StdArc::clone(&unblocked);
        let sink2 = q.sink();
        let putter = thread::spawn(move || {
            sink2.put(|| Ok(2), Callback::noop());
            u.fetch_add(1, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(20));
        assert_eq!(unblocked.load(Ordering::SeqCst), 0, "put should still be blocked");

        let (task, token) = handle.take_if_not_terminated().unwrap();
        task.run();
        handle.after_callback(token);

        putter.join().unwrap();
        assert_eq!(unblocked.load(Ordering::SeqCst), 1);
    }
}
