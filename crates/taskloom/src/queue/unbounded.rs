//! Growable FIFO queue: `offer` always accepts.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use super::base::{Discipline, QueueBase, Target};
use super::sink::Sink;
use crate::QueueHandle;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// An unbounded, non-blocking-on-producers FIFO task queue.
pub struct UnboundedQueue<R> {
    base: Arc<QueueBase<R>>,
}

impl<R> UnboundedQueue<R> {
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    /// As [`UnboundedQueue::new`], but with an explicit worker/producer wait
    /// granularity instead of the default 50ms. A shorter interval makes
    /// shutdown and backpressure react sooner at the cost of more frequent
    /// condvar wakeups.
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        UnboundedQueue {
            base: Arc::new(QueueBase::new(Discipline::Unbounded(VecDeque::new()), poll_interval)),
        }
    }

    /// A producer-facing handle. Every call returns a new `Sink` bound to
    /// the same underlying queue — sinks are cheap, `Arc`-backed clones.
    pub fn sink(&self) -> Sink<R> {
        Sink {
            queue: Arc::clone(&self.base),
            target: Target::Single,
        }
    }

    /// The handle `Service`/`WorkerPool` bind to for consumption and
    /// shutdown.
    pub fn handle(&self) -> QueueHandle<R> {
        Arc::clone(&self.base)
    }
}

impl<R> Default for UnboundedQueue<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskloom_core::Callback;

    #[test]
    fn offer_never_rejects() {
        let q: UnboundedQueue<u32> = UnboundedQueue::new();
        let sink = q.sink();
        for i in 0..1000 {
            assert!(sink.offer(move || Ok(i), Callback::noop()));
        }
    }

    #[test]
    fn fifo_order_with_single_consumer() {
        let q: UnboundedQueue<u32> = UnboundedQueue::new();
        let sink = q.sink();
        let handle = q.handle();
        let order = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        for i in 0..5u32 {
            let order = std::sync::Arc::clone(&order);
            sink.offer(
                move || Ok(i),
                Callback::from_success(move |v| order.lock().unwrap().push(v)),
            );
        }
        for _ in 0..5 {
            let (task, token) = handle.take_if_not_terminated().unwrap();
            task.run();
            handle.after_callback(token);
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }
}
