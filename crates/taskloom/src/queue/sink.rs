//! Producer-facing facade over a [`QueueBase`].

use std::sync::Arc;

use taskloom_core::{Callback, ComputationError, Task};

use super::base::{QueueBase, Target};

/// The producer side of a queue: `offer` for non-blocking submission,
/// `put` for blocking submission. Bound to one queue and one [`Target`]
/// at construction; never outlives the `Arc<QueueBase<R>>` it holds.
pub struct Sink<R> {
    pub(crate) queue: Arc<QueueBase<R>>,
    pub(crate) target: Target,
}

impl<R> Sink<R> {
    /// Submits `computation` without blocking. Returns `true` if the task
    /// was accepted or if the queue had already terminated (in which case
    /// `callback.terminated()` already fired synchronously); `false` if the
    /// queue is running but full, in which case `callback` is dropped
    /// without any of its three signals firing.
    pub fn offer<F>(&self, computation: F, callback: Callback<R>) -> bool
    where
        F: FnOnce() -> Result<R, ComputationError> + Send + 'static,
    {
        let task = Task::new(computation, callback);
        self.queue.offer(self.target, task)
    }

    /// Submits `computation`, blocking the calling thread until the queue
    /// has room or terminates. On termination, `callback.terminated()`
    /// fires on the calling thread and this call returns normally — there
    /// is no separate cancellation error for a blocked `put`.
    pub fn put<F>(&self, computation: F, callback: Callback<R>)
    where
        F: FnOnce() -> Result<R, ComputationError> + Send + 'static,
    {
        let task = Task::new(computation, callback);
        self.queue.put(self.target, task)
    }
}
