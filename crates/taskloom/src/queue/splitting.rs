//! Bucket-serialized queue: at most one task per bucket runs at a time.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use taskloom_core::{Callback, ComputationError, Task};

use super::base::{Discipline, QueueBase, Target};
use crate::QueueHandle;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A queue whose tasks carry a bucket key (`None` is itself a valid,
/// shared bucket). Tasks in different buckets may run concurrently up to
/// pool width; two tasks sharing a bucket never run at the same time —
/// the second is skipped over (FIFO order preserved among the rest) until
/// the first's callback fires.
///
/// Unlike `Unbounded`/`Bounded`/`TwoLevel`, `SplittingQueue` does not hand
/// out a generic [`Sink`](super::sink::Sink): the bucket key has to travel
/// with each submission, so submission goes through `offer`/`put` directly
/// on the queue rather than through a bucket-less producer handle.
pub struct SplittingQueue<R> {
    base: Arc<QueueBase<R>>,
}

impl<R> SplittingQueue<R> {
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        SplittingQueue {
            base: Arc::new(QueueBase::new(
                Discipline::Splitting {
                    tasks: VecDeque::new(),
                    locked: HashSet::new(),
                },
                poll_interval,
            )),
        }
    }

    /// Non-blocking submission into `bucket` (or the shared `None` bucket).
    /// See [`super::sink::Sink::offer`] for the accept/reject contract.
    pub fn offer<F>(&self, bucket: Option<u64>, computation: F, callback: Callback<R>) -> bool
    where
        F: FnOnce() -> Result<R, ComputationError> + Send + 'static,
    {
        let task = Task::new(computation, callback);
        self.base.offer(Target::Bucket(bucket), task)
    }

    /// Blocking submission. Splitting's internal storage is unbounded, so
    /// this never actually blocks on backpressure — it exists for
    /// `Sink`-API symmetry with the other disciplines and so a caller can
    /// swap disciplines without changing call sites.
    pub fn put<F>(&self, bucket: Option<u64>, computation: F, callback: Callback<R>)
    where
        F: FnOnce() -> Result<R, ComputationError> + Send + 'static,
    {
        let task = Task::new(computation, callback);
        self.base.put(Target::Bucket(bucket), task)
    }

    pub fn handle(&self) -> QueueHandle<R> {
        Arc::clone(&self.base)
    }
}

impl<R> Default for SplittingQueue<R> {
    fn default() -> Self {
        Self::new()
    }
}
