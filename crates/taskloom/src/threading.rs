//! Validated worker-thread configuration.

use std::num::NonZeroUsize;
use std::sync::Arc;

use taskloom_core::TaskError;

/// How a [`WorkerPool`](crate::pool::WorkerPool) spawns and names its threads.
///
/// `on_thread_start` is the Rust-idiomatic stand-in for a per-worker
/// initialization hook (the kind of thing a JVM-hosted pool would run via a
/// context class loader): it runs once on each worker thread, before that
/// worker enters its poll loop, and receives the worker's index in
/// `0..thread_count`.
#[derive(Clone)]
pub struct Threading {
    thread_count: NonZeroUsize,
    name_format: Option<fn(usize) -> String>,
    on_thread_start: Option<Arc<dyn Fn(usize) + Send + Sync>>,
}

impl Threading {
    /// A pool of `thread_count` workers with default names and no startup hook.
    pub fn new(thread_count: NonZeroUsize) -> Self {
        Threading {
            thread_count,
            name_format: None,
            on_thread_start: None,
        }
    }

    /// Validated constructor for callers that only have a plain `usize` (for
    /// example, a value parsed from configuration). Returns
    /// [`TaskError::Invalid`] for zero.
    pub fn with_count(thread_count: usize) -> Result<Self, TaskError> {
        NonZeroUsize::new(thread_count)
            .map(Threading::new)
            .ok_or_else(|| TaskError::invalid("thread_count must be greater than zero"))
    }

    /// Overrides the per-worker thread name. `name_format(i)` must return a
    /// non-empty string for every `i` in `0..thread_count`; this is checked
    /// once at [`WorkerPool::new`](crate::pool::WorkerPool::new) time, not on
    /// every spawn.
    pub fn with_name_format(mut self, name_format: fn(usize) -> String) -> Self {
        self.name_format = Some(name_format);
        self
    }

    /// Registers a hook run once on each worker thread before it starts
    /// polling the queue.
    pub fn with_on_thread_start<F>(mut self, hook: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.on_thread_start = Some(Arc::new(hook));
        self
    }

    pub fn thread_count(&self) -> NonZeroUsize {
        self.thread_count
    }

    pub(crate) fn thread_name(&self, index: usize) -> String {
        match self.name_format {
            Some(f) => f(index),
            None => format!("taskloom-worker-{index}"),
        }
    }

    pub(crate) fn on_thread_start(&self) -> Option<Arc<dyn Fn(usize) + Send + Sync>> {
        self.on_thread_start.clone()
    }

    /// Validates the configuration eagerly, surfacing a bad `name_format`
    /// before any thread is spawned rather than letting `thread::Builder`
    /// fail on an empty name deep inside `WorkerPool::new`. Checks every
    /// worker index in `0..thread_count`, not a sample — a format that
    /// only fails past some threshold index must still be caught here.
    pub(crate) fn validate(&self) -> Result<(), TaskError> {
        if let Some(f) = self.name_format {
            for i in 0..self.thread_count.get() {
                if f(i).is_empty() {
                    return Err(TaskError::invalid(format!(
                        "name_format produced an empty name for worker {i}"
                    )));
                }
            }
        }
        Ok(())
    }
}
