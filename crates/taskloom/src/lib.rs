//! # taskloom
//!
//! A fixed-size worker pool over a pluggable task queue, with results
//! delivered through per-task callbacks rather than futures.
//!
//! - Pick a queue discipline — [`UnboundedQueue`], [`BoundedQueue`],
//!   [`TwoLevelQueue`], or [`SplittingQueue`] — and get a [`Sink`] (or, for
//!   `SplittingQueue`, its bucket-aware `offer`/`put`) to submit work.
//! - Wrap the queue's [`QueueHandle`] and a [`Threading`] configuration in a
//!   [`Service`] to start a pool of workers draining it.
//! - [`Service::close`] winds the pool down within a grace period, then
//!   force-terminates any task still queued.
//!
//! Chain callback-based steps into a pipeline with
//! [`taskloom_chain::AsyncChain`] (a sibling crate).

mod pool;
mod queue;
mod service;
mod threading;

use std::sync::Arc;

pub use queue::{BoundedQueue, QueueBase, Sink, SplittingQueue, TwoLevelQueue, UnboundedQueue};
pub use service::Service;
pub use threading::Threading;

pub use taskloom_core::{Callback, ComputationError, TaskError};

/// A handle to a queue's consumption/shutdown surface, shared between the
/// queue wrapper that producers hold and the [`Service`] that owns a pool
/// of workers draining it. Opaque to callers outside this crate beyond
/// [`QueueBase::is_running`] — everything else is driven by `Service`.
pub type QueueHandle<R> = Arc<QueueBase<R>>;
