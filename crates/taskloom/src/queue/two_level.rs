//! Two physical queues behind one lock: an unbounded `internal` feed for the
//! service's own follow-up work, and a bounded `external` feed for producers.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use taskloom_core::{RingBuffer, TaskError};

use super::base::{Discipline, QueueBase, Target};
use super::sink::Sink;
use crate::QueueHandle;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A queue that always drains `internal` before `external`, so work the
/// service schedules for itself is never throttled by backpressure meant
/// for outside producers.
pub struct TwoLevelQueue<R> {
    base: Arc<QueueBase<R>>,
}

impl<R> TwoLevelQueue<R> {
    /// `external_log2_capacity` bounds only the external feed; `internal`
    /// is unbounded.
    pub fn new(external_log2_capacity: u32) -> Result<Self, TaskError> {
        Self::with_poll_interval(external_log2_capacity, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(
        external_log2_capacity: u32,
        poll_interval: Duration,
    ) -> Result<Self, TaskError> {
        if external_log2_capacity > 30 {
            return Err(TaskError::invalid(format!(
                "external_log2_capacity must be in 0..=30, got {external_log2_capacity}"
            )));
        }
        Ok(TwoLevelQueue {
            base: Arc::new(QueueBase::new(
                Discipline::TwoLevel {
                    internal: VecDeque::new(),
                    external: RingBuffer::new(external_log2_capacity),
                },
                poll_interval,
            )),
        })
    }

    /// The high-priority feed: always drained first.
    pub fn internal_sink(&self) -> Sink<R> {
        Sink {
            queue: Arc::clone(&self.base),
            target: Target::Internal,
        }
    }

    /// The bounded, rate-limited feed for outside producers.
    pub fn external_sink(&self) -> Sink<R> {
        Sink {
            queue: Arc::clone(&self.base),
            target: Target::External,
        }
    }

    pub fn handle(&self) -> QueueHandle<R> {
        Arc::clone(&self.base)
    }
}
