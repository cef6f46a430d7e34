//! Binds a queue and a worker pool into one orderly-shutdown unit.

use std::sync::Arc;
use std::time::Duration;

use taskloom_core::TaskError;

use crate::pool::WorkerPool;
use crate::threading::Threading;
use crate::QueueHandle;

/// Owns a queue and the pool of workers draining it. [`Service::close`]
/// is the single place that ties "stop accepting new work" (the queue's
/// `running` flag) to "stop running workers" (the pool's phase) and
/// guarantees every task that was ever queued receives exactly one
/// terminal callback signal, even ones still sitting in the queue when
/// the grace period expires.
pub struct Service<R> {
    handle: QueueHandle<R>,
    pool: WorkerPool,
    termination_timeout: Option<Duration>,
}

impl<R: 'static> Service<R> {
    /// Starts a pool of `threading.thread_count()` workers draining
    /// `handle`. `termination_timeout`, if set, bounds how long
    /// [`Service::close`] waits for workers to finish their current task
    /// before force-draining the rest.
    pub fn new(
        handle: QueueHandle<R>,
        threading: Threading,
        termination_timeout: Option<Duration>,
    ) -> Result<Self, TaskError> {
        let worker_handle = Arc::clone(&handle);
        let pool = WorkerPool::new(&threading, move || match worker_handle.take_if_not_terminated() {
            Some((task, token)) => {
                task.run();
                worker_handle.after_callback(token);
                true
            }
            None => false,
        })?;

        Ok(Service {
            handle,
            pool,
            termination_timeout,
        })
    }

    /// `true` while the pool is actively draining the queue.
    pub fn is_running(&self) -> bool {
        self.pool.is_running()
    }

    /// Winds the service down: stops the queue, waits up to
    /// `termination_timeout` for workers to finish in-flight tasks and
    /// drain what remains, then — if the timeout elapses first — drains
    /// every still-queued task and delivers `terminated()` to each,
    /// guaranteeing no task is left without a terminal signal.
    ///
    /// Not safe to call concurrently with itself — exactly one caller may
    /// close a given `Service`.
    pub fn close(&self) -> Result<(), TaskError> {
        let handle = Arc::clone(&self.handle);
        let result = self.pool.close(self.termination_timeout, move || {
            handle.terminate();
            Ok(())
        });

        if let Err(TaskError::CloseTimedOut { elapsed_ms }) = &result {
            let mut orphans = Vec::new();
            self.handle.drain_to(&mut orphans);
            if !orphans.is_empty() {
                tracing::warn!(count = orphans.len(), "draining orphan tasks after close timeout");
            }
            for task in orphans {
                task.terminate();
            }
            return Err(TaskError::CloseTimedOut {
                elapsed_ms: *elapsed_ms,
            });
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use taskloom_core::Callback;

    use crate::UnboundedQueue;

    #[test]
    fn submitted_tasks_are_drained_in_fifo_order_with_one_worker() {
        let queue: UnboundedQueue<u32> = UnboundedQueue::new();
        let sink = queue.sink();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..20u32 {
            let order = Arc::clone(&order);
            sink.offer(
                move || Ok(i),
                Callback::from_success(move |v| order.lock().unwrap().push(v)),
            );
        }

        let threading = Threading::new(NonZeroUsize::new(1).unwrap());
        let service = Service::new(queue.handle(), threading, Some(Duration::from_secs(5))).unwrap();

        // Poll until the queue drains; the default poll interval is 50ms.
        for _ in 0..200 {
            if order.lock().unwrap().len() == 20 {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(*order.lock().unwrap(), (0..20).collect::<Vec<_>>());
        service.close().unwrap();
    }

    #[test]
    fn close_delivers_terminated_to_orphan_tasks_past_the_grace_period() {
        let queue: UnboundedQueue<u32> = UnboundedQueue::new();
        let sink = queue.sink();
        let terminated_count = Arc::new(AtomicUsize::new(0));

        for _ in 0..50 {
            let t = Arc::clone(&terminated_count);
            sink.offer(
                || {
                    std::thread::sleep(Duration::from_secs(2));
                    Ok(1u32)
                },
                Callback::of(
                    None,
                    None,
                    Some(Box::new(move || {
                        t.fetch_add(1, Ordering::SeqCst);
                    })),
                ),
            );
        }

        let threading = Threading::new(NonZeroUsize::new(2).unwrap());
        let service = Service::new(queue.handle(), threading, Some(Duration::from_millis(50))).unwrap();

        let err = service.close().unwrap_err();
        assert!(matches!(err, TaskError::CloseTimedOut { .. }));
        // 2 workers pick up 1 long-sleeping task each; the other 48 never
        // started and must all receive `terminated()`.
        assert_eq!(terminated_count.load(Ordering::SeqCst), 48);
    }
}
