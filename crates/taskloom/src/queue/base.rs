//! The lock-and-two-condvars core shared by every queue discipline.

use std::collections::{HashSet, VecDeque};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use taskloom_core::{RingBuffer, Task};

/// How a freshly constructed [`Task`] is routed into a [`Discipline`].
///
/// `Single` covers Unbounded/Bounded (one physical queue). `Internal` and
/// `External` address TwoLevel's two physical queues. `Bucket` carries
/// Splitting's bucket key, supplied by the caller at submission time —
/// Splitting cannot derive a bucket by inspecting the task's computation
/// the way a reflective host would, since the computation is an opaque
/// `Box<dyn FnOnce>` here; see `DESIGN.md`.
#[derive(Clone, Copy)]
pub(crate) enum Target {
    Single,
    Internal,
    External,
    Bucket(Option<u64>),
}

/// An opaque token a poll produces and a matching `after_callback` consumes.
///
/// Only Splitting needs one (the bucket to unlock); every other discipline
/// ignores it.
#[derive(Clone, Copy)]
pub(crate) enum PostRunToken {
    None,
    Bucket(Option<u64>),
}

pub(crate) enum Discipline<R> {
    Unbounded(VecDeque<Task<R>>),
    Bounded(RingBuffer<Task<R>>),
    TwoLevel {
        internal: VecDeque<Task<R>>,
        external: RingBuffer<Task<R>>,
    },
    Splitting {
        tasks: VecDeque<(Option<u64>, Task<R>)>,
        locked: HashSet<Option<u64>>,
    },
}

impl<R> Discipline<R> {
    fn is_empty(&self) -> bool {
        match self {
            Discipline::Unbounded(q) => q.is_empty(),
            Discipline::Bounded(rb) => rb.is_empty(),
            Discipline::TwoLevel { internal, external } => internal.is_empty() && external.is_empty(),
            Discipline::Splitting { tasks, locked } => {
                tasks.iter().all(|(bucket, _)| locked.contains(bucket))
            }
        }
    }

    /// Returns the next runnable task along with the token `after_callback`
    /// needs, or `None` if nothing is currently pollable (Splitting: every
    /// remaining task's bucket is locked).
    fn poll(&mut self) -> Option<(Task<R>, PostRunToken)> {
        match self {
            Discipline::Unbounded(q) => q.pop_front().map(|t| (t, PostRunToken::None)),
            Discipline::Bounded(rb) => rb.poll().map(|t| (t, PostRunToken::None)),
            Discipline::TwoLevel { internal, external } => internal
                .pop_front()
                .or_else(|| external.poll())
                .map(|t| (t, PostRunToken::None)),
            Discipline::Splitting { tasks, locked } => {
                let pos = tasks.iter().position(|(bucket, _)| !locked.contains(bucket))?;
                let (bucket, task) = tasks.remove(pos).expect("position just verified in-bounds");
                locked.insert(bucket);
                Some((task, PostRunToken::Bucket(bucket)))
            }
        }
    }

    /// Returns `true` if accepting this token should wake blocked producers
    /// and consumers (Splitting: unlocking a bucket may free up a task that
    /// was previously unpollable).
    fn after_callback(&mut self, token: PostRunToken) -> bool {
        match (self, token) {
            (Discipline::Splitting { locked, .. }, PostRunToken::Bucket(bucket)) => {
                locked.remove(&bucket);
                true
            }
            _ => false,
        }
    }

    fn drain_into(&mut self, out: &mut Vec<Task<R>>) {
        match self {
            Discipline::Unbounded(q) => out.extend(q.drain(..)),
            Discipline::Bounded(rb) => rb.drain_into(out),
            Discipline::TwoLevel { internal, external } => {
                out.extend(internal.drain(..));
                external.drain_into(out);
            }
            Discipline::Splitting { tasks, locked } => {
                locked.clear();
                out.extend(tasks.drain(..).map(|(_, task)| task));
            }
        }
    }

    /// Attempts to insert `task`, dropping it silently on rejection — used
    /// by the non-blocking `Sink::offer` path, where a full queue means
    /// "no delivery at all" rather than "retry".
    fn try_accept(&mut self, target: Target, task: Task<R>) -> bool {
        match (self, target) {
            (Discipline::Unbounded(q), Target::Single) => {
                q.push_back(task);
                true
            }
            (Discipline::Bounded(rb), Target::Single) => rb.offer(task).is_none(),
            (Discipline::TwoLevel { internal, .. }, Target::Internal) => {
                internal.push_back(task);
                true
            }
            (Discipline::TwoLevel { external, .. }, Target::External) => external.offer(task).is_none(),
            (Discipline::Splitting { tasks, .. }, Target::Bucket(bucket)) => {
                tasks.push_back((bucket, task));
                true
            }
            _ => unreachable!("Sink target does not match the discipline it was bound to"),
        }
    }

    /// Like `try_accept`, but hands a rejected task back to the caller
    /// instead of dropping it — used by the blocking `Sink::put` path so it
    /// can wait and retry.
    fn try_accept_retryable(&mut self, target: Target, task: Task<R>) -> Option<Task<R>> {
        match (self, target) {
            (Discipline::Bounded(rb), Target::Single) => rb.offer(task),
            (Discipline::TwoLevel { external, .. }, Target::External) => external.offer(task),
            (discipline, target) => {
                let accepted = discipline.try_accept(target, task);
                debug_assert!(accepted, "unbounded/internal targets never reject");
                None
            }
        }
    }
}

struct Inner<R> {
    discipline: Discipline<R>,
    running: bool,
}

/// The engine behind every concrete queue type: one mutex, two condition
/// variables (`not_full` for blocked producers, `not_empty` for blocked
/// workers), and a `running` flag that is flipped exactly once by
/// [`QueueBase::terminate`].
pub struct QueueBase<R> {
    inner: Mutex<Inner<R>>,
    not_full: Condvar,
    not_empty: Condvar,
    poll_interval: Duration,
}

impl<R> QueueBase<R> {
    pub(crate) fn new(discipline: Discipline<R>, poll_interval: Duration) -> Self {
        QueueBase {
            inner: Mutex::new(Inner {
                discipline,
                running: true,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            poll_interval,
        }
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().expect("queue mutex poisoned").running
    }

    /// Non-blocking submission. Returns `true` if the task was accepted or
    /// if the queue was already terminated (in which case `terminated()`
    /// fires synchronously on the caller's thread); `false` if the queue is
    /// running but full, in which case the task is dropped with no callback
    /// invocation at all.
    pub(crate) fn offer(&self, target: Target, task: Task<R>) -> bool {
        let mut guard = self.inner.lock().expect("queue mutex poisoned");
        if !guard.running {
            drop(guard);
            task.terminate();
            return true;
        }
        let accepted = guard.discipline.try_accept(target, task);
        drop(guard);
        if accepted {
            self.not_empty.notify_one();
        }
        accepted
    }

    /// Blocking submission: waits on `not_full` until accepted or the queue
    /// terminates, in which case `terminated()` fires on the caller's
    /// thread. Uses a bounded `wait_timeout` loop rather than an unbounded
    /// wait so a `terminate()` broadcast is never required to land inside a
    /// narrow wakeup window.
    pub(crate) fn put(&self, target: Target, mut task: Task<R>) {
        let mut guard = self.inner.lock().expect("queue mutex poisoned");
        loop {
            if !guard.running {
                drop(guard);
                task.terminate();
                return;
            }
            match guard.discipline.try_accept_retryable(target, task) {
                None => {
                    drop(guard);
                    self.not_empty.notify_one();
                    return;
                }
                Some(rejected) => {
                    task = rejected;
                    let (g, _) = self
                        .not_full
                        .wait_timeout(guard, self.poll_interval)
                        .expect("queue mutex poisoned");
                    guard = g;
                }
            }
        }
    }

    /// Worker-side dequeue. Blocks on `not_empty` while the discipline is
    /// empty and the queue is still running; returns `None` once the queue
    /// has terminated and drained to empty.
    pub(crate) fn take_if_not_terminated(&self) -> Option<(Task<R>, PostRunToken)> {
        let mut guard = self.inner.lock().expect("queue mutex poisoned");
        loop {
            if guard.discipline.is_empty() {
                if !guard.running {
                    return None;
                }
                let (g, _) = self
                    .not_empty
                    .wait_timeout(guard, self.poll_interval)
                    .expect("queue mutex poisoned");
                guard = g;
                continue;
            }
            if let Some((task, token)) = guard.discipline.poll() {
                drop(guard);
                self.not_full.notify_one();
                return Some((task, token));
            }
        }
    }

    /// Reports a task's completion back to the discipline (Splitting:
    /// unlocks its bucket); wakes both condvars if doing so may have freed
    /// up work for a blocked producer or consumer.
    pub(crate) fn after_callback(&self, token: PostRunToken) {
        let mut guard = self.inner.lock().expect("queue mutex poisoned");
        let should_wake = guard.discipline.after_callback(token);
        drop(guard);
        if should_wake {
            self.not_full.notify_all();
            self.not_empty.notify_all();
        }
    }

    /// Snapshots every still-queued task (in discipline order) into `out`
    /// and empties the discipline. Used by `Service::close` to terminate
    /// orphan tasks after a timed-out graceful shutdown.
    pub(crate) fn drain_to(&self, out: &mut Vec<Task<R>>) {
        let mut guard = self.inner.lock().expect("queue mutex poisoned");
        guard.discipline.drain_into(out);
    }

    /// Flips `running` false and wakes every blocked producer and consumer.
    /// Idempotent: a second call is a harmless no-op broadcast.
    pub(crate) fn terminate(&self) {
        let mut guard = self.inner.lock().expect("queue mutex poisoned");
        guard.running = false;
        drop(guard);
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use taskloom_core::Callback;

    fn base_unbounded() -> QueueBase<u32> {
        QueueBase::new(Discipline::Unbounded(VecDeque::new()), Duration::from_millis(20))
    }

    #[test]
    fn offer_then_take_round_trips() {
        let q = base_unbounded();
        let seen = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&seen);
        let task = Task::new(
            || Ok(7u32),
            Callback::from_success(move |v| s.store(v as usize, Ordering::SeqCst)),
        );
        assert!(q.offer(Target::Single, task));
        let (task, token) = q.take_if_not_terminated().expect("task available");
        task.run();
        q.after_callback(token);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn terminate_unblocks_take_with_none() {
        let q = base_unbounded();
        q.terminate();
        assert!(q.take_if_not_terminated().is_none());
    }

    #[test]
    fn offer_after_terminate_delivers_terminated_and_returns_true() {
        let q = base_unbounded();
        q.terminate();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        let cb = Callback::of(None, None, Some(Box::new(move || {
            f.fetch_add(1, Ordering::SeqCst);
        })));
        let task = Task::new(|| Ok(1u32), cb);
        assert!(q.offer(Target::Single, task));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
