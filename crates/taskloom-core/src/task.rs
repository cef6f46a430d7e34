//! A (computation, callback) pair with an atomic one-shot completion flag.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::callback::Callback;
use crate::error::{computation_error, ComputationError};

/// Pairs a computation with the [`Callback`] that receives its outcome.
///
/// `completed` is a one-shot flag: it advances false → true exactly once,
/// via compare-and-swap, whichever of [`Task::run`] or [`Task::terminate`]
/// gets there first. Whoever wins the CAS owns delivering the terminal
/// signal; the loser does nothing. This is what makes "exactly one of
/// success/failure/terminated fires" hold even when a task is concurrently
/// drained by a shutdown path while a worker is mid-dequeue of it.
pub struct Task<R> {
    computation: Box<dyn FnOnce() -> Result<R, ComputationError> + Send>,
    callback: Callback<R>,
    completed: AtomicBool,
}

impl<R> Task<R> {
    /// Wraps a computation and its callback into a new, not-yet-run task.
    pub fn new<F>(computation: F, callback: Callback<R>) -> Self
    where
        F: FnOnce() -> Result<R, ComputationError> + Send + 'static,
    {
        Task {
            computation: Box::new(computation),
            callback,
            completed: AtomicBool::new(false),
        }
    }

    /// Runs the computation and delivers exactly one terminal signal,
    /// unless the task was already terminated first (in which case this
    /// is a no-op with respect to the callback — the flag was already
    /// advanced by [`Task::terminate`]).
    ///
    /// A panic inside the computation is caught and reported as a
    /// `failure`, consistent with the rule that user-code errors never
    /// propagate out of a worker iteration.
    pub fn run(self) {
        let Task {
            computation,
            callback,
            completed,
        } = self;

        let outcome = catch_unwind(AssertUnwindSafe(computation));
        if completed.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            // Already terminated by a concurrent shutdown drain.
            return;
        }

        match outcome {
            Ok(Ok(value)) => callback.success(value),
            Ok(Err(err)) => callback.failure(err),
            Err(panic) => callback.failure(computation_error(panic_message(&panic))),
        }
    }

    /// Marks the task as completed without running it, delivering
    /// `terminated()` if this call wins the race with [`Task::run`].
    pub fn terminate(self) {
        if self
            .completed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.callback.terminated();
        }
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn run_delivers_success() {
        let got = Arc::new(AtomicUsize::new(0));
        let g = Arc::clone(&got);
        let cb = Callback::from_success(move |v: u32| {
            g.store(v as usize, Ordering::SeqCst);
        });
        let task = Task::new(|| Ok(42u32), cb);
        task.run();
        assert_eq!(got.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn run_delivers_failure_for_returned_error() {
        let saw_failure = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&saw_failure);
        let cb: Callback<u32> = Callback::of(
            Some(Box::new(|_| panic!("should not succeed"))),
            Some(Box::new(move |_| {
                s.fetch_add(1, Ordering::SeqCst);
            })),
            None,
        );
        let task = Task::new(|| Err(computation_error("boom")), cb);
        task.run();
        assert_eq!(saw_failure.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn run_catches_panics_as_failure() {
        let saw_failure = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&saw_failure);
        let cb: Callback<u32> = Callback::of(
            None,
            Some(Box::new(move |_| {
                s.fetch_add(1, Ordering::SeqCst);
            })),
            None,
        );
        let task: Task<u32> = Task::new(|| panic!("kaboom"), cb);
        task.run();
        assert_eq!(saw_failure.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn terminate_delivers_terminated() {
        let saw_term = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&saw_term);
        let cb: Callback<u32> = Callback::of(
            None,
            None,
            Some(Box::new(move || {
                s.fetch_add(1, Ordering::SeqCst);
            })),
        );
        let task = Task::new(|| Ok(1u32), cb);
        task.terminate();
        assert_eq!(saw_term.load(Ordering::SeqCst), 1);
    }
}
