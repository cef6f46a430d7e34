//! Three-way result sink: success / failure / termination.

use std::sync::{Arc, Mutex};

use crate::error::ComputationError;

type SuccessFn<R> = Box<dyn FnOnce(R) + Send>;
type FailureFn = Box<dyn FnOnce(ComputationError) + Send>;
type TerminationFn = Box<dyn FnOnce() + Send>;

struct Handlers<R> {
    on_success: Option<SuccessFn<R>>,
    on_failure: Option<FailureFn>,
    on_termination: Option<TerminationFn>,
}

/// A capability with three mutually exclusive terminal operations.
///
/// For any task, at most one of [`Callback::success`], [`Callback::failure`],
/// [`Callback::terminated`] is ever invoked — enforced here by taking the
/// handler set out of its `Mutex` on first use, so a second call against the
/// same instance is a silent no-op rather than a double delivery. Tolerates
/// invocation from any thread: the producer that offered the task, the
/// worker that ran it, or the thread driving a pool shutdown.
pub struct Callback<R> {
    handlers: Mutex<Option<Handlers<R>>>,
}

impl<R> Callback<R> {
    /// Builds a callback from up to three handlers. Any handler left `None`
    /// is a silent no-op when its corresponding signal fires.
    pub fn of(
        on_success: Option<SuccessFn<R>>,
        on_failure: Option<FailureFn>,
        on_termination: Option<TerminationFn>,
    ) -> Self {
        Callback {
            handlers: Mutex::new(Some(Handlers {
                on_success,
                on_failure,
                on_termination,
            })),
        }
    }

    /// A callback with no handlers at all — every signal is a no-op.
    pub fn noop() -> Self {
        Callback::of(None, None, None)
    }

    /// Builds a callback from a single success handler; failure and
    /// termination are no-ops.
    pub fn from_success<F>(f: F) -> Self
    where
        F: FnOnce(R) + Send + 'static,
    {
        Callback::of(Some(Box::new(f)), None, None)
    }

    fn take(&self) -> Option<Handlers<R>> {
        self.handlers.lock().unwrap().take()
    }

    /// Deliver a successful result. No-op if this callback already fired.
    pub fn success(&self, value: R) {
        if let Some(h) = self.take() {
            if let Some(f) = h.on_success {
                f(value);
            }
        }
    }

    /// Deliver a computation failure. No-op if this callback already fired.
    pub fn failure(&self, err: ComputationError) {
        if let Some(h) = self.take() {
            if let Some(f) = h.on_failure {
                f(err);
            }
        }
    }

    /// Deliver a termination notice (the service shut down before this task
    /// ran). No-op if this callback already fired.
    pub fn terminated(&self) {
        if let Some(h) = self.take() {
            if let Some(f) = h.on_termination {
                f();
            }
        }
    }
}

impl<R: Send + 'static> Callback<R> {
    /// Returns a new callback that routes `success` to `f` (or drops it
    /// silently if `f` is `None`) while delegating `failure` and
    /// `terminated` to this callback.
    ///
    /// `self` is moved behind an `Arc` so the two delegating closures can
    /// share it; exactly one of the three signals on the *new* callback
    /// ever fires, so at most one of `f` / `self.failure` / `self.terminated`
    /// is invoked.
    pub fn override_success<F>(self, f: Option<F>) -> Callback<R>
    where
        F: FnOnce(R) + Send + 'static,
    {
        let original = Arc::new(self);
        let for_failure = Arc::clone(&original);
        let for_termination = Arc::clone(&original);

        Callback::of(
            f.map(|f| Box::new(f) as SuccessFn<R>),
            Some(Box::new(move |e| for_failure.failure(e)) as FailureFn),
            Some(Box::new(move || for_termination.terminated()) as TerminationFn),
        )
    }
}
