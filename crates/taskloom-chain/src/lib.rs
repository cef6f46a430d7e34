//! # taskloom-chain
//!
//! A builder that threads a value through a sequence of callback-based
//! steps, each step taking its input and a [`Callback`] for its own
//! output type. Unlike [`taskloom::Service`], this does not run steps on
//! a worker pool — it only sequences their callbacks. A step is free to
//! hand its callback off to a `taskloom` [`Sink`](taskloom_core) or to
//! any other async mechanism; `AsyncChain` just wires what happens next.
//!
//! Every chain carries a pair of default handlers (from
//! [`AsyncChain::with_defaults`]) used by any step that doesn't supply
//! its own via [`AsyncChain::call_with`]. A subtlety worth calling out:
//! if invoking step *k* panics synchronously — before step *k* has had a
//! chance to touch its own callback — the panic is reported through step
//! *(k-1)*'s effective failure handler, not step *k*'s own. That call
//! happens lexically inside step *(k-1)*'s success continuation, which is
//! the only handler in scope at that point; see [`AsyncChain::call`].

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use taskloom_core::{computation_error, Callback, ComputationError};

/// Either "use the chain's default handler" or "use this one instead",
/// supplied per step via [`AsyncChain::call_with`]. Rust has no
/// null-equivalent for an arbitrary closure, so this stands in for one.
pub enum Override<F> {
    /// Fall back to the chain's default handler for this signal.
    Default,
    /// Use this handler instead of the chain's default, for this step only.
    Use(F),
}

type FailureHandler = Arc<dyn Fn(ComputationError) + Send + Sync>;
type TerminationHandler = Arc<dyn Fn() + Send + Sync>;

/// A builder that accumulates steps producing successive values of type
/// `T`. Construct one with [`AsyncChain::with_defaults`], extend it with
/// [`AsyncChain::call`] / [`AsyncChain::call_with`] / [`AsyncChain::call_and_discard`],
/// and run it with [`AsyncChain::execute`].
pub struct AsyncChain<T> {
    run: Box<dyn FnOnce(Callback<T>) + Send>,
    prev_on_failure: FailureHandler,
    prev_on_termination: TerminationHandler,
    default_on_failure: FailureHandler,
    default_on_termination: TerminationHandler,
}

impl AsyncChain<()> {
    /// Starts an empty chain. `on_failure`/`on_termination` become the
    /// fallback for every step added with [`AsyncChain::call`], and the
    /// attribution target for a panic while invoking the very first step.
    ///
    /// Calling [`AsyncChain::execute`] on a chain with no steps added
    /// delivers `()` to `execute`'s `on_success` immediately; neither
    /// default handler is touched.
    pub fn with_defaults<F, G>(on_failure: F, on_termination: G) -> Self
    where
        F: Fn(ComputationError) + Send + Sync + 'static,
        G: Fn() + Send + Sync + 'static,
    {
        let on_failure: FailureHandler = Arc::new(on_failure);
        let on_termination: TerminationHandler = Arc::new(on_termination);
        AsyncChain {
            run: Box::new(|final_cb: Callback<()>| final_cb.success(())),
            prev_on_failure: Arc::clone(&on_failure),
            prev_on_termination: Arc::clone(&on_termination),
            default_on_failure: on_failure,
            default_on_termination: on_termination,
        }
    }
}

impl<T: Send + 'static> AsyncChain<T> {
    /// Appends a step using the chain's default failure/termination
    /// handlers.
    pub fn call<U, F>(self, step: F) -> AsyncChain<U>
    where
        F: FnOnce(T, Callback<U>) + Send + 'static,
        U: Send + 'static,
    {
        let on_failure = Arc::clone(&self.default_on_failure);
        let on_termination = Arc::clone(&self.default_on_termination);
        self.append(step, on_failure, on_termination)
    }

    /// Appends a step, optionally overriding its own failure and/or
    /// termination handling for this step alone. [`Override::Default`]
    /// falls back to the chain's defaults.
    pub fn call_with<U, F, OnFail, OnTerm>(
        self,
        step: F,
        on_failure: Override<OnFail>,
        on_termination: Override<OnTerm>,
    ) -> AsyncChain<U>
    where
        F: FnOnce(T, Callback<U>) + Send + 'static,
        OnFail: Fn(ComputationError) + Send + Sync + 'static,
        OnTerm: Fn() + Send + Sync + 'static,
        U: Send + 'static,
    {
        let on_failure: FailureHandler = match on_failure {
            Override::Default => Arc::clone(&self.default_on_failure),
            Override::Use(f) => Arc::new(f),
        };
        let on_termination: TerminationHandler = match on_termination {
            Override::Default => Arc::clone(&self.default_on_termination),
            Override::Use(g) => Arc::new(g),
        };
        self.append(step, on_failure, on_termination)
    }

    /// Appends a step whose own output is discarded — the chain's value
    /// stays `T`, unchanged, for whichever step comes next. Useful for a
    /// step run purely for a side effect (a log write, a metrics ping).
    pub fn call_and_discard<U, F>(self, step: F) -> AsyncChain<T>
    where
        F: FnOnce(T, Callback<U>) + Send + 'static,
        T: Clone,
        U: Send + 'static,
    {
        let wrapped = move |input: T, outer: Callback<T>| {
            let passthrough = input.clone();
            let outer = Arc::new(outer);
            let o_success = Arc::clone(&outer);
            let o_failure = Arc::clone(&outer);
            let o_terminated = outer;
            let inner = Callback::of(
                Some(Box::new(move |_ignored: U| o_success.success(passthrough)) as _),
                Some(Box::new(move |e| o_failure.failure(e)) as _),
                Some(Box::new(move || o_terminated.terminated()) as _),
            );
            step(input, inner);
        };
        self.call(wrapped)
    }

    /// Runs the chain. The last step's success value reaches `on_success`;
    /// every failure or termination signal was already routed to its
    /// owning step's effective handler at the time that step was appended.
    pub fn execute<F>(self, on_success: F)
    where
        F: FnOnce(T) + Send + 'static,
    {
        (self.run)(Callback::from_success(on_success));
    }

    fn append<U, F>(self, step: F, this_on_failure: FailureHandler, this_on_termination: TerminationHandler) -> AsyncChain<U>
    where
        F: FnOnce(T, Callback<U>) + Send + 'static,
        U: Send + 'static,
    {
        let AsyncChain {
            run: prev_run,
            prev_on_failure,
            default_on_failure,
            default_on_termination,
            ..
        } = self;

        // A panic invoking `step` is attributed to the *caller's* handler
        // (the step that's still on the stack, inside whose success
        // continuation this call happens) — not to `step`'s own, which
        // hasn't had a chance to exist yet at the point of the panic.
        let panic_handler = Arc::clone(&prev_on_failure);

        let step_on_failure = Arc::clone(&this_on_failure);
        let step_on_termination = Arc::clone(&this_on_termination);

        let new_run: Box<dyn FnOnce(Callback<U>) + Send> = Box::new(move |final_cb: Callback<U>| {
            let success_continuation = move |input: T| {
                let step_callback = Callback::of(
                    Some(Box::new(move |v: U| final_cb.success(v)) as _),
                    Some(Box::new(move |e| step_on_failure(e)) as _),
                    Some(Box::new(move || step_on_termination()) as _),
                );
                let outcome = catch_unwind(AssertUnwindSafe(|| step(input, step_callback)));
                if let Err(panic) = outcome {
                    panic_handler(computation_error(panic_message(&panic)));
                }
            };
            prev_run(Callback::from_success(success_continuation));
        });

        AsyncChain {
            run: new_run,
            prev_on_failure: this_on_failure,
            prev_on_termination: this_on_termination,
            default_on_failure,
            default_on_termination,
        }
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "chain step panicked with a non-string payload".to_string()
    }
}
