//! Error taxonomy for taskloom.
//!
//! `TaskError` covers construction-time validation and shutdown-time
//! failures (see §7 of the design spec). Computation failures are
//! never folded into this type — they are caller-defined and travel
//! through [`crate::Callback::failure`] as a boxed `dyn Error`.

use std::fmt;

/// Errors surfaced by taskloom's construction and shutdown paths.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// A constructor argument failed validation.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Human-readable description of what failed validation.
        reason: String,
    },

    /// `WorkerPool::close` (and transitively `Service::close`) exceeded
    /// its termination timeout before every worker deregistered.
    #[error("close timed out after {elapsed_ms}ms waiting for workers to stop")]
    CloseTimedOut {
        /// Milliseconds actually waited before giving up.
        elapsed_ms: u64,
    },

    /// The `on_terminate` hook supplied to the pool returned an error
    /// during a graceful close. The graceful path is abandoned; the
    /// pool is force-terminated.
    #[error("on_terminate hook failed during close: {0}")]
    TerminateHookFailed(Box<dyn std::error::Error + Send + Sync>),

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    SpawnFailed(#[source] std::io::Error),
}

impl TaskError {
    /// Convenience constructor for [`TaskError::Invalid`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        TaskError::Invalid {
            reason: reason.into(),
        }
    }
}

/// A boxed, caller-defined computation error, opaque to taskloom.
///
/// This is the payload type of [`crate::Callback::failure`]. Keeping it
/// a trait object (rather than a generic error parameter threaded
/// through every queue discipline) means `Task<R>` only needs to be
/// generic over its success type `R`.
pub type ComputationError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Wraps any `Display`-only payload as a [`ComputationError`] — used by
/// tests and simple callers whose computation errors are plain strings.
pub fn computation_error(msg: impl fmt::Display) -> ComputationError {
    #[derive(Debug)]
    struct Simple(String);
    impl fmt::Display for Simple {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }
    impl std::error::Error for Simple {}
    Box::new(Simple(msg.to_string()))
}
