//! Fixed-size worker pool with a phased startup/shutdown rendezvous.

use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use taskloom_core::TaskError;

use crate::threading::Threading;

/// The abstracted "spawn a named thread" collaborator. Production code uses
/// [`StdThreadSpawner`]; tests can substitute an inline/synchronous spawner
/// that runs the closure on the calling thread instead of a new OS thread,
/// to make pool behavior deterministic under test.
pub trait ThreadSpawner: Send + Sync {
    fn spawn(&self, name: String, body: Box<dyn FnOnce() + Send>) -> io::Result<JoinHandle<()>>;
}

/// Spawns genuine `std::thread`s.
pub struct StdThreadSpawner;

impl ThreadSpawner for StdThreadSpawner {
    fn spawn(&self, name: String, body: Box<dyn FnOnce() + Send>) -> io::Result<JoinHandle<()>> {
        thread::Builder::new().name(name).spawn(body)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Phase {
    Starting,
    Running,
    Closing,
    Terminated,
}

struct State {
    phase: Phase,
    /// Parties that have arrived at the current gate. During `Starting`
    /// this counts toward `total_parties` (N workers + the controller);
    /// once `Running` is reached it is repurposed to count down the N
    /// workers still executing, reaching 0 when every worker has arrived
    /// at the shutdown gate and exited.
    count: usize,
}

struct Shared {
    state: Mutex<State>,
    cond: Condvar,
    total_parties: usize,
}

/// A fixed-size pool of worker threads running a shared loop body, with a
/// startup rendezvous (every worker has entered its loop before
/// [`WorkerPool::new`] returns) and a graceful, timed close.
///
/// `close` is not safe to call concurrently from two threads — the caller
/// guarantees a single closer, as documented on [`crate::Service::close`].
pub struct WorkerPool {
    shared: Arc<Shared>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawns `threading.thread_count()` workers, each repeatedly invoking
    /// `body` until it returns `false` (meaning: nothing left to do, and
    /// the work source has shut down), then calls `on_terminate` exactly
    /// once when [`WorkerPool::close`] is invoked.
    ///
    /// Blocks until every worker has run its `on_thread_start` hook and
    /// arrived at the startup gate. If any thread fails to spawn, already
    /// -spawned workers are released (they see the pool jump straight to
    /// `Terminated` and exit without running `body` at all) and the spawn
    /// error is returned.
    pub fn new<B>(threading: &Threading, body: B) -> Result<Self, TaskError>
    where
        B: Fn() -> bool + Send + Sync + 'static,
    {
        Self::with_spawner(threading, body, &StdThreadSpawner)
    }

    pub fn with_spawner<B>(
        threading: &Threading,
        body: B,
        spawner: &dyn ThreadSpawner,
    ) -> Result<Self, TaskError> {
        Self::build(threading, Arc::new(body), spawner)
    }

    fn build(
        threading: &Threading,
        body: Arc<dyn Fn() -> bool + Send + Sync>,
        spawner: &dyn ThreadSpawner,
    ) -> Result<Self, TaskError>
    where
    {
        threading.validate()?;
        let n = threading.thread_count().get();
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                phase: Phase::Starting,
                count: 0,
            }),
            cond: Condvar::new(),
            total_parties: n + 1,
        });

        let mut handles = Vec::with_capacity(n);
        for i in 0..n {
            let shared = Arc::clone(&shared);
            let body = Arc::clone(&body);
            let hook = threading.on_thread_start();
            let name = threading.thread_name(i);
            let spawned = spawner.spawn(
                name,
                Box::new(move || worker_main(i, shared, body, hook)),
            );
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // Force-terminate: release any already-spawned workers
                    // waiting at the startup gate without running `body`.
                    {
                        let mut g = shared.state.lock().expect("pool mutex poisoned");
                        g.phase = Phase::Terminated;
                    }
                    shared.cond.notify_all();
                    for h in handles {
                        let _ = h.join();
                    }
                    return Err(TaskError::SpawnFailed(e));
                }
            }
        }

        // The controller is the (n+1)-th party at the startup gate.
        let mut g = shared.state.lock().expect("pool mutex poisoned");
        g.count += 1;
        if g.count == shared.total_parties {
            g.phase = Phase::Running;
            g.count = n; // repurposed: counts down workers still running
            shared.cond.notify_all();
        } else {
            while g.phase == Phase::Starting {
                g = shared.cond.wait(g).expect("pool mutex poisoned");
            }
        }
        drop(g);

        tracing::info!(thread_count = n, "worker pool started");

        Ok(WorkerPool {
            shared,
            handles: Mutex::new(handles),
        })
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().expect("pool mutex poisoned").phase == Phase::Running
    }

    /// Gracefully winds the pool down: marks it `Closing`, runs
    /// `on_terminate` once, then waits (up to `timeout`, if given) for
    /// every worker to finish its current iteration and exit.
    ///
    /// A no-op if the pool is not currently `Running` (already closing or
    /// closed). Returns [`TaskError::TerminateHookFailed`] if `on_terminate`
    /// itself errors (the graceful wait is abandoned), or
    /// [`TaskError::CloseTimedOut`] if workers have not all exited by the
    /// deadline.
    pub fn close<F>(&self, timeout: Option<Duration>, on_terminate: F) -> Result<(), TaskError>
    where
        F: FnOnce() -> Result<(), taskloom_core::ComputationError>,
    {
        {
            let mut g = self.shared.state.lock().expect("pool mutex poisoned");
            if g.phase != Phase::Running {
                return Ok(());
            }
            g.phase = Phase::Closing;
        }
        tracing::info!("worker pool closing, entering grace period");

        if let Err(e) = on_terminate() {
            let mut g = self.shared.state.lock().expect("pool mutex poisoned");
            g.phase = Phase::Terminated;
            drop(g);
            self.shared.cond.notify_all();
            tracing::error!(error = %e, "on_terminate hook failed during close");
            return Err(TaskError::TerminateHookFailed(e));
        }

        let deadline = timeout.map(|d| Instant::now() + d);
        let mut g = self.shared.state.lock().expect("pool mutex poisoned");
        while g.count > 0 {
            match deadline {
                None => {
                    g = self.shared.cond.wait(g).expect("pool mutex poisoned");
                }
                Some(dl) => {
                    let remaining = dl.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        let elapsed_ms = timeout.expect("deadline implies timeout").as_millis() as u64;
                        tracing::warn!(elapsed_ms, "close timed out waiting for workers");
                        return Err(TaskError::CloseTimedOut { elapsed_ms });
                    }
                    let (g2, result) = self
                        .shared
                        .cond
                        .wait_timeout(g, remaining)
                        .expect("pool mutex poisoned");
                    g = g2;
                    if result.timed_out() && g.count > 0 {
                        let elapsed_ms = timeout.expect("deadline implies timeout").as_millis() as u64;
                        tracing::warn!(elapsed_ms, "close timed out waiting for workers");
                        return Err(TaskError::CloseTimedOut { elapsed_ms });
                    }
                }
            }
        }
        g.phase = Phase::Terminated;
        drop(g);

        for h in self.handles.lock().expect("pool mutex poisoned").drain(..) {
            let _ = h.join();
        }
        tracing::info!("worker pool terminated");
        Ok(())
    }
}

fn worker_main(
    index: usize,
    shared: Arc<Shared>,
    body: Arc<dyn Fn() -> bool + Send + Sync>,
    on_thread_start: Option<Arc<dyn Fn(usize) + Send + Sync>>,
) {
    if let Some(hook) = on_thread_start {
        hook(index);
    }

    {
        let mut g = shared.state.lock().expect("pool mutex poisoned");
        g.count += 1;
        if g.count == shared.total_parties {
            g.phase = Phase::Running;
            g.count = shared.total_parties - 1;
            shared.cond.notify_all();
        } else {
            while g.phase == Phase::Starting {
                g = shared.cond.wait(g).expect("pool mutex poisoned");
            }
        }
        if g.phase == Phase::Terminated {
            // Force-terminated before this worker ever ran: exit silently,
            // without deregistering (the controller already gave up on us).
            return;
        }
    }

    loop {
        if shared.state.lock().expect("pool mutex poisoned").phase == Phase::Terminated {
            // Force-terminated (on_terminate failure, or a sibling worker's
            // spawn failed): stop regardless of what `body` would return.
            // Bounded by `body`'s own internal wait granularity, so this is
            // observed within one polling interval even mid-iteration.
            return;
        }
        let should_continue = match catch_unwind(AssertUnwindSafe(|| body())) {
            Ok(should_continue) => should_continue,
            Err(panic) => {
                tracing::error!(worker = index, "worker body panicked: {}", panic_message(&panic));
                true
            }
        };
        if !should_continue {
            break;
        }
    }

    let mut g = shared.state.lock().expect("pool mutex poisoned");
    g.count -= 1;
    drop(g);
    shared.cond.notify_all();
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked with a non-string payload".to_string()
    }
}
