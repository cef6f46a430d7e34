//! # taskloom-core
//!
//! Core types and traits for the taskloom task-execution service.
//!
//! This crate is platform-agnostic: it has no threads, no sockets, no
//! clocks. It defines the vocabulary shared by every concrete queue
//! discipline and by the worker pool in `taskloom`:
//!
//! - [`Callback`] — the three-way result sink (`success` / `failure` /
//!   `terminated`) that every task reports through exactly once.
//! - [`Task`] — a (computation, callback) pair with an atomic one-shot
//!   completion flag.
//! - [`RingBuffer`] — a power-of-two-capacity, non-synchronized bounded
//!   FIFO used by the `Bounded` and `TwoLevel` queue disciplines.
//! - [`TaskError`] — the typed error taxonomy surfaced by construction
//!   and shutdown paths.

mod callback;
mod error;
mod ring_buffer;
mod task;

pub use callback::Callback;
pub use error::{computation_error, ComputationError, TaskError};
pub use ring_buffer::RingBuffer;
pub use task::Task;
