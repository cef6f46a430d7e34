//! Task queues: one shared lock-and-condvar engine ([`base::QueueBase`])
//! behind four concrete disciplines.

mod base;
mod bounded;
mod sink;
mod splitting;
mod two_level;
mod unbounded;

pub use base::QueueBase;
pub use bounded::BoundedQueue;
pub use sink::Sink;
pub use splitting::SplittingQueue;
pub use two_level::TwoLevelQueue;
pub use unbounded::UnboundedQueue;
