//! Action queue and the worker that drains it.
//!
//! The listener pushes accepted events onto the [`ActionQueue`]; a single
//! [`ActionWorker`] task pops at most one per wait interval and performs the
//! boost.
//!
//! # Module Structure
//!
//! - [`queue`]: unbounded handoff buffer with a fixed FIFO or LIFO discipline
//! - [`worker`]: the paced consumer loop and reaction outcome handling

mod queue;
#[allow(clippy::module_inception)]
mod worker;

pub use queue::{ActionQueue, ParseQueueOrderError, QueueOrder};
pub use worker::{ActionWorker, ReactionOutcome};
