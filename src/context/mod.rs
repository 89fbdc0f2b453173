//! Serialized execution contexts
//!
//! An [`ExecutionContext`] is a single logical worker: everything posted to
//! it runs one item at a time, in posting order. Tasks, their completion
//! callbacks and their watchdogs all run on the context of the executor
//! that owns them.
//!
//! Two implementations are provided:
//!
//! - [`LooperThread`] - a dedicated OS thread draining a FIFO queue
//! - [`ManualLooper`] - a queue drained only when the caller asks, for
//!   deterministic tests
//!
//! # Example
//!
//! ```rust
//! use taskloop::context::{ExecutionContext, ManualLooper};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let looper = ManualLooper::new();
//! let hits = Arc::new(AtomicUsize::new(0));
//!
//! let counter = Arc::clone(&hits);
//! looper.post(Box::new(move || {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! }));
//!
//! assert_eq!(hits.load(Ordering::SeqCst), 0);
//! looper.run_until_idle();
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! ```

mod looper;
mod manual;

pub use looper::LooperThread;
pub use manual::ManualLooper;

/// A unit of work posted onto an execution context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A single-threaded, strictly ordered run loop.
pub trait ExecutionContext: Send + Sync {
    /// Enqueue a job for later execution.
    ///
    /// Returns `false` (and drops the job) if the context has quit.
    fn post(&self, job: Job) -> bool;

    /// Whether the context still accepts work.
    fn is_alive(&self) -> bool;

    /// Stop accepting work. Jobs already queued are discarded.
    fn quit(&self);
}
