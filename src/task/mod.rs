//! Resumable units of work
//!
//! A [`Task`] wraps a [`Runnable`] body and tracks its lifecycle:
//!
//! ```text
//!        run            return without finishing
//! Idle ───────► Running ─────────────────────────► Pending
//!                  │  ▲                               │
//!                  │  └──────────── run ──────────────┘
//!                  │ on_done / on_cancel
//!                  ▼
//!                 Done ◄──── on_cancel ──── Cancelled
//! ```
//!
//! A body that has to wait for something (a hardware callback, a timer)
//! simply returns from [`Runnable::execute`]; the task becomes
//! [`TaskState::Pending`] and is finished later by whoever holds a clone of
//! it. An optional watchdog forces completion after a delay.
//!
//! # Example
//!
//! ```rust
//! use taskloop::context::{ExecutionContext, ManualLooper};
//! use taskloop::task::{Task, TaskState};
//! use std::sync::Arc;
//!
//! let looper: Arc<dyn ExecutionContext> = Arc::new(ManualLooper::new());
//!
//! // Finishes on the second run.
//! let task = Task::from_fn("two-step", |task: &Task<u8>| {
//!     if !task.is_first_execution() {
//!         task.on_done(2);
//!     }
//! });
//!
//! task.run(&looper);
//! assert_eq!(task.state(), TaskState::Pending);
//!
//! task.run(&looper);
//! assert_eq!(task.state(), TaskState::Done);
//! ```

mod handle;
mod runnable;
mod state;
mod watchdog;

pub use handle::Task;
pub use runnable::{FnRunnable, Runnable, TaskListener};
pub use state::{TaskId, TaskState};
pub use watchdog::Timeout;
