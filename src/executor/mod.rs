//! Sequential execution of resumable tasks
//!
//! An [`Executor`] owns a queue of [`Task`](crate::task::Task)s and runs
//! them one at a time on its execution context. The suite can be paused
//! between tasks, stepped one task at a time, resumed and disposed:
//!
//! | From | Call or event | To |
//! |---|---|---|
//! | `Idle` | `execute` / `execute_and_pause` | `Running` / `Pausing` |
//! | `Running` | `pause` | `Pausing` |
//! | `Pausing` | `resume` | `Running` |
//! | `Pausing` | task finished | `Pending` |
//! | `Pending` | `resume` / `execute_one_task` | `Running` / `Pausing` |
//! | `Running` | last task finished | `Done` |
//!
//! [`dispose`](Executor::dispose) moves any state to `Cancelled`, which
//! settles into `Done` once the in-flight task has wound down.
//!
//! # Example
//!
//! ```rust
//! use taskloop::clock::MockClock;
//! use taskloop::context::ManualLooper;
//! use taskloop::executor::{Executor, ExecutorState};
//! use taskloop::mock::RecordingListener;
//! use taskloop::task::Task;
//! use std::sync::Arc;
//!
//! let looper = Arc::new(ManualLooper::new());
//! let executor: Executor<u32> = Executor::new(looper.clone(), Arc::new(MockClock::new()));
//! let recorder = Arc::new(RecordingListener::new());
//! executor.set_listener(recorder.clone());
//!
//! executor.add(Task::from_fn("A", |task: &Task<u32>| task.on_done(1)));
//! executor.add(Task::from_fn("B", |task: &Task<u32>| task.on_done(2)));
//!
//! // Stop after the first task.
//! executor.execute_and_pause().unwrap();
//! looper.run_until_idle();
//! assert_eq!(executor.state(), ExecutorState::Pending);
//!
//! executor.resume().unwrap();
//! looper.run_until_idle();
//! assert_eq!(
//!     recorder.trace(),
//!     vec!["before(A)", "after(A, Some(1))", "paused", "before(B)", "after(B, Some(2))", "done"]
//! );
//! ```

mod config;
mod listener;
mod service;
mod state;

pub use config::{ExecutorConfig, DEFAULT_THREAD_NAME};
pub use listener::ExecutorListener;
pub use service::Executor;
pub use state::ExecutorState;
