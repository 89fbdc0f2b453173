//! # taskloop
//!
//! > A cooperative, resumable, single-worker task scheduler
//!
//! **taskloop** runs an ordered queue of tasks one at a time on a dedicated
//! execution context. A task may suspend mid-execution while it waits for
//! an external event (a hardware callback, a timer) and be resumed,
//! finished or cancelled later. The whole queue can be paused, stepped and
//! resumed between tasks.
//!
//! ## Quick Start
//!
//! ```rust
//! use taskloop::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let recorder = Arc::new(RecordingListener::<&'static str>::new());
//! let executor: Executor<&'static str> = Executor::with_listener(recorder.clone()).unwrap();
//!
//! executor.add(Task::from_fn("greet", |task: &Task<&'static str>| task.on_done("hello")));
//! executor.execute().unwrap();
//!
//! assert!(recorder.wait_for(Duration::from_secs(5), |event| *event == Event::Done));
//! executor.dispose();
//! ```
//!
//! ## Features
//!
//! - **Resumable tasks** - return from `execute` to suspend, finish later
//!   from any thread
//! - **Suite control** - pause, step one task, resume, dispose
//! - **Watchdogs** - force a suspended task to finish after a delay
//! - **Deterministic testing** - [`ManualLooper`](context::ManualLooper)
//!   and [`MockClock`](clock::MockClock) run everything on the test thread

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Mock clock for time control in tests
pub mod clock;

pub mod context;
pub mod error;
pub mod executor;
pub mod mock;
pub mod task;
pub mod timer;

/// Prelude for convenient imports
///
/// ```rust
/// use taskloop::prelude::*;
/// ```
pub mod prelude {
    pub use crate::clock::MockClock;
    pub use crate::context::{ExecutionContext, LooperThread, ManualLooper};
    pub use crate::error::{Error, Result};
    pub use crate::executor::{Executor, ExecutorConfig, ExecutorListener, ExecutorState};
    pub use crate::mock::{Event, RecordingListener};
    pub use crate::task::{Runnable, Task, TaskId, TaskListener, TaskState, Timeout};
    pub use crate::timer::{Timer, TimerThread};
}

// Re-exports
pub use error::{Error, Result};
