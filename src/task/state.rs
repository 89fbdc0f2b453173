//! Task identity and lifecycle state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Creates a new unique task ID.
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task({})", self.0)
    }
}

/// The lifecycle state of a task.
///
/// `Idle` is initial and `Done` is terminal. `Cancelled` is reachable from
/// `Idle`, `Pending` and `Running`, and becomes `Done` once the task
/// finalizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Task has not been started yet.
    Idle,
    /// Task body is executing.
    Running,
    /// Task returned from its body without finishing and awaits continuation.
    Pending,
    /// Task has finished and notified its listener.
    Done,
    /// Cancellation was requested but the task has not finalized yet.
    Cancelled,
}

impl TaskState {
    /// Returns true if a task in this state may be run.
    #[must_use]
    pub fn can_run(self) -> bool {
        matches!(self, TaskState::Idle | TaskState::Pending)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Idle => write!(f, "Idle"),
            TaskState::Running => write!(f, "Running"),
            TaskState::Pending => write!(f, "Pending"),
            TaskState::Done => write!(f, "Done"),
            TaskState::Cancelled => write!(f, "Cancelled"),
        }
    }
}
