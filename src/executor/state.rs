//! Executor lifecycle state.

use std::fmt;

/// The lifecycle state of an [`Executor`](super::Executor).
///
/// `Idle` is initial. A suite ends in `Done`, whether it ran to completion
/// or was cancelled; `Cancelled` is only observed between a
/// [`dispose`](super::Executor::dispose) and the in-flight task's final
/// callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExecutorState {
    /// Nothing has been executed yet.
    Idle,
    /// Tasks are executed one after the other.
    Running,
    /// The executor will stop after the current task.
    Pausing,
    /// Stopped between two tasks; waiting for `resume` or `execute_one_task`.
    Pending,
    /// The suite is over.
    Done,
    /// The suite was disposed; waiting for the current task to wind down.
    Cancelled,
}

impl ExecutorState {
    /// Returns true once the suite can no longer execute tasks.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutorState::Done | ExecutorState::Cancelled)
    }
}

impl fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorState::Idle => write!(f, "Idle"),
            ExecutorState::Running => write!(f, "Running"),
            ExecutorState::Pausing => write!(f, "Pausing"),
            ExecutorState::Pending => write!(f, "Pending"),
            ExecutorState::Done => write!(f, "Done"),
            ExecutorState::Cancelled => write!(f, "Cancelled"),
        }
    }
}
