//! Error definitions
//!
//! Control operations on an [`Executor`](crate::executor::Executor) report
//! rejections through [`Error`]. Broken internal invariants are not errors:
//! they panic.

use thiserror::Error;

use crate::executor::ExecutorState;

/// Main error type for taskloop
#[derive(Error, Debug)]
pub enum Error {
    /// The operation is not allowed in the executor's current state.
    #[error("`{operation}` is not allowed while the executor is {state}")]
    WrongState {
        /// Name of the rejected operation.
        operation: &'static str,
        /// State observed when the operation was rejected.
        state: ExecutorState,
    },

    /// There was no task to execute.
    #[error("No tasks to execute")]
    NoTasks,

    /// The execution context has quit and no longer accepts work.
    #[error("Execution context is closed")]
    ContextClosed,

    /// A worker or timer thread could not be started.
    #[error("Failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl Error {
    /// Create a wrong state error.
    #[must_use]
    pub fn wrong_state(operation: &'static str, state: ExecutorState) -> Self {
        Self::WrongState { operation, state }
    }

    /// Returns true if this is a [`Error::WrongState`] rejection.
    #[must_use]
    pub fn is_wrong_state(&self) -> bool {
        matches!(self, Self::WrongState { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
