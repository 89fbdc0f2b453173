//! Task bodies and task listeners.

use std::fmt;

use super::{Task, Timeout};

/// The work performed by a [`Task`].
///
/// `execute` is called on the task's execution context each time the task
/// runs. A body finishes by calling [`Task::on_done`] or
/// [`Task::on_cancel`], either before returning or later from any thread.
/// Returning without finishing suspends the task in
/// [`TaskState::Pending`](super::TaskState::Pending) until it is run again
/// or finished externally.
///
/// # Example
///
/// ```rust
/// use taskloop::task::{Runnable, Task};
///
/// /// Finishes on the third run.
/// struct Poll3 {
///     runs: u32,
/// }
///
/// impl Runnable<u32> for Poll3 {
///     fn execute(&mut self, task: &Task<u32>) {
///         self.runs += 1;
///         if self.runs == 3 {
///             task.on_done(self.runs);
///         }
///     }
/// }
///
/// let task = Task::new("poll", Poll3 { runs: 0 });
/// assert!(task.can_run());
/// ```
pub trait Runnable<V>: Send + 'static {
    /// Performs (or continues) the task's work.
    fn execute(&mut self, task: &Task<V>);

    /// Called on the execution context when the task's watchdog fires.
    ///
    /// The default finishes the task with the watchdog's parameter.
    fn on_timeout(&mut self, task: &Task<V>, timeout: Timeout<V>)
    where
        V: Send + 'static,
    {
        task.on_done(timeout.into_param());
    }

    /// Releases the body's resources once the task is finished, done or
    /// cancelled.
    ///
    /// Runs exactly once, after the watchdog is disarmed and before the
    /// listener hears about the outcome. A task finished from inside
    /// `execute` or `on_timeout` runs this when that call returns.
    fn after(&mut self, _task: &Task<V>) {}
}

/// A [`Runnable`] built from a closure. Created by [`Task::from_fn`].
pub struct FnRunnable<F> {
    f: F,
}

impl<F> FnRunnable<F> {
    pub(crate) fn new(f: F) -> Self {
        Self { f }
    }
}

impl<V, F> Runnable<V> for FnRunnable<F>
where
    F: FnMut(&Task<V>) + Send + 'static,
{
    fn execute(&mut self, task: &Task<V>) {
        (self.f)(task);
    }
}

impl<F> fmt::Debug for FnRunnable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRunnable").finish_non_exhaustive()
    }
}

/// Receives a task's final outcome.
///
/// An [`Executor`](crate::executor::Executor) is the listener of every task
/// added to it. Both callbacks are delivered on the task's execution
/// context.
pub trait TaskListener<V>: Send + Sync {
    /// The task finished with `result`.
    fn on_done(&self, task: &Task<V>, result: V);

    /// The task finished by cancelling the whole suite.
    fn on_cancel(&self, task: &Task<V>, result: Option<V>);
}
