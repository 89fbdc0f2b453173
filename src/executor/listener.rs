use crate::task::Task;

/// Observes the progress of an executor's suite.
///
/// Every method defaults to doing nothing. Notifications are delivered in
/// order, one at a time, while the executor is locked; a listener may call
/// back into the executor (for instance `resume()` from
/// [`on_paused`](ExecutorListener::on_paused)).
///
/// # Example
///
/// ```rust
/// use taskloop::executor::ExecutorListener;
/// use taskloop::task::Task;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct Progress {
///     finished: AtomicUsize,
/// }
///
/// impl ExecutorListener<u8> for Progress {
///     fn after_task(&self, _task: &Task<u8>, _result: Option<u8>) {
///         self.finished.fetch_add(1, Ordering::SeqCst);
///     }
/// }
/// ```
pub trait ExecutorListener<V>: Send + Sync {
    /// A task is about to be posted for execution.
    fn before_task(&self, _task: &Task<V>) {}

    /// A task finished. `result` is `None` when it was cancelled without one.
    fn after_task(&self, _task: &Task<V>, _result: Option<V>) {}

    /// Every task ran to completion (or there was none).
    fn on_done(&self) {}

    /// The suite was cancelled.
    fn on_cancelled(&self) {}

    /// The executor stopped between two tasks.
    fn on_paused(&self) {}
}
