//! The task state machine.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use super::runnable::FnRunnable;
use super::watchdog::Watchdog;
use super::{Runnable, TaskId, TaskListener, TaskState, Timeout};
use crate::context::ExecutionContext;
use crate::error::Result;
use crate::timer::{self, Timer};

/// A schedulable unit of work with its own lifecycle.
///
/// `Task` is a cheap handle: clones refer to the same task. A body keeps a
/// clone when it needs to finish later, e.g. from a hardware callback on
/// another thread.
///
/// State changes are serialized by an internal mutex that is never held
/// while the body runs, so [`cancel`](Task::cancel) and
/// [`on_done`](Task::on_done) may be called while `execute` is in progress.
///
/// Illegal transitions (running a task that is already running, finishing a
/// task that never started, binding a task twice) are programming errors
/// and panic.
pub struct Task<V> {
    inner: Arc<TaskInner<V>>,
}

struct TaskInner<V> {
    id: TaskId,
    name: String,
    core: Mutex<TaskCore<V>>,
}

struct TaskCore<V> {
    state: TaskState,
    first_execution: bool,
    listener: Option<Weak<dyn TaskListener<V>>>,
    timer: Option<Arc<dyn Timer>>,
    /// Recorded on first execution; completions and watchdogs post here.
    context: Option<Weak<dyn ExecutionContext>>,
    watchdog: Option<Watchdog>,
    generation: u64,
    /// Taken while `execute` or `on_timeout` runs.
    body: Option<Box<dyn Runnable<V>>>,
    /// Set when the task finished while its body was out.
    after_pending: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Launch {
    Start,
    Resume,
}

impl<V: Send + 'static> Task<V> {
    /// Creates a task running `body`.
    pub fn new(name: impl Into<String>, body: impl Runnable<V>) -> Self {
        Self {
            inner: Arc::new(TaskInner {
                id: TaskId::new(),
                name: name.into(),
                core: Mutex::new(TaskCore {
                    state: TaskState::Idle,
                    first_execution: true,
                    listener: None,
                    timer: None,
                    context: None,
                    watchdog: None,
                    generation: 0,
                    body: Some(Box::new(body)),
                    after_pending: false,
                }),
            }),
        }
    }

    /// Creates a task whose body is a closure.
    ///
    /// # Example
    ///
    /// ```rust
    /// use taskloop::task::{Task, TaskState};
    ///
    /// let task = Task::from_fn("answer", |task: &Task<u32>| task.on_done(42));
    /// assert_eq!(task.name(), "answer");
    /// assert_eq!(task.state(), TaskState::Idle);
    /// ```
    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: FnMut(&Task<V>) + Send + 'static,
    {
        Self::new(name, FnRunnable::new(f))
    }

    /// Uses `timer` for this task's watchdog instead of the executor's.
    #[must_use]
    pub fn with_timer(self, timer: Arc<dyn Timer>) -> Self {
        self.inner.core.lock().timer = Some(timer);
        self
    }

}

impl<V> Task<V> {
    /// Returns the task's unique identifier.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    /// Returns the task's diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the task's current state.
    #[must_use]
    pub fn state(&self) -> TaskState {
        self.inner.core.lock().state
    }

    /// Returns true if the task is `Idle` or `Pending`.
    #[must_use]
    pub fn can_run(&self) -> bool {
        self.state().can_run()
    }

    /// Returns true if cancellation was requested and not yet finalized.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state() == TaskState::Cancelled
    }

    /// Returns true while the body runs for the first time.
    #[must_use]
    pub fn is_first_execution(&self) -> bool {
        self.inner.core.lock().first_execution
    }

    /// Returns true if both handles refer to the same task.
    #[must_use]
    pub fn ptr_eq(&self, other: &Task<V>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns the execution context the task first ran on, while it is
    /// still alive.
    ///
    /// Bodies post deferred work here to stay on the task's serialized
    /// context.
    #[must_use]
    pub fn context(&self) -> Option<Arc<dyn ExecutionContext>> {
        self.inner
            .core
            .lock()
            .context
            .as_ref()
            .and_then(Weak::upgrade)
    }
}

impl<V: Send + 'static> Task<V> {

    /// Binds the listener notified when the task finishes.
    ///
    /// The caller keeps the listener alive; the task only holds a weak
    /// reference.
    ///
    /// # Panics
    ///
    /// Panics if the task already has a listener.
    pub fn set_listener(&self, listener: Weak<dyn TaskListener<V>>) {
        let mut core = self.inner.core.lock();
        assert!(
            core.listener.is_none(),
            "{self} is already bound to a listener"
        );
        core.listener = Some(listener);
    }

    /// Binds the task to its executor.
    pub(crate) fn bind(&self, listener: Weak<dyn TaskListener<V>>, timer: &Arc<dyn Timer>) {
        self.set_listener(listener);
        self.inner
            .core
            .lock()
            .timer
            .get_or_insert_with(|| Arc::clone(timer));
    }

    /// Runs the task on `context`: starts an `Idle` task, resumes a
    /// `Pending` one, and does nothing for a cancelled one.
    ///
    /// # Panics
    ///
    /// Panics if the task is `Running` or `Done`.
    pub fn run(&self, context: &Arc<dyn ExecutionContext>) {
        self.drive(None, context);
    }

    /// Runs an `Idle` task for the first time on `context`.
    ///
    /// # Panics
    ///
    /// Panics unless the task is `Idle` (or `Cancelled`, which is a no-op).
    pub fn start(&self, context: &Arc<dyn ExecutionContext>) {
        self.drive(Some(Launch::Start), context);
    }

    /// Runs a suspended task again on the context it started on.
    ///
    /// # Panics
    ///
    /// Panics unless the task is `Pending` (or `Cancelled`, which is a
    /// no-op).
    pub fn resume(&self) {
        let recorded = self.inner.core.lock().context.clone();
        let Some(recorded) = recorded else {
            panic!("{self} cannot resume: it never started");
        };
        match recorded.upgrade() {
            Some(context) => self.drive(Some(Launch::Resume), &context),
            None => log::warn!("{self} cannot resume: its execution context is gone"),
        }
    }

    fn drive(&self, requested: Option<Launch>, context: &Arc<dyn ExecutionContext>) {
        let (launch, mut body) = {
            let mut core = self.inner.core.lock();
            let launch = match (core.state, requested) {
                (TaskState::Cancelled, _) => {
                    log::debug!("{self} was cancelled, not running");
                    return;
                }
                (TaskState::Idle, None | Some(Launch::Start)) => Launch::Start,
                (TaskState::Pending, None | Some(Launch::Resume)) => Launch::Resume,
                (state, _) => panic!("{self} cannot run from state {state}"),
            };
            let Some(body) = core.body.take() else {
                panic!("{self} cannot run while its body is busy");
            };
            core.state = TaskState::Running;
            core.first_execution = launch == Launch::Start;
            if launch == Launch::Start {
                core.context = Some(Arc::downgrade(context));
            }
            (launch, body)
        };

        log::debug!("{self} {launch:?}");
        body.execute(self);

        let mut core = self.inner.core.lock();
        if core.state == TaskState::Running {
            core.state = TaskState::Pending;
            log::debug!("{self} suspended");
        }
        self.restore_body(core, body);
    }

    /// Puts the body back, running its teardown first if the task finished
    /// while the body was out.
    fn restore_body(
        &self,
        mut core: MutexGuard<'_, TaskCore<V>>,
        mut body: Box<dyn Runnable<V>>,
    ) {
        if !std::mem::take(&mut core.after_pending) {
            core.body = Some(body);
            return;
        }
        drop(core);
        body.after(self);
        self.inner.core.lock().body = Some(body);
    }

    /// Finishes the task with `result`.
    ///
    /// A cancelled task finishes through [`on_cancel`](Task::on_cancel)
    /// instead. Finishing twice is a no-op. The listener is notified on the
    /// task's execution context, if it is still alive.
    ///
    /// # Panics
    ///
    /// Panics if the task never started.
    pub fn on_done(&self, result: V) {
        let core = self.inner.core.lock();
        let state = core.state;
        match state {
            TaskState::Cancelled => {
                drop(core);
                self.on_cancel(Some(result));
            }
            TaskState::Done => log::debug!("{self} is already done"),
            state => {
                self.check_transition(state, &[TaskState::Running, TaskState::Pending]);
                self.finish(core, move |listener, task| listener.on_done(task, result));
            }
        }
    }

    /// Finishes the task by cancelling the whole suite.
    ///
    /// # Panics
    ///
    /// Panics if the task never started and was not cancelled.
    pub fn on_cancel(&self, result: Option<V>) {
        let core = self.inner.core.lock();
        let state = core.state;
        match state {
            TaskState::Done => log::debug!("{self} is already done"),
            state => {
                self.check_transition(
                    state,
                    &[TaskState::Running, TaskState::Pending, TaskState::Cancelled],
                );
                self.finish(core, move |listener, task| listener.on_cancel(task, result));
            }
        }
    }

    /// Requests cancellation and returns the state the task was in.
    ///
    /// `Idle`, `Pending` and `Running` tasks become `Cancelled`; a `Done`
    /// task is left alone. Nothing is torn down or notified: the body (or
    /// the next `on_done`) finalizes through [`on_cancel`](Task::on_cancel).
    pub fn cancel(&self) -> TaskState {
        let mut core = self.inner.core.lock();
        let previous = core.state;
        if matches!(
            previous,
            TaskState::Idle | TaskState::Pending | TaskState::Running
        ) {
            core.state = TaskState::Cancelled;
            log::debug!("{self} cancelled while {previous}");
        }
        previous
    }

    /// Arms the watchdog, replacing any armed one.
    ///
    /// After `delay`, [`Runnable::on_timeout`] runs on the task's execution
    /// context with `param` and `tag`, unless the watchdog was cleared or
    /// replaced first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`](crate::Error::Spawn) if the task has no timer
    /// and the shared timer thread could not be started.
    pub fn set_watchdog(&self, delay: Duration, param: V, tag: u32) -> Result<()> {
        let bound = self.inner.core.lock().timer.clone();
        let timer: Arc<dyn Timer> = match bound {
            Some(timer) => timer,
            None => timer::shared()? as Arc<dyn Timer>,
        };

        let mut core = self.inner.core.lock();
        if let Some(previous) = core.watchdog.take() {
            previous.disarm();
        }
        core.generation += 1;
        let generation = core.generation;

        let task = self.clone();
        let timeout = Timeout::new(param, tag, delay);
        let id = timer.schedule(
            delay,
            Box::new(move || task.watchdog_expired(generation, timeout)),
        );
        core.watchdog = Some(Watchdog::new(generation, id, timer));
        log::debug!("{self} watchdog armed for {delay:?}");
        Ok(())
    }

    /// Disarms the watchdog, if armed.
    pub fn clear_watchdog(&self) {
        let watchdog = self.inner.core.lock().watchdog.take();
        if let Some(watchdog) = watchdog {
            watchdog.disarm();
            log::debug!("{self} watchdog cleared");
        }
    }

    /// Returns true if a watchdog is armed.
    #[must_use]
    pub fn has_watchdog(&self) -> bool {
        self.inner.core.lock().watchdog.is_some()
    }

    /// Timer side: hop onto the task's context before firing.
    fn watchdog_expired(&self, generation: u64, timeout: Timeout<V>) {
        let recorded = self.inner.core.lock().context.clone();
        let Some(recorded) = recorded else {
            self.fire_watchdog(generation, timeout);
            return;
        };
        let Some(context) = recorded.upgrade() else {
            log::debug!("{self} watchdog dropped: execution context is gone");
            return;
        };
        let task = self.clone();
        let posted = context.post(Box::new(move || task.fire_watchdog(generation, timeout)));
        if !posted {
            log::debug!("{self} watchdog dropped: execution context closed");
        }
    }

    fn fire_watchdog(&self, generation: u64, timeout: Timeout<V>) {
        let mut body = {
            let mut core = self.inner.core.lock();
            let armed = core.watchdog.as_ref().map(|watchdog| watchdog.generation);
            if armed != Some(generation) || core.state == TaskState::Done {
                log::debug!("{self} ignoring stale watchdog");
                return;
            }
            core.watchdog = None;
            if core.state == TaskState::Idle {
                log::warn!("{self} watchdog fired before the task started");
                return;
            }
            let Some(body) = core.body.take() else {
                log::warn!("{self} watchdog fired while its body is busy");
                return;
            };
            body
        };
        log::debug!("{self} watchdog fired after {:?}", timeout.delay());
        body.on_timeout(self, timeout);
        let core = self.inner.core.lock();
        self.restore_body(core, body);
    }

    /// Tears down, marks the task `Done` and posts the notification.
    ///
    /// [`Runnable::after`] runs here, or when the body is handed back if it
    /// is out running.
    fn finish<F>(&self, mut core: MutexGuard<'_, TaskCore<V>>, notify: F)
    where
        F: FnOnce(&dyn TaskListener<V>, &Task<V>) + Send + 'static,
    {
        if let Some(watchdog) = core.watchdog.take() {
            watchdog.disarm();
        }
        core.state = TaskState::Done;
        let listener = core.listener.clone();
        let context = core.context.clone();
        let body = core.body.take();
        core.after_pending = body.is_none();
        drop(core);
        log::debug!("{self} done");

        if let Some(mut body) = body {
            body.after(self);
            self.inner.core.lock().body = Some(body);
        }

        let Some(listener) = listener else {
            log::warn!("{self} finished without a listener");
            return;
        };
        let Some(context) = context
            .as_ref()
            .and_then(Weak::upgrade)
            .filter(|context| context.is_alive())
        else {
            log::debug!("{self} has no live execution context, completion not delivered");
            return;
        };

        let task = self.clone();
        let posted = context.post(Box::new(move || match listener.upgrade() {
            Some(listener) => notify(listener.as_ref(), &task),
            None => log::debug!("{task} listener dropped before completion"),
        }));
        if !posted {
            log::debug!("{self} completion dropped: execution context closed");
        }
    }

    fn check_transition(&self, state: TaskState, allowed: &[TaskState]) {
        assert!(
            allowed.contains(&state),
            "{self} cannot finish from state {state}"
        );
    }
}

impl<V> Clone for Task<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Display for Task<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}`", self.inner.id, self.inner.name)
    }
}

impl<V> fmt::Debug for Task<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("state", &self.inner.core.lock().state)
            .finish_non_exhaustive()
    }
}
