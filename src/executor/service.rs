//! The `Executor` implementation.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{ReentrantMutex, RwLock};

use super::{ExecutorConfig, ExecutorListener, ExecutorState};
use crate::context::{ExecutionContext, LooperThread};
use crate::error::{Error, Result};
use crate::task::{Task, TaskListener, TaskState};
use crate::timer::{self, Timer};

/// Runs a queue of tasks one after the other on a single execution context.
///
/// Tasks run in insertion order. A task that suspends (returns from its body
/// without finishing) keeps its place as the current task until it
/// finishes; the executor does not move on before that. Between two tasks
/// the suite can be paused, stepped and resumed.
///
/// Control methods may be called from any thread. Listener notifications
/// are delivered one at a time, in order.
///
/// # Example
///
/// ```rust
/// use taskloop::clock::MockClock;
/// use taskloop::context::{ExecutionContext, ManualLooper};
/// use taskloop::executor::{Executor, ExecutorState};
/// use taskloop::task::Task;
/// use std::sync::Arc;
///
/// let looper = Arc::new(ManualLooper::new());
/// let executor: Executor<u32> = Executor::new(looper.clone(), Arc::new(MockClock::new()));
///
/// executor.add(Task::from_fn("first", |task: &Task<u32>| task.on_done(1)));
/// executor.add(Task::from_fn("second", |task: &Task<u32>| task.on_done(2)));
///
/// executor.execute().unwrap();
/// looper.run_until_idle();
///
/// assert_eq!(executor.state(), ExecutorState::Done);
/// assert!(!executor.is_executing());
/// ```
pub struct Executor<V> {
    inner: Arc<ExecutorInner<V>>,
}

struct ExecutorInner<V> {
    config: ExecutorConfig,
    context: Arc<dyn ExecutionContext>,
    timer: Arc<dyn Timer>,
    /// Held across listener notifications; re-entrant so listeners may call
    /// back in. `RefCell` borrows never span a notification.
    core: ReentrantMutex<RefCell<ExecutorCore<V>>>,
    listener: RwLock<Option<Arc<dyn ExecutorListener<V>>>>,
}

struct ExecutorCore<V> {
    state: ExecutorState,
    queue: VecDeque<Task<V>>,
    /// Dequeued and not yet observed finishing.
    current: Option<Task<V>>,
}

type Core<V> = RefCell<ExecutorCore<V>>;

impl<V: Send + 'static> Executor<V> {
    /// Creates an executor running on `context`, arming task watchdogs on
    /// `timer`.
    #[must_use]
    pub fn new(context: Arc<dyn ExecutionContext>, timer: Arc<dyn Timer>) -> Self {
        Self::with_parts(ExecutorConfig::default(), context, timer)
    }

    /// Creates an executor from explicit parts.
    #[must_use]
    pub fn with_parts(
        config: ExecutorConfig,
        context: Arc<dyn ExecutionContext>,
        timer: Arc<dyn Timer>,
    ) -> Self {
        Self {
            inner: Arc::new(ExecutorInner {
                config,
                context,
                timer,
                core: ReentrantMutex::new(RefCell::new(ExecutorCore {
                    state: ExecutorState::Idle,
                    queue: VecDeque::new(),
                    current: None,
                })),
                listener: RwLock::new(None),
            }),
        }
    }

    /// Creates an executor on its own [`LooperThread`], using the shared
    /// timer thread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`] if a thread could not be started.
    pub fn with_config(config: ExecutorConfig) -> Result<Self> {
        let context: Arc<dyn ExecutionContext> = LooperThread::spawn(config.thread_name.clone())?;
        let timer: Arc<dyn Timer> = timer::shared()?;
        Ok(Self::with_parts(config, context, timer))
    }

    /// Creates an executor on its own worker thread, reporting to
    /// `listener`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`] if a thread could not be started.
    pub fn with_listener(listener: Arc<dyn ExecutorListener<V>>) -> Result<Self> {
        let executor = Self::with_config(ExecutorConfig::default())?;
        executor.set_listener(listener);
        Ok(executor)
    }

    /// Appends a task to the queue and binds it to this executor.
    ///
    /// # Panics
    ///
    /// Panics if the task was already added to an executor.
    pub fn add(&self, task: Task<V>) {
        let weak: Weak<ExecutorInner<V>> = Arc::downgrade(&self.inner);
        let listener: Weak<dyn TaskListener<V>> = weak;
        task.bind(listener, &self.inner.timer);

        let guard = self.inner.core.lock();
        guard.borrow_mut().queue.push_back(task);
    }

    /// Appends every task, in iteration order.
    ///
    /// # Panics
    ///
    /// Panics if one of the tasks was already added to an executor.
    pub fn add_all(&self, tasks: impl IntoIterator<Item = Task<V>>) {
        for task in tasks {
            self.add(task);
        }
    }

    /// Starts executing the queue.
    ///
    /// With an empty queue the suite finishes immediately: the listener's
    /// `on_done` fires and [`Error::NoTasks`] is returned.
    ///
    /// # Errors
    ///
    /// [`Error::WrongState`] unless the executor is `Idle`,
    /// [`Error::NoTasks`] if the queue is empty, [`Error::ContextClosed`] if
    /// the first task could not be posted.
    pub fn execute(&self) -> Result<()> {
        self.inner.start("execute", ExecutorState::Running)
    }

    /// Starts executing the queue and pauses after the first task.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Executor::execute).
    pub fn execute_and_pause(&self) -> Result<()> {
        self.inner.start("execute_and_pause", ExecutorState::Pausing)
    }

    /// Runs the suspended current task again.
    ///
    /// # Errors
    ///
    /// [`Error::WrongState`] unless the executor is `Running` and the
    /// current task can run, [`Error::NoTasks`] if there is no current task,
    /// [`Error::ContextClosed`] if it could not be posted.
    pub fn execute_current(&self) -> Result<()> {
        let guard = self.inner.core.lock();
        let (state, current) = {
            let core = guard.borrow();
            (core.state, core.current.clone())
        };
        if state != ExecutorState::Running {
            return Err(Error::wrong_state("execute_current", state));
        }
        let Some(task) = current else {
            return Err(Error::NoTasks);
        };
        if !task.can_run() {
            log::debug!("{task} cannot run while {}", task.state());
            return Err(Error::wrong_state("execute_current", state));
        }
        self.inner.post_run(&task)
    }

    /// Asks the executor to stop after the current task.
    ///
    /// # Errors
    ///
    /// [`Error::WrongState`] unless the executor is `Running`.
    pub fn pause(&self) -> Result<()> {
        let guard = self.inner.core.lock();
        let mut core = guard.borrow_mut();
        if core.state != ExecutorState::Running {
            return Err(Error::wrong_state("pause", core.state));
        }
        core.state = ExecutorState::Pausing;
        log::debug!("executor pausing");
        Ok(())
    }

    /// Cancels a pause request, or continues with the next task after a
    /// pause.
    ///
    /// # Errors
    ///
    /// [`Error::WrongState`] unless the executor is `Pausing` or `Pending`,
    /// [`Error::ContextClosed`] if the next task could not be posted.
    pub fn resume(&self) -> Result<()> {
        let guard = self.inner.core.lock();
        let state = guard.borrow().state;
        match state {
            ExecutorState::Pausing => {
                guard.borrow_mut().state = ExecutorState::Running;
                log::debug!("executor pause request withdrawn");
                Ok(())
            }
            ExecutorState::Pending => {
                guard.borrow_mut().state = ExecutorState::Running;
                log::debug!("executor resumed");
                self.inner.continue_next(&guard)
            }
            state => Err(Error::wrong_state("resume", state)),
        }
    }

    /// Runs exactly one more task, then pauses again.
    ///
    /// # Errors
    ///
    /// [`Error::WrongState`] unless the executor is `Pending`,
    /// [`Error::ContextClosed`] if the next task could not be posted.
    pub fn execute_one_task(&self) -> Result<()> {
        let guard = self.inner.core.lock();
        let state = guard.borrow().state;
        if state != ExecutorState::Pending {
            return Err(Error::wrong_state("execute_one_task", state));
        }
        guard.borrow_mut().state = ExecutorState::Pausing;
        self.inner.continue_next(&guard)
    }

    /// Applies `action` to the current task, unless it is running, and to
    /// every queued task. Nothing is removed from the queue.
    pub fn for_each_pending(&self, mut action: impl FnMut(&Task<V>)) {
        let guard = self.inner.core.lock();
        let (current, queued): (Option<Task<V>>, Vec<Task<V>>) = {
            let core = guard.borrow();
            (core.current.clone(), core.queue.iter().cloned().collect())
        };
        if let Some(task) = current.filter(|task| task.state() != TaskState::Running) {
            action(&task);
        }
        for task in &queued {
            action(task);
        }
    }

    /// Cancels the suite.
    ///
    /// The queue is cleared and the current task is asked to cancel. A task
    /// caught running is left to finish on its own; the suite ends when it
    /// calls back. Otherwise the suite ends right away and, unless
    /// configured not to, the execution context is quit.
    ///
    /// Disposing twice does nothing.
    pub fn dispose(&self) {
        let guard = self.inner.core.lock();
        let (state, current) = {
            let core = guard.borrow();
            (core.state, core.current.clone())
        };
        if state == ExecutorState::Cancelled {
            return;
        }
        guard.borrow_mut().state = ExecutorState::Cancelled;

        let Some(task) = current else {
            log::debug!("executor disposed while {state}");
            return;
        };
        guard.borrow_mut().queue.clear();

        let previous = task.cancel();
        match previous {
            TaskState::Running => {
                log::info!("executor disposed, waiting for {task} to finish");
                return;
            }
            // Its completion is on its way (or being handled) and ends the suite.
            TaskState::Done => {
                log::debug!("executor disposed, {task} already finished");
                return;
            }
            _ => {}
        }
        if self.inner.config.quit_on_dispose {
            self.inner.context.quit();
        }
        self.inner.finish_cancelled(&guard, &task, None);
    }

    /// Returns true while a task is current.
    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.inner.core.lock().borrow().current.is_some()
    }

    /// Returns the executor's state.
    #[must_use]
    pub fn state(&self) -> ExecutorState {
        self.inner.core.lock().borrow().state
    }

    /// Returns the current task, if any.
    #[must_use]
    pub fn current(&self) -> Option<Task<V>> {
        self.inner.core.lock().borrow().current.clone()
    }

    /// Returns the number of queued tasks, not counting the current one.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.core.lock().borrow().queue.len()
    }

    /// Replaces the listener.
    pub fn set_listener(&self, listener: Arc<dyn ExecutorListener<V>>) {
        *self.inner.listener.write() = Some(listener);
    }

    /// Removes the listener. Notifications are then only logged.
    pub fn clear_listener(&self) {
        *self.inner.listener.write() = None;
    }

    /// Returns the listener, if one is set.
    #[must_use]
    pub fn listener(&self) -> Option<Arc<dyn ExecutorListener<V>>> {
        self.inner.listener.read().clone()
    }

    /// Returns the execution context tasks run on.
    #[must_use]
    pub fn context(&self) -> &Arc<dyn ExecutionContext> {
        &self.inner.context
    }

    /// Returns the executor's configuration.
    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.inner.config
    }
}

impl<V: Send + 'static> ExecutorInner<V> {
    fn start(&self, operation: &'static str, state: ExecutorState) -> Result<()> {
        let guard = self.core.lock();
        let current = guard.borrow().state;
        if current != ExecutorState::Idle {
            return Err(Error::wrong_state(operation, current));
        }
        guard.borrow_mut().state = state;
        log::debug!("executor {operation}");
        self.launch(&guard)
    }

    fn launch(&self, core: &Core<V>) -> Result<()> {
        let next = core.borrow_mut().queue.pop_front();
        match next {
            Some(task) => self.launch_task(core, task),
            None => {
                core.borrow_mut().state = ExecutorState::Done;
                log::debug!("executor has no tasks");
                self.notify("on_done", |listener| listener.on_done());
                Err(Error::NoTasks)
            }
        }
    }

    fn continue_next(&self, core: &Core<V>) -> Result<()> {
        let next = core.borrow_mut().queue.pop_front();
        match next {
            Some(task) => self.launch_task(core, task),
            None => {
                {
                    let mut core = core.borrow_mut();
                    core.current = None;
                    core.state = ExecutorState::Done;
                }
                log::debug!("executor finished the suite");
                self.notify("on_done", |listener| listener.on_done());
                Ok(())
            }
        }
    }

    fn launch_task(&self, core: &Core<V>, task: Task<V>) -> Result<()> {
        core.borrow_mut().current = Some(task.clone());
        self.notify("before_task", |listener| listener.before_task(&task));
        self.post_run(&task)
    }

    fn post_run(&self, task: &Task<V>) -> Result<()> {
        let job_task = task.clone();
        let context = Arc::downgrade(&self.context);
        let posted = self.context.post(Box::new(move || {
            if let Some(context) = context.upgrade() {
                job_task.run(&context);
            }
        }));
        if posted {
            Ok(())
        } else {
            log::warn!("cannot post {task}: execution context is closed");
            Err(Error::ContextClosed)
        }
    }

    /// Returns false if the suite already let go of its current task.
    fn is_current(&self, core: &Core<V>, task: &Task<V>) -> bool {
        match &core.borrow().current {
            None => {
                log::debug!("{task} finished after the suite was torn down");
                false
            }
            Some(current) => {
                assert!(
                    current.ptr_eq(task),
                    "{task} finished but {current} is the current task"
                );
                true
            }
        }
    }

    fn finish_cancelled(&self, core: &Core<V>, task: &Task<V>, result: Option<V>) {
        self.notify("after_task", |listener| listener.after_task(task, result));
        self.tear_down_cancelled(core);
    }

    fn tear_down_cancelled(&self, core: &Core<V>) {
        {
            let mut core = core.borrow_mut();
            core.queue.clear();
            core.current = None;
            core.state = ExecutorState::Done;
        }
        log::debug!("executor cancelled");
        self.notify("on_cancelled", |listener| listener.on_cancelled());
    }

    fn notify(&self, event: &str, f: impl FnOnce(&dyn ExecutorListener<V>)) {
        let listener = self.listener.read().clone();
        match listener {
            Some(listener) => f(listener.as_ref()),
            None => log::debug!("no executor listener for {event}"),
        }
    }
}

impl<V: Send + 'static> TaskListener<V> for ExecutorInner<V> {
    fn on_done(&self, task: &Task<V>, result: V) {
        let guard = self.core.lock();
        if !self.is_current(&guard, task) {
            return;
        }
        if guard.borrow().state == ExecutorState::Cancelled {
            self.finish_cancelled(&guard, task, Some(result));
            return;
        }

        self.notify("after_task", |listener| listener.after_task(task, Some(result)));

        // The hook may have changed the state.
        let state = guard.borrow().state;
        match state {
            ExecutorState::Idle | ExecutorState::Done => {}
            ExecutorState::Running => {
                if let Err(err) = self.continue_next(&guard) {
                    log::warn!("executor stalled after {task}: {err}");
                }
            }
            ExecutorState::Pausing => {
                guard.borrow_mut().state = ExecutorState::Pending;
                log::debug!("executor paused after {task}");
                self.notify("on_paused", |listener| listener.on_paused());
            }
            ExecutorState::Pending => {
                self.notify("on_paused", |listener| listener.on_paused());
            }
            ExecutorState::Cancelled => self.tear_down_cancelled(&guard),
        }
    }

    fn on_cancel(&self, task: &Task<V>, result: Option<V>) {
        let guard = self.core.lock();
        if self.is_current(&guard, task) {
            self.finish_cancelled(&guard, task, result);
        }
    }
}

impl<V> Clone for Executor<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for Executor<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.inner.core.lock();
        let core = guard.borrow();
        f.debug_struct("Executor")
            .field("state", &core.state)
            .field("current", &core.current)
            .field("queued", &core.queue.len())
            .finish_non_exhaustive()
    }
}
