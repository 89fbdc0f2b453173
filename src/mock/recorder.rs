//! A listener that records every notification it receives.

use std::fmt::{self, Debug};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::executor::ExecutorListener;
use crate::task::{Task, TaskId, TaskListener};

/// A single notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<V> {
    /// [`ExecutorListener::before_task`].
    BeforeTask {
        /// The task about to run.
        id: TaskId,
        /// Its name.
        name: String,
    },
    /// [`ExecutorListener::after_task`].
    AfterTask {
        /// The task that finished.
        id: TaskId,
        /// Its name.
        name: String,
        /// What it finished with.
        result: Option<V>,
    },
    /// [`ExecutorListener::on_done`].
    Done,
    /// [`ExecutorListener::on_cancelled`].
    Cancelled,
    /// [`ExecutorListener::on_paused`].
    Paused,
    /// [`TaskListener::on_done`].
    TaskDone {
        /// The task that finished.
        id: TaskId,
        /// Its result.
        result: V,
    },
    /// [`TaskListener::on_cancel`].
    TaskCancelled {
        /// The task that was cancelled.
        id: TaskId,
        /// Its result, if it produced one.
        result: Option<V>,
    },
}

/// An [`Event`] with the time it was received.
#[derive(Debug, Clone)]
pub struct Record<V> {
    /// The notification.
    pub event: Event<V>,
    /// When it arrived, relative to the recorder's creation.
    pub timestamp: Duration,
}

/// Records executor and task notifications, in arrival order.
///
/// `RecordingListener` implements both [`ExecutorListener`] and
/// [`TaskListener`], so it can observe a whole suite or stand in for an
/// executor behind a single task.
///
/// # Example
///
/// ```rust
/// use taskloop::clock::MockClock;
/// use taskloop::context::ManualLooper;
/// use taskloop::executor::Executor;
/// use taskloop::mock::RecordingListener;
/// use taskloop::task::Task;
/// use std::sync::Arc;
///
/// let looper = Arc::new(ManualLooper::new());
/// let executor: Executor<u8> = Executor::new(looper.clone(), Arc::new(MockClock::new()));
/// let recorder = Arc::new(RecordingListener::new());
/// executor.set_listener(recorder.clone());
///
/// executor.add(Task::from_fn("A", |task: &Task<u8>| task.on_done(1)));
/// executor.execute().unwrap();
/// looper.run_until_idle();
///
/// assert_eq!(recorder.trace(), vec!["before(A)", "after(A, Some(1))", "done"]);
/// ```
pub struct RecordingListener<V> {
    records: Mutex<Vec<Record<V>>>,
    changed: Condvar,
    created_at: Instant,
}

impl<V> RecordingListener<V> {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            changed: Condvar::new(),
            created_at: Instant::now(),
        }
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns how many recorded events match `predicate`.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&Event<V>) -> bool) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|record| predicate(&record.event))
            .count()
    }

    /// Number of suite completions.
    #[must_use]
    pub fn done_count(&self) -> usize {
        self.count(|event| matches!(event, Event::Done))
    }

    /// Number of suite cancellations.
    #[must_use]
    pub fn cancelled_count(&self) -> usize {
        self.count(|event| matches!(event, Event::Cancelled))
    }

    /// Number of pauses.
    #[must_use]
    pub fn paused_count(&self) -> usize {
        self.count(|event| matches!(event, Event::Paused))
    }

    /// Forgets everything recorded so far.
    pub fn reset(&self) {
        self.records.lock().clear();
    }

    /// Blocks until `predicate` holds over the recorded events, or `timeout`
    /// elapses. Returns whether the predicate held.
    #[must_use]
    pub fn wait_until(&self, timeout: Duration, predicate: impl Fn(&[Record<V>]) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut records = self.records.lock();
        while !predicate(&records) {
            if self.changed.wait_until(&mut records, deadline).timed_out() {
                return predicate(&records);
            }
        }
        true
    }

    /// Blocks until an event matching `predicate` was recorded, or `timeout`
    /// elapses.
    #[must_use]
    pub fn wait_for(&self, timeout: Duration, predicate: impl Fn(&Event<V>) -> bool) -> bool {
        self.wait_until(timeout, |records| {
            records.iter().any(|record| predicate(&record.event))
        })
    }

    fn record(&self, event: Event<V>) {
        self.records.lock().push(Record {
            event,
            timestamp: self.created_at.elapsed(),
        });
        self.changed.notify_all();
    }
}

impl<V: Clone> RecordingListener<V> {
    /// Returns every recorded event.
    #[must_use]
    pub fn events(&self) -> Vec<Event<V>> {
        self.records
            .lock()
            .iter()
            .map(|record| record.event.clone())
            .collect()
    }

    /// Returns every recorded event with its timestamp.
    #[must_use]
    pub fn records(&self) -> Vec<Record<V>> {
        self.records.lock().clone()
    }
}

impl<V: Debug> RecordingListener<V> {
    /// Returns the events in a compact form, e.g. `before(A)`,
    /// `after(A, Some(1))`, `done`.
    #[must_use]
    pub fn trace(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|record| match &record.event {
                Event::BeforeTask { name, .. } => format!("before({name})"),
                Event::AfterTask { name, result, .. } => format!("after({name}, {result:?})"),
                Event::Done => "done".to_string(),
                Event::Cancelled => "cancelled".to_string(),
                Event::Paused => "paused".to_string(),
                Event::TaskDone { id, result } => format!("task_done({id}, {result:?})"),
                Event::TaskCancelled { id, result } => {
                    format!("task_cancelled({id}, {result:?})")
                }
            })
            .collect()
    }
}

impl<V> Default for RecordingListener<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Send + 'static> ExecutorListener<V> for RecordingListener<V> {
    fn before_task(&self, task: &Task<V>) {
        self.record(Event::BeforeTask {
            id: task.id(),
            name: task.name().to_string(),
        });
    }

    fn after_task(&self, task: &Task<V>, result: Option<V>) {
        self.record(Event::AfterTask {
            id: task.id(),
            name: task.name().to_string(),
            result,
        });
    }

    fn on_done(&self) {
        self.record(Event::Done);
    }

    fn on_cancelled(&self) {
        self.record(Event::Cancelled);
    }

    fn on_paused(&self) {
        self.record(Event::Paused);
    }
}

impl<V: Send + 'static> TaskListener<V> for RecordingListener<V> {
    fn on_done(&self, task: &Task<V>, result: V) {
        self.record(Event::TaskDone {
            id: task.id(),
            result,
        });
    }

    fn on_cancel(&self, task: &Task<V>, result: Option<V>) {
        self.record(Event::TaskCancelled {
            id: task.id(),
            result,
        });
    }
}

impl<V: Debug> Debug for RecordingListener<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingListener")
            .field("records", &*self.records.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn task(name: &str) -> Task<u32> {
        Task::from_fn(name, |_: &Task<u32>| {})
    }

    #[test]
    fn test_records_in_order() {
        let recorder = RecordingListener::new();
        let a = task("A");

        ExecutorListener::before_task(&recorder, &a);
        ExecutorListener::after_task(&recorder, &a, Some(3));
        ExecutorListener::on_paused(&recorder);
        ExecutorListener::on_done(&recorder);

        assert_eq!(recorder.len(), 4);
        assert_eq!(
            recorder.trace(),
            vec!["before(A)", "after(A, Some(3))", "paused", "done"]
        );
        assert_eq!(recorder.done_count(), 1);
        assert_eq!(recorder.paused_count(), 1);
        assert_eq!(recorder.cancelled_count(), 0);
    }

    #[test]
    fn test_task_events() {
        let recorder = RecordingListener::new();
        let a = task("A");

        TaskListener::on_done(&recorder, &a, 5);
        TaskListener::on_cancel(&recorder, &a, None);

        assert_eq!(
            recorder.events(),
            vec![
                Event::TaskDone {
                    id: a.id(),
                    result: 5
                },
                Event::TaskCancelled {
                    id: a.id(),
                    result: None
                },
            ]
        );
    }

    #[test]
    fn test_reset() {
        let recorder = RecordingListener::<u32>::new();
        ExecutorListener::on_done(&recorder);
        assert!(!recorder.is_empty());

        recorder.reset();
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_timestamps_are_monotonic() {
        let recorder = RecordingListener::<u32>::new();
        ExecutorListener::on_paused(&recorder);
        thread::sleep(Duration::from_millis(5));
        ExecutorListener::on_done(&recorder);

        let records = recorder.records();
        assert!(records[1].timestamp >= records[0].timestamp + Duration::from_millis(5));
    }

    #[test]
    fn test_wait_for_other_thread() {
        let recorder = Arc::new(RecordingListener::<u32>::new());
        let remote = Arc::clone(&recorder);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            ExecutorListener::on_done(remote.as_ref());
        });

        assert!(recorder.wait_for(Duration::from_secs(5), |event| *event == Event::Done));
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_for_times_out() {
        let recorder = RecordingListener::<u32>::new();
        assert!(!recorder.wait_for(Duration::from_millis(10), |event| {
            *event == Event::Cancelled
        }));
    }
}
