//! Deterministic executor scenarios.
//!
//! Everything runs on the test thread: jobs are drained with
//! `ManualLooper::run_until_idle` and watchdogs fire on `MockClock::advance`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use taskloop::prelude::*;

struct Harness {
    looper: Arc<ManualLooper>,
    clock: MockClock,
    executor: Executor<u32>,
    recorder: Arc<RecordingListener<u32>>,
}

impl Harness {
    fn new() -> Self {
        let looper = Arc::new(ManualLooper::new());
        let clock = MockClock::new();
        let executor = Executor::new(looper.clone(), Arc::new(clock.clone()));
        let recorder = Arc::new(RecordingListener::new());
        executor.set_listener(recorder.clone());
        Self {
            looper,
            clock,
            executor,
            recorder,
        }
    }

    fn idle(&self) {
        self.looper.run_until_idle();
    }
}

fn finishing(name: &str, value: u32) -> Task<u32> {
    Task::from_fn(name, move |task: &Task<u32>| task.on_done(value))
}

/// Finishes on the second run.
fn twice(name: &str, value: u32) -> Task<u32> {
    let mut runs = 0;
    Task::from_fn(name, move |task: &Task<u32>| {
        runs += 1;
        if runs == 2 {
            task.on_done(value);
        }
    })
}

/// Tasks run in order, each bracketed by its notifications.
#[test]
fn test_two_tasks_in_order() {
    let h = Harness::new();
    h.executor.add(finishing("A", 1));
    h.executor.add(finishing("B", 2));

    h.executor.execute().unwrap();
    h.idle();

    assert_eq!(
        h.recorder.trace(),
        vec![
            "before(A)",
            "after(A, Some(1))",
            "before(B)",
            "after(B, Some(2))",
            "done"
        ]
    );
    assert_eq!(h.executor.state(), ExecutorState::Done);
    assert!(!h.executor.is_executing());
}

/// An empty suite reports NoTasks and still completes once.
#[test]
fn test_empty_queue() {
    let h = Harness::new();

    assert!(matches!(h.executor.execute(), Err(Error::NoTasks)));
    assert_eq!(h.recorder.trace(), vec!["done"]);
    assert_eq!(h.executor.state(), ExecutorState::Done);
}

/// A suite can only be started once.
#[test]
fn test_execute_twice() {
    let h = Harness::new();
    h.executor.add(twice("A", 1));

    h.executor.execute().unwrap();
    let err = h.executor.execute().unwrap_err();

    assert!(matches!(
        err,
        Error::WrongState {
            operation: "execute",
            state: ExecutorState::Running
        }
    ));
    assert_eq!(h.recorder.trace(), vec!["before(A)"]);
}

/// A suspended task is re-run with execute_current and completes once.
#[test]
fn test_execute_current_resumes_suspended_task() {
    let h = Harness::new();
    let task = twice("A", 1);
    h.executor.add(task.clone());

    h.executor.execute().unwrap();
    h.idle();
    assert_eq!(task.state(), TaskState::Pending);
    assert!(h.executor.is_executing());
    assert_eq!(h.recorder.trace(), vec!["before(A)"]);

    h.executor.execute_current().unwrap();
    h.idle();

    assert_eq!(task.state(), TaskState::Done);
    assert_eq!(
        h.recorder.trace(),
        vec!["before(A)", "after(A, Some(1))", "done"]
    );
}

/// A task completed from outside, e.g. by a hardware callback.
#[test]
fn test_external_completion() {
    let h = Harness::new();
    let task = Task::from_fn("A", |_: &Task<u32>| {});
    h.executor.add(task.clone());
    h.executor.add(finishing("B", 2));

    h.executor.execute().unwrap();
    h.idle();
    assert_eq!(h.executor.pending_count(), 1);

    task.on_done(1);
    h.idle();

    assert_eq!(h.recorder.done_count(), 1);
    assert_eq!(
        h.recorder.trace(),
        vec![
            "before(A)",
            "after(A, Some(1))",
            "before(B)",
            "after(B, Some(2))",
            "done"
        ]
    );
}

/// Running a task from inside its own body is a consistency violation.
#[test]
#[should_panic(expected = "cannot run from state Running")]
fn test_run_while_running_panics() {
    let h = Harness::new();
    let context = Arc::clone(h.executor.context());
    h.executor
        .add(Task::from_fn("A", move |task: &Task<u32>| task.run(&context)));

    h.executor.execute().unwrap();
    h.idle();
}

/// Pause, step one task, resume.
#[test]
fn test_pause_step_resume() {
    let h = Harness::new();
    h.executor.add(finishing("A", 1));
    h.executor.add(finishing("B", 2));
    h.executor.add(finishing("C", 3));

    h.executor.execute().unwrap();
    h.executor.pause().unwrap();
    h.idle();
    assert_eq!(h.executor.state(), ExecutorState::Pending);
    assert_eq!(h.executor.pending_count(), 2);

    h.executor.execute_one_task().unwrap();
    h.idle();
    assert_eq!(h.executor.state(), ExecutorState::Pending);
    assert_eq!(h.executor.pending_count(), 1);

    h.executor.resume().unwrap();
    h.idle();

    assert_eq!(
        h.recorder.trace(),
        vec![
            "before(A)",
            "after(A, Some(1))",
            "paused",
            "before(B)",
            "after(B, Some(2))",
            "paused",
            "before(C)",
            "after(C, Some(3))",
            "done"
        ]
    );
}

/// execute_and_pause stops after the first task.
#[test]
fn test_execute_and_pause() {
    let h = Harness::new();
    h.executor.add(finishing("A", 1));
    h.executor.add(finishing("B", 2));

    h.executor.execute_and_pause().unwrap();
    assert_eq!(h.executor.state(), ExecutorState::Pausing);
    h.idle();

    assert_eq!(h.executor.state(), ExecutorState::Pending);
    assert_eq!(h.recorder.paused_count(), 1);
    assert!(h.executor.pause().unwrap_err().is_wrong_state());
}

/// Stepping past the last task finishes the suite.
#[test]
fn test_step_past_last_task() {
    let h = Harness::new();
    h.executor.add(finishing("A", 1));

    h.executor.execute_and_pause().unwrap();
    h.idle();
    h.executor.execute_one_task().unwrap();

    assert_eq!(h.executor.state(), ExecutorState::Done);
    assert_eq!(
        h.recorder.trace(),
        vec!["before(A)", "after(A, Some(1))", "paused", "done"]
    );
}

/// A listener may drive the executor from its callbacks.
#[test]
fn test_listener_resumes_from_on_paused() {
    struct AutoResume {
        executor: Mutex<Option<Executor<u32>>>,
        pauses: AtomicUsize,
    }

    impl ExecutorListener<u32> for AutoResume {
        fn on_paused(&self) {
            self.pauses.fetch_add(1, Ordering::SeqCst);
            let executor = self.executor.lock().clone();
            if let Some(executor) = executor {
                executor.resume().unwrap();
            }
        }
    }

    let h = Harness::new();
    let listener = Arc::new(AutoResume {
        executor: Mutex::new(Some(h.executor.clone())),
        pauses: AtomicUsize::new(0),
    });
    h.executor.set_listener(listener.clone());
    h.executor.add(finishing("A", 1));
    h.executor.add(finishing("B", 2));

    h.executor.execute_and_pause().unwrap();
    h.idle();

    assert_eq!(listener.pauses.load(Ordering::SeqCst), 1);
    assert_eq!(h.executor.state(), ExecutorState::Done);
    listener.executor.lock().take();
}

/// Disposing before execution is immediate and silent.
#[test]
fn test_dispose_before_execute() {
    let h = Harness::new();
    h.executor.add(finishing("A", 1));

    h.executor.dispose();

    assert_eq!(h.executor.state(), ExecutorState::Cancelled);
    assert!(h.recorder.is_empty());
    assert!(h.executor.execute().unwrap_err().is_wrong_state());
}

/// Disposing from inside a running task waits for it to call back.
#[test]
fn test_dispose_during_execution_waits() {
    let h = Harness::new();
    let executor = h.executor.clone();
    let task = Task::from_fn("A", move |_: &Task<u32>| executor.dispose());
    h.executor.add(task.clone());
    h.executor.add(finishing("B", 2));

    h.executor.execute().unwrap();
    h.idle();

    // The cancel landed mid-execute and survives the body returning.
    assert_eq!(task.state(), TaskState::Cancelled);
    assert_eq!(h.executor.state(), ExecutorState::Cancelled);
    assert!(h.executor.is_executing());
    assert_eq!(h.executor.pending_count(), 0);
    assert_eq!(h.recorder.cancelled_count(), 0);

    task.on_done(5);
    h.idle();

    assert_eq!(task.state(), TaskState::Done);
    assert_eq!(h.executor.state(), ExecutorState::Done);
    assert_eq!(
        h.recorder.trace(),
        vec!["before(A)", "after(A, Some(5))", "cancelled"]
    );
}

/// Disposing while a task waits quits the context and ends the suite.
#[test]
fn test_dispose_while_task_pending() {
    let h = Harness::new();
    let task = Task::from_fn("A", |_: &Task<u32>| {});
    h.executor.add(task.clone());

    h.executor.execute().unwrap();
    h.idle();
    h.executor.dispose();

    assert_eq!(h.executor.state(), ExecutorState::Done);
    assert!(!h.looper.is_alive());
    assert_eq!(
        h.recorder.trace(),
        vec!["before(A)", "after(A, None)", "cancelled"]
    );

    // A late hardware answer changes nothing.
    task.on_done(1);
    assert_eq!(h.recorder.len(), 3);
}

/// A watchdog finishes a task that never answers.
#[test]
fn test_watchdog_completes_hung_task() {
    let h = Harness::new();
    h.executor.add(Task::from_fn("A", |task: &Task<u32>| {
        task.set_watchdog(Duration::from_millis(500), 408, 0).unwrap();
    }));
    h.executor.add(finishing("B", 2));

    h.executor.execute().unwrap();
    h.idle();
    assert_eq!(h.clock.pending_count(), 1);

    h.clock.advance(Duration::from_millis(499));
    h.idle();
    assert_eq!(h.recorder.trace(), vec!["before(A)"]);

    h.clock.advance(Duration::from_millis(1));
    h.idle();
    assert_eq!(
        h.recorder.trace(),
        vec![
            "before(A)",
            "after(A, Some(408))",
            "before(B)",
            "after(B, Some(2))",
            "done"
        ]
    );
}

/// Finishing before the deadline disarms the watchdog.
#[test]
fn test_watchdog_disarmed_on_completion() {
    let h = Harness::new();
    let task = Task::from_fn("A", |task: &Task<u32>| {
        task.set_watchdog(Duration::from_millis(500), 408, 0).unwrap();
    });
    h.executor.add(task.clone());

    h.executor.execute().unwrap();
    h.idle();
    task.on_done(1);
    h.idle();
    assert_eq!(h.clock.pending_count(), 0);

    h.clock.advance(Duration::from_secs(1));
    h.idle();
    assert_eq!(
        h.recorder.trace(),
        vec!["before(A)", "after(A, Some(1))", "done"]
    );
}

/// Tasks added while the suite runs are picked up in order.
#[test]
fn test_add_during_execution() {
    let h = Harness::new();
    let executor = h.executor.clone();
    h.executor.add(Task::from_fn("A", move |task: &Task<u32>| {
        executor.add(finishing("late", 9));
        task.on_done(1);
    }));

    h.executor.execute().unwrap();
    h.idle();

    assert_eq!(
        h.recorder.trace(),
        vec![
            "before(A)",
            "after(A, Some(1))",
            "before(late)",
            "after(late, Some(9))",
            "done"
        ]
    );
}

/// for_each_pending can cancel every waiting task.
#[test]
fn test_cancel_all_pending() {
    let h = Harness::new();
    let b = finishing("B", 2);
    let c = finishing("C", 3);
    h.executor.add(Task::from_fn("A", |_: &Task<u32>| {}));
    h.executor.add(b.clone());
    h.executor.add(c.clone());

    h.executor.execute().unwrap();
    h.idle();
    h.executor.for_each_pending(|task| {
        task.cancel();
    });

    assert!(b.is_cancelled());
    assert!(c.is_cancelled());
    assert_eq!(h.executor.pending_count(), 2);
}
