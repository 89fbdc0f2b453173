//! Timer thread for watchdog deadlines
//!
//! A single thread waits for the earliest deadline using a condvar timeout
//! and wakes early whenever an earlier timer is registered.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::{Timer, TimerCallback, TimerId};
use crate::error::Result;

/// Entry in the timer heap
struct TimerEntry {
    deadline: Instant,
    id: TimerId,
    callback: TimerCallback,
}

// Reverse ordering for min-heap (earliest deadline first)
impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TimerEntry {}

struct Shared {
    pending: Mutex<BinaryHeap<TimerEntry>>,
    notify: Condvar,
    shutdown: AtomicBool,
}

/// A real-time [`Timer`] backed by one dedicated thread.
///
/// Callbacks run on the timer thread, one after another. A callback that
/// needs to run somewhere else should post itself onward.
pub struct TimerThread {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TimerThread {
    /// Starts a timer thread with the given name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`](crate::Error::Spawn) if the thread could not
    /// be started.
    pub fn spawn(name: impl Into<String>) -> Result<Arc<Self>> {
        let shared = Arc::new(Shared {
            pending: Mutex::new(BinaryHeap::new()),
            notify: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });

        let worker = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || Self::run_loop(&worker))?;

        Ok(Arc::new(Self {
            shared,
            handle: Mutex::new(Some(handle)),
        }))
    }

    /// Stops the timer thread. Pending timers never fire.
    pub fn stop(&self) {
        self.shared.shutdown.store(true, AtomicOrdering::Release);
        {
            let _pending = self.shared.pending.lock();
            self.shared.notify.notify_one();
        }

        if let Some(handle) = self.handle.lock().take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                log::warn!("timer thread panicked");
            }
        }
        self.shared.pending.lock().clear();
    }

    /// Returns the number of timers waiting to fire.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.pending.lock().len()
    }

    fn run_loop(shared: &Shared) {
        loop {
            let mut pending = shared.pending.lock();

            // Re-checked under the lock so a stop() notification is never lost.
            if shared.shutdown.load(AtomicOrdering::Acquire) {
                break;
            }

            let now = Instant::now();
            let mut due = Vec::new();
            while pending.peek().is_some_and(|entry| entry.deadline <= now) {
                if let Some(entry) = pending.pop() {
                    due.push(entry);
                }
            }

            if !due.is_empty() {
                drop(pending);
                for entry in due {
                    (entry.callback)();
                }
                continue;
            }

            match pending.peek().map(|entry| entry.deadline) {
                Some(deadline) => {
                    let timeout = deadline.saturating_duration_since(now);
                    shared.notify.wait_for(&mut pending, timeout);
                }
                None => shared.notify.wait(&mut pending),
            }
        }
    }
}

impl Timer for TimerThread {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerId {
        let id = TimerId::new();
        let mut pending = self.shared.pending.lock();
        pending.push(TimerEntry {
            deadline: Instant::now() + delay,
            id,
            callback,
        });
        // The new entry may be earlier than the one being waited on.
        self.shared.notify.notify_one();
        id
    }

    fn cancel(&self, id: TimerId) -> bool {
        let mut pending = self.shared.pending.lock();
        let before = pending.len();
        let kept: Vec<_> = pending.drain().filter(|entry| entry.id != id).collect();
        let removed = before != kept.len();
        pending.extend(kept);
        removed
    }
}

impl Drop for TimerThread {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for TimerThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerThread")
            .field("pending", &self.pending_count())
            .finish()
    }
}
