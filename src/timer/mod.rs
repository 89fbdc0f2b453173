//! Single-shot, cancellable timers
//!
//! Task watchdogs are armed through the [`Timer`] trait. Production code
//! uses [`TimerThread`]; tests use [`MockClock`](crate::clock::MockClock)
//! to fire timers without waiting for real time.

mod thread;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;

pub use thread::TimerThread;

use crate::error::Result;

/// Callback run when a timer expires.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Identifier of a scheduled timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

impl TimerId {
    /// Creates a new unique timer ID.
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

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timer({})", self.0)
    }
}

/// A source of single-shot timers.
pub trait Timer: Send + Sync {
    /// Runs `callback` once `delay` has elapsed, unless cancelled first.
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerId;

    /// Cancels a scheduled timer and drops its callback.
    ///
    /// Returns `true` if the timer was still pending.
    fn cancel(&self, id: TimerId) -> bool;
}

/// Returns the process-wide timer thread, starting it on first use.
///
/// Tasks that were never bound to an executor arm their watchdog here.
///
/// # Errors
///
/// Returns [`Error::Spawn`](crate::Error::Spawn) if the timer thread could
/// not be started.
pub fn shared() -> Result<Arc<TimerThread>> {
    static SHARED: OnceCell<Arc<TimerThread>> = OnceCell::new();
    SHARED
        .get_or_try_init(|| TimerThread::spawn("taskloop-timer"))
        .map(Arc::clone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_id_unique() {
        let id1 = TimerId::new();
        let id2 = TimerId::new();
        assert_ne!(id1, id2);
        assert!(id1 < id2);
    }

    #[test]
    fn test_timer_id_display() {
        let id = TimerId(3);
        assert_eq!(id.to_string(), "Timer(3)");
        assert_eq!(id.as_u64(), 3);
    }

    #[test]
    fn test_shared_is_singleton() {
        let a = shared().unwrap();
        let b = shared().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
