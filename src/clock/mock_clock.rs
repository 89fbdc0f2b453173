//! `MockClock` implementation for virtual time control.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use super::pending::PendingTimers;
use crate::timer::{Timer, TimerCallback, TimerId};

/// A mock clock that fires timers in virtual time.
///
/// `MockClock` implements [`Timer`], so it can stand in for a
/// [`TimerThread`](crate::timer::TimerThread) anywhere a watchdog is armed.
/// Timers fire synchronously, on the thread calling [`advance`], in deadline
/// order.
///
/// # Thread Safety
///
/// `MockClock` is thread-safe and can be cloned and shared across threads.
/// All clones share the same underlying time state.
///
/// # Example
///
/// ```rust
/// use taskloop::clock::MockClock;
/// use std::time::Duration;
///
/// // Create a new clock starting at time zero
/// let clock = MockClock::new();
/// assert_eq!(clock.now(), Duration::ZERO);
///
/// // Clone shares the same time
/// let clock2 = clock.clone();
/// clock2.advance(Duration::from_secs(5));
/// assert_eq!(clock.now(), Duration::from_secs(5));
/// ```
///
/// [`advance`]: MockClock::advance
#[derive(Debug, Clone)]
pub struct MockClock {
    inner: Arc<ClockInner>,
}

#[derive(Debug)]
struct ClockInner {
    /// Current time as duration since clock creation
    current_time: Mutex<Duration>,
    timers: Mutex<PendingTimers>,
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClock {
    /// Creates a new `MockClock` starting at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::with_start_time(Duration::ZERO)
    }

    /// Creates a new `MockClock` starting at the specified time.
    ///
    /// # Example
    ///
    /// ```rust
    /// use taskloop::clock::MockClock;
    /// use std::time::Duration;
    ///
    /// let clock = MockClock::with_start_time(Duration::from_secs(100));
    /// assert_eq!(clock.now(), Duration::from_secs(100));
    /// ```
    #[must_use]
    pub fn with_start_time(start: Duration) -> Self {
        Self {
            inner: Arc::new(ClockInner {
                current_time: Mutex::new(start),
                timers: Mutex::new(PendingTimers::new()),
            }),
        }
    }

    /// Returns the current virtual time.
    #[must_use]
    pub fn now(&self) -> Duration {
        *self.inner.current_time.lock()
    }

    /// Advances the clock by the specified duration, firing every timer
    /// whose deadline is reached.
    ///
    /// Timers scheduled by a firing callback also fire if they fall inside
    /// the advanced window.
    ///
    /// # Example
    ///
    /// ```rust
    /// use taskloop::clock::MockClock;
    /// use std::time::Duration;
    ///
    /// let clock = MockClock::new();
    /// clock.advance(Duration::from_secs(10));
    /// assert_eq!(clock.now(), Duration::from_secs(10));
    ///
    /// clock.advance(Duration::from_millis(500));
    /// assert_eq!(clock.now(), Duration::from_millis(10_500));
    /// ```
    pub fn advance(&self, duration: Duration) {
        let target = self.now() + duration;
        self.advance_to(target);
    }

    /// Advances the clock to a specific time.
    ///
    /// This method only moves time forward - if the specified time
    /// is less than or equal to the current time, this is a no-op.
    pub fn advance_to(&self, time: Duration) {
        if time <= self.now() {
            return;
        }
        loop {
            // Callbacks run outside both locks; they may schedule or cancel.
            let expired = self.inner.timers.lock().pop_expired(time);
            let Some((deadline, callback)) = expired else {
                break;
            };
            {
                let mut now = self.inner.current_time.lock();
                if deadline > *now {
                    *now = deadline;
                }
            }
            callback();
        }
        *self.inner.current_time.lock() = time;
    }

    /// Returns the number of timers waiting to fire.
    ///
    /// # Example
    ///
    /// ```rust
    /// use taskloop::clock::MockClock;
    /// use taskloop::timer::Timer;
    /// use std::time::Duration;
    ///
    /// let clock = MockClock::new();
    /// let id = clock.schedule(Duration::from_secs(1), Box::new(|| {}));
    /// assert_eq!(clock.pending_count(), 1);
    ///
    /// clock.cancel(id);
    /// assert_eq!(clock.pending_count(), 0);
    /// ```
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.timers.lock().pending_count()
    }

    /// Returns the virtual deadline of the next timer, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.inner.timers.lock().next_deadline()
    }
}

impl Timer for MockClock {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerId {
        let id = TimerId::new();
        let deadline = self.now() + delay;
        self.inner.timers.lock().register(id, deadline, callback);
        id
    }

    fn cancel(&self, id: TimerId) -> bool {
        self.inner.timers.lock().remove(id)
    }
}
