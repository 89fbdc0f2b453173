//! Pending virtual timers.

use std::collections::BinaryHeap;
use std::fmt;
use std::time::Duration;

use crate::timer::{TimerCallback, TimerId};

/// A pending timer entry in the timer queue.
struct TimerEntry {
    /// The virtual deadline when this timer fires
    deadline: Duration,
    /// Unique ID for this timer (for ordering and cancellation)
    id: TimerId,
    callback: TimerCallback,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.id == other.id
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse order for min-heap behavior (earliest deadline first)
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Internal state for managing virtual timers.
#[derive(Default)]
pub(crate) struct PendingTimers {
    /// Priority queue of pending timers (min-heap by deadline)
    pending: BinaryHeap<TimerEntry>,
}

impl PendingTimers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a new timer
    pub(crate) fn register(&mut self, id: TimerId, deadline: Duration, callback: TimerCallback) {
        self.pending.push(TimerEntry {
            deadline,
            id,
            callback,
        });
    }

    /// Pop the earliest timer whose deadline has passed
    pub(crate) fn pop_expired(&mut self, current_time: Duration) -> Option<(Duration, TimerCallback)> {
        if self.pending.peek()?.deadline <= current_time {
            self.pending.pop().map(|entry| (entry.deadline, entry.callback))
        } else {
            None
        }
    }

    /// Remove a timer entry, returning whether it was present
    pub(crate) fn remove(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        let entries: Vec<_> = self.pending.drain().filter(|e| e.id != id).collect();
        let removed = entries.len() != before;
        self.pending.extend(entries);
        removed
    }

    /// Get the number of pending timers
    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Deadline of the next timer to fire
    pub(crate) fn next_deadline(&self) -> Option<Duration> {
        self.pending.peek().map(|entry| entry.deadline)
    }
}

impl fmt::Debug for PendingTimers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTimers")
            .field("pending", &self.pending.len())
            .field("next_deadline", &self.next_deadline())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_expired_in_deadline_order() {
        let mut timers = PendingTimers::new();
        timers.register(TimerId::new(), Duration::from_secs(3), Box::new(|| {}));
        timers.register(TimerId::new(), Duration::from_secs(1), Box::new(|| {}));
        timers.register(TimerId::new(), Duration::from_secs(2), Box::new(|| {}));

        let now = Duration::from_secs(2);
        let first = timers.pop_expired(now).map(|(deadline, _)| deadline);
        let second = timers.pop_expired(now).map(|(deadline, _)| deadline);
        assert_eq!(first, Some(Duration::from_secs(1)));
        assert_eq!(second, Some(Duration::from_secs(2)));
        assert!(timers.pop_expired(now).is_none());
        assert_eq!(timers.pending_count(), 1);
    }

    #[test]
    fn test_remove() {
        let mut timers = PendingTimers::new();
        let id = TimerId::new();
        timers.register(id, Duration::from_secs(1), Box::new(|| {}));

        assert!(timers.remove(id));
        assert!(!timers.remove(id));
        assert_eq!(timers.pending_count(), 0);
        assert_eq!(timers.next_deadline(), None);
    }
}
