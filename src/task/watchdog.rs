//! Per-task watchdog.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::timer::{Timer, TimerId};

/// Information carried by a fired watchdog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Timeout<V> {
    param: V,
    tag: u32,
    delay: Duration,
}

impl<V> Timeout<V> {
    pub(crate) fn new(param: V, tag: u32, delay: Duration) -> Self {
        Self { param, tag, delay }
    }

    /// The value to finish the task with.
    #[must_use]
    pub fn param(&self) -> &V {
        &self.param
    }

    /// Consumes the timeout, returning its value.
    #[must_use]
    pub fn into_param(self) -> V {
        self.param
    }

    /// Caller-defined tag given when the watchdog was armed.
    #[must_use]
    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// The delay the watchdog was armed with.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// An armed watchdog. Only the generation it was armed with may fire it.
pub(crate) struct Watchdog {
    pub(crate) generation: u64,
    id: TimerId,
    timer: Arc<dyn Timer>,
}

impl Watchdog {
    pub(crate) fn new(generation: u64, id: TimerId, timer: Arc<dyn Timer>) -> Self {
        Self {
            generation,
            id,
            timer,
        }
    }

    /// Cancels the underlying timer, dropping its callback.
    pub(crate) fn disarm(self) {
        self.timer.cancel(self.id);
    }
}

impl fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watchdog")
            .field("generation", &self.generation)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_accessors() {
        let timeout = Timeout::new("late", 7, Duration::from_millis(250));
        assert_eq!(*timeout.param(), "late");
        assert_eq!(timeout.tag(), 7);
        assert_eq!(timeout.delay(), Duration::from_millis(250));
        assert_eq!(timeout.into_param(), "late");
    }
}
