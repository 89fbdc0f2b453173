//! Caller-driven execution context.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::{ExecutionContext, Job};

/// An execution context whose jobs run only when the caller drives it.
///
/// Unlike [`LooperThread`](super::LooperThread), posting never runs
/// anything. Call [`step`](ManualLooper::step) or
/// [`run_until_idle`](ManualLooper::run_until_idle) to execute queued jobs
/// on the current thread, in posting order. Jobs posted while a job runs
/// are queued behind it.
///
/// # Example
///
/// ```rust
/// use taskloop::context::{ExecutionContext, ManualLooper};
///
/// let looper = ManualLooper::new();
/// looper.post(Box::new(|| {}));
/// looper.post(Box::new(|| {}));
///
/// assert_eq!(looper.pending_count(), 2);
/// assert!(looper.step());
/// assert_eq!(looper.run_until_idle(), 1);
/// assert!(!looper.step());
/// ```
#[derive(Default)]
pub struct ManualLooper {
    queue: Mutex<VecDeque<Job>>,
    quit: AtomicBool,
}

impl ManualLooper {
    /// Creates a new, empty looper.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the oldest queued job.
    ///
    /// Returns `true` if a job ran, `false` if the queue was empty or the
    /// looper has quit.
    pub fn step(&self) -> bool {
        if self.quit.load(Ordering::Acquire) {
            return false;
        }
        let job = self.queue.lock().pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Runs jobs until none are left, including jobs posted along the way.
    ///
    /// Returns the number of jobs executed.
    pub fn run_until_idle(&self) -> usize {
        let mut count = 0;
        while self.step() {
            count += 1;
        }
        count
    }

    /// Returns the number of queued jobs.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.queue.lock().len()
    }

    /// Returns true if no job is queued.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending_count() == 0
    }
}

impl ExecutionContext for ManualLooper {
    fn post(&self, job: Job) -> bool {
        if self.quit.load(Ordering::Acquire) {
            return false;
        }
        self.queue.lock().push_back(job);
        true
    }

    fn is_alive(&self) -> bool {
        !self.quit.load(Ordering::Acquire)
    }

    fn quit(&self) {
        self.quit.store(true, Ordering::Release);
        let dropped = std::mem::take(&mut *self.queue.lock());
        drop(dropped);
    }
}

impl fmt::Debug for ManualLooper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualLooper")
            .field("pending", &self.pending_count())
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_new_looper_is_idle() {
        let looper = ManualLooper::new();
        assert!(looper.is_idle());
        assert!(looper.is_alive());
        assert!(!looper.step());
    }

    #[test]
    fn test_jobs_run_in_posting_order() {
        let looper = ManualLooper::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = Arc::clone(&order);
            looper.post(Box::new(move || order.lock().push(i)));
        }

        assert_eq!(looper.run_until_idle(), 3);
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_job_posted_from_job_runs_after_it() {
        let looper = Arc::new(ManualLooper::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        let inner_looper = Arc::clone(&looper);
        let inner_order = Arc::clone(&order);
        looper.post(Box::new(move || {
            inner_order.lock().push("outer");
            let order = Arc::clone(&inner_order);
            inner_looper.post(Box::new(move || order.lock().push("inner")));
        }));

        assert!(looper.step());
        assert_eq!(*order.lock(), vec!["outer"]);
        assert_eq!(looper.pending_count(), 1);

        assert_eq!(looper.run_until_idle(), 1);
        assert_eq!(*order.lock(), vec!["outer", "inner"]);
    }

    #[test]
    fn test_quit_discards_queue() {
        let looper = ManualLooper::new();
        looper.post(Box::new(|| panic!("must not run")));

        looper.quit();

        assert!(!looper.is_alive());
        assert!(looper.is_idle());
        assert!(!looper.post(Box::new(|| {})));
        assert_eq!(looper.run_until_idle(), 0);
    }

    #[test]
    fn test_debug() {
        let looper = ManualLooper::new();
        looper.post(Box::new(|| {}));
        let debug = format!("{looper:?}");
        assert!(debug.contains("ManualLooper"));
        assert!(debug.contains("pending"));
    }
}
