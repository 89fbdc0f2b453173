//! Dedicated worker thread context.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::{Condvar, Mutex};

use super::{ExecutionContext, Job};
use crate::error::Result;

/// A named OS thread that runs posted jobs one at a time, in order.
///
/// The thread lives until [`quit`](ExecutionContext::quit) is called or the
/// last handle is dropped.
///
/// # Example
///
/// ```rust
/// use taskloop::context::{ExecutionContext, LooperThread};
/// use std::sync::mpsc;
///
/// let looper = LooperThread::spawn("worker").unwrap();
/// let (tx, rx) = mpsc::channel();
///
/// looper.post(Box::new(move || tx.send(7).unwrap()));
/// assert_eq!(rx.recv().unwrap(), 7);
///
/// looper.quit();
/// assert!(!looper.is_alive());
/// ```
pub struct LooperThread {
    name: String,
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

struct Shared {
    state: Mutex<LooperState>,
    notify: Condvar,
}

struct LooperState {
    queue: VecDeque<Job>,
    alive: bool,
}

impl LooperThread {
    /// Spawns a new looper thread with the given name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`](crate::Error::Spawn) if the OS refuses to
    /// start the thread.
    pub fn spawn(name: impl Into<String>) -> Result<Arc<Self>> {
        let name = name.into();
        let shared = Arc::new(Shared {
            state: Mutex::new(LooperState {
                queue: VecDeque::new(),
                alive: true,
            }),
            notify: Condvar::new(),
        });

        let worker = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || Self::run_loop(&worker))?;
        let thread_id = handle.thread().id();
        log::debug!("looper `{name}` started");

        Ok(Arc::new(Self {
            name,
            shared,
            handle: Mutex::new(Some(handle)),
            thread_id,
        }))
    }

    /// Returns the looper's thread name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if called from the looper thread itself.
    #[must_use]
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Returns the number of jobs waiting to run.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// Quits the looper and waits for its thread to exit.
    ///
    /// The job currently running, if any, is allowed to finish. Calling
    /// this from the looper thread only quits.
    pub fn join(&self) {
        self.quit();
        if self.is_current() {
            return;
        }
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                log::warn!("looper `{}` panicked", self.name);
            }
        }
    }

    fn run_loop(shared: &Shared) {
        loop {
            let job = {
                let mut state = shared.state.lock();
                loop {
                    if !state.alive {
                        return;
                    }
                    if let Some(job) = state.queue.pop_front() {
                        break job;
                    }
                    shared.notify.wait(&mut state);
                }
            };
            job();
        }
    }
}

impl ExecutionContext for LooperThread {
    fn post(&self, job: Job) -> bool {
        let mut state = self.shared.state.lock();
        if !state.alive {
            return false;
        }
        state.queue.push_back(job);
        self.shared.notify.notify_one();
        true
    }

    fn is_alive(&self) -> bool {
        self.shared.state.lock().alive
    }

    fn quit(&self) {
        let dropped = {
            let mut state = self.shared.state.lock();
            if !state.alive {
                return;
            }
            state.alive = false;
            self.shared.notify.notify_one();
            std::mem::take(&mut state.queue)
        };
        log::debug!(
            "looper `{}` quit, discarding {} queued job(s)",
            self.name,
            dropped.len()
        );
        // Job destructors may post again; drop them outside the lock.
        drop(dropped);
    }
}

impl Drop for LooperThread {
    fn drop(&mut self) {
        self.join();
    }
}

impl fmt::Debug for LooperThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LooperThread")
            .field("name", &self.name)
            .field("alive", &self.is_alive())
            .field("pending", &self.pending_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_runs_jobs_in_order() {
        let looper = LooperThread::spawn("test-order").unwrap();
        let (tx, rx) = mpsc::channel();

        for i in 0..5 {
            let tx = tx.clone();
            assert!(looper.post(Box::new(move || tx.send(i).unwrap())));
        }

        let received: Vec<_> = (0..5)
            .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
            .collect();
        assert_eq!(received, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_jobs_run_on_looper_thread() {
        let looper = LooperThread::spawn("test-thread").unwrap();
        let (tx, rx) = mpsc::channel();

        let inner = Arc::clone(&looper);
        looper.post(Box::new(move || tx.send(inner.is_current()).unwrap()));

        assert!(rx.recv_timeout(Duration::from_secs(2)).unwrap());
        assert!(!looper.is_current());
    }

    #[test]
    fn test_post_after_quit_is_rejected() {
        let looper = LooperThread::spawn("test-quit").unwrap();
        looper.quit();

        assert!(!looper.is_alive());
        assert!(!looper.post(Box::new(|| {})));
    }

    #[test]
    fn test_join_stops_thread() {
        let looper = LooperThread::spawn("test-join").unwrap();
        looper.join();
        assert!(!looper.is_alive());
        assert!(looper.handle.lock().is_none());
    }

    #[test]
    fn test_name_and_debug() {
        let looper = LooperThread::spawn("named").unwrap();
        assert_eq!(looper.name(), "named");
        assert!(format!("{looper:?}").contains("named"));
    }
}
