//! Virtual time control for watchdog tests
//!
//! The `clock` module provides [`MockClock`](crate::clock::MockClock), a
//! [`Timer`](crate::timer::Timer) whose timers fire only when the test
//! advances virtual time.
//!
//! # Example
//!
//! ```rust
//! use taskloop::clock::MockClock;
//! use taskloop::timer::Timer;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let clock = MockClock::new();
//! let fired = Arc::new(AtomicBool::new(false));
//!
//! let flag = Arc::clone(&fired);
//! clock.schedule(Duration::from_secs(5), Box::new(move || flag.store(true, Ordering::SeqCst)));
//!
//! clock.advance(Duration::from_secs(4));
//! assert!(!fired.load(Ordering::SeqCst));
//!
//! clock.advance(Duration::from_secs(1));
//! assert!(fired.load(Ordering::SeqCst));
//! ```

mod mock_clock;
mod pending;

pub use mock_clock::MockClock;
