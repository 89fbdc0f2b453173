//! Test doubles for executor listeners.
//!
//! - [`RecordingListener`] - records every notification, with timestamps
//! - [`Event`] - one recorded notification
//!
//! # Example
//!
//! ```rust
//! use taskloop::executor::ExecutorListener;
//! use taskloop::mock::{Event, RecordingListener};
//!
//! let recorder = RecordingListener::<u8>::new();
//! recorder.on_paused();
//! recorder.on_done();
//!
//! assert_eq!(recorder.events(), vec![Event::Paused, Event::Done]);
//! assert_eq!(recorder.trace(), vec!["paused", "done"]);
//! ```

mod recorder;

pub use recorder::{Event, Record, RecordingListener};
