//! Example: Watchdogs in virtual time
//!
//! This example drives an executor entirely from `main` with a
//! `ManualLooper` and a `MockClock`. A task that never gets its answer is
//! finished by its watchdog, without waiting for real time to pass.

use std::sync::Arc;
use std::time::Duration;

use taskloop::prelude::*;

/// Sends a request and waits for an answer that never comes.
struct Request {
    timeout: Duration,
}

impl Runnable<u32> for Request {
    fn execute(&mut self, task: &Task<u32>) {
        println!("   Request sent, watchdog armed for {:?}", self.timeout);
        if let Err(err) = task.set_watchdog(self.timeout, 408, 1) {
            println!("   Could not arm the watchdog: {err}");
            task.on_cancel(None);
        }
    }

    fn on_timeout(&mut self, task: &Task<u32>, timeout: Timeout<u32>) {
        println!(
            "   Watchdog #{} fired after {:?}",
            timeout.tag(),
            timeout.delay()
        );
        task.on_done(timeout.into_param());
    }
}

fn main() -> taskloop::Result<()> {
    println!("🧰 taskloop - Watchdog Example\n");

    let looper = Arc::new(ManualLooper::new());
    let clock = MockClock::new();
    let executor: Executor<u32> = Executor::new(looper.clone(), Arc::new(clock.clone()));
    let recorder = Arc::new(RecordingListener::new());
    executor.set_listener(recorder.clone());

    executor.add(Task::new(
        "request",
        Request {
            timeout: Duration::from_secs(30),
        },
    ));
    executor.execute()?;
    looper.run_until_idle();

    println!("   Advancing the clock by 30s");
    clock.advance(Duration::from_secs(30));
    looper.run_until_idle();

    for line in recorder.trace() {
        println!("   {line}");
    }
    println!("   Virtual time: {:?}", clock.now());

    println!("\n✅ Watchdog example completed!");
    Ok(())
}
