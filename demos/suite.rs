//! Example: Running a suite of resumable tasks
//!
//! This example runs three tasks on a dedicated looper thread. The second
//! task suspends and is finished later from another thread, the way a
//! hardware callback would answer a pending request.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use taskloop::prelude::*;

/// Prints every notification as it arrives.
struct Printer {
    finished: mpsc::Sender<()>,
}

impl ExecutorListener<u32> for Printer {
    fn before_task(&self, task: &Task<u32>) {
        println!("   ▶ {} starting", task.name());
    }

    fn after_task(&self, task: &Task<u32>, result: Option<u32>) {
        println!("   ✔ {} finished with {result:?}", task.name());
    }

    fn on_done(&self) {
        println!("   Suite done");
        let _ = self.finished.send(());
    }

    fn on_cancelled(&self) {
        println!("   Suite cancelled");
        let _ = self.finished.send(());
    }

    fn on_paused(&self) {
        println!("   Suite paused");
    }
}

fn main() -> taskloop::Result<()> {
    println!("🧰 taskloop - Suite Example\n");

    let (finished_tx, finished_rx) = mpsc::channel();
    let executor: Executor<u32> = Executor::with_listener(Arc::new(Printer {
        finished: finished_tx,
    }))?;

    executor.add(Task::from_fn("power-on", |task: &Task<u32>| task.on_done(0)));
    executor.add(Task::from_fn("read-card", |task: &Task<u32>| {
        println!("   … waiting for the reader");
        let task = task.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            task.on_done(42);
        });
    }));
    executor.add(Task::from_fn("power-off", |task: &Task<u32>| task.on_done(0)));

    executor.execute()?;

    if finished_rx.recv_timeout(Duration::from_secs(5)).is_err() {
        println!("   Suite did not finish in time");
    }
    executor.dispose();

    println!("\n✅ Suite example completed!");
    Ok(())
}
