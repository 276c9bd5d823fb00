//! Cancellable progress timer
//!
//! A `ProgressTimer` owns a spawned task that sends its generation number on
//! every step. Dropping the timer aborts the task, so holding at most one
//! `ProgressTimer` guarantees at most one timer drives progress. Ticks that
//! were already queued when the timer was dropped carry an old generation and
//! are discarded by the session.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub struct ProgressTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

impl ProgressTimer {
    /// Start ticking every `step`, first tick one full step from now
    pub fn start(step: Duration, generation: u64, ticks: mpsc::UnboundedSender<u64>) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + step, step);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if ticks.send(generation).is_err() {
                    break;
                }
            }
        });
        tracing::trace!(generation, step_ms = step.as_millis() as u64, "Progress timer started");

        Self { generation, handle }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for ProgressTimer {
    fn drop(&mut self) {
        self.handle.abort();
        tracing::trace!(generation = self.generation, "Progress timer cancelled");
    }
}
