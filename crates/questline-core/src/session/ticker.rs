//! Fixed-interval tick source.
//!
//! Ticks carry no payload: each one only prompts the host to call
//! `SessionEngine::tick()`, which recomputes elapsed time from timestamps.
//! Late ticks are skipped rather than bunched up.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Handle to a running ticker task. Dropping it stops the task.
#[derive(Debug)]
pub struct Ticker {
    rx: mpsc::Receiver<()>,
    task: JoinHandle<()>,
}

impl Ticker {
    /// Spawn the ticker on the current tokio runtime.
    pub fn spawn(period: Duration) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let task = tokio::spawn(async move {
            let mut ticks = interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick of a tokio interval completes immediately.
            ticks.tick().await;
            loop {
                ticks.tick().await;
                match tx.try_send(()) {
                    Ok(()) | Err(mpsc::error::TrySendError::Full(())) => {}
                    Err(mpsc::error::TrySendError::Closed(())) => break,
                }
            }
        });
        Self { rx, task }
    }

    /// Wait for the next tick. Returns `None` once the task has stopped.
    pub async fn tick(&mut self) -> Option<()> {
        self.rx.recv().await
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
