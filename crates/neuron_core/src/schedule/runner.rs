//! Background tick loop.
//!
//! # Responsibility
//! - Drive `ReminderEngine::fire_due` at the configured resolution on a
//!   tokio runtime and hand fire handlers off the loop.
//! - Stop cleanly on request.
//!
//! # Invariants
//! - Exactly one pass runs at a time per runner.
//! - The loop only advances jobs and records the notification slot; fire
//!   handlers run on the blocking pool so slow observers never delay a tick.
//! - Missed ticks are skipped, not replayed; the scheduler itself catches up
//!   on overdue jobs in a single pass.

use crate::service::reminder_engine::ReminderEngine;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Debug)]
pub struct SchedulerRunner {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SchedulerRunner {
    /// Spawns the loop on the current runtime.
    ///
    /// Panics when called outside a tokio runtime, like `tokio::spawn`.
    pub fn spawn(engine: Arc<ReminderEngine>) -> Self {
        Self::spawn_on(&Handle::current(), engine)
    }

    pub fn spawn_on(runtime: &Handle, engine: Arc<ReminderEngine>) -> Self {
        let (shutdown, signal) = watch::channel(false);
        let handle = runtime.spawn(run_loop(engine, signal));
        Self { shutdown, handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signals the loop and waits for the in-flight pass to finish.
    pub async fn shutdown(self) {
        // Err means the loop already exited.
        let _ = self.shutdown.send(true);
        if let Err(err) = self.handle.await {
            warn!("event=runner_stop module=schedule status=error error={err}");
        }
    }
}

async fn run_loop(engine: Arc<ReminderEngine>, mut signal: watch::Receiver<bool>) {
    let resolution = engine.config().tick_resolution;
    let mut ticker = interval(resolution);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(
        "event=runner_start module=schedule status=ok tick_ms={}",
        resolution.as_millis()
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let events = engine.fire_due(engine.now());
                if !events.is_empty() {
                    debug!("event=tick module=schedule status=ok fired={}", events.len());
                }
                if !events.is_empty() && engine.has_fire_handlers() {
                    let engine = Arc::clone(&engine);
                    tokio::task::spawn_blocking(move || engine.notify_handlers(&events));
                }
            }
            changed = signal.changed() => {
                if changed.is_err() || *signal.borrow() {
                    break;
                }
            }
        }
    }

    info!("event=runner_stop module=schedule status=ok");
}
