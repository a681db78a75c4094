//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `neuron_core` linkage without the Flutter/FFI runtime.
//! - Walk one reminder through fire, snooze and acknowledge on the real clock.

use neuron_core::{
    AckOutcome, EngineConfig, FireEvent, FireHandlerError, RecurrenceKind, ReminderDraft,
    ReminderEngine, SchedulerRunner, SnoozeOutcome,
};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Instant};

const DEMO_DEADLINE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> ExitCode {
    println!("neuron_core ping={}", neuron_core::ping());
    println!("neuron_core version={}", neuron_core::core_version());

    let engine = Arc::new(ReminderEngine::with_system_clock(EngineConfig::from_env()));
    engine.add_fire_handler(Arc::new(
        |event: &FireEvent| -> Result<(), FireHandlerError> {
            println!(
                "fired reminder={} kind={} at={}",
                event.reminder_id, event.recurrence_kind, event.fired_at
            );
            Ok(())
        },
    ));

    let now = engine.now();
    let draft = ReminderDraft::new()
        .with_message("neuron demo reminder")
        .with_kind(RecurrenceKind::Once)
        .with_date(now.date())
        .with_time(now.time());
    let id = match engine.create_reminder(draft) {
        Ok(id) => id,
        Err(err) => {
            eprintln!("create failed: {err}");
            return ExitCode::FAILURE;
        }
    };
    println!("created reminder={id}");

    let runner = SchedulerRunner::spawn(Arc::clone(&engine));
    let deadline = Instant::now() + DEMO_DEADLINE;
    let mut poll = interval(engine.config().poll_interval);
    let mut snoozed = false;
    let mut finished = false;

    while Instant::now() < deadline {
        poll.tick().await;
        let Some(record) = engine.poll_notification() else {
            continue;
        };
        println!("notification: {}", record.display_message);

        if !snoozed {
            match engine.snooze() {
                Ok(SnoozeOutcome::Snoozed { next_fire_at, .. }) => {
                    println!("snoozed until {next_fire_at}");
                    snoozed = true;
                }
                Ok(SnoozeOutcome::NothingPending) => {}
                Err(err) => {
                    eprintln!("snooze failed: {err}");
                    break;
                }
            }
            continue;
        }

        if let AckOutcome::Cleared(cleared) = engine.acknowledge() {
            println!("acknowledged reminder={cleared}");
        }
        finished = true;
        break;
    }

    runner.shutdown().await;
    if finished {
        ExitCode::SUCCESS
    } else {
        eprintln!("demo did not complete within {}s", DEMO_DEADLINE.as_secs());
        ExitCode::FAILURE
    }
}
