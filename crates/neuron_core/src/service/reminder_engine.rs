//! Reminder engine facade.
//!
//! # Responsibility
//! - Provide the inbound operations a presentation layer calls: save, delete,
//!   list upcoming, poll, acknowledge and snooze.
//! - Run scheduler passes and dispatch fire callbacks.
//!
//! # Invariants
//! - Registry and scheduler share one mutex; every job mutation goes
//!   through it.
//! - The notification slot has its own lock; polling never waits on
//!   scheduling work.
//! - Fire callbacks run after the state lock is released and after the
//!   notification slot is updated for the whole pass. A failing or panicking
//!   callback is logged and never stops other fires.

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::ReminderResult;
use crate::logging::describe_panic;
use crate::model::notification::NotificationRecord;
use crate::model::reminder::{ReminderDraft, ReminderId, ReminderLifecycle, ReminderSpec};
use crate::notification::state::{AckOutcome, NotificationState, SnoozeOutcome};
use crate::registry::reminder_registry::{
    DeleteOutcome, ReminderRegistry, SaveOutcome, UpcomingReminder,
};
use crate::schedule::trigger::{FireEvent, ScheduledJob, TriggerScheduler};
use chrono::NaiveDateTime;
use log::{error, info};
use std::error::Error;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

pub type FireHandlerError = Box<dyn Error + Send + Sync>;

/// Observer invoked once per fire, after the notification slot is updated.
pub trait FireHandler: Send + Sync {
    fn on_fire(&self, event: &FireEvent) -> Result<(), FireHandlerError>;
}

impl<F> FireHandler for F
where
    F: Fn(&FireEvent) -> Result<(), FireHandlerError> + Send + Sync,
{
    fn on_fire(&self, event: &FireEvent) -> Result<(), FireHandlerError> {
        self(event)
    }
}

#[derive(Debug, Default)]
struct EngineState {
    registry: ReminderRegistry,
    scheduler: TriggerScheduler,
}

/// Process-local reminder core. Share it behind an `Arc`.
pub struct ReminderEngine {
    state: Mutex<EngineState>,
    notifications: NotificationState,
    handlers: RwLock<Vec<Arc<dyn FireHandler>>>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl ReminderEngine {
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        info!(
            "event=engine_init module=engine status=ok tick_ms={} poll_ms={} snooze_ms={}",
            config.tick_resolution.as_millis(),
            config.poll_interval.as_millis(),
            config.snooze_delay.as_millis()
        );
        Self {
            state: Mutex::new(EngineState::default()),
            notifications: NotificationState::new(),
            handlers: RwLock::new(Vec::new()),
            clock,
            config,
        }
    }

    pub fn with_system_clock(config: EngineConfig) -> Self {
        Self::new(config, Arc::new(SystemClock))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Stores a new reminder; complete drafts are armed immediately.
    pub fn create_reminder(&self, draft: ReminderDraft) -> ReminderResult<ReminderId> {
        self.create_or_update_reminder(None, draft).map(|(id, _)| id)
    }

    /// Replaces an existing reminder's fields.
    pub fn update_reminder(
        &self,
        id: ReminderId,
        draft: ReminderDraft,
    ) -> ReminderResult<SaveOutcome> {
        self.create_or_update_reminder(Some(id), draft)
            .map(|(_, outcome)| outcome)
    }

    /// Creates when `id` is `None`, otherwise updates that reminder.
    pub fn create_or_update_reminder(
        &self,
        id: Option<ReminderId>,
        draft: ReminderDraft,
    ) -> ReminderResult<(ReminderId, SaveOutcome)> {
        let now = self.now();
        let mut state = self.lock_state();
        let EngineState {
            registry,
            scheduler,
        } = &mut *state;
        match id {
            Some(id) => registry
                .update(id, draft, scheduler, now)
                .map(|outcome| (id, outcome)),
            None => registry.create(draft, scheduler, now),
        }
    }

    /// Cancels and forgets a reminder. Unknown IDs report `NotFound`.
    pub fn delete_reminder(&self, id: ReminderId) -> DeleteOutcome {
        let mut state = self.lock_state();
        let EngineState {
            registry,
            scheduler,
        } = &mut *state;
        registry.delete(id, scheduler)
    }

    /// Active reminders due strictly after `now`, soonest first.
    pub fn list_upcoming(&self, now: NaiveDateTime) -> Vec<UpcomingReminder> {
        let state = self.lock_state();
        let mut upcoming: Vec<UpcomingReminder> =
            state.registry.upcoming(&state.scheduler, now).collect();
        upcoming.sort_by(|a, b| a.next_fire_at.cmp(&b.next_fire_at).then(a.id.cmp(&b.id)));
        upcoming
    }

    /// Pending notification, if any. Does not consume it.
    pub fn poll_notification(&self) -> Option<NotificationRecord> {
        self.notifications.peek()
    }

    /// Clears the pending notification.
    pub fn acknowledge(&self) -> AckOutcome {
        let outcome = self.notifications.acknowledge();
        if let AckOutcome::Cleared(id) = outcome {
            let mut state = self.lock_state();
            let still_armed = state.scheduler.job(id).is_some();
            state.registry.mark_acknowledged(id, still_armed);
        }
        outcome
    }

    /// Re-fires the pending notification's reminder after the snooze delay.
    ///
    /// # Errors
    /// - `NotFound` when the pending reminder was deleted meanwhile; the
    ///   notification stays pending.
    pub fn snooze(&self) -> ReminderResult<SnoozeOutcome> {
        self.notifications
            .snooze(self.config.snooze_delta(), |record, target| {
                let mut state = self.lock_state();
                let EngineState {
                    registry,
                    scheduler,
                } = &mut *state;
                let spec = registry.resolve(record.reminder_id)?.clone();
                scheduler.arm_at(&spec, target)?;
                registry.mark_snoozed(spec.id);
                Ok(())
            })
    }

    /// Runs one scheduler pass at the clock's current instant.
    pub fn tick(&self) -> usize {
        self.tick_at(self.now())
    }

    /// Runs one scheduler pass at `now` and returns the number of fires.
    ///
    /// Fire handlers run inline before this returns.
    pub fn tick_at(&self, now: NaiveDateTime) -> usize {
        let events = self.fire_due(now);
        self.notify_handlers(&events);
        events.len()
    }

    /// Advances every job due at `now` and records the notification slot,
    /// without running fire handlers.
    ///
    /// Pair with `notify_handlers`; the background runner uses the split so
    /// slow observers never hold up the timing loop.
    pub fn fire_due(&self, now: NaiveDateTime) -> Vec<FireEvent> {
        let events = {
            let mut state = self.lock_state();
            let EngineState {
                registry,
                scheduler,
            } = &mut *state;
            let events = scheduler.collect_due(now);
            for event in &events {
                registry.mark_fired(event.reminder_id);
            }
            events
        };
        if events.is_empty() {
            return events;
        }

        let mut superseded = Vec::new();
        for event in &events {
            info!(
                "event=fire module=engine status=ok reminder_id={} kind={} fired_at={} scheduled_for={} next_fire_at={}",
                event.reminder_id,
                event.recurrence_kind,
                event.fired_at,
                event.scheduled_for,
                event
                    .next_fire_at
                    .map_or_else(|| "none".to_string(), |next| next.to_string())
            );
            let replaced = self.notifications.record_fired(NotificationRecord {
                reminder_id: event.reminder_id,
                display_message: event.message.clone(),
                fired_at: event.fired_at,
                recurrence_kind: event.recurrence_kind,
            });
            if let Some(lost) = replaced.filter(|lost| lost.reminder_id != event.reminder_id) {
                superseded.push(lost.reminder_id);
            }
        }

        // Overwritten notifications will never be acknowledged; settle them.
        let pending = self.notifications.peek().map(|record| record.reminder_id);
        superseded.retain(|id| Some(*id) != pending);
        if !superseded.is_empty() {
            let mut state = self.lock_state();
            for id in superseded {
                let still_armed = state.scheduler.job(id).is_some();
                state.registry.settle_unhandled(id, still_armed);
            }
        }
        events
    }

    /// Runs every registered fire handler for each event, isolating failures.
    pub fn notify_handlers(&self, events: &[FireEvent]) {
        if events.is_empty() {
            return;
        }
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for event in events {
            for (index, handler) in handlers.iter().enumerate() {
                match panic::catch_unwind(AssertUnwindSafe(|| handler.on_fire(event))) {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => error!(
                        "event=fire_callback module=engine status=error reminder_id={} kind={} handler={} error={}",
                        event.reminder_id, event.recurrence_kind, index, err
                    ),
                    Err(payload) => error!(
                        "event=fire_callback module=engine status=error reminder_id={} kind={} handler={} panic={}",
                        event.reminder_id,
                        event.recurrence_kind,
                        index,
                        describe_panic(payload.as_ref())
                    ),
                }
            }
        }
    }

    pub fn has_fire_handlers(&self) -> bool {
        !self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Registers an extra fire observer.
    pub fn add_fire_handler(&self, handler: Arc<dyn FireHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    /// Earliest armed instant across all reminders.
    pub fn next_wakeup(&self) -> Option<NaiveDateTime> {
        self.lock_state().scheduler.next_due()
    }

    pub fn get_reminder(&self, id: ReminderId) -> Option<ReminderSpec> {
        self.lock_state().registry.get(id).cloned()
    }

    pub fn get_draft(&self, id: ReminderId) -> Option<ReminderDraft> {
        self.lock_state().registry.draft(id).cloned()
    }

    pub fn lifecycle(&self, id: ReminderId) -> Option<ReminderLifecycle> {
        self.lock_state().registry.lifecycle(id)
    }

    /// Live reminders, drafts included.
    pub fn reminder_count(&self) -> usize {
        self.lock_state().registry.len()
    }

    pub fn scheduled_job_count(&self) -> usize {
        self.lock_state().scheduler.len()
    }

    pub fn job_snapshot(&self) -> Vec<ScheduledJob> {
        self.lock_state().scheduler.snapshot()
    }

    /// Replaces the job set, e.g. when re-attaching a captured snapshot.
    ///
    /// Jobs for reminders the registry does not hold make the whole set
    /// corrupted; like any corrupted set it is discarded and the engine
    /// continues with no scheduled jobs. Returns the number of restored jobs.
    pub fn restore_jobs(&self, jobs: Vec<ScheduledJob>) -> usize {
        let mut state = self.lock_state();
        let orphan = jobs
            .iter()
            .find(|job| state.registry.get(job.reminder_id).is_none())
            .map(|job| job.reminder_id);

        state.scheduler = match orphan {
            Some(reminder_id) => {
                error!(
                    "event=job_restore module=engine status=error reason=unknown_reminder reminder_id={reminder_id}"
                );
                TriggerScheduler::new()
            }
            None => TriggerScheduler::from_jobs(jobs),
        };

        state.scheduler.len()
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ReminderEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderEngine")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
