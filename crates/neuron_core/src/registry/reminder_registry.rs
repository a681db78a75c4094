//! Reminder registry: specs and lifecycle by reminder ID.
//!
//! # Responsibility
//! - Mint reminder IDs and own every stored spec and draft.
//! - Keep the scheduler's job set consistent with stored specs.
//! - Track lifecycle stages and answer active/upcoming listings.
//!
//! # Invariants
//! - Only complete, valid drafts are armed.
//! - A failed re-arm leaves the previous spec and job in place.
//! - Deleted reminders keep a `Cancelled` tombstone; they never come back.

use crate::error::ReminderError;
use crate::model::reminder::{
    RecurrenceKind, ReminderDraft, ReminderId, ReminderLifecycle, ReminderSpec,
};
use crate::schedule::trigger::{ArmOutcome, TriggerScheduler};
use chrono::NaiveDateTime;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of a successful create or update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Stored, but incomplete; nothing armed.
    Draft,
    /// Stored and armed for the first time.
    Armed,
    /// Schedule changed; the previous job was superseded.
    Rescheduled,
    /// Schedule unchanged; at most the message was refreshed.
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Unknown or already deleted; nothing happened.
    NotFound,
}

/// One row of the upcoming-reminders listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingReminder {
    pub id: ReminderId,
    pub message: String,
    pub recurrence_kind: RecurrenceKind,
    pub next_fire_at: NaiveDateTime,
    pub interval_days: Option<u32>,
}

#[derive(Debug, Clone)]
struct RegistryEntry {
    draft: ReminderDraft,
    spec: Option<ReminderSpec>,
    lifecycle: ReminderLifecycle,
}

#[derive(Debug, Default)]
pub struct ReminderRegistry {
    entries: BTreeMap<ReminderId, RegistryEntry>,
}

impl ReminderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new reminder and arms it when the draft is complete.
    ///
    /// # Errors
    /// - `Validation`/`InvalidRecurrence` for bad fields; nothing is stored.
    /// - `SchedulerFault` when arming fails; nothing is stored.
    pub fn create(
        &mut self,
        draft: ReminderDraft,
        scheduler: &mut TriggerScheduler,
        now: NaiveDateTime,
    ) -> Result<(ReminderId, SaveOutcome), ReminderError> {
        if let Err(err) = draft.validate() {
            debug!("event=reminder_create module=registry status=rejected reason={err}");
            return Err(err.into());
        }

        let id = ReminderId::generate();
        let (spec, lifecycle, outcome) = if draft.is_complete() {
            let spec = draft.to_spec(id)?;
            scheduler.arm(&spec, now)?;
            (Some(spec), ReminderLifecycle::Scheduled, SaveOutcome::Armed)
        } else {
            (None, ReminderLifecycle::Draft, SaveOutcome::Draft)
        };

        info!(
            "event=reminder_create module=registry status=ok reminder_id={} kind={} stage={}",
            id,
            kind_label(spec.as_ref(), &draft),
            lifecycle
        );
        self.entries.insert(
            id,
            RegistryEntry {
                draft,
                spec,
                lifecycle,
            },
        );
        Ok((id, outcome))
    }

    /// Replaces the fields of an existing reminder.
    ///
    /// Schedule-relevant changes re-arm the job; message-only edits refresh
    /// the armed job in place. A draft that becomes incomplete is disarmed.
    ///
    /// # Errors
    /// - `NotFound` for unknown or cancelled IDs.
    /// - `Validation`/`InvalidRecurrence`/`SchedulerFault`; the previous spec
    ///   and job stay in place.
    pub fn update(
        &mut self,
        id: ReminderId,
        draft: ReminderDraft,
        scheduler: &mut TriggerScheduler,
        now: NaiveDateTime,
    ) -> Result<SaveOutcome, ReminderError> {
        let current = match self.entries.get(&id) {
            Some(entry) if !entry.lifecycle.is_terminal() => entry.spec.clone(),
            _ => return Err(ReminderError::NotFound(id)),
        };
        if let Err(err) = draft.validate() {
            debug!("event=reminder_update module=registry status=rejected reminder_id={id} reason={err}");
            return Err(err.into());
        }

        if !draft.is_complete() {
            scheduler.cancel(id);
            self.replace(id, draft, None, Some(ReminderLifecycle::Draft));
            return Ok(SaveOutcome::Draft);
        }

        let spec = draft.to_spec(id)?;
        let outcome = match current.as_ref() {
            Some(current) if current.same_schedule(&spec) => {
                scheduler.refresh_message(id, &spec.message);
                SaveOutcome::Unchanged
            }
            _ => match scheduler.arm(&spec, now)? {
                ArmOutcome::Armed => SaveOutcome::Armed,
                ArmOutcome::Replaced => SaveOutcome::Rescheduled,
                ArmOutcome::Unchanged => SaveOutcome::Unchanged,
            },
        };

        let lifecycle = match outcome {
            SaveOutcome::Armed | SaveOutcome::Rescheduled => Some(ReminderLifecycle::Scheduled),
            SaveOutcome::Draft | SaveOutcome::Unchanged => None,
        };
        info!(
            "event=reminder_update module=registry status=ok reminder_id={} kind={} outcome={:?}",
            id, spec.recurrence_kind, outcome
        );
        self.replace(id, draft, Some(spec), lifecycle);
        Ok(outcome)
    }

    fn replace(
        &mut self,
        id: ReminderId,
        draft: ReminderDraft,
        spec: Option<ReminderSpec>,
        lifecycle: Option<ReminderLifecycle>,
    ) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.draft = draft;
            entry.spec = spec;
            if let Some(lifecycle) = lifecycle {
                entry.lifecycle = lifecycle;
            }
        }
    }

    /// Cancels the job and tombstones the reminder. Idempotent.
    pub fn delete(&mut self, id: ReminderId, scheduler: &mut TriggerScheduler) -> DeleteOutcome {
        scheduler.cancel(id);
        match self.entries.get_mut(&id) {
            Some(entry) if !entry.lifecycle.is_terminal() => {
                let kind = entry.spec.as_ref().map(|spec| spec.recurrence_kind);
                entry.spec = None;
                entry.draft = ReminderDraft::default();
                entry.lifecycle = ReminderLifecycle::Cancelled;
                info!(
                    "event=reminder_delete module=registry status=ok reminder_id={} kind={}",
                    id,
                    kind.map_or("none", RecurrenceKind::as_str)
                );
                DeleteOutcome::Deleted
            }
            _ => {
                debug!("event=reminder_delete module=registry status=skipped reason=not_found reminder_id={id}");
                DeleteOutcome::NotFound
            }
        }
    }

    /// Stored spec for a live reminder.
    pub fn get(&self, id: ReminderId) -> Option<&ReminderSpec> {
        self.entries.get(&id).and_then(|entry| entry.spec.as_ref())
    }

    /// Stored draft fields for a live reminder.
    pub fn draft(&self, id: ReminderId) -> Option<&ReminderDraft> {
        self.entries
            .get(&id)
            .filter(|entry| !entry.lifecycle.is_terminal())
            .map(|entry| &entry.draft)
    }

    pub fn lifecycle(&self, id: ReminderId) -> Option<ReminderLifecycle> {
        self.entries.get(&id).map(|entry| entry.lifecycle)
    }

    /// Spec for a complete, live reminder, or `NotFound`.
    pub fn resolve(&self, id: ReminderId) -> Result<&ReminderSpec, ReminderError> {
        self.get(id).ok_or(ReminderError::NotFound(id))
    }

    pub fn mark_fired(&mut self, id: ReminderId) {
        self.transition(id, ReminderLifecycle::Fired);
    }

    pub fn mark_snoozed(&mut self, id: ReminderId) {
        self.transition(id, ReminderLifecycle::Snoozed);
    }

    /// Records an acknowledge; reminders with a live job go back to
    /// `Scheduled`, the rest end as `Acknowledged`.
    pub fn mark_acknowledged(&mut self, id: ReminderId, still_armed: bool) {
        let next = if still_armed {
            ReminderLifecycle::Scheduled
        } else {
            ReminderLifecycle::Acknowledged
        };
        self.transition(id, next);
    }

    /// Settles a `Fired` reminder whose notification was overwritten before
    /// anyone handled it, as if it had been acknowledged. Other stages are
    /// left alone.
    pub fn settle_unhandled(&mut self, id: ReminderId, still_armed: bool) {
        if self.lifecycle(id) == Some(ReminderLifecycle::Fired) {
            self.mark_acknowledged(id, still_armed);
        }
    }

    fn transition(&mut self, id: ReminderId, next: ReminderLifecycle) {
        let Some(entry) = self.entries.get_mut(&id) else {
            return;
        };
        if entry.lifecycle.is_terminal() || entry.spec.is_none() {
            return;
        }
        debug!(
            "event=lifecycle module=registry status=ok reminder_id={} from={} to={}",
            id, entry.lifecycle, next
        );
        entry.lifecycle = next;
    }

    /// Specs in an active stage (scheduled, fired or snoozed).
    ///
    /// The returned iterator is lazy and can be cloned to restart it.
    pub fn list_active(&self) -> impl Iterator<Item = &ReminderSpec> + Clone + '_ {
        self.entries
            .values()
            .filter(|entry| entry.lifecycle.is_active())
            .filter_map(|entry| entry.spec.as_ref())
    }

    /// Active reminders whose next instant is strictly after `now`.
    pub fn upcoming<'a>(
        &'a self,
        scheduler: &'a TriggerScheduler,
        now: NaiveDateTime,
    ) -> impl Iterator<Item = UpcomingReminder> + Clone + 'a {
        self.list_active().filter_map(move |spec| {
            let next_fire_at = scheduler.next_fire_at(spec.id)?;
            (next_fire_at > now).then(|| UpcomingReminder {
                id: spec.id,
                message: spec.message.clone(),
                recurrence_kind: spec.recurrence_kind,
                next_fire_at,
                interval_days: spec.interval_days,
            })
        })
    }

    /// Number of live (non-cancelled) reminders, drafts included.
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| !entry.lifecycle.is_terminal())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn kind_label(spec: Option<&ReminderSpec>, draft: &ReminderDraft) -> &'static str {
    spec.map(|spec| spec.recurrence_kind)
        .or(draft.recurrence_kind)
        .map_or("none", RecurrenceKind::as_str)
}

#[cfg(test)]
mod tests {
    use super::{DeleteOutcome, ReminderRegistry, SaveOutcome};
    use crate::error::ReminderError;
    use crate::model::reminder::{RecurrenceKind, ReminderDraft, ReminderId, ReminderLifecycle};
    use crate::schedule::trigger::TriggerScheduler;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 17)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn daily_draft(message: &str, hour: u32) -> ReminderDraft {
        ReminderDraft::new()
            .with_message(message)
            .with_kind(RecurrenceKind::Daily)
            .with_date(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap())
            .with_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap())
    }

    #[test]
    fn complete_draft_is_armed_on_create() {
        let mut registry = ReminderRegistry::new();
        let mut scheduler = TriggerScheduler::new();

        let (id, outcome) = registry
            .create(daily_draft("vitamins", 8), &mut scheduler, now())
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Armed);
        assert_eq!(registry.lifecycle(id), Some(ReminderLifecycle::Scheduled));
        assert!(scheduler.job(id).is_some());
    }

    #[test]
    fn settle_unhandled_only_moves_fired_reminders() {
        let mut registry = ReminderRegistry::new();
        let mut scheduler = TriggerScheduler::new();
        let (fired, _) = registry
            .create(daily_draft("vitamins", 8), &mut scheduler, now())
            .unwrap();
        let (waiting, _) = registry
            .create(daily_draft("stretch", 9), &mut scheduler, now())
            .unwrap();
        registry.mark_fired(fired);

        registry.settle_unhandled(fired, false);
        registry.settle_unhandled(waiting, false);
        assert_eq!(
            registry.lifecycle(fired),
            Some(ReminderLifecycle::Acknowledged)
        );
        assert_eq!(registry.lifecycle(waiting), Some(ReminderLifecycle::Scheduled));
        assert_eq!(registry.list_active().count(), 1);
    }

    #[test]
    fn incomplete_draft_is_stored_unarmed() {
        let mut registry = ReminderRegistry::new();
        let mut scheduler = TriggerScheduler::new();

        let draft = ReminderDraft::new().with_message("call mom");
        let (id, outcome) = registry.create(draft, &mut scheduler, now()).unwrap();
        assert_eq!(outcome, SaveOutcome::Draft);
        assert_eq!(registry.lifecycle(id), Some(ReminderLifecycle::Draft));
        assert!(scheduler.is_empty());
        assert_eq!(registry.list_active().count(), 0);
    }

    #[test]
    fn message_only_update_keeps_schedule() {
        let mut registry = ReminderRegistry::new();
        let mut scheduler = TriggerScheduler::new();
        let (id, _) = registry
            .create(daily_draft("vitamins", 8), &mut scheduler, now())
            .unwrap();
        let before = scheduler.next_fire_at(id);

        let outcome = registry
            .update(id, daily_draft("vitamins + water", 8), &mut scheduler, now())
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Unchanged);
        assert_eq!(scheduler.next_fire_at(id), before);
        assert_eq!(scheduler.job(id).unwrap().message, "vitamins + water");
    }

    #[test]
    fn schedule_change_rearms() {
        let mut registry = ReminderRegistry::new();
        let mut scheduler = TriggerScheduler::new();
        let (id, _) = registry
            .create(daily_draft("vitamins", 8), &mut scheduler, now())
            .unwrap();

        let outcome = registry
            .update(id, daily_draft("vitamins", 21), &mut scheduler, now())
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Rescheduled);
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn failed_rearm_keeps_last_known_good_schedule() {
        let mut registry = ReminderRegistry::new();
        let mut scheduler = TriggerScheduler::new();
        let (id, _) = registry
            .create(daily_draft("vitamins", 8), &mut scheduler, now())
            .unwrap();
        let before = scheduler.next_fire_at(id);

        let unreachable = ReminderDraft::new()
            .with_message("vitamins")
            .with_kind(RecurrenceKind::EveryNDays)
            .with_date(NaiveDate::from_ymd_opt(2000, 1, 1).unwrap())
            .with_time(NaiveTime::from_hms_opt(8, 0, 0).unwrap())
            .with_interval_days(u32::MAX);
        let err = registry
            .update(id, unreachable, &mut scheduler, now())
            .unwrap_err();

        assert!(matches!(err, ReminderError::SchedulerFault { .. }));
        assert_eq!(scheduler.next_fire_at(id), before);
        assert_eq!(
            registry.get(id).map(|spec| spec.recurrence_kind),
            Some(RecurrenceKind::Daily)
        );
    }

    #[test]
    fn delete_is_idempotent_and_blocks_updates() {
        let mut registry = ReminderRegistry::new();
        let mut scheduler = TriggerScheduler::new();
        let (id, _) = registry
            .create(daily_draft("vitamins", 8), &mut scheduler, now())
            .unwrap();

        assert_eq!(registry.delete(id, &mut scheduler), DeleteOutcome::Deleted);
        assert_eq!(registry.delete(id, &mut scheduler), DeleteOutcome::NotFound);
        assert_eq!(registry.lifecycle(id), Some(ReminderLifecycle::Cancelled));
        assert!(scheduler.is_empty());

        let err = registry
            .update(id, daily_draft("again", 8), &mut scheduler, now())
            .unwrap_err();
        assert_eq!(err, ReminderError::NotFound(id));
    }

    #[test]
    fn delete_unknown_id_is_noop() {
        let mut registry = ReminderRegistry::new();
        let mut scheduler = TriggerScheduler::new();
        assert_eq!(
            registry.delete(ReminderId::generate(), &mut scheduler),
            DeleteOutcome::NotFound
        );
    }

    #[test]
    fn upcoming_iterator_can_be_restarted() {
        let mut registry = ReminderRegistry::new();
        let mut scheduler = TriggerScheduler::new();
        registry
            .create(daily_draft("vitamins", 8), &mut scheduler, now())
            .unwrap();
        registry
            .create(daily_draft("stretch", 9), &mut scheduler, now())
            .unwrap();

        let upcoming = registry.upcoming(&scheduler, now());
        assert_eq!(upcoming.clone().count(), 2);
        assert_eq!(upcoming.count(), 2);
    }
}
