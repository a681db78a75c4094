//! Single pending-notification slot.
//!
//! # Responsibility
//! - Hold the most recent fired-but-unhandled reminder for pollers.
//! - Apply acknowledge and snooze transitions to that slot.
//!
//! # Invariants
//! - At most one record is pending. A new fire overwrites an unhandled one
//!   (last-fired-wins); records are never queued.
//! - `peek` never mutates and only takes a read lock.
//! - The slot lock is independent of the scheduler lock and is never held
//!   while calling back into the scheduler.

use crate::error::ReminderError;
use crate::model::notification::NotificationRecord;
use crate::model::reminder::ReminderId;
use chrono::{NaiveDateTime, TimeDelta};
use log::{debug, info, warn};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    Cleared(ReminderId),
    NothingPending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnoozeOutcome {
    Snoozed {
        reminder_id: ReminderId,
        next_fire_at: NaiveDateTime,
    },
    NothingPending,
}

#[derive(Debug, Default)]
pub struct NotificationState {
    slot: RwLock<Option<NotificationRecord>>,
}

impl NotificationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `record`, returning the unacknowledged record it replaced.
    pub fn record_fired(&self, record: NotificationRecord) -> Option<NotificationRecord> {
        let reminder_id = record.reminder_id;
        let replaced = self.write_slot().replace(record);
        if let Some(lost) = replaced.as_ref() {
            warn!(
                "event=notification_overwrite module=notification status=ok reminder_id={} replaced_reminder_id={} kind={}",
                reminder_id, lost.reminder_id, lost.recurrence_kind
            );
        }
        replaced
    }

    /// Current pending record, if any.
    pub fn peek(&self) -> Option<NotificationRecord> {
        self.read_slot().clone()
    }

    pub fn has_pending(&self) -> bool {
        self.read_slot().is_some()
    }

    /// Clears the pending record.
    pub fn acknowledge(&self) -> AckOutcome {
        match self.write_slot().take() {
            Some(record) => {
                info!(
                    "event=acknowledge module=notification status=ok reminder_id={} kind={}",
                    record.reminder_id, record.recurrence_kind
                );
                AckOutcome::Cleared(record.reminder_id)
            }
            None => {
                debug!("event=acknowledge module=notification status=skipped reason=nothing_pending");
                AckOutcome::NothingPending
            }
        }
    }

    /// Defers the pending record by `delay` from its `fired_at`.
    ///
    /// `rearm` receives the record and the target instant and must re-arm the
    /// reminder. On failure the slot is left unchanged and the error returned;
    /// an unknown reminder surfaces as `NotFound`.
    pub fn snooze<F>(&self, delay: TimeDelta, rearm: F) -> Result<SnoozeOutcome, ReminderError>
    where
        F: FnOnce(&NotificationRecord, NaiveDateTime) -> Result<(), ReminderError>,
    {
        let Some(record) = self.peek() else {
            debug!("event=snooze module=notification status=skipped reason=nothing_pending");
            return Ok(SnoozeOutcome::NothingPending);
        };

        let target = record.fired_at.checked_add_signed(delay).ok_or_else(|| {
            ReminderError::scheduler_fault(record.reminder_id, "snooze instant out of range")
        })?;

        if let Err(err) = rearm(&record, target) {
            warn!(
                "event=snooze module=notification status=error reminder_id={} kind={} error={}",
                record.reminder_id, record.recurrence_kind, err
            );
            return Err(err);
        }

        // A newer fire may have landed while re-arming; keep it.
        let mut slot = self.write_slot();
        if slot.as_ref().is_some_and(|current| current.same_fire(&record)) {
            slot.take();
        }
        drop(slot);

        info!(
            "event=snooze module=notification status=ok reminder_id={} kind={} next_fire_at={}",
            record.reminder_id, record.recurrence_kind, target
        );
        Ok(SnoozeOutcome::Snoozed {
            reminder_id: record.reminder_id,
            next_fire_at: target,
        })
    }

    fn read_slot(&self) -> RwLockReadGuard<'_, Option<NotificationRecord>> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, Option<NotificationRecord>> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{AckOutcome, NotificationState, SnoozeOutcome};
    use crate::error::ReminderError;
    use crate::model::notification::NotificationRecord;
    use crate::model::reminder::{RecurrenceKind, ReminderId};
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

    fn fired_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn record(id: ReminderId) -> NotificationRecord {
        NotificationRecord {
            reminder_id: id,
            display_message: "standup".to_string(),
            fired_at: fired_at(),
            recurrence_kind: RecurrenceKind::Daily,
        }
    }

    #[test]
    fn later_fire_overwrites_pending_record() {
        let state = NotificationState::new();
        let first = ReminderId::generate();
        let second = ReminderId::generate();

        assert!(state.record_fired(record(first)).is_none());
        let lost = state.record_fired(record(second)).expect("first is replaced");
        assert_eq!(lost.reminder_id, first);
        assert_eq!(state.peek().map(|r| r.reminder_id), Some(second));
    }

    #[test]
    fn acknowledge_clears_slot_once() {
        let state = NotificationState::new();
        let id = ReminderId::generate();
        state.record_fired(record(id));

        assert_eq!(state.acknowledge(), AckOutcome::Cleared(id));
        assert_eq!(state.acknowledge(), AckOutcome::NothingPending);
        assert!(state.peek().is_none());
    }

    #[test]
    fn snooze_rearms_at_fired_at_plus_delay() {
        let state = NotificationState::new();
        let id = ReminderId::generate();
        state.record_fired(record(id));

        let mut seen = None;
        let outcome = state
            .snooze(TimeDelta::seconds(10), |rec, target| {
                seen = Some((rec.reminder_id, target));
                Ok(())
            })
            .unwrap();

        let expected = fired_at() + TimeDelta::seconds(10);
        assert_eq!(seen, Some((id, expected)));
        assert_eq!(
            outcome,
            SnoozeOutcome::Snoozed {
                reminder_id: id,
                next_fire_at: expected
            }
        );
        assert!(!state.has_pending());
    }

    #[test]
    fn failed_snooze_keeps_record() {
        let state = NotificationState::new();
        let id = ReminderId::generate();
        state.record_fired(record(id));

        let err = state
            .snooze(TimeDelta::seconds(10), |rec, _| {
                Err(ReminderError::NotFound(rec.reminder_id))
            })
            .unwrap_err();
        assert_eq!(err, ReminderError::NotFound(id));
        assert_eq!(state.peek().map(|r| r.reminder_id), Some(id));
    }

    #[test]
    fn snooze_without_pending_is_noop() {
        let state = NotificationState::new();
        let outcome = state
            .snooze(TimeDelta::seconds(10), |_, _| panic!("must not rearm"))
            .unwrap();
        assert_eq!(outcome, SnoozeOutcome::NothingPending);
    }
}
