//! Recurrence rules: reminder specification to concrete fire instants.
//!
//! # Responsibility
//! - Compute the first fire instant of a reminder relative to "now".
//! - Compute the instant that follows a given fire.
//!
//! # Invariants
//! - Pure: no clock reads, no logging, no shared state.
//! - `Daily` steps are exactly 24h; `EveryNDays` steps are exactly n days.
//! - `Weekly` always lands on a Sunday at the anchor time, whatever weekday
//!   the anchor date falls on.
//! - `Monthly` clamps the anchor day to the target month's last day and keeps
//!   using the anchor day afterwards, so short months never cause drift.
//! - `Yearly` clamps Feb 29 anchors to Feb 28 in non-leap years.

use crate::error::ReminderError;
use crate::model::reminder::{RecurrenceKind, ReminderSpec, ReminderValidationError};
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

/// Validated recurrence parameters for one reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrenceRule {
    kind: RecurrenceKind,
    anchor: NaiveDateTime,
    interval_days: Option<u32>,
}

impl RecurrenceRule {
    /// Builds a rule, rejecting interval fields that do not match the kind.
    pub fn new(
        kind: RecurrenceKind,
        anchor: NaiveDateTime,
        interval_days: Option<u32>,
    ) -> Result<Self, ReminderError> {
        let invalid = match (kind.requires_interval(), interval_days) {
            (true, None) => Some(ReminderValidationError::MissingInterval),
            (true, Some(0)) => Some(ReminderValidationError::ZeroInterval),
            (false, Some(_)) => Some(ReminderValidationError::UnexpectedInterval { kind }),
            _ => None,
        };
        if let Some(err) = invalid {
            return Err(ReminderError::InvalidRecurrence(err));
        }

        Ok(Self {
            kind,
            anchor,
            interval_days,
        })
    }

    pub fn from_spec(spec: &ReminderSpec) -> Result<Self, ReminderError> {
        Self::new(spec.recurrence_kind, spec.anchor(), spec.interval_days)
    }

    pub fn kind(&self) -> RecurrenceKind {
        self.kind
    }

    pub fn anchor(&self) -> NaiveDateTime {
        self.anchor
    }

    pub fn interval_days(&self) -> Option<u32> {
        self.interval_days
    }

    pub fn is_recurring(&self) -> bool {
        !matches!(self.kind, RecurrenceKind::Once)
    }

    /// First fire instant at or after `now`.
    ///
    /// `Once` always returns its anchor, even when already past, so a stale
    /// one-shot fires on the next scheduler pass. Recurring kinds never fire
    /// before their anchor.
    ///
    /// Returns `None` only when the instant falls outside the representable
    /// calendar range.
    pub fn first_fire(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        match self.kind {
            RecurrenceKind::Once => Some(self.anchor),
            RecurrenceKind::Daily | RecurrenceKind::EveryNDays => {
                self.period_at_or_after(self.anchor, now)
            }
            RecurrenceKind::Weekly => self.weekly_occurrence(self.anchor.max(now), true),
            RecurrenceKind::Monthly => self.monthly_occurrence(self.anchor.max(now), true),
            RecurrenceKind::Yearly => self.yearly_occurrence(self.anchor.max(now), true),
        }
    }

    /// The instant that follows `previous`. `None` for `Once`.
    pub fn next_after(&self, previous: NaiveDateTime) -> Option<NaiveDateTime> {
        match self.kind {
            RecurrenceKind::Once => None,
            RecurrenceKind::Daily | RecurrenceKind::EveryNDays => {
                previous.checked_add_signed(self.period()?)
            }
            RecurrenceKind::Weekly => self.weekly_occurrence(previous, false),
            RecurrenceKind::Monthly => self.monthly_occurrence(previous, false),
            RecurrenceKind::Yearly => self.yearly_occurrence(previous, false),
        }
    }

    /// The first instant after `previous` that is also strictly after `now`.
    ///
    /// Instants missed while the host was suspended are skipped rather than
    /// replayed, so a long pause yields one catch-up fire, not a burst.
    pub fn next_after_now(
        &self,
        previous: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Option<NaiveDateTime> {
        let next = self.next_after(previous)?;
        if next > now {
            return Some(next);
        }

        match self.kind {
            RecurrenceKind::Once => None,
            RecurrenceKind::Daily | RecurrenceKind::EveryNDays => {
                let candidate = self.period_at_or_after(next, now)?;
                if candidate > now {
                    Some(candidate)
                } else {
                    self.next_after(candidate)
                }
            }
            RecurrenceKind::Weekly => self.weekly_occurrence(now, false),
            RecurrenceKind::Monthly => self.monthly_occurrence(now, false),
            RecurrenceKind::Yearly => self.yearly_occurrence(now, false),
        }
    }

    fn period(&self) -> Option<TimeDelta> {
        let days = match self.kind {
            RecurrenceKind::EveryNDays => i64::from(self.interval_days?),
            _ => 1,
        };
        TimeDelta::try_days(days)
    }

    /// First `base + k * period` (k >= 0) that is >= `now`.
    fn period_at_or_after(
        &self,
        base: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Option<NaiveDateTime> {
        if now <= base {
            return Some(base);
        }

        let period = self.period()?;
        let period_secs = period.num_seconds();
        let mut steps = (now - base).num_seconds() / period_secs;
        let mut candidate = base.checked_add_signed(TimeDelta::try_seconds(
            period_secs.checked_mul(steps)?,
        )?)?;
        if candidate < now {
            steps += 1;
            candidate = base.checked_add_signed(TimeDelta::try_seconds(
                period_secs.checked_mul(steps)?,
            )?)?;
        }
        Some(candidate)
    }

    fn time(&self) -> NaiveTime {
        self.anchor.time()
    }

    fn weekly_occurrence(&self, start: NaiveDateTime, inclusive: bool) -> Option<NaiveDateTime> {
        let date = start.date();
        let offset = (7 - date.weekday().num_days_from_sunday()) % 7;
        let sunday = date.checked_add_days(Days::new(u64::from(offset)))?;
        let candidate = sunday.and_time(self.time());
        if accepts(candidate, start, inclusive) {
            return Some(candidate);
        }
        sunday
            .checked_add_days(Days::new(7))
            .map(|date| date.and_time(self.time()))
    }

    fn monthly_occurrence(&self, start: NaiveDateTime, inclusive: bool) -> Option<NaiveDateTime> {
        let day = self.anchor.day();
        let candidate = clamped_date(start.year(), start.month(), day)?.and_time(self.time());
        if accepts(candidate, start, inclusive) {
            return Some(candidate);
        }
        let (year, month) = following_month(start.year(), start.month());
        clamped_date(year, month, day).map(|date| date.and_time(self.time()))
    }

    fn yearly_occurrence(&self, start: NaiveDateTime, inclusive: bool) -> Option<NaiveDateTime> {
        let month = self.anchor.month();
        let day = self.anchor.day();
        let candidate = clamped_date(start.year(), month, day)?.and_time(self.time());
        if accepts(candidate, start, inclusive) {
            return Some(candidate);
        }
        clamped_date(start.year() + 1, month, day).map(|date| date.and_time(self.time()))
    }
}

fn accepts(candidate: NaiveDateTime, start: NaiveDateTime, inclusive: bool) -> bool {
    candidate > start || (inclusive && candidate == start)
}

fn following_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = following_month(year, month);
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?
        .pred_opt()
        .map(|last| last.day())
}

/// `day` in the given month, clamped to the month's last day.
fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let last = days_in_month(year, month)?;
    NaiveDate::from_ymd_opt(year, month, day.min(last))
}

#[cfg(test)]
mod tests {
    use super::{clamped_date, days_in_month, RecurrenceRule};
    use crate::error::ReminderError;
    use crate::model::reminder::RecurrenceKind;
    use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Weekday};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(days_in_month(2026, 2), Some(28));
        assert_eq!(days_in_month(2028, 2), Some(29));
        assert_eq!(days_in_month(2026, 12), Some(31));
        assert_eq!(
            clamped_date(2026, 4, 31),
            NaiveDate::from_ymd_opt(2026, 4, 30)
        );
    }

    #[test]
    fn every_n_days_without_interval_is_rejected() {
        let err = RecurrenceRule::new(RecurrenceKind::EveryNDays, at(2026, 1, 1, 9, 0), None)
            .unwrap_err();
        assert!(matches!(err, ReminderError::InvalidRecurrence(_)));
    }

    #[test]
    fn interval_on_daily_is_rejected() {
        let err = RecurrenceRule::new(RecurrenceKind::Daily, at(2026, 1, 1, 9, 0), Some(3))
            .unwrap_err();
        assert!(matches!(err, ReminderError::InvalidRecurrence(_)));
    }

    #[test]
    fn once_has_no_successor() {
        let rule = RecurrenceRule::new(RecurrenceKind::Once, at(2026, 1, 1, 9, 0), None).unwrap();
        assert_eq!(rule.first_fire(at(2026, 6, 1, 0, 0)), Some(at(2026, 1, 1, 9, 0)));
        assert_eq!(rule.next_after(at(2026, 1, 1, 9, 0)), None);
    }

    #[test]
    fn daily_first_fire_aligns_to_anchor_grid() {
        let rule = RecurrenceRule::new(RecurrenceKind::Daily, at(2026, 1, 1, 9, 0), None).unwrap();
        assert_eq!(rule.first_fire(at(2025, 12, 1, 0, 0)), Some(at(2026, 1, 1, 9, 0)));
        assert_eq!(rule.first_fire(at(2026, 1, 5, 9, 0)), Some(at(2026, 1, 5, 9, 0)));
        assert_eq!(rule.first_fire(at(2026, 1, 5, 9, 1)), Some(at(2026, 1, 6, 9, 0)));
    }

    #[test]
    fn weekly_ignores_anchor_weekday() {
        // 2026-10-21 is a Wednesday.
        let rule = RecurrenceRule::new(RecurrenceKind::Weekly, at(2026, 10, 21, 7, 30), None)
            .unwrap();
        let first = rule.first_fire(at(2026, 10, 1, 0, 0)).unwrap();
        assert_eq!(first, at(2026, 10, 25, 7, 30));
        assert_eq!(first.weekday(), Weekday::Sun);

        let second = rule.next_after(first).unwrap();
        assert_eq!(second - first, TimeDelta::days(7));
    }

    #[test]
    fn weekly_on_sunday_after_anchor_time_moves_a_week() {
        let rule = RecurrenceRule::new(RecurrenceKind::Weekly, at(2026, 10, 18, 7, 30), None)
            .unwrap();
        assert_eq!(rule.first_fire(at(2026, 10, 18, 8, 0)), Some(at(2026, 10, 25, 7, 30)));
    }

    #[test]
    fn monthly_clamps_and_returns_to_anchor_day() {
        let rule = RecurrenceRule::new(RecurrenceKind::Monthly, at(2026, 1, 31, 9, 0), None)
            .unwrap();
        let jan = rule.first_fire(at(2026, 1, 1, 0, 0)).unwrap();
        assert_eq!(jan, at(2026, 1, 31, 9, 0));
        let feb = rule.next_after(jan).unwrap();
        assert_eq!(feb, at(2026, 2, 28, 9, 0));
        let mar = rule.next_after(feb).unwrap();
        assert_eq!(mar, at(2026, 3, 31, 9, 0));
    }

    #[test]
    fn yearly_clamps_leap_day() {
        let rule = RecurrenceRule::new(RecurrenceKind::Yearly, at(2028, 2, 29, 6, 0), None)
            .unwrap();
        let first = rule.first_fire(at(2028, 1, 1, 0, 0)).unwrap();
        assert_eq!(first, at(2028, 2, 29, 6, 0));
        assert_eq!(rule.next_after(first), Some(at(2029, 2, 28, 6, 0)));
    }

    #[test]
    fn next_after_now_skips_missed_instants() {
        let rule = RecurrenceRule::new(RecurrenceKind::Daily, at(2026, 1, 1, 9, 0), None).unwrap();
        let resumed = at(2026, 1, 10, 12, 0);
        let next = rule.next_after_now(at(2026, 1, 1, 9, 0), resumed).unwrap();
        assert_eq!(next, at(2026, 1, 11, 9, 0));
    }

    #[test]
    fn next_after_now_for_monthly_resumes_from_now() {
        let rule = RecurrenceRule::new(RecurrenceKind::Monthly, at(2026, 1, 15, 9, 0), None)
            .unwrap();
        let next = rule
            .next_after_now(at(2026, 1, 15, 9, 0), at(2026, 5, 20, 0, 0))
            .unwrap();
        assert_eq!(next, at(2026, 6, 15, 9, 0));
    }
}
