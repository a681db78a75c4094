//! Trigger scheduler: the live set of armed reminder jobs.
//!
//! # Responsibility
//! - Arm, re-arm and cancel one job per reminder ID.
//! - Decide which jobs are due at a given instant and advance them.
//!
//! # Invariants
//! - At most one job per reminder ID; arming an existing ID replaces it.
//! - A due job yields exactly one `FireEvent` per pass, then is either removed
//!   (`Once`) or moved strictly past the pass instant.
//! - The scheduler never reads a clock; callers pass "now".
//! - Mutation happens only through `&mut self`, so the owner decides the
//!   serialization boundary.

use crate::error::ReminderError;
use crate::model::reminder::{RecurrenceKind, ReminderId, ReminderSpec, MAX_MESSAGE_CHARS};
use crate::schedule::recurrence::RecurrenceRule;
use chrono::{NaiveDateTime, TimeDelta};
use log::{debug, error, info, warn};
use std::collections::{BTreeMap, BTreeSet};

/// One armed reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledJob {
    pub reminder_id: ReminderId,
    pub message: String,
    pub next_fire_at: NaiveDateTime,
    pub rule: RecurrenceRule,
}

impl ScheduledJob {
    pub fn kind(&self) -> RecurrenceKind {
        self.rule.kind()
    }

    pub fn interval_days(&self) -> Option<u32> {
        self.rule.interval_days()
    }

    fn is_well_formed(&self) -> bool {
        let chars = self.message.chars().count();
        !self.message.trim().is_empty() && chars <= MAX_MESSAGE_CHARS
    }
}

/// Payload handed to fire callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FireEvent {
    pub reminder_id: ReminderId,
    pub message: String,
    /// Instant of the scheduler pass that dispatched this fire.
    pub fired_at: NaiveDateTime,
    /// Instant the job was due; earlier than `fired_at` after a missed wake-up.
    pub scheduled_for: NaiveDateTime,
    pub recurrence_kind: RecurrenceKind,
    /// Following instant, or `None` when the job was removed.
    pub next_fire_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmOutcome {
    /// No job existed for this ID.
    Armed,
    /// A previous job for this ID was superseded.
    Replaced,
    /// A job with the same rule and instant already existed.
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    NotScheduled,
}

/// Owner of all `ScheduledJob` state.
#[derive(Debug, Default)]
pub struct TriggerScheduler {
    jobs: BTreeMap<ReminderId, ScheduledJob>,
}

impl TriggerScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a scheduler from a previously captured job set.
    ///
    /// A corrupted set (duplicate reminder IDs or malformed jobs) is discarded
    /// entirely and the scheduler starts with no jobs.
    pub fn from_jobs(jobs: Vec<ScheduledJob>) -> Self {
        let mut seen = BTreeSet::new();
        let corrupted = jobs
            .iter()
            .find(|job| !job.is_well_formed() || !seen.insert(job.reminder_id));
        if let Some(job) = corrupted {
            error!(
                "event=job_restore module=scheduler status=error reason=corrupted_job_set reminder_id={} jobs={}",
                job.reminder_id,
                jobs.len()
            );
            return Self::new();
        }

        info!(
            "event=job_restore module=scheduler status=ok jobs={}",
            jobs.len()
        );
        Self {
            jobs: jobs
                .into_iter()
                .map(|job| (job.reminder_id, job))
                .collect(),
        }
    }

    /// Arms `spec` at its first instant at or after `now`.
    ///
    /// # Errors
    /// - `InvalidRecurrence` when recurrence fields are inconsistent.
    /// - `SchedulerFault` when no representable instant exists. Any existing
    ///   job for this ID is left untouched in both cases.
    pub fn arm(
        &mut self,
        spec: &ReminderSpec,
        now: NaiveDateTime,
    ) -> Result<ArmOutcome, ReminderError> {
        let rule = RecurrenceRule::from_spec(spec)?;
        let next_fire_at = rule.first_fire(now).ok_or_else(|| {
            ReminderError::scheduler_fault(spec.id, "no representable fire instant")
        })?;
        Ok(self.install(spec, rule, next_fire_at, "schedule"))
    }

    /// Arms `spec` for a one-off fire at `at`, keeping its recurrence for the
    /// fires that follow.
    pub fn arm_at(
        &mut self,
        spec: &ReminderSpec,
        at: NaiveDateTime,
    ) -> Result<ArmOutcome, ReminderError> {
        let rule = RecurrenceRule::from_spec(spec)?;
        Ok(self.install(spec, rule, at, "schedule_at"))
    }

    fn install(
        &mut self,
        spec: &ReminderSpec,
        rule: RecurrenceRule,
        next_fire_at: NaiveDateTime,
        event: &str,
    ) -> ArmOutcome {
        if let Some(existing) = self.jobs.get_mut(&spec.id) {
            if existing.rule == rule && existing.next_fire_at == next_fire_at {
                if existing.message != spec.message {
                    existing.message = spec.message.clone();
                }
                debug!(
                    "event={event} module=scheduler status=skipped reason=unchanged reminder_id={} kind={}",
                    spec.id, spec.recurrence_kind
                );
                return ArmOutcome::Unchanged;
            }
        }

        let previous = self.jobs.insert(
            spec.id,
            ScheduledJob {
                reminder_id: spec.id,
                message: spec.message.clone(),
                next_fire_at,
                rule,
            },
        );
        let outcome = if previous.is_some() {
            ArmOutcome::Replaced
        } else {
            ArmOutcome::Armed
        };
        info!(
            "event={event} module=scheduler status=ok reminder_id={} kind={} next_fire_at={} replaced={}",
            spec.id,
            spec.recurrence_kind,
            next_fire_at,
            previous.is_some()
        );
        outcome
    }

    /// Removes the job for `id`. Absent jobs are not an error.
    pub fn cancel(&mut self, id: ReminderId) -> CancelOutcome {
        match self.jobs.remove(&id) {
            Some(job) => {
                info!(
                    "event=cancel module=scheduler status=ok reminder_id={} kind={}",
                    id,
                    job.kind()
                );
                CancelOutcome::Cancelled
            }
            None => {
                debug!("event=cancel module=scheduler status=skipped reason=not_scheduled reminder_id={id}");
                CancelOutcome::NotScheduled
            }
        }
    }

    /// Updates the message carried by an armed job without touching timing.
    pub fn refresh_message(&mut self, id: ReminderId, message: &str) -> bool {
        match self.jobs.get_mut(&id) {
            Some(job) => {
                if job.message != message {
                    job.message = message.to_string();
                }
                true
            }
            None => false,
        }
    }

    pub fn job(&self, id: ReminderId) -> Option<&ScheduledJob> {
        self.jobs.get(&id)
    }

    pub fn next_fire_at(&self, id: ReminderId) -> Option<NaiveDateTime> {
        self.jobs.get(&id).map(|job| job.next_fire_at)
    }

    pub fn jobs(&self) -> impl Iterator<Item = &ScheduledJob> + '_ {
        self.jobs.values()
    }

    /// Copy of the job set, suitable for `from_jobs`.
    pub fn snapshot(&self) -> Vec<ScheduledJob> {
        self.jobs.values().cloned().collect()
    }

    /// Earliest pending instant across all jobs.
    pub fn next_due(&self) -> Option<NaiveDateTime> {
        self.jobs.values().map(|job| job.next_fire_at).min()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Takes every job due at `now` and advances it.
    ///
    /// Events are ordered by `scheduled_for`, then reminder ID. A job whose
    /// instant was missed fires once here and resumes from the first instant
    /// strictly after `now`.
    pub fn collect_due(&mut self, now: NaiveDateTime) -> Vec<FireEvent> {
        let due: Vec<ReminderId> = self
            .jobs
            .values()
            .filter(|job| job.next_fire_at <= now)
            .map(|job| job.reminder_id)
            .collect();

        let mut events = Vec::with_capacity(due.len());
        for id in due {
            let Some(job) = self.jobs.get_mut(&id) else {
                continue;
            };
            let scheduled_for = job.next_fire_at;
            let next = job.rule.next_after_now(scheduled_for, now);
            let event = FireEvent {
                reminder_id: id,
                message: job.message.clone(),
                fired_at: now,
                scheduled_for,
                recurrence_kind: job.kind(),
                next_fire_at: next,
            };

            let missed = now
                .checked_sub_signed(TimeDelta::minutes(1))
                .is_some_and(|threshold| scheduled_for < threshold);
            if missed {
                warn!(
                    "event=fire_catch_up module=scheduler status=ok reminder_id={} kind={} scheduled_for={} fired_at={}",
                    id,
                    job.kind(),
                    scheduled_for,
                    now
                );
            }

            match next {
                Some(next_fire_at) => job.next_fire_at = next_fire_at,
                None => {
                    if job.rule.is_recurring() {
                        error!(
                            "event=rearm module=scheduler status=error reminder_id={} kind={} reason=no_representable_instant",
                            id,
                            job.kind()
                        );
                    }
                    self.jobs.remove(&id);
                }
            }
            events.push(event);
        }

        events.sort_by(|a, b| {
            a.scheduled_for
                .cmp(&b.scheduled_for)
                .then(a.reminder_id.cmp(&b.reminder_id))
        });
        events
    }
}
