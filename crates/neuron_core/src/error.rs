//! Caller-facing error kinds for reminder operations.
//!
//! # Invariants
//! - Validation failures never reach the scheduling loop.
//! - `NotFound` is surfaced only by operations that require an existing
//!   reminder (update, snooze); deletes report it as an outcome instead.

use crate::model::reminder::{ReminderId, ReminderValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ReminderResult<T> = Result<T, ReminderError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderError {
    /// Malformed or out-of-range reminder fields.
    Validation(ReminderValidationError),
    /// Recurrence-specific fields missing or inconsistent.
    InvalidRecurrence(ReminderValidationError),
    /// Operation referenced an unknown or cancelled reminder.
    NotFound(ReminderId),
    /// Arming failed; the reminder keeps its last known-good schedule.
    SchedulerFault {
        reminder_id: ReminderId,
        details: String,
    },
}

impl ReminderError {
    pub fn scheduler_fault(reminder_id: ReminderId, details: impl Into<String>) -> Self {
        Self::SchedulerFault {
            reminder_id,
            details: details.into(),
        }
    }

    /// Stable snake_case token for boundary layers that cannot match on
    /// the enum.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "invalid_input",
            Self::InvalidRecurrence(_) => "invalid_recurrence",
            Self::NotFound(_) => "not_found",
            Self::SchedulerFault { .. } => "scheduler_fault",
        }
    }

    /// Whether the caller can fix this by correcting input fields.
    pub fn is_caller_input(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidRecurrence(_))
    }
}

impl Display for ReminderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidRecurrence(err) => write!(f, "invalid recurrence: {err}"),
            Self::NotFound(id) => write!(f, "reminder not found: {id}"),
            Self::SchedulerFault {
                reminder_id,
                details,
            } => write!(f, "scheduler fault for reminder {reminder_id}: {details}"),
        }
    }
}

impl Error for ReminderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) | Self::InvalidRecurrence(err) => Some(err),
            Self::NotFound(_) | Self::SchedulerFault { .. } => None,
        }
    }
}

impl From<ReminderValidationError> for ReminderError {
    fn from(value: ReminderValidationError) -> Self {
        if value.is_recurrence_error() {
            Self::InvalidRecurrence(value)
        } else {
            Self::Validation(value)
        }
    }
}
