//! Pending notification record.

use crate::model::reminder::{RecurrenceKind, ReminderId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The fired-but-unhandled reminder surfaced to pollers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub reminder_id: ReminderId,
    pub display_message: String,
    /// Local instant the scheduler dispatched the fire.
    pub fired_at: NaiveDateTime,
    pub recurrence_kind: RecurrenceKind,
}

impl NotificationRecord {
    /// Whether `other` describes the same fire of the same reminder.
    pub fn same_fire(&self, other: &NotificationRecord) -> bool {
        self.reminder_id == other.reminder_id && self.fired_at == other.fired_at
    }
}
