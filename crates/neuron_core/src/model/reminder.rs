//! Reminder domain model.
//!
//! # Responsibility
//! - Define the immutable `ReminderSpec` value shared by registry and scheduler.
//! - Define the partially-filled `ReminderDraft` shape used while a caller is
//!   still entering fields.
//! - Define lifecycle stages tracked per reminder ID.
//!
//! # Invariants
//! - `interval_days` is present if and only if kind is `EveryNDays`, and is >= 1.
//! - `message` is non-blank and at most `MAX_MESSAGE_CHARS` code points.
//! - `anchor_date` is never before `min_anchor_date()`.
//! - `anchor_time` carries minute precision only.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Upper bound for reminder message length, counted in code points.
pub const MAX_MESSAGE_CHARS: usize = 60;

const MIN_ANCHOR_YEAR: i32 = 1995;
const MIN_ANCHOR_MONTH: u32 = 8;
const MIN_ANCHOR_DAY: u32 = 5;

/// Earliest date a reminder may be anchored on.
pub fn min_anchor_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(MIN_ANCHOR_YEAR, MIN_ANCHOR_MONTH, MIN_ANCHOR_DAY)
        .unwrap_or(NaiveDate::MIN)
}

/// Opaque reminder identity minted by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderId(Uuid);

impl ReminderId {
    /// Mints a fresh random ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an externally supplied UUID. Nil UUIDs are rejected.
    pub fn from_uuid(value: Uuid) -> Result<Self, ReminderValidationError> {
        if value.is_nil() {
            return Err(ReminderValidationError::NilId);
        }
        Ok(Self(value))
    }

    /// Parses the canonical hyphenated string form.
    pub fn parse(value: &str) -> Result<Self, ReminderValidationError> {
        let trimmed = value.trim();
        let uuid = Uuid::parse_str(trimmed)
            .map_err(|_| ReminderValidationError::InvalidId(trimmed.to_string()))?;
        Self::from_uuid(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Display for ReminderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Repeat pattern of a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceKind {
    /// Fires once at the anchor instant.
    Once,
    /// Every 24 hours from the anchor.
    Daily,
    /// Every Sunday at the anchor time.
    Weekly,
    /// The anchor's day-of-month, clamped to short months.
    Monthly,
    /// The anchor's month and day every year.
    Yearly,
    /// Every `interval_days` days from the anchor.
    EveryNDays,
}

impl RecurrenceKind {
    pub const ALL: [RecurrenceKind; 6] = [
        RecurrenceKind::Daily,
        RecurrenceKind::Weekly,
        RecurrenceKind::Monthly,
        RecurrenceKind::Yearly,
        RecurrenceKind::Once,
        RecurrenceKind::EveryNDays,
    ];

    /// Stable identifier used in logs and wire payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::EveryNDays => "every_n_days",
        }
    }

    /// Human-facing label shown in the reminder type picker.
    pub fn label(self) -> &'static str {
        match self {
            Self::Once => "Once only",
            Self::Daily => "Daily",
            Self::Weekly => "Every Week",
            Self::Monthly => "Every Month",
            Self::Yearly => "Every Year",
            Self::EveryNDays => "Once in every",
        }
    }

    /// Parses either a picker label or a stable identifier.
    pub fn from_label(value: &str) -> Result<Self, ReminderValidationError> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|kind| {
                kind.label().eq_ignore_ascii_case(trimmed) || kind.as_str() == trimmed
            })
            .ok_or_else(|| ReminderValidationError::UnknownRecurrenceKind(trimmed.to_string()))
    }

    pub fn requires_interval(self) -> bool {
        matches!(self, Self::EveryNDays)
    }
}

impl Display for RecurrenceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reminder field validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderValidationError {
    EmptyMessage,
    MessageTooLong { max: usize, actual: usize },
    AnchorDateTooEarly { date: NaiveDate, min: NaiveDate },
    MissingInterval,
    UnexpectedInterval { kind: RecurrenceKind },
    ZeroInterval,
    UnknownRecurrenceKind(String),
    InvalidDate(String),
    InvalidTime(String),
    NilId,
    InvalidId(String),
    Incomplete { missing: Vec<&'static str> },
}

impl ReminderValidationError {
    /// Whether this failure concerns recurrence-specific fields.
    pub fn is_recurrence_error(&self) -> bool {
        matches!(
            self,
            Self::MissingInterval
                | Self::UnexpectedInterval { .. }
                | Self::ZeroInterval
                | Self::UnknownRecurrenceKind(_)
        )
    }
}

impl Display for ReminderValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "reminder message cannot be empty"),
            Self::MessageTooLong { max, actual } => write!(
                f,
                "reminder message is {actual} characters; at most {max} allowed"
            ),
            Self::AnchorDateTooEarly { date, min } => {
                write!(f, "anchor date {date} is before the minimum allowed {min}")
            }
            Self::MissingInterval => write!(f, "every_n_days reminders require interval_days"),
            Self::UnexpectedInterval { kind } => {
                write!(f, "interval_days is only valid for every_n_days, not {kind}")
            }
            Self::ZeroInterval => write!(f, "interval_days must be at least 1"),
            Self::UnknownRecurrenceKind(value) => write!(f, "unknown recurrence kind `{value}`"),
            Self::InvalidDate(value) => write!(f, "invalid date `{value}`; expected YYYY-MM-DD"),
            Self::InvalidTime(value) => write!(f, "invalid time `{value}`; expected HH:MM"),
            Self::NilId => write!(f, "reminder id cannot be nil"),
            Self::InvalidId(value) => write!(f, "invalid reminder id `{value}`"),
            Self::Incomplete { missing } => {
                write!(f, "reminder is incomplete; missing {}", missing.join(", "))
            }
        }
    }
}

impl Error for ReminderValidationError {}

/// Fully specified reminder. Edits replace the whole value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSpec {
    pub id: ReminderId,
    pub message: String,
    pub recurrence_kind: RecurrenceKind,
    pub anchor_date: NaiveDate,
    /// Local wall-clock time, minute precision.
    pub anchor_time: NaiveTime,
    /// Present only for `RecurrenceKind::EveryNDays`.
    pub interval_days: Option<u32>,
}

impl ReminderSpec {
    /// Builds and validates a spec. Seconds on `anchor_time` are dropped.
    pub fn new(
        id: ReminderId,
        message: impl Into<String>,
        recurrence_kind: RecurrenceKind,
        anchor_date: NaiveDate,
        anchor_time: NaiveTime,
        interval_days: Option<u32>,
    ) -> Result<Self, ReminderValidationError> {
        let spec = Self {
            id,
            message: message.into(),
            recurrence_kind,
            anchor_date,
            anchor_time: truncate_to_minute(anchor_time),
            interval_days,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), ReminderValidationError> {
        if self.message.trim().is_empty() {
            return Err(ReminderValidationError::EmptyMessage);
        }
        validate_message_length(&self.message)?;
        validate_anchor_date(self.anchor_date)?;
        validate_interval(self.recurrence_kind, self.interval_days)
    }

    /// Anchor date and time combined into one local instant.
    pub fn anchor(&self) -> NaiveDateTime {
        self.anchor_date.and_time(self.anchor_time)
    }

    /// Whether `other` would produce the same fire instants.
    pub fn same_schedule(&self, other: &ReminderSpec) -> bool {
        self.recurrence_kind == other.recurrence_kind
            && self.anchor_date == other.anchor_date
            && self.anchor_time == other.anchor_time
            && self.interval_days == other.interval_days
    }
}

/// Reminder fields as entered so far. Any field may still be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderDraft {
    pub message: Option<String>,
    pub recurrence_kind: Option<RecurrenceKind>,
    pub anchor_date: Option<NaiveDate>,
    pub anchor_time: Option<NaiveTime>,
    pub interval_days: Option<u32>,
}

impl ReminderDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_kind(mut self, kind: RecurrenceKind) -> Self {
        self.recurrence_kind = Some(kind);
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.anchor_date = Some(date);
        self
    }

    pub fn with_time(mut self, time: NaiveTime) -> Self {
        self.anchor_time = Some(time);
        self
    }

    pub fn with_interval_days(mut self, interval_days: u32) -> Self {
        self.interval_days = Some(interval_days);
        self
    }

    /// Names of fields that must still be filled before the draft can be armed.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self
            .message
            .as_deref()
            .map_or(true, |message| message.trim().is_empty())
        {
            missing.push("message");
        }
        if self.recurrence_kind.is_none() {
            missing.push("recurrence_kind");
        }
        if self.anchor_date.is_none() {
            missing.push("anchor_date");
        }
        if self.anchor_time.is_none() {
            missing.push("anchor_time");
        }
        if self.recurrence_kind.is_some_and(RecurrenceKind::requires_interval)
            && self.interval_days.is_none()
        {
            missing.push("interval_days");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Validates the fields that are present; absent fields are not errors.
    pub fn validate(&self) -> Result<(), ReminderValidationError> {
        if let Some(message) = self.message.as_deref() {
            validate_message_length(message)?;
        }
        if let Some(date) = self.anchor_date {
            validate_anchor_date(date)?;
        }
        if self.interval_days == Some(0) {
            return Err(ReminderValidationError::ZeroInterval);
        }
        if let (Some(kind), Some(_)) = (self.recurrence_kind, self.interval_days) {
            if !kind.requires_interval() {
                return Err(ReminderValidationError::UnexpectedInterval { kind });
            }
        }
        Ok(())
    }

    /// Converts a complete draft into a validated spec.
    pub fn to_spec(&self, id: ReminderId) -> Result<ReminderSpec, ReminderValidationError> {
        self.validate()?;
        let missing = self.missing_fields();
        match (
            self.message.as_deref(),
            self.recurrence_kind,
            self.anchor_date,
            self.anchor_time,
        ) {
            (Some(message), Some(kind), Some(date), Some(time)) if missing.is_empty() => {
                ReminderSpec::new(id, message, kind, date, time, self.interval_days)
            }
            _ => Err(ReminderValidationError::Incomplete { missing }),
        }
    }
}

impl From<&ReminderSpec> for ReminderDraft {
    fn from(spec: &ReminderSpec) -> Self {
        Self {
            message: Some(spec.message.clone()),
            recurrence_kind: Some(spec.recurrence_kind),
            anchor_date: Some(spec.anchor_date),
            anchor_time: Some(spec.anchor_time),
            interval_days: spec.interval_days,
        }
    }
}

/// Per-reminder lifecycle stage.
///
/// `Scheduled -> Fired`, then one of:
/// - acknowledge: `Scheduled` while a job is still armed, else `Acknowledged`;
/// - snooze: `Snoozed` until the deferred fire, then `Fired` again, then as
///   above (a recurring reminder is back to `Scheduled` once handled);
/// - overwritten by another reminder's fire: settled as if acknowledged.
///
/// Deletion moves any stage to `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderLifecycle {
    /// Stored but not yet complete enough to arm.
    Draft,
    /// Armed and waiting for its next instant.
    Scheduled,
    /// Fired; notification not yet handled.
    Fired,
    /// Fired and acknowledged, with nothing further armed.
    Acknowledged,
    /// Deferred by a snooze; a one-shot re-fire is armed.
    Snoozed,
    /// Deleted. Terminal.
    Cancelled,
}

impl ReminderLifecycle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Fired => "fired",
            Self::Acknowledged => "acknowledged",
            Self::Snoozed => "snoozed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Stages that count toward the active reminder list.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Scheduled | Self::Fired | Self::Snoozed)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl Display for ReminderLifecycle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a `YYYY-MM-DD` date as produced by a date picker.
pub fn parse_anchor_date(value: &str) -> Result<NaiveDate, ReminderValidationError> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| ReminderValidationError::InvalidDate(trimmed.to_string()))
}

/// Parses `HH:MM` (or `HH:MM:SS`, seconds dropped) as produced by a time input.
pub fn parse_anchor_time(value: &str) -> Result<NaiveTime, ReminderValidationError> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map(truncate_to_minute)
        .map_err(|_| ReminderValidationError::InvalidTime(trimmed.to_string()))
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

fn validate_message_length(message: &str) -> Result<(), ReminderValidationError> {
    let actual = message.chars().count();
    if actual > MAX_MESSAGE_CHARS {
        return Err(ReminderValidationError::MessageTooLong {
            max: MAX_MESSAGE_CHARS,
            actual,
        });
    }
    Ok(())
}

fn validate_anchor_date(date: NaiveDate) -> Result<(), ReminderValidationError> {
    let min = min_anchor_date();
    if date < min {
        return Err(ReminderValidationError::AnchorDateTooEarly { date, min });
    }
    Ok(())
}

fn validate_interval(
    kind: RecurrenceKind,
    interval_days: Option<u32>,
) -> Result<(), ReminderValidationError> {
    match (kind.requires_interval(), interval_days) {
        (true, None) => Err(ReminderValidationError::MissingInterval),
        (true, Some(0)) => Err(ReminderValidationError::ZeroInterval),
        (true, Some(_)) => Ok(()),
        (false, Some(_)) => Err(ReminderValidationError::UnexpectedInterval { kind }),
        (false, None) => Ok(()),
    }
}
