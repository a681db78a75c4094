//! Core reminder scheduling logic for Neuron.
//! This crate is the single source of truth for reminder invariants.

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod notification;
pub mod registry;
pub mod schedule;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use error::{ReminderError, ReminderResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::notification::NotificationRecord;
pub use model::reminder::{
    parse_anchor_date, parse_anchor_time, RecurrenceKind, ReminderDraft, ReminderId,
    ReminderLifecycle, ReminderSpec, ReminderValidationError, MAX_MESSAGE_CHARS,
};
pub use notification::state::{AckOutcome, SnoozeOutcome};
pub use registry::reminder_registry::{DeleteOutcome, SaveOutcome, UpcomingReminder};
pub use schedule::recurrence::RecurrenceRule;
pub use schedule::runner::SchedulerRunner;
pub use schedule::trigger::{FireEvent, ScheduledJob, TriggerScheduler};
pub use service::reminder_engine::{FireHandler, FireHandlerError, ReminderEngine};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
