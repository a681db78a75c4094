//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the reminder operations to Dart via FRB.
//! - Own the process-wide engine and its background scheduler runtime.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Blank strings are treated as absent draft fields.
//! - Every action returns an envelope with a stable `outcome` token.

use log::{info, warn};
use neuron_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, parse_anchor_date,
    parse_anchor_time, ping as ping_inner, AckOutcome, DeleteOutcome, EngineConfig,
    NotificationRecord, RecurrenceKind, ReminderDraft, ReminderEngine, ReminderError, ReminderId,
    SaveOutcome, SchedulerRunner, SnoozeOutcome, UpcomingReminder,
};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tokio::runtime::{Builder, Runtime};

const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
const INVALID_INPUT: &str = "invalid_input";

static ENGINE: OnceLock<Arc<ReminderEngine>> = OnceLock::new();
static SCHEDULER: Mutex<Option<SchedulerHost>> = Mutex::new(None);

struct SchedulerHost {
    runtime: Runtime,
    runner: SchedulerRunner,
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Action envelope for reminder commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Affected reminder ID, when one is known.
    pub reminder_id: Option<String>,
    /// Stable outcome token. Successes: `armed`, `draft`, `deleted`, ...
    /// Failures: `invalid_input`, `invalid_recurrence`, `not_found`,
    /// `scheduler_fault`.
    pub outcome: String,
    /// Human-readable message for diagnostics/UI.
    pub message: String,
}

impl ReminderActionResponse {
    fn success(
        outcome: &str,
        reminder_id: Option<ReminderId>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            ok: true,
            reminder_id: reminder_id.map(|id| id.to_string()),
            outcome: outcome.to_string(),
            message: message.into(),
        }
    }

    fn failure(outcome: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            reminder_id: None,
            outcome: outcome.to_string(),
            message: message.into(),
        }
    }

    fn invalid_input(message: impl Into<String>) -> Self {
        Self::failure(INVALID_INPUT, message)
    }

    fn from_error(context: &str, err: ReminderError) -> Self {
        Self::failure(err.code(), format!("{context} failed: {err}"))
    }
}

/// One row of the upcoming-reminders list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpcomingReminderItem {
    pub reminder_id: String,
    pub message: String,
    /// Picker label, e.g. `Every Week`.
    pub recurrence_kind: String,
    /// Local `YYYY-MM-DD HH:MM`.
    pub next_fire_at: String,
    pub interval_days: Option<u32>,
}

/// Pending notification as shown by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationItem {
    pub reminder_id: String,
    pub message: String,
    pub recurrence_kind: String,
    pub fired_at: String,
}

/// Starts the background scheduler. Idempotent.
///
/// # FFI contract
/// - Sync call; spawns one runtime thread on first call.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn start_scheduler() -> String {
    let mut host = lock_scheduler();
    if host.is_some() {
        return String::new();
    }

    let runtime = match Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("neuron-scheduler")
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            warn!("event=scheduler_start module=ffi status=error error={err}");
            return format!("start_scheduler failed: {err}");
        }
    };
    let runner = SchedulerRunner::spawn_on(runtime.handle(), Arc::clone(engine()));
    *host = Some(SchedulerHost { runtime, runner });
    info!("event=scheduler_start module=ffi status=ok");
    String::new()
}

/// Stops the background scheduler if running. Idempotent.
#[flutter_rust_bridge::frb(sync)]
pub fn stop_scheduler() {
    let Some(SchedulerHost { runtime, runner }) = lock_scheduler().take() else {
        return;
    };
    runtime.block_on(runner.shutdown());
    info!("event=scheduler_stop module=ffi status=ok");
}

/// Creates (no `reminder_id`) or updates a reminder from form fields.
///
/// Input semantics:
/// - `recurrence_kind`: picker label or identifier (`Every Week`, `weekly`).
/// - `anchor_date`: `YYYY-MM-DD`; `anchor_time`: `HH:MM`.
/// - Missing fields store a draft that is armed once complete.
///
/// # FFI contract
/// - Never panics.
/// - Success `outcome` is one of `armed|rescheduled|unchanged|draft`.
/// - Failure `outcome` is `invalid_input` (bad field or unparsable id, date,
///   time or kind), `invalid_recurrence`, `not_found` (update of an unknown
///   or deleted reminder) or `scheduler_fault`.
#[flutter_rust_bridge::frb(sync)]
pub fn create_or_update_reminder(
    reminder_id: Option<String>,
    message: Option<String>,
    recurrence_kind: Option<String>,
    anchor_date: Option<String>,
    anchor_time: Option<String>,
    interval_days: Option<u32>,
) -> ReminderActionResponse {
    let id = match non_blank(reminder_id).map(|raw| ReminderId::parse(&raw)).transpose() {
        Ok(id) => id,
        Err(err) => {
            return ReminderActionResponse::invalid_input(format!("invalid reminder_id: {err}"))
        }
    };
    let draft = match build_draft(
        message,
        recurrence_kind,
        anchor_date,
        anchor_time,
        interval_days,
    ) {
        Ok(draft) => draft,
        Err(err) => return ReminderActionResponse::invalid_input(err),
    };

    match engine().create_or_update_reminder(id, draft) {
        Ok((id, outcome)) => {
            let token = save_outcome_label(outcome);
            let message = match outcome {
                SaveOutcome::Draft => "Draft saved.",
                SaveOutcome::Armed => "Reminder scheduled.",
                SaveOutcome::Rescheduled => "Reminder rescheduled.",
                SaveOutcome::Unchanged => "Reminder saved.",
            };
            ReminderActionResponse::success(token, Some(id), message)
        }
        Err(err) => ReminderActionResponse::from_error("save", err),
    }
}

/// Deletes a reminder. Unknown IDs are not an error.
///
/// # FFI contract
/// - `outcome` is one of `deleted|not_found|invalid_input`; only
///   `invalid_input` has `ok == false`.
#[flutter_rust_bridge::frb(sync)]
pub fn delete_reminder(reminder_id: String) -> ReminderActionResponse {
    let id = match ReminderId::parse(&reminder_id) {
        Ok(id) => id,
        Err(err) => {
            return ReminderActionResponse::invalid_input(format!("invalid reminder_id: {err}"))
        }
    };
    match engine().delete_reminder(id) {
        DeleteOutcome::Deleted => {
            ReminderActionResponse::success("deleted", Some(id), "Reminder deleted.")
        }
        DeleteOutcome::NotFound => {
            ReminderActionResponse::success("not_found", Some(id), "Nothing to delete.")
        }
    }
}

/// Active reminders due after now, soonest first.
#[flutter_rust_bridge::frb(sync)]
pub fn list_upcoming() -> Vec<UpcomingReminderItem> {
    let engine = engine();
    engine
        .list_upcoming(engine.now())
        .into_iter()
        .map(to_upcoming_item)
        .collect()
}

/// Pending notification, if any. Polling does not consume it.
#[flutter_rust_bridge::frb(sync)]
pub fn poll_notification() -> Option<NotificationItem> {
    engine().poll_notification().map(to_notification_item)
}

/// Clears the pending notification.
///
/// # FFI contract
/// - `outcome` is one of `cleared|nothing_pending`.
#[flutter_rust_bridge::frb(sync)]
pub fn acknowledge_notification() -> ReminderActionResponse {
    match engine().acknowledge() {
        AckOutcome::Cleared(id) => {
            ReminderActionResponse::success("cleared", Some(id), "Notification dismissed.")
        }
        AckOutcome::NothingPending => {
            ReminderActionResponse::success("nothing_pending", None, "No pending notification.")
        }
    }
}

/// Re-fires the pending notification after the configured snooze delay.
///
/// # FFI contract
/// - `outcome` is one of `snoozed|nothing_pending|not_found`. `not_found`
///   means the pending reminder was deleted; the notification stays pending.
#[flutter_rust_bridge::frb(sync)]
pub fn snooze_notification() -> ReminderActionResponse {
    match engine().snooze() {
        Ok(SnoozeOutcome::Snoozed {
            reminder_id,
            next_fire_at,
        }) => ReminderActionResponse::success(
            "snoozed",
            Some(reminder_id),
            format!(
                "Snoozed until {}.",
                next_fire_at.format(DISPLAY_TIME_FORMAT)
            ),
        ),
        Ok(SnoozeOutcome::NothingPending) => {
            ReminderActionResponse::success("nothing_pending", None, "No pending notification.")
        }
        Err(err) => ReminderActionResponse::from_error("snooze", err),
    }
}

/// Recurrence labels in picker order.
#[flutter_rust_bridge::frb(sync)]
pub fn recurrence_kind_labels() -> Vec<String> {
    RecurrenceKind::ALL
        .iter()
        .map(|kind| kind.label().to_string())
        .collect()
}

fn engine() -> &'static Arc<ReminderEngine> {
    ENGINE.get_or_init(|| Arc::new(ReminderEngine::with_system_clock(EngineConfig::from_env())))
}

fn lock_scheduler() -> std::sync::MutexGuard<'static, Option<SchedulerHost>> {
    SCHEDULER.lock().unwrap_or_else(PoisonError::into_inner)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

fn build_draft(
    message: Option<String>,
    recurrence_kind: Option<String>,
    anchor_date: Option<String>,
    anchor_time: Option<String>,
    interval_days: Option<u32>,
) -> Result<ReminderDraft, String> {
    let recurrence_kind = non_blank(recurrence_kind)
        .map(|raw| RecurrenceKind::from_label(&raw))
        .transpose()
        .map_err(|err| format!("invalid recurrence_kind: {err}"))?;
    let anchor_date = non_blank(anchor_date)
        .map(|raw| parse_anchor_date(&raw))
        .transpose()
        .map_err(|err| format!("invalid anchor_date: {err}"))?;
    let anchor_time = non_blank(anchor_time)
        .map(|raw| parse_anchor_time(&raw))
        .transpose()
        .map_err(|err| format!("invalid anchor_time: {err}"))?;

    Ok(ReminderDraft {
        message: non_blank(message),
        recurrence_kind,
        anchor_date,
        anchor_time,
        interval_days,
    })
}

fn save_outcome_label(outcome: SaveOutcome) -> &'static str {
    match outcome {
        SaveOutcome::Draft => "draft",
        SaveOutcome::Armed => "armed",
        SaveOutcome::Rescheduled => "rescheduled",
        SaveOutcome::Unchanged => "unchanged",
    }
}

fn to_upcoming_item(row: UpcomingReminder) -> UpcomingReminderItem {
    UpcomingReminderItem {
        reminder_id: row.id.to_string(),
        message: row.message,
        recurrence_kind: row.recurrence_kind.label().to_string(),
        next_fire_at: row.next_fire_at.format(DISPLAY_TIME_FORMAT).to_string(),
        interval_days: row.interval_days,
    }
}

fn to_notification_item(record: NotificationRecord) -> NotificationItem {
    NotificationItem {
        reminder_id: record.reminder_id.to_string(),
        message: record.display_message,
        recurrence_kind: record.recurrence_kind.label().to_string(),
        fired_at: record.fired_at.format(DISPLAY_TIME_FORMAT).to_string(),
    }
}
