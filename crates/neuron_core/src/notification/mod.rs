//! Poll-based notification delivery.
//!
//! # Responsibility
//! - Expose the pending notification to presentation-layer pollers.
//! - Own acknowledge/snooze transitions for the pending record.
//!
//! # See also
//! - `crate::service::reminder_engine` for the snooze re-arm wiring.

pub mod state;
