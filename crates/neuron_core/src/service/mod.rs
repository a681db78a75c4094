//! Core use-case services.
//!
//! # Responsibility
//! - Expose the reminder operations presentation layers call.
//! - Keep FFI/CLI layers decoupled from scheduler internals.

pub mod reminder_engine;
