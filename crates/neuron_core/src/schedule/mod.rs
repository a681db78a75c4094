//! Recurrence computation and timed dispatch.
//!
//! # Responsibility
//! - Translate reminder specs into concrete fire instants (`recurrence`).
//! - Own the armed job set and due-job selection (`trigger`).
//! - Drive periodic scheduler passes on a background task (`runner`).

pub mod recurrence;
pub mod runner;
pub mod trigger;
