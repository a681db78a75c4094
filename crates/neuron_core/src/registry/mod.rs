//! Reminder registry.
//!
//! # Responsibility
//! - Be the only place that mints reminder IDs or deletes specs.
//! - Keep lifecycle bookkeeping next to the specs it describes.
//!
//! # Invariants
//! - Registry and scheduler are mutated together under one lock owned by the
//!   engine; the registry never locks on its own.

pub mod reminder_registry;
