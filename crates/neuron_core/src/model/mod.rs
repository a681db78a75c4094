//! Reminder domain model.
//!
//! # Responsibility
//! - Define value types shared by registry, scheduler and notification slot.
//! - Keep presentation-layer structure out of core signatures.
//!
//! # Invariants
//! - Every reminder is identified by a registry-minted `ReminderId`.
//! - Deletion leaves a `Cancelled` tombstone, never a reused ID.

pub mod notification;
pub mod reminder;
