//! Domain model for tasks, calendar events and preferences.
//!
//! # Responsibility
//! - Define canonical data structures used by the store and selectors.
//! - Define drafts and patches consumed by store mutations.
//!
//! # Invariants
//! - Enumerations are closed sets; unknown values fail deserialization.
//! - Records carry no store behavior; validation is opt-in via `validate()`.

pub mod event;
mod patch;
pub mod preferences;
pub mod state;
pub mod task;
pub mod validation;
