//! # Shepherd Follow-Up
//!
//! Owns the follow-up lifecycle: creation with target validation and
//! auto-assignment, attempt recording, the per-assignee pending queue, and
//! the due-reminder sweep the scheduler drives.

pub mod engine;

pub use engine::{AttemptInput, CreateFollowUp, FollowUpEngine, FollowUpUpdate};
