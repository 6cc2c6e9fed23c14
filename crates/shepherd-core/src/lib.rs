//! # Shepherd Core
//!
//! Shared foundation for the Shepherd church-operations backend:
//! entity types, the persistence-gateway and notification-dispatcher
//! contracts, the error taxonomy, and configuration.
//!
//! The engines (`shepherd-followup`, `shepherd-cells`) depend only on the
//! traits defined here; concrete stores and channels are wired in by the
//! binary.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::ShepherdConfig;
pub use error::{Result, ShepherdError};
pub use traits::{
    CellFilter, CellStore, FollowUpFilter, FollowUpStore, MemberDirectory, ReminderSink,
    UserDirectory,
};
pub use types::{
    Attempt, AttendanceRecord, Cell, Convert, FollowUp, FollowUpStatus, Member, MemberStatus,
    Page, PageOut, Priority, Role, TargetKind, User, new_id,
};
