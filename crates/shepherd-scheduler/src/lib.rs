//! # Shepherd Scheduler
//!
//! Periodic sweep over due follow-ups. Every tick the job asks the
//! follow-up engine to fire reminders; a sweep still running when the next
//! tick arrives makes that tick a no-op.

pub mod job;

pub use job::ReminderJob;
