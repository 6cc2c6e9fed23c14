//! Gateway and dispatcher contracts.
//!
//! The engines consume these traits and never touch a concrete store or
//! channel. `shepherd-store` provides the persistence implementations;
//! `shepherd-channels` provides the reminder sink.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{
    Cell, FollowUp, FollowUpStatus, Member, Page, PageOut, Role, TargetKind, User,
};

/// Query filter for follow-up listings.
#[derive(Debug, Clone, Default)]
pub struct FollowUpFilter {
    pub status: Option<FollowUpStatus>,
    pub assigned_to: Option<String>,
    pub target_kind: Option<TargetKind>,
    /// Case-insensitive substring match over the target id and attempt
    /// notes.
    pub search: Option<String>,
}

/// Query filter for cell listings.
#[derive(Debug, Clone, Default)]
pub struct CellFilter {
    /// Case-insensitive substring match on the cell name.
    pub name_contains: Option<String>,
}

/// Follow-up collection access.
#[async_trait]
pub trait FollowUpStore: Send + Sync {
    async fn insert(&self, follow_up: FollowUp) -> Result<FollowUp>;
    async fn get(&self, id: &str) -> Result<Option<FollowUp>>;
    async fn update(&self, follow_up: &FollowUp) -> Result<()>;
    /// Returns false when the id did not exist.
    async fn delete(&self, id: &str) -> Result<bool>;
    /// Filtered listing, most recently updated first.
    async fn list(&self, filter: &FollowUpFilter, page: Page) -> Result<PageOut<FollowUp>>;
    /// Everything assigned to a user that is not Closed. Unordered; the
    /// engine applies queue ordering.
    async fn for_assignee(&self, user_id: &str) -> Result<Vec<FollowUp>>;
    /// The due set: status != Closed AND (scheduled_at <= now OR
    /// next_attempt_at <= now).
    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<FollowUp>>;
}

/// Cell collection access.
#[async_trait]
pub trait CellStore: Send + Sync {
    async fn insert(&self, cell: Cell) -> Result<Cell>;
    async fn get(&self, id: &str) -> Result<Option<Cell>>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Cell>>;
    async fn update(&self, cell: &Cell) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<bool>;
    /// Filtered listing, most recently created first.
    async fn list(&self, filter: &CellFilter, page: Page) -> Result<PageOut<Cell>>;
}

/// Read/patch access to member and convert records. The engines only need
/// existence checks and `assigned_cell` maintenance; member CRUD proper
/// lives with the external collaborator.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn member_exists(&self, id: &str) -> Result<bool>;
    async fn convert_exists(&self, id: &str) -> Result<bool>;
    async fn get_member(&self, id: &str) -> Result<Option<Member>>;
    async fn set_assigned_cell(&self, member_id: &str, cell_id: Option<&str>) -> Result<()>;
    /// Bulk unset, used when a cell is deleted. Missing ids are skipped.
    async fn clear_assigned_cell(&self, member_ids: &[String]) -> Result<()>;
}

/// Staff account lookup.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<User>>;
    /// First-match policy; no load balancing.
    async fn first_with_role(&self, role: Role) -> Result<Option<User>>;
}

/// Notification dispatcher consumed by the due-reminder sweep. Best-effort:
/// the sweep logs failures per record and keeps going.
#[async_trait]
pub trait ReminderSink: Send + Sync {
    async fn notify(&self, user: &User, follow_up: &FollowUp) -> Result<()>;
}
