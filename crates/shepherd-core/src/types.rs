//! Entity types — the document shapes shared by engines and stores.
//!
//! Serde wire names match the existing admin frontend ("Follow-Up Team",
//! "In Progress"), so documents round-trip against data written by the
//! previous backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generate a fresh document id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Staff account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Super Admin")]
    SuperAdmin,
    Admin,
    Pastor,
    #[serde(rename = "Finance Officer")]
    FinanceOfficer,
    #[serde(rename = "Cell Leader")]
    CellLeader,
    #[serde(rename = "Follow-Up Team")]
    FollowUpTeam,
    #[serde(rename = "Evangelism Team")]
    EvangelismTeam,
}

/// A staff account. Auth/password handling lives outside this workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Contact number for SMS/WhatsApp reminder delivery.
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatus {
    Visitor,
    Convert,
    Worker,
    Leader,
}

/// A church member record (the subset of fields the engines touch).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub member_status: MemberStatus,
    /// The one cell this member currently belongs to, if any. Maintained by
    /// the Cell Engine, not the store.
    #[serde(default)]
    pub assigned_cell: Option<String>,
    #[serde(default)]
    pub assigned_follow_up_leader: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A new convert tracked separately until integrated into membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Convert {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub decision_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Which entity kind a follow-up tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    Member,
    Convert,
}

/// Follow-up lifecycle state. Any status may be written by any caller;
/// there is no enforced transition table (manual override is a supported
/// workflow).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowUpStatus {
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Contacted,
    Completed,
    Closed,
}

/// Follow-up priority. `Ord` puts `High` last so a descending sort yields
/// High first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// One logged contact effort within a follow-up's history. Append-only,
/// chronological.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    #[serde(default)]
    pub by: Option<String>,
    pub attempted_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
}

/// A tracked outreach task against a member or convert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUp {
    pub id: String,
    pub target_kind: TargetKind,
    pub target_id: String,
    /// Assignee; if set, always a user with the Follow-Up Team role.
    #[serde(default)]
    pub assigned_to: Option<String>,
    pub status: FollowUpStatus,
    #[serde(default)]
    pub attempts: Vec<Attempt>,
    #[serde(default)]
    pub next_attempt_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    pub priority: Priority,
    #[serde(default)]
    pub created_by: Option<String>,
    /// Set only by explicit update; never auto-populated.
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One meeting's attendance, embedded in its cell. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub date: DateTime<Utc>,
    pub present: Vec<String>,
    #[serde(default)]
    pub absent: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A small recurring fellowship group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub id: String,
    /// Unique across cells.
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub leader: Option<String>,
    #[serde(default)]
    pub assistant_leader: Option<String>,
    /// Member ids. Insertion-ordered; a member appears in at most one
    /// cell's set at a time (engine-enforced).
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub meeting_day: Option<String>,
    #[serde(default)]
    pub attendance_records: Vec<AttendanceRecord>,
    /// Back-reference set by multiplication.
    #[serde(default)]
    pub parent_cell: Option<String>,
    /// Forward references accumulated by multiplication.
    #[serde(default)]
    pub children_cells: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 1-based pagination input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Page {
    pub page: usize,
    pub limit: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

impl Page {
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page: if page > 0 { page } else { 1 },
            limit: if limit > 0 { limit } else { 10 },
        }
    }

    /// Tolerates a deserialized `page`/`limit` of zero.
    pub fn skip(&self) -> usize {
        self.page.saturating_sub(1) * self.limit.max(1)
    }
}

/// One page of results plus totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageOut<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub total_pages: usize,
}

impl<T> PageOut<T> {
    /// Slice an already-sorted full result set down to one page. Fields
    /// bypassing `Page::new` (deserialized zeros) are clamped here too.
    pub fn paginate(all: Vec<T>, page: Page) -> Self {
        let limit = page.limit.max(1);
        let total = all.len();
        let total_pages = total.div_ceil(limit);
        let items = all.into_iter().skip(page.skip()).take(limit).collect();
        Self {
            items,
            total,
            total_pages,
        }
    }
}
