//! Cell Engine — lifecycle, membership, attendance, multiplication.
//!
//! The one-cell-per-member invariant lives here, not in the store: adding a
//! member sets `assigned_cell`, removing unsets it, deleting a cell clears
//! it for everyone left behind.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use shepherd_core::error::{Result, ShepherdError};
use shepherd_core::traits::{CellFilter, CellStore, MemberDirectory};
use shepherd_core::types::{AttendanceRecord, Cell, Page, PageOut, new_id};

use crate::metrics::{self, CellMetrics};

/// Input for [`CellEngine::create`].
#[derive(Debug, Clone)]
pub struct CreateCell {
    pub name: String,
    pub location: Option<String>,
    pub leader: Option<String>,
    pub assistant_leader: Option<String>,
    pub meeting_day: Option<String>,
}

/// Partial update for [`CellEngine::update`].
#[derive(Debug, Clone, Default)]
pub struct CellUpdate {
    pub name: Option<String>,
    pub location: Option<String>,
    pub leader: Option<String>,
    pub assistant_leader: Option<String>,
    pub meeting_day: Option<String>,
}

/// Input for [`CellEngine::add_attendance`].
#[derive(Debug, Clone, Default)]
pub struct AttendanceInput {
    /// Defaults to now.
    pub date: Option<DateTime<Utc>>,
    pub present: Vec<String>,
    pub absent: Vec<String>,
    pub notes: Option<String>,
}

/// Query for [`CellEngine::attendance`]: optional inclusive date range plus
/// pagination.
#[derive(Debug, Clone, Default)]
pub struct AttendanceQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Page,
}

/// Input for [`CellEngine::multiply`].
#[derive(Debug, Clone)]
pub struct MultiplyInput {
    pub name: String,
    /// Defaults to the parent's leader.
    pub leader: Option<String>,
    pub member_ids: Vec<String>,
}

/// Read-only aggregation returned by [`CellEngine::report`].
#[derive(Debug, Clone)]
pub struct CellReport {
    pub metrics: CellMetrics,
    pub attendance: PageOut<AttendanceRecord>,
}

/// The cell engine.
pub struct CellEngine {
    cells: Arc<dyn CellStore>,
    directory: Arc<dyn MemberDirectory>,
}

impl CellEngine {
    pub fn new(cells: Arc<dyn CellStore>, directory: Arc<dyn MemberDirectory>) -> Self {
        Self { cells, directory }
    }

    /// Create a cell. Names are unique across cells.
    pub async fn create(&self, input: CreateCell) -> Result<Cell> {
        if self.cells.find_by_name(&input.name).await?.is_some() {
            return Err(ShepherdError::Conflict(
                "Cell with this name already exists".into(),
            ));
        }
        let now = Utc::now();
        let cell = Cell {
            id: new_id(),
            name: input.name,
            location: input.location,
            leader: input.leader,
            assistant_leader: input.assistant_leader,
            members: vec![],
            meeting_day: input.meeting_day,
            attendance_records: vec![],
            parent_cell: None,
            children_cells: vec![],
            created_at: now,
            updated_at: now,
        };
        tracing::info!("🏠 Cell created: '{}'", cell.name);
        self.cells.insert(cell).await
    }

    /// Filtered listing, most recently created first.
    pub async fn list(&self, filter: &CellFilter, page: Page) -> Result<PageOut<Cell>> {
        self.cells.list(filter, page).await
    }

    pub async fn get(&self, id: &str) -> Result<Cell> {
        self.require(id).await
    }

    pub async fn update(&self, id: &str, update: CellUpdate) -> Result<Cell> {
        let mut cell = self.require(id).await?;
        if let Some(name) = update.name {
            if name != cell.name && self.cells.find_by_name(&name).await?.is_some() {
                return Err(ShepherdError::Conflict(
                    "Cell with this name already exists".into(),
                ));
            }
            cell.name = name;
        }
        if let Some(location) = update.location {
            cell.location = Some(location);
        }
        if let Some(leader) = update.leader {
            cell.leader = Some(leader);
        }
        if let Some(assistant) = update.assistant_leader {
            cell.assistant_leader = Some(assistant);
        }
        if let Some(day) = update.meeting_day {
            cell.meeting_day = Some(day);
        }
        cell.updated_at = Utc::now();
        self.cells.update(&cell).await?;
        Ok(cell)
    }

    /// Delete a cell and unset `assigned_cell` on its former members.
    pub async fn delete(&self, id: &str) -> Result<Cell> {
        let cell = self.require(id).await?;
        self.cells.delete(id).await?;
        self.directory.clear_assigned_cell(&cell.members).await?;
        Ok(cell)
    }

    pub async fn assign_leader(&self, id: &str, leader_id: &str) -> Result<Cell> {
        self.update(
            id,
            CellUpdate {
                leader: Some(leader_id.to_string()),
                ..Default::default()
            },
        )
        .await
    }

    /// Add members, skipping ids already present, and point each new
    /// member's `assigned_cell` at this cell.
    pub async fn add_members(&self, id: &str, member_ids: &[String]) -> Result<Cell> {
        let mut cell = self.require(id).await?;
        let mut to_add: Vec<String> = Vec::new();
        for member_id in member_ids {
            if !cell.members.contains(member_id) && !to_add.contains(member_id) {
                to_add.push(member_id.clone());
            }
        }
        if to_add.is_empty() {
            return Ok(cell);
        }
        cell.members.extend(to_add.iter().cloned());
        cell.updated_at = Utc::now();
        self.cells.update(&cell).await?;
        for member_id in &to_add {
            self.directory
                .set_assigned_cell(member_id, Some(&cell.id))
                .await?;
        }
        Ok(cell)
    }

    /// Remove one member and unset their `assigned_cell`.
    pub async fn remove_member(&self, id: &str, member_id: &str) -> Result<Cell> {
        let mut cell = self.require(id).await?;
        cell.members.retain(|m| m != member_id);
        cell.updated_at = Utc::now();
        self.cells.update(&cell).await?;
        self.directory.set_assigned_cell(member_id, None).await?;
        Ok(cell)
    }

    /// Append an attendance record. Present/absent references are taken as
    /// given; they are not checked against the member set.
    pub async fn add_attendance(
        &self,
        id: &str,
        input: AttendanceInput,
    ) -> Result<AttendanceRecord> {
        let mut cell = self.require(id).await?;
        let now = Utc::now();
        let record = AttendanceRecord {
            date: input.date.unwrap_or(now),
            present: input.present,
            absent: input.absent,
            notes: input.notes,
            created_at: now,
        };
        cell.attendance_records.push(record.clone());
        cell.updated_at = now;
        self.cells.update(&cell).await?;
        Ok(record)
    }

    /// Attendance history, date descending, filtered to the inclusive
    /// range when given, then paginated.
    pub async fn attendance(
        &self,
        id: &str,
        query: AttendanceQuery,
    ) -> Result<PageOut<AttendanceRecord>> {
        let cell = self.require(id).await?;
        let mut records: Vec<AttendanceRecord> = cell
            .attendance_records
            .into_iter()
            .filter(|r| query.from.is_none_or(|from| r.date >= from))
            .filter(|r| query.to.is_none_or(|to| r.date <= to))
            .collect();
        records.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(PageOut::paginate(records, query.page))
    }

    /// Rolling-window metrics over the most recent `max(4, weeks)` records.
    pub async fn metrics(&self, id: &str, weeks: usize) -> Result<CellMetrics> {
        let cell = self.require(id).await?;
        Ok(metrics::compute(&cell, weeks))
    }

    /// Split off a child cell, moving the listed members across. The three
    /// writes are not transactional; a failure after the child insert rolls
    /// back by deleting the child and restoring the moved members'
    /// previous `assigned_cell`.
    pub async fn multiply(&self, id: &str, input: MultiplyInput) -> Result<Cell> {
        let mut parent = self.require(id).await?;
        if self.cells.find_by_name(&input.name).await?.is_some() {
            return Err(ShepherdError::Conflict(
                "Cell with this name already exists".into(),
            ));
        }

        let now = Utc::now();
        let child = Cell {
            id: new_id(),
            name: input.name,
            location: parent.location.clone(),
            leader: input.leader.or_else(|| parent.leader.clone()),
            assistant_leader: None,
            members: input.member_ids.clone(),
            meeting_day: parent.meeting_day.clone(),
            attendance_records: vec![],
            parent_cell: Some(parent.id.clone()),
            children_cells: vec![],
            created_at: now,
            updated_at: now,
        };
        let child = self.cells.insert(child).await?;

        // Remember prior assignments so a failed parent update can be
        // compensated.
        let mut moved: Vec<(String, Option<String>)> = Vec::new();
        let outcome: Result<()> = async {
            for member_id in &input.member_ids {
                let previous = self
                    .directory
                    .get_member(member_id)
                    .await?
                    .and_then(|m| m.assigned_cell);
                self.directory
                    .set_assigned_cell(member_id, Some(&child.id))
                    .await?;
                moved.push((member_id.clone(), previous));
            }
            parent.members.retain(|m| !input.member_ids.contains(m));
            parent.children_cells.push(child.id.clone());
            parent.updated_at = Utc::now();
            self.cells.update(&parent).await
        }
        .await;

        if let Err(e) = outcome {
            tracing::warn!(
                "cell multiplication failed mid-way, rolling back child '{}': {e}",
                child.name
            );
            for (member_id, previous) in &moved {
                let _ = self
                    .directory
                    .set_assigned_cell(member_id, previous.as_deref())
                    .await;
            }
            let _ = self.cells.delete(&child.id).await;
            return Err(e);
        }

        tracing::info!(
            "🌱 Cell '{}' multiplied into '{}' ({} members moved)",
            parent.name,
            child.name,
            child.members.len()
        );
        Ok(child)
    }

    /// Metrics (fixed 4-week window) plus the first 100 attendance records
    /// in the range.
    pub async fn report(
        &self,
        id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<CellReport> {
        let metrics = self.metrics(id, 4).await?;
        let attendance = self
            .attendance(
                id,
                AttendanceQuery {
                    from,
                    to,
                    page: Page::new(1, 100),
                },
            )
            .await?;
        Ok(CellReport {
            metrics,
            attendance,
        })
    }

    async fn require(&self, id: &str) -> Result<Cell> {
        self.cells
            .get(id)
            .await?
            .ok_or_else(|| ShepherdError::NotFound("Cell not found".into()))
    }
}
