//! In-memory document store — the default for tests and development.
//! All collections behind one `RwLock`; no persistence across restarts.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use shepherd_core::error::{Result, ShepherdError};
use shepherd_core::traits::{
    CellFilter, CellStore, FollowUpFilter, FollowUpStore, MemberDirectory, UserDirectory,
};
use shepherd_core::types::{
    Cell, Convert, FollowUp, FollowUpStatus, Member, Page, PageOut, Role, User,
};

#[derive(Default)]
struct Collections {
    members: HashMap<String, Member>,
    converts: HashMap<String, Convert>,
    /// Insertion-ordered so `first_with_role` is deterministic.
    users: Vec<User>,
    cells: HashMap<String, Cell>,
    follow_ups: HashMap<String, FollowUp>,
}

/// In-memory persistence gateway.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a member record (dev/test helper).
    pub async fn add_member(&self, member: Member) {
        self.inner
            .write()
            .await
            .members
            .insert(member.id.clone(), member);
    }

    /// Seed a convert record (dev/test helper).
    pub async fn add_convert(&self, convert: Convert) {
        self.inner
            .write()
            .await
            .converts
            .insert(convert.id.clone(), convert);
    }

    /// Seed a staff account (dev/test helper).
    pub async fn add_user(&self, user: User) {
        self.inner.write().await.users.push(user);
    }

    pub async fn member(&self, id: &str) -> Option<Member> {
        self.inner.read().await.members.get(id).cloned()
    }
}

/// Free-text match over the target id and attempt notes (`q` lowercased).
fn matches_search(f: &FollowUp, q: &str) -> bool {
    f.target_id.to_lowercase().contains(q)
        || f.attempts.iter().any(|a| {
            a.notes
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(q))
        })
}

fn is_due(f: &FollowUp, now: DateTime<Utc>) -> bool {
    if f.status == FollowUpStatus::Closed {
        return false;
    }
    f.scheduled_at.is_some_and(|t| t <= now) || f.next_attempt_at.is_some_and(|t| t <= now)
}

#[async_trait]
impl FollowUpStore for MemoryStore {
    async fn insert(&self, follow_up: FollowUp) -> Result<FollowUp> {
        self.inner
            .write()
            .await
            .follow_ups
            .insert(follow_up.id.clone(), follow_up.clone());
        Ok(follow_up)
    }

    async fn get(&self, id: &str) -> Result<Option<FollowUp>> {
        Ok(self.inner.read().await.follow_ups.get(id).cloned())
    }

    async fn update(&self, follow_up: &FollowUp) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.follow_ups.contains_key(&follow_up.id) {
            return Err(ShepherdError::NotFound("Follow-up not found".into()));
        }
        inner
            .follow_ups
            .insert(follow_up.id.clone(), follow_up.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.inner.write().await.follow_ups.remove(id).is_some())
    }

    async fn list(&self, filter: &FollowUpFilter, page: Page) -> Result<PageOut<FollowUp>> {
        let inner = self.inner.read().await;
        let needle = filter.search.as_deref().map(str::to_lowercase);
        let mut matching: Vec<FollowUp> = inner
            .follow_ups
            .values()
            .filter(|f| filter.status.is_none_or(|s| f.status == s))
            .filter(|f| {
                filter
                    .assigned_to
                    .as_deref()
                    .is_none_or(|u| f.assigned_to.as_deref() == Some(u))
            })
            .filter(|f| filter.target_kind.is_none_or(|k| f.target_kind == k))
            .filter(|f| needle.as_deref().is_none_or(|q| matches_search(f, q)))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(PageOut::paginate(matching, page))
    }

    async fn for_assignee(&self, user_id: &str) -> Result<Vec<FollowUp>> {
        let inner = self.inner.read().await;
        Ok(inner
            .follow_ups
            .values()
            .filter(|f| {
                f.assigned_to.as_deref() == Some(user_id) && f.status != FollowUpStatus::Closed
            })
            .cloned()
            .collect())
    }

    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<FollowUp>> {
        let inner = self.inner.read().await;
        Ok(inner
            .follow_ups
            .values()
            .filter(|f| is_due(f, now))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CellStore for MemoryStore {
    async fn insert(&self, cell: Cell) -> Result<Cell> {
        self.inner
            .write()
            .await
            .cells
            .insert(cell.id.clone(), cell.clone());
        Ok(cell)
    }

    async fn get(&self, id: &str) -> Result<Option<Cell>> {
        Ok(self.inner.read().await.cells.get(id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Cell>> {
        let inner = self.inner.read().await;
        Ok(inner.cells.values().find(|c| c.name == name).cloned())
    }

    async fn update(&self, cell: &Cell) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.cells.contains_key(&cell.id) {
            return Err(ShepherdError::NotFound("Cell not found".into()));
        }
        inner.cells.insert(cell.id.clone(), cell.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.inner.write().await.cells.remove(id).is_some())
    }

    async fn list(&self, filter: &CellFilter, page: Page) -> Result<PageOut<Cell>> {
        let inner = self.inner.read().await;
        let needle = filter.name_contains.as_deref().map(str::to_lowercase);
        let mut matching: Vec<Cell> = inner
            .cells
            .values()
            .filter(|c| {
                needle
                    .as_deref()
                    .is_none_or(|n| c.name.to_lowercase().contains(n))
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(PageOut::paginate(matching, page))
    }
}

#[async_trait]
impl MemberDirectory for MemoryStore {
    async fn member_exists(&self, id: &str) -> Result<bool> {
        Ok(self.inner.read().await.members.contains_key(id))
    }

    async fn convert_exists(&self, id: &str) -> Result<bool> {
        Ok(self.inner.read().await.converts.contains_key(id))
    }

    async fn get_member(&self, id: &str) -> Result<Option<Member>> {
        Ok(self.inner.read().await.members.get(id).cloned())
    }

    async fn set_assigned_cell(&self, member_id: &str, cell_id: Option<&str>) -> Result<()> {
        // Mirrors a document-store updateOne: missing ids are a no-op.
        let mut inner = self.inner.write().await;
        if let Some(member) = inner.members.get_mut(member_id) {
            member.assigned_cell = cell_id.map(String::from);
            member.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn clear_assigned_cell(&self, member_ids: &[String]) -> Result<()> {
        let mut inner = self.inner.write().await;
        for id in member_ids {
            if let Some(member) = inner.members.get_mut(id) {
                member.assigned_cell = None;
                member.updated_at = Utc::now();
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn first_with_role(&self, role: Role) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.role == role).cloned())
    }
}
