//! SQLite-backed document store — survives restarts, nothing to run.
//!
//! One table per collection, each row `(id, doc)` with the document as a
//! JSON payload column. Filters and sorts run on decoded documents; the
//! collections here are small administrative data, not analytics.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use serde::de::DeserializeOwned;

use shepherd_core::error::{Result, ShepherdError};
use shepherd_core::traits::{
    CellFilter, CellStore, FollowUpFilter, FollowUpStore, MemberDirectory, UserDirectory,
};
use shepherd_core::types::{
    Cell, Convert, FollowUp, FollowUpStatus, Member, Page, PageOut, Role, User,
};

const COLLECTIONS: &[&str] = &["members", "converts", "users", "cells", "follow_ups"];

/// Free-text match over the target id and attempt notes (`q` lowercased).
fn matches_search(f: &FollowUp, q: &str) -> bool {
    f.target_id.to_lowercase().contains(q)
        || f.attempts.iter().any(|a| {
            a.notes
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(q))
        })
}

/// SQLite persistence gateway.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| ShepherdError::Store(format!("DB open: {e}")))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Open a throwaway in-memory database (tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ShepherdError::Store(format!("DB open: {e}")))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock();
        for table in COLLECTIONS {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id TEXT PRIMARY KEY,
                    doc TEXT NOT NULL
                );"
            ))
            .map_err(|e| ShepherdError::Store(format!("Migration: {e}")))?;
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // Held only across a single synchronous statement, never an await.
        self.conn.lock().expect("sqlite connection mutex poisoned")
    }

    fn put<T: Serialize>(&self, table: &str, id: &str, value: &T) -> Result<()> {
        let doc = serde_json::to_string(value)
            .map_err(|e| ShepherdError::Store(format!("Serialize: {e}")))?;
        self.lock()
            .execute(
                &format!("INSERT OR REPLACE INTO {table} (id, doc) VALUES (?1, ?2)"),
                rusqlite::params![id, doc],
            )
            .map_err(|e| ShepherdError::Store(format!("Save {table}: {e}")))?;
        Ok(())
    }

    fn fetch<T: DeserializeOwned>(&self, table: &str, id: &str) -> Result<Option<T>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(&format!("SELECT doc FROM {table} WHERE id = ?1"))
            .map_err(|e| ShepherdError::Store(format!("Query {table}: {e}")))?;
        let doc: Option<String> = stmt
            .query_row([id], |row| row.get(0))
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                e => Err(ShepherdError::Store(format!("Query {table}: {e}"))),
            })?;
        match doc {
            Some(json) => {
                let value = serde_json::from_str(&json)
                    .map_err(|e| ShepherdError::Store(format!("Decode {table}: {e}")))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Load every document in a collection, insertion-ordered.
    fn all<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(&format!("SELECT doc FROM {table} ORDER BY rowid"))
            .map_err(|e| ShepherdError::Store(format!("Query {table}: {e}")))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| ShepherdError::Store(format!("Query {table}: {e}")))?;
        let mut out = Vec::new();
        for row in rows {
            let json = row.map_err(|e| ShepherdError::Store(format!("Row {table}: {e}")))?;
            let value = serde_json::from_str(&json)
                .map_err(|e| ShepherdError::Store(format!("Decode {table}: {e}")))?;
            out.push(value);
        }
        Ok(out)
    }

    fn remove(&self, table: &str, id: &str) -> Result<bool> {
        let changed = self
            .lock()
            .execute(&format!("DELETE FROM {table} WHERE id = ?1"), [id])
            .map_err(|e| ShepherdError::Store(format!("Delete {table}: {e}")))?;
        Ok(changed > 0)
    }

    fn exists(&self, table: &str, id: &str) -> Result<bool> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(&format!("SELECT 1 FROM {table} WHERE id = ?1"))
            .map_err(|e| ShepherdError::Store(format!("Query {table}: {e}")))?;
        stmt.exists([id])
            .map_err(|e| ShepherdError::Store(format!("Query {table}: {e}")))
    }

    /// Seed a member record (dev/test helper).
    pub fn add_member(&self, member: &Member) -> Result<()> {
        self.put("members", &member.id, member)
    }

    /// Seed a convert record (dev/test helper).
    pub fn add_convert(&self, convert: &Convert) -> Result<()> {
        self.put("converts", &convert.id, convert)
    }

    /// Seed a staff account (dev/test helper).
    pub fn add_user(&self, user: &User) -> Result<()> {
        self.put("users", &user.id, user)
    }
}

#[async_trait]
impl FollowUpStore for SqliteStore {
    async fn insert(&self, follow_up: FollowUp) -> Result<FollowUp> {
        self.put("follow_ups", &follow_up.id, &follow_up)?;
        Ok(follow_up)
    }

    async fn get(&self, id: &str) -> Result<Option<FollowUp>> {
        self.fetch("follow_ups", id)
    }

    async fn update(&self, follow_up: &FollowUp) -> Result<()> {
        if !self.exists("follow_ups", &follow_up.id)? {
            return Err(ShepherdError::NotFound("Follow-up not found".into()));
        }
        self.put("follow_ups", &follow_up.id, follow_up)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.remove("follow_ups", id)
    }

    async fn list(&self, filter: &FollowUpFilter, page: Page) -> Result<PageOut<FollowUp>> {
        let needle = filter.search.as_deref().map(str::to_lowercase);
        let mut matching: Vec<FollowUp> = self
            .all::<FollowUp>("follow_ups")?
            .into_iter()
            .filter(|f| filter.status.is_none_or(|s| f.status == s))
            .filter(|f| {
                filter
                    .assigned_to
                    .as_deref()
                    .is_none_or(|u| f.assigned_to.as_deref() == Some(u))
            })
            .filter(|f| filter.target_kind.is_none_or(|k| f.target_kind == k))
            .filter(|f| needle.as_deref().is_none_or(|q| matches_search(f, q)))
            .collect();
        matching.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(PageOut::paginate(matching, page))
    }

    async fn for_assignee(&self, user_id: &str) -> Result<Vec<FollowUp>> {
        Ok(self
            .all::<FollowUp>("follow_ups")?
            .into_iter()
            .filter(|f| {
                f.assigned_to.as_deref() == Some(user_id) && f.status != FollowUpStatus::Closed
            })
            .collect())
    }

    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<FollowUp>> {
        Ok(self
            .all::<FollowUp>("follow_ups")?
            .into_iter()
            .filter(|f| {
                f.status != FollowUpStatus::Closed
                    && (f.scheduled_at.is_some_and(|t| t <= now)
                        || f.next_attempt_at.is_some_and(|t| t <= now))
            })
            .collect())
    }
}

#[async_trait]
impl CellStore for SqliteStore {
    async fn insert(&self, cell: Cell) -> Result<Cell> {
        self.put("cells", &cell.id, &cell)?;
        Ok(cell)
    }

    async fn get(&self, id: &str) -> Result<Option<Cell>> {
        self.fetch("cells", id)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Cell>> {
        Ok(self
            .all::<Cell>("cells")?
            .into_iter()
            .find(|c| c.name == name))
    }

    async fn update(&self, cell: &Cell) -> Result<()> {
        if !self.exists("cells", &cell.id)? {
            return Err(ShepherdError::NotFound("Cell not found".into()));
        }
        self.put("cells", &cell.id, cell)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.remove("cells", id)
    }

    async fn list(&self, filter: &CellFilter, page: Page) -> Result<PageOut<Cell>> {
        let needle = filter.name_contains.as_deref().map(str::to_lowercase);
        let mut matching: Vec<Cell> = self
            .all::<Cell>("cells")?
            .into_iter()
            .filter(|c| {
                needle
                    .as_deref()
                    .is_none_or(|n| c.name.to_lowercase().contains(n))
            })
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(PageOut::paginate(matching, page))
    }
}

#[async_trait]
impl MemberDirectory for SqliteStore {
    async fn member_exists(&self, id: &str) -> Result<bool> {
        self.exists("members", id)
    }

    async fn convert_exists(&self, id: &str) -> Result<bool> {
        self.exists("converts", id)
    }

    async fn get_member(&self, id: &str) -> Result<Option<Member>> {
        self.fetch("members", id)
    }

    async fn set_assigned_cell(&self, member_id: &str, cell_id: Option<&str>) -> Result<()> {
        // Missing ids are a no-op, like a document-store updateOne.
        if let Some(mut member) = self.fetch::<Member>("members", member_id)? {
            member.assigned_cell = cell_id.map(String::from);
            member.updated_at = Utc::now();
            self.put("members", member_id, &member)?;
        }
        Ok(())
    }

    async fn clear_assigned_cell(&self, member_ids: &[String]) -> Result<()> {
        for id in member_ids {
            self.set_assigned_cell(id, None).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for SqliteStore {
    async fn get(&self, id: &str) -> Result<Option<User>> {
        self.fetch("users", id)
    }

    async fn first_with_role(&self, role: Role) -> Result<Option<User>> {
        Ok(self
            .all::<User>("users")?
            .into_iter()
            .find(|u| u.role == role))
    }
}
