//! Follow-Up Engine — lifecycle and reminder sweep.
//!
//! Status writes are caller-driven: any status can follow any other, which
//! keeps manual overrides possible. The due predicate re-selects a record
//! on every sweep until its `scheduled_at`/`next_attempt_at` advances.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use shepherd_core::error::{Result, ShepherdError};
use shepherd_core::traits::{
    FollowUpFilter, FollowUpStore, MemberDirectory, ReminderSink, UserDirectory,
};
use shepherd_core::types::{
    Attempt, FollowUp, FollowUpStatus, Page, PageOut, Priority, Role, TargetKind, new_id,
};

/// Input for [`FollowUpEngine::create`].
#[derive(Debug, Clone)]
pub struct CreateFollowUp {
    pub target_kind: TargetKind,
    pub target_id: String,
    pub assigned_to: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
    /// Seeds the attempt history with a single "Created" entry.
    pub notes: Option<String>,
}

/// Input for [`FollowUpEngine::record_attempt`].
#[derive(Debug, Clone, Default)]
pub struct AttemptInput {
    pub notes: Option<String>,
    pub outcome: Option<String>,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub status: Option<FollowUpStatus>,
}

/// Partial update for [`FollowUpEngine::update`]. `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct FollowUpUpdate {
    pub assigned_to: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
    pub status: Option<FollowUpStatus>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// The follow-up engine. All collaborators arrive at construction; nothing
/// global.
pub struct FollowUpEngine {
    follow_ups: Arc<dyn FollowUpStore>,
    directory: Arc<dyn MemberDirectory>,
    users: Arc<dyn UserDirectory>,
    reminders: Arc<dyn ReminderSink>,
}

impl FollowUpEngine {
    pub fn new(
        follow_ups: Arc<dyn FollowUpStore>,
        directory: Arc<dyn MemberDirectory>,
        users: Arc<dyn UserDirectory>,
        reminders: Arc<dyn ReminderSink>,
    ) -> Self {
        Self {
            follow_ups,
            directory,
            users,
            reminders,
        }
    }

    /// Create a follow-up. Validates the target exists and that any explicit
    /// assignee carries the Follow-Up Team role; with no assignee given,
    /// picks the first Follow-Up Team user (or leaves it unassigned).
    pub async fn create(
        &self,
        input: CreateFollowUp,
        created_by: Option<String>,
    ) -> Result<FollowUp> {
        match input.target_kind {
            TargetKind::Member => {
                if !self.directory.member_exists(&input.target_id).await? {
                    return Err(ShepherdError::NotFound("Target member not found".into()));
                }
            }
            TargetKind::Convert => {
                if !self.directory.convert_exists(&input.target_id).await? {
                    return Err(ShepherdError::NotFound("Target convert not found".into()));
                }
            }
        }

        let assigned_to = match input.assigned_to {
            Some(user_id) => {
                self.require_follow_up_team(&user_id).await?;
                Some(user_id)
            }
            None => self
                .users
                .first_with_role(Role::FollowUpTeam)
                .await?
                .map(|u| u.id),
        };

        let now = Utc::now();
        let mut attempts = Vec::new();
        if let Some(notes) = input.notes {
            attempts.push(Attempt {
                by: None,
                attempted_at: now,
                notes: Some(notes),
                outcome: Some("Created".into()),
            });
        }

        let follow_up = FollowUp {
            id: new_id(),
            target_kind: input.target_kind,
            target_id: input.target_id,
            assigned_to,
            status: FollowUpStatus::Pending,
            attempts,
            next_attempt_at: None,
            scheduled_at: input.scheduled_at,
            priority: input.priority.unwrap_or(Priority::Medium),
            created_by,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        };
        tracing::info!(
            "📋 Follow-up created for {:?} {} (assigned: {:?})",
            follow_up.target_kind,
            follow_up.target_id,
            follow_up.assigned_to
        );
        self.follow_ups.insert(follow_up).await
    }

    /// Append a contact attempt. Optionally advances `next_attempt_at`
    /// and/or overwrites the status.
    pub async fn record_attempt(
        &self,
        id: &str,
        by: Option<String>,
        attempt: AttemptInput,
    ) -> Result<FollowUp> {
        let mut follow_up = self.require(id).await?;

        let now = Utc::now();
        follow_up.attempts.push(Attempt {
            by,
            attempted_at: now,
            notes: attempt.notes,
            outcome: attempt.outcome,
        });
        if let Some(next) = attempt.next_attempt_at {
            follow_up.next_attempt_at = Some(next);
        }
        if let Some(status) = attempt.status {
            follow_up.status = status;
        }
        follow_up.updated_at = now;

        self.follow_ups.update(&follow_up).await?;
        Ok(follow_up)
    }

    /// The assignee's work queue: everything not Closed, soonest
    /// `next_attempt_at` first (unscheduled entries lead), ties broken by
    /// priority descending.
    pub async fn pending_for_user(&self, user_id: &str) -> Result<Vec<FollowUp>> {
        let mut pending = self.follow_ups.for_assignee(user_id).await?;
        pending.sort_by(|a, b| {
            a.next_attempt_at
                .cmp(&b.next_attempt_at)
                .then(b.priority.cmp(&a.priority))
        });
        Ok(pending)
    }

    /// The due-reminder sweep. Notifies the assignee of every due follow-up;
    /// a dispatch failure on one record never aborts the rest. Returns the
    /// number of due candidates examined (not the number notified).
    pub async fn run_due_reminders(&self) -> Result<usize> {
        let due = self.follow_ups.due(Utc::now()).await?;
        let examined = due.len();

        for follow_up in &due {
            let Some(user_id) = follow_up.assigned_to.as_deref() else {
                continue;
            };
            let user = match self.users.get(user_id).await {
                Ok(Some(user)) => user,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("assignee lookup failed for follow-up {}: {e}", follow_up.id);
                    continue;
                }
            };
            if let Err(e) = self.reminders.notify(&user, follow_up).await {
                tracing::warn!("reminder dispatch failed for follow-up {}: {e}", follow_up.id);
            }
        }

        Ok(examined)
    }

    /// Filtered listing, most recently updated first.
    pub async fn list(&self, filter: &FollowUpFilter, page: Page) -> Result<PageOut<FollowUp>> {
        self.follow_ups.list(filter, page).await
    }

    pub async fn get(&self, id: &str) -> Result<FollowUp> {
        self.require(id).await
    }

    /// Field-level update. Reassignment re-validates the assignee role.
    pub async fn update(&self, id: &str, update: FollowUpUpdate) -> Result<FollowUp> {
        let mut follow_up = self.require(id).await?;

        if let Some(user_id) = update.assigned_to {
            self.require_follow_up_team(&user_id).await?;
            follow_up.assigned_to = Some(user_id);
        }
        if let Some(at) = update.scheduled_at {
            follow_up.scheduled_at = Some(at);
        }
        if let Some(at) = update.next_attempt_at {
            follow_up.next_attempt_at = Some(at);
        }
        if let Some(priority) = update.priority {
            follow_up.priority = priority;
        }
        if let Some(status) = update.status {
            follow_up.status = status;
        }
        if let Some(at) = update.resolved_at {
            follow_up.resolved_at = Some(at);
        }
        follow_up.updated_at = Utc::now();

        self.follow_ups.update(&follow_up).await?;
        Ok(follow_up)
    }

    /// Reassign to a (role-validated) Follow-Up Team user.
    pub async fn assign(&self, id: &str, user_id: &str) -> Result<FollowUp> {
        self.update(
            id,
            FollowUpUpdate {
                assigned_to: Some(user_id.to_string()),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        if !self.follow_ups.delete(id).await? {
            return Err(ShepherdError::NotFound("Follow-up not found".into()));
        }
        Ok(())
    }

    async fn require(&self, id: &str) -> Result<FollowUp> {
        self.follow_ups
            .get(id)
            .await?
            .ok_or_else(|| ShepherdError::NotFound("Follow-up not found".into()))
    }

    async fn require_follow_up_team(&self, user_id: &str) -> Result<()> {
        match self.users.get(user_id).await? {
            Some(user) if user.role == Role::FollowUpTeam => Ok(()),
            _ => Err(ShepherdError::Validation(
                "Assigned user must be a Follow-Up Team member".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use shepherd_core::types::{Convert, Member, MemberStatus, User};
    use shepherd_store::MemoryStore;
    use std::sync::Mutex;

    /// Records every notification; fails on configured follow-up ids.
    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(String, String)>>,
        fail_for: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ReminderSink for RecordingSink {
        async fn notify(&self, user: &User, follow_up: &FollowUp) -> Result<()> {
            if self.fail_for.lock().unwrap().contains(&follow_up.id) {
                return Err(ShepherdError::Channel("simulated outage".into()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((user.id.clone(), follow_up.id.clone()));
            Ok(())
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        sink: Arc<RecordingSink>,
        engine: FollowUpEngine,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(RecordingSink::default());
        let engine = FollowUpEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
            sink.clone(),
        );

        let now = Utc::now();
        store
            .add_member(Member {
                id: "m1".into(),
                first_name: "John".into(),
                last_name: "Doe".into(),
                phone: "1234567890".into(),
                email: None,
                member_status: MemberStatus::Visitor,
                assigned_cell: None,
                assigned_follow_up_leader: None,
                created_at: now,
                updated_at: now,
            })
            .await;
        store
            .add_convert(Convert {
                id: "cv1".into(),
                name: "Jane".into(),
                phone: None,
                decision_date: None,
                created_at: now,
            })
            .await;
        store
            .add_user(User {
                id: "admin".into(),
                name: "Admin".into(),
                email: "admin@test.com".into(),
                phone: None,
                role: Role::Admin,
            })
            .await;
        store
            .add_user(User {
                id: "fut1".into(),
                name: "Follow-Up Leader".into(),
                email: "followup@test.com".into(),
                phone: Some("233200000001".into()),
                role: Role::FollowUpTeam,
            })
            .await;

        Fixture {
            store,
            sink,
            engine,
        }
    }

    fn create_input(target_id: &str) -> CreateFollowUp {
        CreateFollowUp {
            target_kind: TargetKind::Member,
            target_id: target_id.into(),
            assigned_to: None,
            scheduled_at: None,
            priority: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_defaults_and_auto_assignment() {
        let fx = fixture().await;
        let f = fx.engine.create(create_input("m1"), None).await.unwrap();
        assert_eq!(f.status, FollowUpStatus::Pending);
        assert_eq!(f.priority, Priority::Medium);
        assert_eq!(f.assigned_to.as_deref(), Some("fut1"));
        assert!(f.attempts.is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_missing_member_target() {
        let fx = fixture().await;
        let err = fx
            .engine
            .create(create_input("ghost"), None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Target member not found");
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_create_rejects_missing_convert_target() {
        let fx = fixture().await;
        let mut input = create_input("ghost");
        input.target_kind = TargetKind::Convert;
        let err = fx.engine.create(input, None).await.unwrap_err();
        assert_eq!(err.to_string(), "Target convert not found");
    }

    #[tokio::test]
    async fn test_create_rejects_non_team_assignee() {
        let fx = fixture().await;
        let mut input = create_input("m1");
        input.assigned_to = Some("admin".into());
        let err = fx.engine.create(input, None).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_create_unassigned_when_no_team_exists() {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(RecordingSink::default());
        let engine =
            FollowUpEngine::new(store.clone(), store.clone(), store.clone(), sink);
        let now = Utc::now();
        store
            .add_member(Member {
                id: "m1".into(),
                first_name: "A".into(),
                last_name: "B".into(),
                phone: "1".into(),
                email: None,
                member_status: MemberStatus::Visitor,
                assigned_cell: None,
                assigned_follow_up_leader: None,
                created_at: now,
                updated_at: now,
            })
            .await;

        let f = engine.create(create_input("m1"), None).await.unwrap();
        assert!(f.assigned_to.is_none());
        assert_eq!(f.status, FollowUpStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_seeds_attempt_from_notes() {
        let fx = fixture().await;
        let mut input = create_input("m1");
        input.notes = Some("New visitor needs follow-up".into());
        let f = fx.engine.create(input, Some("admin".into())).await.unwrap();
        assert_eq!(f.attempts.len(), 1);
        assert_eq!(f.attempts[0].outcome.as_deref(), Some("Created"));
        assert_eq!(
            f.attempts[0].notes.as_deref(),
            Some("New visitor needs follow-up")
        );
    }

    #[tokio::test]
    async fn test_record_attempt_appends_monotonically() {
        let fx = fixture().await;
        let f = fx.engine.create(create_input("m1"), None).await.unwrap();

        let first = fx
            .engine
            .record_attempt(
                &f.id,
                Some("fut1".into()),
                AttemptInput {
                    notes: Some("Called member, no answer".into()),
                    outcome: Some("No Response".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(first.attempts.len(), 1);
        assert_eq!(first.attempts[0].by.as_deref(), Some("fut1"));

        let second = fx
            .engine
            .record_attempt(&f.id, None, AttemptInput::default())
            .await
            .unwrap();
        assert_eq!(second.attempts.len(), 2);
        assert!(second.attempts[1].attempted_at >= second.attempts[0].attempted_at);
    }

    #[tokio::test]
    async fn test_record_attempt_overwrites_status_and_next() {
        let fx = fixture().await;
        let f = fx.engine.create(create_input("m1"), None).await.unwrap();
        let next = Utc::now() + Duration::days(2);

        let updated = fx
            .engine
            .record_attempt(
                &f.id,
                None,
                AttemptInput {
                    status: Some(FollowUpStatus::Completed),
                    next_attempt_at: Some(next),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, FollowUpStatus::Completed);
        assert_eq!(updated.next_attempt_at, Some(next));
    }

    #[tokio::test]
    async fn test_record_attempt_unknown_id() {
        let fx = fixture().await;
        let err = fx
            .engine
            .record_attempt("ghost", None, AttemptInput::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Follow-up not found");
    }

    #[tokio::test]
    async fn test_pending_queue_order_and_exclusion() {
        let fx = fixture().await;
        let now = Utc::now();

        let unscheduled = fx.engine.create(create_input("m1"), None).await.unwrap();
        let soon_high = fx
            .engine
            .create(
                CreateFollowUp {
                    priority: Some(Priority::High),
                    ..create_input("m1")
                },
                None,
            )
            .await
            .unwrap();
        let soon_low = fx
            .engine
            .create(
                CreateFollowUp {
                    priority: Some(Priority::Low),
                    ..create_input("m1")
                },
                None,
            )
            .await
            .unwrap();
        let closed = fx.engine.create(create_input("m1"), None).await.unwrap();

        let same_time = now + Duration::hours(1);
        for id in [&soon_high.id, &soon_low.id] {
            fx.engine
                .record_attempt(
                    id,
                    None,
                    AttemptInput {
                        next_attempt_at: Some(same_time),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }
        fx.engine
            .record_attempt(
                &closed.id,
                None,
                AttemptInput {
                    status: Some(FollowUpStatus::Closed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let queue = fx.engine.pending_for_user("fut1").await.unwrap();
        let ids: Vec<&str> = queue.iter().map(|f| f.id.as_str()).collect();
        // unscheduled (null) first, then same-time entries High before Low,
        // Closed excluded entirely
        assert_eq!(
            ids,
            vec![
                unscheduled.id.as_str(),
                soon_high.id.as_str(),
                soon_low.id.as_str()
            ]
        );
    }

    #[tokio::test]
    async fn test_due_sweep_counts_and_notifies() {
        let fx = fixture().await;
        let now = Utc::now();

        let due = fx.engine.create(create_input("m1"), None).await.unwrap();
        fx.engine
            .record_attempt(
                &due.id,
                None,
                AttemptInput {
                    next_attempt_at: Some(now - Duration::minutes(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let not_due = fx.engine.create(create_input("m1"), None).await.unwrap();
        fx.engine
            .record_attempt(
                &not_due.id,
                None,
                AttemptInput {
                    next_attempt_at: Some(now + Duration::hours(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let examined = fx.engine.run_due_reminders().await.unwrap();
        assert_eq!(examined, 1);
        let sent = fx.sink.sent.lock().unwrap().clone();
        assert_eq!(sent, vec![("fut1".to_string(), due.id.clone())]);
    }

    #[tokio::test]
    async fn test_due_sweep_skips_unassigned_silently() {
        let fx = fixture().await;
        let f = fx.engine.create(create_input("m1"), None).await.unwrap();
        // strip the assignee, make it due
        let mut raw = FollowUpStore::get(fx.store.as_ref(), &f.id)
            .await
            .unwrap()
            .unwrap();
        raw.assigned_to = None;
        raw.scheduled_at = Some(Utc::now() - Duration::minutes(1));
        FollowUpStore::update(fx.store.as_ref(), &raw).await.unwrap();

        let examined = fx.engine.run_due_reminders().await.unwrap();
        // counted as examined, but nothing dispatched
        assert_eq!(examined, 1);
        assert!(fx.sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_due_sweep_isolates_dispatch_failures() {
        let fx = fixture().await;
        let now = Utc::now();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let f = fx.engine.create(create_input("m1"), None).await.unwrap();
            fx.engine
                .record_attempt(
                    &f.id,
                    None,
                    AttemptInput {
                        next_attempt_at: Some(now - Duration::minutes(1)),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            ids.push(f.id);
        }
        fx.sink.fail_for.lock().unwrap().push(ids[1].clone());

        let examined = fx.engine.run_due_reminders().await.unwrap();
        assert_eq!(examined, 3);
        // the failing record is skipped, the other two still go out
        assert_eq!(fx.sink.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_repeated_sweep_renotifies() {
        let fx = fixture().await;
        let f = fx.engine.create(create_input("m1"), None).await.unwrap();
        fx.engine
            .record_attempt(
                &f.id,
                None,
                AttemptInput {
                    next_attempt_at: Some(Utc::now() - Duration::minutes(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        fx.engine.run_due_reminders().await.unwrap();
        fx.engine.run_due_reminders().await.unwrap();
        assert_eq!(fx.sink.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_assign_validates_role() {
        let fx = fixture().await;
        let f = fx.engine.create(create_input("m1"), None).await.unwrap();
        let err = fx.engine.assign(&f.id, "admin").await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        let reassigned = fx.engine.assign(&f.id, "fut1").await.unwrap();
        assert_eq!(reassigned.assigned_to.as_deref(), Some("fut1"));
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let fx = fixture().await;
        let f = fx.engine.create(create_input("m1"), None).await.unwrap();
        fx.engine.create(create_input("m1"), None).await.unwrap();
        fx.engine
            .record_attempt(
                &f.id,
                None,
                AttemptInput {
                    status: Some(FollowUpStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let all = fx
            .engine
            .list(&FollowUpFilter::default(), Page::default())
            .await
            .unwrap();
        assert_eq!(all.total, 2);

        let completed = fx
            .engine
            .list(
                &FollowUpFilter {
                    status: Some(FollowUpStatus::Completed),
                    ..Default::default()
                },
                Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(completed.total, 1);
        assert_eq!(completed.items[0].id, f.id);
    }

    #[tokio::test]
    async fn test_delete_unknown_id() {
        let fx = fixture().await;
        let err = fx.engine.delete("ghost").await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
