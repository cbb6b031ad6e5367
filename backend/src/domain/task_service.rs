//! Task service domain logic.
//!
//! Creates and edits tasks and drives them through their lifecycle. Every
//! transition that moves coins runs as one database transaction:
//!
//! 1. compare-and-set the task status against the status we read,
//! 2. adjust the child's balance,
//! 3. append a ledger row and an event.
//!
//! If step 1 finds the task already moved by someone else, the transaction
//! is rolled back and the action is re-evaluated against the fresh state.
//! Two concurrent approvals therefore credit the reward once.

use chrono::Utc;
use shared::{EventKind, TaskStatus};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::commands::tasks::{CreateTaskCommand, TransitionResult, UpdateTaskCommand};
use crate::domain::models::account::{AuthUser, Child, Parent};
use crate::domain::models::task::{
    validate_description, validate_reward, validate_title, Task, TaskAction, TaskValidationError,
    Transition,
};
use crate::error::{DomainError, DomainResult};
use crate::storage::{
    ChildRepository, DbConnection, EventRepository, LedgerRepository, NewEvent, NewLedgerEntry,
    TaskRepository,
};

/// How often a lost compare-and-set is retried before giving up
const MAX_TRANSITION_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct TaskService {
    db: DbConnection,
    tasks: TaskRepository,
    children: ChildRepository,
    ledger: LedgerRepository,
    events: EventRepository,
}

impl TaskService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            tasks: TaskRepository::new(db.clone()),
            children: ChildRepository::new(db.clone()),
            ledger: LedgerRepository::new(db.clone()),
            events: EventRepository::new(db.clone()),
            db,
        }
    }

    /// Create a task for one of the parent's children
    pub async fn create_task(
        &self,
        parent: &Parent,
        command: CreateTaskCommand,
    ) -> DomainResult<Task> {
        info!("Creating task '{}' for child {}", command.title, command.child_id);

        let title = validate_title(&command.title)?;
        let description = validate_description(&command.description)?;
        let reward = validate_reward(command.reward)?;

        let child = self.load_child(&command.child_id).await?;
        if child.parent_id != parent.id {
            warn!("Parent {} tried to assign a task to child {}", parent.id, child.id);
            return Err(DomainError::forbidden("Child does not belong to this parent"));
        }

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            title,
            description,
            reward,
            status: TaskStatus::Incomplete,
            completed_at: None,
            approved_at: None,
            child_id: child.id.clone(),
            parent_id: parent.id.clone(),
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.pool().begin().await?;
        self.tasks.store_task(&mut tx, &task).await?;
        self.events
            .append(
                &mut tx,
                NewEvent {
                    kind: EventKind::TaskCreated,
                    parent_id: &task.parent_id,
                    child_id: &task.child_id,
                    task_id: Some(&task.id),
                    message: format!("New task: {} ({} coins)", task.title, task.reward),
                    coins_delta: 0,
                    created_at: now,
                },
            )
            .await?;
        tx.commit().await?;

        info!("Created task {} for child {}", task.id, task.child_id);
        Ok(task)
    }

    /// Get a task the viewer is allowed to see
    pub async fn get_task(&self, viewer: &AuthUser, task_id: &str) -> DomainResult<Task> {
        let task = self.load_task(task_id).await?;
        ensure_can_view_task(viewer, &task)?;
        Ok(task)
    }

    /// List a child's tasks, newest first
    pub async fn list_for_child(
        &self,
        viewer: &AuthUser,
        child_id: &str,
    ) -> DomainResult<Vec<Task>> {
        let child = self.load_child(child_id).await?;
        viewer.ensure_can_view_child(&child)?;

        let tasks = self.tasks.list_for_child(child_id).await?;
        info!("Found {} tasks for child {}", tasks.len(), child_id);
        Ok(tasks)
    }

    /// Every task across the parent's children
    pub async fn list_for_parent(&self, parent: &Parent) -> DomainResult<Vec<Task>> {
        let tasks = self.tasks.list_for_parent(&parent.id).await?;
        info!("Found {} tasks for parent {}", tasks.len(), parent.id);
        Ok(tasks)
    }

    /// Edit an incomplete task
    pub async fn update_task(
        &self,
        parent: &Parent,
        task_id: &str,
        command: UpdateTaskCommand,
    ) -> DomainResult<Task> {
        let mut task = self.load_task(task_id).await?;
        ensure_task_parent(parent, &task)?;

        if task.status != TaskStatus::Incomplete {
            return Err(TaskValidationError::NotEditable.into());
        }
        if let Some(title) = command.title {
            task.title = validate_title(&title)?;
        }
        if let Some(description) = command.description {
            task.description = validate_description(&description)?;
        }
        if let Some(reward) = command.reward {
            task.reward = validate_reward(reward)?;
        }
        task.updated_at = Utc::now();

        if !self.tasks.update_details(&task).await? {
            return Err(TaskValidationError::NotEditable.into());
        }

        info!("Updated task {}", task.id);
        Ok(task)
    }

    /// Delete a task that has not been approved
    pub async fn delete_task(&self, parent: &Parent, task_id: &str) -> DomainResult<()> {
        let task = self.load_task(task_id).await?;
        ensure_task_parent(parent, &task)?;

        let mut tx = self.db.pool().begin().await?;
        if !self.tasks.delete_unapproved(&mut tx, task_id).await? {
            tx.rollback().await?;
            return Err(TaskValidationError::NotDeletable.into());
        }
        self.events
            .append(
                &mut tx,
                NewEvent {
                    kind: EventKind::TaskDeleted,
                    parent_id: &task.parent_id,
                    child_id: &task.child_id,
                    task_id: Some(&task.id),
                    message: format!("Task removed: {}", task.title),
                    coins_delta: 0,
                    created_at: Utc::now(),
                },
            )
            .await?;
        tx.commit().await?;

        info!("Deleted task {}", task_id);
        Ok(())
    }

    pub async fn complete(
        &self,
        viewer: &AuthUser,
        task_id: &str,
    ) -> DomainResult<TransitionResult> {
        self.perform(viewer, task_id, TaskAction::Complete).await
    }

    pub async fn undo(&self, viewer: &AuthUser, task_id: &str) -> DomainResult<TransitionResult> {
        self.perform(viewer, task_id, TaskAction::Undo).await
    }

    pub async fn approve(
        &self,
        viewer: &AuthUser,
        task_id: &str,
    ) -> DomainResult<TransitionResult> {
        self.perform(viewer, task_id, TaskAction::Approve).await
    }

    pub async fn reject(&self, viewer: &AuthUser, task_id: &str) -> DomainResult<TransitionResult> {
        self.perform(viewer, task_id, TaskAction::Reject).await
    }

    pub async fn unapprove(
        &self,
        viewer: &AuthUser,
        task_id: &str,
    ) -> DomainResult<TransitionResult> {
        self.perform(viewer, task_id, TaskAction::Unapprove).await
    }

    /// Run one lifecycle action
    pub async fn perform(
        &self,
        viewer: &AuthUser,
        task_id: &str,
        action: TaskAction,
    ) -> DomainResult<TransitionResult> {
        if viewer.role() != action.actor() {
            return Err(DomainError::forbidden(format!(
                "Only a {} can {} a task",
                action.actor(),
                action
            )));
        }

        for attempt in 1..=MAX_TRANSITION_ATTEMPTS {
            let task = self.load_task(task_id).await?;
            ensure_can_view_task(viewer, &task)?;
            let child = self.load_child(&task.child_id).await?;

            let (to, effect) = match action.transition(task.status)? {
                Transition::Unchanged => {
                    info!("Task {} already {}, nothing to {}", task.id, task.status, action);
                    return Ok(TransitionResult {
                        task,
                        changed: false,
                        child_coins: child.coins,
                    });
                }
                Transition::Changed { to, effect, .. } => (to, effect),
            };

            let now = Utc::now();
            let mut updated = task.clone();
            updated.move_to(to, now);
            let delta = effect.delta(task.reward);

            let mut tx = self.db.pool().begin().await?;
            if !self.tasks.compare_and_set_status(&mut tx, &updated, task.status).await? {
                tx.rollback().await?;
                warn!(
                    "Task {} changed while trying to {} (attempt {}), retrying",
                    task.id, action, attempt
                );
                continue;
            }

            let child_coins = if delta != 0 {
                self.children
                    .adjust_coins(&mut tx, &child.id, delta)
                    .await?
                    .ok_or_else(|| DomainError::not_found("Child", &child.id))?
            } else {
                self.children
                    .coins(&mut tx, &child.id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("Child", &child.id))?
            };

            if let Some(reason) = effect.ledger_reason() {
                self.ledger
                    .append(
                        &mut tx,
                        NewLedgerEntry {
                            child_id: &child.id,
                            task_id: Some(&task.id),
                            reason,
                            delta,
                            balance_after: child_coins,
                            created_at: now,
                        },
                    )
                    .await?;
            }

            self.events
                .append(
                    &mut tx,
                    NewEvent {
                        kind: action.event_kind(),
                        parent_id: &task.parent_id,
                        child_id: &task.child_id,
                        task_id: Some(&task.id),
                        message: transition_message(action, &updated, &child),
                        coins_delta: delta,
                        created_at: now,
                    },
                )
                .await?;
            tx.commit().await?;

            info!(
                "Task {}: {} -> {} via {} (coins {:+}, balance {})",
                task.id, task.status, to, action, delta, child_coins
            );
            return Ok(TransitionResult {
                task: updated,
                changed: true,
                child_coins,
            });
        }

        Err(DomainError::Conflict(format!(
            "Task {} kept changing, try again",
            task_id
        )))
    }

    async fn load_task(&self, task_id: &str) -> DomainResult<Task> {
        self.tasks
            .get_task(task_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Task", task_id))
    }

    async fn load_child(&self, child_id: &str) -> DomainResult<Child> {
        self.children
            .get_child(child_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Child", child_id))
    }
}

fn ensure_can_view_task(viewer: &AuthUser, task: &Task) -> DomainResult<()> {
    let allowed = match viewer {
        AuthUser::Parent(parent) => task.parent_id == parent.id,
        AuthUser::Child(child) => task.child_id == child.id,
    };
    if allowed {
        Ok(())
    } else {
        Err(DomainError::forbidden(format!("Not allowed to access task {}", task.id)))
    }
}

fn ensure_task_parent(parent: &Parent, task: &Task) -> DomainResult<()> {
    if task.parent_id == parent.id {
        Ok(())
    } else {
        Err(DomainError::forbidden(format!("Not allowed to modify task {}", task.id)))
    }
}

fn transition_message(action: TaskAction, task: &Task, child: &Child) -> String {
    match action {
        TaskAction::Complete => format!("{} finished: {}", child.name, task.title),
        TaskAction::Undo => format!("{} took back: {}", child.name, task.title),
        TaskAction::Approve => format!("Approved: {} (+{} coins)", task.title, task.reward),
        TaskAction::Reject => format!("Not done yet: {}", task.title),
        TaskAction::Unapprove => {
            format!("Approval withdrawn: {} (-{} coins)", task.title, task.reward)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::account::Parent;
    use crate::storage::ParentRepository;
    use shared::{LedgerReason, Role};

    struct Fixture {
        db: DbConnection,
        service: TaskService,
        ledger: LedgerRepository,
        events: EventRepository,
        parent: AuthUser,
        child: AuthUser,
    }

    async fn setup_test() -> Fixture {
        let db = DbConnection::in_memory().await.expect("Failed to create test database");
        setup_family(db).await
    }

    async fn setup_family(db: DbConnection) -> Fixture {
        let now = Utc::now();
        let parent = Parent {
            id: "p1".into(),
            name: "Pat".into(),
            email: "pat@example.com".into(),
            password_hash: "hash".into(),
            created_at: now,
        };
        let child = Child {
            id: "c1".into(),
            name: "Kim".into(),
            email: "kim@example.com".into(),
            password_hash: "hash".into(),
            parent_id: "p1".into(),
            coins: 0,
            created_at: now,
        };
        ParentRepository::new(db.clone()).store_parent(&parent).await.unwrap();
        ChildRepository::new(db.clone()).store_child(&child).await.unwrap();

        Fixture {
            service: TaskService::new(db.clone()),
            ledger: LedgerRepository::new(db.clone()),
            events: EventRepository::new(db.clone()),
            db,
            parent: AuthUser::Parent(parent),
            child: AuthUser::Child(child),
        }
    }

    async fn create(f: &Fixture, reward: i64) -> Task {
        let parent = f.parent.require_parent().unwrap();
        f.service
            .create_task(
                parent,
                CreateTaskCommand {
                    child_id: "c1".into(),
                    title: "Dishes".into(),
                    description: "After dinner".into(),
                    reward,
                },
            )
            .await
            .expect("Failed to create task")
    }

    async fn coins(f: &Fixture) -> i64 {
        f.service.children.get_child("c1").await.unwrap().unwrap().coins
    }

    #[tokio::test]
    async fn test_create_task_starts_incomplete_without_coins() {
        let f = setup_test().await;
        let task = create(&f, 10).await;

        assert_eq!(task.status, TaskStatus::Incomplete);
        assert_eq!(coins(&f).await, 0);
        let listed = f.service.list_for_child(&f.child, "c1").await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_full_lifecycle_moves_coins_exactly() {
        let f = setup_test().await;
        let task = create(&f, 10).await;

        let completed = f.service.complete(&f.child, &task.id).await.unwrap();
        assert_eq!(completed.task.status, TaskStatus::PendingApproval);
        assert_eq!(completed.child_coins, 0);

        let approved = f.service.approve(&f.parent, &task.id).await.unwrap();
        assert_eq!(approved.task.status, TaskStatus::Approved);
        assert_eq!(approved.child_coins, 10);
        assert_eq!(coins(&f).await, 10);

        let unapproved = f.service.unapprove(&f.parent, &task.id).await.unwrap();
        assert_eq!(unapproved.task.status, TaskStatus::PendingApproval);
        assert_eq!(unapproved.child_coins, 0);

        let entries = f.ledger.list_for_child("c1").await.unwrap();
        let reasons: Vec<LedgerReason> = entries.iter().map(|e| e.reason).collect();
        assert_eq!(reasons, vec![LedgerReason::TaskApproved, LedgerReason::TaskUnapproved]);
        assert_eq!(f.ledger.sum_for_child("c1").await.unwrap(), coins(&f).await);
    }

    #[tokio::test]
    async fn test_double_approve_credits_once() {
        let f = setup_test().await;
        let task = create(&f, 7).await;
        f.service.complete(&f.child, &task.id).await.unwrap();

        let first = f.service.approve(&f.parent, &task.id).await.unwrap();
        let second = f.service.approve(&f.parent, &task.id).await.unwrap();

        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(coins(&f).await, 7);
    }

    #[tokio::test]
    async fn test_concurrent_approvals_credit_once() {
        let f = setup_test().await;
        let task = create(&f, 10).await;
        f.service.complete(&f.child, &task.id).await.unwrap();

        let (a, b) = tokio::join!(
            f.service.approve(&f.parent, &task.id),
            f.service.approve(&f.parent, &task.id)
        );
        let changed = [a.unwrap().changed, b.unwrap().changed];

        assert_eq!(changed.iter().filter(|c| **c).count(), 1);
        assert_eq!(coins(&f).await, 10);
        assert_eq!(f.ledger.list_for_child("c1").await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_parallel_approvals_on_file_database_credit_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join("chope.db").display());
        let f = setup_family(DbConnection::new(&url).await.expect("Failed to open database")).await;

        for round in 0..5 {
            let task = create(&f, 10).await;
            f.service.complete(&f.child, &task.id).await.unwrap();

            let mut handles = Vec::new();
            for _ in 0..16 {
                let service = f.service.clone();
                let parent = f.parent.clone();
                let task_id = task.id.clone();
                handles.push(tokio::spawn(async move {
                    service.approve(&parent, &task_id).await
                }));
            }

            let mut changed = 0;
            for handle in handles {
                if handle.await.unwrap().expect("approve should succeed").changed {
                    changed += 1;
                }
            }
            assert_eq!(changed, 1);
            assert_eq!(coins(&f).await, 10 * (round + 1));
        }

        assert_eq!(f.ledger.list_for_child("c1").await.unwrap().len(), 5);
        assert_eq!(f.ledger.sum_for_child("c1").await.unwrap(), 50);
        f.db.pool().close().await;
    }

    #[tokio::test]
    async fn test_unapprove_after_spending_goes_negative() {
        let f = setup_test().await;
        let task = create(&f, 10).await;
        f.service.complete(&f.child, &task.id).await.unwrap();
        f.service.approve(&f.parent, &task.id).await.unwrap();

        let mut tx = f.db.pool().begin().await.unwrap();
        let left = f.service.children.spend_coins(&mut tx, "c1", 8).await.unwrap();
        assert_eq!(left, Some(2));
        f.ledger
            .append(
                &mut tx,
                NewLedgerEntry {
                    child_id: "c1",
                    task_id: None,
                    reason: LedgerReason::AccessoryPurchased,
                    delta: -8,
                    balance_after: 2,
                    created_at: Utc::now(),
                },
            )
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let result = f.service.unapprove(&f.parent, &task.id).await.unwrap();
        assert!(result.changed);
        assert_eq!(result.child_coins, -8);
        assert_eq!(coins(&f).await, -8);
        assert_eq!(f.ledger.sum_for_child("c1").await.unwrap(), -8);
    }

    #[tokio::test]
    async fn test_unapprove_never_approved_task() {
        let f = setup_test().await;
        let task = create(&f, 10).await;

        let result = f.service.unapprove(&f.parent, &task.id).await;
        assert!(matches!(result, Err(DomainError::Conflict(_))));

        f.service.complete(&f.child, &task.id).await.unwrap();
        let noop = f.service.unapprove(&f.parent, &task.id).await.unwrap();
        assert!(!noop.changed);
        assert_eq!(coins(&f).await, 0);
    }

    #[tokio::test]
    async fn test_reject_and_undo_return_to_incomplete() {
        let f = setup_test().await;
        let task = create(&f, 10).await;

        f.service.complete(&f.child, &task.id).await.unwrap();
        let rejected = f.service.reject(&f.parent, &task.id).await.unwrap();
        assert_eq!(rejected.task.status, TaskStatus::Incomplete);
        assert!(rejected.task.completed_at.is_none());

        f.service.complete(&f.child, &task.id).await.unwrap();
        let undone = f.service.undo(&f.child, &task.id).await.unwrap();
        assert_eq!(undone.task.status, TaskStatus::Incomplete);
        assert_eq!(coins(&f).await, 0);
    }

    #[tokio::test]
    async fn test_roles_are_enforced() {
        let f = setup_test().await;
        let task = create(&f, 10).await;

        assert!(matches!(
            f.service.complete(&f.parent, &task.id).await,
            Err(DomainError::Forbidden(_))
        ));
        f.service.complete(&f.child, &task.id).await.unwrap();
        assert!(matches!(
            f.service.approve(&f.child, &task.id).await,
            Err(DomainError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_other_family_cannot_touch_task() {
        let f = setup_test().await;
        let task = create(&f, 10).await;
        let stranger = AuthUser::Parent(Parent {
            id: "p2".into(),
            name: "Other".into(),
            email: "other@example.com".into(),
            password_hash: "hash".into(),
            created_at: Utc::now(),
        });

        assert!(matches!(
            f.service.get_task(&stranger, &task.id).await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            f.service.list_for_child(&stranger, "c1").await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            f.service.create_task(
                stranger.require_parent().unwrap(),
                CreateTaskCommand {
                    child_id: "c1".into(),
                    title: "Sneaky".into(),
                    description: String::new(),
                    reward: 1,
                },
            )
            .await,
            Err(DomainError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_task_is_not_found() {
        let f = setup_test().await;
        assert!(matches!(
            f.service.approve(&f.parent, "nope").await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete_rules() {
        let f = setup_test().await;
        let parent = f.parent.require_parent().unwrap();
        let task = create(&f, 10).await;

        let updated = f
            .service
            .update_task(
                parent,
                &task.id,
                UpdateTaskCommand {
                    reward: Some(15),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.reward, 15);

        f.service.complete(&f.child, &task.id).await.unwrap();
        f.service.approve(&f.parent, &task.id).await.unwrap();
        assert!(matches!(
            f.service.delete_task(parent, &task.id).await,
            Err(DomainError::Validation(_))
        ));

        let other = create(&f, 1).await;
        f.service.delete_task(parent, &other.id).await.unwrap();
        assert!(matches!(
            f.service.get_task(&f.parent, &other.id).await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_transitions_append_events() {
        let f = setup_test().await;
        let task = create(&f, 10).await;
        f.service.complete(&f.child, &task.id).await.unwrap();
        f.service.approve(&f.parent, &task.id).await.unwrap();
        f.service.approve(&f.parent, &task.id).await.unwrap();

        let events = f.events.list_visible(Role::Child, "c1", 0, 100).await.unwrap();
        let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::TaskCreated, EventKind::TaskCompleted, EventKind::TaskApproved]
        );
        assert_eq!(events[2].coins_delta, 10);
    }
}
