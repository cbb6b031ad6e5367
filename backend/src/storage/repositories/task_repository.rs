use anyhow::{anyhow, Result};
use shared::TaskStatus;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{parse_optional_timestamp, parse_timestamp};
use crate::domain::models::task::Task;
use crate::storage::DbConnection;

const TASK_COLUMNS: &str = "id, title, description, reward, status, completed_at, approved_at, \
                            child_id, parent_id, created_at, updated_at";

/// Repository for tasks
#[derive(Clone)]
pub struct TaskRepository {
    db: DbConnection,
}

impl TaskRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn store_task(&self, conn: &mut SqliteConnection, task: &Task) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tasks (id, title, description, reward, status, completed_at, approved_at,
                               child_id, parent_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.reward)
        .bind(task.status.to_string())
        .bind(task.completed_at.map(|t| t.to_rfc3339()))
        .bind(task.approved_at.map(|t| t.to_rfc3339()))
        .bind(&task.child_id)
        .bind(&task.parent_id)
        .bind(task.created_at.to_rfc3339())
        .bind(task.updated_at.to_rfc3339())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Option<Task>> {
        let row = sqlx::query(&format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS))
            .bind(task_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(Self::from_row).transpose()
    }

    /// Tasks of one child, newest first
    pub async fn list_for_child(&self, child_id: &str) -> Result<Vec<Task>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tasks WHERE child_id = ? ORDER BY created_at DESC, id ASC",
            TASK_COLUMNS
        ))
        .bind(child_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(Self::from_row).collect()
    }

    /// Tasks across all of a parent's children, newest first
    pub async fn list_for_parent(&self, parent_id: &str) -> Result<Vec<Task>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tasks WHERE parent_id = ? ORDER BY created_at DESC, id ASC",
            TASK_COLUMNS
        ))
        .bind(parent_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(Self::from_row).collect()
    }

    /// Update title, description and reward, only while the task is still incomplete.
    /// Returns false when the task was no longer incomplete.
    pub async fn update_details(&self, task: &Task) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET title = ?, description = ?, reward = ?, updated_at = ?
            WHERE id = ? AND status = 'incomplete'
            "#,
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.reward)
        .bind(task.updated_at.to_rfc3339())
        .bind(&task.id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete a task unless it is approved. Returns false if nothing was deleted.
    pub async fn delete_unapproved(
        &self,
        conn: &mut SqliteConnection,
        task_id: &str,
    ) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ? AND status != 'approved'")
            .bind(task_id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Write the task's new status and timestamps only if it is still in `expected`.
    /// Returns false when another writer got there first.
    pub async fn compare_and_set_status(
        &self,
        conn: &mut SqliteConnection,
        task: &Task,
        expected: TaskStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = ?, completed_at = ?, approved_at = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(task.status.to_string())
        .bind(task.completed_at.map(|t| t.to_rfc3339()))
        .bind(task.approved_at.map(|t| t.to_rfc3339()))
        .bind(task.updated_at.to_rfc3339())
        .bind(&task.id)
        .bind(expected.to_string())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    fn from_row(row: &SqliteRow) -> Result<Task> {
        Ok(Task {
            id: row.get("id"),
            title: row.get("title"),
            description: row.get("description"),
            reward: row.get("reward"),
            status: parse_status(&row.get::<String, _>("status"))?,
            completed_at: parse_optional_timestamp(row.get("completed_at"))?,
            approved_at: parse_optional_timestamp(row.get("approved_at"))?,
            child_id: row.get("child_id"),
            parent_id: row.get("parent_id"),
            created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
            updated_at: parse_timestamp(&row.get::<String, _>("updated_at"))?,
        })
    }
}

fn parse_status(value: &str) -> Result<TaskStatus> {
    match value {
        "incomplete" => Ok(TaskStatus::Incomplete),
        "pending_approval" => Ok(TaskStatus::PendingApproval),
        "approved" => Ok(TaskStatus::Approved),
        other => Err(anyhow!("Unknown task status in database: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::account::{Child, Parent};
    use crate::storage::{ChildRepository, ParentRepository};
    use chrono::{Duration, Utc};

    async fn setup_test() -> (DbConnection, TaskRepository) {
        let db = DbConnection::in_memory().await.expect("Failed to create test database");
        let now = Utc::now();
        ParentRepository::new(db.clone())
            .store_parent(&Parent {
                id: "p1".into(),
                name: "Pat".into(),
                email: "pat@example.com".into(),
                password_hash: "hash".into(),
                created_at: now,
            })
            .await
            .unwrap();
        ChildRepository::new(db.clone())
            .store_child(&Child {
                id: "c1".into(),
                name: "Kim".into(),
                email: "kim@example.com".into(),
                password_hash: "hash".into(),
                parent_id: "p1".into(),
                coins: 0,
                created_at: now,
            })
            .await
            .unwrap();
        (db.clone(), TaskRepository::new(db))
    }

    fn task(id: &str, offset_minutes: i64) -> Task {
        let at = Utc::now() + Duration::minutes(offset_minutes);
        Task {
            id: id.into(),
            title: format!("Task {}", id),
            description: String::new(),
            reward: 10,
            status: TaskStatus::Incomplete,
            completed_at: None,
            approved_at: None,
            child_id: "c1".into(),
            parent_id: "p1".into(),
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn test_store_and_list_tasks() {
        let (db, repo) = setup_test().await;
        let mut conn = db.pool().acquire().await.unwrap();
        repo.store_task(&mut conn, &task("t1", 0)).await.unwrap();
        repo.store_task(&mut conn, &task("t2", 5)).await.unwrap();
        drop(conn);

        let tasks = repo.list_for_child("c1").await.unwrap();
        assert_eq!(tasks.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(), vec!["t2", "t1"]);
        assert_eq!(repo.list_for_parent("p1").await.unwrap().len(), 2);

        let loaded = repo.get_task("t1").await.unwrap().unwrap();
        assert_eq!(loaded.status, TaskStatus::Incomplete);
        assert_eq!(loaded.reward, 10);
    }

    #[tokio::test]
    async fn test_compare_and_set_status_rejects_stale_writer() {
        let (db, repo) = setup_test().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let original = task("t1", 0);
        repo.store_task(&mut conn, &original).await.unwrap();

        let mut completed = original.clone();
        completed.move_to(TaskStatus::PendingApproval, Utc::now());

        assert!(repo
            .compare_and_set_status(&mut conn, &completed, TaskStatus::Incomplete)
            .await
            .unwrap());
        // Second writer still believes the task is incomplete
        assert!(!repo
            .compare_and_set_status(&mut conn, &completed, TaskStatus::Incomplete)
            .await
            .unwrap());
        drop(conn);

        let loaded = repo.get_task("t1").await.unwrap().unwrap();
        assert_eq!(loaded.status, TaskStatus::PendingApproval);
        assert!(loaded.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_update_and_delete_guards() {
        let (db, repo) = setup_test().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let mut approved = task("t1", 0);
        approved.move_to(TaskStatus::Approved, Utc::now());
        repo.store_task(&mut conn, &approved).await.unwrap();
        assert!(!repo.delete_unapproved(&mut conn, "t1").await.unwrap());
        drop(conn);

        approved.title = "Renamed".into();
        assert!(!repo.update_details(&approved).await.unwrap());

        let mut conn = db.pool().acquire().await.unwrap();
        repo.store_task(&mut conn, &task("t2", 0)).await.unwrap();
        assert!(repo.delete_unapproved(&mut conn, "t2").await.unwrap());
        drop(conn);
        assert!(repo.get_task("t2").await.unwrap().is_none());
    }
}
