use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use shared::{Event, EventKind, Role};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::storage::DbConnection;

/// An event about to be appended to the log
#[derive(Debug, Clone)]
pub struct NewEvent<'a> {
    pub kind: EventKind,
    pub parent_id: &'a str,
    pub child_id: &'a str,
    pub task_id: Option<&'a str>,
    pub message: String,
    pub coins_delta: i64,
    pub created_at: DateTime<Utc>,
}

/// Append-only event log plus each account's notification cursor
#[derive(Clone)]
pub struct EventRepository {
    db: DbConnection,
}

impl EventRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Append an event and return its sequence number
    pub async fn append(&self, conn: &mut SqliteConnection, event: NewEvent<'_>) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO events
                (kind, parent_id, child_id, task_id, message, coins_delta, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(kind_to_str(event.kind))
        .bind(event.parent_id)
        .bind(event.child_id)
        .bind(event.task_id)
        .bind(&event.message)
        .bind(event.coins_delta)
        .bind(event.created_at.to_rfc3339())
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Events visible to an account with `seq > after`, oldest first
    pub async fn list_visible(
        &self,
        role: Role,
        account_id: &str,
        after: i64,
        limit: u32,
    ) -> Result<Vec<Event>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT seq, kind, parent_id, child_id, task_id, message, coins_delta, created_at
            FROM events
            WHERE {} = ? AND seq > ?
            ORDER BY seq ASC
            LIMIT ?
            "#,
            owner_column(role)
        ))
        .bind(account_id)
        .bind(after)
        .bind(limit as i64)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(Self::from_row).collect()
    }

    /// The newest `limit` visible events with `seq > after` whose kind is in
    /// `kinds`, newest first
    pub async fn list_recent_of_kinds(
        &self,
        role: Role,
        account_id: &str,
        after: i64,
        kinds: &[EventKind],
        limit: u32,
    ) -> Result<Vec<Event>> {
        if kinds.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; kinds.len()].join(", ");
        let sql = format!(
            r#"
            SELECT seq, kind, parent_id, child_id, task_id, message, coins_delta, created_at
            FROM events
            WHERE {} = ? AND seq > ? AND kind IN ({})
            ORDER BY seq DESC
            LIMIT ?
            "#,
            owner_column(role),
            placeholders
        );

        let mut query = sqlx::query(&sql).bind(account_id).bind(after);
        for kind in kinds {
            query = query.bind(kind_to_str(*kind));
        }
        let rows = query.bind(limit as i64).fetch_all(self.db.pool()).await?;

        rows.iter().map(Self::from_row).collect()
    }

    /// Highest seq visible to an account, 0 when there is none
    pub async fn latest_visible_seq(&self, role: Role, account_id: &str) -> Result<i64> {
        let row = sqlx::query(&format!(
            "SELECT COALESCE(MAX(seq), 0) AS latest FROM events WHERE {} = ?",
            owner_column(role)
        ))
        .bind(account_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(row.get("latest"))
    }

    /// (cleared_through, cleared_at) for an account, if it ever cleared
    pub async fn get_cursor(&self, account_id: &str) -> Result<Option<(i64, String)>> {
        let row = sqlx::query(
            "SELECT cleared_through, cleared_at FROM notification_cursors WHERE account_id = ?",
        )
        .bind(account_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|r| (r.get("cleared_through"), r.get("cleared_at"))))
    }

    pub async fn set_cursor(
        &self,
        account_id: &str,
        cleared_through: i64,
        cleared_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notification_cursors (account_id, cleared_through, cleared_at)
            VALUES (?, ?, ?)
            ON CONFLICT(account_id) DO UPDATE SET
                cleared_through = MAX(cleared_through, excluded.cleared_through),
                cleared_at = excluded.cleared_at
            "#,
        )
        .bind(account_id)
        .bind(cleared_through)
        .bind(cleared_at.to_rfc3339())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    fn from_row(row: &SqliteRow) -> Result<Event> {
        Ok(Event {
            seq: row.get("seq"),
            kind: kind_from_str(&row.get::<String, _>("kind"))?,
            parent_id: row.get("parent_id"),
            child_id: row.get("child_id"),
            task_id: row.get("task_id"),
            message: row.get("message"),
            coins_delta: row.get("coins_delta"),
            created_at: row.get("created_at"),
        })
    }
}

fn owner_column(role: Role) -> &'static str {
    match role {
        Role::Parent => "parent_id",
        Role::Child => "child_id",
    }
}

fn kind_to_str(kind: EventKind) -> &'static str {
    match kind {
        EventKind::TaskCreated => "task_created",
        EventKind::TaskDeleted => "task_deleted",
        EventKind::TaskCompleted => "task_completed",
        EventKind::TaskUndone => "task_undone",
        EventKind::TaskApproved => "task_approved",
        EventKind::TaskRejected => "task_rejected",
        EventKind::TaskUnapproved => "task_unapproved",
        EventKind::PetAdopted => "pet_adopted",
        EventKind::PetFed => "pet_fed",
        EventKind::AccessoryPurchased => "accessory_purchased",
    }
}

fn kind_from_str(value: &str) -> Result<EventKind> {
    let kind = match value {
        "task_created" => EventKind::TaskCreated,
        "task_deleted" => EventKind::TaskDeleted,
        "task_completed" => EventKind::TaskCompleted,
        "task_undone" => EventKind::TaskUndone,
        "task_approved" => EventKind::TaskApproved,
        "task_rejected" => EventKind::TaskRejected,
        "task_unapproved" => EventKind::TaskUnapproved,
        "pet_adopted" => EventKind::PetAdopted,
        "pet_fed" => EventKind::PetFed,
        "accessory_purchased" => EventKind::AccessoryPurchased,
        other => return Err(anyhow!("Unknown event kind in database: {}", other)),
    };
    Ok(kind)
}
