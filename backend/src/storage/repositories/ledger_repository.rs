use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use shared::{LedgerEntry, LedgerReason};
use sqlx::{Row, SqliteConnection};

use crate::storage::DbConnection;

/// A coin movement about to be recorded
#[derive(Debug, Clone)]
pub struct NewLedgerEntry<'a> {
    pub child_id: &'a str,
    pub task_id: Option<&'a str>,
    pub reason: LedgerReason,
    pub delta: i64,
    pub balance_after: i64,
    pub created_at: DateTime<Utc>,
}

/// Append-only record of every change to a child's coins
#[derive(Clone)]
pub struct LedgerRepository {
    db: DbConnection,
}

impl LedgerRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn append(
        &self,
        conn: &mut SqliteConnection,
        entry: NewLedgerEntry<'_>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO coin_ledger (child_id, task_id, reason, delta, balance_after, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.child_id)
        .bind(entry.task_id)
        .bind(reason_to_str(entry.reason))
        .bind(entry.delta)
        .bind(entry.balance_after)
        .bind(entry.created_at.to_rfc3339())
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Ledger of one child, oldest first
    pub async fn list_for_child(&self, child_id: &str) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, child_id, task_id, reason, delta, balance_after, created_at
            FROM coin_ledger
            WHERE child_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(child_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter()
            .map(|row| -> Result<LedgerEntry> {
                Ok(LedgerEntry {
                    id: row.get("id"),
                    child_id: row.get("child_id"),
                    task_id: row.get("task_id"),
                    reason: reason_from_str(&row.get::<String, _>("reason"))?,
                    delta: row.get("delta"),
                    balance_after: row.get("balance_after"),
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }

    /// Sum of all deltas, which must always equal the stored balance
    pub async fn sum_for_child(&self, child_id: &str) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(delta), 0) AS total FROM coin_ledger WHERE child_id = ?",
        )
        .bind(child_id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(row.get("total"))
    }
}

fn reason_to_str(reason: LedgerReason) -> &'static str {
    match reason {
        LedgerReason::TaskApproved => "task_approved",
        LedgerReason::TaskUnapproved => "task_unapproved",
        LedgerReason::PetFed => "pet_fed",
        LedgerReason::AccessoryPurchased => "accessory_purchased",
    }
}

fn reason_from_str(value: &str) -> Result<LedgerReason> {
    match value {
        "task_approved" => Ok(LedgerReason::TaskApproved),
        "task_unapproved" => Ok(LedgerReason::TaskUnapproved),
        "pet_fed" => Ok(LedgerReason::PetFed),
        "accessory_purchased" => Ok(LedgerReason::AccessoryPurchased),
        other => Err(anyhow!("Unknown ledger reason in database: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::account::{Child, Parent};
    use crate::storage::{ChildRepository, ParentRepository};

    #[tokio::test]
    async fn test_append_and_sum() {
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

        let repo = LedgerRepository::new(db.clone());
        let mut conn = db.pool().acquire().await.unwrap();
        for (delta, reason) in [(10, LedgerReason::TaskApproved), (-5, LedgerReason::PetFed)] {
            repo.append(
                &mut conn,
                NewLedgerEntry {
                    child_id: "c1",
                    task_id: None,
                    reason,
                    delta,
                    balance_after: 0,
                    created_at: now,
                },
            )
            .await
            .unwrap();
        }
        drop(conn);

        let entries = repo.list_for_child("c1").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].reason, LedgerReason::PetFed);
        assert_eq!(repo.sum_for_child("c1").await.unwrap(), 5);
        assert_eq!(repo.sum_for_child("nobody").await.unwrap(), 0);
    }
}
