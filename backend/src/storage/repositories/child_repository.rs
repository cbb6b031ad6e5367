use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::parse_timestamp;
use crate::domain::models::account::Child;
use crate::storage::DbConnection;

/// Repository for child accounts and their coin balance
#[derive(Clone)]
pub struct ChildRepository {
    db: DbConnection,
}

impl ChildRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Store a child in the database
    pub async fn store_child(&self, child: &Child) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO children (id, name, email, password_hash, parent_id, coins, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&child.id)
        .bind(&child.name)
        .bind(&child.email)
        .bind(&child.password_hash)
        .bind(&child.parent_id)
        .bind(child.coins)
        .bind(child.created_at.to_rfc3339())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Get a child by ID
    pub async fn get_child(&self, child_id: &str) -> Result<Option<Child>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, password_hash, parent_id, coins, created_at
            FROM children
            WHERE id = ?
            "#,
        )
        .bind(child_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(Self::from_row).transpose()
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Child>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, password_hash, parent_id, coins, created_at
            FROM children
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(Self::from_row).transpose()
    }

    /// List a parent's children ordered by name
    pub async fn list_for_parent(&self, parent_id: &str) -> Result<Vec<Child>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, email, password_hash, parent_id, coins, created_at
            FROM children
            WHERE parent_id = ?
            ORDER BY name ASC, created_at ASC
            "#,
        )
        .bind(parent_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(Self::from_row).collect()
    }

    /// Add `delta` to the balance and return the new balance.
    /// `None` means the child does not exist.
    pub async fn adjust_coins(
        &self,
        conn: &mut SqliteConnection,
        child_id: &str,
        delta: i64,
    ) -> Result<Option<i64>> {
        let row = sqlx::query(
            r#"
            UPDATE children SET coins = coins + ?
            WHERE id = ?
            RETURNING coins
            "#,
        )
        .bind(delta)
        .bind(child_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(|r| r.get("coins")))
    }

    /// Take `amount` coins only if the balance covers it.
    /// `None` means the balance was short (or the child is gone).
    pub async fn spend_coins(
        &self,
        conn: &mut SqliteConnection,
        child_id: &str,
        amount: i64,
    ) -> Result<Option<i64>> {
        let row = sqlx::query(
            r#"
            UPDATE children SET coins = coins - ?
            WHERE id = ? AND coins >= ?
            RETURNING coins
            "#,
        )
        .bind(amount)
        .bind(child_id)
        .bind(amount)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(|r| r.get("coins")))
    }

    /// Current balance as seen by `conn`
    pub async fn coins(&self, conn: &mut SqliteConnection, child_id: &str) -> Result<Option<i64>> {
        let row = sqlx::query("SELECT coins FROM children WHERE id = ?")
            .bind(child_id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(row.map(|r| r.get("coins")))
    }

    fn from_row(row: &SqliteRow) -> Result<Child> {
        Ok(Child {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            parent_id: row.get("parent_id"),
            coins: row.get("coins"),
            created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        })
    }
}
