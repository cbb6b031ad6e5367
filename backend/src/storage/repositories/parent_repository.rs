use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::parse_timestamp;
use crate::domain::models::account::Parent;
use crate::storage::DbConnection;

/// Repository for parent accounts
#[derive(Clone)]
pub struct ParentRepository {
    db: DbConnection,
}

impl ParentRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Store a parent in the database
    pub async fn store_parent(&self, parent: &Parent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO parents (id, name, email, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&parent.id)
        .bind(&parent.name)
        .bind(&parent.email)
        .bind(&parent.password_hash)
        .bind(parent.created_at.to_rfc3339())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Get a parent by ID
    pub async fn get_parent(&self, parent_id: &str) -> Result<Option<Parent>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM parents
            WHERE id = ?
            "#,
        )
        .bind(parent_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(Self::from_row).transpose()
    }

    /// Look a parent up by (normalized) email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Parent>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM parents
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(Self::from_row).transpose()
    }

    fn from_row(row: &SqliteRow) -> Result<Parent> {
        Ok(Parent {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        })
    }
}
