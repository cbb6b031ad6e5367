use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{parse_optional_timestamp, parse_timestamp};
use crate::domain::models::animal::{Accessory, Animal};
use crate::storage::DbConnection;

/// Repository for pets and their accessories
#[derive(Clone)]
pub struct AnimalRepository {
    db: DbConnection,
}

impl AnimalRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn store_animal(&self, conn: &mut SqliteConnection, animal: &Animal) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO animals
                (id, species, name, level, child_id, last_fed, last_level_up, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&animal.id)
        .bind(&animal.species)
        .bind(&animal.name)
        .bind(animal.level)
        .bind(&animal.child_id)
        .bind(animal.last_fed.map(|t| t.to_rfc3339()))
        .bind(animal.last_level_up.map(|t| t.to_rfc3339()))
        .bind(animal.created_at.to_rfc3339())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Get an animal (with accessories) by ID
    pub async fn get_animal(&self, animal_id: &str) -> Result<Option<Animal>> {
        let mut conn = self.db.pool().acquire().await?;
        self.get_animal_with(&mut conn, animal_id).await
    }

    /// Same as [`get_animal`](Self::get_animal) but reads through `conn`
    pub async fn get_animal_with(
        &self,
        conn: &mut SqliteConnection,
        animal_id: &str,
    ) -> Result<Option<Animal>> {
        let row = sqlx::query(
            r#"
            SELECT id, species, name, level, child_id, last_fed, last_level_up, created_at
            FROM animals
            WHERE id = ?
            "#,
        )
        .bind(animal_id)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => {
                let mut animal = Self::from_row(&row)?;
                animal.accessories = Self::load_accessories(conn, &animal.id).await?;
                Ok(Some(animal))
            }
            None => Ok(None),
        }
    }

    /// The pet a child owns, if any
    pub async fn find_for_child(&self, child_id: &str) -> Result<Option<Animal>> {
        let row = sqlx::query("SELECT id FROM animals WHERE child_id = ?")
            .bind(child_id)
            .fetch_optional(self.db.pool())
            .await?;

        match row {
            Some(row) => self.get_animal(&row.get::<String, _>("id")).await,
            None => Ok(None),
        }
    }

    /// Persist level and feeding timestamps
    pub async fn update_feeding(&self, conn: &mut SqliteConnection, animal: &Animal) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE animals
            SET level = ?, last_fed = ?, last_level_up = ?
            WHERE id = ?
            "#,
        )
        .bind(animal.level)
        .bind(animal.last_fed.map(|t| t.to_rfc3339()))
        .bind(animal.last_level_up.map(|t| t.to_rfc3339()))
        .bind(&animal.id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn rename(&self, animal_id: &str, name: &str) -> Result<()> {
        sqlx::query("UPDATE animals SET name = ? WHERE id = ?")
            .bind(name)
            .bind(animal_id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    pub async fn store_accessory(
        &self,
        conn: &mut SqliteConnection,
        animal_id: &str,
        accessory: &Accessory,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO animal_accessories (animal_id, item, price, purchased_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(animal_id)
        .bind(&accessory.item)
        .bind(accessory.price)
        .bind(accessory.purchased_at.to_rfc3339())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn load_accessories(
        conn: &mut SqliteConnection,
        animal_id: &str,
    ) -> Result<Vec<Accessory>> {
        let rows = sqlx::query(
            r#"
            SELECT item, price, purchased_at
            FROM animal_accessories
            WHERE animal_id = ?
            ORDER BY purchased_at ASC, item ASC
            "#,
        )
        .bind(animal_id)
        .fetch_all(&mut *conn)
        .await?;

        rows.iter()
            .map(|row| -> Result<Accessory> {
                Ok(Accessory {
                    item: row.get("item"),
                    price: row.get("price"),
                    purchased_at: parse_timestamp(&row.get::<String, _>("purchased_at"))?,
                })
            })
            .collect()
    }

    fn from_row(row: &SqliteRow) -> Result<Animal> {
        Ok(Animal {
            id: row.get("id"),
            species: row.get("species"),
            name: row.get("name"),
            level: row.get("level"),
            child_id: row.get("child_id"),
            last_fed: parse_optional_timestamp(row.get("last_fed"))?,
            last_level_up: parse_optional_timestamp(row.get("last_level_up"))?,
            accessories: Vec::new(),
            created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::account::{Child, Parent};
    use crate::storage::{ChildRepository, ParentRepository};
    use chrono::Utc;

    async fn setup_test() -> (DbConnection, AnimalRepository) {
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
        (db.clone(), AnimalRepository::new(db))
    }

    fn animal() -> Animal {
        Animal {
            id: "a1".into(),
            species: "dog".into(),
            name: "Rex".into(),
            level: 1,
            child_id: "c1".into(),
            last_fed: None,
            last_level_up: None,
            accessories: vec![],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_store_feed_and_accessorize() {
        let (db, repo) = setup_test().await;
        let mut pet = animal();

        let mut conn = db.pool().acquire().await.unwrap();
        repo.store_animal(&mut conn, &pet).await.unwrap();
        pet.feed(Utc::now());
        repo.update_feeding(&mut conn, &pet).await.unwrap();
        repo.store_accessory(
            &mut conn,
            "a1",
            &Accessory {
                item: "hat".into(),
                price: 20,
                purchased_at: Utc::now(),
            },
        )
        .await
        .unwrap();
        drop(conn);

        let loaded = repo.find_for_child("c1").await.unwrap().expect("pet should exist");
        assert_eq!(loaded.level, 2);
        assert!(loaded.last_fed.is_some());
        assert_eq!(loaded.accessories.len(), 1);
        assert!(loaded.owns("hat"));

        repo.rename("a1", "Max").await.unwrap();
        assert_eq!(repo.get_animal("a1").await.unwrap().unwrap().name, "Max");
    }

    #[tokio::test]
    async fn test_one_pet_per_child() {
        let (db, repo) = setup_test().await;
        let mut conn = db.pool().acquire().await.unwrap();
        repo.store_animal(&mut conn, &animal()).await.unwrap();

        let mut second = animal();
        second.id = "a2".into();
        assert!(repo.store_animal(&mut conn, &second).await.is_err());
    }
}
