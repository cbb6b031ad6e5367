//! Pet service domain logic.
//!
//! Each child may adopt one pet. Feeding and accessories are paid for with
//! coins; the debit, its ledger row and the event are written in one
//! transaction, and the debit only succeeds when the balance covers it.

use chrono::Utc;
use shared::{EventKind, LedgerReason, ShopItem};
use sqlx::SqliteConnection;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::commands::animals::{AdoptAnimalCommand, FeedResult, PurchaseResult};
use crate::domain::models::account::{AuthUser, Child};
use crate::domain::models::animal::{
    catalog, catalog_price, validate_label, Accessory, Animal, AnimalValidationError, FEED_COST,
};
use crate::error::{DomainError, DomainResult};
use crate::storage::{
    AnimalRepository, ChildRepository, DbConnection, EventRepository, LedgerRepository, NewEvent,
    NewLedgerEntry,
};

#[derive(Clone)]
pub struct AnimalService {
    db: DbConnection,
    animals: AnimalRepository,
    children: ChildRepository,
    ledger: LedgerRepository,
    events: EventRepository,
}

impl AnimalService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            animals: AnimalRepository::new(db.clone()),
            children: ChildRepository::new(db.clone()),
            ledger: LedgerRepository::new(db.clone()),
            events: EventRepository::new(db.clone()),
            db,
        }
    }

    /// Adopt the child's one and only pet
    pub async fn adopt(&self, child: &Child, command: AdoptAnimalCommand) -> DomainResult<Animal> {
        let species = validate_label(&command.species, AnimalValidationError::InvalidSpecies)?;
        let name = validate_label(&command.name, AnimalValidationError::InvalidName)?;

        if self.animals.find_for_child(&child.id).await?.is_some() {
            return Err(AnimalValidationError::AlreadyAdopted.into());
        }

        let now = Utc::now();
        let animal = Animal {
            id: Uuid::new_v4().to_string(),
            species,
            name,
            level: 1,
            child_id: child.id.clone(),
            last_fed: None,
            last_level_up: None,
            accessories: Vec::new(),
            created_at: now,
        };

        let mut tx = self.db.pool().begin().await?;
        if let Err(err) = self.animals.store_animal(&mut tx, &animal).await {
            tx.rollback().await?;
            return Err(unique_violation_as(err, AnimalValidationError::AlreadyAdopted));
        }
        self.events
            .append(
                &mut tx,
                NewEvent {
                    kind: EventKind::PetAdopted,
                    parent_id: &child.parent_id,
                    child_id: &child.id,
                    task_id: None,
                    message: format!(
                        "{} adopted {} the {}",
                        child.name, animal.name, animal.species
                    ),
                    coins_delta: 0,
                    created_at: now,
                },
            )
            .await?;
        tx.commit().await?;

        info!("Child {} adopted pet {}", child.id, animal.id);
        Ok(animal)
    }

    pub async fn get_mine(&self, child: &Child) -> DomainResult<Animal> {
        self.animals
            .find_for_child(&child.id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("No pet adopted by child {}", child.id)))
    }

    /// A child's pet as seen by its parent or the child itself
    pub async fn get_for_child(&self, viewer: &AuthUser, child_id: &str) -> DomainResult<Animal> {
        let child = self
            .children
            .get_child(child_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Child", child_id))?;
        viewer.ensure_can_view_child(&child)?;
        self.get_mine(&child).await
    }

    pub async fn rename(&self, child: &Child, animal_id: &str, name: &str) -> DomainResult<Animal> {
        let name = validate_label(name, AnimalValidationError::InvalidName)?;
        let mut animal = self.load_owned(child, animal_id).await?;

        self.animals.rename(&animal.id, &name).await?;
        info!("Pet {} renamed from '{}' to '{}'", animal.id, animal.name, name);
        animal.name = name;
        Ok(animal)
    }

    /// Feed the pet for `FEED_COST` coins
    pub async fn feed(&self, child: &Child, animal_id: &str) -> DomainResult<FeedResult> {
        self.load_owned(child, animal_id).await?;

        let now = Utc::now();
        let mut tx = self.db.pool().begin().await?;
        let coins = match self.children.spend_coins(&mut tx, &child.id, FEED_COST).await? {
            Some(coins) => coins,
            None => {
                let available = self.children.coins(&mut tx, &child.id).await?.unwrap_or(0);
                tx.rollback().await?;
                warn!("Child {} cannot afford to feed pet {}", child.id, animal_id);
                return Err(AnimalValidationError::NotEnoughCoins {
                    needed: FEED_COST,
                    available,
                }
                .into());
            }
        };

        let mut animal = self
            .animals
            .get_animal_with(&mut tx, animal_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Pet", animal_id))?;
        let leveled_up = animal.feed(now);
        self.animals.update_feeding(&mut tx, &animal).await?;

        self.record_spend(
            &mut tx,
            child,
            FEED_COST,
            coins,
            LedgerReason::PetFed,
            EventKind::PetFed,
            if leveled_up {
                format!("{} was fed and reached level {}", animal.name, animal.level)
            } else {
                format!("{} was fed", animal.name)
            },
        )
        .await?;
        tx.commit().await?;

        info!(
            "Pet {} fed by child {} (level {}, leveled_up {}, coins left {})",
            animal.id, child.id, animal.level, leveled_up, coins
        );
        Ok(FeedResult {
            animal,
            leveled_up,
            coins,
        })
    }

    pub fn shop(&self) -> Vec<ShopItem> {
        catalog()
    }

    /// Buy a catalog accessory for the pet
    pub async fn buy_accessory(
        &self,
        child: &Child,
        animal_id: &str,
        item: &str,
    ) -> DomainResult<PurchaseResult> {
        let item = item.trim().to_lowercase();
        let price = catalog_price(&item)
            .ok_or_else(|| AnimalValidationError::UnknownItem(item.clone()))?;
        let animal = self.load_owned(child, animal_id).await?;
        if animal.owns(&item) {
            return Err(AnimalValidationError::AlreadyOwned(item).into());
        }

        let now = Utc::now();
        let mut tx = self.db.pool().begin().await?;
        let coins = match self.children.spend_coins(&mut tx, &child.id, price).await? {
            Some(coins) => coins,
            None => {
                let available = self.children.coins(&mut tx, &child.id).await?.unwrap_or(0);
                tx.rollback().await?;
                return Err(AnimalValidationError::NotEnoughCoins {
                    needed: price,
                    available,
                }
                .into());
            }
        };

        let accessory = Accessory {
            item: item.clone(),
            price,
            purchased_at: now,
        };
        if let Err(err) = self.animals.store_accessory(&mut tx, &animal.id, &accessory).await {
            tx.rollback().await?;
            return Err(unique_violation_as(err, AnimalValidationError::AlreadyOwned(item)));
        }

        self.record_spend(
            &mut tx,
            child,
            price,
            coins,
            LedgerReason::AccessoryPurchased,
            EventKind::AccessoryPurchased,
            format!("{} bought a {} for {}", child.name, item, animal.name),
        )
        .await?;
        tx.commit().await?;

        let animal = self
            .animals
            .get_animal(&animal.id)
            .await?
            .ok_or_else(|| DomainError::not_found("Pet", &animal.id))?;

        info!("Child {} bought {} for pet {} ({} coins left)", child.id, item, animal.id, coins);
        Ok(PurchaseResult { animal, coins })
    }

    async fn load_owned(&self, child: &Child, animal_id: &str) -> DomainResult<Animal> {
        let animal = self
            .animals
            .get_animal(animal_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Pet", animal_id))?;
        if animal.child_id != child.id {
            return Err(DomainError::forbidden(format!(
                "Pet {} belongs to another child",
                animal_id
            )));
        }
        Ok(animal)
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_spend(
        &self,
        conn: &mut SqliteConnection,
        child: &Child,
        amount: i64,
        balance_after: i64,
        reason: LedgerReason,
        kind: EventKind,
        message: String,
    ) -> DomainResult<()> {
        let now = Utc::now();
        self.ledger
            .append(
                &mut *conn,
                NewLedgerEntry {
                    child_id: &child.id,
                    task_id: None,
                    reason,
                    delta: -amount,
                    balance_after,
                    created_at: now,
                },
            )
            .await?;
        self.events
            .append(
                &mut *conn,
                NewEvent {
                    kind,
                    parent_id: &child.parent_id,
                    child_id: &child.id,
                    task_id: None,
                    message,
                    coins_delta: -amount,
                    created_at: now,
                },
            )
            .await?;
        Ok(())
    }
}

/// Turn a unique-constraint failure into a validation error, pass anything else through
fn unique_violation_as(err: anyhow::Error, validation: AnimalValidationError) -> DomainError {
    let is_unique = err
        .downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|e| e.is_unique_violation())
        .unwrap_or(false);
    if is_unique {
        validation.into()
    } else {
        DomainError::Internal(err)
    }
}
