//! Family service domain logic.
//!
//! Read-side access to a family's children: the parent's child list, a
//! child's own profile, coin balances and the coin ledger. Every lookup
//! checks that the viewer is the child's parent or the child itself.

use shared::LedgerEntry;
use tracing::info;

use crate::domain::models::account::{AuthUser, Child, Parent};
use crate::error::{DomainError, DomainResult};
use crate::storage::{ChildRepository, DbConnection, LedgerRepository};

#[derive(Clone)]
pub struct FamilyService {
    children: ChildRepository,
    ledger: LedgerRepository,
}

impl FamilyService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            children: ChildRepository::new(db.clone()),
            ledger: LedgerRepository::new(db),
        }
    }

    /// List the parent's children, ordered by name
    pub async fn list_children(&self, parent: &Parent) -> DomainResult<Vec<Child>> {
        let children = self.children.list_for_parent(&parent.id).await?;
        info!("Found {} children for parent {}", children.len(), parent.id);
        Ok(children)
    }

    /// Load a child the viewer may see
    pub async fn child_for(&self, viewer: &AuthUser, child_id: &str) -> DomainResult<Child> {
        let child = self
            .children
            .get_child(child_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Child", child_id))?;
        viewer.ensure_can_view_child(&child)?;
        Ok(child)
    }

    /// Fresh copy of the calling child, balance included
    pub async fn me(&self, child: &Child) -> DomainResult<Child> {
        self.child_for(&AuthUser::Child(child.clone()), &child.id).await
    }

    pub async fn coins(&self, viewer: &AuthUser, child_id: &str) -> DomainResult<i64> {
        Ok(self.child_for(viewer, child_id).await?.coins)
    }

    /// Coin ledger for a child, oldest entry first
    pub async fn ledger(
        &self,
        viewer: &AuthUser,
        child_id: &str,
    ) -> DomainResult<Vec<LedgerEntry>> {
        let child = self.child_for(viewer, child_id).await?;
        let entries = self.ledger.list_for_child(&child.id).await?;
        info!("Loaded {} ledger entries for child {}", entries.len(), child.id);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ParentRepository;
    use chrono::Utc;

    fn parent(id: &str) -> Parent {
        Parent {
            id: id.into(),
            name: format!("Parent {}", id),
            email: format!("{}@example.com", id),
            password_hash: "hash".into(),
            created_at: Utc::now(),
        }
    }

    fn child(id: &str, name: &str, parent_id: &str, coins: i64) -> Child {
        Child {
            id: id.into(),
            name: name.into(),
            email: format!("{}@example.com", id),
            password_hash: "hash".into(),
            parent_id: parent_id.into(),
            coins,
            created_at: Utc::now(),
        }
    }

    async fn setup_test() -> FamilyService {
        let db = DbConnection::in_memory().await.expect("Failed to create test database");
        let parents = ParentRepository::new(db.clone());
        let children = ChildRepository::new(db.clone());
        parents.store_parent(&parent("p1")).await.unwrap();
        parents.store_parent(&parent("p2")).await.unwrap();
        children.store_child(&child("c1", "Zoe", "p1", 12)).await.unwrap();
        children.store_child(&child("c2", "Ada", "p1", 0)).await.unwrap();
        children.store_child(&child("c3", "Max", "p2", 3)).await.unwrap();
        FamilyService::new(db)
    }

    #[tokio::test]
    async fn test_list_children_only_returns_own_family() {
        let service = setup_test().await;
        let names: Vec<String> = service
            .list_children(&parent("p1"))
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Ada", "Zoe"]);
    }

    #[tokio::test]
    async fn test_coins_visibility() {
        let service = setup_test().await;
        let own_parent = AuthUser::Parent(parent("p1"));
        let other_parent = AuthUser::Parent(parent("p2"));
        let the_child = AuthUser::Child(child("c1", "Zoe", "p1", 12));
        let sibling = AuthUser::Child(child("c2", "Ada", "p1", 0));

        assert_eq!(service.coins(&own_parent, "c1").await.unwrap(), 12);
        assert_eq!(service.coins(&the_child, "c1").await.unwrap(), 12);
        assert!(matches!(
            service.coins(&other_parent, "c1").await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            service.coins(&sibling, "c1").await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            service.coins(&own_parent, "missing").await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_me_reloads_balance_and_empty_ledger() {
        let service = setup_test().await;
        let stale = child("c3", "Max", "p2", 0);

        assert_eq!(service.me(&stale).await.unwrap().coins, 3);
        assert!(service
            .ledger(&AuthUser::Child(stale), "c3")
            .await
            .unwrap()
            .is_empty());
    }
}
