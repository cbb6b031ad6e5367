use shared::{Account, AuthResponse, Child as SharedChild, ChildListResponse};

use crate::domain::commands::auth::AuthResult;
use crate::domain::models::account::{AuthUser, Child as DomainChild};

/// Mapper from domain accounts to wire DTOs. Password hashes never leave here.
pub struct AccountMapper;

impl AccountMapper {
    pub fn to_account_dto(user: &AuthUser) -> Account {
        match user {
            AuthUser::Parent(parent) => Account {
                id: parent.id.clone(),
                name: parent.name.clone(),
                email: parent.email.clone(),
                role: user.role(),
                parent_id: None,
            },
            AuthUser::Child(child) => Account {
                id: child.id.clone(),
                name: child.name.clone(),
                email: child.email.clone(),
                role: user.role(),
                parent_id: Some(child.parent_id.clone()),
            },
        }
    }

    pub fn to_auth_response(result: AuthResult) -> AuthResponse {
        AuthResponse {
            account: Self::to_account_dto(&result.user),
            token: result.token,
        }
    }

    pub fn to_child_dto(domain: DomainChild) -> SharedChild {
        SharedChild {
            id: domain.id,
            name: domain.name,
            email: domain.email,
            parent_id: domain.parent_id,
            coins: domain.coins,
            created_at: domain.created_at.to_rfc3339(),
        }
    }

    pub fn to_child_list_dto(children: Vec<DomainChild>) -> ChildListResponse {
        ChildListResponse {
            children: children.into_iter().map(Self::to_child_dto).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::Role;

    #[test]
    fn test_child_account_carries_parent_id() {
        let user = AuthUser::Child(DomainChild {
            id: "c1".into(),
            name: "Kim".into(),
            email: "kim@example.com".into(),
            password_hash: "secret-hash".into(),
            parent_id: "p1".into(),
            coins: 4,
            created_at: Utc::now(),
        });

        let account = AccountMapper::to_account_dto(&user);
        assert_eq!(account.role, Role::Child);
        assert_eq!(account.parent_id.as_deref(), Some("p1"));

        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
