//! Registration, login and bearer-token verification.
//!
//! Passwords are hashed with Argon2id on the blocking pool. Tokens are HS256
//! JWTs whose subject is the account id and whose `role` claim says which
//! table to load it from.

use anyhow::anyhow;
use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::Role;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::commands::auth::{
    AuthResult, LoginCommand, RegisterChildCommand, RegisterParentCommand,
};
use crate::domain::models::account::{
    normalize_email, validate_name, validate_password, AuthUser, Child, Parent,
};
use crate::error::{DomainError, DomainResult};
use crate::storage::{ChildRepository, DbConnection, ParentRepository};

/// JWT payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

#[derive(Clone)]
pub struct AuthService {
    parents: ParentRepository,
    children: ChildRepository,
    keys: Arc<TokenKeys>,
}

impl AuthService {
    pub fn new(db: DbConnection, jwt_secret: &str, token_ttl: Duration) -> Self {
        Self {
            parents: ParentRepository::new(db.clone()),
            children: ChildRepository::new(db),
            keys: Arc::new(TokenKeys {
                encoding: EncodingKey::from_secret(jwt_secret.as_bytes()),
                decoding: DecodingKey::from_secret(jwt_secret.as_bytes()),
                ttl: token_ttl,
            }),
        }
    }

    /// Create a parent account and log it in
    pub async fn register_parent(
        &self,
        command: RegisterParentCommand,
    ) -> DomainResult<AuthResult> {
        let name = validate_name(&command.name)?;
        let email = normalize_email(&command.email)?;
        validate_password(&command.password)?;
        info!("Registering parent: {}", email);

        self.ensure_email_available(&email).await?;

        let parent = Parent {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            password_hash: hash_password(command.password).await?,
            created_at: Utc::now(),
        };

        self.parents
            .store_parent(&parent)
            .await
            .map_err(duplicate_email_as_validation)?;

        info!("Created parent {} ({})", parent.id, parent.email);
        let token = self.issue_token(&parent.id, Role::Parent)?;
        Ok(AuthResult {
            user: AuthUser::Parent(parent),
            token,
        })
    }

    /// Create a child account under an existing parent and log it in
    pub async fn register_child(&self, command: RegisterChildCommand) -> DomainResult<AuthResult> {
        let name = validate_name(&command.name)?;
        let email = normalize_email(&command.email)?;
        validate_password(&command.password)?;
        info!("Registering child: {} under parent {}", email, command.parent_id);

        let parent_id = command.parent_id.trim();
        if parent_id.is_empty() {
            return Err(DomainError::validation("parentId is required"));
        }
        if self.parents.get_parent(parent_id).await?.is_none() {
            warn!("Child registration rejected, parent {} does not exist", parent_id);
            return Err(DomainError::not_found("Parent", parent_id));
        }

        self.ensure_email_available(&email).await?;

        let child = Child {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            password_hash: hash_password(command.password).await?,
            parent_id: parent_id.to_string(),
            coins: 0,
            created_at: Utc::now(),
        };

        self.children
            .store_child(&child)
            .await
            .map_err(duplicate_email_as_validation)?;

        info!("Created child {} ({}) for parent {}", child.id, child.email, child.parent_id);
        let token = self.issue_token(&child.id, Role::Child)?;
        Ok(AuthResult {
            user: AuthUser::Child(child),
            token,
        })
    }

    /// Check credentials against parents first, then children
    pub async fn login(&self, command: LoginCommand) -> DomainResult<AuthResult> {
        let email = command.email.trim().to_lowercase();
        info!("Login attempt: {}", email);

        let user = if let Some(parent) = self.parents.find_by_email(&email).await? {
            Some(AuthUser::Parent(parent))
        } else {
            self.children.find_by_email(&email).await?.map(AuthUser::Child)
        };

        let Some(user) = user else {
            warn!("Login failed, unknown email: {}", email);
            return Err(invalid_credentials());
        };

        let hash = match &user {
            AuthUser::Parent(parent) => parent.password_hash.clone(),
            AuthUser::Child(child) => child.password_hash.clone(),
        };
        if !verify_password(command.password, hash).await? {
            warn!("Login failed, wrong password for {}", email);
            return Err(invalid_credentials());
        }

        let token = self.issue_token(user.id(), user.role())?;
        info!("Login succeeded: {} as {}", email, user.role());
        Ok(AuthResult { user, token })
    }

    /// Verify a bearer token and load the account it names
    pub async fn authenticate(&self, token: &str) -> DomainResult<AuthUser> {
        let claims = self.verify_token(token)?;

        let user = match claims.role {
            Role::Parent => self.parents.get_parent(&claims.sub).await?.map(AuthUser::Parent),
            Role::Child => self.children.get_child(&claims.sub).await?.map(AuthUser::Child),
        };

        user.ok_or_else(|| DomainError::Unauthorized("Account no longer exists".to_string()))
    }

    pub fn issue_token(&self, account_id: &str, role: Role) -> DomainResult<String> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(self.keys.ttl)
            .ok_or_else(|| DomainError::Internal(anyhow!("Token lifetime out of range")))?;
        let claims = Claims {
            sub: account_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };
        encode(&Header::default(), &claims, &self.keys.encoding)
            .map_err(|e| DomainError::Internal(anyhow!("Failed to sign token: {}", e)))
    }

    pub fn verify_token(&self, token: &str) -> DomainResult<Claims> {
        decode::<Claims>(token, &self.keys.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                warn!("Rejected bearer token: {}", e);
                DomainError::Unauthorized("Invalid or expired token".to_string())
            })
    }

    /// Emails are unique across parents and children
    async fn ensure_email_available(&self, email: &str) -> DomainResult<()> {
        if self.parents.find_by_email(email).await?.is_some()
            || self.children.find_by_email(email).await?.is_some()
        {
            return Err(DomainError::validation(format!("Email already registered: {}", email)));
        }
        Ok(())
    }
}

fn invalid_credentials() -> DomainError {
    DomainError::Unauthorized("Invalid email or password".to_string())
}

/// A lost race on the unique email index reads the same as the upfront check
fn duplicate_email_as_validation(err: anyhow::Error) -> DomainError {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            DomainError::validation("Email already registered")
        }
        _ => DomainError::Internal(err),
    }
}

async fn hash_password(password: String) -> DomainResult<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| anyhow!("Failed to hash password: {}", e))
    })
    .await
    .map_err(|e| anyhow!("Password hashing task failed: {}", e))?
    .map_err(DomainError::Internal)
}

async fn verify_password(password: String, hash: String) -> DomainResult<bool> {
    let verified = tokio::task::spawn_blocking(move || match PasswordHash::new(&hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    })
    .await
    .map_err(|e| anyhow!("Password verification task failed: {}", e))?;
    Ok(verified)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test() -> AuthService {
        let db = DbConnection::in_memory().await.expect("Failed to create test database");
        AuthService::new(db, "test-secret", Duration::hours(1))
    }

    fn parent_command(email: &str) -> RegisterParentCommand {
        RegisterParentCommand {
            name: "Pat".to_string(),
            email: email.to_string(),
            password: "hunter22".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_parent_and_login() {
        let service = setup_test().await;
        let registered = service
            .register_parent(parent_command("Pat@Example.com"))
            .await
            .expect("registration should succeed");
        assert_eq!(registered.user.role(), Role::Parent);

        let login = service
            .login(LoginCommand {
                email: "pat@example.com".to_string(),
                password: "hunter22".to_string(),
            })
            .await
            .expect("login should succeed");
        assert_eq!(login.user.id(), registered.user.id());

        let authenticated = service.authenticate(&login.token).await.unwrap();
        assert_eq!(authenticated.id(), registered.user.id());
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let service = setup_test().await;
        service.register_parent(parent_command("pat@example.com")).await.unwrap();

        let result = service
            .login(LoginCommand {
                email: "pat@example.com".to_string(),
                password: "wrong-password".to_string(),
            })
            .await;
        assert!(matches!(result, Err(DomainError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_register_child_requires_existing_parent() {
        let service = setup_test().await;
        let result = service
            .register_child(RegisterChildCommand {
                name: "Kim".to_string(),
                email: "kim@example.com".to_string(),
                password: "hunter22".to_string(),
                parent_id: "no-such-parent".to_string(),
            })
            .await;

        assert!(matches!(result, Err(DomainError::NotFound(_))));
        assert!(service.children.find_by_email("kim@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_across_roles() {
        let service = setup_test().await;
        let parent = service.register_parent(parent_command("pat@example.com")).await.unwrap();

        let result = service
            .register_child(RegisterChildCommand {
                name: "Kim".to_string(),
                email: "PAT@example.com".to_string(),
                password: "hunter22".to_string(),
                parent_id: parent.user.id().to_string(),
            })
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_child_login_yields_child_role() {
        let service = setup_test().await;
        let parent = service.register_parent(parent_command("pat@example.com")).await.unwrap();
        service
            .register_child(RegisterChildCommand {
                name: "Kim".to_string(),
                email: "kim@example.com".to_string(),
                password: "hunter22".to_string(),
                parent_id: parent.user.id().to_string(),
            })
            .await
            .unwrap();

        let login = service
            .login(LoginCommand {
                email: "kim@example.com".to_string(),
                password: "hunter22".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(login.user.role(), Role::Child);
        assert_eq!(service.verify_token(&login.token).unwrap().role, Role::Child);
    }

    #[tokio::test]
    async fn test_tampered_and_foreign_tokens_are_rejected() {
        let service = setup_test().await;
        let other = AuthService::new(
            DbConnection::in_memory().await.unwrap(),
            "another-secret",
            Duration::hours(1),
        );
        let foreign = other.issue_token("someone", Role::Parent).unwrap();

        assert!(matches!(service.verify_token(&foreign), Err(DomainError::Unauthorized(_))));
        assert!(matches!(service.verify_token("not.a.jwt"), Err(DomainError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let db = DbConnection::in_memory().await.unwrap();
        let service = AuthService::new(db, "test-secret", Duration::hours(-2));
        let token = service.issue_token("someone", Role::Parent).unwrap();

        assert!(matches!(service.verify_token(&token), Err(DomainError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_unrepresentable_expiry_is_an_error() {
        let db = DbConnection::in_memory().await.unwrap();
        let service = AuthService::new(db, "test-secret", Duration::MAX);

        assert!(matches!(
            service.issue_token("someone", Role::Parent),
            Err(DomainError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn test_token_for_deleted_account_is_rejected() {
        let service = setup_test().await;
        let token = service.issue_token("ghost", Role::Child).unwrap();

        assert!(matches!(service.authenticate(&token).await, Err(DomainError::Unauthorized(_))));
    }
}
