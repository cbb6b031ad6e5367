use chrono::{DateTime, Utc};
use shared::Role;

use crate::error::{DomainError, DomainResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Parent {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Child {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub parent_id: String,
    pub coins: i64,
    pub created_at: DateTime<Utc>,
}

/// The account behind a verified bearer token, loaded fresh per request
#[derive(Debug, Clone, PartialEq)]
pub enum AuthUser {
    Parent(Parent),
    Child(Child),
}

impl AuthUser {
    pub fn id(&self) -> &str {
        match self {
            AuthUser::Parent(parent) => &parent.id,
            AuthUser::Child(child) => &child.id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            AuthUser::Parent(_) => Role::Parent,
            AuthUser::Child(_) => Role::Child,
        }
    }

    pub fn require_parent(&self) -> DomainResult<&Parent> {
        match self {
            AuthUser::Parent(parent) => Ok(parent),
            AuthUser::Child(_) => Err(DomainError::forbidden("Parent account required")),
        }
    }

    pub fn require_child(&self) -> DomainResult<&Child> {
        match self {
            AuthUser::Child(child) => Ok(child),
            AuthUser::Parent(_) => Err(DomainError::forbidden("Child account required")),
        }
    }

    /// A parent sees their own children, a child sees only itself
    pub fn can_view_child(&self, child: &Child) -> bool {
        match self {
            AuthUser::Parent(parent) => child.parent_id == parent.id,
            AuthUser::Child(me) => me.id == child.id,
        }
    }

    pub fn ensure_can_view_child(&self, child: &Child) -> DomainResult<()> {
        if self.can_view_child(child) {
            Ok(())
        } else {
            Err(DomainError::forbidden(format!(
                "Not allowed to access child {}",
                child.id
            )))
        }
    }
}

/// Validation shared by both registration flows
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AccountValidationError {
    #[error("Name cannot be empty")]
    EmptyName,
    #[error("Name cannot exceed 100 characters")]
    NameTooLong,
    #[error("Email address is invalid")]
    InvalidEmail,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
}

impl From<AccountValidationError> for DomainError {
    fn from(err: AccountValidationError) -> Self {
        DomainError::Validation(err.to_string())
    }
}

/// Trim and lower-case an email, rejecting obviously malformed input
pub fn normalize_email(email: &str) -> Result<String, AccountValidationError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    };
    if valid && !email.contains(char::is_whitespace) {
        Ok(email)
    } else {
        Err(AccountValidationError::InvalidEmail)
    }
}

pub fn validate_name(name: &str) -> Result<String, AccountValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AccountValidationError::EmptyName);
    }
    if name.chars().count() > 100 {
        return Err(AccountValidationError::NameTooLong);
    }
    Ok(name.to_string())
}

pub fn validate_password(password: &str) -> Result<(), AccountValidationError> {
    if password.chars().count() < 6 {
        return Err(AccountValidationError::PasswordTooShort);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(id: &str, parent_id: &str) -> Child {
        Child {
            id: id.to_string(),
            name: "Kid".to_string(),
            email: format!("{}@example.com", id),
            password_hash: String::new(),
            parent_id: parent_id.to_string(),
            coins: 0,
            created_at: Utc::now(),
        }
    }

    fn parent(id: &str) -> Parent {
        Parent {
            id: id.to_string(),
            name: "Mom".to_string(),
            email: format!("{}@example.com", id),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Mom@Example.COM ").unwrap(), "mom@example.com");
        assert_eq!(normalize_email("nope"), Err(AccountValidationError::InvalidEmail));
        assert_eq!(normalize_email("@example.com"), Err(AccountValidationError::InvalidEmail));
        assert_eq!(normalize_email("a@localhost"), Err(AccountValidationError::InvalidEmail));
    }

    #[test]
    fn test_validate_name_and_password() {
        assert_eq!(validate_name("  Ann ").unwrap(), "Ann");
        assert_eq!(validate_name("   "), Err(AccountValidationError::EmptyName));
        assert_eq!(validate_name(&"x".repeat(101)), Err(AccountValidationError::NameTooLong));
        assert!(validate_password("secret").is_ok());
        assert_eq!(validate_password("abc"), Err(AccountValidationError::PasswordTooShort));
    }

    #[test]
    fn test_child_visibility() {
        let kid = child("c1", "p1");
        assert!(AuthUser::Parent(parent("p1")).can_view_child(&kid));
        assert!(!AuthUser::Parent(parent("p2")).can_view_child(&kid));
        assert!(AuthUser::Child(kid.clone()).can_view_child(&kid));
        assert!(!AuthUser::Child(child("c2", "p1")).can_view_child(&kid));
    }

    #[test]
    fn test_role_requirements() {
        let user = AuthUser::Child(child("c1", "p1"));
        assert!(user.require_child().is_ok());
        assert!(matches!(user.require_parent(), Err(DomainError::Forbidden(_))));
        assert_eq!(user.role(), Role::Child);
    }
}
