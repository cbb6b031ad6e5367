//! Domain-level command and result types.
//!
//! Services take and return these rather than the wire DTOs from `shared`.
//! The REST layer maps between the two in `io::rest::mappers`.

pub mod auth {
    use crate::domain::models::account::AuthUser;

    #[derive(Debug, Clone)]
    pub struct RegisterParentCommand {
        pub name: String,
        pub email: String,
        pub password: String,
    }

    #[derive(Debug, Clone)]
    pub struct RegisterChildCommand {
        pub name: String,
        pub email: String,
        pub password: String,
        pub parent_id: String,
    }

    #[derive(Debug, Clone)]
    pub struct LoginCommand {
        pub email: String,
        pub password: String,
    }

    /// A freshly authenticated account and its bearer token
    #[derive(Debug, Clone)]
    pub struct AuthResult {
        pub user: AuthUser,
        pub token: String,
    }
}

pub mod tasks {
    use crate::domain::models::task::Task;

    #[derive(Debug, Clone)]
    pub struct CreateTaskCommand {
        pub child_id: String,
        pub title: String,
        pub description: String,
        pub reward: i64,
    }

    #[derive(Debug, Clone, Default)]
    pub struct UpdateTaskCommand {
        pub title: Option<String>,
        pub description: Option<String>,
        pub reward: Option<i64>,
    }

    /// Outcome of a lifecycle action
    #[derive(Debug, Clone)]
    pub struct TransitionResult {
        pub task: Task,
        pub changed: bool,
        pub child_coins: i64,
    }
}

pub mod animals {
    use crate::domain::models::animal::Animal;

    #[derive(Debug, Clone)]
    pub struct AdoptAnimalCommand {
        pub species: String,
        pub name: String,
    }

    #[derive(Debug, Clone)]
    pub struct FeedResult {
        pub animal: Animal,
        pub leveled_up: bool,
        pub coins: i64,
    }

    #[derive(Debug, Clone)]
    pub struct PurchaseResult {
        pub animal: Animal,
        pub coins: i64,
    }
}

pub mod events {
    use chrono::{DateTime, Utc};
    use shared::Event;

    /// Query parameters for paging through the event log
    #[derive(Debug, Clone, Default)]
    pub struct EventListQuery {
        pub after: Option<i64>,
        pub limit: Option<u32>,
    }

    #[derive(Debug, Clone)]
    pub struct EventListResult {
        pub events: Vec<Event>,
        pub latest_seq: i64,
    }

    #[derive(Debug, Clone)]
    pub struct NotificationsResult {
        pub notifications: Vec<Event>,
        pub cleared_through: i64,
        pub cleared_at: Option<String>,
    }

    #[derive(Debug, Clone)]
    pub struct ClearNotificationsResult {
        pub cleared_through: i64,
        pub cleared_at: DateTime<Utc>,
    }
}
