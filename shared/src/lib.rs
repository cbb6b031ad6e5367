//! Wire types shared between the Chope server and its clients.
//!
//! Every request and response body that crosses the HTTP boundary is defined
//! here so both sides agree on one contract. Field names are camelCase on the
//! wire.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod board;

pub use board::{NotificationFeed, TaskBoard};

/// Which kind of account a bearer token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Parent,
    Child,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Parent => write!(f, "parent"),
            Role::Child => write!(f, "child"),
        }
    }
}

/// The logged-in account, whichever role it has
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Owning parent, only set for child accounts
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    pub id: String,
    pub name: String,
    pub email: String,
    pub parent_id: String,
    /// Current coin balance. May be negative after an un-approval.
    pub coins: i64,
    /// RFC 3339
    pub created_at: String,
}

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Incomplete,
    PendingApproval,
    Approved,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Incomplete => write!(f, "incomplete"),
            TaskStatus::PendingApproval => write!(f, "pending_approval"),
            TaskStatus::Approved => write!(f, "approved"),
        }
    }
}

/// A chore assigned by a parent to one of their children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Coins credited to the child when the task is approved
    pub reward: i64,
    pub status: TaskStatus,
    /// Derived from `status`, kept for flag-based clients
    pub completed: bool,
    /// Derived from `status`, kept for flag-based clients
    pub approved: bool,
    pub completed_at: Option<String>,
    pub approved_at: Option<String>,
    pub child_id: String,
    pub parent_id: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessory {
    pub item: String,
    pub price: i64,
    pub purchased_at: String,
}

/// A child's virtual pet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animal {
    pub id: String,
    #[serde(rename = "type")]
    pub species: String,
    pub name: String,
    pub level: i64,
    pub child_id: String,
    pub last_fed: Option<String>,
    pub last_level_up: Option<String>,
    pub accessories: Vec<Accessory>,
    pub created_at: String,
}

/// One entry of the accessory catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopItem {
    pub item: String,
    pub label: String,
    pub price: i64,
}

/// Why a coin balance changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerReason {
    TaskApproved,
    TaskUnapproved,
    PetFed,
    AccessoryPurchased,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: i64,
    pub child_id: String,
    pub task_id: Option<String>,
    pub reason: LedgerReason,
    /// Signed change applied to the balance
    pub delta: i64,
    pub balance_after: i64,
    pub created_at: String,
}

/// What happened, as recorded in the server event log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TaskCreated,
    TaskDeleted,
    TaskCompleted,
    TaskUndone,
    TaskApproved,
    TaskRejected,
    TaskUnapproved,
    PetAdopted,
    PetFed,
    AccessoryPurchased,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::TaskCreated,
        EventKind::TaskDeleted,
        EventKind::TaskCompleted,
        EventKind::TaskUndone,
        EventKind::TaskApproved,
        EventKind::TaskRejected,
        EventKind::TaskUnapproved,
        EventKind::PetAdopted,
        EventKind::PetFed,
        EventKind::AccessoryPurchased,
    ];

    /// Every kind that notifies `role`
    pub fn notifying(role: Role) -> Vec<EventKind> {
        Self::ALL.into_iter().filter(|kind| kind.notifies(role)).collect()
    }

    /// Whether this kind of event should notify the given role
    pub fn notifies(&self, role: Role) -> bool {
        match role {
            Role::Parent => matches!(self, EventKind::TaskCompleted | EventKind::TaskUndone),
            Role::Child => matches!(
                self,
                EventKind::TaskCreated
                    | EventKind::TaskApproved
                    | EventKind::TaskRejected
                    | EventKind::TaskUnapproved
            ),
        }
    }
}

/// One row of the append-only event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Monotonic sequence number, the polling cursor
    pub seq: i64,
    pub kind: EventKind,
    pub parent_id: String,
    pub child_id: String,
    pub task_id: Option<String>,
    pub message: String,
    pub coins_delta: i64,
    pub created_at: String,
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterParentRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterChildRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub parent_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub account: Account,
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub child_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub reward: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub reward: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub task: Task,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListResponse {
    pub tasks: Vec<Task>,
}

/// Result of a lifecycle action such as approve or reject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTransitionResponse {
    pub task: Task,
    /// False when the task was already in the target state
    pub changed: bool,
    /// Owning child's balance after the action
    pub child_coins: i64,
}

// ---------------------------------------------------------------------------
// Parent / child views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildListResponse {
    pub children: Vec<Child>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinsResponse {
    pub child_id: String,
    pub coins: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerResponse {
    pub child_id: String,
    pub entries: Vec<LedgerEntry>,
}

// ---------------------------------------------------------------------------
// Pets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdoptAnimalRequest {
    #[serde(rename = "type")]
    pub species: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameAnimalRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyAccessoryRequest {
    pub item: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimalResponse {
    pub animal: Animal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedAnimalResponse {
    pub animal: Animal,
    pub leveled_up: bool,
    /// Child's balance after paying for the food
    pub coins: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub animal: Animal,
    pub coins: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopResponse {
    pub items: Vec<ShopItem>,
}

// ---------------------------------------------------------------------------
// Events and notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListResponse {
    pub events: Vec<Event>,
    /// Highest seq visible to the caller, or the requested cursor if none
    pub latest_seq: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsResponse {
    pub notifications: Vec<Event>,
    pub cleared_through: i64,
    pub cleared_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearNotificationsResponse {
    pub cleared_through: i64,
    pub cleared_at: String,
}

// ---------------------------------------------------------------------------
// Misc
// ---------------------------------------------------------------------------

/// Body of every non-2xx response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
