//! # Domain Module
//!
//! Business logic for the chore tracker: accounts, tasks and their
//! approval lifecycle, coin balances, pets, and the family event log.
//!
//! Services here know nothing about HTTP. They take domain commands,
//! enforce ownership and validation, and talk to SQLite through the
//! repositories in [`crate::storage`].
//!
//! ## Module Organization
//!
//! - **auth_service**: registration, login, password hashing and bearer tokens
//! - **task_service**: task CRUD and the complete/undo/approve/reject/unapprove lifecycle
//! - **family_service**: child lists, balances and the coin ledger
//! - **animal_service**: pets, feeding and the accessory shop
//! - **event_service**: event log paging and notification cursors
//! - **commands**: input and output types of the services
//! - **models**: domain entities and their validation rules
//!
//! ## Business Rules
//!
//! - A child's coins change only through a task transition or a purchase
//! - Every coin change writes a ledger row and an event in the same transaction
//! - Approving a task twice credits its reward once

pub mod animal_service;
pub mod auth_service;
pub mod commands;
pub mod event_service;
pub mod family_service;
pub mod models;
pub mod task_service;

pub use animal_service::AnimalService;
pub use auth_service::AuthService;
pub use event_service::EventService;
pub use family_service::FamilyService;
pub use task_service::TaskService;
