//! # Storage Module
//!
//! SQLite persistence for parents, children, tasks, pets, the coin ledger and
//! the event log. Each table family has one repository struct over a shared
//! [`DbConnection`].
//!
//! Reads go straight to the pool. Writes that must land together with a
//! coin change take a `&mut SqliteConnection` so the caller can run them
//! inside one transaction.

pub mod connection;
pub mod repositories;

pub use connection::DbConnection;
pub use repositories::{
    AnimalRepository, ChildRepository, EventRepository, LedgerRepository, NewEvent,
    NewLedgerEntry, ParentRepository, TaskRepository,
};
