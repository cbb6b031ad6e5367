use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

pub mod animal_repository;
pub mod child_repository;
pub mod event_repository;
pub mod ledger_repository;
pub mod parent_repository;
pub mod task_repository;

pub use animal_repository::AnimalRepository;
pub use child_repository::ChildRepository;
pub use event_repository::{EventRepository, NewEvent};
pub use ledger_repository::{LedgerRepository, NewLedgerEntry};
pub use parent_repository::ParentRepository;
pub use task_repository::TaskRepository;

/// Timestamps are stored as RFC 3339 text
pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid timestamp in database: {}", value))?
        .with_timezone(&Utc))
}

pub(crate) fn parse_optional_timestamp(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_timestamp).transpose()
}
