//! Event log and notification domain logic.
//!
//! The event log is the record of everything that happened in a family.
//! Clients page through it with `after`. Notifications are the subset of
//! events that concern the caller's role, newer than the caller's
//! cleared-through cursor.

use chrono::Utc;
use shared::EventKind;
use tracing::info;

use crate::domain::commands::events::{
    ClearNotificationsResult, EventListQuery, EventListResult, NotificationsResult,
};
use crate::domain::models::account::AuthUser;
use crate::error::DomainResult;
use crate::storage::{DbConnection, EventRepository};

pub const DEFAULT_EVENT_LIMIT: u32 = 100;
pub const MAX_EVENT_LIMIT: u32 = 500;

#[derive(Clone)]
pub struct EventService {
    events: EventRepository,
}

impl EventService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            events: EventRepository::new(db),
        }
    }

    /// One page of the caller's event log, oldest first
    pub async fn list_events(
        &self,
        viewer: &AuthUser,
        query: EventListQuery,
    ) -> DomainResult<EventListResult> {
        let after = query.after.unwrap_or(0).max(0);
        let limit = query.limit.unwrap_or(DEFAULT_EVENT_LIMIT).clamp(1, MAX_EVENT_LIMIT);

        let events = self
            .events
            .list_visible(viewer.role(), viewer.id(), after, limit)
            .await?;
        let latest_seq = self.events.latest_visible_seq(viewer.role(), viewer.id()).await?;

        Ok(EventListResult { events, latest_seq })
    }

    /// Unread notifications, newest first, at most `MAX_EVENT_LIMIT` of them
    pub async fn notifications(&self, viewer: &AuthUser) -> DomainResult<NotificationsResult> {
        let (cleared_through, cleared_at) = match self.events.get_cursor(viewer.id()).await? {
            Some((through, at)) => (through, Some(at)),
            None => (0, None),
        };

        let notifications = self
            .events
            .list_recent_of_kinds(
                viewer.role(),
                viewer.id(),
                cleared_through,
                &EventKind::notifying(viewer.role()),
                MAX_EVENT_LIMIT,
            )
            .await?;

        Ok(NotificationsResult {
            notifications,
            cleared_through,
            cleared_at,
        })
    }

    /// Mark everything up to the newest visible event as read
    pub async fn clear_notifications(
        &self,
        viewer: &AuthUser,
    ) -> DomainResult<ClearNotificationsResult> {
        let latest = self.events.latest_visible_seq(viewer.role(), viewer.id()).await?;
        let now = Utc::now();
        self.events.set_cursor(viewer.id(), latest, now).await?;

        let cleared_through = self
            .events
            .get_cursor(viewer.id())
            .await?
            .map(|(through, _)| through)
            .unwrap_or(latest);

        info!(
            "Notifications cleared through seq {} for {}",
            cleared_through,
            viewer.id()
        );
        Ok(ClearNotificationsResult {
            cleared_through,
            cleared_at: now,
        })
    }
}
