//! Polling dashboard controller.
//!
//! The server event log is the source of truth. Each refresh fetches the
//! task list, the balance (for children) and the events after the feed's
//! last seq, then applies them as one unit. Refreshes are numbered; a
//! result that arrives after a newer one was applied is dropped.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use shared::{Account, Event, NotificationFeed, Role, Task, TaskBoard};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ClientResult};

/// Largest event page requested per call
const EVENT_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// A newer refresh already landed; this result was dropped
    Stale,
    /// The fetch failed and the previous view was kept
    Failed,
}

/// Point-in-time copy of what the dashboard shows
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub board: TaskBoard,
    /// Only known for child accounts
    pub coins: Option<i64>,
    pub notifications: Vec<Event>,
    pub last_seq: i64,
}

#[derive(Debug)]
struct DashboardState {
    applied_generation: u64,
    board: TaskBoard,
    coins: Option<i64>,
    feed: NotificationFeed,
}

/// Everything one refresh fetched
#[derive(Debug, Clone)]
pub(crate) struct RefreshData {
    pub tasks: Vec<Task>,
    pub coins: Option<i64>,
    pub events: Vec<Event>,
}

pub struct DashboardController {
    api: ApiClient,
    account: Account,
    generation: AtomicU64,
    state: Mutex<DashboardState>,
}

impl DashboardController {
    /// `api` must already carry the account's token
    pub fn new(api: ApiClient, account: Account) -> Self {
        let feed = NotificationFeed::new(account.role);
        Self {
            api,
            account,
            generation: AtomicU64::new(0),
            state: Mutex::new(DashboardState {
                applied_generation: 0,
                board: TaskBoard::default(),
                coins: None,
                feed,
            }),
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Pick up the server-side cleared-through cursor, then do a first refresh
    pub async fn start(&self) -> ClientResult<RefreshOutcome> {
        let notifications = self.api.notifications().await?;
        self.lock().feed.mark_cleared_through(notifications.cleared_through);
        Ok(self.refresh().await)
    }

    /// Fetch fresh data and apply it unless a newer refresh beat it
    pub async fn refresh(&self) -> RefreshOutcome {
        let generation = self.begin();
        let after = self.lock().feed.last_seq();

        match self.fetch(after).await {
            Ok(data) => self.apply(generation, data),
            Err(e) => {
                warn!("Dashboard refresh {} failed, keeping previous view: {}", generation, e);
                RefreshOutcome::Failed
            }
        }
    }

    /// Refresh every `interval` until `shutdown` resolves
    pub async fn run<F>(&self, interval: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!("Dashboard polling every {:?} for {}", interval, self.account.id);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.refresh().await;
                }
            }
        }
        info!("Dashboard polling stopped for {}", self.account.id);
    }

    /// Clear notifications on the server and locally
    pub async fn clear_notifications(&self) -> ClientResult<()> {
        let cleared = self.api.clear_notifications().await?;
        let mut state = self.lock();
        state.feed.clear();
        state.feed.mark_cleared_through(cleared.cleared_through);
        Ok(())
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let state = self.lock();
        DashboardSnapshot {
            board: state.board.clone(),
            coins: state.coins,
            notifications: state.feed.notifications().cloned().collect(),
            last_seq: state.feed.last_seq(),
        }
    }

    pub fn unread_count(&self) -> usize {
        self.lock().feed.unread_count()
    }

    fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn fetch(&self, after: i64) -> ClientResult<RefreshData> {
        let (tasks, coins) = match self.account.role {
            Role::Parent => (self.api.list_parent_tasks().await?, None),
            Role::Child => {
                let tasks = self.api.list_child_tasks(&self.account.id).await?;
                let me = self.api.child_me().await?;
                (tasks, Some(me.coins))
            }
        };

        let mut events = Vec::new();
        let mut cursor = after;
        loop {
            let page = self.api.events(cursor, EVENT_PAGE).await?;
            let full = page.events.len() as u32 == EVENT_PAGE;
            if let Some(last) = page.events.last() {
                cursor = last.seq;
            }
            events.extend(page.events);
            if !full {
                break;
            }
        }

        Ok(RefreshData { tasks, coins, events })
    }

    pub(crate) fn apply(&self, generation: u64, data: RefreshData) -> RefreshOutcome {
        let mut state = self.lock();
        if generation < state.applied_generation {
            debug!(
                "Dropping refresh {} (already applied {})",
                generation, state.applied_generation
            );
            return RefreshOutcome::Stale;
        }

        state.applied_generation = generation;
        state.board = TaskBoard::from_tasks(data.tasks);
        state.coins = data.coins;
        let added = state.feed.ingest(data.events);
        if added > 0 {
            debug!("{} new notifications for {}", added, self.account.id);
        }
        RefreshOutcome::Applied
    }

    fn lock(&self) -> MutexGuard<'_, DashboardState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
