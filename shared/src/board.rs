//! Client-side view state derived from server data.
//!
//! Nothing here talks to the network. A controller feeds freshly fetched
//! tasks and events in and renders whatever comes out.

use std::collections::HashSet;

use crate::{Event, EventKind, Role, Task, TaskStatus};

/// Tasks split into the three columns a dashboard shows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskBoard {
    pub incomplete: Vec<Task>,
    pub pending_approval: Vec<Task>,
    pub approved: Vec<Task>,
}

impl TaskBoard {
    /// Bucket tasks by status, newest first within each bucket
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut board = TaskBoard::default();
        for task in tasks {
            match task.status {
                TaskStatus::Incomplete => board.incomplete.push(task),
                TaskStatus::PendingApproval => board.pending_approval.push(task),
                TaskStatus::Approved => board.approved.push(task),
            }
        }
        for bucket in [
            &mut board.incomplete,
            &mut board.pending_approval,
            &mut board.approved,
        ] {
            bucket.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
        board
    }

    pub fn len(&self) -> usize {
        self.incomplete.len() + self.pending_approval.len() + self.approved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of rewards of every approved task on the board
    pub fn approved_reward_total(&self) -> i64 {
        self.approved.iter().map(|task| task.reward).sum()
    }

    pub fn find(&self, task_id: &str) -> Option<&Task> {
        self.incomplete
            .iter()
            .chain(self.pending_approval.iter())
            .chain(self.approved.iter())
            .find(|task| task.id == task_id)
    }
}

/// Notification list built from the server event log.
///
/// Events are ingested in `seq` order. Anything at or below the highest seq
/// already seen is dropped, so a slow poll that returns after a newer one
/// cannot reorder or duplicate entries.
#[derive(Debug, Clone)]
pub struct NotificationFeed {
    role: Role,
    items: Vec<Event>,
    seen: HashSet<(Option<String>, EventKind, i64)>,
    last_seq: i64,
    cleared_through: i64,
}

impl NotificationFeed {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            items: Vec::new(),
            seen: HashSet::new(),
            last_seq: 0,
            cleared_through: 0,
        }
    }

    /// Ingest a batch of events and return how many new notifications it produced
    pub fn ingest(&mut self, events: impl IntoIterator<Item = Event>) -> usize {
        let mut events: Vec<Event> = events.into_iter().collect();
        events.sort_by_key(|event| event.seq);

        let mut added = 0;
        for event in events {
            if event.seq <= self.last_seq {
                continue;
            }
            self.last_seq = event.seq;

            if event.seq <= self.cleared_through || !event.kind.notifies(self.role) {
                continue;
            }
            let key = (event.task_id.clone(), event.kind, event.seq);
            if self.seen.insert(key) {
                self.items.push(event);
                added += 1;
            }
        }
        added
    }

    /// Drop every notification currently shown
    pub fn clear(&mut self) {
        self.items.clear();
        self.cleared_through = self.last_seq;
    }

    /// Adopt a cleared-through cursor reported by the server
    pub fn mark_cleared_through(&mut self, seq: i64) {
        if seq > self.cleared_through {
            self.cleared_through = seq;
            self.items.retain(|event| event.seq > seq);
        }
        if seq > self.last_seq {
            self.last_seq = seq;
        }
    }

    /// Newest notification first
    pub fn notifications(&self) -> impl Iterator<Item = &Event> {
        self.items.iter().rev()
    }

    pub fn unread_count(&self) -> usize {
        self.items.len()
    }

    /// Cursor to pass as `after` on the next event poll
    pub fn last_seq(&self) -> i64 {
        self.last_seq
    }

    pub fn cleared_through(&self) -> i64 {
        self.cleared_through
    }
}
