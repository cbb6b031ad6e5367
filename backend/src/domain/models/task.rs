//! Task lifecycle.
//!
//! A task moves between three states. Every legal edge, and what it does to
//! the owning child's coins, is encoded in [`TaskAction::transition`]:
//!
//! ```text
//!              complete              approve (+reward)
//! Incomplete ───────────▶ Pending ─────────────────▶ Approved
//!            ◀───────────  Approval ◀─────────────────
//!             undo/reject            unapprove (-reward)
//! ```
//!
//! Repeating an action whose target state the task is already in is a
//! no-op, so retries and double clicks never move coins twice.

use chrono::{DateTime, Utc};
use shared::{EventKind, LedgerReason, Role, TaskStatus};
use std::fmt;

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_REWARD: i64 = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub reward: i64,
    pub status: TaskStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub child_id: String,
    pub parent_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Move to `to`, keeping the timestamps consistent with the new state
    pub fn move_to(&mut self, to: TaskStatus, now: DateTime<Utc>) {
        match to {
            TaskStatus::Incomplete => {
                self.completed_at = None;
                self.approved_at = None;
            }
            TaskStatus::PendingApproval => {
                if self.completed_at.is_none() {
                    self.completed_at = Some(now);
                }
                self.approved_at = None;
            }
            TaskStatus::Approved => {
                if self.completed_at.is_none() {
                    self.completed_at = Some(now);
                }
                self.approved_at = Some(now);
            }
        }
        self.status = to;
        self.updated_at = now;
    }
}

/// Something a parent or child can do to a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Complete,
    Undo,
    Approve,
    Reject,
    Unapprove,
}

impl TaskAction {
    /// Which role may perform the action
    pub fn actor(self) -> Role {
        match self {
            TaskAction::Complete | TaskAction::Undo => Role::Child,
            TaskAction::Approve | TaskAction::Reject | TaskAction::Unapprove => Role::Parent,
        }
    }

    pub fn event_kind(self) -> EventKind {
        match self {
            TaskAction::Complete => EventKind::TaskCompleted,
            TaskAction::Undo => EventKind::TaskUndone,
            TaskAction::Approve => EventKind::TaskApproved,
            TaskAction::Reject => EventKind::TaskRejected,
            TaskAction::Unapprove => EventKind::TaskUnapproved,
        }
    }

    /// Where the action leads when it is legal
    pub fn target(self) -> TaskStatus {
        match self {
            TaskAction::Complete => TaskStatus::PendingApproval,
            TaskAction::Undo | TaskAction::Reject => TaskStatus::Incomplete,
            TaskAction::Approve => TaskStatus::Approved,
            TaskAction::Unapprove => TaskStatus::PendingApproval,
        }
    }

    /// The transition function for the task lifecycle
    pub fn transition(self, from: TaskStatus) -> Result<Transition, TransitionError> {
        use TaskStatus::*;

        let effect = match (self, from) {
            (TaskAction::Complete, Incomplete) => CoinEffect::None,
            (TaskAction::Undo, PendingApproval) => CoinEffect::None,
            (TaskAction::Approve, PendingApproval) => CoinEffect::Credit,
            (TaskAction::Reject, PendingApproval) => CoinEffect::None,
            (TaskAction::Unapprove, Approved) => CoinEffect::Debit,
            (action, from) if action.target() == from => return Ok(Transition::Unchanged),
            (action, from) => return Err(TransitionError { action, from }),
        };

        Ok(Transition::Changed {
            from,
            to: self.target(),
            effect,
        })
    }
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskAction::Complete => "complete",
            TaskAction::Undo => "undo",
            TaskAction::Approve => "approve",
            TaskAction::Reject => "reject",
            TaskAction::Unapprove => "unapprove",
        };
        write!(f, "{}", name)
    }
}

/// What an action does to the owning child's balance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoinEffect {
    None,
    Credit,
    Debit,
}

impl CoinEffect {
    pub fn delta(self, reward: i64) -> i64 {
        match self {
            CoinEffect::None => 0,
            CoinEffect::Credit => reward,
            CoinEffect::Debit => -reward,
        }
    }

    pub fn ledger_reason(self) -> Option<LedgerReason> {
        match self {
            CoinEffect::None => None,
            CoinEffect::Credit => Some(LedgerReason::TaskApproved),
            CoinEffect::Debit => Some(LedgerReason::TaskUnapproved),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Changed {
        from: TaskStatus,
        to: TaskStatus,
        effect: CoinEffect,
    },
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Cannot {action} a task that is {from}")]
pub struct TransitionError {
    pub action: TaskAction,
    pub from: TaskStatus,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TaskValidationError {
    #[error("Task title cannot be empty")]
    EmptyTitle,
    #[error("Task title cannot exceed 100 characters")]
    TitleTooLong,
    #[error("Task description cannot exceed 500 characters")]
    DescriptionTooLong,
    #[error("Reward must be between 0 and 10000 coins")]
    RewardOutOfRange,
    #[error("Only incomplete tasks can be edited")]
    NotEditable,
    #[error("Approved tasks cannot be deleted")]
    NotDeletable,
}

pub fn validate_title(title: &str) -> Result<String, TaskValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(TaskValidationError::EmptyTitle);
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(TaskValidationError::TitleTooLong);
    }
    Ok(title.to_string())
}

pub fn validate_description(description: &str) -> Result<String, TaskValidationError> {
    let description = description.trim();
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(TaskValidationError::DescriptionTooLong);
    }
    Ok(description.to_string())
}

pub fn validate_reward(reward: i64) -> Result<i64, TaskValidationError> {
    if !(0..=MAX_REWARD).contains(&reward) {
        return Err(TaskValidationError::RewardOutOfRange);
    }
    Ok(reward)
}

#[cfg(test)]
mod tests {
    use super::*;
    use TaskStatus::*;

    #[test]
    fn test_legal_edges() {
        assert_eq!(
            TaskAction::Complete.transition(Incomplete),
            Ok(Transition::Changed {
                from: Incomplete,
                to: PendingApproval,
                effect: CoinEffect::None
            })
        );
        assert_eq!(
            TaskAction::Approve.transition(PendingApproval),
            Ok(Transition::Changed {
                from: PendingApproval,
                to: Approved,
                effect: CoinEffect::Credit
            })
        );
        assert_eq!(
            TaskAction::Unapprove.transition(Approved),
            Ok(Transition::Changed {
                from: Approved,
                to: PendingApproval,
                effect: CoinEffect::Debit
            })
        );
        assert_eq!(
            TaskAction::Reject.transition(PendingApproval),
            Ok(Transition::Changed {
                from: PendingApproval,
                to: Incomplete,
                effect: CoinEffect::None
            })
        );
        assert_eq!(
            TaskAction::Undo.transition(PendingApproval),
            Ok(Transition::Changed {
                from: PendingApproval,
                to: Incomplete,
                effect: CoinEffect::None
            })
        );
    }

    #[test]
    fn test_repeated_actions_are_noops() {
        assert_eq!(TaskAction::Approve.transition(Approved), Ok(Transition::Unchanged));
        assert_eq!(TaskAction::Complete.transition(PendingApproval), Ok(Transition::Unchanged));
        assert_eq!(TaskAction::Unapprove.transition(PendingApproval), Ok(Transition::Unchanged));
        assert_eq!(TaskAction::Reject.transition(Incomplete), Ok(Transition::Unchanged));
        assert_eq!(TaskAction::Undo.transition(Incomplete), Ok(Transition::Unchanged));
    }

    #[test]
    fn test_illegal_edges() {
        let err = TaskAction::Approve.transition(Incomplete).unwrap_err();
        assert_eq!(err.to_string(), "Cannot approve a task that is incomplete");
        assert!(TaskAction::Unapprove.transition(Incomplete).is_err());
        assert!(TaskAction::Complete.transition(Approved).is_err());
        assert!(TaskAction::Reject.transition(Approved).is_err());
        assert!(TaskAction::Undo.transition(Approved).is_err());
    }

    #[test]
    fn test_coin_effects() {
        assert_eq!(CoinEffect::Credit.delta(10), 10);
        assert_eq!(CoinEffect::Debit.delta(10), -10);
        assert_eq!(CoinEffect::None.delta(10), 0);
        assert_eq!(CoinEffect::None.ledger_reason(), None);
    }

    #[test]
    fn test_actors() {
        assert_eq!(TaskAction::Complete.actor(), Role::Child);
        assert_eq!(TaskAction::Undo.actor(), Role::Child);
        assert_eq!(TaskAction::Approve.actor(), Role::Parent);
        assert_eq!(TaskAction::Unapprove.actor(), Role::Parent);
    }

    #[test]
    fn test_move_to_keeps_timestamps_consistent() {
        let created = Utc::now();
        let mut task = Task {
            id: "t".into(),
            title: "Dishes".into(),
            description: String::new(),
            reward: 5,
            status: Incomplete,
            completed_at: None,
            approved_at: None,
            child_id: "c".into(),
            parent_id: "p".into(),
            created_at: created,
            updated_at: created,
        };

        task.move_to(PendingApproval, created);
        assert!(task.completed_at.is_some());
        task.move_to(Approved, created);
        assert!(task.approved_at.is_some());
        task.move_to(PendingApproval, created);
        assert!(task.approved_at.is_none());
        assert!(task.completed_at.is_some());
        task.move_to(Incomplete, created);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn test_task_field_validation() {
        assert_eq!(validate_title("  Dishes "), Ok("Dishes".to_string()));
        assert_eq!(validate_title(" "), Err(TaskValidationError::EmptyTitle));
        assert_eq!(
            validate_description(&"d".repeat(501)),
            Err(TaskValidationError::DescriptionTooLong)
        );
        assert_eq!(validate_reward(-1), Err(TaskValidationError::RewardOutOfRange));
        assert_eq!(validate_reward(10_001), Err(TaskValidationError::RewardOutOfRange));
        assert_eq!(validate_reward(0), Ok(0));
    }
}
