use shared::{
    Task as SharedTask, TaskListResponse, TaskResponse, TaskStatus, TaskTransitionResponse,
};

use crate::domain::commands::tasks::TransitionResult;
use crate::domain::models::task::Task as DomainTask;

/// Mapper to convert domain tasks into wire DTOs
pub struct TaskMapper;

impl TaskMapper {
    /// The `completed` and `approved` flags are derived from `status`
    pub fn to_dto(domain: DomainTask) -> SharedTask {
        SharedTask {
            completed: domain.status != TaskStatus::Incomplete,
            approved: domain.status == TaskStatus::Approved,
            id: domain.id,
            title: domain.title,
            description: domain.description,
            reward: domain.reward,
            status: domain.status,
            completed_at: domain.completed_at.map(|t| t.to_rfc3339()),
            approved_at: domain.approved_at.map(|t| t.to_rfc3339()),
            child_id: domain.child_id,
            parent_id: domain.parent_id,
            created_at: domain.created_at.to_rfc3339(),
            updated_at: domain.updated_at.to_rfc3339(),
        }
    }

    pub fn to_task_response(
        domain: DomainTask,
        success_message: impl Into<String>,
    ) -> TaskResponse {
        TaskResponse {
            task: Self::to_dto(domain),
            success_message: success_message.into(),
        }
    }

    pub fn to_list_response(tasks: Vec<DomainTask>) -> TaskListResponse {
        TaskListResponse {
            tasks: tasks.into_iter().map(Self::to_dto).collect(),
        }
    }

    pub fn to_transition_response(result: TransitionResult) -> TaskTransitionResponse {
        TaskTransitionResponse {
            task: Self::to_dto(result.task),
            changed: result.changed,
            child_coins: result.child_coins,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_flags_follow_status() {
        let now = Utc::now();
        let mut task = DomainTask {
            id: "t1".into(),
            title: "Dishes".into(),
            description: String::new(),
            reward: 10,
            status: TaskStatus::PendingApproval,
            completed_at: Some(now),
            approved_at: None,
            child_id: "c1".into(),
            parent_id: "p1".into(),
            created_at: now,
            updated_at: now,
        };

        let pending = TaskMapper::to_dto(task.clone());
        assert!(pending.completed);
        assert!(!pending.approved);

        task.status = TaskStatus::Approved;
        let approved = TaskMapper::to_dto(task);
        assert!(approved.completed && approved.approved);
    }
}
