use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::error::AppError;

/// 单个学生的导师分配状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentState {
    Unassigned,
    Assigned(i32),
}

/// 一次分配操作实际发生的变化
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Transition {
    Created,
    Unchanged,
    Moved { from: i32 },
}

impl From<Option<i32>> for AssignmentState {
    fn from(mentor_id: Option<i32>) -> Self {
        match mentor_id {
            Some(id) => AssignmentState::Assigned(id),
            None => AssignmentState::Unassigned,
        }
    }
}

impl AssignmentState {
    pub fn mentor(&self) -> Option<i32> {
        match self {
            AssignmentState::Assigned(id) => Some(*id),
            AssignmentState::Unassigned => None,
        }
    }

    pub fn authorizes(&self, mentor_id: i32) -> bool {
        self.mentor() == Some(mentor_id)
    }

    /// 普通分配：已分配给其他导师时冲突，同一导师重复分配为幂等
    pub fn assign(self, mentor_id: i32) -> Result<Transition, AppError> {
        match self {
            AssignmentState::Unassigned => Ok(Transition::Created),
            AssignmentState::Assigned(current) if current == mentor_id => Ok(Transition::Unchanged),
            AssignmentState::Assigned(_) => Err(AppError::Conflict(
                "Student is already assigned to another mentor".into(),
            )),
        }
    }

    /// 管理员改派：允许从任何状态转到目标导师
    pub fn reassign(self, mentor_id: i32) -> Transition {
        match self {
            AssignmentState::Unassigned => Transition::Created,
            AssignmentState::Assigned(current) if current == mentor_id => Transition::Unchanged,
            AssignmentState::Assigned(current) => Transition::Moved { from: current },
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Assignment {
    pub id: i32,
    pub mentor_id: i32,
    pub registration_number: String,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AssignmentOutcome {
    pub assignment: Assignment,
    #[serde(flatten)]
    pub transition: Transition,
}

/// 管理端分配列表项
#[derive(Debug, Serialize, FromRow)]
pub struct AssignmentView {
    pub registration_number: String,
    pub student_name: String,
    pub mentor_id: i32,
    pub mentor_name: String,
    pub assigned_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unassigned_student_accepts_any_mentor() {
        let state = AssignmentState::Unassigned;
        assert_eq!(state.assign(3).unwrap(), Transition::Created);
        assert_eq!(state.reassign(3), Transition::Created);
        assert!(!state.authorizes(3));
        assert_eq!(state.mentor(), None);
    }

    #[test]
    fn same_mentor_is_idempotent() {
        let state = AssignmentState::Assigned(3);
        assert_eq!(state.assign(3).unwrap(), Transition::Unchanged);
        assert_eq!(state.reassign(3), Transition::Unchanged);
        assert!(state.authorizes(3));
    }

    #[test]
    fn other_mentor_conflicts_unless_reassigned() {
        let state = AssignmentState::Assigned(3);
        assert!(matches!(state.assign(4), Err(AppError::Conflict(_))));
        assert_eq!(state.reassign(4), Transition::Moved { from: 3 });
        assert!(!state.authorizes(4));
    }

    #[test]
    fn state_from_resolved_mentor() {
        assert_eq!(AssignmentState::from(None), AssignmentState::Unassigned);
        assert_eq!(AssignmentState::from(Some(8)), AssignmentState::Assigned(8));
    }

    #[test]
    fn transition_serializes_with_outcome_tag() {
        let json = serde_json::to_value(Transition::Moved { from: 3 }).unwrap();
        assert_eq!(json, serde_json::json!({"outcome": "moved", "from": 3}));
        let json = serde_json::to_value(Transition::Created).unwrap();
        assert_eq!(json, serde_json::json!({"outcome": "created"}));
    }
}
