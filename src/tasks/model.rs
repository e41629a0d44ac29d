//! Review-task data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Task lifecycle status.
///
/// `ToDo → InProgress → Completed` is the normal path; `Cancelled` is used
/// for sibling tasks under the single-owner claim mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    ToDo,
    InProgress,
    Completed,
    Cancelled,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ToDo => "to_do",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

/// One staff member's claimable review task for an application.
///
/// Created only by the fan-out engine, mutated only by the claim coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewTask {
    /// Unique ID.
    pub id: Uuid,
    /// The application under review.
    pub application_id: Uuid,
    /// The staff member this task was offered to.
    pub assigned_to_staff_id: String,
    /// Short title.
    pub title: String,
    /// Longer description.
    pub description: String,
    /// Lifecycle status.
    pub status: TaskStatus,
    pub priority: TaskPriority,
    /// When the review is due.
    pub due_at: DateTime<Utc>,
    /// Stamped when the staff member accepts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Stamped when the review completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Reviewer notes recorded at completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewTask {
    /// Create a fresh claimable task. Fan-out always offers review work at
    /// high priority.
    pub fn new(
        application_id: Uuid,
        staff_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        due_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            application_id,
            assigned_to_staff_id: staff_id.into(),
            title: title.into(),
            description: description.into(),
            status: TaskStatus::ToDo,
            priority: TaskPriority::High,
            due_at,
            started_at: None,
            completed_at: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}
