//! Wire types for the Locus server API (§6.2)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{SprintStatus, TaskStatus};

#[derive(Debug, Clone, Serialize)]
pub struct DispatchRequest {
    #[serde(rename = "workerId")]
    pub worker_id: String,
    #[serde(rename = "sprintId", skip_serializing_if = "Option::is_none")]
    pub sprint_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchResponse {
    pub task: Option<crate::domain::Task>,
}

/// Partial task update; only populated fields are serialized
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(rename = "assignedTo", skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Option<String>>,
}

impl TaskPatch {
    pub fn succeed() -> Self {
        Self {
            status: Some(TaskStatus::Verification),
            assigned_to: None,
        }
    }

    pub fn fail() -> Self {
        Self {
            status: Some(TaskStatus::Backlog),
            assigned_to: Some(None),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentRequest {
    pub author: String,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SprintTasksResponse {
    pub tasks: Vec<crate::domain::Task>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SprintPatch {
    pub mindmap: String,
    #[serde(rename = "mindmapUpdatedAt")]
    pub mindmap_updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocGroup {
    pub id: String,
    pub name: String,
    pub order: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocGroupRequest {
    pub name: String,
    pub order: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocRequest {
    pub title: String,
    pub content: String,
    #[serde(rename = "groupId")]
    pub group_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SprintSummary {
    pub id: Uuid,
    pub status: SprintStatus,
}
