//! Domain types shared between the API client, worker, and prompt composer
//!
//! Tasks, sprints, and their nested records are owned by the server; this
//! crate only ever holds ephemeral copies of them (§3 of the design). The
//! one piece of domain data genuinely owned locally is the agent id, which
//! is generated once per worker process and never persisted past its
//! lifetime.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod priority;
mod status;

pub use priority::TaskPriority;
pub use status::{SprintStatus, TaskStatus};

/// A single acceptance-checklist entry on a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    pub done: bool,
}

/// A comment left on a task, authored by a human or an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// An activity-log entry recording a status transition or other event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub actor: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// A document attached to a task (e.g. design notes, requirements)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doc {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub group_id: Option<String>,
}

/// An engineering task as held by the server
///
/// A task is *claimable* iff `status == Backlog` or
/// (`status == InProgress` and `assigned_to` is empty) - see
/// [`Task::is_claimable`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub assignee_role: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub sprint_id: Option<Uuid>,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub activity_log: Vec<ActivityEntry>,
    #[serde(default)]
    pub docs: Vec<Doc>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// A task is claimable if it is sitting in the backlog, or if it was
    /// left `InProgress` by a worker that never finished claiming it.
    pub fn is_claimable(&self) -> bool {
        match self.status {
            TaskStatus::Backlog => true,
            TaskStatus::InProgress => self.assigned_to.is_none(),
            _ => false,
        }
    }
}

/// A sprint: a named, time-boxed bucket of tasks
///
/// At most one sprint per workspace carries `status == Active`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sprint {
    pub id: Uuid,
    pub name: String,
    pub status: SprintStatus,
    #[serde(default)]
    pub mindmap: Option<String>,
    #[serde(default)]
    pub mindmap_updated_at: Option<DateTime<Utc>>,
}

impl Sprint {
    /// A mindmap is stale if it is absent/empty, or if any task in the
    /// sprint was created after the mindmap was last generated.
    pub fn mindmap_is_stale(&self, tasks: &[Task]) -> bool {
        let updated_at = match (&self.mindmap, self.mindmap_updated_at) {
            (Some(m), Some(t)) if !m.trim().is_empty() => t,
            _ => return true,
        };
        tasks.iter().any(|t| t.created_at > updated_at)
    }
}

/// Generate a locally-unique agent id in the format `agent-<epoch-ms>-<6-char-base36>`
pub fn generate_agent_id() -> String {
    let epoch_ms = Utc::now().timestamp_millis();
    let suffix = random_base36(6);
    format!("agent-{}-{}", epoch_ms, suffix)
}

fn random_base36(len: usize) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::rng();
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..ALPHABET.len());
            ALPHABET[idx] as char
        })
        .collect()
}
