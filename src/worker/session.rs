//! Mutable per-run state carried through a worker's lifetime.

use uuid::Uuid;

/// Tracks the identity and progress counters of a single worker run.
/// One `WorkerSession` exists per worker process, for its entire lifetime.
pub struct WorkerSession {
    pub agent_id: String,
    pub workspace_id: Uuid,
    pub sprint_id: Option<Uuid>,
    pub tasks_completed: u32,
    pub consecutive_empty: u32,
}

impl WorkerSession {
    pub fn new(agent_id: String, workspace_id: Uuid, sprint_id: Option<Uuid>) -> Self {
        Self {
            agent_id,
            workspace_id,
            sprint_id,
            tasks_completed: 0,
            consecutive_empty: 0,
        }
    }
}
