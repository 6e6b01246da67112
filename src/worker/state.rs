//! The worker's state machine states (§4.2).

use crate::domain::Task;

/// States a worker cycles through. `run` drives transitions until
/// `Draining` is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerState {
    /// Resolve the sprint (if any) and decide whether planning is needed.
    Starting,
    /// Generate and persist a sprint mindmap, then move on to polling.
    Planning,
    /// Attempt to claim a task; fall through to executing or an empty poll.
    Polling,
    /// Run the two-phase plan/execute protocol against the task claimed by `Polling`.
    Executing(Box<Task>),
    /// Terminal state: the run loop exits with code 0 on the next iteration.
    Draining,
}
