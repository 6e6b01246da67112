//! Per-worker state machine: claim, plan, execute, report (§4.2)

mod session;
mod state;

pub use session::WorkerSession;
pub use state::WorkerState;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::api::{ApiClient, CommentRequest, TaskPatch};
use crate::artifact::ArtifactSyncer;
use crate::domain::Task;
use crate::indexer::CodebaseIndexer;
use crate::llm::{GenerationRequest, Generators};
use crate::planner::SprintPlanner;
use crate::prompt::PromptComposer;
use crate::stream::StreamingRenderer;

const DEFAULT_MAX_TASKS: u32 = 50;
const DEFAULT_MAX_EMPTY: u32 = 10;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

const PLANNING_SYSTEM_PROMPT: &str = "You are an expert software engineer.";
const PLAN_INSTRUCTION: &str =
    "Phase 1: Planning\n\nAnalyze the task above and describe your plan in detail. Do NOT execute changes yet.";
const EXECUTE_HEADER: &str = "Phase 2: Execution\n\n";
const EXECUTE_FOOTER: &str = "\nWhen finished, output: <promise>COMPLETE</promise>";

/// Outcome of one task execution (§4.2 execution protocol)
struct ExecutionOutcome {
    success: bool,
    summary: String,
}

pub struct Worker {
    session: WorkerSession,
    api: Arc<dyn ApiClient>,
    generators: Generators,
    project_root: PathBuf,
    max_tasks: u32,
    max_empty: u32,
    poll_interval: Duration,
    renderer: StreamingRenderer<Box<dyn Write + Send>>,
}

impl Worker {
    pub fn new(
        agent_id: String,
        workspace_id: Uuid,
        sprint_id: Option<Uuid>,
        api: Arc<dyn ApiClient>,
        generators: Generators,
        project_root: PathBuf,
    ) -> Self {
        Self {
            session: WorkerSession::new(agent_id, workspace_id, sprint_id),
            api,
            generators,
            project_root,
            max_tasks: DEFAULT_MAX_TASKS,
            max_empty: DEFAULT_MAX_EMPTY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            renderer: StreamingRenderer::new(Box::new(std::io::sink()) as Box<dyn Write + Send>, "worker"),
        }
    }

    pub fn with_limits(mut self, max_tasks: u32, max_empty: u32) -> Self {
        self.max_tasks = max_tasks;
        self.max_empty = max_empty;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Render the NDJSON event stream (§4.6) to `out` instead of discarding
    /// it. `cmd_worker` calls this with the worker process's own stdout.
    pub fn with_renderer(mut self, out: Box<dyn Write + Send>) -> Self {
        self.renderer = StreamingRenderer::new(out, "worker");
        self
    }

    pub fn session(&self) -> &WorkerSession {
        &self.session
    }

    /// Drive the worker to completion. Always exits with code 0 (§4.2:
    /// "A worker process exits cleanly with code 0 whether it processed
    /// tasks or not"). Brackets the whole run in exactly one `start`/`done`
    /// pair on the NDJSON stream (§8: "exactly one `done` event is emitted
    /// last").
    pub async fn run(&mut self) -> i32 {
        let mut state = WorkerState::Starting;

        loop {
            state = match state {
                WorkerState::Starting => self.handle_starting().await,
                WorkerState::Planning => self.handle_planning().await,
                WorkerState::Polling => self.handle_polling().await,
                WorkerState::Executing(task) => self.handle_executing(*task).await,
                WorkerState::Draining => {
                    info!(agent_id = %self.session.agent_id, "worker draining");
                    break;
                }
            };
        }

        if let Err(err) = self.renderer.emit_done(0) {
            warn!("failed to emit done event: {err}");
        }
        0
    }

    async fn handle_starting(&mut self) -> WorkerState {
        info!(agent_id = %self.session.agent_id, "worker starting");
        let sprint = match self.session.sprint_id {
            Some(id) => self.api.get_sprint(id).await.ok(),
            None => self.api.get_active_sprint().await.unwrap_or(None),
        };

        match sprint {
            Some(sprint) => {
                self.session.sprint_id = Some(sprint.id);
                let tasks = self
                    .api
                    .get_sprint_tasks(sprint.id)
                    .await
                    .unwrap_or_default();
                if SprintPlanner::needs_replan(&sprint, &tasks) {
                    WorkerState::Planning
                } else {
                    WorkerState::Polling
                }
            }
            None => WorkerState::Polling,
        }
    }

    async fn handle_planning(&mut self) -> WorkerState {
        let sprint_id = match self.session.sprint_id {
            Some(id) => id,
            None => return WorkerState::Polling,
        };

        let sprint = match self.api.get_sprint(sprint_id).await {
            Ok(s) => s,
            Err(err) => {
                warn!("failed to load sprint for planning: {err}");
                return WorkerState::Polling;
            }
        };
        let tasks = self
            .api
            .get_sprint_tasks(sprint_id)
            .await
            .unwrap_or_default();

        let mindmap = if let Some(planner) = &self.generators.planner {
            SprintPlanner::plan_with_cache(planner.as_ref(), &sprint, &tasks).await
        } else {
            SprintPlanner::plan_flat(self.generators.executor.as_ref(), &sprint, &tasks).await
        };

        match mindmap {
            Ok(text) => {
                if let Err(err) = self
                    .api
                    .patch_sprint_mindmap(sprint_id, &text, chrono::Utc::now())
                    .await
                {
                    warn!("failed to persist sprint mindmap: {err}");
                }
            }
            Err(err) => warn!("sprint planning failed: {err}"),
        }

        WorkerState::Polling
    }

    async fn handle_polling(&mut self) -> WorkerState {
        let claimed = self
            .api
            .dispatch(&self.session.agent_id, self.session.sprint_id)
            .await;

        match claimed {
            Ok(Some(task)) => {
                self.session.consecutive_empty = 0;
                WorkerState::Executing(Box::new(task))
            }
            Ok(None) => self.handle_empty_poll().await,
            Err(err) => {
                warn!("dispatch failed: {err}");
                self.handle_empty_poll().await
            }
        }
    }

    async fn handle_empty_poll(&mut self) -> WorkerState {
        self.session.consecutive_empty += 1;
        if self.session.consecutive_empty >= self.max_empty {
            WorkerState::Draining
        } else {
            tokio::time::sleep(self.poll_interval).await;
            WorkerState::Polling
        }
    }

    async fn handle_executing(&mut self, task: Task) -> WorkerState {
        let indexer = CodebaseIndexer::new(self.generators.executor.as_ref());
        indexer.reindex(&self.project_root).await;

        let task = self.api.get_task(task.id).await.unwrap_or(task);
        let outcome = self.execute_task(&task).await;

        if outcome.success {
            if let Err(err) = self.api.patch_task(task.id, &TaskPatch::succeed()).await {
                warn!("failed to patch task status: {err}");
            }
            if let Err(err) = self
                .api
                .post_comment(
                    task.id,
                    &CommentRequest {
                        author: self.session.agent_id.clone(),
                        text: format!("✅ {}", outcome.summary),
                    },
                )
                .await
            {
                warn!("failed to post completion comment: {err}");
            }
            self.session.tasks_completed += 1;
        } else {
            if let Err(err) = self.api.patch_task(task.id, &TaskPatch::fail()).await {
                warn!("failed to patch task status: {err}");
            }
            if let Err(err) = self
                .api
                .post_comment(
                    task.id,
                    &CommentRequest {
                        author: self.session.agent_id.clone(),
                        text: format!("❌ {}", outcome.summary),
                    },
                )
                .await
            {
                warn!("failed to post failure comment: {err}");
            }
        }

        let syncer = ArtifactSyncer::new(self.api.as_ref(), &self.project_root);
        if let Err(err) = syncer.sync().await {
            warn!("artifact sync failed: {err}");
        }

        if self.session.tasks_completed >= self.max_tasks {
            WorkerState::Draining
        } else {
            WorkerState::Polling
        }
    }

    /// The two-phase plan/execute protocol (§4.2). Both phases run through
    /// `generate_streaming` so tool use and text deltas reach `self.renderer`
    /// as they happen rather than only once the whole call returns.
    async fn execute_task(&mut self, task: &Task) -> ExecutionOutcome {
        let base_prompt = PromptComposer::new(&self.project_root).compose(task);

        let plan = if let Some(planner) = &self.generators.planner {
            planner
                .generate_cached(PLANNING_SYSTEM_PROMPT, &[base_prompt.clone()], PLAN_INSTRUCTION)
                .await
        } else {
            let prompt = format!("{}\n\n{}", base_prompt, PLAN_INSTRUCTION);
            self.generators
                .executor
                .generate_streaming(&GenerationRequest::new(prompt), &mut self.renderer)
                .await
        };

        let plan = match plan {
            Ok(resp) => resp.text,
            Err(err) => {
                return ExecutionOutcome {
                    success: false,
                    summary: format!("Error: {}", err),
                }
            }
        };

        let execute_prompt = format!("{}{}{}{}", base_prompt, EXECUTE_HEADER, plan, EXECUTE_FOOTER);
        let result = self
            .generators
            .executor
            .generate_streaming(&GenerationRequest::new(execute_prompt), &mut self.renderer)
            .await;

        match result {
            Ok(resp) if resp.signals_completion() => ExecutionOutcome {
                success: true,
                summary: "Task completed by Claude".to_string(),
            },
            Ok(_) => ExecutionOutcome {
                success: false,
                summary: "Claude did not signal completion".to_string(),
            },
            Err(err) => ExecutionOutcome {
                success: false,
                summary: format!("Error: {}", err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApiClient;
    use crate::domain::{SprintStatus, TaskPriority, TaskStatus};
    use crate::llm::mock::MockTextGenerator;
    use chrono::Utc;
    use tempfile::tempdir;

    fn task(status: TaskStatus) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: "Add health endpoint".into(),
            description: String::new(),
            status,
            priority: TaskPriority::Medium,
            assignee_role: None,
            assigned_to: None,
            sprint_id: None,
            parent_id: None,
            checklist: vec![],
            comments: vec![],
            activity_log: vec![],
            docs: vec![],
            created_at: Utc::now(),
        }
    }

    fn generators(responses: Vec<&str>) -> Generators {
        Generators {
            executor: Box::new(MockTextGenerator::new(responses)),
            planner: None,
        }
    }

    #[tokio::test]
    async fn happy_path_completes_task_and_drains_after_empty_polls() {
        let dir = tempdir().unwrap();
        let t = task(TaskStatus::Backlog);
        let api = Arc::new(MockApiClient::with_dispatch_queue(vec![Some(t.clone())]));
        api.sprint_tasks.lock().unwrap().push(t.clone());

        let mut worker = Worker::new(
            "agent-1".into(),
            Uuid::new_v4(),
            None,
            api.clone(),
            generators(vec!["1. add route", "<promise>COMPLETE</promise>"]),
            dir.path().to_path_buf(),
        )
        .with_limits(50, 2)
        .with_poll_interval(Duration::from_millis(1));

        let exit_code = worker.run().await;
        assert_eq!(exit_code, 0);
        assert_eq!(worker.session().tasks_completed, 1);

        let patches = api.patched_tasks.lock().unwrap();
        assert!(patches.iter().any(|(_, p)| p.status == Some(TaskStatus::Verification)));

        let comments = api.comments.lock().unwrap();
        assert!(comments.iter().any(|(_, c)| c.text.starts_with("✅ ")));
    }

    #[tokio::test]
    async fn execution_failure_reverts_to_backlog_with_error_comment() {
        let dir = tempdir().unwrap();
        let t = task(TaskStatus::Backlog);
        let api = Arc::new(MockApiClient::with_dispatch_queue(vec![Some(t.clone())]));
        api.sprint_tasks.lock().unwrap().push(t.clone());

        let executor = MockTextGenerator::new(vec!["1. add route"]).with_error("rate limited");
        let mut worker = Worker::new(
            "agent-1".into(),
            Uuid::new_v4(),
            None,
            api.clone(),
            Generators {
                executor: Box::new(executor),
                planner: None,
            },
            dir.path().to_path_buf(),
        )
        .with_limits(50, 1)
        .with_poll_interval(Duration::from_millis(1));

        worker.run().await;

        let patches = api.patched_tasks.lock().unwrap();
        assert!(patches.iter().any(|(_, p)| p.status == Some(TaskStatus::Backlog)));
        let comments = api.comments.lock().unwrap();
        assert!(comments
            .iter()
            .any(|(_, c)| c.text == "❌ Error: API error 0: rate limited"));
    }

    #[tokio::test]
    async fn missing_promise_token_is_treated_as_failure() {
        let dir = tempdir().unwrap();
        let t = task(TaskStatus::Backlog);
        let api = Arc::new(MockApiClient::with_dispatch_queue(vec![Some(t.clone())]));
        api.sprint_tasks.lock().unwrap().push(t.clone());

        let mut worker = Worker::new(
            "agent-1".into(),
            Uuid::new_v4(),
            None,
            api.clone(),
            generators(vec!["1. add route", "done."]),
            dir.path().to_path_buf(),
        )
        .with_limits(50, 1)
        .with_poll_interval(Duration::from_millis(1));

        worker.run().await;

        let comments = api.comments.lock().unwrap();
        assert!(comments
            .iter()
            .any(|(_, c)| c.text == "❌ Claude did not signal completion"));
    }

    #[tokio::test]
    async fn drains_after_max_empty_with_no_tasks_available() {
        let dir = tempdir().unwrap();
        let api = Arc::new(MockApiClient::with_dispatch_queue(vec![]));

        let mut worker = Worker::new(
            "agent-1".into(),
            Uuid::new_v4(),
            None,
            api.clone(),
            generators(vec![]),
            dir.path().to_path_buf(),
        )
        .with_limits(50, 3)
        .with_poll_interval(Duration::from_millis(1));

        let exit_code = worker.run().await;
        assert_eq!(exit_code, 0);
        assert!(api.dispatch_calls.load(std::sync::atomic::Ordering::SeqCst) >= 3);
    }
}
