//! Spawns and supervises worker subprocesses (§4.1)

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::ApiClient;
use crate::config::Config;
use crate::domain::generate_agent_id;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("orchestrator is already running")]
    AlreadyRunning,
}

/// Resolves the target sprint, spawns the configured number of worker
/// subprocesses, and forwards their output until all of them exit.
pub struct Orchestrator {
    api: Arc<dyn ApiClient>,
    config: Config,
    exe_path: PathBuf,
    running: AtomicBool,
    children: Mutex<Vec<(String, Child)>>,
}

impl Orchestrator {
    pub fn new(api: Arc<dyn ApiClient>, config: Config) -> Self {
        let exe_path = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("locus-agent"));
        Self {
            api,
            config,
            exe_path,
            running: AtomicBool::new(false),
            children: Mutex::new(Vec::new()),
        }
    }

    /// Override the binary spawned for each worker. Only used by tests.
    #[cfg(test)]
    pub fn with_exe_path(mut self, exe_path: PathBuf) -> Self {
        self.exe_path = exe_path;
        self
    }

    /// Resolve the sprint, spawn workers, and block until they all exit.
    /// Idempotent guard: fails with `AlreadyRunning` if already active.
    pub async fn start(&self) -> Result<(), OrchestratorError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(OrchestratorError::AlreadyRunning);
        }

        let sprint_id = self.resolve_sprint_id().await;
        info!(workspace = %self.config.workspace_id, sprint_id = ?sprint_id, "started");

        for _ in 0..self.config.worker_count.max(1) {
            let agent_id = generate_agent_id();
            match self.spawn_worker(&agent_id, sprint_id) {
                Ok(child) => {
                    info!(agent_id = %agent_id, "agent:spawned");
                    self.children.lock().await.push((agent_id, child));
                }
                Err(err) => warn!(agent_id = %agent_id, error = %err, "failed to spawn worker"),
            }
        }

        loop {
            let next = {
                let mut guard = self.children.lock().await;
                if guard.is_empty() {
                    None
                } else {
                    Some(guard.remove(0))
                }
            };
            let Some((agent_id, mut child)) = next else {
                break;
            };
            match child.wait().await {
                Ok(status) => {
                    info!(agent_id = %agent_id, success = status.success(), "agent:completed");
                }
                Err(err) => warn!(agent_id = %agent_id, error = %err, "failed to wait on worker"),
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("stopped");
        Ok(())
    }

    /// Terminate all live worker processes and stop accepting new ones.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let mut guard = self.children.lock().await;
        for (agent_id, child) in guard.iter_mut() {
            if let Err(err) = child.start_kill() {
                warn!(agent_id = %agent_id, error = %err, "failed to kill worker");
            }
        }
        info!("stopped");
    }

    async fn resolve_sprint_id(&self) -> Option<Uuid> {
        if let Some(id) = self.config.sprint_id {
            return Some(id);
        }
        match self.api.get_active_sprint().await {
            Ok(Some(sprint)) => Some(sprint.id),
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "failed to resolve active sprint, running in whole-workspace mode");
                None
            }
        }
    }

    fn worker_args(&self, agent_id: &str, sprint_id: Option<Uuid>) -> Vec<String> {
        let mut args = vec![
            "--dir".to_string(),
            self.config.project_dir.display().to_string(),
            "worker".to_string(),
            "--agent-id".to_string(),
            agent_id.to_string(),
            "--workspace".to_string(),
            self.config.workspace_id.to_string(),
            "--api-url".to_string(),
            self.config.api_url.clone(),
            "--api-key".to_string(),
            self.config.api_key.clone(),
            "--max-tasks".to_string(),
            self.config.max_tasks.to_string(),
            "--max-empty".to_string(),
            self.config.max_empty.to_string(),
            "--poll-interval-secs".to_string(),
            self.config.poll_interval.as_secs().to_string(),
            "--http-timeout-secs".to_string(),
            self.config.http_timeout.as_secs().to_string(),
        ];
        if let Some(sprint_id) = sprint_id {
            args.push("--sprint".to_string());
            args.push(sprint_id.to_string());
        }
        if let Some(model) = &self.config.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        if let Some(key) = &self.config.anthropic_api_key {
            args.push("--anthropic-api-key".to_string());
            args.push(key.clone());
        }
        args
    }

    fn spawn_worker(&self, agent_id: &str, sprint_id: Option<Uuid>) -> std::io::Result<Child> {
        let mut child = Command::new(&self.exe_path)
            .args(self.worker_args(agent_id, sprint_id))
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(stderr) = child.stderr.take() {
            let agent_id = agent_id.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    eprintln!("[{}] ERR: {}", agent_id, line);
                }
            });
        }

        Ok(child)
    }
}
