//! Command-line surface for the orchestrator binary (§6.1)

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

/// Locus Agent - task-dispatching orchestrator for AI software engineering work
#[derive(Parser)]
#[command(name = "locus-agent", about = "Claims backlog tasks and drives an LLM runner against a local source tree", version)]
pub struct Cli {
    /// Project directory (defaults to the current directory)
    #[arg(short, long, global = true)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize `.locus/` in the project directory
    Init,

    /// Reindex the codebase and persist the structural summary
    Index,

    /// Start the orchestrator
    Run {
        /// Locus server API key (or `LOCUS_API_KEY`)
        #[arg(long)]
        api_key: Option<String>,

        /// Workspace id (or `LOCUS_WORKSPACE_ID`)
        #[arg(long)]
        workspace: Option<Uuid>,

        /// Sprint id to target; defaults to the workspace's active sprint
        #[arg(long)]
        sprint: Option<Uuid>,

        /// Model name passed through to the generator backends
        #[arg(long)]
        model: Option<String>,

        /// Locus server base URL
        #[arg(long, value_name = "URL")]
        api_url: Option<String>,

        /// Anthropic API key (or `ANTHROPIC_API_KEY`) — enables cache-capable sprint planning
        #[arg(long)]
        anthropic_api_key: Option<String>,

        /// Successful-task completions before a worker drains (default 50)
        #[arg(long)]
        max_tasks: Option<u32>,

        /// Consecutive empty polls before a worker drains (default 10)
        #[arg(long)]
        max_empty: Option<u32>,

        /// Seconds to sleep between empty dispatch polls (default 10)
        #[arg(long)]
        poll_interval_secs: Option<u64>,

        /// HTTP client timeout in seconds for non-LLM API calls (default 10)
        #[arg(long)]
        http_timeout_secs: Option<u64>,
    },

    /// Internal: run a single worker loop (used by `run` to spawn children)
    #[command(hide = true, name = "worker")]
    Worker {
        #[arg(long)]
        agent_id: String,

        #[arg(long)]
        workspace: Uuid,

        #[arg(long)]
        sprint: Option<Uuid>,

        #[arg(long)]
        api_url: String,

        #[arg(long)]
        api_key: String,

        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        anthropic_api_key: Option<String>,

        #[arg(long, default_value_t = 50)]
        max_tasks: u32,

        #[arg(long, default_value_t = 10)]
        max_empty: u32,

        #[arg(long, default_value_t = 10)]
        poll_interval_secs: u64,

        #[arg(long, default_value_t = 10)]
        http_timeout_secs: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_init() {
        let cli = Cli::parse_from(["locus-agent", "init"]);
        assert!(matches!(cli.command, Command::Init));
    }

    #[test]
    fn parses_index() {
        let cli = Cli::parse_from(["locus-agent", "index"]);
        assert!(matches!(cli.command, Command::Index));
    }

    #[test]
    fn parses_run_with_flags() {
        let workspace = Uuid::new_v4();
        let cli = Cli::parse_from([
            "locus-agent",
            "run",
            "--api-key",
            "secret",
            "--workspace",
            &workspace.to_string(),
        ]);
        match cli.command {
            Command::Run { api_key, workspace: ws, .. } => {
                assert_eq!(api_key.as_deref(), Some("secret"));
                assert_eq!(ws, Some(workspace));
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parses_hidden_worker_command() {
        let workspace = Uuid::new_v4();
        let cli = Cli::parse_from([
            "locus-agent",
            "worker",
            "--agent-id",
            "agent-1-abcdef",
            "--workspace",
            &workspace.to_string(),
            "--api-url",
            "https://api.locus.dev",
            "--api-key",
            "secret",
        ]);
        assert!(matches!(cli.command, Command::Worker { .. }));
    }

    #[test]
    fn global_dir_flag_applies_before_subcommand() {
        let cli = Cli::parse_from(["locus-agent", "--dir", "/tmp/proj", "index"]);
        assert_eq!(cli.dir, Some(PathBuf::from("/tmp/proj")));
    }
}
