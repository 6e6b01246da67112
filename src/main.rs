//! CLI entry point for the Locus Agent orchestrator binary.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{error, info};

use locus_agent::api::ReqwestApiClient;
use locus_agent::cli::{Cli, Command};
use locus_agent::config::{Config, ConfigError, ConfigOverrides};
use locus_agent::indexer::CodebaseIndexer;
use locus_agent::init::init_workspace;
use locus_agent::llm::create_generator;
use locus_agent::orchestrator::Orchestrator;
use locus_agent::worker::Worker;

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    setup_logging();
    let cli = Cli::parse();
    let project_dir = cli.dir.clone().unwrap_or_else(|| PathBuf::from("."));

    let result = match cli.command {
        Command::Init => cmd_init(&project_dir),
        Command::Index => cmd_index(&project_dir).await,
        Command::Run {
            api_key,
            workspace,
            sprint,
            model,
            api_url,
            anthropic_api_key,
            max_tasks,
            max_empty,
            poll_interval_secs,
            http_timeout_secs,
        } => {
            cmd_run(ConfigOverrides {
                api_key,
                workspace_id: workspace,
                sprint_id: sprint,
                model,
                api_url,
                project_dir: Some(project_dir.clone()),
                anthropic_api_key,
                max_tasks,
                max_empty,
                poll_interval_secs,
                http_timeout_secs,
            })
            .await
        }
        Command::Worker {
            agent_id,
            workspace,
            sprint,
            api_url,
            api_key,
            model,
            anthropic_api_key,
            max_tasks,
            max_empty,
            poll_interval_secs,
            http_timeout_secs,
        } => {
            cmd_worker(
                &project_dir,
                agent_id,
                workspace,
                sprint,
                api_url,
                api_key,
                model,
                anthropic_api_key,
                max_tasks,
                max_empty,
                poll_interval_secs,
                http_timeout_secs,
            )
            .await
        }
    };

    match result {
        Ok(()) => ExitCode::from(0),
        Err(err) => {
            error!("{err:?}");
            ExitCode::from(1)
        }
    }
}

fn cmd_init(project_dir: &PathBuf) -> Result<()> {
    init_workspace(project_dir).context("failed to initialize workspace")?;
    println!("Initialized Locus workspace in {}", project_dir.display());
    Ok(())
}

async fn cmd_index(project_dir: &PathBuf) -> Result<()> {
    require_initialized(project_dir)?;
    let generators = create_generator("claude", project_dir, None, None);

    let indexer = CodebaseIndexer::new(generators.executor.as_ref());
    let index = indexer.reindex(project_dir).await;
    info!(
        symbols = index.symbols.len(),
        files = index.responsibilities.len(),
        "reindexed codebase"
    );
    println!("Indexed {} files", index.responsibilities.len());
    Ok(())
}

async fn cmd_run(overrides: ConfigOverrides) -> Result<()> {
    let config = Config::load(overrides).map_err(describe_config_error)?;
    let api = Arc::new(ReqwestApiClient::new(
        config.api_url.clone(),
        &config.api_key,
        config.workspace_id,
        config.http_timeout,
    ));
    let orchestrator = Orchestrator::new(api, config);
    orchestrator.start().await.context("orchestrator run failed")?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_worker(
    project_dir: &PathBuf,
    agent_id: String,
    workspace: uuid::Uuid,
    sprint: Option<uuid::Uuid>,
    api_url: String,
    api_key: String,
    model: Option<String>,
    anthropic_api_key: Option<String>,
    max_tasks: u32,
    max_empty: u32,
    poll_interval_secs: u64,
    http_timeout_secs: u64,
) -> Result<()> {
    let api = Arc::new(ReqwestApiClient::new(
        api_url,
        &api_key,
        workspace,
        std::time::Duration::from_secs(http_timeout_secs),
    ));
    let generators = create_generator(
        "claude",
        project_dir,
        model.as_deref(),
        anthropic_api_key.as_deref(),
    );

    let mut worker = Worker::new(agent_id, workspace, sprint, api, generators, project_dir.clone())
        .with_limits(max_tasks, max_empty)
        .with_poll_interval(std::time::Duration::from_secs(poll_interval_secs))
        .with_renderer(Box::new(std::io::stdout()));
    let exit_code = worker.run().await;
    if exit_code != 0 {
        eyre::bail!("worker exited with code {exit_code}");
    }
    Ok(())
}

fn require_initialized(project_dir: &PathBuf) -> Result<()> {
    if !locus_agent::config::is_initialized(project_dir) {
        eyre::bail!(
            "`{}` has not been initialized — run `locus-agent init` first",
            project_dir.display()
        );
    }
    Ok(())
}

fn describe_config_error(err: ConfigError) -> eyre::Report {
    eyre::Report::new(err)
}
