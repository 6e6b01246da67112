//! Locus Agent - task-dispatching orchestrator for AI software-engineering work
//!
//! A central server holds a shared backlog of engineering tasks grouped into
//! sprints. This crate runs on a developer machine: it claims tasks from the
//! server, drives an external LLM runner to perform the work inside a local
//! source tree, and reports results back.
//!
//! # Modules
//!
//! - [`orchestrator`] - spawns and supervises worker subprocesses
//! - [`worker`] - per-worker state machine: claim, plan, execute, report
//! - [`planner`] - one-shot sprint mindmap generation
//! - [`indexer`] - codebase structural summary, cached to disk
//! - [`prompt`] - deterministic task-prompt assembly
//! - [`stream`] - framed NDJSON event rendering for single-shot runs
//! - [`api`] - HTTP client and wire types for the Locus server
//! - [`llm`] - text-generation capability traits and backends
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line surface

#![allow(dead_code)]

pub mod api;
pub mod artifact;
pub mod cli;
pub mod config;
pub mod domain;
pub mod indexer;
pub mod init;
pub mod llm;
pub mod orchestrator;
pub mod planner;
pub mod prompt;
pub mod stream;
pub mod worker;

pub use api::{ApiClient, ApiError, ReqwestApiClient};
pub use config::Config;
pub use domain::{generate_agent_id, Sprint, SprintStatus, Task, TaskPriority, TaskStatus};
pub use indexer::{CodebaseIndex, CodebaseIndexer};
pub use llm::{create_generator, CachingTextGenerator, GenerationRequest, GenerationResponse, TextGenerator};
pub use orchestrator::Orchestrator;
pub use planner::SprintPlanner;
pub use prompt::PromptComposer;
pub use stream::{ExecutionStats, StreamEvent, StreamingRenderer};
pub use worker::{Worker, WorkerSession};
