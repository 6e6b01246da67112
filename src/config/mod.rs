//! Configuration types and fallback-chain loading (§6.3, ambient stack)
//!
//! Resolution order, mirroring the fallback chain this codebase's own
//! config loader uses: explicit CLI flags first, then environment
//! variables, then the non-secret fields persisted in `.locus/config.json`,
//! then built-in defaults. Secrets are never written to disk — only the
//! CLI/env-resolved values live in memory for the process lifetime.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const CONFIG_RELATIVE_PATH: &str = ".locus/config.json";
pub const CLAUDE_MD_TEMPLATE: &str = "\
# Project Context

This file is read by Locus Agent and included in every task prompt under
\"Project Context\". Describe the stack, conventions, and anything an
engineer joining the project cold would need to know.
";

const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
const DEFAULT_MAX_TASKS: u32 = 50;
const DEFAULT_MAX_EMPTY: u32 = 10;
const DEFAULT_WORKER_COUNT: u32 = 1;
const DEFAULT_API_URL: &str = "https://api.locus.dev";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("`{0}` has not been initialized — run `locus-agent init` first")]
    ConfigMissing(PathBuf),
    #[error("missing required credential: {0}")]
    AuthMissing(&'static str),
    #[error("failed to read or write config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The non-secret fields persisted to `.locus/config.json` by `init`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedConfig {
    pub version: u32,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "projectPath")]
    pub project_path: String,
}

impl Default for PersistedConfig {
    fn default() -> Self {
        Self {
            version: 1,
            created_at: Utc::now(),
            project_path: ".".to_string(),
        }
    }
}

/// Fully-resolved runtime configuration for a `run` invocation.
///
/// Secrets (`api_key`, `anthropic_api_key`) come only from CLI flags or
/// environment variables and are held in memory only — never persisted.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub workspace_id: Uuid,
    pub sprint_id: Option<Uuid>,
    pub model: Option<String>,
    pub api_url: String,
    pub project_dir: PathBuf,
    pub anthropic_api_key: Option<String>,
    pub poll_interval: Duration,
    pub max_tasks: u32,
    pub max_empty: u32,
    pub worker_count: u32,
    pub http_timeout: Duration,
}

/// Raw inputs resolved from CLI flags, used to build a [`Config`].
/// Any field left `None` falls back to the corresponding environment
/// variable, then to a built-in default.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub workspace_id: Option<Uuid>,
    pub sprint_id: Option<Uuid>,
    pub model: Option<String>,
    pub api_url: Option<String>,
    pub project_dir: Option<PathBuf>,
    pub anthropic_api_key: Option<String>,
    pub max_tasks: Option<u32>,
    pub max_empty: Option<u32>,
    pub poll_interval_secs: Option<u64>,
    pub http_timeout_secs: Option<u64>,
}

impl Config {
    /// Resolve a full `Config` for `run`, requiring the project to already
    /// be initialized (§6.1: `run` requires initialization).
    pub fn load(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let project_dir = overrides
            .project_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));

        if !is_initialized(&project_dir) {
            return Err(ConfigError::ConfigMissing(project_dir.join(CONFIG_RELATIVE_PATH)));
        }

        let api_key = overrides
            .api_key
            .or_else(|| std::env::var("LOCUS_API_KEY").ok())
            .ok_or(ConfigError::AuthMissing("LOCUS_API_KEY"))?;

        let workspace_id = match overrides.workspace_id {
            Some(id) => id,
            None => std::env::var("LOCUS_WORKSPACE_ID")
                .ok()
                .and_then(|s| Uuid::parse_str(&s).ok())
                .ok_or(ConfigError::AuthMissing("LOCUS_WORKSPACE_ID"))?,
        };

        let anthropic_api_key = overrides
            .anthropic_api_key
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok());

        let api_url = overrides.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(Self {
            api_key,
            workspace_id,
            sprint_id: overrides.sprint_id,
            model: overrides.model,
            api_url,
            project_dir,
            anthropic_api_key,
            poll_interval: Duration::from_secs(
                overrides.poll_interval_secs.unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            ),
            max_tasks: overrides.max_tasks.unwrap_or(DEFAULT_MAX_TASKS),
            max_empty: overrides.max_empty.unwrap_or(DEFAULT_MAX_EMPTY),
            worker_count: DEFAULT_WORKER_COUNT,
            http_timeout: Duration::from_secs(
                overrides.http_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        })
    }
}

pub fn is_initialized(project_dir: &Path) -> bool {
    project_dir.join(CONFIG_RELATIVE_PATH).is_file()
}

pub fn load_persisted(project_dir: &Path) -> Option<PersistedConfig> {
    let content = std::fs::read_to_string(project_dir.join(CONFIG_RELATIVE_PATH)).ok()?;
    serde_json::from_str(&content).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    fn init(dir: &Path) {
        let locus = dir.join(".locus");
        std::fs::create_dir_all(&locus).unwrap();
        let persisted = PersistedConfig::default();
        std::fs::write(
            locus.join("config.json"),
            serde_json::to_string(&persisted).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn load_fails_with_config_missing_when_uninitialized() {
        let dir = tempdir().unwrap();
        let overrides = ConfigOverrides {
            project_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let err = Config::load(overrides).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigMissing(_)));
    }

    #[test]
    #[serial]
    fn load_fails_with_auth_missing_when_api_key_absent() {
        let dir = tempdir().unwrap();
        init(dir.path());
        std::env::remove_var("LOCUS_API_KEY");
        let overrides = ConfigOverrides {
            project_dir: Some(dir.path().to_path_buf()),
            workspace_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        let err = Config::load(overrides).unwrap_err();
        assert!(matches!(err, ConfigError::AuthMissing("LOCUS_API_KEY")));
    }

    #[test]
    fn cli_flags_take_priority_over_defaults() {
        let dir = tempdir().unwrap();
        init(dir.path());
        let overrides = ConfigOverrides {
            project_dir: Some(dir.path().to_path_buf()),
            api_key: Some("key-from-flag".into()),
            workspace_id: Some(Uuid::new_v4()),
            api_url: Some("https://custom.example.com".into()),
            ..Default::default()
        };
        let config = Config::load(overrides).unwrap();
        assert_eq!(config.api_key, "key-from-flag");
        assert_eq!(config.api_url, "https://custom.example.com");
    }

    #[test]
    fn defaults_are_applied_when_no_overrides_given() {
        let dir = tempdir().unwrap();
        init(dir.path());
        let overrides = ConfigOverrides {
            project_dir: Some(dir.path().to_path_buf()),
            api_key: Some("k".into()),
            workspace_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        let config = Config::load(overrides).unwrap();
        assert_eq!(config.max_tasks, 50);
        assert_eq!(config.max_empty, 10);
        assert_eq!(config.worker_count, 1);
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn is_initialized_reflects_config_file_presence() {
        let dir = tempdir().unwrap();
        assert!(!is_initialized(dir.path()));
        init(dir.path());
        assert!(is_initialized(dir.path()));
    }
}
