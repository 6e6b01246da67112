//! Workspace initialization (§6.1, §6.3)

use std::path::Path;

use tracing::info;

use crate::config::{ConfigError, PersistedConfig, CLAUDE_MD_TEMPLATE, CONFIG_RELATIVE_PATH};

/// Create `.locus/`, `.locus/config.json`, and a `CLAUDE.md` template under
/// `project_dir`. A no-op if the project is already initialized.
pub fn init_workspace(project_dir: &Path) -> Result<(), ConfigError> {
    let config_path = project_dir.join(CONFIG_RELATIVE_PATH);
    if config_path.is_file() {
        info!(dir = %project_dir.display(), "workspace already initialized");
        return Ok(());
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let persisted = PersistedConfig::default();
    std::fs::write(&config_path, serde_json::to_string_pretty(&persisted)?)?;

    let claude_md = project_dir.join("CLAUDE.md");
    if !claude_md.is_file() {
        std::fs::write(&claude_md, CLAUDE_MD_TEMPLATE)?;
    }

    info!(dir = %project_dir.display(), "initialized workspace");
    Ok(())
}
