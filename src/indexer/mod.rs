//! Codebase structural indexer (§4.4)
//!
//! Produces a JSON summary of the source tree for injection into task
//! prompts. Both enumeration and persistence failures are soft: an absent
//! or unparseable index simply means prompts omit the codebase section.

mod ignore;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::llm::{GenerationRequest, TextGenerator};

pub use ignore::is_ignored;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("failed to read or write the index file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize the index: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A structural snapshot of the source tree (§3)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodebaseIndex {
    pub symbols: HashMap<String, Vec<String>>,
    pub responsibilities: HashMap<String, String>,
    #[serde(rename = "lastIndexed")]
    pub last_indexed: String,
}

const INDEX_RELATIVE_PATH: &str = ".locus/codebase-index.json";

const SUMMARIZATION_INSTRUCTION: &str = "\
You are analyzing a software project's file listing below. Respond with a \
single strict JSON object (no markdown code fences, no commentary) of the \
shape {\"symbols\": {\"SymbolName\": [\"path/one\", \"path/two\"]}, \
\"responsibilities\": {\"path/to/file\": \"one-line description\"}}. \
Extract notable classes, functions, and types into `symbols`, and a short \
one-line description of each file's responsibility.\n\nFiles:\n";

pub struct CodebaseIndexer<'a> {
    generator: &'a dyn TextGenerator,
}

impl<'a> CodebaseIndexer<'a> {
    pub fn new(generator: &'a dyn TextGenerator) -> Self {
        Self { generator }
    }

    /// Enumerate the project tree, ask the generator to summarize it, and
    /// persist the result to `.locus/codebase-index.json`. Always returns an
    /// index — on generator/parse failure, falls back to the empty shape
    /// described in §4.4, but still attempts to persist it.
    pub async fn reindex(&self, project_root: &Path) -> CodebaseIndex {
        let paths = enumerate_paths(project_root);
        let index = self.summarize(&paths).await;

        if let Err(err) = persist(project_root, &index) {
            warn!("failed to persist codebase index: {err}");
        }

        index
    }

    async fn summarize(&self, paths: &[String]) -> CodebaseIndex {
        let prompt = format!("{}{}", SUMMARIZATION_INSTRUCTION, paths.join("\n"));
        let response = match self.generator.generate(&GenerationRequest::new(prompt)).await {
            Ok(resp) => resp,
            Err(err) => {
                warn!("codebase summarization call failed: {err}");
                return empty_index();
            }
        };

        parse_first_json_object(&response.text).unwrap_or_else(|| {
            warn!("codebase summarization response was not valid JSON");
            empty_index()
        })
    }
}

fn empty_index() -> CodebaseIndex {
    CodebaseIndex {
        symbols: HashMap::new(),
        responsibilities: HashMap::new(),
        last_indexed: Utc::now().to_rfc3339(),
    }
}

/// Parse the first balanced `{...}` object found in `text`, ignoring any
/// surrounding commentary the model may have emitted despite instructions.
fn parse_first_json_object(text: &str) -> Option<CodebaseIndex> {
    let start = text.find('{')?;
    let mut depth = 0i32;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &text[start..start + offset + 1];
                    if let Ok(mut index) = serde_json::from_str::<CodebaseIndex>(candidate) {
                        index.last_indexed = Utc::now().to_rfc3339();
                        return Some(index);
                    }
                    return None;
                }
            }
            _ => {}
        }
    }
    None
}

/// Enumerate project-relative, forward-slash-normalized paths, skipping the
/// fixed ignore set (§4.4).
fn enumerate_paths(project_root: &Path) -> Vec<String> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(project_root)
        .into_iter()
        .filter_entry(|e| !is_ignored(e.path(), project_root))
    {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(project_root) {
            let normalized = relative.to_string_lossy().replace('\\', "/");
            paths.push(normalized);
        }
    }
    paths.sort();
    debug!("indexer enumerated {} files", paths.len());
    paths
}

pub(crate) fn persist(project_root: &Path, index: &CodebaseIndex) -> Result<(), IndexerError> {
    let path = project_root.join(INDEX_RELATIVE_PATH);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(index)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Load a previously-persisted index. Returns `None` on any read/parse
/// error (§4.4: "Load on demand: return the parsed file, or null").
pub fn load(project_root: &Path) -> Option<CodebaseIndex> {
    let path = project_root.join(INDEX_RELATIVE_PATH);
    let content = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

pub fn index_path(project_root: &Path) -> PathBuf {
    project_root.join(INDEX_RELATIVE_PATH)
}
