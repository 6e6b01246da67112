//! Deterministic task-prompt assembly (§4.5)

use std::path::Path;

use tracing::debug;

use crate::domain::Task;
use crate::indexer::CodebaseIndex;

const MAX_STRUCTURE_ENTRIES: usize = 15;
const MAX_SYMBOL_ENTRIES: usize = 10;

const CLAUDE_MD_FILENAME: &str = "CLAUDE.md";

const INSTRUCTIONS: &str = "\
## Instructions

1. Complete the task described above.
2. Save any documentation you produce under `.locus/artifacts/`, never at \
the project root.
3. Use relative paths only — never emit absolute local paths.
4. When finished, output the literal line: <promise>COMPLETE</promise>";

/// Assembles the per-task base prompt from task fields, project context,
/// the codebase index, attached docs, and history — in the exact section
/// order described in §4.5. Performs no I/O beyond reading `CLAUDE.md` and
/// the index file, and treats failures on either as soft.
pub struct PromptComposer<'a> {
    project_root: &'a Path,
}

impl<'a> PromptComposer<'a> {
    pub fn new(project_root: &'a Path) -> Self {
        Self { project_root }
    }

    pub fn compose(&self, task: &Task) -> String {
        let mut sections: Vec<String> = Vec::new();

        sections.push(format!("# Task: {}", task.title));

        if let Some(role) = &task.assignee_role {
            sections.push(format!("## Role\nYou are acting as a `{}` engineer.", role));
        }

        let description = if task.description.trim().is_empty() {
            "No description provided."
        } else {
            task.description.trim()
        };
        sections.push(format!("## Description\n{}", description));

        if let Some(claude_md) = self.read_claude_md() {
            sections.push(format!("## Project Context (from CLAUDE.md)\n{}", claude_md));
        }

        if let Some(index) = crate::indexer::load(self.project_root) {
            if let Some(section) = self.codebase_overview(task, &index) {
                sections.push(section);
            }
        }

        if !task.docs.is_empty() {
            let mut doc_section = String::from("## Attached Documents");
            for doc in &task.docs {
                let content = if doc.content.trim().is_empty() {
                    "(No content)"
                } else {
                    doc.content.as_str()
                };
                doc_section.push_str(&format!("\n\n### {}\n{}", doc.title, content));
            }
            sections.push(doc_section);
        }

        if !task.checklist.is_empty() {
            let mut checklist_section = String::from("## Acceptance Criteria");
            for item in &task.checklist {
                let marker = if item.done { "[x]" } else { "[ ]" };
                checklist_section.push_str(&format!("\n- {} {}", marker, item.text));
            }
            sections.push(checklist_section);
        }

        if !task.comments.is_empty() {
            let mut history = String::from("## Task History & Feedback");
            for comment in &task.comments {
                history.push_str(&format!(
                    "\n\n### {} ({})\n{}",
                    comment.author,
                    comment.created_at.format("%Y-%m-%d %H:%M"),
                    comment.text
                ));
            }
            sections.push(history);
        }

        sections.push(INSTRUCTIONS.to_string());

        debug!("composed prompt with {} sections", sections.len());
        sections.join("\n\n")
    }

    fn read_claude_md(&self) -> Option<String> {
        std::fs::read_to_string(self.project_root.join(CLAUDE_MD_FILENAME)).ok()
    }

    fn codebase_overview(&self, task: &Task, index: &CodebaseIndex) -> Option<String> {
        let mut overview = String::from("## Codebase Overview");
        let mut any_subsection = false;

        let mut structure_entries: Vec<(&String, &String)> = index
            .responsibilities
            .iter()
            .filter(|(path, _)| {
                let segments = path.matches('/').count() + 1;
                segments <= 2 || !path.contains('.')
            })
            .collect();
        structure_entries.sort_by_key(|(path, _)| path.as_str());
        structure_entries.truncate(MAX_STRUCTURE_ENTRIES);

        if !structure_entries.is_empty() {
            any_subsection = true;
            overview.push_str("\n\n### Project Structure");
            for (path, description) in &structure_entries {
                overview.push_str(&format!("\n- `{}`: {}", path, description));
            }
        }

        let haystack = format!("{} {}", task.title, task.description).to_lowercase();
        let mut symbol_entries: Vec<(&String, &Vec<String>)> = index
            .symbols
            .iter()
            .filter(|(name, _)| haystack.contains(&name.to_lowercase()))
            .collect();
        symbol_entries.sort_by_key(|(name, _)| name.as_str());
        symbol_entries.truncate(MAX_SYMBOL_ENTRIES);

        if !symbol_entries.is_empty() {
            any_subsection = true;
            overview.push_str("\n\n### Potentially Relevant Symbols");
            for (name, paths) in &symbol_entries {
                overview.push_str(&format!("\n- `{}` is defined in: {}", name, paths.join(", ")));
            }
        }

        any_subsection.then_some(overview)
    }
}
