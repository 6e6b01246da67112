//! One-shot sprint mindmap generation (§4.3)

use tracing::info;

use crate::domain::{Sprint, Task};
use crate::llm::{CachingTextGenerator, GenerationRequest, GeneratorError, TextGenerator};

const SYSTEM_PROMPT: &str = "You are an expert software engineering planner.";

const PLANNING_PREAMBLE: &str = "\
Analyze the dependencies between the tasks listed below, prioritize them, \
and produce:
1. A short analysis of task dependencies.
2. A visual mindmap (markdown or mermaid) of the sprint.
3. An explicit recommended execution order.

Do not write to the filesystem and do not reference absolute local paths \
in your output — this text is stored as plan metadata, not executed.";

/// Produces a sprint mindmap from sprint metadata and its task list.
/// Prefers a cache-capable generator when available, and otherwise
/// concatenates everything into a single prompt for the flat generator.
pub struct SprintPlanner;

impl SprintPlanner {
    /// Replan iff the mindmap is absent/empty or stale relative to the
    /// newest task in the sprint (§4.3).
    pub fn needs_replan(sprint: &Sprint, tasks: &[Task]) -> bool {
        sprint.mindmap_is_stale(tasks)
    }

    pub async fn plan_with_cache(
        generator: &dyn CachingTextGenerator,
        sprint: &Sprint,
        tasks: &[Task],
    ) -> Result<String, GeneratorError> {
        let task_list = render_task_list(tasks);
        let user_prompt = format!("{}\n\nSprint: {}\n\nTasks:\n{}", PLANNING_PREAMBLE, sprint.name, task_list);
        info!("generating sprint mindmap via cache-capable generator");
        let resp = generator
            .generate_cached(SYSTEM_PROMPT, &[task_list], &user_prompt)
            .await?;
        Ok(resp.text)
    }

    pub async fn plan_flat(
        generator: &dyn TextGenerator,
        sprint: &Sprint,
        tasks: &[Task],
    ) -> Result<String, GeneratorError> {
        let task_list = render_task_list(tasks);
        let prompt = format!(
            "{}\n\n{}\n\nSprint: {}\n\nTasks:\n{}",
            SYSTEM_PROMPT, PLANNING_PREAMBLE, sprint.name, task_list
        );
        info!("generating sprint mindmap via flat generator");
        let resp = generator.generate(&GenerationRequest::new(prompt)).await?;
        Ok(resp.text)
    }
}

fn render_task_list(tasks: &[Task]) -> String {
    tasks
        .iter()
        .map(|t| format!("- [{}] {} (priority: {})", t.status, t.title, t.priority))
        .collect::<Vec<_>>()
        .join("\n")
}
