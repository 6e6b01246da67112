//! Per-task execution accumulator (§3, §4.6)

use std::time::Instant;

/// A single tool invocation record
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub name: String,
    pub id: Option<String>,
    pub success: Option<bool>,
    pub error: Option<String>,
    finished: bool,
}

/// Accumulates tool-invocation records and terminal state for one task
/// execution. Tool-name ordering and tool-completion matching follow §4.6
/// and the boundary behaviors in §8.
#[derive(Debug, Default)]
pub struct ExecutionStats {
    invocations: Vec<ToolInvocation>,
    tool_name_order: Vec<String>,
    pub tokens_used: Option<u64>,
    pub terminal_error: Option<String>,
    start: Option<Instant>,
}

impl ExecutionStats {
    pub fn new() -> Self {
        Self {
            start: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn record_tool_started(&mut self, name: &str, id: Option<String>) {
        if !self.tool_name_order.iter().any(|n| n == name) {
            self.tool_name_order.push(name.to_string());
        }
        self.invocations.push(ToolInvocation {
            name: name.to_string(),
            id,
            success: None,
            error: None,
            finished: false,
        });
    }

    /// Match a completion to the most recent *unfinished* entry with the
    /// same id if an id was given; otherwise to the most recent unfinished
    /// entry with the same name, falling back to the most recent entry with
    /// that name at all (§4.6, §8).
    pub fn record_tool_completed(
        &mut self,
        name: &str,
        id: Option<&str>,
        success: bool,
        error: Option<String>,
    ) {
        let idx = if let Some(id) = id {
            self.invocations
                .iter()
                .rposition(|inv| inv.id.as_deref() == Some(id))
        } else {
            self.invocations
                .iter()
                .rposition(|inv| inv.name == name && !inv.finished)
                .or_else(|| self.invocations.iter().rposition(|inv| inv.name == name))
        };

        if let Some(idx) = idx {
            let inv = &mut self.invocations[idx];
            inv.success = Some(success);
            inv.error = error;
            inv.finished = true;
        } else {
            self.invocations.push(ToolInvocation {
                name: name.to_string(),
                id: id.map(str::to_string),
                success: Some(success),
                error,
                finished: true,
            });
        }
    }

    pub fn record_error(&mut self, message: String) {
        self.terminal_error = Some(message);
    }

    /// Deduplicated tool names, in order of first use (§9).
    pub fn tool_names_in_order(&self) -> Vec<String> {
        self.tool_name_order.clone()
    }

    pub fn invocations(&self) -> &[ToolInvocation] {
        &self.invocations
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.map(|s| s.elapsed().as_millis() as u64).unwrap_or(0)
    }
}
