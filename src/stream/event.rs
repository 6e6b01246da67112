//! The StreamEvent tagged union (§3, §6.4)

use serde::Serialize;
use serde_json::Value;

use super::now_rfc3339;

/// One NDJSON event on the wire: `{type, sessionId, timestamp, ...payload}`.
/// Variants are matched exhaustively wherever this is consumed (§9).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Start {
        #[serde(rename = "sessionId")]
        session_id: String,
        timestamp: String,
        command: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        provider: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        cwd: Option<String>,
    },
    TextDelta {
        #[serde(rename = "sessionId")]
        session_id: String,
        timestamp: String,
        content: String,
    },
    Thinking {
        #[serde(rename = "sessionId")]
        session_id: String,
        timestamp: String,
        content: String,
    },
    ToolStarted {
        #[serde(rename = "sessionId")]
        session_id: String,
        timestamp: String,
        tool: String,
        #[serde(rename = "toolId", skip_serializing_if = "Option::is_none")]
        tool_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        parameters: Option<Value>,
    },
    ToolCompleted {
        #[serde(rename = "sessionId")]
        session_id: String,
        timestamp: String,
        tool: String,
        #[serde(rename = "toolId", skip_serializing_if = "Option::is_none")]
        tool_id: Option<String>,
        success: bool,
        #[serde(rename = "durationMs")]
        duration_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Status {
        #[serde(rename = "sessionId")]
        session_id: String,
        timestamp: String,
        message: String,
    },
    Error {
        #[serde(rename = "sessionId")]
        session_id: String,
        timestamp: String,
        error: ErrorPayload,
    },
    Done {
        #[serde(rename = "sessionId")]
        session_id: String,
        timestamp: String,
        #[serde(rename = "exitCode")]
        exit_code: i32,
        duration: u64,
        #[serde(rename = "toolsUsed", skip_serializing_if = "Option::is_none")]
        tools_used: Option<Vec<String>>,
        #[serde(rename = "tokensUsed", skip_serializing_if = "Option::is_none")]
        tokens_used: Option<u64>,
        success: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl StreamEvent {
    pub fn start(
        session_id: &str,
        command: String,
        model: Option<String>,
        provider: Option<String>,
        cwd: Option<String>,
    ) -> Self {
        Self::Start {
            session_id: session_id.to_string(),
            timestamp: now_rfc3339(),
            command,
            model,
            provider,
            cwd,
        }
    }

    pub fn text_delta(session_id: &str, content: String) -> Self {
        Self::TextDelta {
            session_id: session_id.to_string(),
            timestamp: now_rfc3339(),
            content,
        }
    }

    pub fn thinking(session_id: &str, content: String) -> Self {
        Self::Thinking {
            session_id: session_id.to_string(),
            timestamp: now_rfc3339(),
            content,
        }
    }

    pub fn tool_started(
        session_id: &str,
        tool: String,
        tool_id: Option<String>,
        parameters: Option<Value>,
    ) -> Self {
        Self::ToolStarted {
            session_id: session_id.to_string(),
            timestamp: now_rfc3339(),
            tool,
            tool_id,
            parameters,
        }
    }

    pub fn tool_completed(
        session_id: &str,
        tool: String,
        tool_id: Option<String>,
        success: bool,
        duration_ms: u64,
        error: Option<String>,
    ) -> Self {
        Self::ToolCompleted {
            session_id: session_id.to_string(),
            timestamp: now_rfc3339(),
            tool,
            tool_id,
            success,
            duration_ms,
            error,
        }
    }

    pub fn status(session_id: &str, message: String) -> Self {
        Self::Status {
            session_id: session_id.to_string(),
            timestamp: now_rfc3339(),
            message,
        }
    }

    pub fn error(session_id: &str, code: &str, message: String) -> Self {
        Self::Error {
            session_id: session_id.to_string(),
            timestamp: now_rfc3339(),
            error: ErrorPayload {
                code: code.to_string(),
                message,
            },
        }
    }

    pub fn done(
        session_id: &str,
        exit_code: i32,
        duration: u64,
        tools_used: Vec<String>,
        tokens_used: Option<u64>,
    ) -> Self {
        Self::Done {
            session_id: session_id.to_string(),
            timestamp: now_rfc3339(),
            exit_code,
            duration,
            tools_used: (!tools_used.is_empty()).then_some(tools_used),
            tokens_used,
            success: exit_code == 0,
        }
    }

    /// Schema validation before emission (§4.6). A failure here is a
    /// programmer error the renderer cannot recover from.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::ToolStarted { tool, .. } | Self::ToolCompleted { tool, .. } if tool.is_empty() => {
                Err("tool name must not be empty".to_string())
            }
            Self::Done { duration, .. } if *duration > i64::MAX as u64 => {
                Err("duration overflowed".to_string())
            }
            _ => Ok(()),
        }
    }
}
