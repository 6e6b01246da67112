//! Request/response/chunk types shared by both generator backends

use serde_json::Value;

/// Free-form prompt plus whatever the backend needs to route it
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

/// Final text returned by a generator call
#[derive(Debug, Clone, Default)]
pub struct GenerationResponse {
    pub text: String,
    pub tokens_used: Option<u64>,
}

impl GenerationResponse {
    /// §4.2: success iff the response contains the literal promise token
    pub fn signals_completion(&self) -> bool {
        self.text.contains("<promise>COMPLETE</promise>")
    }
}

/// A single chunk out of a streaming generation, as consumed by the
/// StreamingRenderer (§4.6). This is a closed sum type matched exhaustively.
#[derive(Debug, Clone)]
pub enum StreamChunk {
    TextDelta {
        content: String,
    },
    Thinking {
        content: String,
    },
    ToolUse {
        tool: String,
        tool_id: Option<String>,
        parameters: Option<Value>,
    },
    ToolResult {
        tool: String,
        tool_id: Option<String>,
        success: bool,
        duration_ms: Option<u64>,
        error: Option<String>,
    },
    /// Suppressed by the renderer — parameters are delivered with `ToolUse`
    ToolParameters {
        tool_id: Option<String>,
        parameters: Value,
    },
    /// Suppressed by the renderer — final text is already streamed via deltas
    Result {
        text: String,
        tokens_used: Option<u64>,
    },
    Error {
        message: String,
    },
}
