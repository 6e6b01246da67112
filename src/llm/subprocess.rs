//! Opaque subprocess runner backend (§9: "completion mode")
//!
//! Wraps a local CLI-based coding agent (e.g. a `claude`-style binary) that
//! reads one flat prompt and performs its own filesystem side effects. This
//! is always the backend used for the execute phase (§4.2), since only it
//! can actually touch the source tree.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use super::error::GeneratorError;
use super::types::GenerationRequest;
use super::{ChunkSink, GenerationResponse, NullSink, StreamChunk, TextGenerator};

pub struct SubprocessGenerator {
    binary: String,
    extra_args: Vec<String>,
    working_dir: PathBuf,
}

impl SubprocessGenerator {
    pub fn new(binary: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            extra_args: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    pub fn with_model(mut self, model: Option<&str>) -> Self {
        if let Some(model) = model {
            self.extra_args.push("--model".to_string());
            self.extra_args.push(model.to_string());
        }
        self
    }

    /// Spawn the runner and read its stdout line by line as it arrives,
    /// forwarding each recognized line to `sink` — this is what lets a
    /// `StreamingRenderer` render tool use and text deltas live instead of
    /// only after the whole process exits.
    async fn run(&self, prompt: &str, sink: &mut dyn ChunkSink) -> Result<GenerationResponse, GeneratorError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-p")
            .arg(prompt)
            .args(&self.extra_args)
            .current_dir(&self.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        let stdout = child.stdout.take().expect("stdout was piped");
        let mut lines = BufReader::new(stdout).lines();

        let mut text = String::new();
        let mut tokens_used = None;

        while let Some(raw_line) = lines.next_line().await? {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }
            let event = parse_line(line);
            if let Some(delta) = event.text_delta {
                text.push_str(&delta);
            }
            if let Some(tokens) = event.tokens_used {
                tokens_used = Some(tokens);
            }
            if let Some(chunk) = event.chunk {
                sink.on_chunk(chunk);
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(GeneratorError::NonZeroExit(status));
        }

        Ok(GenerationResponse { text, tokens_used })
    }
}

/// What one line of runner stdout contributes: text to append to the final
/// response, a chunk to forward to the renderer, and/or a running token
/// count — a line can carry any combination of these, or none.
struct LineEvent {
    text_delta: Option<String>,
    chunk: Option<StreamChunk>,
    tokens_used: Option<u64>,
}

/// Parse one line of the runner's stdout. A line is either a free-form text
/// chunk or an NDJSON object; recognized object shapes map onto
/// [`StreamChunk`] per §4.6's chunk-translation table.
fn parse_line(line: &str) -> LineEvent {
    match serde_json::from_str::<serde_json::Value>(line) {
        Ok(value) => match value.get("type").and_then(|v| v.as_str()) {
            Some("tool_use") => LineEvent {
                text_delta: None,
                chunk: Some(StreamChunk::ToolUse {
                    tool: value.get("tool").and_then(|v| v.as_str()).unwrap_or("unknown").to_string(),
                    tool_id: value.get("id").and_then(|v| v.as_str()).map(str::to_string),
                    parameters: value.get("parameters").cloned(),
                }),
                tokens_used: None,
            },
            Some("tool_result") => LineEvent {
                text_delta: None,
                chunk: Some(StreamChunk::ToolResult {
                    tool: value.get("tool").and_then(|v| v.as_str()).unwrap_or("unknown").to_string(),
                    tool_id: value.get("id").and_then(|v| v.as_str()).map(str::to_string),
                    success: value.get("success").and_then(|v| v.as_bool()).unwrap_or(true),
                    duration_ms: value.get("duration_ms").and_then(|v| v.as_u64()),
                    error: value.get("error").and_then(|v| v.as_str()).map(str::to_string),
                }),
                tokens_used: None,
            },
            Some("thinking") => LineEvent {
                text_delta: None,
                chunk: Some(StreamChunk::Thinking {
                    content: value.get("text").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                }),
                tokens_used: None,
            },
            Some("error") => LineEvent {
                text_delta: None,
                chunk: Some(StreamChunk::Error {
                    message: value.get("message").and_then(|v| v.as_str()).unwrap_or("unknown error").to_string(),
                }),
                tokens_used: None,
            },
            _ => {
                let delta = value
                    .get("text")
                    .and_then(|v| v.as_str())
                    .or_else(|| value.get("delta").and_then(|d| d.get("text")).and_then(|t| t.as_str()))
                    .map(str::to_string);
                let tokens_used = value.get("tokens_used").and_then(|v| v.as_u64());
                let chunk = delta.clone().map(|content| StreamChunk::TextDelta { content });
                LineEvent { text_delta: delta, chunk, tokens_used }
            }
        },
        Err(_) => {
            let mut content = line.to_string();
            content.push('\n');
            LineEvent {
                text_delta: Some(content.clone()),
                chunk: Some(StreamChunk::TextDelta { content }),
                tokens_used: None,
            }
        }
    }
}

/// Fold a full stdout capture through [`parse_line`], discarding chunks.
/// Used by tests that assert on the final assembled response only.
#[cfg(test)]
fn parse_stdout(stdout: &str) -> GenerationResponse {
    let mut text = String::new();
    let mut tokens_used = None;
    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event = parse_line(line);
        if let Some(delta) = event.text_delta {
            text.push_str(&delta);
        }
        if let Some(tokens) = event.tokens_used {
            tokens_used = Some(tokens);
        }
    }
    GenerationResponse { text, tokens_used }
}

#[async_trait]
impl TextGenerator for SubprocessGenerator {
    async fn generate(&self, req: &GenerationRequest) -> Result<GenerationResponse, GeneratorError> {
        self.run(&req.prompt, &mut NullSink).await
    }

    async fn generate_streaming(
        &self,
        req: &GenerationRequest,
        sink: &mut dyn ChunkSink,
    ) -> Result<GenerationResponse, GeneratorError> {
        self.run(&req.prompt, sink).await
    }

    fn has_filesystem_access(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_text_stdout() {
        let resp = parse_stdout("hello\nworld\n<promise>COMPLETE</promise>\n");
        assert!(resp.text.contains("<promise>COMPLETE</promise>"));
    }

    #[test]
    fn parses_ndjson_text_deltas() {
        let stdout = "{\"text\":\"foo\"}\n{\"text\":\"bar\"}\n{\"tokens_used\":42}\n";
        let resp = parse_stdout(stdout);
        assert_eq!(resp.text, "foobar");
        assert_eq!(resp.tokens_used, Some(42));
    }

    #[test]
    fn parses_delta_nested_text() {
        let stdout = "{\"delta\":{\"text\":\"chunk\"}}\n";
        let resp = parse_stdout(stdout);
        assert_eq!(resp.text, "chunk");
    }

    #[test]
    fn parses_tool_use_and_result_into_chunks() {
        let used = parse_line("{\"type\":\"tool_use\",\"tool\":\"grep\",\"id\":\"1\"}");
        assert!(matches!(used.chunk, Some(StreamChunk::ToolUse { tool, .. }) if tool == "grep"));

        let done = parse_line("{\"type\":\"tool_result\",\"tool\":\"grep\",\"id\":\"1\",\"success\":true}");
        assert!(matches!(done.chunk, Some(StreamChunk::ToolResult { success: true, .. })));
    }
}
