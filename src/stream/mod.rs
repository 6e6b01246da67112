//! Framed NDJSON event rendering for single-shot runs (§4.6)

mod event;
mod stats;

pub use event::StreamEvent;
pub use stats::ExecutionStats;

use std::io::Write;
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::llm::{ChunkSink, StreamChunk};

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("event schema validation failed: {0}")]
    InvalidEvent(String),
    #[error("failed to write to stdout: {0}")]
    Io(#[from] std::io::Error),
}

/// Produces a strictly framed NDJSON event stream. A `start` event always
/// precedes any other event (lazy-started on first emission if needed), and
/// exactly one `done` event terminates the stream — `emit_done` is
/// idempotent.
pub struct StreamingRenderer<W: Write> {
    session_id: String,
    out: W,
    started: bool,
    done: bool,
    start_time: Instant,
    stats: ExecutionStats,
    command: String,
    model: Option<String>,
    provider: Option<String>,
    cwd: Option<String>,
}

impl<W: Write> StreamingRenderer<W> {
    pub fn new(out: W, command: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            out,
            started: false,
            done: false,
            start_time: Instant::now(),
            stats: ExecutionStats::new(),
            command: command.into(),
            model: None,
            provider: None,
            cwd: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_provider(mut self, provider: Option<String>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_cwd(mut self, cwd: Option<String>) -> Self {
        self.cwd = cwd;
        self
    }

    fn ensure_started(&mut self) -> Result<(), RendererError> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        let event = StreamEvent::start(
            &self.session_id,
            self.command.clone(),
            self.model.clone(),
            self.provider.clone(),
            self.cwd.clone(),
        );
        self.write_event(&event)
    }

    fn write_event(&mut self, event: &StreamEvent) -> Result<(), RendererError> {
        event
            .validate()
            .map_err(RendererError::InvalidEvent)?;
        let line = serde_json::to_string(event).expect("StreamEvent serialization cannot fail");
        writeln!(self.out, "{}", line)?;
        Ok(())
    }

    pub fn emit_text_delta(&mut self, content: impl Into<String>) -> Result<(), RendererError> {
        self.ensure_started()?;
        self.write_event(&StreamEvent::text_delta(&self.session_id, content.into()))
    }

    pub fn emit_thinking(&mut self, content: impl Into<String>) -> Result<(), RendererError> {
        self.ensure_started()?;
        self.write_event(&StreamEvent::thinking(&self.session_id, content.into()))
    }

    pub fn emit_status(&mut self, message: impl Into<String>) -> Result<(), RendererError> {
        self.ensure_started()?;
        self.write_event(&StreamEvent::status(&self.session_id, message.into()))
    }

    pub fn emit_error(&mut self, message: impl Into<String>) -> Result<(), RendererError> {
        self.ensure_started()?;
        let message = message.into();
        self.stats.record_error(message.clone());
        self.write_event(&StreamEvent::error(&self.session_id, "UNKNOWN", message))
    }

    /// Emit `error` then `done(1)`, in that order, within one session (§4.6).
    pub fn emit_fatal(&mut self, message: impl Into<String>) -> Result<(), RendererError> {
        self.emit_error(message)?;
        self.emit_done(1)
    }

    /// Idempotent: subsequent calls after the first are no-ops.
    pub fn emit_done(&mut self, exit_code: i32) -> Result<(), RendererError> {
        self.ensure_started()?;
        if self.done {
            return Ok(());
        }
        self.done = true;
        let duration_ms = self.start_time.elapsed().as_millis() as u64;
        let event = StreamEvent::done(
            &self.session_id,
            exit_code,
            duration_ms,
            self.stats.tool_names_in_order(),
            self.stats.tokens_used,
        );
        self.write_event(&event)
    }

    /// Translate one generator stream chunk into zero or more events,
    /// per the chunk-translation table in §4.6.
    pub fn handle_chunk(&mut self, chunk: StreamChunk) -> Result<(), RendererError> {
        match chunk {
            StreamChunk::TextDelta { content } => self.emit_text_delta(content),
            StreamChunk::Thinking { content } => self.emit_thinking(content),
            StreamChunk::ToolUse {
                tool,
                tool_id,
                parameters,
            } => {
                self.ensure_started()?;
                self.stats.record_tool_started(&tool, tool_id.clone());
                self.write_event(&StreamEvent::tool_started(
                    &self.session_id,
                    tool,
                    tool_id,
                    parameters,
                ))
            }
            StreamChunk::ToolResult {
                tool,
                tool_id,
                success,
                duration_ms,
                error,
            } => {
                self.ensure_started()?;
                self.stats
                    .record_tool_completed(&tool, tool_id.as_deref(), success, error.clone());
                self.write_event(&StreamEvent::tool_completed(
                    &self.session_id,
                    tool,
                    tool_id,
                    success,
                    duration_ms.unwrap_or(0),
                    error,
                ))
            }
            StreamChunk::ToolParameters { .. } => Ok(()),
            StreamChunk::Result { tokens_used, .. } => {
                if let Some(tokens) = tokens_used {
                    self.stats.tokens_used = Some(tokens);
                }
                Ok(())
            }
            StreamChunk::Error { message } => self.emit_error(message),
        }
    }

    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }
}

/// Lets a generator's `generate_streaming` feed chunks straight into a
/// renderer without the `llm` module depending on `stream`.
impl<W: Write + Send> ChunkSink for StreamingRenderer<W> {
    fn on_chunk(&mut self, chunk: StreamChunk) {
        if let Err(err) = self.handle_chunk(chunk) {
            warn!("failed to emit stream event: {err}");
        }
    }
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_to_buffer<F: FnOnce(&mut StreamingRenderer<&mut Vec<u8>>)>(f: F) -> Vec<String> {
        let mut buf = Vec::new();
        {
            let mut renderer = StreamingRenderer::new(&mut buf, "run");
            f(&mut renderer);
        }
        String::from_utf8(buf)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn lazy_start_precedes_any_other_event() {
        let lines = render_to_buffer(|r| {
            r.emit_status("x").unwrap();
            r.emit_done(0).unwrap();
        });
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("\"type\":\"start\""));
        assert!(lines[1].contains("\"type\":\"status\""));
        assert!(lines[2].contains("\"type\":\"done\""));
    }

    #[test]
    fn emit_done_is_idempotent() {
        let lines = render_to_buffer(|r| {
            r.emit_done(0).unwrap();
            r.emit_done(0).unwrap();
            r.emit_done(0).unwrap();
        });
        let done_count = lines.iter().filter(|l| l.contains("\"type\":\"done\"")).count();
        assert_eq!(done_count, 1);
    }

    #[test]
    fn fatal_error_emits_error_then_done_in_order() {
        let lines = render_to_buffer(|r| {
            r.emit_fatal("boom").unwrap();
        });
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("\"type\":\"error\""));
        assert!(lines[2].contains("\"type\":\"done\""));
        assert!(lines[2].contains("\"exitCode\":1"));
    }

    #[test]
    fn done_lists_deduplicated_ordered_tool_names() {
        let lines = render_to_buffer(|r| {
            r.handle_chunk(StreamChunk::ToolUse {
                tool: "grep".into(),
                tool_id: Some("1".into()),
                parameters: None,
            })
            .unwrap();
            r.handle_chunk(StreamChunk::ToolUse {
                tool: "read".into(),
                tool_id: Some("2".into()),
                parameters: None,
            })
            .unwrap();
            r.handle_chunk(StreamChunk::ToolUse {
                tool: "grep".into(),
                tool_id: Some("3".into()),
                parameters: None,
            })
            .unwrap();
            r.emit_done(0).unwrap();
        });
        let done_line = lines.last().unwrap();
        let idx_grep = done_line.find("grep").unwrap();
        let idx_read = done_line.find("read").unwrap();
        assert!(idx_grep < idx_read);
        assert_eq!(done_line.matches("grep").count(), 1);
    }
}
