//! Text-generation capability traits and backends (§9)
//!
//! The worker, planner, and indexer all depend only on [`TextGenerator`];
//! [`CachingTextGenerator`] is an optional refinement they use when
//! available and degrade from cleanly. Two concrete backends are provided:
//! [`anthropic::AnthropicGenerator`] (cache-capable, no filesystem access)
//! and [`subprocess::SubprocessGenerator`] (filesystem-capable, no caching).

mod anthropic;
mod error;
mod subprocess;
mod types;

pub use anthropic::AnthropicGenerator;
pub use error::GeneratorError;
pub use subprocess::SubprocessGenerator;
pub use types::{GenerationRequest, GenerationResponse, StreamChunk};

use async_trait::async_trait;
use std::path::Path;

/// Receiver for the chunks a generator produces as it streams, used by
/// `generate_streaming` to feed a [`crate::stream::StreamingRenderer`] (§4.6)
/// without the `llm` module needing to know about rendering or I/O.
pub trait ChunkSink: Send {
    fn on_chunk(&mut self, chunk: StreamChunk);
}

/// A sink that throws every chunk away — the default for backends/callers
/// that don't care about incremental output.
pub struct NullSink;

impl ChunkSink for NullSink {
    fn on_chunk(&mut self, _chunk: StreamChunk) {}
}

/// Base capability: turn a single flat prompt into response text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, req: &GenerationRequest) -> Result<GenerationResponse, GeneratorError>;

    /// Same as `generate`, but forwards chunks to `sink` as they arrive
    /// instead of only returning the final assembled response. Backends
    /// that can't stream (e.g. a single-shot HTTP response) just forward
    /// nothing and delegate to `generate`.
    async fn generate_streaming(
        &self,
        req: &GenerationRequest,
        _sink: &mut dyn ChunkSink,
    ) -> Result<GenerationResponse, GeneratorError> {
        self.generate(req).await
    }

    /// Whether this backend can itself perform filesystem side effects.
    /// The execute phase (§4.2) requires a generator for which this is true.
    fn has_filesystem_access(&self) -> bool;
}

/// Refinement for backends that support prompt caching: a system prompt, an
/// ordered list of cacheable context segments (the last one marked
/// ephemeral), and a final user turn.
#[async_trait]
pub trait CachingTextGenerator: TextGenerator {
    async fn generate_cached(
        &self,
        system_prompt: &str,
        cacheable_segments: &[String],
        user_prompt: &str,
    ) -> Result<GenerationResponse, GeneratorError>;
}

/// The pair of generators a worker needs: one always-uncached,
/// filesystem-capable executor, and an optional cache-capable planner.
pub struct Generators {
    pub executor: Box<dyn TextGenerator>,
    pub planner: Option<Box<dyn CachingTextGenerator>>,
}

/// Build the generator set for a worker process from resolved config.
///
/// `runner_binary` names the local subprocess runner (always available, used
/// for the execute phase); `anthropic_api_key` is optional and, when
/// present, yields a cache-capable planner used for the plan phase and
/// sprint-mindmap generation.
pub fn create_generator(
    runner_binary: &str,
    working_dir: &Path,
    model: Option<&str>,
    anthropic_api_key: Option<&str>,
) -> Generators {
    let executor = Box::new(SubprocessGenerator::new(runner_binary, working_dir).with_model(model));

    let planner: Option<Box<dyn CachingTextGenerator>> = anthropic_api_key.map(|key| {
        let model = model.unwrap_or("claude-sonnet-4-5");
        Box::new(AnthropicGenerator::new(key, model)) as Box<dyn CachingTextGenerator>
    });

    Generators { executor, planner }
}
