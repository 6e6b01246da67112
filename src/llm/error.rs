//! LLM generator error types

use thiserror::Error;

/// Errors that can occur while driving a text-generation backend
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to spawn runner subprocess: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("runner subprocess exited with status {0}")]
    NonZeroExit(std::process::ExitStatus),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
