//! Cache-capable chat-completions backend (§9: "chat-completions mode")
//!
//! Used for the planning phase and sprint-mindmap generation, where prompt
//! caching meaningfully cuts cost across repeated calls that share a large
//! common prefix (the base task prompt). Never used for the execute phase:
//! it has no filesystem side-effect capability.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::GeneratorError;
use super::types::{GenerationRequest, GenerationResponse};
use super::{CachingTextGenerator, TextGenerator};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 8192;

pub struct AnthropicGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl AnthropicGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(300))
                .build()
                .expect("building the HTTP client with static config cannot fail"),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    async fn send(&self, body: &MessagesRequest<'_>) -> Result<GenerationResponse, GeneratorError> {
        let resp = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(GeneratorError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let parsed: MessagesResponse = serde_json::from_str(&text)
            .map_err(|e| GeneratorError::InvalidResponse(e.to_string()))?;

        let combined = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
            })
            .collect::<Vec<_>>()
            .join("");

        Ok(GenerationResponse {
            text: combined,
            tokens_used: parsed
                .usage
                .map(|u| (u.input_tokens + u.output_tokens) as u64),
        })
    }
}

#[async_trait]
impl TextGenerator for AnthropicGenerator {
    async fn generate(&self, req: &GenerationRequest) -> Result<GenerationResponse, GeneratorError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: DEFAULT_MAX_TOKENS,
            system: None,
            messages: vec![Message {
                role: "user",
                content: vec![ContentBlockReq::Text { text: &req.prompt, cache_control: None }],
            }],
        };
        self.send(&body).await
    }

    fn has_filesystem_access(&self) -> bool {
        false
    }
}

#[async_trait]
impl CachingTextGenerator for AnthropicGenerator {
    async fn generate_cached(
        &self,
        system_prompt: &str,
        cacheable_segments: &[String],
        user_prompt: &str,
    ) -> Result<GenerationResponse, GeneratorError> {
        let mut content = Vec::with_capacity(cacheable_segments.len());
        let last = cacheable_segments.len().saturating_sub(1);
        for (i, segment) in cacheable_segments.iter().enumerate() {
            let cache_control = if i == last {
                Some(CacheControl { cache_type: "ephemeral" })
            } else {
                None
            };
            content.push(ContentBlockReq::Text {
                text: segment,
                cache_control,
            });
        }

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: DEFAULT_MAX_TOKENS,
            system: Some(system_prompt),
            messages: vec![Message {
                role: "user",
                content: {
                    let mut c = content;
                    c.push(ContentBlockReq::Text {
                        text: user_prompt,
                        cache_control: None,
                    });
                    c
                },
            }],
        };
        self.send(&body).await
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: Vec<ContentBlockReq<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlockReq<'a> {
    Text {
        text: &'a str,
        #[serde(skip_serializing_if = "Option::is_none", rename = "cache_control")]
        cache_control: Option<CacheControl>,
    },
}

#[derive(Serialize)]
struct CacheControl {
    #[serde(rename = "type")]
    cache_type: &'static str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_response_detects_completion_token() {
        let resp = GenerationResponse {
            text: "work done\n<promise>COMPLETE</promise>".into(),
            tokens_used: None,
        };
        assert!(resp.signals_completion());
    }

    #[test]
    fn generation_response_without_token_is_incomplete() {
        let resp = GenerationResponse {
            text: "done.".into(),
            tokens_used: None,
        };
        assert!(!resp.signals_completion());
    }
}
