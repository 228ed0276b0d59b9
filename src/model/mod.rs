//! Language-model provider port.
//!
//! The analyze stage sends one system prompt plus one user prompt and reads
//! back plain text. What it needs from the provider beyond that is a clear
//! verdict on failures: connection trouble and rate limits are retried,
//! everything else is not. [`CompletionError`] encodes exactly those three
//! outcomes.
//!
//! Two implementations ship with the crate:
//!
//! * [`openai::OpenAiCompatClient`]: direct HTTP against any
//!   OpenAI-compatible `/chat/completions` endpoint (Groq by default), with
//!   JSON-object response mode.
//! * [`provider::LlmProviderClient`]: wraps a named `edgequake-llm`
//!   provider (OpenAI, Anthropic, Gemini, Ollama, …).

pub mod openai;
pub mod provider;

pub use openai::OpenAiCompatClient;
pub use provider::LlmProviderClient;

use crate::config::ModelConfig;
use crate::error::DocMetaError;
use async_trait::async_trait;
use std::sync::Arc;

/// One chat completion request.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system_prompt: &'a str,
    pub user_prompt: &'a str,
    pub temperature: f32,
    pub max_tokens: usize,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Return the model's reply text.
    ///
    /// An absent reply (provider returned no content) is `Ok("")`; judging
    /// the text is the parser's job.
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, CompletionError>;

    /// `true` when the provider answers a cheap request.
    async fn health_check(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    /// The provider could not be reached (refused, reset, DNS, timeout).
    #[error("connection failed: {0}")]
    Connection(String),

    /// HTTP 429 or the provider's equivalent.
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after_secs: Option<u64>,
    },

    /// Any other provider-side failure; not retried.
    #[error("{message}")]
    Status {
        status: Option<u16>,
        message: String,
    },
}

/// Build the completion client `config` asks for.
///
/// A named provider goes through the edgequake-llm factory; otherwise the
/// OpenAI-compatible HTTP client targets `config.base_url`.
pub fn resolve_client(config: &ModelConfig) -> Result<Arc<dyn CompletionClient>, DocMetaError> {
    if let Some(ref name) = config.provider_name {
        let client = LlmProviderClient::from_name(name, &config.model)?;
        return Ok(Arc::new(client));
    }

    let client = OpenAiCompatClient::new(config)?;
    Ok(Arc::new(client))
}
