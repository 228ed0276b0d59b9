//! [`CompletionClient`] over a named `edgequake-llm` provider.
//!
//! The provider factory reads each vendor's own API key variable
//! (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, …), so this path needs no key in
//! [`crate::config::ModelConfig`]. Provider errors arrive as one opaque
//! error type; they are sorted into connection / rate-limit / other by
//! their message.

use std::sync::Arc;

use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use tracing::{debug, warn};

use super::{CompletionClient, CompletionError, CompletionRequest};
use crate::error::DocMetaError;

pub struct LlmProviderClient {
    provider: Arc<dyn LLMProvider>,
}

impl LlmProviderClient {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    /// Instantiate `provider_name` with `model` through the provider factory.
    pub fn from_name(provider_name: &str, model: &str) -> Result<Self, DocMetaError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            DocMetaError::InvalidConfig(format!(
                "LLM provider '{provider_name}' is not configured: {e}"
            ))
        })?;
        Ok(Self::new(provider))
    }
}

/// Build `CompletionOptions` from the request.
fn build_options(request: &CompletionRequest<'_>) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(request.temperature),
        max_tokens: Some(request.max_tokens),
        ..Default::default()
    }
}

/// Sort a provider error message into a retry class.
fn classify_message(message: String) -> CompletionError {
    let lower = message.to_lowercase();
    if lower.contains("rate limit")
        || lower.contains("ratelimit")
        || lower.contains("too many requests")
        || lower.contains("429")
    {
        return CompletionError::RateLimited {
            message,
            retry_after_secs: None,
        };
    }
    if lower.contains("connect")
        || lower.contains("network")
        || lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("dns error")
    {
        return CompletionError::Connection(message);
    }
    CompletionError::Status {
        status: None,
        message,
    }
}

#[async_trait]
impl CompletionClient for LlmProviderClient {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, CompletionError> {
        let messages = vec![
            ChatMessage::system(request.system_prompt),
            ChatMessage::user(request.user_prompt),
        ];
        let options = build_options(request);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| classify_message(e.to_string()))?;

        debug!(
            "Provider reply: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }

    /// One-token chat round trip; any provider error counts as unhealthy.
    async fn health_check(&self) -> bool {
        let messages = vec![ChatMessage::user("ping")];
        let options = CompletionOptions {
            max_tokens: Some(1),
            ..Default::default()
        };
        match self.provider.chat(&messages, Some(&options)).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Provider '{}' health check failed: {}", self.provider.name(), e);
                false
            }
        }
    }
}
