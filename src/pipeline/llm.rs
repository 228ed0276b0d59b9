//! Model call: prompt the provider with document text, parse the reply.
//!
//! This module is intentionally thin. Prompt wording lives in
//! [`crate::prompts`] and reply validation in [`super::parse`], so either can
//! change without touching the retry or error-handling logic here.
//!
//! ## Retry Strategy
//!
//! Connection failures back off exactly like the storage fetch
//! (`retry_delay * 2^attempt`). Rate limits wait twice that, since the
//! provider is asking us to slow down. Any other provider error is final.
//! When attempts run out, both retryable kinds surface as a model
//! connection failure.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::parse::parse_reply;
use crate::error::DocMetaError;
use crate::model::{CompletionClient, CompletionError, CompletionRequest};
use crate::output::DocumentMetadata;
use crate::prompts::{user_prompt, SYSTEM_PROMPT, TRUNCATION_MARKER};
use crate::retry::{retry_with_backoff, RetryAction, RetryError, RetryPolicy, Sleeper};

/// Sends document text to the model and returns validated metadata.
pub struct MetadataAnalyzer {
    client: Arc<dyn CompletionClient>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    temperature: f32,
    max_tokens: usize,
    max_input_chars: usize,
}

impl MetadataAnalyzer {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            client,
            policy,
            sleeper,
            temperature: 0.1,
            max_tokens: 1024,
            max_input_chars: 15_000,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: usize) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    /// Summarise and tag `text`.
    ///
    /// # Errors
    /// - [`DocMetaError::Analysis`]: blank input, or a non-retryable provider error
    /// - [`DocMetaError::ModelConnection`]: unreachable or rate-limited on every attempt
    /// - [`DocMetaError::ResponseParsing`]: the reply broke the JSON contract
    pub async fn analyze(&self, text: &str) -> Result<DocumentMetadata, DocMetaError> {
        if text.trim().is_empty() {
            return Err(DocMetaError::Analysis("Empty document text provided".into()));
        }

        let document = truncate_for_model(text, self.max_input_chars);
        if let Cow::Owned(_) = document {
            warn!(
                "Document text truncated from {} to {} characters",
                text.chars().count(),
                self.max_input_chars
            );
        }

        let user = user_prompt(&document);
        let request = CompletionRequest {
            system_prompt: SYSTEM_PROMPT,
            user_prompt: &user,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let request = &request;
        let client = self.client.as_ref();

        let outcome = retry_with_backoff(
            &self.policy,
            self.sleeper.as_ref(),
            "Model call",
            move |_| client.complete(request),
            classify,
        )
        .await;

        let reply = match outcome {
            Ok(reply) => reply,
            Err(RetryError::Fatal(e)) | Err(RetryError::Exhausted(e)) => {
                return Err(completion_error(e))
            }
            Err(RetryError::NoAttempts) => {
                return Err(DocMetaError::Analysis("Maximum retries exceeded".into()))
            }
        };
        debug!("Model replied with {} characters", reply.len());

        let metadata = parse_reply(&reply)?;
        info!(
            "Analysis complete: {} tags, summary {} characters",
            metadata.tags.len(),
            metadata.summary.chars().count()
        );
        Ok(metadata)
    }
}

fn classify(e: &CompletionError) -> RetryAction {
    match e {
        CompletionError::Connection(_) => RetryAction::Retry { multiplier: 1 },
        CompletionError::RateLimited {
            retry_after_secs, ..
        } => {
            if let Some(secs) = retry_after_secs {
                debug!("Provider asked to retry after {}s", secs);
            }
            RetryAction::Retry { multiplier: 2 }
        }
        CompletionError::Status { .. } => RetryAction::Fail,
    }
}

fn completion_error(e: CompletionError) -> DocMetaError {
    match e {
        CompletionError::Connection(msg) => {
            DocMetaError::ModelConnection(format!("Failed to connect to AI service: {msg}"))
        }
        CompletionError::RateLimited { message, .. } => {
            DocMetaError::ModelConnection(format!("Rate limit exceeded: {message}"))
        }
        CompletionError::Status { message, .. } => {
            DocMetaError::Analysis(format!("AI service error: {message}"))
        }
    }
}

/// Cut `text` to `max_chars` characters and append [`TRUNCATION_MARKER`].
///
/// Text within the limit is returned borrowed and unchanged.
pub fn truncate_for_model(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => Cow::Owned(format!("{}{}", &text[..idx], TRUNCATION_MARKER)),
        None => Cow::Borrowed(text),
    }
}
