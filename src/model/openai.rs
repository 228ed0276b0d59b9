//! Direct client for OpenAI-compatible chat completion endpoints.
//!
//! Groq, OpenAI, vLLM and LiteLLM all accept the same
//! `POST {base_url}/chat/completions` body, so one small reqwest client
//! covers them. Talking HTTP directly lets us classify failures precisely:
//! transport errors become [`CompletionError::Connection`], HTTP 429 becomes
//! [`CompletionError::RateLimited`] and every other non-2xx status becomes
//! [`CompletionError::Status`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{CompletionClient, CompletionError, CompletionRequest};
use crate::config::ModelConfig;
use crate::error::DocMetaError;

/// Longest provider error body quoted in an error message.
const MAX_ERROR_BODY: usize = 500;

pub struct OpenAiCompatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiCompatClient {
    pub fn new(config: &ModelConfig) -> Result<Self, DocMetaError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| DocMetaError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorised(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref key) => req.bearer_auth(key),
            None => req,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: usize,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

fn build_body<'a>(model: &'a str, request: &CompletionRequest<'a>) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: [
            ChatMessage {
                role: "system",
                content: request.system_prompt,
            },
            ChatMessage {
                role: "user",
                content: request.user_prompt,
            },
        ],
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        response_format: ResponseFormat {
            kind: "json_object",
        },
    }
}

fn transport_error(e: reqwest::Error) -> CompletionError {
    if e.is_connect() || e.is_timeout() || e.is_request() {
        CompletionError::Connection(e.to_string())
    } else {
        CompletionError::Status {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(|s| s.ceil() as u64)
}

fn truncate_body(body: &str) -> &str {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompatClient {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, CompletionError> {
        let body = build_body(&self.model, request);
        debug!("Sending chat completion to {} (model {})", self.base_url, self.model);

        let response = self
            .authorised(self.http.post(self.url("chat/completions")))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = parse_retry_after(response.headers());
            let text = response.text().await.unwrap_or_default();
            return Err(CompletionError::RateLimited {
                message: truncate_body(&text).to_string(),
                retry_after_secs,
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: Some(status.as_u16()),
                message: format!("HTTP {}: {}", status, truncate_body(&text)),
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::Connection(e.to_string())
            } else {
                CompletionError::Status {
                    status: None,
                    message: format!("Invalid completion envelope: {e}"),
                }
            }
        })?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    async fn health_check(&self) -> bool {
        match self.authorised(self.http.get(self.url("models"))).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!("Model health check returned HTTP {}", resp.status());
                false
            }
            Err(e) => {
                warn!("Model health check failed: {}", e);
                false
            }
        }
    }
}
