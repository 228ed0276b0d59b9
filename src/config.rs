//! Configuration types for document analysis.
//!
//! All analysis behaviour is controlled through [`AnalyzerConfig`], built via
//! its [`AnalyzerConfigBuilder`]. The config is constructed once at process
//! start, validated, and then shared read-only (`Arc<AnalyzerConfig>`) by
//! every component for the lifetime of the process.

use crate::error::DocMetaError;
use crate::retry::RetryPolicy;
use std::fmt;
use std::time::Duration;

/// Configuration for the whole fetch → extract → analyze pipeline.
///
/// Built via [`AnalyzerConfig::builder()`] or using
/// [`AnalyzerConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_docmeta::AnalyzerConfig;
///
/// let config = AnalyzerConfig::builder()
///     .storage_endpoint("localhost:9000")
///     .bucket("documents")
///     .api_key("gsk_test")
///     .max_retries(5)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_retries, 5);
/// ```
#[derive(Clone)]
pub struct AnalyzerConfig {
    /// Object storage connection settings.
    pub storage: StorageConfig,

    /// Language-model provider settings.
    pub model: ModelConfig,

    /// Total attempts per stage for retryable failures. Default: 3.
    ///
    /// Applies to storage connection failures and to model connection and
    /// rate-limit failures. Non-retryable kinds never consume extra attempts.
    pub max_retries: u32,

    /// Base backoff delay. Default: 1 s.
    ///
    /// The wait before retry `n` (0-based attempt that just failed) is
    /// `retry_delay * 2^n`; rate-limit waits are doubled again.
    pub retry_delay: Duration,

    /// Longest document text sent to the model, in characters. Default: 15 000.
    pub max_input_chars: usize,

    /// Shortest cleaned text accepted from the extractor. Default: 10.
    pub min_text_length: usize,

    /// Default log filter when `RUST_LOG` is not set. Default: "info".
    pub log_level: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            model: ModelConfig::default(),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            max_input_chars: 15_000,
            min_text_length: 10,
            log_level: "info".to_string(),
        }
    }
}

impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("storage", &self.storage)
            .field("model", &self.model)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("max_input_chars", &self.max_input_chars)
            .field("min_text_length", &self.min_text_length)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl AnalyzerConfig {
    /// Create a new builder for `AnalyzerConfig`.
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder {
            config: Self::default(),
        }
    }

    /// The backoff schedule shared by the fetch and analyze stages.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_delay)
    }
}

/// Where documents live.
#[derive(Clone)]
pub struct StorageConfig {
    /// `host:port`, or a full URL. Default: "minio:9000".
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    /// Default: "documents".
    pub bucket: String,
    /// MinIO ignores the region but the S3 signer needs one. Default: "us-east-1".
    pub region: String,
    /// Use HTTPS when `endpoint` has no scheme. Default: false.
    pub secure: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "minio:9000".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            bucket: "documents".to_string(),
            region: "us-east-1".to_string(),
            secure: false,
        }
    }
}

impl StorageConfig {
    /// The endpoint as a URL, adding a scheme from `secure` when missing.
    pub fn endpoint_url(&self) -> String {
        if self.endpoint.contains("://") {
            self.endpoint.clone()
        } else if self.secure {
            format!("https://{}", self.endpoint)
        } else {
            format!("http://{}", self.endpoint)
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("secure", &self.secure)
            .finish()
    }
}

/// Which model to ask, and how.
#[derive(Clone)]
pub struct ModelConfig {
    /// OpenAI-compatible API root. Default: Groq.
    pub base_url: String,

    /// Bearer token for `base_url`.
    pub api_key: Option<String>,

    /// Model identifier. Default: "openai/gpt-oss-120b".
    pub model: String,

    /// Named edgequake-llm provider ("openai", "anthropic", "ollama", …).
    ///
    /// When set, the provider factory builds the client (reading its own API
    /// key variable) and `base_url` / `api_key` are ignored.
    pub provider_name: Option<String>,

    /// Sampling temperature. Range 0.0–2.0. Default: 0.1.
    ///
    /// Summaries and tags should be reproducible for the same document, so
    /// keep this near zero.
    pub temperature: f32,

    /// Maximum tokens in the reply. Default: 1024.
    pub max_tokens: usize,

    /// Per-HTTP-call timeout in seconds. Default: 60.
    ///
    /// A timed-out call counts as a connection failure and is retried.
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key: None,
            model: "openai/gpt-oss-120b".to_string(),
            provider_name: None,
            temperature: 0.1,
            max_tokens: 1024,
            request_timeout_secs: 60,
        }
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Builder for [`AnalyzerConfig`].
#[derive(Debug)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn storage_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.storage.endpoint = endpoint.into();
        self
    }

    pub fn storage_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.config.storage.access_key = access_key.into();
        self.config.storage.secret_key = secret_key.into();
        self
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.config.storage.bucket = bucket.into();
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.storage.region = region.into();
        self
    }

    pub fn secure(mut self, v: bool) -> Self {
        self.config.storage.secure = v;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.model.base_url = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.model.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.model.provider_name = Some(name.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.model.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.model.max_tokens = n;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.model.request_timeout_secs = secs;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Convenience for float-seconds settings such as `RETRY_DELAY_SECONDS=0.5`.
    ///
    /// Negative or non-finite values collapse to zero.
    pub fn retry_delay_secs(mut self, secs: f64) -> Self {
        let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
        self.config.retry_delay = Duration::from_secs_f64(secs);
        self
    }

    pub fn max_input_chars(mut self, n: usize) -> Self {
        self.config.max_input_chars = n;
        self
    }

    pub fn min_text_length(mut self, n: usize) -> Self {
        self.config.min_text_length = n;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalyzerConfig, DocMetaError> {
        let c = &self.config;
        if c.storage.endpoint.trim().is_empty() {
            return Err(DocMetaError::InvalidConfig(
                "Storage endpoint must not be empty".into(),
            ));
        }
        if c.storage.bucket.trim().is_empty() {
            return Err(DocMetaError::InvalidConfig(
                "Bucket name must not be empty".into(),
            ));
        }
        if c.model.model.trim().is_empty() {
            return Err(DocMetaError::InvalidConfig(
                "Model name must not be empty".into(),
            ));
        }
        if c.model.max_tokens == 0 {
            return Err(DocMetaError::InvalidConfig(
                "Max tokens must be ≥ 1".into(),
            ));
        }
        if c.max_input_chars == 0 {
            return Err(DocMetaError::InvalidConfig(
                "Max input characters must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment() {
        let c = AnalyzerConfig::default();
        assert_eq!(c.max_retries, 3);
        assert_eq!(c.retry_delay, Duration::from_secs(1));
        assert_eq!(c.max_input_chars, 15_000);
        assert_eq!(c.min_text_length, 10);
        assert_eq!(c.storage.bucket, "documents");
        assert_eq!(c.model.max_tokens, 1024);
        assert!((c.model.temperature - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn endpoint_url_adds_scheme() {
        let mut s = StorageConfig::default();
        assert_eq!(s.endpoint_url(), "http://minio:9000");
        s.secure = true;
        assert_eq!(s.endpoint_url(), "https://minio:9000");
        s.endpoint = "http://localhost:9000".into();
        assert_eq!(s.endpoint_url(), "http://localhost:9000");
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = AnalyzerConfig::builder().temperature(7.5).build().unwrap();
        assert!((c.model.temperature - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn builder_rejects_empty_bucket() {
        let err = AnalyzerConfig::builder().bucket("  ").build().unwrap_err();
        assert!(matches!(err, DocMetaError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_zero_max_tokens() {
        assert!(AnalyzerConfig::builder().max_tokens(0).build().is_err());
    }

    #[test]
    fn zero_retries_is_allowed() {
        let c = AnalyzerConfig::builder().max_retries(0).build().unwrap();
        assert_eq!(c.retry_policy().max_attempts(), 0);
    }

    #[test]
    fn retry_delay_secs_ignores_negative() {
        let c = AnalyzerConfig::builder()
            .retry_delay_secs(-3.0)
            .build()
            .unwrap();
        assert_eq!(c.retry_delay, Duration::ZERO);
        let c = AnalyzerConfig::builder()
            .retry_delay_secs(0.25)
            .build()
            .unwrap();
        assert_eq!(c.retry_delay, Duration::from_millis(250));
    }

    #[test]
    fn debug_redacts_secrets() {
        let c = AnalyzerConfig::builder()
            .storage_credentials("ak", "super-secret")
            .api_key("gsk_live_123")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(!dbg.contains("gsk_live_123"));
    }
}
