//! Per-document entry point: fetch → extract → analyze.
//!
//! [`DocumentAnalyzer`] owns the three collaborators (object storage, PDF
//! backend, completion client) and runs the stages in order, stopping at the
//! first failure. It never returns `Err`: every failure becomes an
//! [`AnalyzeResult`] carrying the outward [`crate::ErrorCode`] and message,
//! which is the shape RPC and CLI hosts hand back to their callers.
//!
//! The analyzer is cheap to clone and holds no per-request state, so one
//! instance can serve any number of concurrent requests.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::AnalyzerConfig;
use crate::error::{DocMetaError, ErrorCode};
use crate::model::{resolve_client, CompletionClient};
use crate::output::{AnalyzeResult, DocumentMetadata};
use crate::pipeline::extract::{LopdfBackend, PdfBackend, TextExtractor};
use crate::pipeline::fetch::{DocumentFetcher, DocumentKey};
use crate::pipeline::llm::MetadataAnalyzer;
use crate::retry::{Sleeper, TokioSleeper};
use crate::storage::{ObjectStorage, ObjectStoreStorage};

/// Reachability of the two network collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub storage: bool,
    pub model: bool,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.storage && self.model
    }
}

#[derive(Clone)]
pub struct DocumentAnalyzer {
    storage: Arc<dyn ObjectStorage>,
    model: Arc<dyn CompletionClient>,
    fetcher: Arc<DocumentFetcher>,
    extractor: TextExtractor,
    analyzer: Arc<MetadataAnalyzer>,
}

impl DocumentAnalyzer {
    /// Build the production stack: S3-compatible storage, lopdf, and the
    /// completion client selected by `config.model`.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, DocMetaError> {
        let storage = ObjectStoreStorage::s3(&config.storage).map_err(|e| {
            DocMetaError::InvalidConfig(format!("Failed to configure object storage: {e}"))
        })?;
        let model = resolve_client(&config.model)?;
        info!(
            "Analyzer ready: bucket '{}' at {}, model '{}'",
            config.storage.bucket,
            config.storage.endpoint_url(),
            config.model.model
        );
        Ok(Self::new(
            config,
            Arc::new(storage),
            Arc::new(LopdfBackend),
            model,
        ))
    }

    /// Assemble an analyzer from explicit collaborators; waits between
    /// retries with [`TokioSleeper`].
    pub fn new(
        config: &AnalyzerConfig,
        storage: Arc<dyn ObjectStorage>,
        pdf: Arc<dyn PdfBackend>,
        model: Arc<dyn CompletionClient>,
    ) -> Self {
        Self::with_sleeper(config, storage, pdf, model, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(
        config: &AnalyzerConfig,
        storage: Arc<dyn ObjectStorage>,
        pdf: Arc<dyn PdfBackend>,
        model: Arc<dyn CompletionClient>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let policy = config.retry_policy();
        let fetcher = DocumentFetcher::new(Arc::clone(&storage), policy, Arc::clone(&sleeper));
        let extractor = TextExtractor::new(pdf, config.min_text_length);
        let analyzer = MetadataAnalyzer::new(Arc::clone(&model), policy, sleeper)
            .with_sampling(config.model.temperature, config.model.max_tokens)
            .with_max_input_chars(config.max_input_chars);

        Self {
            storage,
            model,
            fetcher: Arc::new(fetcher),
            extractor,
            analyzer: Arc::new(analyzer),
        }
    }

    /// Analyze one stored document and report the outcome.
    ///
    /// Runs inside an `analyze_document` span carrying both ids. A panic in
    /// any collaborator is caught and reported as `INTERNAL_ERROR`.
    pub async fn analyze_document(&self, owner_id: &str, document_id: &str) -> AnalyzeResult {
        let span = info_span!("analyze_document", owner_id, document_id);
        async {
            let key = DocumentKey::new(owner_id, document_id);
            let outcome = AssertUnwindSafe(self.try_analyze(&key))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(DocMetaError::Internal(panic_message(&*panic))));
            if let Err(ref e) = outcome {
                log_failure(e);
            }
            AnalyzeResult::from(outcome)
        }
        .instrument(span)
        .await
    }

    /// Run the pipeline and return the typed error instead of a response.
    pub async fn try_analyze(&self, key: &DocumentKey) -> Result<DocumentMetadata, DocMetaError> {
        info!("Analyzing document {}", key);

        let content = self.fetcher.fetch(key).await?;
        let extracted = self.extractor.extract(content).await?;

        let metadata = self.analyzer.analyze(&extracted.text).await?;
        if metadata.is_non_medical() {
            info!("Document {} classified as non-medical", key);
        } else {
            info!("Document {} analyzed: {} tags", key, metadata.tags.len());
        }
        Ok(metadata)
    }

    /// Probe storage and model concurrently.
    pub async fn health(&self) -> HealthReport {
        let (storage, model) = tokio::join!(self.storage.health_check(), self.model.health_check());
        HealthReport { storage, model }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unexpected panic".to_string()
    }
}

fn log_failure(e: &DocMetaError) {
    match e.code() {
        ErrorCode::DocumentNotFound => warn!("Document not found: {}", e),
        ErrorCode::MinioConnectionFailed => error!("Storage failure: {}", e),
        ErrorCode::PdfExtractionFailed => error!("PDF extraction failed: {}", e),
        ErrorCode::AiGenerationFailed => error!("AI analysis failed: {}", e),
        ErrorCode::InternalError => error!("Unexpected error: {}", e),
    }
}
