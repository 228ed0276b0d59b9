//! # edgequake-docmeta
//!
//! Summarise and tag medical PDF documents kept in object storage, using a
//! language model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! (owner_id, document_id)
//!  │
//!  ├─ 1. Fetch    list owners/{owner}/documents/{doc}/ and read the PDF
//!  ├─ 2. Extract  page-marked text via lopdf (CPU-bound, spawn_blocking)
//!  ├─ 3. Clean    whitespace normalisation
//!  ├─ 4. Analyze  one JSON-mode chat completion, retried on connection
//!  │              failures and rate limits
//!  ├─ 5. Parse    validate {"summary", "tags"} and normalise tags
//!  └─ 6. Result   AnalyzeResult { success, summary, tags, error_code, error_message }
//! ```
//!
//! Non-medical documents (invoices, contracts, letters) come back as a
//! success with an empty summary and no tags.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_docmeta::{AnalyzerConfig, DocumentAnalyzer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnalyzerConfig::builder()
//!         .storage_endpoint("localhost:9000")
//!         .storage_credentials("minioadmin", "minioadmin")
//!         .bucket("documents")
//!         .api_key(std::env::var("GROQ_API_KEY")?)
//!         .build()?;
//!     let analyzer = DocumentAnalyzer::from_config(&config)?;
//!
//!     let result = analyzer.analyze_document("patient-17", "doc-42").await;
//!     println!("{}", serde_json::to_string_pretty(&result)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Codes
//!
//! | Code | Raised when |
//! |------|-------------|
//! | `DOCUMENT_NOT_FOUND` | nothing stored under the document's prefix |
//! | `MINIO_CONNECTION_FAILED` | storage unreachable or returned an error |
//! | `PDF_EXTRACTION_FAILED` | unreadable PDF, or no meaningful text |
//! | `AI_GENERATION_FAILED` | model unreachable, rate-limited or replied off-contract |
//! | `INTERNAL_ERROR` | anything else |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Builds the `docmeta` binary (clap, anyhow, tracing-subscriber, dotenvy) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-docmeta = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod retry;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{DocumentAnalyzer, HealthReport};
pub use config::{AnalyzerConfig, AnalyzerConfigBuilder, ModelConfig, StorageConfig};
pub use error::{DocMetaError, ErrorCode};
pub use model::{CompletionClient, CompletionError, CompletionRequest};
pub use output::{AnalyzeResult, DocumentMetadata};
pub use pipeline::extract::{ExtractedText, LopdfBackend, PdfBackend, PdfBackendError, PdfDocument};
pub use pipeline::fetch::DocumentKey;
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use storage::{ObjectStorage, ObjectStoreStorage, StorageError};
