//! Error types for the edgequake-docmeta library.
//!
//! Two layers reflect two audiences:
//!
//! * [`DocMetaError`]: **Internal**: the most specific failure a pipeline
//!   stage could determine (document missing, storage unreachable, PDF
//!   unreadable, model reply malformed, …). Stages return
//!   `Err(DocMetaError)` and short-circuit the pipeline.
//!
//! * [`ErrorCode`]: **Outward**: the stable machine-readable code placed in
//!   [`crate::output::AnalyzeResult`]. Several kinds collapse onto one code
//!   (every storage fault is `MINIO_CONNECTION_FAILED`), so callers branch on
//!   the code and show the message.
//!
//! The kind → code mapping lives in [`DocMetaError::code`] and is an
//! exhaustive `match`: adding a variant without deciding its code does not
//! compile.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Every failure a single document analysis can end in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocMetaError {
    // ── Fetch ─────────────────────────────────────────────────────────────
    /// No stored object exists under the document's key prefix.
    #[error("Document not found: {document_id}")]
    NotFound {
        owner_id: String,
        document_id: String,
    },

    /// Object storage could not be reached; retried before surfacing.
    #[error("Failed to connect to object storage: {0}")]
    StorageConnection(String),

    /// Object storage answered, but with a non-connection fault.
    #[error("Object storage error: {0}")]
    Storage(String),

    // ── Extract ───────────────────────────────────────────────────────────
    /// The PDF has no pages, or no meaningful text on any page.
    #[error("{0}")]
    EmptyContent(String),

    /// The bytes are empty or cannot be decoded as a PDF.
    #[error("{0}")]
    CorruptedContent(String),

    /// Any other extraction fault.
    #[error("Failed to extract text from PDF: {0}")]
    Extraction(String),

    // ── Analyze ───────────────────────────────────────────────────────────
    /// The model provider was unreachable (or kept rate-limiting) on every attempt.
    #[error("{0}")]
    ModelConnection(String),

    /// The model replied, but not with the JSON contract we asked for.
    #[error("{0}")]
    ResponseParsing(String),

    /// Any other analysis fault: blank input, provider status errors,
    /// exhausted retry loop.
    #[error("{0}")]
    Analysis(String),

    // ── Config ────────────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (panicked task, broken invariant).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DocMetaError {
    /// The outward code for this failure. Total over all variants.
    pub fn code(&self) -> ErrorCode {
        match self {
            DocMetaError::NotFound { .. } => ErrorCode::DocumentNotFound,
            DocMetaError::StorageConnection(_) | DocMetaError::Storage(_) => {
                ErrorCode::MinioConnectionFailed
            }
            DocMetaError::EmptyContent(_)
            | DocMetaError::CorruptedContent(_)
            | DocMetaError::Extraction(_) => ErrorCode::PdfExtractionFailed,
            DocMetaError::ModelConnection(_)
            | DocMetaError::ResponseParsing(_)
            | DocMetaError::Analysis(_) => ErrorCode::AiGenerationFailed,
            DocMetaError::InvalidConfig(_) | DocMetaError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Human-readable message placed next to the code in the response.
    ///
    /// Storage connection failures omit endpoint details; everything
    /// else carries the stage's own description.
    pub fn public_message(&self) -> String {
        match self {
            DocMetaError::NotFound { document_id, .. } => {
                format!("Document not found: {document_id}")
            }
            DocMetaError::StorageConnection(_) => "Failed to connect to document storage".into(),
            DocMetaError::Storage(e) => format!("Document storage error: {e}"),
            DocMetaError::EmptyContent(e) | DocMetaError::CorruptedContent(e) => {
                format!("Failed to extract text from PDF: {e}")
            }
            DocMetaError::Extraction(e) => format!("PDF processing error: {e}"),
            DocMetaError::ModelConnection(e) | DocMetaError::ResponseParsing(e) => {
                format!("AI analysis failed: {e}")
            }
            DocMetaError::Analysis(e) => format!("AI processing error: {e}"),
            DocMetaError::InvalidConfig(e) | DocMetaError::Internal(e) => {
                format!("Internal error: {e}")
            }
        }
    }

    /// `true` for kinds a stage may retry locally.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DocMetaError::StorageConnection(_) | DocMetaError::ModelConnection(_)
        )
    }
}

/// Stable outward error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    DocumentNotFound,
    MinioConnectionFailed,
    PdfExtractionFailed,
    AiGenerationFailed,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DocumentNotFound => "DOCUMENT_NOT_FOUND",
            ErrorCode::MinioConnectionFailed => "MINIO_CONNECTION_FAILED",
            ErrorCode::PdfExtractionFailed => "PDF_EXTRACTION_FAILED",
            ErrorCode::AiGenerationFailed => "AI_GENERATION_FAILED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_storage_fault_is_minio_connection_failed() {
        assert_eq!(
            DocMetaError::StorageConnection("refused".into()).code(),
            ErrorCode::MinioConnectionFailed
        );
        assert_eq!(
            DocMetaError::Storage("AccessDenied".into()).code(),
            ErrorCode::MinioConnectionFailed
        );
    }

    #[test]
    fn extraction_kinds_share_one_code() {
        for e in [
            DocMetaError::EmptyContent("no pages".into()),
            DocMetaError::CorruptedContent("bad xref".into()),
            DocMetaError::Extraction("boom".into()),
        ] {
            assert_eq!(e.code(), ErrorCode::PdfExtractionFailed, "{e:?}");
        }
    }

    #[test]
    fn analysis_kinds_share_one_code() {
        for e in [
            DocMetaError::ModelConnection("timeout".into()),
            DocMetaError::ResponseParsing("not json".into()),
            DocMetaError::Analysis("Empty document text provided".into()),
        ] {
            assert_eq!(e.code(), ErrorCode::AiGenerationFailed, "{e:?}");
        }
    }

    #[test]
    fn not_found_message_names_document() {
        let e = DocMetaError::NotFound {
            owner_id: "p1".into(),
            document_id: "d42".into(),
        };
        assert_eq!(e.code(), ErrorCode::DocumentNotFound);
        assert_eq!(e.public_message(), "Document not found: d42");
    }

    #[test]
    fn connection_message_hides_detail() {
        let e = DocMetaError::StorageConnection("tcp connect error 10.0.0.3:9000".into());
        assert!(!e.public_message().contains("10.0.0.3"));
    }

    #[test]
    fn code_serialises_as_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::AiGenerationFailed).unwrap();
        assert_eq!(json, "\"AI_GENERATION_FAILED\"");
        assert_eq!(ErrorCode::InternalError.to_string(), "INTERNAL_ERROR");
    }

    #[test]
    fn only_connection_kinds_are_retryable() {
        assert!(DocMetaError::StorageConnection(String::new()).is_retryable());
        assert!(DocMetaError::ModelConnection(String::new()).is_retryable());
        assert!(!DocMetaError::NotFound {
            owner_id: String::new(),
            document_id: String::new()
        }
        .is_retryable());
        assert!(!DocMetaError::Analysis(String::new()).is_retryable());
    }
}
