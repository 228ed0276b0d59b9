//! Result types returned to the caller.

use crate::error::{DocMetaError, ErrorCode};
use serde::{Deserialize, Serialize};

/// AI-generated metadata for one document.
///
/// Either both fields are empty (the document was classified as
/// non-medical) or `summary` is non-empty and `tags` holds the normalised,
/// de-duplicated tag list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub summary: String,
    pub tags: Vec<String>,
}

impl DocumentMetadata {
    /// The canonical "not a medical document" outcome.
    pub fn non_medical() -> Self {
        Self::default()
    }

    pub fn is_non_medical(&self) -> bool {
        self.summary.is_empty() && self.tags.is_empty()
    }
}

/// Outward response for one `AnalyzeDocument` request.
///
/// Serialises to the wire shape
/// `{"success", "summary", "tags", "error_code", "error_message"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeResult {
    pub success: bool,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub error_code: Option<ErrorCode>,
    pub error_message: Option<String>,
}

impl AnalyzeResult {
    pub fn success(metadata: DocumentMetadata) -> Self {
        Self {
            success: true,
            summary: metadata.summary,
            tags: metadata.tags,
            error_code: None,
            error_message: None,
        }
    }

    pub fn failure(error: &DocMetaError) -> Self {
        Self {
            success: false,
            summary: String::new(),
            tags: Vec::new(),
            error_code: Some(error.code()),
            error_message: Some(error.public_message()),
        }
    }
}

impl From<Result<DocumentMetadata, DocMetaError>> for AnalyzeResult {
    fn from(outcome: Result<DocumentMetadata, DocMetaError>) -> Self {
        match outcome {
            Ok(metadata) => Self::success(metadata),
            Err(e) => Self::failure(&e),
        }
    }
}
