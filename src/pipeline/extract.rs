//! PDF text extraction.
//!
//! Decoding runs on the blocking thread pool (`spawn_blocking`) because
//! parsing a large PDF is CPU-bound and would otherwise stall the async
//! executor. The PDF library sits behind [`PdfBackend`] so the stage logic
//! (page headers, cleaning, the minimum-text rule) is tested without
//! crafting real PDFs for every case.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::clean::clean_text;
use crate::error::DocMetaError;

/// Cleaned document text plus the page count it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PdfBackendError {
    #[error("{0}")]
    Open(String),
    #[error("page {page}: {message}")]
    Page { page: usize, message: String },
}

/// An opened PDF.
pub trait PdfDocument {
    fn page_count(&self) -> usize;

    /// Text of page `index` (0-based).
    fn page_text(&self, index: usize) -> Result<String, PdfBackendError>;
}

/// Opens PDF bytes.
pub trait PdfBackend: Send + Sync {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, PdfBackendError>;
}

// ── lopdf ────────────────────────────────────────────────────────────────

/// [`PdfBackend`] over `lopdf`, fully in memory.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfBackend;

struct LopdfDocument {
    doc: lopdf::Document,
    /// Page numbers in document order (lopdf pages are 1-based).
    pages: Vec<u32>,
}

impl PdfBackend for LopdfBackend {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, PdfBackendError> {
        let doc = lopdf::Document::load_mem(bytes)
            .map_err(|e| PdfBackendError::Open(format!("Invalid or corrupted PDF: {e}")))?;
        let pages = doc.get_pages().keys().copied().collect();
        Ok(Box::new(LopdfDocument { doc, pages }))
    }
}

impl PdfDocument for LopdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> Result<String, PdfBackendError> {
        let page_num = self.pages.get(index).copied().ok_or_else(|| PdfBackendError::Page {
            page: index + 1,
            message: "page index out of range".into(),
        })?;
        self.doc
            .extract_text(&[page_num])
            .map_err(|e| PdfBackendError::Page {
                page: index + 1,
                message: e.to_string(),
            })
    }
}

// ── Extractor ────────────────────────────────────────────────────────────

/// Turns raw PDF bytes into cleaned, page-marked text.
#[derive(Clone)]
pub struct TextExtractor {
    backend: Arc<dyn PdfBackend>,
    min_text_length: usize,
}

impl TextExtractor {
    pub fn new(backend: Arc<dyn PdfBackend>, min_text_length: usize) -> Self {
        Self {
            backend,
            min_text_length,
        }
    }

    /// Extract text off the async executor.
    pub async fn extract(&self, bytes: Vec<u8>) -> Result<ExtractedText, DocMetaError> {
        if bytes.is_empty() {
            return Err(DocMetaError::CorruptedContent(
                "Empty PDF content provided".into(),
            ));
        }

        let this = self.clone();
        tokio::task::spawn_blocking(move || this.extract_blocking(&bytes))
            .await
            .map_err(|e| DocMetaError::Extraction(format!("extraction task failed: {e}")))?
    }

    /// Synchronous extraction; [`Self::extract`] runs this on the blocking pool.
    pub fn extract_blocking(&self, bytes: &[u8]) -> Result<ExtractedText, DocMetaError> {
        if bytes.is_empty() {
            return Err(DocMetaError::CorruptedContent(
                "Empty PDF content provided".into(),
            ));
        }

        let doc = self.backend.open(bytes).map_err(|e| {
            warn!("Failed to open PDF: {}", e);
            DocMetaError::CorruptedContent(e.to_string())
        })?;

        let page_count = doc.page_count();
        if page_count == 0 {
            return Err(DocMetaError::EmptyContent("PDF has no pages".into()));
        }
        debug!("Opened PDF with {} pages", page_count);

        let mut parts: Vec<String> = Vec::with_capacity(page_count * 2);
        for index in 0..page_count {
            let raw = match doc.page_text(index) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Skipping unreadable page: {}", e);
                    continue;
                }
            };
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            parts.push(format!("--- Page {} ---", index + 1));
            parts.push(trimmed.to_string());
        }

        let text = clean_text(&parts.join("\n\n"));
        if text.chars().count() < self.min_text_length {
            return Err(DocMetaError::EmptyContent(
                "PDF contains no extractable text or only minimal content".into(),
            ));
        }

        info!(
            "Extracted {} characters from {} pages",
            text.chars().count(),
            page_count
        );
        Ok(ExtractedText { text, page_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// Backend whose "PDF" is a list of page texts; `None` fails to open.
    struct FakeBackend(Option<Vec<Result<String, String>>>);

    struct FakeDoc(Vec<Result<String, String>>);

    impl PdfDocument for FakeDoc {
        fn page_count(&self) -> usize {
            self.0.len()
        }

        fn page_text(&self, index: usize) -> Result<String, PdfBackendError> {
            self.0[index].clone().map_err(|message| PdfBackendError::Page {
                page: index + 1,
                message,
            })
        }
    }

    impl PdfBackend for FakeBackend {
        fn open(&self, _bytes: &[u8]) -> Result<Box<dyn PdfDocument>, PdfBackendError> {
            match self.0 {
                Some(ref pages) => Ok(Box::new(FakeDoc(pages.clone()))),
                None => Err(PdfBackendError::Open("bad xref".into())),
            }
        }
    }

    fn extractor(pages: Option<Vec<Result<String, String>>>) -> TextExtractor {
        TextExtractor::new(Arc::new(FakeBackend(pages)), 10)
    }

    fn ok_pages(pages: &[&str]) -> Option<Vec<Result<String, String>>> {
        Some(pages.iter().map(|p| Ok(p.to_string())).collect())
    }

    #[test]
    fn empty_bytes_are_corrupted() {
        let err = extractor(ok_pages(&["whatever"])).extract_blocking(b"").unwrap_err();
        assert_eq!(
            err,
            DocMetaError::CorruptedContent("Empty PDF content provided".into())
        );
    }

    #[test]
    fn open_failure_is_corrupted() {
        let err = extractor(None).extract_blocking(b"not a pdf").unwrap_err();
        assert!(matches!(err, DocMetaError::CorruptedContent(_)), "{err:?}");
    }

    #[test]
    fn zero_pages_is_empty() {
        let err = extractor(ok_pages(&[])).extract_blocking(b"%PDF").unwrap_err();
        assert_eq!(err, DocMetaError::EmptyContent("PDF has no pages".into()));
    }

    #[test]
    fn blank_pages_are_skipped_but_keep_numbering() {
        let out = extractor(ok_pages(&["  Patient: Jane Roe  ", "   ", "Diagnosis:   influenza"]))
            .extract_blocking(b"%PDF")
            .unwrap();
        assert_eq!(
            out.text,
            "--- Page 1 ---\n\nPatient: Jane Roe\n\n--- Page 3 ---\n\nDiagnosis: influenza"
        );
        assert_eq!(out.page_count, 3);
    }

    #[test]
    fn unreadable_page_is_skipped() {
        let pages = Some(vec![
            Err("unsupported font".to_string()),
            Ok("Hemoglobin 13.2 g/dL".to_string()),
        ]);
        let out = extractor(pages).extract_blocking(b"%PDF").unwrap();
        assert_eq!(out.text, "--- Page 2 ---\n\nHemoglobin 13.2 g/dL");
    }

    #[test]
    fn scanned_pages_without_text_are_empty() {
        let err = extractor(ok_pages(&["", " \n "])).extract_blocking(b"%PDF").unwrap_err();
        assert!(matches!(err, DocMetaError::EmptyContent(_)), "{err:?}");
    }

    #[test]
    fn output_has_no_layout_noise() {
        let out = extractor(ok_pages(&["a    b\n\n\n\n\n  c  ", "d\n \n \n e"]))
            .extract_blocking(b"%PDF")
            .unwrap();
        assert!(!out.text.contains("\n\n\n"));
        assert!(!out.text.contains("  "));
        assert!(out.text.lines().all(|l| l == l.trim()));
    }

    /// Build a PDF with one Courier text line per entry; "" gives a blank page.
    fn build_pdf(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let operations = if text.is_empty() {
                vec![]
            } else {
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ]
            };
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn lopdf_extractor() -> TextExtractor {
        TextExtractor::new(Arc::new(LopdfBackend), 10)
    }

    #[tokio::test]
    async fn lopdf_reads_generated_pages() {
        let bytes = build_pdf(&["Blood pressure normal", "", "Follow up in six weeks"]);
        let out = lopdf_extractor().extract(bytes).await.unwrap();

        assert_eq!(out.page_count, 3);
        assert!(out.text.contains("--- Page 1 ---"), "{}", out.text);
        assert!(out.text.contains("Blood pressure normal"), "{}", out.text);
        assert!(!out.text.contains("--- Page 2 ---"), "{}", out.text);
        assert!(out.text.contains("--- Page 3 ---"), "{}", out.text);
        assert!(out.text.contains("Follow up in six weeks"), "{}", out.text);
    }

    #[tokio::test]
    async fn lopdf_blank_document_is_empty() {
        let err = lopdf_extractor().extract(build_pdf(&["", ""])).await.unwrap_err();
        assert!(matches!(err, DocMetaError::EmptyContent(_)), "{err:?}");
    }

    #[tokio::test]
    async fn lopdf_rejects_garbage() {
        let err = lopdf_extractor()
            .extract(b"this is not a pdf at all".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, DocMetaError::CorruptedContent(_)), "{err:?}");
    }

    #[tokio::test]
    async fn empty_bytes_skip_the_blocking_pool() {
        let err = lopdf_extractor().extract(Vec::new()).await.unwrap_err();
        assert_eq!(
            err,
            DocMetaError::CorruptedContent("Empty PDF content provided".into())
        );
    }
}
