//! PDF text extraction
//!
//! A single pdf-extract pass over the document yields both the plain text
//! used for similarity scoring and the per-page word layout used for
//! highlighting. pdf-extract panics on some malformed inputs, so every pass
//! runs behind `catch_unwind` and a panic surfaces as an extraction error.
//!
//! # Example
//! ```no_run
//! use plag_pdf::{PdfError, TextExtractor};
//!
//! fn word_total(path: &std::path::Path) -> Result<usize, PdfError> {
//!     let document = TextExtractor::extract(path)?;
//!     Ok(document.pages.iter().map(|p| p.words.len()).sum())
//! }
//! ```

use crate::error::PdfError;
use crate::layout::{LayoutCollector, PageWords};
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Text and word layout of one PDF
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub path: PathBuf,
    /// Page texts joined with `\n`
    pub extracted_text: String,
    pub pages: Vec<PageWords>,
}

impl ExtractedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_words(&self) -> &[PageWords] {
        &self.pages
    }
}

/// Main extraction interface
pub struct TextExtractor;

impl TextExtractor {
    /// Reject anything whose extension is not `.pdf` (case-insensitive)
    pub fn ensure_pdf(path: &Path) -> Result<(), PdfError> {
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            Ok(())
        } else {
            Err(PdfError::UnsupportedFormat(path.to_path_buf()))
        }
    }

    /// Extract text and word layout from a PDF on disk
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn extract(path: &Path) -> Result<ExtractedDocument, PdfError> {
        Self::ensure_pdf(path)?;
        let bytes = std::fs::read(path).map_err(|e| PdfError::extraction(path, e))?;
        let pages = Self::layout_from_mem(path, &bytes)?;

        let extracted_text = pages
            .iter()
            .map(PageWords::text)
            .collect::<Vec<_>>()
            .join("\n");

        debug!(
            pages = pages.len(),
            chars = extracted_text.len(),
            "extracted PDF text"
        );

        Ok(ExtractedDocument {
            path: path.to_path_buf(),
            extracted_text,
            pages,
        })
    }

    /// Plain text only
    pub fn extract_text(path: &Path) -> Result<String, PdfError> {
        Ok(Self::extract(path)?.extracted_text)
    }

    /// Per-page word layout only.
    ///
    /// Runs a full extraction and returns every page at once. Callers that
    /// also need the text should use [`extract`](Self::extract) and read
    /// [`ExtractedDocument::page_words`] instead of extracting twice.
    pub fn extract_page_words(path: &Path) -> Result<Vec<PageWords>, PdfError> {
        Ok(Self::extract(path)?.pages)
    }

    fn layout_from_mem(path: &Path, bytes: &[u8]) -> Result<Vec<PageWords>, PdfError> {
        // pdf-extract re-exports Document from lopdf
        let doc = pdf_extract::Document::load_mem(bytes).map_err(|e| {
            PdfError::extraction(path, format!("failed to load PDF: {}", e))
        })?;

        if doc.is_encrypted() {
            return Err(PdfError::extraction(path, "PDF is password-protected"));
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let mut collector = LayoutCollector::new();
            pdf_extract::output_doc(&doc, &mut collector).map(|()| collector.into_pages())
        }));

        match outcome {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => Err(PdfError::extraction(path, format!("{:?}", e))),
            Err(_) => Err(PdfError::extraction(
                path,
                "text engine aborted on malformed content",
            )),
        }
    }
}
