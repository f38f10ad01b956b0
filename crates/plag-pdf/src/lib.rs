//! PDF handling for the plagiarism checker
//!
//! - [`TextExtractor`] reads a PDF's text and per-page word layout
//! - [`coords`] converts between top-origin word boxes and PDF user space
//! - [`render_highlights`] writes a copy of a PDF with translucent overlays

pub mod coords;
pub mod error;
pub mod extract;
pub mod layout;
pub mod overlay;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

pub use coords::{pdf_to_word_box, word_box_to_pdf, PdfRect, WordBox};
pub use error::PdfError;
pub use extract::{ExtractedDocument, TextExtractor};
pub use layout::{PageWords, Word};
pub use overlay::{apply_highlights, render_highlights, HighlightStyle, PageHighlights};
