//! Selecting which words to highlight
//!
//! Each page's words are normalized into a token sequence (one word may
//! yield several tokens, or none). Every n-token window found in the corpus
//! set marks all words that contributed a token to it.

use crate::error::PlagError;
use crate::similarity::{tokens, NgramSet};
use plag_pdf::{render_highlights, HighlightStyle, PageHighlights, PageWords};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Indices of the words on `page` covered by a window present in `corpus`
pub fn mark_words(page: &PageWords, corpus: &NgramSet, ngram_size: usize) -> Vec<usize> {
    let mut sequence: Vec<String> = Vec::new();
    let mut owners: Vec<usize> = Vec::new();
    for (index, word) in page.words.iter().enumerate() {
        for token in tokens(&word.text) {
            sequence.push(token);
            owners.push(index);
        }
    }

    let mut marked = BTreeSet::new();
    if ngram_size == 0 || sequence.len() < ngram_size {
        return Vec::new();
    }
    for start in 0..=sequence.len() - ngram_size {
        let gram = sequence[start..start + ngram_size].join(" ");
        if corpus.contains(&gram) {
            marked.extend(owners[start..start + ngram_size].iter().copied());
        }
    }
    marked.into_iter().collect()
}

/// Highlight boxes for every page with at least one marked word
pub fn page_highlights(
    pages: &[PageWords],
    corpus: &NgramSet,
    ngram_size: usize,
) -> Vec<PageHighlights> {
    pages
        .iter()
        .filter_map(|page| {
            let marked = mark_words(page, corpus, ngram_size);
            if marked.is_empty() {
                return None;
            }
            Some(PageHighlights {
                page_number: page.page_number,
                media_box: page.media_box,
                boxes: marked.into_iter().map(|i| page.words[i].bbox).collect(),
            })
        })
        .collect()
}

/// Renders highlighted copies of analyzed PDFs
#[derive(Debug, Clone)]
pub struct AnnotationRenderer {
    style: HighlightStyle,
    ngram_size: usize,
}

impl AnnotationRenderer {
    pub fn new(style: HighlightStyle, ngram_size: usize) -> Self {
        Self { style, ngram_size }
    }

    /// Write `source` to `output` with words matching `corpus` highlighted
    #[instrument(skip_all, fields(source = %source.display(), output = %output.display()))]
    pub fn render(
        &self,
        source: &Path,
        pages: &[PageWords],
        corpus: &NgramSet,
        output: &Path,
    ) -> Result<PathBuf, PlagError> {
        let highlights = page_highlights(pages, corpus, self.ngram_size);
        debug!(
            pages = highlights.len(),
            words = highlights.iter().map(|h| h.boxes.len()).sum::<usize>(),
            "highlighting matched words"
        );
        Ok(render_highlights(source, output, &highlights, &self.style)?)
    }
}
