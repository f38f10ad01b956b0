//! Corpus comparison and report assembly

use crate::corpus::{CorpusDocument, CorpusSnapshot};
use crate::error::PlagError;
use crate::report::{MatchResult, Report};
use crate::similarity::{jaccard, round_to, split_sentences, tokens, NgramSet};
use plag_crypto::sha256_hex;
use plag_pdf::{ExtractedDocument, TextExtractor};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, instrument};

/// Knobs for one analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub ngram_size: usize,
    pub top_matches: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            ngram_size: crate::config::DEFAULT_NGRAM_SIZE,
            top_matches: crate::config::DEFAULT_TOP_MATCHES,
        }
    }
}

/// A report plus the intermediate data annotation reuses
#[derive(Debug, Clone)]
pub struct Analysis {
    pub report: Report,
    pub document: ExtractedDocument,
    /// Union of the document's overlaps with every corpus document
    pub overlap: NgramSet,
}

/// Running comparison of one document against corpus documents
#[derive(Debug)]
pub struct CorpusComparison<'a> {
    grams: &'a NgramSet,
    scored: Vec<(String, f64)>,
    overlap: NgramSet,
}

impl<'a> CorpusComparison<'a> {
    pub fn new(grams: &'a NgramSet) -> Self {
        Self {
            grams,
            scored: Vec::new(),
            overlap: NgramSet::new(),
        }
    }

    pub fn add(&mut self, document: &CorpusDocument) {
        self.add_ngrams(&document.path.to_string_lossy(), &document.ngrams);
    }

    pub fn add_ngrams(&mut self, corpus_path: &str, corpus_grams: &NgramSet) {
        self.overlap.extend(self.grams.intersection(corpus_grams));
        let score = jaccard(self.grams, corpus_grams);
        if score > 0.0 {
            self.scored.push((corpus_path.to_string(), score));
        }
    }

    pub fn overlap(&self) -> &NgramSet {
        &self.overlap
    }

    /// Matches ordered by rounded score descending, ties by path ascending
    pub fn ranked_matches(&self) -> Vec<MatchResult> {
        let mut matches: Vec<MatchResult> = self
            .scored
            .iter()
            .map(|(path, score)| MatchResult {
                corpus_path: path.clone(),
                score: round_to(*score, 4),
            })
            .collect();
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.corpus_path.cmp(&b.corpus_path))
        });
        matches
    }

    pub fn into_overlap(self) -> NgramSet {
        self.overlap
    }
}

/// Assemble a report from already-compared text
pub fn build_report(
    file: &str,
    text: &str,
    grams: &NgramSet,
    comparison: &CorpusComparison<'_>,
    options: &AnalysisOptions,
) -> Report {
    let words = tokens(text);
    let unique: BTreeSet<&str> = words.iter().map(String::as_str).collect();

    let mut matches = comparison.ranked_matches();
    let similarity_percent = matches
        .first()
        .map(|m| round_to(m.score * 100.0, 2))
        .unwrap_or(0.0);
    matches.truncate(options.top_matches);

    let overlap = comparison.overlap();
    let plagiarism_percentage = if grams.is_empty() {
        0.0
    } else {
        round_to(overlap.len() as f64 / grams.len() as f64 * 100.0, 2)
    };

    let sentences = split_sentences(text);
    let matching_sentences = sentences
        .iter()
        .filter(|sentence| {
            let sentence_grams = NgramSet::from_text(sentence, options.ngram_size);
            !sentence_grams.is_empty() && sentence_grams.intersects(overlap)
        })
        .count();
    let total_sentences = sentences.len();

    Report {
        file: file.to_string(),
        sha256: sha256_hex(text.as_bytes()),
        word_count: words.len(),
        unique_words: unique.len(),
        matches,
        similarity_percent,
        matching_ngram_count: overlap.len(),
        plagiarism_percentage,
        total_sentences,
        matching_sentences,
        non_matching_sentences: total_sentences.saturating_sub(matching_sentences),
    }
}

/// Similarity analysis of PDFs against a corpus
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    options: AnalysisOptions,
}

impl Analyzer {
    pub fn new(options: AnalysisOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Extract `file` and compare it with every document in `corpus`
    #[instrument(skip_all, fields(file = %file.display(), corpus = corpus.len()))]
    pub fn analyze(&self, file: &Path, corpus: &CorpusSnapshot) -> Result<Analysis, PlagError> {
        let document = TextExtractor::extract(file)?;
        let grams = NgramSet::from_text(&document.extracted_text, self.options.ngram_size);

        let mut comparison = CorpusComparison::new(&grams);
        for corpus_document in corpus.documents(self.options.ngram_size) {
            comparison.add(&corpus_document?);
        }

        let report = build_report(
            &file.to_string_lossy(),
            &document.extracted_text,
            &grams,
            &comparison,
            &self.options,
        );
        info!(
            matches = report.matches.len(),
            similarity = report.similarity_percent,
            plagiarism = report.plagiarism_percentage,
            "analysis complete"
        );

        Ok(Analysis {
            report,
            document,
            overlap: comparison.into_overlap(),
        })
    }
}
