//! End-to-end entry points
//!
//! [`PlagChecker`] owns one configuration and one key manager so a host can
//! reuse the loaded keystore across calls. The free functions build a
//! checker per call for one-shot use.

use crate::analyzer::{Analysis, AnalysisOptions, Analyzer};
use crate::annotate::AnnotationRenderer;
use crate::config::PlagConfig;
use crate::corpus::CorpusSnapshot;
use crate::error::PlagError;
use crate::report::{Report, SignedReport};
use crate::signer::ReportSigner;
use plag_crypto::KeyManager;
use plag_pdf::TextExtractor;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Analyzer, annotator and signer bound to one configuration
#[derive(Debug)]
pub struct PlagChecker {
    config: PlagConfig,
    keys: KeyManager,
}

impl PlagChecker {
    pub fn new(config: PlagConfig) -> Self {
        let keys = KeyManager::new(config.keystore());
        Self { config, keys }
    }

    pub fn config(&self) -> &PlagConfig {
        &self.config
    }

    pub fn keys(&self) -> &KeyManager {
        &self.keys
    }

    fn options(&self) -> AnalysisOptions {
        AnalysisOptions {
            ngram_size: self.config.ngram_size,
            top_matches: self.config.top_matches,
        }
    }

    fn renderer(&self) -> AnnotationRenderer {
        AnnotationRenderer::new(self.config.highlight, self.config.ngram_size)
    }

    /// Analyze `file` against a fresh snapshot of the corpus
    pub fn analyze(&self, file: &Path) -> Result<Analysis, PlagError> {
        let corpus = CorpusSnapshot::take(&self.config.corpus_dir)?;
        Analyzer::new(self.options()).analyze(file, &corpus)
    }

    /// Analyze, optionally annotate, then sign.
    ///
    /// The signing identity is loaded before anything is written, so a
    /// keystore failure leaves neither a report nor an annotated file.
    #[instrument(skip_all, fields(file = %file.display()))]
    pub fn analyze_and_sign(
        &self,
        file: &Path,
        annotated_output: Option<&Path>,
    ) -> Result<SignedReport, PlagError> {
        let analysis = self.analyze(file)?;
        let identity = self.keys.identity()?;

        if let Some(output) = annotated_output {
            self.renderer().render(
                file,
                analysis.document.page_words(),
                &analysis.overlap,
                output,
            )?;
        }

        let signed = ReportSigner::new(identity).sign(analysis.report)?;
        info!(matches = signed.report.matches.len(), "report signed");
        Ok(signed)
    }

    /// Write a copy of `file` with words matching any corpus document highlighted
    #[instrument(skip_all, fields(file = %file.display()))]
    pub fn annotate(&self, file: &Path, output: &Path) -> Result<PathBuf, PlagError> {
        let pages = TextExtractor::extract_page_words(file)?;
        let corpus = CorpusSnapshot::take(&self.config.corpus_dir)?;
        let union = corpus.ngram_union(self.config.ngram_size)?;
        self.renderer().render(file, &pages, &union, output)
    }
}

/// Analyze `file` against the PDFs in `corpus_dir`
pub fn analyze_file(
    file: &Path,
    corpus_dir: &Path,
    options: &AnalysisOptions,
) -> Result<Report, PlagError> {
    let corpus = CorpusSnapshot::take(corpus_dir)?;
    Ok(Analyzer::new(*options).analyze(file, &corpus)?.report)
}

/// Analyze and sign with keys from `key_dir`, other settings from the environment
pub fn analyze_and_sign(
    file: &Path,
    corpus_dir: &Path,
    key_dir: &Path,
    annotated_output: Option<&Path>,
) -> Result<SignedReport, PlagError> {
    let config = PlagConfig::from_env()?
        .with_corpus_dir(corpus_dir)
        .with_key_dir(key_dir);
    PlagChecker::new(config).analyze_and_sign(file, annotated_output)
}

/// Highlight the words of `file` that appear in any document of `corpus_dir`
pub fn annotate_pdf(file: &Path, corpus_dir: &Path, output: &Path) -> Result<PathBuf, PlagError> {
    let config = PlagConfig::from_env()?.with_corpus_dir(corpus_dir);
    PlagChecker::new(config).annotate(file, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::signer::verify_report;
    use plag_pdf::fixtures::write_text_pdf;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    struct Workspace {
        dir: TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            std::fs::create_dir(dir.path().join("corpus")).unwrap();
            Self { dir }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn checker(&self) -> PlagChecker {
            PlagChecker::new(
                PlagConfig::default()
                    .with_corpus_dir(self.path("corpus"))
                    .with_key_dir(self.path("keys"))
                    .with_keystore_password("test")
                    .with_kdf_iterations(1_000),
            )
        }
    }

    #[test]
    fn test_analyze_and_sign_verifies() {
        let ws = Workspace::new();
        write_text_pdf(
            &ws.path("corpus/source.pdf"),
            &[&["This is a sample document used for comparison."]],
        )
        .unwrap();
        let target = ws.path("target.pdf");
        write_text_pdf(
            &target,
            &[&["This is a sample document used for comparison and testing."]],
        )
        .unwrap();

        let signed = ws.checker().analyze_and_sign(&target, None).unwrap();
        assert_eq!(signed.report.matches.len(), 1);
        assert!(signed.report.matches[0].score > 0.0);
        assert!(signed.report.matching_sentences >= 1);
        verify_report(&signed).unwrap();
    }

    #[test]
    fn test_annotated_output_is_written() {
        let ws = Workspace::new();
        write_text_pdf(&ws.path("corpus/a.pdf"), &[&["the quick brown fox"]]).unwrap();
        let target = ws.path("target.pdf");
        write_text_pdf(&target, &[&["see the quick brown fox run"]]).unwrap();

        let output = ws.path("out/annotated.pdf");
        ws.checker()
            .analyze_and_sign(&target, Some(&output))
            .unwrap();
        assert!(output.exists());
        assert!(std::fs::read(&output).unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn test_keystore_failure_writes_nothing() {
        let ws = Workspace::new();
        let target = ws.path("target.pdf");
        write_text_pdf(&target, &[&["some words for the target"]]).unwrap();
        // A file where the key directory should be
        std::fs::write(ws.path("keys"), b"not a directory").unwrap();

        let output = ws.path("annotated.pdf");
        let err = ws
            .checker()
            .analyze_and_sign(&target, Some(&output))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Keystore);
        assert!(!err.is_client_error());
        assert!(!output.exists());
    }

    #[test]
    fn test_unsupported_input() {
        let ws = Workspace::new();
        let notes = ws.path("notes.txt");
        std::fs::write(&notes, "plain text").unwrap();

        let err = ws.checker().analyze(&notes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_analyze_file_with_missing_corpus() {
        let ws = Workspace::new();
        let target = ws.path("target.pdf");
        write_text_pdf(&target, &[&["lonely words on a page"]]).unwrap();

        let report =
            analyze_file(&target, &ws.path("absent"), &AnalysisOptions::default()).unwrap();
        assert!(report.matches.is_empty());
        assert_eq!(report.similarity_percent, 0.0);
    }

    #[test]
    fn test_annotate_uses_corpus_union() {
        let ws = Workspace::new();
        write_text_pdf(&ws.path("corpus/a.pdf"), &[&["alpha beta gamma"]]).unwrap();
        write_text_pdf(&ws.path("corpus/b.pdf"), &[&["delta epsilon zeta"]]).unwrap();
        let target = ws.path("target.pdf");
        write_text_pdf(
            &target,
            &[&["alpha beta gamma"], &["delta epsilon zeta"]],
        )
        .unwrap();

        let output = ws.path("annotated.pdf");
        let written = ws.checker().annotate(&target, &output).unwrap();
        assert_eq!(written, output);

        // Both pages gain an overlay stream
        let doc = lopdf::Document::load(&output).unwrap();
        for (_, page_id) in doc.get_pages() {
            let contents = doc.get_page_contents(page_id);
            assert_eq!(contents.len(), 3);
        }
    }
}
