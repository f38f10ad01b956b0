//! Reference corpus snapshots
//!
//! A snapshot lists the corpus directory once, keeping `.pdf` files sorted
//! by path, so one analysis never observes files appearing mid-run.

use crate::error::PlagError;
use crate::similarity::NgramSet;
use plag_pdf::TextExtractor;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// N-grams of one reference document
#[derive(Debug, Clone)]
pub struct CorpusDocument {
    pub path: PathBuf,
    pub ngrams: NgramSet,
}

/// Sorted listing of the corpus PDFs taken at one point in time
#[derive(Debug, Clone)]
pub struct CorpusSnapshot {
    dir: PathBuf,
    files: Vec<PathBuf>,
}

impl CorpusSnapshot {
    /// List `dir`. A missing directory is an empty corpus.
    pub fn take(dir: &Path) -> Result<Self, PlagError> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "corpus directory missing, treating as empty");
                return Ok(Self {
                    dir: dir.to_path_buf(),
                    files: Vec::new(),
                });
            }
            Err(e) => {
                return Err(PlagError::Corpus {
                    path: dir.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PlagError::Corpus {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })?;
            let path = entry.path();
            if path.is_file() && TextExtractor::ensure_pdf(&path).is_ok() {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            debug!(dir = %dir.display(), "corpus is empty");
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            files,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Extract each listed document in path order.
    ///
    /// Files removed since the listing are skipped with a warning; any other
    /// failure is returned for that entry.
    pub fn documents(
        &self,
        ngram_size: usize,
    ) -> impl Iterator<Item = Result<CorpusDocument, PlagError>> + '_ {
        self.files.iter().filter_map(move |path| {
            if let Err(e) = std::fs::metadata(path) {
                if e.kind() == ErrorKind::NotFound {
                    warn!(path = %path.display(), "corpus file vanished, skipping");
                    return None;
                }
            }

            Some(
                TextExtractor::extract_text(path)
                    .map(|text| CorpusDocument {
                        path: path.clone(),
                        ngrams: NgramSet::from_text(&text, ngram_size),
                    })
                    .map_err(|e| PlagError::Corpus {
                        path: path.clone(),
                        reason: e.to_string(),
                    }),
            )
        })
    }

    /// Union of every document's n-grams
    pub fn ngram_union(&self, ngram_size: usize) -> Result<NgramSet, PlagError> {
        let mut union = NgramSet::new();
        for document in self.documents(ngram_size) {
            union.extend(document?.ngrams);
        }
        Ok(union)
    }
}
