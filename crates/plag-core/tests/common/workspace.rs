//! Temporary corpus, key and upload directories for end-to-end tests

use plag_core::{PlagChecker, PlagConfig};
use plag_pdf::fixtures::write_text_pdf;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Cheap key derivation so keystores open quickly under test
pub const TEST_KDF_ITERATIONS: u32 = 1_000;

pub struct Workspace {
    dir: TempDir,
}

#[allow(dead_code)]
impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("corpus")).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn corpus_dir(&self) -> PathBuf {
        self.root().join("corpus")
    }

    pub fn key_dir(&self) -> PathBuf {
        self.root().join("keys")
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.root().join("uploads")
    }

    pub fn config(&self) -> PlagConfig {
        PlagConfig::default()
            .with_corpus_dir(self.corpus_dir())
            .with_key_dir(self.key_dir())
            .with_upload_dir(self.upload_dir())
            .with_keystore_password("integration")
            .with_kdf_iterations(TEST_KDF_ITERATIONS)
    }

    pub fn checker(&self) -> PlagChecker {
        PlagChecker::new(self.config())
    }

    /// Add a one-page reference document
    pub fn add_corpus(&self, name: &str, text: &str) -> PathBuf {
        let path = self.corpus_dir().join(name);
        write_text_pdf(&path, &[&[text]]).unwrap();
        path
    }

    /// Write a submission with one entry per page, each page one line per item
    pub fn submission(&self, name: &str, pages: &[&[&str]]) -> PathBuf {
        let path = self.root().join(name);
        write_text_pdf(&path, pages).unwrap();
        path
    }
}
