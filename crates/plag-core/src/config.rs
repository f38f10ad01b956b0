//! Runtime configuration
//!
//! Every setting has a default, can be read from the environment with
//! [`PlagConfig::from_env`], and can be overridden with the `with_*` builders.

use crate::error::PlagError;
use plag_crypto::{KeystoreConfig, DEFAULT_KDF_ITERATIONS};
use plag_pdf::HighlightStyle;
use secrecy::SecretString;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_NGRAM_SIZE: usize = 3;
pub const DEFAULT_TOP_MATCHES: usize = 10;

/// Configuration for the checker
#[derive(Clone)]
pub struct PlagConfig {
    /// Directory of reference PDFs
    pub corpus_dir: PathBuf,
    /// Directory holding `signing_key.pem` and `master.key`
    pub key_dir: PathBuf,
    /// Directory holding scan artifacts
    pub upload_dir: PathBuf,
    pub ngram_size: usize,
    pub top_matches: usize,
    pub keystore_password: Option<SecretString>,
    pub kdf_iterations: u32,
    pub highlight: HighlightStyle,
}

impl Default for PlagConfig {
    fn default() -> Self {
        Self {
            corpus_dir: PathBuf::from("corpus"),
            key_dir: PathBuf::from("keys"),
            upload_dir: PathBuf::from("uploads"),
            ngram_size: DEFAULT_NGRAM_SIZE,
            top_matches: DEFAULT_TOP_MATCHES,
            keystore_password: None,
            kdf_iterations: DEFAULT_KDF_ITERATIONS,
            highlight: HighlightStyle::default(),
        }
    }
}

impl PlagConfig {
    /// Load configuration from environment variables
    ///
    /// Expected variables (all optional):
    /// - PLAG_CORPUS_DIR: reference PDF directory (default: "corpus")
    /// - PLAG_KEY_DIR: key directory (default: "keys")
    /// - PLAG_UPLOAD_DIR: scan artifact directory (default: "uploads")
    /// - PLAG_NGRAM_SIZE: tokens per n-gram (default: 3)
    /// - PLAG_TOP_MATCHES: matches kept in a report (default: 10)
    /// - PLAG_KEYSTORE_PASSWORD: keystore password (default: development password)
    /// - PLAG_KDF_ITERATIONS: PBKDF2 rounds for new keystores (default: 210000)
    pub fn from_env() -> Result<Self, PlagError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PlagError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            corpus_dir: var("PLAG_CORPUS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.corpus_dir),
            key_dir: var("PLAG_KEY_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.key_dir),
            upload_dir: var("PLAG_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            ngram_size: parse_positive(var("PLAG_NGRAM_SIZE"), "PLAG_NGRAM_SIZE")?
                .unwrap_or(defaults.ngram_size),
            top_matches: parse_positive(var("PLAG_TOP_MATCHES"), "PLAG_TOP_MATCHES")?
                .unwrap_or(defaults.top_matches),
            keystore_password: var("PLAG_KEYSTORE_PASSWORD").map(SecretString::new),
            kdf_iterations: parse_positive(var("PLAG_KDF_ITERATIONS"), "PLAG_KDF_ITERATIONS")?
                .unwrap_or(defaults.kdf_iterations),
            highlight: defaults.highlight,
        })
    }

    pub fn with_corpus_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.corpus_dir = dir.into();
        self
    }

    pub fn with_key_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.key_dir = dir.into();
        self
    }

    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    pub fn with_ngram_size(mut self, n: usize) -> Self {
        self.ngram_size = n.max(1);
        self
    }

    pub fn with_top_matches(mut self, top: usize) -> Self {
        self.top_matches = top;
        self
    }

    pub fn with_keystore_password(mut self, password: impl Into<String>) -> Self {
        self.keystore_password = Some(SecretString::new(password.into()));
        self
    }

    pub fn with_kdf_iterations(mut self, iterations: u32) -> Self {
        self.kdf_iterations = iterations.max(1);
        self
    }

    /// Keystore settings derived from this configuration
    pub fn keystore(&self) -> KeystoreConfig {
        KeystoreConfig {
            key_dir: self.key_dir.clone(),
            password: self.keystore_password.clone(),
            kdf_iterations: self.kdf_iterations,
        }
    }
}

impl fmt::Debug for PlagConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlagConfig")
            .field("corpus_dir", &self.corpus_dir)
            .field("key_dir", &self.key_dir)
            .field("upload_dir", &self.upload_dir)
            .field("ngram_size", &self.ngram_size)
            .field("top_matches", &self.top_matches)
            .field(
                "keystore_password",
                &self.keystore_password.as_ref().map(|_| "[REDACTED]"),
            )
            .field("kdf_iterations", &self.kdf_iterations)
            .field("highlight", &self.highlight)
            .finish()
    }
}

fn parse_positive<T>(value: Option<String>, key: &str) -> Result<Option<T>, PlagError>
where
    T: FromStr + PartialOrd + Default,
{
    let Some(raw) = value else {
        return Ok(None);
    };
    match raw.trim().parse::<T>() {
        Ok(parsed) if parsed > T::default() => Ok(Some(parsed)),
        _ => Err(PlagError::Config(format!(
            "{} must be a positive integer, got {:?}",
            key, raw
        ))),
    }
}
