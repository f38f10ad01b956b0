use plag_crypto::CryptoError;
use plag_pdf::PdfError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlagError {
    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("Corpus entry {path} could not be read: {reason}")]
    Corpus { path: PathBuf, reason: String },

    #[error("Scan not found: {0}")]
    ScanNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Closed classification of every failure the pipeline can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedFormat,
    Extraction,
    Keystore,
    Integrity,
    Io,
    NotFound,
    Serialization,
    Config,
}

impl ErrorKind {
    /// Failures caused by the caller's input rather than the host
    pub fn is_client_error(self) -> bool {
        matches!(
            self,
            ErrorKind::UnsupportedFormat | ErrorKind::Extraction | ErrorKind::NotFound
        )
    }
}

impl PlagError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlagError::Pdf(PdfError::UnsupportedFormat(_)) => ErrorKind::UnsupportedFormat,
            PlagError::Pdf(PdfError::Extraction { .. })
            | PlagError::Pdf(PdfError::ParseError(_))
            | PlagError::Pdf(PdfError::OperationError(_)) => ErrorKind::Extraction,
            PlagError::Pdf(PdfError::Io(_)) => ErrorKind::Io,
            PlagError::Crypto(CryptoError::Keystore(_)) => ErrorKind::Keystore,
            PlagError::Crypto(CryptoError::Integrity(_))
            | PlagError::Crypto(CryptoError::Signature(_)) => ErrorKind::Integrity,
            PlagError::Crypto(CryptoError::Encryption(_))
            | PlagError::Crypto(CryptoError::Io(_)) => ErrorKind::Io,
            PlagError::Corpus { .. } | PlagError::Io(_) => ErrorKind::Io,
            PlagError::ScanNotFound(_) => ErrorKind::NotFound,
            PlagError::Serialization(_) => ErrorKind::Serialization,
            PlagError::Config(_) => ErrorKind::Config,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.kind().is_client_error()
    }
}
