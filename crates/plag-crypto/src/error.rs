use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Keystore error: {0}")]
    Keystore(String),

    #[error("Integrity check failed: {0}")]
    Integrity(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Invalid signature: {0}")]
    Signature(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
