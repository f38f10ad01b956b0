//! Key management and at-rest encryption for the plagiarism checker
//!
//! - [`KeyManager`] owns the Ed25519 signing keystore and the master key
//! - [`envelope`] seals payloads under per-file data keys
//! - [`storage`] applies envelopes to files on disk

pub mod envelope;
pub mod error;
pub mod keys;
pub mod secret_file;
pub mod storage;

pub use error::CryptoError;
pub use keys::{
    sha256, sha256_hex, verify_detached, KeyManager, KeystoreConfig, KeystoreIdentity,
    MasterKey, SigningIdentity, DEFAULT_KDF_ITERATIONS, DEV_PASSWORD,
};
pub use storage::{decrypt_file, decrypt_to_temp, encrypt_file_in_place, read_decrypted};
