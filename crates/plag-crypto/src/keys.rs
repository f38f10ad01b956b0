//! Persistent signing identity and master key
//!
//! [`KeyManager`] owns two lazily created secrets in its key directory:
//!
//! - `signing_key.pem`: an Ed25519 private key in a PKCS#8
//!   EncryptedPrivateKeyInfo container (PBES2, PBKDF2-SHA256, AES-256-CBC)
//! - `master.key`: 32 raw bytes wrapping per-file data keys
//!
//! Both are created once and reused forever. Within a process the first
//! caller initializes each secret while concurrent callers wait; across
//! processes creation goes through [`crate::secret_file`].

use crate::error::CryptoError;
use crate::secret_file;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use once_cell::sync::OnceCell;
use pkcs8::pkcs5::pbes2;
use pkcs8::{
    DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding,
    PrivateKeyInfo,
};
use rand_core::{OsRng, RngCore};
use secrecy::{ExposeSecret, Secret, SecretString};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name of the encrypted signing key inside the key directory
pub const KEYSTORE_FILE: &str = "signing_key.pem";
/// File name of the master key inside the key directory
pub const MASTER_KEY_FILE: &str = "master.key";
/// Master key length in bytes
pub const MASTER_KEY_LEN: usize = 32;
/// PBKDF2 rounds protecting the keystore unless configured otherwise
pub const DEFAULT_KDF_ITERATIONS: u32 = 210_000;
/// Keystore password used when none is configured
pub const DEV_PASSWORD: &str = "plag-checker-dev";

const PEM_LABEL: &str = "ENCRYPTED PRIVATE KEY";

/// Trait for any identity that can sign reports
pub trait SigningIdentity {
    /// Public key as PEM-encoded SubjectPublicKeyInfo
    fn public_key_pem(&self) -> &str;

    /// Sign raw data and return the 64 signature bytes
    fn sign(&self, data: &[u8]) -> Vec<u8>;

    /// Sign and return lower-case hex
    fn sign_hex(&self, data: &[u8]) -> String {
        hex::encode(self.sign(data))
    }

    /// Verify a signature made by this identity
    fn verify(&self, data: &[u8], signature: &[u8]) -> bool;
}

/// Where the keystore lives and how it is protected
#[derive(Clone)]
pub struct KeystoreConfig {
    pub key_dir: PathBuf,
    /// `None` falls back to [`DEV_PASSWORD`] with a warning on first use
    pub password: Option<SecretString>,
    pub kdf_iterations: u32,
}

impl KeystoreConfig {
    pub fn new(key_dir: impl Into<PathBuf>) -> Self {
        Self {
            key_dir: key_dir.into(),
            password: None,
            kdf_iterations: DEFAULT_KDF_ITERATIONS,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::new(password.into()));
        self
    }

    pub fn with_kdf_iterations(mut self, iterations: u32) -> Self {
        self.kdf_iterations = iterations.max(1);
        self
    }

    pub fn keystore_path(&self) -> PathBuf {
        self.key_dir.join(KEYSTORE_FILE)
    }

    pub fn master_key_path(&self) -> PathBuf {
        self.key_dir.join(MASTER_KEY_FILE)
    }

    fn resolve_password(&self) -> SecretString {
        match &self.password {
            Some(password) => password.clone(),
            None => {
                warn!("PLAG_KEYSTORE_PASSWORD not set, using the development keystore password");
                SecretString::new(DEV_PASSWORD.to_string())
            }
        }
    }
}

impl fmt::Debug for KeystoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeystoreConfig")
            .field("key_dir", &self.key_dir)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("kdf_iterations", &self.kdf_iterations)
            .finish()
    }
}

/// The signing identity loaded from the keystore
pub struct KeystoreIdentity {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    public_key_pem: String,
}

impl KeystoreIdentity {
    fn from_signing_key(signing_key: SigningKey) -> Result<Self, CryptoError> {
        let verifying_key = signing_key.verifying_key();
        let public_key_pem = verifying_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::Keystore(format!("cannot encode public key: {}", e)))?;
        Ok(Self {
            signing_key,
            verifying_key,
            public_key_pem,
        })
    }

    /// Decrypt an existing keystore container
    fn open(pem: &str, password: &SecretString) -> Result<Self, CryptoError> {
        let signing_key = SigningKey::from_pkcs8_encrypted_pem(pem, password.expose_secret())
            .map_err(|e| {
                CryptoError::Keystore(format!(
                    "keystore is unreadable with the configured password: {}",
                    e
                ))
            })?;
        Self::from_signing_key(signing_key)
    }

    /// Generate a fresh key and its encrypted container
    fn generate(password: &SecretString, iterations: u32) -> Result<(Self, Vec<u8>), CryptoError> {
        let signing_key = SigningKey::generate(&mut OsRng);

        let der = signing_key
            .to_pkcs8_der()
            .map_err(|e| CryptoError::Keystore(format!("cannot encode private key: {}", e)))?;
        let info = PrivateKeyInfo::try_from(der.as_bytes())
            .map_err(|e| CryptoError::Keystore(format!("cannot encode private key: {}", e)))?;

        let mut salt = [0u8; 16];
        let mut iv = [0u8; 16];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut iv);
        let params = pbes2::Parameters::pbkdf2_sha256_aes256cbc(iterations, &salt, &iv)
            .map_err(|e| CryptoError::Keystore(format!("invalid KDF parameters: {}", e)))?;

        let encrypted = info
            .encrypt_with_params(params, password.expose_secret().as_bytes())
            .map_err(|e| CryptoError::Keystore(format!("cannot encrypt keystore: {}", e)))?;
        let pem = encrypted
            .to_pem(PEM_LABEL, LineEnding::LF)
            .map_err(|e| CryptoError::Keystore(format!("cannot encode keystore: {}", e)))?;

        let identity = Self::from_signing_key(signing_key)?;
        Ok((identity, pem.as_bytes().to_vec()))
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }
}

impl SigningIdentity for KeystoreIdentity {
    fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(data);
        signature.to_bytes().to_vec()
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        match Signature::from_slice(signature) {
            Ok(sig) => self.verifying_key.verify(data, &sig).is_ok(),
            Err(_) => false,
        }
    }
}

impl fmt::Debug for KeystoreIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeystoreIdentity")
            .field("public_key_pem", &self.public_key_pem)
            .finish_non_exhaustive()
    }
}

/// 256-bit key that wraps per-file data keys
pub struct MasterKey {
    key: Secret<[u8; MASTER_KEY_LEN]>,
}

impl MasterKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; MASTER_KEY_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::Keystore(format!(
                "master key must be {} bytes, found {}",
                MASTER_KEY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self {
            key: Secret::new(key),
        })
    }

    pub fn generate() -> Self {
        let mut key = [0u8; MASTER_KEY_LEN];
        OsRng.fill_bytes(&mut key);
        Self {
            key: Secret::new(key),
        }
    }

    pub(crate) fn expose(&self) -> &[u8; MASTER_KEY_LEN] {
        self.key.expose_secret()
    }

    /// SHA-256 of the key, for comparing keys without revealing them
    pub fn fingerprint(&self) -> String {
        sha256_hex(self.key.expose_secret())
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// Owner of the keystore and master key for one key directory
#[derive(Debug)]
pub struct KeyManager {
    config: KeystoreConfig,
    identity: OnceCell<KeystoreIdentity>,
    master_key: OnceCell<MasterKey>,
}

impl KeyManager {
    pub fn new(config: KeystoreConfig) -> Self {
        Self {
            config,
            identity: OnceCell::new(),
            master_key: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &KeystoreConfig {
        &self.config
    }

    pub fn key_dir(&self) -> &Path {
        &self.config.key_dir
    }

    /// Load the signing identity, generating and persisting it on first use
    pub fn identity(&self) -> Result<&KeystoreIdentity, CryptoError> {
        self.identity.get_or_try_init(|| {
            let path = self.config.keystore_path();
            let password = self.config.resolve_password();

            let mut generated = None;
            let stored = secret_file::read_or_create(&path, || {
                let (identity, container) =
                    KeystoreIdentity::generate(&password, self.config.kdf_iterations)?;
                generated = Some((identity, container.clone()));
                Ok(container)
            })
            .map_err(|e| unavailable(&path, e))?;

            // Another process may have won the creation race with its own key
            let identity = match generated {
                Some((identity, container)) if container == stored => identity,
                _ => {
                    let pem = std::str::from_utf8(&stored).map_err(|_| {
                        CryptoError::Keystore("keystore is not PEM text".to_string())
                    })?;
                    KeystoreIdentity::open(pem, &password)?
                }
            };

            debug!(path = %path.display(), "signing identity ready");
            Ok(identity)
        })
    }

    /// Path of the keystore and the public key PEM, creating the key if needed
    pub fn ensure_keypair(&self) -> Result<(PathBuf, String), CryptoError> {
        let identity = self.identity()?;
        Ok((
            self.config.keystore_path(),
            identity.public_key_pem().to_string(),
        ))
    }

    /// Load the master key, generating and persisting it on first use
    pub fn ensure_master_key(&self) -> Result<&MasterKey, CryptoError> {
        self.master_key.get_or_try_init(|| {
            let path = self.config.master_key_path();
            let bytes = secret_file::read_or_create(&path, || {
                Ok(MasterKey::generate().expose().to_vec())
            })
            .map_err(|e| unavailable(&path, e))?;
            MasterKey::from_bytes(&bytes)
        })
    }
}

/// Key material that cannot be read or created is a keystore failure
fn unavailable(path: &Path, error: CryptoError) -> CryptoError {
    match error {
        CryptoError::Io(e) => CryptoError::Keystore(format!(
            "cannot open or create {}: {}",
            path.display(),
            e
        )),
        other => other,
    }
}

/// Verify a detached signature against a PEM-encoded public key
pub fn verify_detached(
    public_key_pem: &str,
    data: &[u8],
    signature: &[u8],
) -> Result<(), CryptoError> {
    let verifying_key = VerifyingKey::from_public_key_pem(public_key_pem)
        .map_err(|e| CryptoError::Signature(format!("invalid public key: {}", e)))?;
    let signature = Signature::from_slice(signature)
        .map_err(|e| CryptoError::Signature(format!("malformed signature: {}", e)))?;
    verifying_key
        .verify(data, &signature)
        .map_err(|_| CryptoError::Signature("signature does not match data".to_string()))
}

/// Hash data using SHA-256
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash data and return as hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}
