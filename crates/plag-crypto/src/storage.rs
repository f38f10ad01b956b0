//! Encrypted artifacts on disk
//!
//! Sealed files are replaced atomically, and plaintext copies only ever
//! exist as temp files owned by the caller.

use crate::envelope;
use crate::error::CryptoError;
use crate::keys::KeyManager;
use std::io::Write;
use std::path::Path;
use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, instrument};

/// Replace `path` with its envelope. Returns `false` if it was already sealed.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn encrypt_file_in_place(keys: &KeyManager, path: &Path) -> Result<bool, CryptoError> {
    let plaintext = std::fs::read(path)?;
    if envelope::is_encrypted(&plaintext) {
        debug!("already encrypted");
        return Ok(false);
    }

    let sealed = envelope::encrypt(keys.ensure_master_key()?, &plaintext)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(&sealed)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| CryptoError::Io(e.error))?;

    debug!(bytes = sealed.len(), "encrypted file in place");
    Ok(true)
}

/// Read `path` and return its plaintext, decrypting only when sealed
pub fn read_decrypted(keys: &KeyManager, path: &Path) -> Result<Vec<u8>, CryptoError> {
    let data = std::fs::read(path)?;
    if !envelope::is_encrypted(&data) {
        return Ok(data);
    }
    envelope::decrypt(keys.ensure_master_key()?, &data)
}

/// Decrypt `path` into a new `.pdf` temp file.
///
/// The returned path deletes the file when dropped; call
/// [`TempPath::keep`] to hand it off.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn decrypt_to_temp(keys: &KeyManager, path: &Path) -> Result<TempPath, CryptoError> {
    let plaintext = read_decrypted(keys, path)?;

    let mut temp = tempfile::Builder::new()
        .prefix("plag-")
        .suffix(".pdf")
        .tempfile()?;
    temp.write_all(&plaintext)?;
    temp.as_file().sync_all()?;

    Ok(temp.into_temp_path())
}

/// Decrypt `input` into `output`
pub fn decrypt_file(keys: &KeyManager, input: &Path, output: &Path) -> Result<(), CryptoError> {
    let plaintext = read_decrypted(keys, input)?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, plaintext)?;
    Ok(())
}
