//! Owner-only secret files created at most once
//!
//! A secret is first written in full to a private temp file in the target
//! directory and then linked into place with a create-new-or-fail rename.
//! When two processes race, the loser drops its own secret and reads the
//! winner's, so every caller ends up with the same bytes.

use crate::error::CryptoError;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Read the secret at `path`, creating it with `create` when it does not exist
pub fn read_or_create<F>(path: &Path, create: F) -> Result<Vec<u8>, CryptoError>
where
    F: FnOnce() -> Result<Vec<u8>, CryptoError>,
{
    match std::fs::read(path) {
        Ok(bytes) => {
            debug!(path = %path.display(), "loaded existing secret");
            return Ok(bytes);
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let secret = create()?;
    let mut staged = NamedTempFile::new_in(dir)?;
    restrict_permissions(staged.as_file())?;
    staged.write_all(&secret)?;
    staged.as_file().sync_all()?;

    match staged.persist_noclobber(path) {
        Ok(_) => {
            info!(path = %path.display(), "created new secret");
            Ok(secret)
        }
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "lost creation race, reading winner");
            drop(secret);
            Ok(std::fs::read(path)?)
        }
        Err(e) => Err(e.error.into()),
    }
}

#[cfg(unix)]
fn restrict_permissions(file: &std::fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &std::fs::File) -> std::io::Result<()> {
    Ok(())
}
