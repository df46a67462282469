//! Keygen command.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use tracing::info;

use crate::cli::output;
use crate::core::cipher;
use crate::core::constants::{PUBLIC_KEY_FILE, SECRET_KEY_FILE};
use crate::core::writer;
use crate::error::{FileError, Result};

/// Generate a key pair and write it to `out_dir`.
///
/// Existing key files are never overwritten.
pub fn execute(user_id: &str, out_dir: &Path, passphrase: Option<String>) -> Result<()> {
    let public = out_dir.join(PUBLIC_KEY_FILE);
    let secret = out_dir.join(SECRET_KEY_FILE);
    for path in [&public, &secret] {
        if path.exists() {
            return Err(FileError::AlreadyExists(path.clone()).into());
        }
    }

    let passphrase = zeroize::Zeroizing::new(passphrase.unwrap_or_default());
    if passphrase.is_empty() {
        output::warn("no passphrase given; the secret key is stored unprotected");
    }

    let key = cipher::generate(user_id, &passphrase)?;
    info!(fingerprint = %key.fingerprint, "key generated");

    writer::ensure_dir(out_dir)?;
    create_new(&public, key.public_armored.as_bytes(), 0o644)?;
    create_new(&secret, key.secret_armored.as_bytes(), 0o600)?;

    output::success(&format!("generated key for {}", user_id));
    output::kv("fingerprint", &key.fingerprint);
    output::kv("public", output::path(&public));
    output::kv("secret", output::path(&secret));
    Ok(())
}

/// Create `path` holding `content`; the file is created with `mode` on unix.
fn create_new(path: &Path, content: &[u8], mode: u32) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let write_err = |source| FileError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = options.open(path).map_err(|source: io::Error| {
        if source.kind() == io::ErrorKind::AlreadyExists {
            FileError::AlreadyExists(path.to_path_buf())
        } else {
            write_err(source)
        }
    })?;
    file.write_all(content).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;
    Ok(())
}
