//! Zip command.

use std::path::Path;

use crate::cli::output;
use crate::core::archive;
use crate::error::Result;

/// Archive `files` from `dir` into `dir/name`.
pub fn execute(dir: &Path, name: &str, files: &[String], password: Option<String>) -> Result<()> {
    let password = password.map(zeroize::Zeroizing::new);

    let path = match &password {
        Some(password) => archive::write_encrypted_zip(dir, name, files, password)?,
        None => archive::write_zip(dir, name, files)?,
    };

    let kind = if password.is_some() { "encrypted archive" } else { "archive" };
    output::success(&format!(
        "wrote {} {} ({} files)",
        kind,
        output::path(&path),
        files.len()
    ));
    Ok(())
}
