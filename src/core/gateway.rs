//! File-level OpenPGP operations.
//!
//! Each call reads its key file, does one encryption or decryption, writes
//! the output file and drops every key before returning.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::cipher::{
    self, Cipher, Decrypted, KeyRing, OutputMode, Pgp, Profile, PublicKey, SecretKey,
    SignatureStatus,
};
use crate::error::{FileError, Result};

/// Secret key and passphrase used to sign while encrypting.
#[derive(Debug, Clone, Copy)]
pub struct SignWith<'a> {
    pub key_path: &'a Path,
    pub passphrase: &'a str,
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    let data = fs::read(path).map_err(|source| FileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(data)
}

fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        crate::core::writer::ensure_dir(parent)?;
    }
    fs::write(path, data).map_err(|source| FileError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn load_verifiers(paths: &[PathBuf]) -> Result<Vec<PublicKey>> {
    paths.iter().map(cipher::load_public_key).collect()
}

/// Encrypt `input` to the key in `public_key` and write the result to `output`.
///
/// The output is ASCII-armored unless the profile turns armor off.
///
/// # Errors
///
/// Fails if the key file is unreadable or unparsable, the key has no
/// usable encryption key, or the input cannot be read.
pub fn encrypt(
    profile: &Profile,
    public_key: impl AsRef<Path>,
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    sign_with: Option<SignWith<'_>>,
) -> Result<()> {
    let (input, output) = (input.as_ref(), output.as_ref());
    let recipient = cipher::load_public_key(public_key)?;
    let signer: Option<SecretKey> = sign_with
        .map(|s| cipher::load_secret_key(s.key_path, s.passphrase))
        .transpose()?;

    let plaintext = zeroize::Zeroizing::new(read_input(input)?);
    debug!(input = %input.display(), len = plaintext.len(), "read plaintext");

    let mut pgp = Pgp::new(profile.clone());
    if let Some(signer) = &signer {
        pgp = pgp.sign_with(signer);
    }
    let encrypted = pgp.encrypt(&plaintext, &[recipient])?;

    write_output(output, &encrypted)?;
    info!(input = %input.display(), output = %output.display(), "encrypted");
    Ok(())
}

/// Decrypt `input` with the passphrase-protected key in `private_key`.
///
/// # Errors
///
/// Wrong passphrases, messages addressed to another key, corrupted messages
/// and bad signatures each fail with their own error.
pub fn decrypt_with_passphrase(
    profile: &Profile,
    private_key: impl AsRef<Path>,
    passphrase: &str,
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    mode: OutputMode,
    verify_with: &[PathBuf],
) -> Result<SignatureStatus> {
    let key = cipher::load_secret_key(private_key, passphrase)?;
    decrypt_file(profile, &KeyRing::from(key), input.as_ref(), output.as_ref(), mode, verify_with)
}

/// Decrypt `input` by trying every key in the key ring file `keyring`.
pub fn decrypt_with_keyring(
    profile: &Profile,
    keyring: impl AsRef<Path>,
    passphrase: Option<&str>,
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    mode: OutputMode,
    verify_with: &[PathBuf],
) -> Result<SignatureStatus> {
    let ring = cipher::load_keyring(keyring, passphrase)?;
    decrypt_file(profile, &ring, input.as_ref(), output.as_ref(), mode, verify_with)
}

fn decrypt_file(
    profile: &Profile,
    ring: &KeyRing,
    input: &Path,
    output: &Path,
    mode: OutputMode,
    verify_with: &[PathBuf],
) -> Result<SignatureStatus> {
    let verifiers = load_verifiers(verify_with)?;
    let ciphertext = read_input(input)?;
    debug!(input = %input.display(), len = ciphertext.len(), "read ciphertext");

    let Decrypted {
        plaintext,
        signature,
    } = Pgp::new(profile.clone())
        .verify_with(&verifiers)
        .decrypt(&ciphertext, ring)?;

    mode.check(&plaintext)?;
    write_output(output, &plaintext)?;

    info!(
        input = %input.display(),
        output = %output.display(),
        signature = %signature,
        "decrypted"
    );
    Ok(signature)
}
