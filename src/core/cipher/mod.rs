//! Cryptographic operations.
//!
//! Provides the encryption/decryption abstraction and its OpenPGP
//! implementation. All primitives, key parsing and packet handling come from
//! the `pgp` crate; this module only selects keys and maps errors.
//!
//! ## Adding a New Backend
//!
//! 1. Implement the `Cipher` trait
//! 2. Add the implementation in a new file
//! 3. Re-export from this module

use zeroize::Zeroizing;

use crate::core::types::Fingerprint;
use crate::error::{CipherError, Result};

pub mod key;
mod openpgp;
mod profile;

pub use openpgp::Pgp;
pub use key::{
    generate, load_keyring, load_public_key, load_secret_key, GeneratedKey, KeyRing, PublicKey,
    SecretKey,
};
pub use profile::{Profile, SymmetricCipher};

/// Cryptographic backend trait.
///
/// Recipients and identities are backend-specific; for OpenPGP they are
/// public keys and key rings.
pub trait Cipher {
    /// Type representing a recipient public key.
    type Recipient;

    /// Type representing the private key material used to decrypt.
    type Identity;

    /// Encrypt plaintext for every recipient.
    ///
    /// # Errors
    ///
    /// Returns `CipherError` if encryption fails, or `KeyError` if a
    /// recipient has no usable encryption key.
    fn encrypt(&self, plaintext: &[u8], recipients: &[Self::Recipient]) -> Result<Vec<u8>>;

    /// Decrypt a message and report its signature status.
    ///
    /// # Errors
    ///
    /// Returns `CipherError` if the message is malformed, not addressed to
    /// the identity, corrupted, or carries an invalid signature.
    fn decrypt(&self, ciphertext: &[u8], identity: &Self::Identity) -> Result<Decrypted>;

    /// Backend name for display.
    fn name(&self) -> &'static str;
}

/// Signature state of a decrypted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureStatus {
    /// The message carries no signature.
    Unsigned,
    /// The message is signed but no verifier key was supplied.
    Unverified,
    /// A supplied key verified the signature.
    Valid { fingerprint: Fingerprint },
}

impl std::fmt::Display for SignatureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsigned => write!(f, "unsigned"),
            Self::Unverified => write!(f, "signed (not verified)"),
            Self::Valid { fingerprint } => write!(f, "good signature from {}", fingerprint),
        }
    }
}

/// Result of a successful decryption.
///
/// The plaintext buffer is wiped on drop.
#[derive(Debug)]
pub struct Decrypted {
    pub plaintext: Zeroizing<Vec<u8>>,
    pub signature: SignatureStatus,
}

/// How decrypted bytes are written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Raw bytes, unchanged.
    #[default]
    Binary,
    /// UTF-8 text; non-text content is rejected.
    Text,
}

impl OutputMode {
    pub fn from_text_flag(text: bool) -> Self {
        if text {
            Self::Text
        } else {
            Self::Binary
        }
    }

    /// Check `plaintext` against this mode.
    pub fn check(self, plaintext: &[u8]) -> Result<()> {
        if self == Self::Text && std::str::from_utf8(plaintext).is_err() {
            return Err(CipherError::InvalidText.into());
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testkeys {
    //! Keys shared by unit tests. Generation is cached per process.

    use std::sync::OnceLock;

    use super::key::{self, GeneratedKey, KeyRing, PublicKey};

    pub const PASSPHRASE: &str = "correct horse battery staple";

    pub fn protected() -> &'static GeneratedKey {
        static KEY: OnceLock<GeneratedKey> = OnceLock::new();
        KEY.get_or_init(|| key::generate("Test User <test@example.com>", PASSPHRASE).unwrap())
    }

    pub fn unprotected() -> GeneratedKey {
        key::generate("Ring User <ring@example.com>", "").unwrap()
    }

    /// A fresh unprotected key pair, loaded from a temp dir.
    pub fn loaded_pair() -> (PublicKey, KeyRing) {
        let tmp = tempfile::TempDir::new().unwrap();
        let generated = unprotected();
        let public_path = tmp.path().join("public.asc");
        let secret_path = tmp.path().join("secret.asc");
        std::fs::write(&public_path, &generated.public_armored).unwrap();
        std::fs::write(&secret_path, generated.secret_armored.as_bytes()).unwrap();

        let public = key::load_public_key(&public_path).unwrap();
        let ring = key::load_keyring(&secret_path, None).unwrap();
        (public, ring)
    }
}
