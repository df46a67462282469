//! Crypto profile.
//!
//! The profile is passed explicitly to every cryptographic call instead of
//! living in a process-wide default.

use pgp::crypto::sym::SymmetricKeyAlgorithm;
use serde::{Deserialize, Serialize};

/// Session key algorithm used when encrypting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SymmetricCipher {
    Aes128,
    Aes192,
    #[default]
    Aes256,
}

impl SymmetricCipher {
    pub(crate) fn algorithm(self) -> SymmetricKeyAlgorithm {
        match self {
            Self::Aes128 => SymmetricKeyAlgorithm::AES128,
            Self::Aes192 => SymmetricKeyAlgorithm::AES192,
            Self::Aes256 => SymmetricKeyAlgorithm::AES256,
        }
    }
}

/// Explicit OpenPGP settings for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Profile {
    /// Session key algorithm for encryption
    pub cipher: SymmetricCipher,
    /// ASCII-armor encrypted output
    pub armor: bool,
    /// Accept messages without integrity protection
    pub allow_legacy: bool,
    /// Fail decryption unless a supplied key verifies the signature
    pub require_signature: bool,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            cipher: SymmetricCipher::default(),
            armor: true,
            allow_legacy: false,
            require_signature: false,
        }
    }
}
