//! Sealpack - OpenPGP file encryption and archive packaging.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── encrypt       # Encrypt a file to a public key
//! │   ├── decrypt       # Decrypt with a key or key ring
//! │   ├── zip           # Build a (password-protected) archive
//! │   ├── keygen        # Generate a key pair
//! │   ├── init          # Write a starter sealpack.toml
//! │   ├── run           # Run the configured pipeline
//! │   └── completions   # Shell completions
//! └── core/             # Core library components
//!     ├── cipher/       # Encryption backends
//!     │   ├── mod       # Cipher trait
//!     │   ├── key       # Key loading and generation
//!     │   ├── profile   # Explicit crypto settings
//!     │   └── openpgp   # rpgp implementation
//!     ├── gateway       # File-level encrypt/decrypt
//!     ├── archive       # ZIP and ZipCrypto archives
//!     ├── writer        # Text and pipe-delimited CSV output
//!     ├── config        # sealpack.toml management
//!     └── pipeline      # Step orchestration
//! ```
//!
//! # Features
//!
//! - OpenPGP encryption (SEIPD, AES) with optional signing
//! - Decryption by passphrase-protected key or key ring
//! - Distinct errors for wrong passphrase, wrong recipient and tampering
//! - ZIP archives, optionally ZipCrypto-encrypted
//! - Config-driven pipelines

pub mod cli;
pub mod core;
pub mod error;

/// Re-exports for benchmarks.
#[doc(hidden)]
pub mod bench {
    pub use crate::core::cipher::{
        generate, load_keyring, load_public_key, Cipher, KeyRing, OutputMode, Pgp, Profile,
        PublicKey,
    };
}
