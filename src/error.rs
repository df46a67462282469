//! Error types.
//!
//! Errors are grouped by the component that raises them and wrapped by the
//! top-level [`Error`]. Filesystem errors always carry the path involved.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error for every sealpack operation.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    File(#[from] FileError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A pipeline step failed; the run stopped here.
    #[error("step {index} ({op}) failed: {source}")]
    Step {
        index: usize,
        op: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Text, CSV and plain file I/O failures.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("refusing to overwrite {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("failed to write record to csv file {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// ZIP archive assembly and extraction failures.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("failed to open file {} for zipping: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to add {name} to archive: {source}")]
    Entry {
        name: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("invalid entry name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("failed to read archive {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("entry not found in archive: {0}")]
    NotFound(String),

    #[error("wrong password for archive entry {0}")]
    WrongPassword(String),

    #[error("archive entry {name} is corrupted: {source}")]
    Corrupted {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// OpenPGP key loading and generation failures.
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("failed to read key file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse key {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("wrong passphrase for key {}", path.display())]
    WrongPassphrase { path: PathBuf },

    #[error("no secret keys found in {}", path.display())]
    EmptyKeyRing { path: PathBuf },

    #[error("key {} has no usable encryption key (missing, revoked or expired)", path.display())]
    NoEncryptionKey { path: PathBuf },

    #[error("key generation failed: {0}")]
    Generate(String),
}

/// Encryption, decryption and signature failures.
#[derive(Error, Debug)]
pub enum CipherError {
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("not an OpenPGP message: {0}")]
    MalformedMessage(String),

    #[error("message is not encrypted to any of the supplied keys")]
    NotForRecipient,

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("message carries no verified signature")]
    SignatureRequired,

    #[error("decrypted content is not valid UTF-8 text")]
    InvalidText,
}

/// Pipeline configuration failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("config file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("failed to read config: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config has no steps")]
    NoSteps,

    #[error("step {index}: missing field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("step {index}: invalid '{field}': {reason}")]
    InvalidValue {
        index: usize,
        field: &'static str,
        reason: String,
    },

    #[error("environment variable {0} is not set")]
    MissingEnv(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Hint shown under the error message, if one applies.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::Step { source, .. } => source.hint(),
            Error::Config(ConfigError::NotFound(_)) => Some("run: sealpack init"),
            Error::Config(ConfigError::MissingEnv(_)) => {
                Some("export the variable before running the pipeline")
            }
            Error::Key(KeyError::WrongPassphrase { .. }) => {
                Some("check the passphrase (SEALPACK_PASSPHRASE)")
            }
            Error::Cipher(CipherError::NotForRecipient) => {
                Some("the message was encrypted to a different key")
            }
            Error::Cipher(CipherError::InvalidText) => Some("decrypt without --text"),
            Error::File(FileError::AlreadyExists(_)) => {
                Some("move the existing files away or choose another --out-dir")
            }
            _ => None,
        }
    }
}
