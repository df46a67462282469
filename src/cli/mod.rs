//! Command-line interface.

pub mod completions;
pub mod decrypt;
pub mod encrypt;
pub mod init;
pub mod keygen;
pub mod output;
pub mod run;
pub mod zip;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::cipher::SymmetricCipher;
use crate::core::constants;

/// Sealpack - OpenPGP file encryption and archive packaging.
#[derive(Parser)]
#[command(
    name = "sealpack",
    about = "Encrypt, decrypt and package files with OpenPGP",
    version
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Encrypt a file to a public key
    Encrypt {
        /// Recipient public key file
        #[arg(short, long)]
        recipient: PathBuf,
        /// File to encrypt
        input: PathBuf,
        /// Where to write the encrypted message
        output: PathBuf,
        /// Write binary OpenPGP instead of ASCII armor
        #[arg(long)]
        binary: bool,
        /// Session key algorithm
        #[arg(long, value_enum, default_value_t = SymmetricCipher::Aes256)]
        cipher: SymmetricCipher,
        /// Secret key to sign the message with
        #[arg(long)]
        sign_with: Option<PathBuf>,
        /// Passphrase for the signing key
        #[arg(long, env = constants::SIGN_PASSPHRASE_ENV, hide_env_values = true)]
        sign_passphrase: Option<String>,
    },

    /// Decrypt a file with a secret key or key ring
    Decrypt {
        /// Secret key (or key ring with --keyring)
        #[arg(short, long)]
        key: PathBuf,
        /// Encrypted message
        input: PathBuf,
        /// Where to write the plaintext
        output: PathBuf,
        /// Passphrase for the secret key
        #[arg(long, env = constants::PASSPHRASE_ENV, hide_env_values = true)]
        passphrase: Option<String>,
        /// Treat the key file as a key ring and try every key
        #[arg(long)]
        keyring: bool,
        /// Require the plaintext to be UTF-8 text
        #[arg(long)]
        text: bool,
        /// Public key to verify the signature against (repeatable)
        #[arg(long)]
        verify_with: Vec<PathBuf>,
        /// Fail unless a --verify-with key verifies the signature
        #[arg(long)]
        require_signature: bool,
        /// Accept messages without integrity protection
        #[arg(long)]
        allow_legacy: bool,
    },

    /// Build a ZIP archive from files in a directory
    Zip {
        /// Directory holding the files; the archive is written here
        #[arg(short, long)]
        dir: PathBuf,
        /// Archive file name
        #[arg(short, long)]
        name: String,
        /// Encrypt every entry with this password (ZipCrypto)
        #[arg(long, env = constants::ZIP_PASSWORD_ENV, hide_env_values = true)]
        password: Option<String>,
        /// Files to add, relative to --dir
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// Generate an OpenPGP key pair
    Keygen {
        /// User ID, e.g. "Alice <alice@example.com>"
        #[arg(short, long)]
        user_id: String,
        /// Directory for public.asc and secret.asc
        #[arg(short, long)]
        out_dir: PathBuf,
        /// Passphrase protecting the secret key
        #[arg(long, env = constants::PASSPHRASE_ENV, hide_env_values = true)]
        passphrase: Option<String>,
    },

    /// Write a starter sealpack.toml in the current directory
    Init,

    /// Run the steps in sealpack.toml
    Run {
        /// Config file path
        #[arg(short, long, default_value = constants::CONFIG_FILE)]
        config: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Execute a command.
pub fn execute(command: Command) -> crate::error::Result<()> {
    use Command::*;

    match command {
        Encrypt {
            recipient,
            input,
            output,
            binary,
            cipher,
            sign_with,
            sign_passphrase,
        } => encrypt::execute(encrypt::Args {
            recipient,
            input,
            output,
            binary,
            cipher,
            sign_with,
            sign_passphrase,
        }),
        Decrypt {
            key,
            input,
            output,
            passphrase,
            keyring,
            text,
            verify_with,
            require_signature,
            allow_legacy,
        } => decrypt::execute(decrypt::Args {
            key,
            input,
            output,
            passphrase,
            keyring,
            text,
            verify_with,
            require_signature,
            allow_legacy,
        }),
        Zip {
            dir,
            name,
            password,
            files,
        } => zip::execute(&dir, &name, &files, password),
        Keygen {
            user_id,
            out_dir,
            passphrase,
        } => keygen::execute(&user_id, &out_dir, passphrase),
        Init => init::execute(),
        Run { config } => run::execute(&config),
        Completions { shell } => completions::execute(shell),
    }
}
