//! Encrypt command.

use std::path::PathBuf;

use tracing::info;

use crate::cli::output;
use crate::core::cipher::{Profile, SymmetricCipher};
use crate::core::gateway::{self, SignWith};
use crate::error::Result;

/// Parsed `encrypt` arguments.
pub struct Args {
    pub recipient: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
    pub binary: bool,
    pub cipher: SymmetricCipher,
    pub sign_with: Option<PathBuf>,
    pub sign_passphrase: Option<String>,
}

/// Encrypt a file to the recipient's public key.
pub fn execute(args: Args) -> Result<()> {
    let profile = Profile {
        cipher: args.cipher,
        armor: !args.binary,
        ..Profile::default()
    };
    let sign_passphrase = zeroize::Zeroizing::new(args.sign_passphrase.unwrap_or_default());
    let sign_with = args.sign_with.as_deref().map(|key_path| SignWith {
        key_path,
        passphrase: &sign_passphrase,
    });

    info!(cipher = ?profile.cipher, armor = profile.armor, "encrypting");
    gateway::encrypt(&profile, &args.recipient, &args.input, &args.output, sign_with)?;

    let signed = if sign_with.is_some() { " (signed)" } else { "" };
    output::success(&format!("encrypted {}{}", output::path(&args.output), signed));
    Ok(())
}
