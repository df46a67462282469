//! Decrypt command.

use std::path::PathBuf;

use crate::cli::output;
use crate::core::cipher::{OutputMode, Profile, SignatureStatus};
use crate::core::gateway;
use crate::error::Result;

/// Parsed `decrypt` arguments.
pub struct Args {
    pub key: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
    pub passphrase: Option<String>,
    pub keyring: bool,
    pub text: bool,
    pub verify_with: Vec<PathBuf>,
    pub require_signature: bool,
    pub allow_legacy: bool,
}

/// Decrypt a file with a secret key, or with every key of a key ring.
pub fn execute(args: Args) -> Result<()> {
    let profile = Profile {
        allow_legacy: args.allow_legacy,
        require_signature: args.require_signature,
        ..Profile::default()
    };
    let passphrase = args.passphrase.map(zeroize::Zeroizing::new);
    let mode = OutputMode::from_text_flag(args.text);

    let status = if args.keyring {
        gateway::decrypt_with_keyring(
            &profile,
            &args.key,
            passphrase.as_deref().map(String::as_str),
            &args.input,
            &args.output,
            mode,
            &args.verify_with,
        )?
    } else {
        gateway::decrypt_with_passphrase(
            &profile,
            &args.key,
            passphrase.as_deref().map(String::as_str).unwrap_or(""),
            &args.input,
            &args.output,
            mode,
            &args.verify_with,
        )?
    };

    output::success(&format!("decrypted {}", output::path(&args.output)));
    match status {
        SignatureStatus::Unsigned => {}
        SignatureStatus::Unverified => output::warn("message is signed but was not verified"),
        SignatureStatus::Valid { .. } => output::kv("signature", &status),
    }
    Ok(())
}
