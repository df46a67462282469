//! Pipeline configuration.
//!
//! Handles reading and validating `sealpack.toml`. Relative paths in the file
//! resolve against the directory that contains it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::core::cipher::Profile;
use crate::error::{ConfigError, Result};

/// Contents written by `sealpack init`.
const TEMPLATE: &str = r#"# sealpack pipeline. Steps run in order; the first failure stops the run.

[profile]
cipher = "aes256"
armor = true
allow-legacy = false
require-signature = false

[[steps]]
op = "encrypt"
public-key = "keys/public.asc"
input = "decrypted/report.txt"
output = "encrypted/report.txt.pgp"

[[steps]]
op = "decrypt"
private-key = "keys/secret.asc"
passphrase-env = "SEALPACK_PASSPHRASE"
input = "encrypted/report.txt.pgp"
output = "decrypted/report.copy.txt"
text = true

[[steps]]
op = "zip"
dir = "decrypted"
name = "bundle.zip"
files = ["report.txt", "report.copy.txt"]
"#;

/// Pipeline configuration stored in `sealpack.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Crypto settings shared by every step
    #[serde(default)]
    pub profile: Profile,
    /// Steps, run in order
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(skip)]
    base_dir: PathBuf,
}

/// One pipeline operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Step {
    Encrypt(EncryptStep),
    Decrypt(DecryptStep),
    DecryptKeyring(KeyringStep),
    Zip(ZipStep),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EncryptStep {
    pub public_key: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
    /// Secret key used to sign the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_with: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_passphrase_env: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DecryptStep {
    pub private_key: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase_env: Option<String>,
    pub input: PathBuf,
    pub output: PathBuf,
    #[serde(default)]
    pub text: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verify_with: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct KeyringStep {
    pub keyring: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase_env: Option<String>,
    pub input: PathBuf,
    pub output: PathBuf,
    #[serde(default)]
    pub text: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verify_with: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ZipStep {
    pub dir: PathBuf,
    pub name: String,
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
}

impl Step {
    /// Operation name as written in the config file.
    pub fn op(&self) -> &'static str {
        match self {
            Step::Encrypt(_) => "encrypt",
            Step::Decrypt(_) => "decrypt",
            Step::DecryptKeyring(_) => "decrypt-keyring",
            Step::Zip(_) => "zip",
        }
    }

    fn validate(&self, index: usize) -> Result<()> {
        match self {
            Step::Encrypt(step) => {
                require_path(index, "public-key", &step.public_key)?;
                require_path(index, "input", &step.input)?;
                require_path(index, "output", &step.output)?;
                if step.sign_passphrase_env.is_some() && step.sign_with.is_none() {
                    return Err(ConfigError::MissingField {
                        index,
                        field: "sign-with",
                    }
                    .into());
                }
                if let Some(sign_with) = &step.sign_with {
                    require_path(index, "sign-with", sign_with)?;
                }
                check_env_name(index, "sign-passphrase-env", &step.sign_passphrase_env)
            }
            Step::Decrypt(step) => {
                require_path(index, "private-key", &step.private_key)?;
                require_path(index, "input", &step.input)?;
                require_path(index, "output", &step.output)?;
                match (&step.passphrase, &step.passphrase_env) {
                    (None, None) => Err(ConfigError::MissingField {
                        index,
                        field: "passphrase",
                    }
                    .into()),
                    (Some(_), Some(_)) => Err(both_set(index, "passphrase", "passphrase-env")),
                    _ => check_env_name(index, "passphrase-env", &step.passphrase_env),
                }
            }
            Step::DecryptKeyring(step) => {
                require_path(index, "keyring", &step.keyring)?;
                require_path(index, "input", &step.input)?;
                require_path(index, "output", &step.output)?;
                if step.passphrase.is_some() && step.passphrase_env.is_some() {
                    return Err(both_set(index, "passphrase", "passphrase-env"));
                }
                check_env_name(index, "passphrase-env", &step.passphrase_env)
            }
            Step::Zip(step) => {
                require_path(index, "dir", &step.dir)?;
                if step.name.trim().is_empty() {
                    return Err(ConfigError::MissingField {
                        index,
                        field: "name",
                    }
                    .into());
                }
                if step.files.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        index,
                        field: "files",
                        reason: "at least one file is required".to_string(),
                    }
                    .into());
                }
                if let Some(pos) = step.files.iter().position(|f| f.trim().is_empty()) {
                    return Err(ConfigError::InvalidValue {
                        index,
                        field: "files",
                        reason: format!("entry {} is empty", pos + 1),
                    }
                    .into());
                }
                if step.password.is_some() && step.password_env.is_some() {
                    return Err(both_set(index, "password", "password-env"));
                }
                check_env_name(index, "password-env", &step.password_env)
            }
        }
    }
}

impl Config {
    /// Parse and validate the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file doesn't exist,
    /// `ConfigError::Parse` if the TOML is malformed, or a validation error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading config");

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()).into());
        }
        let contents = fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let config = Self::parse(&contents, base_dir)?;
        debug!(steps = config.steps.len(), "config loaded");
        Ok(config)
    }

    /// Parse and validate TOML `contents`, resolving paths against `base_dir`.
    pub fn parse(contents: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut config: Self = toml::from_str(contents).map_err(ConfigError::Parse)?;
        config.base_dir = base_dir.into();
        config.validate()?;
        Ok(config)
    }

    /// Validate step structure.
    ///
    /// Checks:
    /// - At least one step exists
    /// - Every path is non-empty
    /// - Secret sources are unambiguous
    ///
    /// Environment variables are checked when a step runs, not here.
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(ConfigError::NoSteps.into());
        }
        for (i, step) in self.steps.iter().enumerate() {
            step.validate(i + 1)?;
        }
        Ok(())
    }

    /// Starter configuration for `sealpack init`.
    pub fn template() -> &'static str {
        TEMPLATE
    }

    /// Write the starter configuration to `path`, refusing to overwrite.
    pub fn write_template(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()).into());
        }
        fs::write(path, TEMPLATE)?;
        Ok(())
    }

    /// Resolve `path` against the config directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// Read a secret given inline or by environment variable name.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnv` if the named variable is not set.
pub fn resolve_secret(
    inline: Option<&str>,
    env: Option<&str>,
) -> Result<Option<Zeroizing<String>>> {
    if let Some(value) = inline {
        return Ok(Some(Zeroizing::new(value.to_string())));
    }
    match env {
        Some(name) => std::env::var(name)
            .map(|v| Some(Zeroizing::new(v)))
            .map_err(|_| ConfigError::MissingEnv(name.to_string()).into()),
        None => Ok(None),
    }
}

fn require_path(index: usize, field: &'static str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::MissingField { index, field }.into());
    }
    Ok(())
}

fn check_env_name(index: usize, field: &'static str, name: &Option<String>) -> Result<()> {
    match name {
        Some(name) if name.trim().is_empty() || name.contains('=') => {
            Err(ConfigError::InvalidValue {
                index,
                field,
                reason: format!("'{}' is not a valid variable name", name),
            }
            .into())
        }
        _ => Ok(()),
    }
}

fn both_set(index: usize, a: &'static str, b: &'static str) -> crate::error::Error {
    ConfigError::InvalidValue {
        index,
        field: a,
        reason: format!("set either '{}' or '{}', not both", a, b),
    }
    .into()
}
