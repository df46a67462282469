//! Step orchestration.
//!
//! Runs the steps of a [`Config`] in order. The first failing step stops the
//! run; nothing is retried or rolled back.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::core::archive;
use crate::core::cipher::{OutputMode, SignatureStatus};
use crate::core::config::{self, Config, DecryptStep, EncryptStep, KeyringStep, Step, ZipStep};
use crate::core::gateway::{self, SignWith};
use crate::error::{Error, Result};

/// Outcome of one completed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// 1-based position in the config
    pub index: usize,
    pub op: &'static str,
    /// File the step wrote
    pub output: PathBuf,
    /// Signature status, for decrypt steps
    pub signature: Option<SignatureStatus>,
}

/// Runs configured steps against the filesystem.
pub struct Pipeline<'a> {
    config: &'a Config,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Run every step, returning one report per completed step.
    pub fn run(&self) -> Result<Vec<StepReport>> {
        self.run_with(|_| {})
    }

    /// Run every step, calling `on_done` as each one completes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Step` wrapping the first failure.
    pub fn run_with<F>(&self, mut on_done: F) -> Result<Vec<StepReport>>
    where
        F: FnMut(&StepReport),
    {
        let mut reports = Vec::with_capacity(self.config.steps.len());

        for (i, step) in self.config.steps.iter().enumerate() {
            let index = i + 1;
            let op = step.op();
            info!(index, op, "running step");

            let report = self.run_step(index, step).map_err(|source| {
                warn!(index, op, error = %source, "step failed");
                Error::Step {
                    index,
                    op,
                    source: Box::new(source),
                }
            })?;

            on_done(&report);
            reports.push(report);
        }

        Ok(reports)
    }

    fn run_step(&self, index: usize, step: &Step) -> Result<StepReport> {
        let (output, signature) = match step {
            Step::Encrypt(step) => (self.encrypt(step)?, None),
            Step::Decrypt(step) => {
                let (output, status) = self.decrypt(step)?;
                (output, Some(status))
            }
            Step::DecryptKeyring(step) => {
                let (output, status) = self.decrypt_keyring(step)?;
                (output, Some(status))
            }
            Step::Zip(step) => (self.zip(step)?, None),
        };

        Ok(StepReport {
            index,
            op: step.op(),
            output,
            signature,
        })
    }

    fn encrypt(&self, step: &EncryptStep) -> Result<PathBuf> {
        let cfg = self.config;
        let output = cfg.resolve(&step.output);
        let sign_key = step.sign_with.as_deref().map(|p| cfg.resolve(p));
        let sign_passphrase = config::resolve_secret(None, step.sign_passphrase_env.as_deref())?;

        let sign_with = sign_key.as_deref().map(|key_path| SignWith {
            key_path,
            passphrase: sign_passphrase.as_deref().map(String::as_str).unwrap_or(""),
        });

        gateway::encrypt(
            &cfg.profile,
            cfg.resolve(&step.public_key),
            cfg.resolve(&step.input),
            &output,
            sign_with,
        )?;
        Ok(output)
    }

    fn decrypt(&self, step: &DecryptStep) -> Result<(PathBuf, SignatureStatus)> {
        let cfg = self.config;
        let output = cfg.resolve(&step.output);
        let passphrase =
            config::resolve_secret(step.passphrase.as_deref(), step.passphrase_env.as_deref())?
                .unwrap_or_default();

        let status = gateway::decrypt_with_passphrase(
            &cfg.profile,
            cfg.resolve(&step.private_key),
            &passphrase,
            cfg.resolve(&step.input),
            &output,
            OutputMode::from_text_flag(step.text),
            &self.resolve_all(&step.verify_with),
        )?;
        Ok((output, status))
    }

    fn decrypt_keyring(&self, step: &KeyringStep) -> Result<(PathBuf, SignatureStatus)> {
        let cfg = self.config;
        let output = cfg.resolve(&step.output);
        let passphrase =
            config::resolve_secret(step.passphrase.as_deref(), step.passphrase_env.as_deref())?;

        let status = gateway::decrypt_with_keyring(
            &cfg.profile,
            cfg.resolve(&step.keyring),
            passphrase.as_deref().map(String::as_str),
            cfg.resolve(&step.input),
            &output,
            OutputMode::from_text_flag(step.text),
            &self.resolve_all(&step.verify_with),
        )?;
        Ok((output, status))
    }

    fn zip(&self, step: &ZipStep) -> Result<PathBuf> {
        let dir = self.config.resolve(&step.dir);
        let password =
            config::resolve_secret(step.password.as_deref(), step.password_env.as_deref())?;

        match password {
            Some(password) => archive::write_encrypted_zip(&dir, &step.name, &step.files, &password),
            None => archive::write_zip(&dir, &step.name, &step.files),
        }
    }

    fn resolve_all(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        paths.iter().map(|p| self.config.resolve(p)).collect()
    }
}
