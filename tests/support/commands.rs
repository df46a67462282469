//! Command helper methods for Test.

use super::{KeyFiles, Test};
use assert_cmd::Command;
use std::process::Output;

impl Test {
    /// Create a sealpack command running inside the test directory.
    ///
    /// Passphrase variables from the parent environment are cleared so every
    /// test controls its own secrets.
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("sealpack").expect("failed to find sealpack binary");
        cmd.env("HOME", self.home.path());
        cmd.env("USERPROFILE", self.home.path());
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("SEALPACK_LOG");
        cmd.env_remove("SEALPACK_PASSPHRASE");
        cmd.env_remove("SEALPACK_SIGN_PASSPHRASE");
        cmd.env_remove("SEALPACK_ZIP_PASSWORD");
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Shortcut for `sealpack encrypt`.
    pub fn encrypt(&self, key: &KeyFiles, input: &str, output: &str) -> Output {
        self.cmd()
            .arg("encrypt")
            .arg("--recipient")
            .arg(&key.public)
            .args([input, output])
            .output()
            .expect("failed to run sealpack encrypt")
    }

    /// Shortcut for `sealpack decrypt` with a passphrase.
    pub fn decrypt(&self, key: &KeyFiles, passphrase: &str, input: &str, output: &str) -> Output {
        self.cmd()
            .arg("decrypt")
            .arg("--key")
            .arg(&key.secret)
            .args(["--passphrase", passphrase, input, output])
            .output()
            .expect("failed to run sealpack decrypt")
    }

    /// Shortcut for `sealpack run`.
    pub fn run(&self) -> Output {
        self.cmd()
            .arg("run")
            .output()
            .expect("failed to run sealpack run")
    }
}
