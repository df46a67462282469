//! Test support utilities for sealpack integration tests.
//!
//! Provides isolated test environments, key fixtures and command helpers.

#![allow(dead_code)]

pub mod assertions;
pub mod commands;
pub mod fixtures;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;

use std::path::{Path, PathBuf};

use sealpack::core::cipher;
use tempfile::TempDir;

/// Test environment with isolated temp directories.
///
/// Child processes run with `.current_dir()` set to `dir`, so tests can run
/// in parallel without touching process-global state.
pub struct Test {
    /// Working directory for the test
    pub dir: TempDir,
    /// Temporary home directory
    pub home: TempDir,
}

/// Paths of a generated key pair inside a test directory.
#[derive(Debug, Clone)]
pub struct KeyFiles {
    pub public: PathBuf,
    pub secret: PathBuf,
    pub fingerprint: String,
}

impl Test {
    /// Create a new empty test environment.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let home = TempDir::new().expect("failed to create temp home");

        Self { dir, home }
    }

    /// Absolute path of `rel` inside the test directory.
    pub fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Write `content` to `rel`, creating parent directories.
    pub fn write(&self, rel: impl AsRef<Path>, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        std::fs::write(&path, content).expect("failed to write test file");
        path
    }

    /// Read `rel` from the test directory.
    pub fn read(&self, rel: impl AsRef<Path>) -> Vec<u8> {
        std::fs::read(self.path(rel)).expect("failed to read test file")
    }

    /// Generate a key pair into `<name>/public.asc` and `<name>/secret.asc`.
    pub fn keypair(&self, name: &str, passphrase: &str) -> KeyFiles {
        let key = cipher::generate(&format!("{} <{}@example.com>", name, name), passphrase)
            .expect("failed to generate key");
        let public = self.write(format!("{}/public.asc", name), &key.public_armored);
        let secret = self.write(format!("{}/secret.asc", name), key.secret_armored.as_bytes());

        KeyFiles {
            public,
            secret,
            fingerprint: key.fingerprint,
        }
    }
}
