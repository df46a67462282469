//! Core library components.
//!
//! This module contains the reusable logic for OpenPGP file encryption,
//! archive assembly, file output and pipeline orchestration.

pub mod archive;
pub mod cipher;
pub mod config;
pub mod constants;
pub mod gateway;
pub mod pipeline;
pub mod types;
pub mod writer;
