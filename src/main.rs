//! Sealpack - OpenPGP file encryption and archive packaging.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sealpack::cli::output;
use sealpack::cli::{execute, Cli};
use sealpack::core::constants;

fn main() {
    let cli = Cli::parse();

    // SEALPACK_LOG overrides --verbose
    let filter = EnvFilter::try_from_env(constants::LOG_ENV).unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("sealpack=debug")
        } else {
            EnvFilter::new("sealpack=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(e) = execute(cli.command) {
        output::error(&e.to_string());
        if let Some(hint) = e.hint() {
            output::hint(hint);
        }
        std::process::exit(1);
    }
}
