//! Init command - write a starter sealpack.toml.

use std::path::Path;

use tracing::info;

use crate::cli::output;
use crate::core::config::Config;
use crate::core::constants;
use crate::error::Result;

/// Write the template config to the current directory.
pub fn execute() -> Result<()> {
    let path = Path::new(constants::CONFIG_FILE);
    Config::write_template(path)?;

    info!(path = %path.display(), "config template written");
    output::success(&format!("initialized {}", constants::CONFIG_FILE));
    output::hint("edit the steps, then run: sealpack run");
    Ok(())
}
