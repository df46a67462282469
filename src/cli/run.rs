//! Run command - execute the configured pipeline.

use std::path::Path;

use crate::cli::output;
use crate::core::config::Config;
use crate::core::pipeline::Pipeline;
use crate::error::Result;

/// Load `config_path` and run its steps in order.
pub fn execute(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;

    let reports = Pipeline::new(&config).run_with(|report| {
        let msg = format!(
            "step {} ({}): {}",
            report.index,
            report.op,
            output::path(&report.output)
        );
        output::success(&msg);
        if let Some(signature) = &report.signature {
            output::kv("signature", signature);
        }
    })?;

    output::success(&format!("pipeline finished ({} steps)", reports.len()));
    Ok(())
}
