//! Subcommand implementations

pub mod analyze;
pub mod catalog;
pub mod probe;
pub mod select;
pub mod status;

use optiroute_kernel::problem::ProblemSpec;
use std::path::Path;

/// Read and parse a JSON problem spec.
pub(crate) fn read_spec(path: &Path) -> anyhow::Result<ProblemSpec> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    Ok(ProblemSpec::from_json(&content)?)
}
