//! `optiroute analyze` command implementation

use super::read_spec;
use crate::output::{self, OutputFormat};
use colored::Colorize;
use optiroute_foundation::SolverRouter;
use std::path::Path;

pub fn run(router: &SolverRouter, file: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let spec = read_spec(file)?;
    let chars = router.analyze(&spec)?;

    if format == OutputFormat::Json {
        println!("{}", output::to_json(&chars)?);
        return Ok(());
    }

    println!("{} {}", "→".green(), chars.problem_type.as_str().bold());
    println!("  size:        {}", chars.size);
    println!(
        "  complexity:  {} (score {})",
        chars.complexity, chars.complexity_score
    );
    println!("  variables:   {}", chars.variable_count());
    println!("  constraints: {}", chars.constraint_count());
    if let Some(domain) = &chars.domain {
        println!("  domain:      {domain}");
    }
    if chars.time_dependent || chars.stochastic {
        println!(
            "  flags:       {}{}",
            if chars.time_dependent { "time-dependent " } else { "" },
            if chars.stochastic { "stochastic" } else { "" }
        );
    }
    Ok(())
}
