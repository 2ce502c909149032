//! `optiroute select` command implementation

use super::read_spec;
use crate::output::{self, OutputFormat};
use colored::Colorize;
use optiroute_foundation::SolverRouter;
use optiroute_kernel::selection::SolvePlan;
use std::path::Path;

pub async fn run(
    router: &SolverRouter,
    file: &Path,
    preferred: Option<&str>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let spec = read_spec(file)?;

    // One-shot process: probe before selecting so availability is real
    let availability = router.refresh_availability().await;
    tracing::debug!(
        available = availability.values().filter(|a| **a).count(),
        total = availability.len(),
        "Probed backends"
    );

    let plan = router.plan(&spec, preferred)?;

    if format == OutputFormat::Json {
        println!("{}", output::to_json(&plan)?);
        return Ok(());
    }

    print_plan(&plan);
    Ok(())
}

fn print_plan(plan: &SolvePlan) {
    let selection = &plan.selection;

    println!(
        "{} {} (confidence {:.2})",
        "→".green(),
        selection.primary_solver.bold(),
        selection.confidence_score
    );
    if selection.is_fallback {
        println!("  {}", "selected from the fallback chain".yellow());
    }
    if let Some(adaptation) = &selection.adaptation {
        println!(
            "  {} {} -> {} ({})",
            "adapted:".yellow(),
            adaptation.original_type.as_str(),
            adaptation.adapted_type.as_str(),
            adaptation.method
        );
    }
    if let Some(score) = selection.primary_score() {
        println!("  {}", score.rationale.dimmed());
    }
    if !selection.backup_solvers.is_empty() {
        println!("  backups:  {}", selection.backup_solvers.join(", "));
    }
    if !selection.fallback_chain.is_empty() {
        println!("  fallback: {}", selection.fallback_chain.join(", "));
    }

    if !selection.solver_scores.is_empty() {
        let rows = selection
            .solver_scores
            .iter()
            .map(|s| {
                vec![
                    s.rank.to_string(),
                    s.solver_name.clone(),
                    format!("{:.3}", s.total_score),
                    format!("{:.2}", s.components.problem_fit),
                    format!("{:.2}", s.components.performance),
                    format!("{:.2}", s.components.reliability),
                    format!("{:.2}", s.components.availability),
                    format!("{:.2}", s.components.scalability),
                    format!("{:.1}s", s.estimated_solve_time_secs),
                ]
            })
            .collect();
        let table = output::table(
            &["#", "solver", "total", "fit", "perf", "rel", "avail", "scale", "est. time"],
            rows,
        );
        println!("{table}");
    }

    if !plan.parameters.is_empty() {
        println!("{}", "parameters:".bold());
        for (name, value) in &plan.parameters {
            println!("  {name} = {value}");
        }
    }
}
