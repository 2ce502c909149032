//! `optiroute catalog` command implementation

use crate::output::{self, OutputFormat};
use optiroute_foundation::selector::covered_types;
use optiroute_foundation::{SolverRegistry, SolverRouter};
use optiroute_kernel::problem::ProblemType;
use optiroute_kernel::solver::{LicenseKind, SolverCapability, SolverStatus};

pub fn run(router: &SolverRouter, format: OutputFormat) -> anyhow::Result<()> {
    let solvers = router.registry().list_all();

    if format == OutputFormat::Json {
        println!("{}", output::to_json(&solvers)?);
        return Ok(());
    }

    if solvers.is_empty() {
        println!("No solvers registered.");
        return Ok(());
    }

    let rows = solvers.iter().map(row).collect();
    let table = output::table(
        &["solver", "category", "problem types", "max vars", "parallel", "license", "status"],
        rows,
    );
    println!("{table}");
    println!("{}", coverage_line(router.registry()));
    Ok(())
}

/// Which problem types the registered solvers cover, and which none do.
fn coverage_line(registry: &SolverRegistry) -> String {
    let covered = covered_types(registry);
    let missing: Vec<&str> = ProblemType::ALL
        .into_iter()
        .filter(|t| !covered.contains(t))
        .map(|t| t.as_str())
        .collect();
    let covered: Vec<&str> = covered.iter().map(|t| t.as_str()).collect();
    if missing.is_empty() {
        format!("covers: {}", covered.join(", "))
    } else {
        format!("covers: {} (none for {})", covered.join(", "), missing.join(", "))
    }
}

fn row(cap: &SolverCapability) -> Vec<String> {
    let types = cap
        .problem_types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    vec![
        cap.name.clone(),
        cap.category.to_string(),
        types,
        cap.max_variables
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string()),
        if cap.parallel_capable { "yes" } else { "no" }.to_string(),
        license_label(cap.installation.license).to_string(),
        status_label(cap.status).to_string(),
    ]
}

fn license_label(license: LicenseKind) -> &'static str {
    match license {
        LicenseKind::OpenSource => "open source",
        LicenseKind::Academic => "academic",
        LicenseKind::Commercial => "commercial",
    }
}

pub(crate) fn status_label(status: SolverStatus) -> &'static str {
    match status {
        SolverStatus::Available => "available",
        SolverStatus::Unavailable => "unavailable",
        SolverStatus::Unknown => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optiroute_kernel::solver::SolverCategory;

    #[test]
    fn row_lists_types_and_unbounded_limits() {
        let cap = SolverCapability::new("glop", SolverCategory::LinearProgramming)
            .with_problem_types([ProblemType::LinearProgramming]);
        let row = row(&cap);
        assert_eq!(row[0], "glop");
        assert_eq!(row[3], "-");
        assert_eq!(row[6], "unknown");
    }

    #[test]
    fn coverage_names_uncovered_types() {
        let registry = SolverRegistry::new();
        registry
            .register(
                SolverCapability::new("glop", SolverCategory::LinearProgramming)
                    .with_problem_types([ProblemType::LinearProgramming]),
            )
            .unwrap();
        let line = coverage_line(&registry);
        assert!(line.starts_with("covers: linear_programming (none for "), "{line}");
        assert!(line.contains(ProblemType::ConstraintProgramming.as_str()));
    }
}
