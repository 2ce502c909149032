//! `optiroute status` command implementation

use crate::output::{self, OutputFormat};
use colored::Colorize;
use optiroute_foundation::SolverRouter;
use optiroute_kernel::health::{DegradationLevel, SystemStatus};

pub async fn run(router: &SolverRouter, events: usize, format: OutputFormat) -> anyhow::Result<()> {
    router.refresh_availability().await;
    let mut status = router.system_status();
    status.recent_failures.truncate(events);

    if format == OutputFormat::Json {
        println!("{}", output::to_json(&status)?);
        return Ok(());
    }

    print_status(&status);
    Ok(())
}

fn print_status(status: &SystemStatus) {
    let level = status.degradation_level.to_string();
    let level = match status.degradation_level {
        DegradationLevel::None => level.green(),
        DegradationLevel::Minimal | DegradationLevel::Moderate => level.yellow(),
        _ => level.red(),
    };
    println!("{} degradation: {level}", "→".green());
    println!(
        "  available: {}/{}",
        status.available_count,
        status.solvers.len()
    );
    if !status.open_circuit_breakers.is_empty() {
        println!(
            "  open breakers: {}",
            status.open_circuit_breakers.join(", ").red()
        );
    }

    let rows = status
        .solvers
        .iter()
        .map(|s| {
            vec![
                s.solver_name.clone(),
                if s.available { "yes" } else { "no" }.to_string(),
                s.breaker.to_string(),
                format!("{:.2}", s.health.health_score),
                format!("{:?}", s.health.status).to_lowercase(),
                s.health.consecutive_failures.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        output::table(
            &["solver", "available", "breaker", "health", "status", "consecutive failures"],
            rows
        )
    );

    for event in &status.recent_failures {
        println!(
            "  {} {} {} -> {}",
            event.timestamp.format("%H:%M:%S"),
            event.solver_name,
            event.reason,
            event.fallback_solver.as_deref().unwrap_or("none")
        );
    }
}
