//! Fixture registries and routers.

use optiroute_foundation::{DecisionTree, RouterError, SolverRegistry, SolverRouter};
use optiroute_kernel::config::RouterConfig;
use optiroute_kernel::error::RegistryResult;
use optiroute_kernel::problem::{ProblemType, SizeClass};
use optiroute_kernel::probe::SolverProbe;
use optiroute_kernel::solver::{PerformanceProfile, SolverCapability, SolverCategory, SolverStatus};
use std::sync::Arc;

/// Every rating set to `rating`.
pub fn profile(rating: u8) -> PerformanceProfile {
    PerformanceProfile {
        small: rating,
        medium: rating,
        large: rating,
        very_large: rating,
        speed: rating,
        memory: rating,
        robustness: rating,
        numerical_stability: rating,
    }
}

/// An available solver with uniform ratings.
pub fn rated_solver(
    name: &str,
    category: SolverCategory,
    types: &[ProblemType],
    rating: u8,
) -> SolverCapability {
    SolverCapability::new(name, category)
        .with_problem_types(types.iter().copied())
        .with_performance(profile(rating))
        .with_status(SolverStatus::Available)
}

/// Three MILP solvers rated 5, 4 and 3.
pub fn scheduling_registry() -> RegistryResult<SolverRegistry> {
    let registry = SolverRegistry::new();
    for (name, rating) in [("alpha", 5), ("bravo", 4), ("charlie", 3)] {
        registry.register(rated_solver(
            name,
            SolverCategory::MixedInteger,
            &[ProblemType::MixedIntegerProgramming],
            rating,
        ))?;
    }
    Ok(registry)
}

/// Two LP solvers (glop 4, clp 5) and a MILP solver that also takes LPs (cbc 3).
pub fn lp_registry() -> RegistryResult<SolverRegistry> {
    let registry = SolverRegistry::new();
    registry.register(rated_solver(
        "glop",
        SolverCategory::LinearProgramming,
        &[ProblemType::LinearProgramming],
        4,
    ))?;
    registry.register(rated_solver(
        "clp",
        SolverCategory::LinearProgramming,
        &[ProblemType::LinearProgramming],
        5,
    ))?;
    registry.register(rated_solver(
        "cbc",
        SolverCategory::MixedInteger,
        &[ProblemType::LinearProgramming, ProblemType::MixedIntegerProgramming],
        3,
    ))?;
    Ok(registry)
}

/// `production_scheduling` prefers alpha, then bravo, then charlie.
pub fn scheduling_tree() -> DecisionTree {
    DecisionTree::new().with_entry(
        "production_scheduling",
        &[SizeClass::Small, SizeClass::Medium],
        &["alpha", "bravo", "charlie"],
    )
}

/// Router over a fixture registry, with optional tree and probes.
pub fn router_with(
    registry: SolverRegistry,
    tree: Option<DecisionTree>,
    probes: Vec<(String, Arc<dyn SolverProbe>)>,
    config: RouterConfig,
) -> Result<SolverRouter, RouterError> {
    let mut builder = SolverRouter::builder(config).registry(registry).probes(probes);
    if let Some(tree) = tree {
        builder = builder.decision_tree(tree);
    }
    builder.build()
}
