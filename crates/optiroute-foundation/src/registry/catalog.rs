//! Built-in solver catalog.
//!
//! Capability records, category fallback orders, the domain decision tree
//! and availability probes for the common open-source and commercial
//! backends. Ratings are static; they are refreshed by editing this file,
//! not measured at runtime.

use super::SolverRegistry;
use crate::prober::probes::{CommandProbe, FnProbe};
use crate::selector::DecisionTree;
use optiroute_kernel::error::RegistryResult;
use optiroute_kernel::parameter::{ParameterRole, ParameterSpec};
use optiroute_kernel::probe::{ProbeReport, SolverProbe};
use optiroute_kernel::problem::{
    ConstraintKind as C, ObjectiveKind as O, ProblemType, ProblemType as T, SizeClass, VariableKind as V,
};
use optiroute_kernel::solver::{
    InstallDifficulty, InstallationInfo, LicenseKind, PerformanceProfile, SolverCapability, SolverCategory,
};
use std::sync::Arc;

fn perf(sizes: [u8; 4], speed: u8, memory: u8, robustness: u8, numerical_stability: u8) -> PerformanceProfile {
    PerformanceProfile {
        small: sizes[0],
        medium: sizes[1],
        large: sizes[2],
        very_large: sizes[3],
        speed,
        memory,
        robustness,
        numerical_stability,
    }
}

fn install(license: LicenseKind, difficulty: InstallDifficulty, package: &str, deps: u32) -> InstallationInfo {
    InstallationInfo {
        license,
        difficulty,
        package: package.to_string(),
        dependency_count: deps,
    }
}

fn time_limit(name: &str, default: f64) -> ParameterSpec {
    ParameterSpec::float(name, default, 1.0, 3600.0)
        .with_role(ParameterRole::TimeLimit)
        .with_description("Wall-clock limit in seconds")
}

fn threads(name: &str, max: i64) -> ParameterSpec {
    ParameterSpec::int(name, 1, 1, max)
        .with_role(ParameterRole::Threads)
        .with_description("Worker threads")
}

fn mip_gap(name: &str) -> ParameterSpec {
    ParameterSpec::float(name, 1e-4, 0.0, 1.0)
        .with_role(ParameterRole::OptimalityGap)
        .with_description("Relative optimality gap")
}

fn iterations(name: &str, default: i64, max: i64) -> ParameterSpec {
    ParameterSpec::int(name, default, 1, max).with_role(ParameterRole::IterationLimit)
}

/// Capability records for every built-in backend.
pub fn builtin_capabilities() -> Vec<SolverCapability> {
    let open = LicenseKind::OpenSource;
    vec![
        SolverCapability::new("glop", SolverCategory::LinearProgramming)
            .with_display_name("Google GLOP")
            .with_problem_types([T::LinearProgramming])
            .with_variable_kinds([V::Continuous])
            .with_constraint_kinds([C::Linear])
            .with_objective_kinds([O::Linear])
            .with_limits(Some(1_000_000), Some(1_000_000))
            .with_performance(perf([5, 4, 3, 2], 4, 4, 4, 4))
            .with_memory_efficient(true)
            .with_installation(install(open, InstallDifficulty::Bundled, "ortools", 1))
            .with_parameter(time_limit("max_time_in_seconds", 60.0))
            .with_parameter(ParameterSpec::boolean("use_dual_simplex", false)),
        SolverCapability::new("clp", SolverCategory::LinearProgramming)
            .with_display_name("COIN-OR CLP")
            .with_problem_types([T::LinearProgramming])
            .with_variable_kinds([V::Continuous])
            .with_constraint_kinds([C::Linear])
            .with_objective_kinds([O::Linear])
            .with_limits(Some(5_000_000), Some(5_000_000))
            .with_performance(perf([4, 4, 4, 3], 4, 4, 4, 4))
            .with_installation(install(open, InstallDifficulty::Moderate, "coinor-clp", 2))
            .with_parameter(time_limit("seconds", 60.0))
            .with_parameter(ParameterSpec::choice(
                "algorithm",
                "dual",
                &["primal", "dual", "barrier"],
            ))
            .with_parameter(iterations("max_iterations", 100_000, 10_000_000)),
        SolverCapability::new("highs", SolverCategory::LinearProgramming)
            .with_display_name("HiGHS")
            .with_problem_types([T::LinearProgramming, T::MixedIntegerProgramming, T::QuadraticProgramming])
            .with_variable_kinds([V::Continuous, V::Integer, V::Binary])
            .with_constraint_kinds([C::Linear])
            .with_objective_kinds([O::Linear, O::Quadratic])
            .with_performance(perf([5, 5, 4, 4], 5, 4, 4, 4))
            .with_parallel(true)
            .with_memory_efficient(true)
            .with_installation(install(open, InstallDifficulty::Easy, "highspy", 1))
            .with_parameter(time_limit("time_limit", 60.0))
            .with_parameter(threads("threads", 64))
            .with_parameter(mip_gap("mip_rel_gap"))
            .with_parameter(ParameterSpec::choice(
                "solver",
                "choose",
                &["choose", "simplex", "ipm"],
            ))
            .with_parameter(ParameterSpec::boolean("presolve", true)),
        SolverCapability::new("cbc", SolverCategory::MixedInteger)
            .with_display_name("COIN-OR CBC")
            .with_problem_types([T::LinearProgramming, T::MixedIntegerProgramming])
            .with_variable_kinds([V::Continuous, V::Integer, V::Binary])
            .with_constraint_kinds([C::Linear])
            .with_objective_kinds([O::Linear])
            .with_limits(Some(1_000_000), Some(1_000_000))
            .with_performance(perf([4, 4, 3, 2], 3, 3, 4, 4))
            .with_parallel(true)
            .with_installation(install(open, InstallDifficulty::Easy, "pulp", 1))
            .with_parameter(time_limit("seconds", 120.0))
            .with_parameter(threads("threads", 32))
            .with_parameter(mip_gap("ratio_gap"))
            .with_parameter(ParameterSpec::boolean("presolve", true)),
        SolverCapability::new("scip", SolverCategory::MixedInteger)
            .with_display_name("SCIP")
            .with_problem_types([
                T::LinearProgramming,
                T::MixedIntegerProgramming,
                T::QuadraticProgramming,
                T::NonlinearProgramming,
            ])
            .with_variable_kinds([V::Continuous, V::Integer, V::Binary])
            .with_constraint_kinds([C::Linear, C::Quadratic, C::Nonlinear, C::Logical])
            .with_objective_kinds([O::Linear, O::Quadratic, O::Nonlinear])
            .with_performance(perf([4, 4, 3, 3], 3, 3, 5, 4))
            .with_installation(install(LicenseKind::Academic, InstallDifficulty::Moderate, "pyscipopt", 3))
            .with_parameter(time_limit("limits/time", 300.0))
            .with_parameter(mip_gap("limits/gap"))
            .with_parameter(ParameterSpec::int("presolving/maxrounds", -1, -1, 1000)),
        SolverCapability::new("gurobi", SolverCategory::MixedInteger)
            .with_display_name("Gurobi")
            .with_problem_types([T::LinearProgramming, T::MixedIntegerProgramming, T::QuadraticProgramming])
            .with_variable_kinds([V::Continuous, V::Integer, V::Binary])
            .with_constraint_kinds([C::Linear, C::Quadratic, C::Logical])
            .with_objective_kinds([O::Linear, O::Quadratic, O::MultiObjective])
            .with_performance(perf([5, 5, 5, 5], 5, 4, 5, 5))
            .with_parallel(true)
            .with_memory_efficient(true)
            .with_installation(install(LicenseKind::Commercial, InstallDifficulty::Hard, "gurobipy", 1))
            .with_parameter(time_limit("TimeLimit", 300.0))
            .with_parameter(threads("Threads", 128))
            .with_parameter(mip_gap("MIPGap"))
            .with_parameter(ParameterSpec::int("MIPFocus", 0, 0, 3)),
        SolverCapability::new("cp_sat", SolverCategory::ConstraintProgramming)
            .with_display_name("Google CP-SAT")
            .with_problem_types([T::ConstraintProgramming, T::MixedIntegerProgramming, T::CombinatorialOptimization])
            .with_variable_kinds([V::Integer, V::Binary])
            .with_constraint_kinds([C::Linear, C::Logical])
            .with_objective_kinds([O::Linear])
            .with_performance(perf([5, 5, 4, 3], 4, 3, 5, 5))
            .with_parallel(true)
            .with_installation(install(open, InstallDifficulty::Bundled, "ortools", 1))
            .with_parameter(time_limit("max_time_in_seconds", 60.0))
            .with_parameter(threads("num_search_workers", 64))
            .with_parameter(mip_gap("relative_gap_limit"))
            .with_parameter(ParameterSpec::boolean("log_search_progress", false)),
        SolverCapability::new("ipopt", SolverCategory::Nonlinear)
            .with_display_name("Ipopt")
            .with_problem_types([T::NonlinearProgramming, T::QuadraticProgramming, T::LinearProgramming])
            .with_variable_kinds([V::Continuous])
            .with_constraint_kinds([C::Linear, C::Quadratic, C::Nonlinear])
            .with_objective_kinds([O::Linear, O::Quadratic, O::Nonlinear])
            .with_performance(perf([5, 4, 3, 2], 3, 3, 3, 3))
            .with_installation(install(open, InstallDifficulty::Moderate, "cyipopt", 3))
            .with_parameter(time_limit("max_cpu_time", 300.0))
            .with_parameter(iterations("max_iter", 3000, 1_000_000))
            .with_parameter(ParameterSpec::float("tol", 1e-8, 1e-12, 1e-2))
            .with_parameter(ParameterSpec::choice(
                "linear_solver",
                "mumps",
                &["mumps", "ma27", "ma57", "ma97"],
            )),
        SolverCapability::new("simulated_annealing", SolverCategory::Metaheuristic)
            .with_display_name("Simulated annealing")
            .with_problem_types([T::CombinatorialOptimization])
            .with_variable_kinds([V::Integer, V::Binary])
            .with_performance(perf([4, 4, 3, 3], 4, 5, 3, 4))
            .with_memory_efficient(true)
            .with_installation(install(open, InstallDifficulty::Bundled, "", 0))
            .with_parameter(time_limit("time_limit", 60.0))
            .with_parameter(iterations("max_iterations", 100_000, 100_000_000))
            .with_parameter(ParameterSpec::float("initial_temperature", 100.0, 0.01, 1e6))
            .with_parameter(ParameterSpec::float("cooling_rate", 0.995, 0.5, 0.99999)),
        SolverCapability::new("genetic_algorithm", SolverCategory::Metaheuristic)
            .with_display_name("Genetic algorithm")
            .with_problem_types([T::CombinatorialOptimization])
            .with_variable_kinds([V::Integer, V::Binary])
            .with_performance(perf([4, 3, 3, 3], 3, 3, 3, 4))
            .with_parallel(true)
            .with_installation(install(open, InstallDifficulty::Bundled, "", 0))
            .with_parameter(time_limit("time_limit", 60.0))
            .with_parameter(threads("workers", 32))
            .with_parameter(ParameterSpec::int("population_size", 100, 10, 10_000))
            .with_parameter(ParameterSpec::float("mutation_rate", 0.05, 0.0, 1.0)),
    ]
}

/// Order in which solvers are tried as fallbacks, per category.
pub fn builtin_fallback_orders() -> Vec<(SolverCategory, Vec<&'static str>)> {
    vec![
        (
            SolverCategory::LinearProgramming,
            vec!["highs", "glop", "clp", "gurobi", "cbc", "scip", "ipopt"],
        ),
        (
            SolverCategory::MixedInteger,
            vec!["gurobi", "highs", "cbc", "scip", "cp_sat"],
        ),
        (
            SolverCategory::ConstraintProgramming,
            vec!["cp_sat", "scip", "cbc", "simulated_annealing"],
        ),
        (SolverCategory::Nonlinear, vec!["ipopt", "scip", "gurobi", "highs"]),
        (
            SolverCategory::Metaheuristic,
            vec!["simulated_annealing", "genetic_algorithm"],
        ),
    ]
}

/// A registry populated with [`builtin_capabilities`] and the built-in
/// fallback orders.
pub fn builtin_registry() -> RegistryResult<SolverRegistry> {
    let registry = SolverRegistry::new();
    for capability in builtin_capabilities() {
        registry.register(capability)?;
    }
    for (category, order) in builtin_fallback_orders() {
        registry.set_category_fallback(category, order.into_iter().map(String::from).collect());
    }
    Ok(registry)
}

/// Preferred solvers by application domain.
pub fn builtin_decision_tree() -> DecisionTree {
    const ALL: [SizeClass; 4] = [
        SizeClass::Small,
        SizeClass::Medium,
        SizeClass::Large,
        SizeClass::VeryLarge,
    ];
    DecisionTree::new()
        .with_entry("scheduling", &ALL, &["cp_sat", "gurobi", "cbc", "scip"])
        .with_entry("production_scheduling", &ALL, &["cp_sat", "gurobi", "highs", "cbc"])
        .with_entry(
            "routing",
            &ALL,
            &["cp_sat", "gurobi", "genetic_algorithm", "simulated_annealing"],
        )
        .with_entry(
            "vehicle_routing",
            &ALL,
            &["cp_sat", "gurobi", "genetic_algorithm", "simulated_annealing"],
        )
        .with_entry("assignment", &ALL, &["cp_sat", "highs", "cbc", "gurobi"])
        .with_entry("portfolio", &ALL, &["gurobi", "ipopt", "scip", "highs"])
        .with_entry("blending", &ALL, &["highs", "glop", "clp"])
        .with_entry("network_flow", &ALL, &["highs", "glop", "clp", "gurobi"])
        .with_entry(
            "timetabling",
            &ALL,
            &["cp_sat", "simulated_annealing", "genetic_algorithm"],
        )
}

/// Maximise `x + y` subject to `x + y <= 1` over binaries by single-flip
/// local search. Returns the objective reached.
fn trivial_local_search() -> u32 {
    let feasible = |x: [u32; 2]| x[0] + x[1] <= 1;
    let mut current = [0u32, 0];
    loop {
        let improved = (0..2).find_map(|i| {
            let mut next = current;
            next[i] ^= 1;
            (feasible(next) && next.iter().sum::<u32>() > current.iter().sum::<u32>()).then_some(next)
        });
        match improved {
            Some(next) => current = next,
            None => return current.iter().sum(),
        }
    }
}

fn in_process_probe() -> FnProbe {
    FnProbe::new(|capability| {
        if trivial_local_search() == 1 {
            ProbeReport::available(Some(env!("CARGO_PKG_VERSION").to_string()))
        } else {
            ProbeReport::unavailable(format!("{} failed the trivial solve", capability.name))
        }
    })
}

/// Availability probes for the built-in solvers, keyed by solver name.
pub fn builtin_probes() -> Vec<(String, Arc<dyn SolverProbe>)> {
    fn entry(name: &str, probe: impl SolverProbe + 'static) -> (String, Arc<dyn SolverProbe>) {
        (name.to_string(), Arc::new(probe))
    }
    let ortools = || CommandProbe::new("python3", ["-c", "import ortools; print(ortools.__version__)"]);

    vec![
        entry("glop", ortools()),
        entry("cp_sat", ortools()),
        entry("clp", CommandProbe::new("clp", ["-quit"])),
        entry("cbc", CommandProbe::new("cbc", ["-quit"])),
        entry("highs", CommandProbe::new("highs", ["--version"])),
        entry("scip", CommandProbe::new("scip", ["--version"])),
        entry("ipopt", CommandProbe::new("ipopt", ["--version"])),
        entry("gurobi", CommandProbe::new("gurobi_cl", ["--version"])),
        entry("simulated_annealing", in_process_probe()),
        entry("genetic_algorithm", in_process_probe()),
    ]
}
