use chrono::{Duration as ChronoDuration, Utc};
use optiroute_foundation::selector::{RuntimeSignals, Scorer};
use optiroute_foundation::{DecisionTree, OutcomeReport, ProblemAnalyzer, SolverRouter};
use optiroute_kernel::config::{RouterConfig, ScoringWeights};
use optiroute_kernel::error::{RegistryError, SelectionError, SolveFailure};
use optiroute_kernel::health::{
    BreakerState, DegradationEvent, DegradationLevel, EventOutcome, FailureReason, ImpactLevel,
    SolveOutcome,
};
use optiroute_kernel::parameter::ParameterValue;
use optiroute_kernel::problem::{ProblemCharacteristics, ProblemSpec, ProblemType, SizeClass};
use optiroute_kernel::solver::{SolverCapability, SolverCategory};
use optiroute_testing::{
    ProblemSpecBuilder, StubProbe, lp_registry, profile, rated_solver, router_with,
    scheduling_registry, scheduling_tree,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

fn scheduling_spec() -> ProblemSpec {
    ProblemSpecBuilder::new()
        .problem_type("mixed_integer_programming")
        .continuous(10)
        .integer(10)
        .linear(12)
        .objective("linear")
        .domain("production_scheduling")
        .build()
}

fn scheduling_router(config: RouterConfig) -> SolverRouter {
    router_with(
        scheduling_registry().unwrap(),
        Some(scheduling_tree()),
        Vec::new(),
        config,
    )
    .unwrap()
}

fn fast_recovery_config() -> RouterConfig {
    let mut config = RouterConfig::default();
    config.circuit_breaker.recovery_timeout_ms = 50;
    config
}

#[test]
fn analyze_is_deterministic() {
    let analyzer = ProblemAnalyzer::new();
    let builder = ProblemSpecBuilder::new()
        .binary(40)
        .integer(20)
        .linear(30)
        .logical(5)
        .objectives("linear", 2)
        .domain("Nurse_Scheduling")
        .time_dependent();
    let spec = builder.clone().build();

    let first = analyzer.analyze(&spec).unwrap();
    for _ in 0..10 {
        assert_eq!(analyzer.analyze(&spec).unwrap(), first);
    }

    let reparsed = ProblemSpec::from_json(&builder.to_json()).unwrap();
    assert_eq!(analyzer.analyze(&reparsed).unwrap(), first);
    assert_eq!(first.domain.as_deref(), Some("nurse_scheduling"));
}

#[test]
fn malformed_spec_lists_every_field() {
    let router = SolverRouter::with_builtin_catalog(RouterConfig::default()).unwrap();
    let spec = ProblemSpecBuilder::new().problem_type("quantum_annealing").build();

    match router.analyze(&spec) {
        Err(SelectionError::InvalidProblemSpec(issues)) => {
            let fields: Vec<&str> = issues.iter().map(|i| i.field.as_str()).collect();
            assert!(fields.contains(&"variables"));
            assert!(fields.contains(&"constraints"));
            assert!(fields.contains(&"problem_type"));
        }
        other => panic!("expected invalid spec, got {other:?}"),
    }
}

#[test]
fn default_weights_sum_to_one() {
    let weights = ScoringWeights::default();
    assert!((weights.sum() - 1.0).abs() < 1e-9);

    let config = RouterConfig::default();
    assert!((config.scoring.weights.sum() - 1.0).abs() < 1e-9);
    assert!(config.validate().is_ok());
}

#[test]
fn performance_component_is_monotone_in_rating() {
    let scorer = Scorer::new(ScoringWeights::default(), 0.8);
    let signals = RuntimeSignals {
        available: true,
        success_rate: None,
    };

    for size in SizeClass::ALL {
        let chars = ProblemCharacteristics::minimal(ProblemType::LinearProgramming, size);
        let mut previous = f64::MIN;
        for rating in 1..=5u8 {
            let mut perf = profile(3);
            match size {
                SizeClass::Small => perf.small = rating,
                SizeClass::Medium => perf.medium = rating,
                SizeClass::Large => perf.large = rating,
                SizeClass::VeryLarge => perf.very_large = rating,
            }
            let cap = SolverCapability::new("lp", SolverCategory::LinearProgramming)
                .with_problem_types([ProblemType::LinearProgramming])
                .with_performance(perf);
            let score = scorer.score(&cap, &chars, signals).components.performance;
            assert!(score >= previous, "rating {rating} on {size} scored {score} < {previous}");
            previous = score;
        }
    }
}

#[tokio::test]
async fn breaker_walks_its_state_machine() {
    let router = scheduling_router(fast_recovery_config());
    let chars = router.analyze(&scheduling_spec()).unwrap();
    let health = router.health();

    for _ in 0..2 {
        router
            .degradation()
            .handle_failure("alpha", &chars, &SolveFailure::Timeout(30.0), BTreeMap::new())
            .await;
    }
    assert_eq!(health.breaker_state("alpha"), BreakerState::Closed);

    router
        .degradation()
        .handle_failure("alpha", &chars, &SolveFailure::Timeout(30.0), BTreeMap::new())
        .await;
    assert_eq!(health.breaker_state("alpha"), BreakerState::Open);
    assert!(!router.selector().is_usable("alpha"));

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(router.selector().is_usable("alpha"));
    assert_eq!(health.breaker_state("alpha"), BreakerState::HalfOpen);

    // One failure while half-open reopens.
    router
        .degradation()
        .handle_failure("alpha", &chars, &SolveFailure::Crash("abort".into()), BTreeMap::new())
        .await;
    assert_eq!(health.breaker_state("alpha"), BreakerState::Open);

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(health.breaker_state("alpha"), BreakerState::HalfOpen);
    for i in 0..3 {
        assert_eq!(health.breaker_state("alpha"), BreakerState::HalfOpen, "success {i}");
        router.degradation().handle_success(
            "alpha",
            ProblemType::MixedIntegerProgramming,
            None,
            1.0,
            1.0,
        );
    }
    assert_eq!(health.breaker_state("alpha"), BreakerState::Closed);
}

#[tokio::test]
async fn exhausted_candidates_are_an_error() {
    let bravo = StubProbe::new(true);
    let charlie = StubProbe::new(true);
    let router = router_with(
        scheduling_registry().unwrap(),
        Some(scheduling_tree()),
        vec![
            ("bravo".to_string(), bravo.shared()),
            ("charlie".to_string(), charlie.shared()),
        ],
        RouterConfig::default(),
    )
    .unwrap();
    let chars = router.analyze(&scheduling_spec()).unwrap();
    router.refresh_availability().await;
    assert!(router.select(&chars, None).is_ok());

    for _ in 0..3 {
        router.health().record_failure("alpha", FailureReason::Crash);
    }
    bravo.set_available(false);
    charlie.set_available(false);
    let availability = router.refresh_availability().await;
    assert_eq!(availability.get("bravo"), Some(&false));
    assert!(bravo.calls() >= 2);

    match router.select(&chars, None) {
        Err(SelectionError::NoSolverAvailable { problem_type, .. }) => {
            assert_eq!(problem_type, ProblemType::MixedIntegerProgramming);
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }

    // A preferred solver that is circuit-open is never returned.
    assert!(router.select(&chars, Some("alpha")).is_err());
}

#[test]
fn duplicate_registration_keeps_original() {
    let registry = scheduling_registry().unwrap();
    let before = registry.get("alpha").unwrap();

    let impostor = rated_solver(
        "alpha",
        SolverCategory::Metaheuristic,
        &[ProblemType::CombinatorialOptimization],
        1,
    );
    assert_eq!(
        registry.register(impostor),
        Err(RegistryError::DuplicateSolver("alpha".to_string()))
    );
    assert_eq!(registry.get("alpha").unwrap(), before);
    assert_eq!(registry.len(), 3);
}

#[tokio::test]
async fn small_lp_selects_linear_solver() {
    let router =
        router_with(lp_registry().unwrap(), None, Vec::new(), RouterConfig::default()).unwrap();
    let spec = ProblemSpecBuilder::small_lp().build();

    let plan = router.plan(&spec, None).unwrap();
    let selection = &plan.selection;
    assert_eq!(selection.characteristics.problem_type, ProblemType::LinearProgramming);
    assert_eq!(selection.characteristics.size, SizeClass::Small);

    let primary = router.registry().get(&selection.primary_solver).unwrap();
    assert_eq!(primary.category, SolverCategory::LinearProgramming);
    assert!(selection.confidence_score > 0.5, "confidence {}", selection.confidence_score);
    assert!(!selection.is_fallback);
    assert!(!selection.backup_solvers.contains(&selection.primary_solver));
}

#[tokio::test]
async fn fallback_after_third_failure() {
    let router = scheduling_router(RouterConfig::default());
    let chars = router.analyze(&scheduling_spec()).unwrap();
    assert_eq!(chars.domain.as_deref(), Some("production_scheduling"));

    let primary = router.select(&chars, None).unwrap().primary_solver;
    assert_eq!(primary, "alpha");

    for _ in 0..2 {
        let report = router
            .degradation()
            .handle_failure("alpha", &chars, &SolveFailure::Timeout(60.0), BTreeMap::new())
            .await;
        assert_eq!(report.fallback_solver.as_deref(), Some("bravo"));
        assert_eq!(router.select(&chars, None).unwrap().primary_solver, "alpha");
    }

    router
        .degradation()
        .handle_failure("alpha", &chars, &SolveFailure::Timeout(60.0), BTreeMap::new())
        .await;

    let chain = router.selector().fallback_chain(&chars, None, &[]);
    assert_eq!(chain, vec!["bravo", "charlie"]);
    let selection = router.select(&chars, None).unwrap();
    assert_ne!(selection.primary_solver, "alpha");
    assert_eq!(selection.primary_solver, chain[0]);
    assert!(selection.solver_scores.iter().all(|s| s.solver_name != "alpha"));
}

#[tokio::test]
async fn fallback_follows_configured_chain_over_scores() {
    // charlie is rated below bravo but the domain lists it first.
    let tree = DecisionTree::new().with_entry(
        "production_scheduling",
        &[SizeClass::Small, SizeClass::Medium],
        &["alpha", "charlie", "bravo"],
    );
    let router = router_with(
        scheduling_registry().unwrap(),
        Some(tree),
        Vec::new(),
        RouterConfig::default(),
    )
    .unwrap();
    let chars = router.analyze(&scheduling_spec()).unwrap();

    let selection = router.select(&chars, None).unwrap();
    assert_eq!(selection.primary_solver, "alpha");
    assert_eq!(selection.backup_solvers, vec!["charlie", "bravo"]);
    assert_eq!(selection.fallback_chain, vec!["charlie", "bravo"]);

    for _ in 0..3 {
        let report = router
            .degradation()
            .handle_failure("alpha", &chars, &SolveFailure::Timeout(60.0), BTreeMap::new())
            .await;
        assert_eq!(report.fallback_solver.as_deref(), Some("charlie"));
    }
    assert_eq!(router.health().breaker_state("alpha"), BreakerState::Open);

    let selection = router.select(&chars, None).unwrap();
    assert_eq!(selection.primary_solver, "charlie");
    assert_eq!(selection.backup_solvers, vec!["bravo"]);
    let chain = router.selector().fallback_chain(&chars, None, &[]);
    assert_eq!(chain.first().map(String::as_str), Some("charlie"));
}

#[test]
fn degradation_level_follows_window() {
    let router = scheduling_router(RouterConfig::default());
    let degradation = router.degradation();

    for _ in 0..4 {
        degradation.record_event(
            DegradationEvent::new(
                "alpha",
                ProblemType::MixedIntegerProgramming,
                FailureReason::Crash,
                None,
                EventOutcome::Exhausted,
            )
            .with_impact(ImpactLevel::Severe),
        );
    }
    assert_eq!(degradation.degradation_level(), DegradationLevel::Critical);
    assert_eq!(router.system_status().degradation_level, DegradationLevel::Critical);

    let later = Utc::now() + ChronoDuration::seconds(3601);
    assert_eq!(degradation.degradation_level_at(later), DegradationLevel::None);

    degradation.clear_events();
    assert_eq!(degradation.degradation_level(), DegradationLevel::None);
}

#[tokio::test]
async fn time_limit_never_exceeds_its_max() {
    let router = SolverRouter::with_builtin_catalog(RouterConfig::default()).unwrap();
    let chars =
        ProblemCharacteristics::minimal(ProblemType::MixedIntegerProgramming, SizeClass::VeryLarge);

    for _ in 0..12 {
        router
            .apply_outcome(OutcomeReport::new(
                "cbc",
                chars.clone(),
                SolveOutcome::failure(SolveFailure::Timeout(3600.0), 3600.0),
            ))
            .await;
        let params = router.synthesize("cbc", ProblemType::MixedIntegerProgramming, &chars);
        let seconds = params.get("seconds").and_then(ParameterValue::as_f64).unwrap();
        assert!(seconds <= 3600.0, "time limit {seconds}");
    }

    let profile = router
        .synthesizer()
        .profile("cbc", ProblemType::MixedIntegerProgramming)
        .unwrap();
    assert_eq!(profile.usage_count, 12);
    assert!(profile.success_rate < 0.7);
}

#[tokio::test]
async fn reported_outcomes_reach_health() {
    let router = Arc::new(scheduling_router(RouterConfig::default()));
    let worker = router.spawn_outcome_worker().unwrap();
    let chars = router.analyze(&scheduling_spec()).unwrap();

    let failure = SolveOutcome::failure(SolveFailure::Crash("oom".into()), 2.0);
    router.report_outcome(OutcomeReport::new("bravo", chars, failure).with_detail("attempt", "1"));

    let mut recorded = false;
    for _ in 0..100 {
        if !router.degradation().recent_events(10).is_empty() {
            recorded = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(recorded);

    let event = &router.degradation().recent_events(1)[0];
    assert_eq!(event.solver_name, "bravo");
    assert_eq!(event.details.get("attempt").map(String::as_str), Some("1"));
    assert_eq!(event.fallback_solver.as_deref(), Some("alpha"));
    assert_eq!(router.health().metrics("bravo").unwrap().consecutive_failures, 1);
    worker.abort();
}

#[test]
fn config_file_drives_router() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("router.toml");
    std::fs::write(
        &path,
        "[scoring]\nmax_backups = 1\n\n[circuit_breaker]\nfailure_threshold = 5\n",
    )
    .unwrap();

    let config = RouterConfig::load(path.to_str().unwrap()).unwrap();
    assert_eq!(config.scoring.max_backups, 1);
    assert_eq!(config.circuit_breaker.failure_threshold, 5);

    let router = router_with(lp_registry().unwrap(), None, Vec::new(), config).unwrap();
    let chars = ProblemCharacteristics::minimal(ProblemType::LinearProgramming, SizeClass::Small);
    let selection = router.select(&chars, None).unwrap();
    assert_eq!(selection.backup_solvers.len(), 1);
}
