//! Solver selection.
//!
//! [`SolverSelector::select`] is the synchronous fast path: it reads the
//! registry, the prober's cache and the circuit breakers, and never probes
//! or blocks on I/O.

pub mod decision_tree;
pub mod reformulation;
pub mod scoring;

pub use decision_tree::DecisionTree;
pub use scoring::{RuntimeSignals, ScoreBreakdown, Scorer};

use crate::health::HealthManager;
use crate::prober::AvailabilityProber;
use crate::registry::SolverRegistry;
use chrono::Utc;
use optiroute_kernel::config::ScoringSettings;
use optiroute_kernel::error::{SelectionError, SelectionResult};
use optiroute_kernel::problem::{ProblemCharacteristics, ProblemType};
use optiroute_kernel::selection::{Adaptation, SolverScore, SolverSelection};
use optiroute_kernel::solver::SolverCategory;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, error, info};

pub struct SolverSelector {
    registry: Arc<SolverRegistry>,
    prober: Arc<AvailabilityProber>,
    health: Arc<HealthManager>,
    scorer: Scorer,
    settings: ScoringSettings,
    tree: DecisionTree,
}

impl SolverSelector {
    pub fn new(
        registry: Arc<SolverRegistry>,
        prober: Arc<AvailabilityProber>,
        health: Arc<HealthManager>,
        settings: ScoringSettings,
    ) -> Self {
        Self {
            registry,
            prober,
            health,
            scorer: Scorer::new(settings.weights, settings.default_reliability),
            settings,
            tree: DecisionTree::default(),
        }
    }

    pub fn with_decision_tree(mut self, tree: DecisionTree) -> Self {
        self.tree = tree;
        self
    }

    pub fn decision_tree(&self) -> &DecisionTree {
        &self.tree
    }

    pub fn settings(&self) -> &ScoringSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<SolverRegistry> {
        &self.registry
    }

    /// Available (per the prober's cache) and not circuit-broken.
    pub fn is_usable(&self, name: &str) -> bool {
        self.prober.is_available_cached(name) && self.health.is_usable(name)
    }

    /// Pick a primary solver, backups and a fallback chain.
    ///
    /// A usable `preferred` solver that supports the problem type is taken
    /// as-is. Otherwise candidates are scored and ranked; when the decision
    /// tree has an entry for the domain and size, its solvers lead in tree
    /// order. When no compatible solver is usable, the fallback chain and
    /// then the known reformulations are tried before giving up.
    pub fn select(
        &self,
        chars: &ProblemCharacteristics,
        preferred: Option<&str>,
    ) -> SelectionResult<SolverSelection> {
        if let Some(name) = preferred {
            if let Some(selection) = self.select_preferred(chars, name) {
                return Ok(selection);
            }
            debug!(solver = name, "Preferred solver not usable, scoring candidates");
        }
        self.select_excluding(chars, &[])
    }

    /// [`select`](Self::select) without a preference, never returning a
    /// solver named in `exclude`. Used for re-selection after a failure.
    ///
    /// Each compatible solver turned away by an open breaker counts one
    /// rejection per call.
    pub fn select_excluding(
        &self,
        chars: &ProblemCharacteristics,
        exclude: &[String],
    ) -> SelectionResult<SolverSelection> {
        let candidates = self.admitted(chars, exclude);
        if !candidates.is_empty() {
            let scores = self.rank(chars, &candidates);
            return Ok(self.build(chars, scores, exclude, false, None));
        }

        // Low-rated but usable solvers for the exact type.
        let chain = self.fallback_chain(chars, None, exclude);
        if !chain.is_empty() {
            info!(
                problem_type = %chars.problem_type,
                size = %chars.size,
                chain = ?chain,
                "No compatible solver usable, using fallback chain"
            );
            let scores = self.rank(chars, &chain);
            return Ok(self.build(chars, scores, exclude, true, None));
        }

        if let Some(selection) = self.select_reformulated(chars, exclude) {
            return Ok(selection);
        }

        let reason = if exclude.is_empty() {
            "every compatible solver is unavailable or circuit-open, and no reformulation applies"
                .to_string()
        } else {
            format!(
                "no usable solver besides {} and no reformulation applies",
                exclude.join(", ")
            )
        };
        error!(
            problem_type = %chars.problem_type,
            size = %chars.size,
            reason = %reason,
            "No solver available"
        );
        Err(SelectionError::NoSolverAvailable {
            problem_type: chars.problem_type,
            size: chars.size,
            reason,
        })
    }

    /// Ordered alternatives for `chars`: the decision-tree preference for
    /// the domain (if any) followed by the category fallback order, keeping
    /// only registered, usable solvers that support the problem type.
    pub fn fallback_chain(
        &self,
        chars: &ProblemCharacteristics,
        primary: Option<&str>,
        exclude: &[String],
    ) -> Vec<String> {
        let preferred = chars
            .domain
            .as_deref()
            .and_then(|domain| self.tree.preferred(domain, chars.size))
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        let category = self
            .registry
            .category_fallback(SolverCategory::for_problem_type(chars.problem_type));

        let mut chain: Vec<String> = Vec::new();
        for name in preferred.into_iter().chain(category) {
            if chain.len() >= self.settings.max_fallback_chain {
                break;
            }
            if Some(name.as_str()) == primary || exclude.contains(&name) || chain.contains(&name) {
                continue;
            }
            let supports = self
                .registry
                .get(&name)
                .map(|c| c.supports(chars.problem_type))
                .unwrap_or(false);
            if supports && self.is_usable(&name) {
                chain.push(name);
            }
        }
        chain
    }

    fn candidates(&self, chars: &ProblemCharacteristics, exclude: &[String]) -> Vec<String> {
        self.registry
            .list_compatible_with(chars.problem_type, chars.size, self.settings.min_profile_rating)
            .into_iter()
            .filter(|name| !exclude.contains(name))
            .filter(|name| self.is_usable(name))
            .collect()
    }

    /// [`candidates`](Self::candidates) for a selection decision: breakers
    /// are asked through [`HealthManager::admit`] so open ones count the
    /// rejection.
    fn admitted(&self, chars: &ProblemCharacteristics, exclude: &[String]) -> Vec<String> {
        self.registry
            .list_compatible_with(chars.problem_type, chars.size, self.settings.min_profile_rating)
            .into_iter()
            .filter(|name| !exclude.contains(name))
            .filter(|name| self.prober.is_available_cached(name))
            .filter(|name| self.health.admit(name))
            .collect()
    }

    fn select_preferred(&self, chars: &ProblemCharacteristics, name: &str) -> Option<SolverSelection> {
        let capability = self.registry.get(name).ok()?;
        if !capability.supports(chars.problem_type) || !self.is_usable(name) {
            return None;
        }
        let scores = self.rank(chars, &[name.to_string()]);
        let mut selection = self.build(chars, scores, &[], false, None);
        selection.backup_solvers = self
            .candidates(chars, &[name.to_string()])
            .into_iter()
            .take(self.settings.max_backups)
            .collect();
        // Confidence reflects only the solver's own score.
        selection.confidence_score = selection
            .primary_score()
            .map(|s| scoring::confidence(s.total_score, 0.0, chars.complexity.weight()))
            .unwrap_or(0.0);
        info!(solver = name, "Using preferred solver");
        Some(selection)
    }

    fn select_reformulated(
        &self,
        chars: &ProblemCharacteristics,
        exclude: &[String],
    ) -> Option<SolverSelection> {
        for (method, adapted_type) in reformulation::alternatives(chars.problem_type) {
            let mut adapted = chars.clone();
            adapted.problem_type = adapted_type;

            let mut names = self.candidates(&adapted, exclude);
            if names.is_empty() {
                names = self.fallback_chain(&adapted, None, exclude);
            }
            if names.is_empty() {
                continue;
            }

            info!(
                problem_type = %chars.problem_type,
                adapted_type = %adapted_type,
                method = ?method,
                "Selecting through reformulation"
            );
            let mut scores = self.rank(&adapted, &names);
            for score in &mut scores {
                score.rationale = format!("adapted: {}; {}", method.description(), score.rationale);
            }
            let adaptation = Adaptation {
                method,
                original_type: chars.problem_type,
                adapted_type,
            };
            return Some(self.build(&adapted, scores, exclude, true, Some(adaptation)));
        }
        None
    }

    /// Score `names` and sort best first. Ties go to the lexically smaller
    /// name so ranking is deterministic. Solvers the decision tree prefers
    /// for the domain and size then move to the front in tree order.
    fn rank(&self, chars: &ProblemCharacteristics, names: &[String]) -> Vec<SolverScore> {
        let mut scores: Vec<SolverScore> = names
            .iter()
            .filter_map(|name| self.registry.get(name).ok())
            .map(|capability| {
                let signals = RuntimeSignals {
                    available: self.prober.is_available_cached(&capability.name),
                    success_rate: self.health.reliability(&capability.name),
                };
                let breakdown = self.scorer.score(&capability, chars, signals);
                SolverScore {
                    rationale: rationale(&breakdown),
                    solver_name: capability.name,
                    total_score: breakdown.total,
                    components: breakdown.components,
                    rank: 0,
                    estimated_solve_time_secs: breakdown.estimated_solve_time_secs,
                    estimated_quality: breakdown.estimated_quality,
                }
            })
            .collect();

        scores.sort_by(|a, b| {
            b.total_score
                .partial_cmp(&a.total_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.solver_name.cmp(&b.solver_name))
        });
        if let Some(preferred) = chars
            .domain
            .as_deref()
            .and_then(|domain| self.tree.preferred(domain, chars.size))
        {
            // Stable: solvers outside the tree keep their score order.
            scores.sort_by_key(|s| {
                preferred
                    .iter()
                    .position(|p| *p == s.solver_name)
                    .unwrap_or(usize::MAX)
            });
        }
        for (i, score) in scores.iter_mut().enumerate() {
            score.rank = i + 1;
        }
        scores
    }

    /// Assemble the selection from ranked scores. `scores` is never empty
    /// here: every caller passes at least one registered name.
    fn build(
        &self,
        chars: &ProblemCharacteristics,
        scores: Vec<SolverScore>,
        exclude: &[String],
        is_fallback: bool,
        adaptation: Option<Adaptation>,
    ) -> SolverSelection {
        let primary = scores
            .first()
            .map(|s| s.solver_name.clone())
            .unwrap_or_default();
        let backups: Vec<String> = scores
            .iter()
            .skip(1)
            .take(self.settings.max_backups)
            .map(|s| s.solver_name.clone())
            .collect();

        let top = scores.first().map(|s| s.total_score).unwrap_or(0.0);
        // Tree order can put a lower score first; that is no margin at all.
        let gap = match scores.get(1) {
            Some(second) => (top - second.total_score).max(0.0),
            None => top,
        };
        let confidence = scoring::confidence(top, gap, chars.complexity.weight());
        let fallback_chain = self.fallback_chain(chars, Some(&primary), exclude);

        debug!(
            primary = %primary,
            backups = ?backups,
            confidence,
            is_fallback,
            "Solver selected"
        );

        SolverSelection {
            primary_solver: primary,
            backup_solvers: backups,
            solver_scores: scores,
            fallback_chain,
            confidence_score: confidence,
            characteristics: chars.clone(),
            is_fallback,
            adaptation,
            selected_at: Utc::now(),
        }
    }
}

fn rationale(breakdown: &ScoreBreakdown) -> String {
    let c = &breakdown.components;
    format!(
        "fit {:.2}, performance {:.2}, reliability {:.2}, availability {:.2}, scalability {:.2}; ~{:.1}s",
        c.problem_fit,
        c.performance,
        c.reliability,
        c.availability,
        c.scalability,
        breakdown.estimated_solve_time_secs
    )
}

impl std::fmt::Debug for SolverSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolverSelector")
            .field("settings", &self.settings)
            .field("domains", &self.tree.domains())
            .finish_non_exhaustive()
    }
}

/// Problem types a solver set covers, for diagnostics.
pub fn covered_types(registry: &SolverRegistry) -> Vec<ProblemType> {
    ProblemType::ALL
        .into_iter()
        .filter(|t| registry.list_all().iter().any(|c| c.supports(*t)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prober::probes::StaticProbe;
    use optiroute_kernel::config::{CircuitBreakerSettings, ProberSettings};
    use optiroute_kernel::problem::SizeClass;
    use optiroute_kernel::selection::Reformulation;
    use optiroute_kernel::solver::{PerformanceProfile, SolverCapability, SolverStatus};

    fn profile(rating: u8) -> PerformanceProfile {
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

    fn solver(name: &str, category: SolverCategory, types: &[ProblemType], rating: u8) -> SolverCapability {
        SolverCapability::new(name, category)
            .with_problem_types(types.iter().copied())
            .with_performance(profile(rating))
            .with_status(SolverStatus::Available)
    }

    struct Fixture {
        registry: Arc<SolverRegistry>,
        prober: Arc<AvailabilityProber>,
        health: Arc<HealthManager>,
    }

    impl Fixture {
        fn new(solvers: Vec<SolverCapability>) -> Self {
            let registry = Arc::new(SolverRegistry::new());
            for s in solvers {
                registry.register(s).unwrap();
            }
            let prober = Arc::new(AvailabilityProber::new(registry.clone(), ProberSettings::default()));
            let health = Arc::new(HealthManager::new(CircuitBreakerSettings::default()));
            Self {
                registry,
                prober,
                health,
            }
        }

        fn selector(&self) -> SolverSelector {
            SolverSelector::new(
                self.registry.clone(),
                self.prober.clone(),
                self.health.clone(),
                ScoringSettings::default(),
            )
        }

        fn mark_unavailable(&self, name: &str) {
            self.registry
                .update_status(name, SolverStatus::Unavailable, None, Utc::now())
                .unwrap();
        }

        fn open_breaker(&self, name: &str) {
            for _ in 0..3 {
                self.health
                    .record_failure(name, optiroute_kernel::health::FailureReason::Crash);
            }
        }
    }

    fn lp_fixture() -> Fixture {
        Fixture::new(vec![
            solver("glop", SolverCategory::LinearProgramming, &[ProblemType::LinearProgramming], 4),
            solver("clp", SolverCategory::LinearProgramming, &[ProblemType::LinearProgramming], 5),
            solver(
                "cbc",
                SolverCategory::MixedInteger,
                &[ProblemType::LinearProgramming, ProblemType::MixedIntegerProgramming],
                3,
            ),
        ])
    }

    fn lp_small() -> ProblemCharacteristics {
        ProblemCharacteristics::minimal(ProblemType::LinearProgramming, SizeClass::Small)
    }

    #[test]
    fn test_ranks_by_score() {
        let fixture = lp_fixture();
        let selection = fixture.selector().select(&lp_small(), None).unwrap();

        assert_eq!(selection.primary_solver, "clp");
        assert_eq!(selection.backup_solvers, vec!["glop", "cbc"]);
        assert!(!selection.is_fallback);
        assert!(selection.confidence_score > 0.5);
        let ranks: Vec<usize> = selection.solver_scores.iter().map(|s| s.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert!(!selection.fallback_chain.contains(&"clp".to_string()));
    }

    #[test]
    fn test_preferred_solver_short_circuits() {
        let fixture = lp_fixture();
        let selection = fixture.selector().select(&lp_small(), Some("cbc")).unwrap();
        assert_eq!(selection.primary_solver, "cbc");
        assert!(!selection.is_fallback);
        assert!(!selection.backup_solvers.contains(&"cbc".to_string()));

        // Unknown preference falls through to scoring.
        let selection = fixture.selector().select(&lp_small(), Some("nope")).unwrap();
        assert_eq!(selection.primary_solver, "clp");
    }

    #[test]
    fn test_unusable_solvers_are_skipped() {
        let fixture = lp_fixture();
        fixture.mark_unavailable("clp");
        fixture.open_breaker("glop");

        let selection = fixture.selector().select(&lp_small(), Some("glop")).unwrap();
        assert_eq!(selection.primary_solver, "cbc");
        assert!(selection.backup_solvers.is_empty());
    }

    #[test]
    fn test_exhaustion_is_an_error() {
        let fixture = Fixture::new(vec![solver(
            "glop",
            SolverCategory::LinearProgramming,
            &[ProblemType::LinearProgramming],
            4,
        )]);
        fixture.open_breaker("glop");
        let err = fixture.selector().select(&lp_small(), None).unwrap_err();
        assert!(err.is_exhausted());
    }

    #[test]
    fn test_exclusion() {
        let fixture = lp_fixture();
        let selection = fixture
            .selector()
            .select_excluding(&lp_small(), &["clp".to_string()])
            .unwrap();
        assert_eq!(selection.primary_solver, "glop");
        assert!(!selection.fallback_chain.contains(&"clp".to_string()));
    }

    #[test]
    fn test_low_rated_solver_used_as_fallback() {
        let fixture = Fixture::new(vec![solver(
            "weak",
            SolverCategory::LinearProgramming,
            &[ProblemType::LinearProgramming],
            2,
        )]);
        let selection = fixture.selector().select(&lp_small(), None).unwrap();
        assert_eq!(selection.primary_solver, "weak");
        assert!(selection.is_fallback);
        assert!(selection.adaptation.is_none());
    }

    #[test]
    fn test_reformulation_relaxes_integrality() {
        let fixture = Fixture::new(vec![solver(
            "glop",
            SolverCategory::LinearProgramming,
            &[ProblemType::LinearProgramming],
            4,
        )]);
        let chars = ProblemCharacteristics::minimal(ProblemType::MixedIntegerProgramming, SizeClass::Small);
        let selection = fixture.selector().select(&chars, None).unwrap();

        assert_eq!(selection.primary_solver, "glop");
        assert!(selection.is_fallback);
        let adaptation = selection.adaptation.unwrap();
        assert_eq!(adaptation.method, Reformulation::RelaxIntegrality);
        assert_eq!(adaptation.original_type, ProblemType::MixedIntegerProgramming);
        assert!(selection.solver_scores[0].rationale.starts_with("adapted:"));
    }

    #[test]
    fn test_domain_preference_leads_fallback_chain() {
        let fixture = lp_fixture();
        let selector = fixture.selector().with_decision_tree(
            DecisionTree::new().with_entry("blending", &[SizeClass::Small], &["cbc", "glop"]),
        );
        let selection = selector.select(&lp_small().with_domain("blending"), None).unwrap();
        assert_eq!(selection.primary_solver, "cbc");
        assert_eq!(selection.backup_solvers, vec!["glop", "clp"]);
        assert_eq!(selection.fallback_chain.first().map(String::as_str), Some("glop"));
        assert!(selection.fallback_chain.len() <= selector.settings().max_fallback_chain);
        let ranks: Vec<usize> = selection.solver_scores.iter().map(|s| s.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert!(selection.confidence_score > 0.0);

        // Other domains and sizes keep plain score order.
        let selection = selector.select(&lp_small().with_domain("refinery"), None).unwrap();
        assert_eq!(selection.primary_solver, "clp");
    }

    #[test]
    fn test_domain_preference_drives_reselection() {
        let fixture = lp_fixture();
        let selector = fixture.selector().with_decision_tree(
            DecisionTree::new().with_entry("blending", &[SizeClass::Small], &["clp", "cbc", "glop"]),
        );
        let chars = lp_small().with_domain("blending");
        let selection = selector
            .select_excluding(&chars, &["clp".to_string()])
            .unwrap();
        assert_eq!(selection.primary_solver, "cbc");

        fixture.open_breaker("clp");
        assert_eq!(selector.select(&chars, None).unwrap().primary_solver, "cbc");
    }

    #[test]
    fn test_open_breaker_counts_one_rejection_per_selection() {
        let fixture = lp_fixture();
        fixture.open_breaker("clp");
        let selector = fixture.selector();
        let rejected = || {
            fixture
                .health
                .get("clp")
                .map(|h| h.breaker().metrics().total_rejected())
                .unwrap_or(0)
        };
        assert_eq!(rejected(), 0);

        selector.select(&lp_small(), None).unwrap();
        assert_eq!(rejected(), 1);

        // Preferred solver path and plain usability reads do not count.
        selector.select(&lp_small(), Some("glop")).unwrap();
        assert!(!selector.is_usable("clp"));
        selector.fallback_chain(&lp_small(), None, &[]);
        assert_eq!(rejected(), 1);

        selector.select(&lp_small(), Some("clp")).unwrap();
        assert_eq!(rejected(), 2);
    }

    #[tokio::test]
    async fn test_probed_availability_is_respected() {
        let fixture = lp_fixture();
        fixture
            .prober
            .register_probe("clp", Arc::new(StaticProbe::unavailable("missing")));
        fixture.prober.check_availability("clp").await;
        let selection = fixture.selector().select(&lp_small(), None).unwrap();
        assert_ne!(selection.primary_solver, "clp");
    }

    #[test]
    fn test_covered_types() {
        let fixture = lp_fixture();
        assert_eq!(
            covered_types(&fixture.registry),
            vec![ProblemType::LinearProgramming, ProblemType::MixedIntegerProgramming]
        );
    }
}
