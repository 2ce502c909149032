//! Weighted multi-criteria solver scoring.

use optiroute_kernel::config::ScoringWeights;
use optiroute_kernel::problem::{ProblemCharacteristics, SizeClass};
use optiroute_kernel::selection::ComponentScores;
use optiroute_kernel::solver::{InstallDifficulty, PerformanceProfile, SolverCapability, SolverCategory};
use std::collections::BTreeSet;

/// Runtime inputs to scoring that do not live on the capability record.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeSignals {
    pub available: bool,
    /// Observed success rate, `None` without history.
    pub success_rate: Option<f64>,
}

/// Full result for one candidate.
#[derive(Debug, Clone)]
pub struct ScoreBreakdown {
    pub components: ComponentScores,
    pub total: f64,
    pub estimated_solve_time_secs: f64,
    pub estimated_quality: f64,
}

#[derive(Debug, Clone)]
pub struct Scorer {
    weights: ScoringWeights,
    default_reliability: f64,
}

impl Scorer {
    pub fn new(weights: ScoringWeights, default_reliability: f64) -> Self {
        Self {
            weights,
            default_reliability,
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn score(
        &self,
        capability: &SolverCapability,
        chars: &ProblemCharacteristics,
        signals: RuntimeSignals,
    ) -> ScoreBreakdown {
        let components = ComponentScores {
            problem_fit: problem_fit(capability, chars),
            performance: performance(capability, chars),
            reliability: reliability(
                capability,
                signals.success_rate.unwrap_or(self.default_reliability),
            ),
            availability: availability(capability, signals.available),
            scalability: scalability(capability, chars),
        };
        let w = &self.weights;
        let total = (w.problem_fit * components.problem_fit
            + w.performance * components.performance
            + w.reliability * components.reliability
            + w.availability * components.availability
            + w.scalability * components.scalability)
            .clamp(0.0, 1.0);

        ScoreBreakdown {
            components,
            total,
            estimated_solve_time_secs: estimated_solve_time(capability, chars),
            estimated_quality: estimated_quality(capability, chars),
        }
    }
}

/// Fraction of the problem's kinds the solver supports. A solver that
/// declares no kinds for a dimension is taken to accept any.
fn coverage<T: Ord>(required: &[T], supported: &BTreeSet<T>) -> f64 {
    if required.is_empty() || supported.is_empty() {
        return 1.0;
    }
    let hit = required.iter().filter(|k| supported.contains(k)).count();
    hit as f64 / required.len() as f64
}

/// How far `actual` exceeds `limit`, relative to the limit, capped at 1.
fn overshoot(actual: u64, limit: Option<u64>) -> f64 {
    match limit {
        Some(limit) if actual > limit => ((actual - limit) as f64 / limit as f64).min(1.0),
        _ => 0.0,
    }
}

/// Remaining room under `limit` as a fraction of it.
fn headroom(actual: u64, limit: Option<u64>) -> f64 {
    match limit {
        Some(limit) => (1.0 - actual as f64 / limit as f64).clamp(0.0, 1.0),
        None => 1.0,
    }
}

pub(crate) fn problem_fit(capability: &SolverCapability, chars: &ProblemCharacteristics) -> f64 {
    let overlap = (coverage(&chars.variables.kinds(), &capability.variable_kinds)
        + coverage(&chars.constraints.kinds(), &capability.constraint_kinds)
        + coverage(&chars.objective.kinds(), &capability.objective_kinds))
        / 3.0;
    let native = SolverCategory::for_problem_type(chars.problem_type) == capability.category;
    let base = 0.85 * overlap + if native { 0.15 } else { 0.05 };
    let penalty = 0.5
        * (overshoot(chars.variable_count(), capability.max_variables)
            + overshoot(chars.constraint_count(), capability.max_constraints));
    (base - penalty).clamp(0.0, 1.0)
}

pub(crate) fn performance(capability: &SolverCapability, chars: &ProblemCharacteristics) -> f64 {
    let profile = &capability.performance;
    let size = PerformanceProfile::normalized(profile.rating_for(chars.size));
    let quality = chars.hints.quality_preference().clamp(0.0, 1.0);
    let bias = (1.0 - quality) * PerformanceProfile::normalized(profile.speed)
        + quality * PerformanceProfile::normalized(profile.robustness);
    (0.6 * size + 0.4 * bias).clamp(0.0, 1.0)
}

pub(crate) fn reliability(capability: &SolverCapability, success_rate: f64) -> f64 {
    let profile = &capability.performance;
    (0.3 * PerformanceProfile::normalized(profile.robustness)
        + 0.2 * PerformanceProfile::normalized(profile.numerical_stability)
        + 0.5 * success_rate.clamp(0.0, 1.0))
    .clamp(0.0, 1.0)
}

pub(crate) fn availability(capability: &SolverCapability, available: bool) -> f64 {
    if !available {
        return 0.0;
    }
    let install = match capability.installation.difficulty {
        InstallDifficulty::Bundled => 0.1,
        InstallDifficulty::Easy => 0.05,
        InstallDifficulty::Moderate => 0.0,
        InstallDifficulty::Hard => -0.05,
    };
    let dependencies = 0.01 * f64::from(capability.installation.dependency_count.min(5));
    (0.9 + install - dependencies).clamp(0.0, 1.0)
}

pub(crate) fn scalability(capability: &SolverCapability, chars: &ProblemCharacteristics) -> f64 {
    let room = (headroom(chars.variable_count(), capability.max_variables)
        + headroom(chars.constraint_count(), capability.max_constraints))
        / 2.0;
    if chars.size.is_large() {
        let parallel = if capability.parallel_capable { 0.2 } else { 0.0 };
        let memory = if capability.memory_efficient { 0.2 } else { 0.0 };
        (0.6 * room + parallel + memory).clamp(0.0, 1.0)
    } else {
        room
    }
}

fn estimated_solve_time(capability: &SolverCapability, chars: &ProblemCharacteristics) -> f64 {
    let base = match chars.size {
        SizeClass::Small => 1.0,
        SizeClass::Medium => 10.0,
        SizeClass::Large => 120.0,
        SizeClass::VeryLarge => 900.0,
    };
    let complexity = 1.0 + 2.0 * chars.complexity.weight();
    let speed = f64::from(6 - capability.performance.speed.clamp(1, 5)) / 3.0;
    base * complexity * speed
}

fn estimated_quality(capability: &SolverCapability, chars: &ProblemCharacteristics) -> f64 {
    let profile = &capability.performance;
    let raw = 0.6 * PerformanceProfile::normalized(profile.rating_for(chars.size))
        + 0.4 * PerformanceProfile::normalized(profile.robustness);
    (raw * (1.0 - 0.2 * chars.complexity.weight())).clamp(0.0, 1.0)
}

/// Confidence in a ranking.
///
/// Increasing in the gap between the top two scores and in the top score,
/// decreasing in problem complexity. Bounded to `[0, 1]`.
pub fn confidence(top_score: f64, gap: f64, complexity_weight: f64) -> f64 {
    let top = top_score.clamp(0.0, 1.0);
    let gap = gap.max(0.0);
    let gap_term = gap / (gap + 0.1);
    let raw = 0.25 + 0.45 * top + 0.30 * gap_term;
    (raw * (1.0 - 0.3 * complexity_weight.clamp(0.0, 1.0))).clamp(0.0, 1.0)
}
