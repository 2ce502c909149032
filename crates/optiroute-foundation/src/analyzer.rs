//! Problem analyzer: raw [`ProblemSpec`] to [`ProblemCharacteristics`].
//!
//! Analysis is a pure function of its input. Validation collects every
//! problem it finds before failing so the caller can fix them all at once.

use optiroute_kernel::error::{FieldIssue, SelectionError, SelectionResult};
use optiroute_kernel::problem::{
    Complexity, ConstraintCounts, ObjectiveProfile, ProblemCharacteristics, ProblemSpec,
    ProblemType, SizeClass, VariableCounts,
};
use tracing::debug;

/// Domains that lean towards constraint programming when the constraint
/// mix alone does not decide.
const CP_DOMAINS: [&str; 4] = ["scheduling", "timetabling", "rostering", "sequencing"];

#[derive(Debug, Clone, Copy, Default)]
pub struct ProblemAnalyzer;

impl ProblemAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, spec: &ProblemSpec) -> SelectionResult<ProblemCharacteristics> {
        let mut issues = Vec::new();

        let variables = match spec.variables {
            None => {
                issues.push(FieldIssue::new("variables", "missing"));
                VariableCounts::default()
            }
            Some(v) if v.total() == 0 => {
                issues.push(FieldIssue::new("variables", "at least one variable is required"));
                v
            }
            Some(v) => v,
        };

        let constraints = spec.constraints.unwrap_or_else(|| {
            issues.push(FieldIssue::new("constraints", "missing"));
            ConstraintCounts::default()
        });

        let explicit_type = match spec.problem_type.as_deref() {
            None => None,
            Some(raw) => match raw.parse::<ProblemType>() {
                Ok(t) => Some(t),
                Err(e) => {
                    issues.push(FieldIssue::new("problem_type", e));
                    None
                }
            },
        };

        let objective = objective_profile(spec, &mut issues);

        if let Some(domain) = &spec.domain {
            if domain.trim().is_empty() {
                issues.push(FieldIssue::new("domain", "must not be empty when present"));
            }
        }
        validate_hints(spec, &mut issues);

        if !issues.is_empty() {
            return Err(SelectionError::InvalidProblemSpec(issues));
        }

        let problem_type = explicit_type.unwrap_or_else(|| {
            infer_type(&variables, &constraints, &objective, spec.domain.as_deref())
        });
        let size = SizeClass::from_variable_count(variables.total());
        let complexity_score = complexity_score(
            &variables,
            &constraints,
            &objective,
            spec.time_dependent,
            spec.stochastic,
        );
        let complexity = match complexity_score {
            s if s >= 4 => Complexity::VeryHigh,
            s if s >= 2 => Complexity::High,
            s if s >= 1 => Complexity::Medium,
            _ => problem_type.base_complexity(),
        };

        debug!(
            problem_type = %problem_type,
            size = %size,
            complexity = %complexity,
            score = complexity_score,
            "Analyzed problem"
        );

        Ok(ProblemCharacteristics {
            problem_type,
            size,
            complexity,
            complexity_score,
            variables,
            constraints,
            objective,
            domain: spec.domain.as_ref().map(|d| d.trim().to_lowercase()),
            time_dependent: spec.time_dependent,
            stochastic: spec.stochastic,
            hints: spec.hints.clone(),
        })
    }
}

fn objective_profile(spec: &ProblemSpec, issues: &mut Vec<FieldIssue>) -> ObjectiveProfile {
    let Some(objective) = &spec.objective else {
        return ObjectiveProfile {
            linear: true,
            ..Default::default()
        };
    };

    let mut profile = ObjectiveProfile::default();
    match objective.kind.as_deref().map(|k| k.trim().to_lowercase()) {
        None => profile.linear = true,
        Some(kind) => match kind.as_str() {
            "linear" => profile.linear = true,
            "quadratic" => profile.quadratic = true,
            "nonlinear" => profile.nonlinear = true,
            "multi_objective" | "multi-objective" => {
                profile.linear = true;
                profile.multi_objective = true;
            }
            other => issues.push(FieldIssue::new(
                "objective.kind",
                format!("unknown objective kind '{}'", other),
            )),
        },
    }
    if objective.count > 1 {
        profile.multi_objective = true;
    }
    profile
}

fn validate_hints(spec: &ProblemSpec, issues: &mut Vec<FieldIssue>) {
    let hints = &spec.hints;
    if let Some(secs) = hints.max_solve_time_secs {
        if !secs.is_finite() || secs <= 0.0 {
            issues.push(FieldIssue::new(
                "hints.max_solve_time_secs",
                "must be a positive number of seconds",
            ));
        }
    }
    if let Some(q) = hints.quality_preference {
        if !(0.0..=1.0).contains(&q) {
            issues.push(FieldIssue::new(
                "hints.quality_preference",
                "must be within [0, 1]",
            ));
        }
    }
    if hints.time_horizon == Some(0) {
        issues.push(FieldIssue::new("hints.time_horizon", "must be at least 1"));
    }
}

/// Type inference when no explicit type was given.
fn infer_type(
    variables: &VariableCounts,
    constraints: &ConstraintCounts,
    objective: &ObjectiveProfile,
    domain: Option<&str>,
) -> ProblemType {
    if variables.discrete().saturating_mul(2) > variables.total() || constraints.logical > 0 {
        return match constraints.logical.cmp(&constraints.linear) {
            std::cmp::Ordering::Greater => ProblemType::ConstraintProgramming,
            std::cmp::Ordering::Less => ProblemType::MixedIntegerProgramming,
            std::cmp::Ordering::Equal => {
                let cp_domain = domain
                    .map(|d| d.to_lowercase())
                    .is_some_and(|d| CP_DOMAINS.iter().any(|k| d.contains(k)));
                if cp_domain {
                    ProblemType::ConstraintProgramming
                } else {
                    ProblemType::MixedIntegerProgramming
                }
            }
        };
    }
    if constraints.nonlinear_like() > 0 {
        return ProblemType::NonlinearProgramming;
    }
    if variables.discrete() > 0 {
        return ProblemType::MixedIntegerProgramming;
    }
    if objective.nonlinear {
        ProblemType::NonlinearProgramming
    } else if objective.quadratic {
        ProblemType::QuadraticProgramming
    } else {
        ProblemType::LinearProgramming
    }
}

fn complexity_score(
    variables: &VariableCounts,
    constraints: &ConstraintCounts,
    objective: &ObjectiveProfile,
    time_dependent: bool,
    stochastic: bool,
) -> u32 {
    let mut score = 0;

    let n = variables.total();
    if n > 100_000 {
        score += 2;
    } else if n > 10_000 {
        score += 1;
    }

    let total = constraints.total();
    if total > 0 {
        let nonlinear = constraints.nonlinear_like();
        if nonlinear.saturating_mul(2) > total {
            score += 3;
        } else if nonlinear > 0 {
            score += 2;
        }
        if constraints.logical as f64 / total as f64 > 0.3 {
            score += 1;
        }
    }

    score += u32::from(objective.multi_objective);
    score += u32::from(time_dependent);
    score += u32::from(stochastic);
    score
}
