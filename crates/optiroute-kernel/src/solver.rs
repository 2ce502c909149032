//! Solver capability records.
//!
//! A [`SolverCapability`] is the static description of one optimization
//! backend. It is immutable after registration except for the runtime
//! fields the availability prober maintains (`status`, `last_checked`,
//! `version_info`).

use crate::error::RegistryError;
use crate::parameter::ParameterSpec;
use crate::problem::{ConstraintKind, ObjectiveKind, ProblemType, SizeClass, VariableKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Family a solver belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverCategory {
    LinearProgramming,
    MixedInteger,
    ConstraintProgramming,
    Nonlinear,
    Metaheuristic,
}

impl SolverCategory {
    pub const ALL: [SolverCategory; 5] = [
        SolverCategory::LinearProgramming,
        SolverCategory::MixedInteger,
        SolverCategory::ConstraintProgramming,
        SolverCategory::Nonlinear,
        SolverCategory::Metaheuristic,
    ];

    /// Category that natively handles a problem type.
    pub fn for_problem_type(problem_type: ProblemType) -> Self {
        match problem_type {
            ProblemType::LinearProgramming => SolverCategory::LinearProgramming,
            ProblemType::MixedIntegerProgramming => SolverCategory::MixedInteger,
            ProblemType::QuadraticProgramming | ProblemType::NonlinearProgramming => {
                SolverCategory::Nonlinear
            }
            ProblemType::ConstraintProgramming => SolverCategory::ConstraintProgramming,
            ProblemType::CombinatorialOptimization => SolverCategory::Metaheuristic,
        }
    }
}

impl fmt::Display for SolverCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverCategory::LinearProgramming => write!(f, "linear"),
            SolverCategory::MixedInteger => write!(f, "mixed-integer"),
            SolverCategory::ConstraintProgramming => write!(f, "constraint"),
            SolverCategory::Nonlinear => write!(f, "nonlinear"),
            SolverCategory::Metaheuristic => write!(f, "metaheuristic"),
        }
    }
}

/// Runtime availability as last observed by the prober.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    Available,
    Unavailable,
    /// Not probed since registration.
    #[default]
    Unknown,
}

/// Ratings on a 1–5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceProfile {
    pub small: u8,
    pub medium: u8,
    pub large: u8,
    pub very_large: u8,
    pub speed: u8,
    pub memory: u8,
    pub robustness: u8,
    pub numerical_stability: u8,
}

impl PerformanceProfile {
    pub const MIN_RATING: u8 = 1;
    pub const MAX_RATING: u8 = 5;

    pub fn rating_for(&self, size: SizeClass) -> u8 {
        match size {
            SizeClass::Small => self.small,
            SizeClass::Medium => self.medium,
            SizeClass::Large => self.large,
            SizeClass::VeryLarge => self.very_large,
        }
    }

    /// Rating mapped linearly from `1..=5` onto `[0, 1]`.
    pub fn normalized(rating: u8) -> f64 {
        let clamped = rating.clamp(Self::MIN_RATING, Self::MAX_RATING);
        f64::from(clamped - Self::MIN_RATING) / f64::from(Self::MAX_RATING - Self::MIN_RATING)
    }

    fn ratings(&self) -> [(&'static str, u8); 8] {
        [
            ("small", self.small),
            ("medium", self.medium),
            ("large", self.large),
            ("very_large", self.very_large),
            ("speed", self.speed),
            ("memory", self.memory),
            ("robustness", self.robustness),
            ("numerical_stability", self.numerical_stability),
        ]
    }
}

impl Default for PerformanceProfile {
    fn default() -> Self {
        Self {
            small: 3,
            medium: 3,
            large: 3,
            very_large: 3,
            speed: 3,
            memory: 3,
            robustness: 3,
            numerical_stability: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseKind {
    OpenSource,
    Academic,
    Commercial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallDifficulty {
    /// Ships with the host process or a single package install.
    Bundled,
    Easy,
    Moderate,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationInfo {
    pub license: LicenseKind,
    pub difficulty: InstallDifficulty,
    /// Package providing the solver (e.g. `ortools`, `highspy`).
    pub package: String,
    pub dependency_count: u32,
}

impl Default for InstallationInfo {
    fn default() -> Self {
        Self {
            license: LicenseKind::OpenSource,
            difficulty: InstallDifficulty::Easy,
            package: String::new(),
            dependency_count: 0,
        }
    }
}

/// Full description of a registered solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverCapability {
    /// Unique stable identifier (must not be empty).
    pub name: String,
    pub display_name: String,
    pub category: SolverCategory,
    pub problem_types: BTreeSet<ProblemType>,
    pub variable_kinds: BTreeSet<VariableKind>,
    pub constraint_kinds: BTreeSet<ConstraintKind>,
    pub objective_kinds: BTreeSet<ObjectiveKind>,
    pub max_variables: Option<u64>,
    pub max_constraints: Option<u64>,
    pub performance: PerformanceProfile,
    pub parallel_capable: bool,
    pub memory_efficient: bool,
    pub installation: InstallationInfo,
    /// Tunable parameters and their defaults.
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,

    // Runtime fields, owned by the availability prober.
    #[serde(default)]
    pub status: SolverStatus,
    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version_info: Option<String>,
}

impl SolverCapability {
    /// Start a capability record. Problem types and kinds are added with the
    /// builder methods.
    pub fn new(name: impl Into<String>, category: SolverCategory) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            category,
            problem_types: BTreeSet::new(),
            variable_kinds: BTreeSet::new(),
            constraint_kinds: BTreeSet::new(),
            objective_kinds: BTreeSet::new(),
            max_variables: None,
            max_constraints: None,
            performance: PerformanceProfile::default(),
            parallel_capable: false,
            memory_efficient: false,
            installation: InstallationInfo::default(),
            parameters: Vec::new(),
            status: SolverStatus::Unknown,
            last_checked: None,
            version_info: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_problem_types(mut self, types: impl IntoIterator<Item = ProblemType>) -> Self {
        self.problem_types.extend(types);
        self
    }

    pub fn with_variable_kinds(mut self, kinds: impl IntoIterator<Item = VariableKind>) -> Self {
        self.variable_kinds.extend(kinds);
        self
    }

    pub fn with_constraint_kinds(mut self, kinds: impl IntoIterator<Item = ConstraintKind>) -> Self {
        self.constraint_kinds.extend(kinds);
        self
    }

    pub fn with_objective_kinds(mut self, kinds: impl IntoIterator<Item = ObjectiveKind>) -> Self {
        self.objective_kinds.extend(kinds);
        self
    }

    pub fn with_limits(mut self, max_variables: Option<u64>, max_constraints: Option<u64>) -> Self {
        self.max_variables = max_variables;
        self.max_constraints = max_constraints;
        self
    }

    pub fn with_performance(mut self, performance: PerformanceProfile) -> Self {
        self.performance = performance;
        self
    }

    pub fn with_parallel(mut self, parallel_capable: bool) -> Self {
        self.parallel_capable = parallel_capable;
        self
    }

    pub fn with_memory_efficient(mut self, memory_efficient: bool) -> Self {
        self.memory_efficient = memory_efficient;
        self
    }

    pub fn with_installation(mut self, installation: InstallationInfo) -> Self {
        self.installation = installation;
        self
    }

    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_status(mut self, status: SolverStatus) -> Self {
        self.status = status;
        self
    }

    pub fn supports(&self, problem_type: ProblemType) -> bool {
        self.problem_types.contains(&problem_type)
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Sanity checks run at registration.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let invalid = |msg: String| -> Result<(), RegistryError> {
            Err(RegistryError::InvalidCapability(self.name.clone(), msg))
        };

        if self.name.trim().is_empty() {
            return Err(RegistryError::InvalidCapability(
                self.name.clone(),
                "solver name cannot be empty".to_string(),
            ));
        }
        if self.problem_types.is_empty() {
            return invalid("at least one problem type is required".to_string());
        }
        for (field, rating) in self.performance.ratings() {
            if !(PerformanceProfile::MIN_RATING..=PerformanceProfile::MAX_RATING).contains(&rating) {
                return invalid(format!("performance.{} = {} is outside 1..=5", field, rating));
            }
        }
        if matches!(self.max_variables, Some(0)) || matches!(self.max_constraints, Some(0)) {
            return invalid("size limits must be positive when set".to_string());
        }
        let mut seen = BTreeSet::new();
        for parameter in &self.parameters {
            if !seen.insert(parameter.name.as_str()) {
                return invalid(format!("parameter '{}' is declared twice", parameter.name));
            }
            if let Err(reason) = parameter.validate(&parameter.default) {
                return invalid(format!("default rejected: {}", reason));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lp() -> SolverCapability {
        SolverCapability::new("glop", SolverCategory::LinearProgramming)
            .with_problem_types([ProblemType::LinearProgramming])
    }

    #[test]
    fn normalized_rating_spans_unit_interval() {
        assert_eq!(PerformanceProfile::normalized(1), 0.0);
        assert_eq!(PerformanceProfile::normalized(5), 1.0);
        assert_eq!(PerformanceProfile::normalized(3), 0.5);
    }

    #[test]
    fn validate_rejects_out_of_range_rating() {
        let mut cap = lp();
        cap.performance.speed = 6;
        assert!(matches!(cap.validate(), Err(RegistryError::InvalidCapability(..))));
    }

    #[test]
    fn validate_rejects_bad_default() {
        let cap = lp().with_parameter(ParameterSpec::int("time_limit", 0, 1, 10));
        assert!(cap.validate().is_err());
    }

    #[test]
    fn validate_accepts_minimal_record() {
        assert!(lp().validate().is_ok());
        assert!(SolverCapability::new("x", SolverCategory::Nonlinear).validate().is_err());
    }
}
