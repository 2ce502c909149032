//! Problem description and derived characteristics.
//!
//! [`ProblemSpec`] is the raw, caller-supplied description of an
//! optimization problem (usually produced by an upstream understanding
//! stage). [`ProblemCharacteristics`] is the immutable summary the analyzer
//! derives from it and the only thing the selector ever looks at.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─────────────────────────────────────────────────────────────────────────────
// Problem type
// ─────────────────────────────────────────────────────────────────────────────

/// Mathematical class of an optimization problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemType {
    /// Continuous variables, linear constraints and objective.
    LinearProgramming,
    /// Linear model with some integer or binary variables.
    MixedIntegerProgramming,
    /// Linear constraints with a quadratic objective.
    QuadraticProgramming,
    /// Nonlinear or quadratic constraints, or a nonlinear objective.
    NonlinearProgramming,
    /// Discrete model dominated by logical / global constraints.
    ConstraintProgramming,
    /// Black-box combinatorial problem handled by metaheuristics.
    CombinatorialOptimization,
}

impl ProblemType {
    pub const ALL: [ProblemType; 6] = [
        ProblemType::LinearProgramming,
        ProblemType::MixedIntegerProgramming,
        ProblemType::QuadraticProgramming,
        ProblemType::NonlinearProgramming,
        ProblemType::ConstraintProgramming,
        ProblemType::CombinatorialOptimization,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemType::LinearProgramming => "linear_programming",
            ProblemType::MixedIntegerProgramming => "mixed_integer_programming",
            ProblemType::QuadraticProgramming => "quadratic_programming",
            ProblemType::NonlinearProgramming => "nonlinear_programming",
            ProblemType::ConstraintProgramming => "constraint_programming",
            ProblemType::CombinatorialOptimization => "combinatorial_optimization",
        }
    }

    /// Complexity assumed when no structural feature raises it.
    pub fn base_complexity(&self) -> Complexity {
        match self {
            ProblemType::LinearProgramming | ProblemType::QuadraticProgramming => Complexity::Low,
            ProblemType::MixedIntegerProgramming
            | ProblemType::ConstraintProgramming
            | ProblemType::NonlinearProgramming
            | ProblemType::CombinatorialOptimization => Complexity::Medium,
        }
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProblemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "linear_programming" | "lp" | "linear" => Ok(Self::LinearProgramming),
            "mixed_integer_programming" | "mixed_integer_linear_programming" | "mip"
            | "milp" | "mixed_integer" => Ok(Self::MixedIntegerProgramming),
            "quadratic_programming" | "qp" | "quadratic" => Ok(Self::QuadraticProgramming),
            "nonlinear_programming" | "nlp" | "nonlinear" => Ok(Self::NonlinearProgramming),
            "constraint_programming" | "cp" | "constraint" => Ok(Self::ConstraintProgramming),
            "combinatorial_optimization" | "combinatorial" | "metaheuristic" => {
                Ok(Self::CombinatorialOptimization)
            }
            other => Err(format!("unknown problem type '{}'", other)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Size & complexity
// ─────────────────────────────────────────────────────────────────────────────

/// Size bucket derived from the total variable count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
    VeryLarge,
}

impl SizeClass {
    pub const ALL: [SizeClass; 4] = [
        SizeClass::Small,
        SizeClass::Medium,
        SizeClass::Large,
        SizeClass::VeryLarge,
    ];

    /// `<100` small, `<10k` medium, `<1M` large, otherwise very large.
    pub fn from_variable_count(count: u64) -> Self {
        match count {
            c if c < 100 => SizeClass::Small,
            c if c < 10_000 => SizeClass::Medium,
            c if c < 1_000_000 => SizeClass::Large,
            _ => SizeClass::VeryLarge,
        }
    }

    pub fn is_large(&self) -> bool {
        matches!(self, SizeClass::Large | SizeClass::VeryLarge)
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeClass::Small => write!(f, "small"),
            SizeClass::Medium => write!(f, "medium"),
            SizeClass::Large => write!(f, "large"),
            SizeClass::VeryLarge => write!(f, "very-large"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Complexity {
    /// Normalised weight in `[0, 1]`, used by the confidence function.
    pub fn weight(&self) -> f64 {
        match self {
            Complexity::Low => 0.0,
            Complexity::Medium => 1.0 / 3.0,
            Complexity::High => 2.0 / 3.0,
            Complexity::VeryHigh => 1.0,
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Complexity::Low => write!(f, "low"),
            Complexity::Medium => write!(f, "medium"),
            Complexity::High => write!(f, "high"),
            Complexity::VeryHigh => write!(f, "very-high"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Structural kinds
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Continuous,
    Integer,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Linear,
    Quadratic,
    Nonlinear,
    /// Logical / global constraints (all-different, implication, ...).
    Logical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    Linear,
    Quadratic,
    Nonlinear,
    MultiObjective,
}

/// Number of variables per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableCounts {
    pub continuous: u64,
    pub integer: u64,
    pub binary: u64,
}

impl VariableCounts {
    /// Saturates at `u64::MAX`; anything that large is `VeryLarge` anyway.
    pub fn total(&self) -> u64 {
        self.continuous
            .saturating_add(self.integer)
            .saturating_add(self.binary)
    }

    pub fn discrete(&self) -> u64 {
        self.integer.saturating_add(self.binary)
    }

    pub fn kinds(&self) -> Vec<VariableKind> {
        let mut kinds = Vec::with_capacity(3);
        if self.continuous > 0 {
            kinds.push(VariableKind::Continuous);
        }
        if self.integer > 0 {
            kinds.push(VariableKind::Integer);
        }
        if self.binary > 0 {
            kinds.push(VariableKind::Binary);
        }
        kinds
    }
}

/// Number of constraints per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintCounts {
    pub linear: u64,
    pub quadratic: u64,
    pub nonlinear: u64,
    pub logical: u64,
}

impl ConstraintCounts {
    pub fn total(&self) -> u64 {
        self.linear
            .saturating_add(self.quadratic)
            .saturating_add(self.nonlinear)
            .saturating_add(self.logical)
    }

    /// Quadratic and general nonlinear constraints together.
    pub fn nonlinear_like(&self) -> u64 {
        self.quadratic.saturating_add(self.nonlinear)
    }

    pub fn kinds(&self) -> Vec<ConstraintKind> {
        let mut kinds = Vec::with_capacity(4);
        if self.linear > 0 {
            kinds.push(ConstraintKind::Linear);
        }
        if self.quadratic > 0 {
            kinds.push(ConstraintKind::Quadratic);
        }
        if self.nonlinear > 0 {
            kinds.push(ConstraintKind::Nonlinear);
        }
        if self.logical > 0 {
            kinds.push(ConstraintKind::Logical);
        }
        kinds
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain hints
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

/// Optional caller hints carried through to scoring and synthesis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainHints {
    /// Planning horizon in periods, when the problem is time-indexed.
    pub time_horizon: Option<u32>,
    pub priority: Option<Priority>,
    /// Upper bound the caller is willing to wait, in seconds.
    pub max_solve_time_secs: Option<f64>,
    /// `0.0` = fastest answer, `1.0` = best answer. `None` means balanced.
    pub quality_preference: Option<f64>,
}

impl DomainHints {
    pub fn quality_preference(&self) -> f64 {
        self.quality_preference.unwrap_or(0.5)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Raw input
// ─────────────────────────────────────────────────────────────────────────────

/// Objective description as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveSpec {
    /// `linear`, `quadratic`, `nonlinear`; `None` is treated as linear.
    pub kind: Option<String>,
    /// Number of objectives; more than one makes the problem multi-objective.
    pub count: u32,
}

/// Raw problem description. Every field is optional at the type level so
/// that malformed input reaches the analyzer and is reported field by field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProblemSpec {
    /// Explicit problem type, e.g. `"mixed_integer_programming"`.
    pub problem_type: Option<String>,
    pub variables: Option<VariableCounts>,
    pub constraints: Option<ConstraintCounts>,
    pub objective: Option<ObjectiveSpec>,
    /// Domain name, e.g. `"production_scheduling"` or `"vehicle_routing"`.
    pub domain: Option<String>,
    pub time_dependent: bool,
    pub stochastic: bool,
    pub hints: DomainHints,
}

impl ProblemSpec {
    /// Parse a JSON problem description.
    ///
    /// Syntax and shape errors are reported as a single
    /// [`crate::error::FieldIssue`] on the `$` (document) field.
    pub fn from_json(input: &str) -> Result<Self, crate::error::SelectionError> {
        serde_json::from_str(input).map_err(|e| {
            crate::error::SelectionError::InvalidProblemSpec(vec![crate::error::FieldIssue::new(
                "$",
                e.to_string(),
            )])
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Derived characteristics
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveProfile {
    pub linear: bool,
    pub quadratic: bool,
    pub nonlinear: bool,
    pub multi_objective: bool,
}

impl ObjectiveProfile {
    pub fn kinds(&self) -> Vec<ObjectiveKind> {
        let mut kinds = Vec::with_capacity(2);
        if self.linear {
            kinds.push(ObjectiveKind::Linear);
        }
        if self.quadratic {
            kinds.push(ObjectiveKind::Quadratic);
        }
        if self.nonlinear {
            kinds.push(ObjectiveKind::Nonlinear);
        }
        if self.multi_objective {
            kinds.push(ObjectiveKind::MultiObjective);
        }
        kinds
    }
}

/// Immutable summary of a problem used for solver selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemCharacteristics {
    pub problem_type: ProblemType,
    pub size: SizeClass,
    pub complexity: Complexity,
    /// Raw complexity score the level was derived from.
    pub complexity_score: u32,
    pub variables: VariableCounts,
    pub constraints: ConstraintCounts,
    pub objective: ObjectiveProfile,
    pub domain: Option<String>,
    pub time_dependent: bool,
    pub stochastic: bool,
    pub hints: DomainHints,
}

impl ProblemCharacteristics {
    /// Minimal characteristics for a problem type and size, used when only a
    /// coarse description is known (tests, fallback re-selection).
    pub fn minimal(problem_type: ProblemType, size: SizeClass) -> Self {
        let variables = match size {
            SizeClass::Small => 10,
            SizeClass::Medium => 1_000,
            SizeClass::Large => 100_000,
            SizeClass::VeryLarge => 2_000_000,
        };
        let (variables, constraints) = match problem_type {
            ProblemType::LinearProgramming | ProblemType::QuadraticProgramming => (
                VariableCounts { continuous: variables, ..Default::default() },
                ConstraintCounts { linear: variables / 2 + 1, ..Default::default() },
            ),
            ProblemType::MixedIntegerProgramming => (
                VariableCounts { continuous: variables / 2, integer: variables - variables / 2, binary: 0 },
                ConstraintCounts { linear: variables / 2 + 1, ..Default::default() },
            ),
            ProblemType::NonlinearProgramming => (
                VariableCounts { continuous: variables, ..Default::default() },
                ConstraintCounts { nonlinear: variables / 2 + 1, ..Default::default() },
            ),
            ProblemType::ConstraintProgramming | ProblemType::CombinatorialOptimization => (
                VariableCounts { integer: variables, ..Default::default() },
                ConstraintCounts { logical: variables / 2 + 1, ..Default::default() },
            ),
        };
        Self {
            problem_type,
            size,
            complexity: problem_type.base_complexity(),
            complexity_score: 0,
            variables,
            constraints,
            objective: ObjectiveProfile {
                linear: problem_type != ProblemType::QuadraticProgramming
                    && problem_type != ProblemType::NonlinearProgramming,
                quadratic: problem_type == ProblemType::QuadraticProgramming,
                nonlinear: problem_type == ProblemType::NonlinearProgramming,
                multi_objective: false,
            },
            domain: None,
            time_dependent: false,
            stochastic: false,
            hints: DomainHints::default(),
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn variable_count(&self) -> u64 {
        self.variables.total()
    }

    pub fn constraint_count(&self) -> u64 {
        self.constraints.total()
    }
}
