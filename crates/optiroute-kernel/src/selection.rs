//! Scores and selections produced by the selector.

use crate::parameter::ParameterMap;
use crate::problem::{ProblemCharacteristics, ProblemType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Individual scoring components, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub problem_fit: f64,
    pub performance: f64,
    pub reliability: f64,
    pub availability: f64,
    pub scalability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverScore {
    pub solver_name: String,
    /// Weighted sum of the components, in `[0, 1]`.
    pub total_score: f64,
    pub components: ComponentScores,
    /// 1-based rank among the scored candidates.
    pub rank: usize,
    pub estimated_solve_time_secs: f64,
    /// Expected solution quality in `[0, 1]`.
    pub estimated_quality: f64,
    pub rationale: String,
}

/// A known way of restating a problem so that a different solver family can
/// attempt it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reformulation {
    /// Drop integrality and solve the continuous relaxation.
    RelaxIntegrality,
    /// Replace nonlinear terms with piecewise-linear approximations.
    Linearize,
    /// Encode the model as a MIP (big-M for logical constraints).
    MipEncoding,
    /// Treat a QP as a general nonlinear program.
    GeneralizeToNonlinear,
    /// Hand the problem to a metaheuristic as a black box.
    Metaheuristic,
}

impl Reformulation {
    pub fn description(&self) -> &'static str {
        match self {
            Reformulation::RelaxIntegrality => "relaxed integer variables to continuous",
            Reformulation::Linearize => "linearized nonlinear terms",
            Reformulation::MipEncoding => "encoded logical constraints as mixed-integer",
            Reformulation::GeneralizeToNonlinear => "treated quadratic model as general nonlinear",
            Reformulation::Metaheuristic => "treated as black-box metaheuristic problem",
        }
    }
}

impl fmt::Display for Reformulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// An applied reformulation: which type the problem was restated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adaptation {
    pub method: Reformulation,
    pub original_type: ProblemType,
    pub adapted_type: ProblemType,
}

/// Result of one selection request. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSelection {
    pub primary_solver: String,
    pub backup_solvers: Vec<String>,
    pub solver_scores: Vec<SolverScore>,
    /// Ordered list of solvers to try if the primary fails.
    pub fallback_chain: Vec<String>,
    pub confidence_score: f64,
    pub characteristics: ProblemCharacteristics,
    /// `true` when no solver in the compatible set was usable and the
    /// primary came from the fallback chain or a reformulation.
    pub is_fallback: bool,
    pub adaptation: Option<Adaptation>,
    pub selected_at: DateTime<Utc>,
}

impl SolverSelection {
    pub fn primary_score(&self) -> Option<&SolverScore> {
        self.solver_scores
            .iter()
            .find(|s| s.solver_name == self.primary_solver)
    }

    /// Primary followed by the fallback chain, without duplicates.
    pub fn attempt_order(&self) -> Vec<String> {
        let mut order = vec![self.primary_solver.clone()];
        for name in &self.fallback_chain {
            if !order.contains(name) {
                order.push(name.clone());
            }
        }
        order
    }
}

/// A selection plus the parameters synthesized for its primary solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolvePlan {
    pub selection: SolverSelection,
    pub parameters: ParameterMap,
}
