//! Alternative formulations tried when no solver handles a problem type.

use optiroute_kernel::problem::ProblemType;
use optiroute_kernel::selection::Reformulation;

/// Restatements of `problem_type`, most faithful first.
///
/// The metaheuristic fallback applies to every type except combinatorial
/// problems themselves and is always tried last.
pub fn alternatives(problem_type: ProblemType) -> Vec<(Reformulation, ProblemType)> {
    let mut out = Vec::new();
    match problem_type {
        ProblemType::MixedIntegerProgramming => {
            out.push((Reformulation::RelaxIntegrality, ProblemType::LinearProgramming));
        }
        ProblemType::NonlinearProgramming => {
            out.push((Reformulation::Linearize, ProblemType::LinearProgramming));
        }
        ProblemType::QuadraticProgramming => {
            out.push((
                Reformulation::GeneralizeToNonlinear,
                ProblemType::NonlinearProgramming,
            ));
        }
        ProblemType::ConstraintProgramming => {
            out.push((Reformulation::MipEncoding, ProblemType::MixedIntegerProgramming));
        }
        ProblemType::LinearProgramming | ProblemType::CombinatorialOptimization => {}
    }
    if problem_type != ProblemType::CombinatorialOptimization {
        out.push((
            Reformulation::Metaheuristic,
            ProblemType::CombinatorialOptimization,
        ));
    }
    out
}
