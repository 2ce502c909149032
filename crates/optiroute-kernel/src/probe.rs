//! Extension points implemented outside the kernel: availability probes and
//! parameter predictors.

use crate::parameter::ParameterMap;
use crate::problem::{ProblemCharacteristics, ProblemType};
use crate::solver::SolverCapability;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of one probe attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub available: bool,
    pub version: Option<String>,
    /// Why the solver is unavailable, when it is.
    pub detail: Option<String>,
}

impl ProbeReport {
    pub fn available(version: Option<String>) -> Self {
        Self {
            available: true,
            version,
            detail: None,
        }
    }

    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self {
            available: false,
            version: None,
            detail: Some(detail.into()),
        }
    }
}

/// Checks whether a solver backend is actually usable on this host.
///
/// Implementations may spawn subprocesses or load libraries; the prober
/// bounds every call with its own timeout, so implementations need not.
#[async_trait]
pub trait SolverProbe: Send + Sync {
    async fn probe(&self, capability: &SolverCapability) -> ProbeReport;
}

/// Features handed to a [`Predictor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionFeatures {
    pub solver_name: String,
    pub problem_type: ProblemType,
    pub characteristics: ProblemCharacteristics,
}

/// Optional learned parameter predictor.
///
/// Hints go through the same validation as every other overlay; a predictor
/// can never push a value outside a parameter's declared bounds.
pub trait Predictor: Send + Sync {
    fn predict(&self, features: &PredictionFeatures) -> ParameterMap;
}

/// Heuristics only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPredictor;

impl Predictor for NoopPredictor {
    fn predict(&self, _features: &PredictionFeatures) -> ParameterMap {
        ParameterMap::new()
    }
}
