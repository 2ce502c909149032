//! Error types for `optiroute-kernel`.
//!
//! Errors are split by who can act on them:
//!
//! - [`RegistryError`]: registry misuse (duplicate names, unknown solvers).
//!   These are programmer errors and are not recovered at runtime.
//! - [`SelectionError`]: what a caller of `select` / `analyze` can see.
//!   Only malformed input and full exhaustion of fallbacks surface here.
//! - [`SolveFailure`]: why an external solve failed, as reported back through
//!   `report_outcome`. Every variant is recoverable through fallback.

use crate::health::{FailureReason, ImpactLevel};
use crate::problem::{ProblemType, SizeClass};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Registry misuse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
    /// A solver with this name has already been registered.
    #[error("solver '{0}' is already registered")]
    DuplicateSolver(String),

    /// No solver with this name is registered.
    #[error("solver '{0}' is not registered")]
    NotFound(String),

    /// The capability record failed its own sanity checks.
    #[error("solver '{0}' has an invalid capability record: {1}")]
    InvalidCapability(String, String),
}

/// A single missing or invalid field in a problem description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors surfaced to callers of the selection path.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SelectionError {
    /// The problem description is malformed. Not recoverable.
    #[error("invalid problem spec: {}", join_issues(.0))]
    InvalidProblemSpec(Vec<FieldIssue>),

    /// No compatible, available and circuit-usable solver remains after the
    /// fallback chain and the alternative-formulation search.
    #[error("no solver available for {problem_type} ({size}): {reason}")]
    NoSolverAvailable {
        problem_type: ProblemType,
        size: SizeClass,
        reason: String,
    },

    /// Fallback re-selection did not finish within its time budget.
    #[error("fallback selection timed out after {0:?}")]
    SelectionTimeout(Duration),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl SelectionError {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, SelectionError::NoSolverAvailable { .. })
    }
}

/// Why an external solve attempt failed.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
#[non_exhaustive]
pub enum SolveFailure {
    #[error("solver unavailable: {0}")]
    Unavailable(String),

    #[error("solver timed out after {0:.1}s")]
    Timeout(f64),

    #[error("solver crashed: {0}")]
    Crash(String),

    #[error("solver exhausted memory: {0}")]
    MemoryExhaustion(String),

    #[error("solver error: {0}")]
    Error(String),

    #[error("solver performed poorly: {0}")]
    PoorPerformance(String),

    #[error("resource limit reached: {0}")]
    ResourceLimit(String),

    #[error("system overloaded: {0}")]
    SystemOverload(String),
}

impl SolveFailure {
    pub fn reason(&self) -> FailureReason {
        match self {
            SolveFailure::Unavailable(_) => FailureReason::Unavailable,
            SolveFailure::Timeout(_) => FailureReason::Timeout,
            SolveFailure::Crash(_) => FailureReason::Crash,
            SolveFailure::MemoryExhaustion(_) => FailureReason::MemoryExhaustion,
            SolveFailure::Error(_) => FailureReason::Error,
            SolveFailure::PoorPerformance(_) => FailureReason::PoorPerformance,
            SolveFailure::ResourceLimit(_) => FailureReason::ResourceLimit,
            SolveFailure::SystemOverload(_) => FailureReason::SystemOverload,
        }
    }

    pub fn impact(&self) -> ImpactLevel {
        self.reason().impact()
    }

    /// Free-form detail attached to the failure.
    pub fn detail(&self) -> String {
        match self {
            SolveFailure::Timeout(secs) => format!("{:.1}s", secs),
            SolveFailure::Unavailable(d)
            | SolveFailure::Crash(d)
            | SolveFailure::MemoryExhaustion(d)
            | SolveFailure::Error(d)
            | SolveFailure::PoorPerformance(d)
            | SolveFailure::ResourceLimit(d)
            | SolveFailure::SystemOverload(d) => d.clone(),
        }
    }
}

pub type SelectionResult<T> = Result<T, SelectionError>;
pub type RegistryResult<T> = Result<T, RegistryError>;
