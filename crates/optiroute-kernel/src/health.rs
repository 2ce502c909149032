//! Health, degradation and outcome types.

use crate::error::SolveFailure;
use crate::problem::ProblemType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Failure reasons & impact
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Unavailable,
    Timeout,
    Error,
    Crash,
    MemoryExhaustion,
    PoorPerformance,
    ResourceLimit,
    SystemOverload,
}

impl FailureReason {
    pub fn impact(&self) -> ImpactLevel {
        match self {
            FailureReason::Timeout | FailureReason::PoorPerformance => ImpactLevel::Minimal,
            FailureReason::Unavailable | FailureReason::Error | FailureReason::ResourceLimit => {
                ImpactLevel::Moderate
            }
            FailureReason::Crash | FailureReason::MemoryExhaustion => ImpactLevel::Severe,
            FailureReason::SystemOverload => ImpactLevel::Critical,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureReason::Unavailable => "unavailable",
            FailureReason::Timeout => "timeout",
            FailureReason::Error => "error",
            FailureReason::Crash => "crash",
            FailureReason::MemoryExhaustion => "memory-exhaustion",
            FailureReason::PoorPerformance => "poor-performance",
            FailureReason::ResourceLimit => "resource-limit",
            FailureReason::SystemOverload => "system-overload",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    Minimal,
    Moderate,
    Severe,
    Critical,
}

/// System-wide degradation summary over the trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DegradationLevel {
    #[default]
    None,
    Minimal,
    Moderate,
    Severe,
    Critical,
}

impl DegradationLevel {
    /// Aggregate impact levels of the events in the window.
    ///
    /// - 3+ severe/critical → critical
    /// - 1+ severe/critical or 5+ moderate-or-worse → severe
    /// - 2+ moderate-or-worse → moderate
    /// - 3+ of any kind → minimal
    pub fn from_impacts<I>(impacts: I) -> Self
    where
        I: IntoIterator<Item = ImpactLevel>,
    {
        let (mut total, mut moderate, mut severe) = (0usize, 0usize, 0usize);
        for impact in impacts {
            total += 1;
            if impact >= ImpactLevel::Moderate {
                moderate += 1;
            }
            if impact >= ImpactLevel::Severe {
                severe += 1;
            }
        }

        if severe >= 3 {
            DegradationLevel::Critical
        } else if severe >= 1 || moderate >= 5 {
            DegradationLevel::Severe
        } else if moderate >= 2 {
            DegradationLevel::Moderate
        } else if total >= 3 {
            DegradationLevel::Minimal
        } else {
            DegradationLevel::None
        }
    }
}

impl fmt::Display for DegradationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DegradationLevel::None => "none",
            DegradationLevel::Minimal => "minimal",
            DegradationLevel::Moderate => "moderate",
            DegradationLevel::Severe => "severe",
            DegradationLevel::Critical => "critical",
        };
        f.write_str(s)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Health metrics
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    #[default]
    Healthy,
    Degraded,
    Unhealthy,
    Critical,
}

impl HealthStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            HealthStatus::Healthy
        } else if score >= 0.6 {
            HealthStatus::Degraded
        } else if score >= 0.3 {
            HealthStatus::Unhealthy
        } else {
            HealthStatus::Critical
        }
    }
}

/// Per-solver health, mutated only by the health manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverHealthMetrics {
    pub solver_name: String,
    /// Exponentially weighted success rate.
    pub success_rate: f64,
    pub error_rate: f64,
    pub timeout_rate: f64,
    pub crash_rate: f64,
    pub consecutive_failures: u32,
    pub total_outcomes: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub health_score: f64,
    pub status: HealthStatus,
}

impl SolverHealthMetrics {
    /// EMA smoothing factor for `success_rate`.
    pub const ALPHA: f64 = 0.1;
    /// Increment applied to a failure-kind rate per failure.
    pub const RATE_BUMP: f64 = 0.1;

    pub fn new(solver_name: impl Into<String>) -> Self {
        Self {
            solver_name: solver_name.into(),
            success_rate: 1.0,
            error_rate: 0.0,
            timeout_rate: 0.0,
            crash_rate: 0.0,
            consecutive_failures: 0,
            total_outcomes: 0,
            last_success: None,
            last_failure: None,
            health_score: 1.0,
            status: HealthStatus::Healthy,
        }
    }

    /// Success rate if any outcome has been observed.
    pub fn observed_success_rate(&self) -> Option<f64> {
        (self.total_outcomes > 0).then_some(self.success_rate)
    }

    pub fn record_success(&mut self, at: DateTime<Utc>) {
        self.success_rate = self.success_rate * (1.0 - Self::ALPHA) + Self::ALPHA;
        self.error_rate *= 1.0 - Self::ALPHA;
        self.timeout_rate *= 1.0 - Self::ALPHA;
        self.crash_rate *= 1.0 - Self::ALPHA;
        self.consecutive_failures = 0;
        self.total_outcomes += 1;
        self.last_success = Some(at);
        self.recompute();
    }

    pub fn record_failure(&mut self, reason: FailureReason, at: DateTime<Utc>) {
        self.success_rate *= 1.0 - Self::ALPHA;
        let bump = |rate: &mut f64| *rate = (*rate + Self::RATE_BUMP).min(1.0);
        match reason {
            FailureReason::Timeout => bump(&mut self.timeout_rate),
            FailureReason::Crash | FailureReason::MemoryExhaustion => bump(&mut self.crash_rate),
            _ => bump(&mut self.error_rate),
        }
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.total_outcomes += 1;
        self.last_failure = Some(at);
        self.recompute();
    }

    fn recompute(&mut self) {
        let streak_penalty = (f64::from(self.consecutive_failures) * 0.1).min(0.5);
        let score = 0.5 * self.success_rate
            + 0.2 * (1.0 - self.error_rate)
            + 0.15 * (1.0 - self.timeout_rate)
            + 0.15 * (1.0 - self.crash_rate)
            - streak_penalty;
        self.health_score = score.clamp(0.0, 1.0);
        self.status = HealthStatus::from_score(self.health_score);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Degradation events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    /// A fallback solver was chosen.
    FallbackSelected,
    /// No fallback remained; the request failed.
    Exhausted,
    /// Fallback selection did not complete in time.
    TimedOut,
}

/// Immutable audit record of one degradation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradationEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub solver_name: String,
    pub problem_type: ProblemType,
    pub reason: FailureReason,
    pub details: BTreeMap<String, String>,
    pub fallback_solver: Option<String>,
    pub outcome: EventOutcome,
    pub impact: ImpactLevel,
}

impl DegradationEvent {
    pub fn new(
        solver_name: impl Into<String>,
        problem_type: ProblemType,
        reason: FailureReason,
        fallback_solver: Option<String>,
        outcome: EventOutcome,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            solver_name: solver_name.into(),
            problem_type,
            reason,
            details: BTreeMap::new(),
            fallback_solver,
            outcome,
            impact: reason.impact(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_details(mut self, details: BTreeMap<String, String>) -> Self {
        self.details = details;
        self
    }

    /// Override the impact derived from the reason.
    pub fn with_impact(mut self, impact: ImpactLevel) -> Self {
        self.impact = impact;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outcomes & status
// ─────────────────────────────────────────────────────────────────────────────

/// Result of an external solve, reported back by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveOutcome {
    pub success: bool,
    pub solve_time_secs: f64,
    /// Solution quality in `[0, 1]` (1 = proven optimal).
    pub quality: Option<f64>,
    pub failure: Option<SolveFailure>,
}

impl SolveOutcome {
    pub fn success(solve_time_secs: f64, quality: f64) -> Self {
        Self {
            success: true,
            solve_time_secs,
            quality: Some(quality),
            failure: None,
        }
    }

    pub fn failure(failure: SolveFailure, solve_time_secs: f64) -> Self {
        Self {
            success: false,
            solve_time_secs,
            quality: None,
            failure: Some(failure),
        }
    }
}

/// Everything the caller needs to know after reporting a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    pub event: DegradationEvent,
    /// Solver to try next, or `None` when the request must be treated as
    /// failed.
    pub fallback_solver: Option<String>,
}

/// Circuit breaker state, as exposed to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakerState::Closed => write!(f, "closed"),
            BreakerState::Open => write!(f, "open"),
            BreakerState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Lifetime counters of one circuit breaker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerMetricsSnapshot {
    pub total_successes: u64,
    pub total_failures: u64,
    /// Usability checks answered "no" while open.
    pub total_rejected: u64,
    pub total_transitions: u64,
}

/// Per-solver line in [`SystemStatus`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverStatusReport {
    pub solver_name: String,
    pub available: bool,
    pub breaker: BreakerState,
    pub breaker_metrics: CircuitBreakerMetricsSnapshot,
    pub health: SolverHealthMetrics,
}

/// Observability snapshot of the whole subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub degradation_level: DegradationLevel,
    pub available_count: usize,
    pub healthy_solvers: Vec<String>,
    pub open_circuit_breakers: Vec<String>,
    pub recent_failures: Vec<DegradationEvent>,
    pub solvers: Vec<SolverStatusReport>,
    pub generated_at: DateTime<Utc>,
}
