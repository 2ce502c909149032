use super::{ConfigError, ConfigResult};
use crate::problem::SizeClass;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration of the selection subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    pub prober: ProberSettings,
    pub circuit_breaker: CircuitBreakerSettings,
    pub scoring: ScoringSettings,
    pub degradation: DegradationSettings,
    pub synthesis: SynthesisSettings,
}

impl RouterConfig {
    /// Reject configurations that would make the subsystem misbehave.
    pub fn validate(&self) -> ConfigResult<()> {
        self.scoring.weights.validate()?;
        if !(1..=5).contains(&self.scoring.min_profile_rating) {
            return Err(ConfigError::Invalid(format!(
                "scoring.min_profile_rating = {} is outside 1..=5",
                self.scoring.min_profile_rating
            )));
        }
        if !(0.0..=1.0).contains(&self.scoring.default_reliability) {
            return Err(ConfigError::Invalid(
                "scoring.default_reliability must be within [0, 1]".to_string(),
            ));
        }
        if self.scoring.max_fallback_chain == 0 {
            return Err(ConfigError::Invalid(
                "scoring.max_fallback_chain must be greater than 0".to_string(),
            ));
        }
        if self.prober.probe_timeout_ms == 0 || self.prober.cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "prober timeouts must be greater than 0".to_string(),
            ));
        }
        self.circuit_breaker.validate("circuit_breaker")?;
        for o in &self.circuit_breaker.overrides {
            o.settings.validate(&format!("circuit_breaker.overrides[{}]", o.solver))?;
        }
        if self.degradation.window_secs == 0 || self.degradation.max_events == 0 {
            return Err(ConfigError::Invalid(
                "degradation window and event capacity must be greater than 0".to_string(),
            ));
        }
        if self.synthesis.hard_max_time_limit_secs <= 0.0 {
            return Err(ConfigError::Invalid(
                "synthesis.hard_max_time_limit_secs must be positive".to_string(),
            ));
        }
        if self.synthesis.low_success_threshold >= self.synthesis.high_success_threshold {
            return Err(ConfigError::Invalid(
                "synthesis.low_success_threshold must be below high_success_threshold".to_string(),
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Prober
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProberSettings {
    /// How long a probe result stays valid.
    pub cache_ttl_secs: u64,
    /// Upper bound on a single probe.
    pub probe_timeout_ms: u64,
    /// Period of the background `refresh_all` loop.
    pub refresh_interval_secs: u64,
    /// Consecutive failures after which a solver's cache entry is dropped
    /// so the next check re-probes it.
    pub reprobe_after_failures: u32,
}

impl Default for ProberSettings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            probe_timeout_ms: 5_000,
            refresh_interval_secs: 600,
            reprobe_after_failures: 3,
        }
    }
}

impl ProberSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Circuit breaker
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    /// Failures (net of successes) that open a closed breaker.
    pub failure_threshold: u32,
    /// Consecutive half-open successes that close the breaker.
    pub success_threshold: u32,
    /// Time an open breaker waits before allowing a trial request.
    pub recovery_timeout_ms: u64,
    pub enabled: bool,
    /// Per-solver replacements for the settings above.
    pub overrides: Vec<SolverCircuitBreakerConfig>,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 3,
            recovery_timeout_ms: 300_000,
            enabled: true,
            overrides: Vec::new(),
        }
    }
}

impl CircuitBreakerSettings {
    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_millis(self.recovery_timeout_ms)
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }

    pub fn with_recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Settings for one solver: its override if present, else these.
    pub fn effective_for(&self, solver: &str) -> CircuitBreakerSettings {
        self.overrides
            .iter()
            .find(|o| o.solver == solver)
            .map(|o| CircuitBreakerSettings {
                overrides: Vec::new(),
                ..o.settings.clone()
            })
            .unwrap_or_else(|| CircuitBreakerSettings {
                overrides: Vec::new(),
                ..self.clone()
            })
    }

    fn validate(&self, path: &str) -> ConfigResult<()> {
        if self.failure_threshold == 0 || self.success_threshold == 0 {
            return Err(ConfigError::Invalid(format!(
                "{}: thresholds must be greater than 0",
                path
            )));
        }
        if self.recovery_timeout_ms == 0 {
            return Err(ConfigError::Invalid(format!(
                "{}.recovery_timeout_ms must be greater than 0",
                path
            )));
        }
        Ok(())
    }
}

/// Circuit breaker override for a single solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverCircuitBreakerConfig {
    pub solver: String,
    #[serde(flatten)]
    pub settings: CircuitBreakerSettings,
}

// ─────────────────────────────────────────────────────────────────────────────
// Scoring
// ─────────────────────────────────────────────────────────────────────────────

/// Weights of the five scoring components. Must sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub problem_fit: f64,
    pub performance: f64,
    pub reliability: f64,
    pub availability: f64,
    pub scalability: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            problem_fit: 0.30,
            performance: 0.25,
            reliability: 0.20,
            availability: 0.15,
            scalability: 0.10,
        }
    }
}

impl ScoringWeights {
    pub const TOLERANCE: f64 = 1e-9;

    pub fn sum(&self) -> f64 {
        self.problem_fit + self.performance + self.reliability + self.availability + self.scalability
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let all = [
            self.problem_fit,
            self.performance,
            self.reliability,
            self.availability,
            self.scalability,
        ];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::Invalid(
                "scoring weights must be finite and non-negative".to_string(),
            ));
        }
        if (self.sum() - 1.0).abs() > Self::TOLERANCE {
            return Err(ConfigError::Invalid(format!(
                "scoring weights sum to {} instead of 1.0",
                self.sum()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub weights: ScoringWeights,
    /// Minimum size-bucket rating (1–5) for a solver to count as compatible.
    pub min_profile_rating: u8,
    pub max_backups: usize,
    pub max_fallback_chain: usize,
    /// Reliability history assumed for solvers with no recorded outcome.
    pub default_reliability: f64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            min_profile_rating: 3,
            max_backups: 3,
            max_fallback_chain: 5,
            default_reliability: 0.8,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Degradation
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DegradationSettings {
    /// Trailing window the degradation level is computed over.
    pub window_secs: u64,
    /// Audit log capacity; oldest events are dropped first.
    pub max_events: usize,
    /// Budget for re-selecting after a failure.
    pub fallback_selection_timeout_ms: u64,
}

impl Default for DegradationSettings {
    fn default() -> Self {
        Self {
            window_secs: 3_600,
            max_events: 1_000,
            fallback_selection_timeout_ms: 2_000,
        }
    }
}

impl DegradationSettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn fallback_selection_timeout(&self) -> Duration {
        Duration::from_millis(self.fallback_selection_timeout_ms)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Synthesis
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSettings {
    /// Absolute ceiling on any time-limit parameter, whatever its schema says.
    pub hard_max_time_limit_secs: f64,
    pub small_time_factor: f64,
    pub medium_time_factor: f64,
    pub large_time_factor: f64,
    pub very_large_time_factor: f64,
    /// Below this historical success rate limits are loosened.
    pub low_success_threshold: f64,
    /// Above this rate (with fast solves) limits are tightened.
    pub high_success_threshold: f64,
    /// Outcomes a profile needs before history adjusts anything.
    pub min_runs_for_adjustment: u64,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            hard_max_time_limit_secs: 3_600.0,
            small_time_factor: 1.0,
            medium_time_factor: 2.0,
            large_time_factor: 4.0,
            very_large_time_factor: 8.0,
            low_success_threshold: 0.7,
            high_success_threshold: 0.95,
            min_runs_for_adjustment: 3,
        }
    }
}

impl SynthesisSettings {
    pub fn time_factor(&self, size: SizeClass) -> f64 {
        match size {
            SizeClass::Small => self.small_time_factor,
            SizeClass::Medium => self.medium_time_factor,
            SizeClass::Large => self.large_time_factor,
            SizeClass::VeryLarge => self.very_large_time_factor,
        }
    }
}
