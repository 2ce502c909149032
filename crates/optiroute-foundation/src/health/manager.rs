//! Per-solver health metrics and circuit breakers.

use super::circuit_breaker::CircuitBreaker;
use chrono::Utc;
use dashmap::DashMap;
use optiroute_kernel::config::CircuitBreakerSettings;
use optiroute_kernel::health::{BreakerState, FailureReason, HealthStatus, SolverHealthMetrics};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Health state of one solver.
#[derive(Debug)]
pub struct SolverHealth {
    metrics: Mutex<SolverHealthMetrics>,
    breaker: CircuitBreaker,
}

impl SolverHealth {
    fn new(name: &str, settings: CircuitBreakerSettings) -> Self {
        Self {
            metrics: Mutex::new(SolverHealthMetrics::new(name)),
            breaker: CircuitBreaker::new(name, settings),
        }
    }

    pub fn metrics(&self) -> SolverHealthMetrics {
        self.metrics.lock().clone()
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

/// Tracks outcome history and breaker state for every solver that has been
/// reported on. Solvers never reported on are treated as healthy with a
/// closed breaker.
#[derive(Debug)]
pub struct HealthManager {
    settings: CircuitBreakerSettings,
    solvers: DashMap<String, Arc<SolverHealth>>,
}

impl HealthManager {
    pub fn new(settings: CircuitBreakerSettings) -> Self {
        Self {
            settings,
            solvers: DashMap::new(),
        }
    }

    fn entry(&self, name: &str) -> Arc<SolverHealth> {
        if let Some(existing) = self.solvers.get(name) {
            return Arc::clone(existing.value());
        }
        let health = self
            .solvers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(SolverHealth::new(name, self.settings.effective_for(name))));
        Arc::clone(health.value())
    }

    pub fn get(&self, name: &str) -> Option<Arc<SolverHealth>> {
        self.solvers.get(name).map(|h| Arc::clone(h.value()))
    }

    /// Record a successful solve. Returns the updated metrics.
    pub fn record_success(&self, name: &str) -> SolverHealthMetrics {
        let health = self.entry(name);
        health.breaker.record_success();
        let mut metrics = health.metrics.lock();
        metrics.record_success(Utc::now());
        debug!(solver = name, health = metrics.health_score, "Recorded success");
        metrics.clone()
    }

    /// Record a failed solve. Returns the updated metrics.
    pub fn record_failure(&self, name: &str, reason: FailureReason) -> SolverHealthMetrics {
        let health = self.entry(name);
        health.breaker.record_failure();
        let mut metrics = health.metrics.lock();
        metrics.record_failure(reason, Utc::now());
        debug!(
            solver = name,
            %reason,
            health = metrics.health_score,
            streak = metrics.consecutive_failures,
            "Recorded failure"
        );
        metrics.clone()
    }

    pub fn metrics(&self, name: &str) -> Option<SolverHealthMetrics> {
        self.get(name).map(|h| h.metrics())
    }

    /// Observed success rate, if the solver has any recorded outcome.
    pub fn reliability(&self, name: &str) -> Option<f64> {
        self.get(name)
            .and_then(|h| h.metrics.lock().observed_success_rate())
    }

    /// `true` unless the solver's breaker is open.
    pub fn is_usable(&self, name: &str) -> bool {
        self.get(name).is_none_or(|h| h.breaker.is_usable())
    }

    /// Like [`is_usable`](Self::is_usable), but an open breaker records a
    /// rejection. Call once per solver per selection decision.
    pub fn admit(&self, name: &str) -> bool {
        self.get(name).is_none_or(|h| h.breaker.admit())
    }

    pub fn breaker_state(&self, name: &str) -> BreakerState {
        self.get(name)
            .map(|h| h.breaker.state())
            .unwrap_or(BreakerState::Closed)
    }

    pub fn consecutive_failures(&self, name: &str) -> u32 {
        self.get(name)
            .map(|h| h.metrics.lock().consecutive_failures)
            .unwrap_or(0)
    }

    /// Names of solvers whose breaker is currently open, sorted.
    pub fn open_breakers(&self) -> Vec<String> {
        let mut open: Vec<String> = self
            .solvers
            .iter()
            .filter(|e| e.value().breaker.state() == BreakerState::Open)
            .map(|e| e.key().clone())
            .collect();
        open.sort();
        open
    }

    /// Whether the solver counts as healthy: no recorded outcome, or a
    /// healthy status with a closed breaker.
    pub fn is_healthy(&self, name: &str) -> bool {
        match self.get(name) {
            None => true,
            Some(h) => {
                h.breaker.state() == BreakerState::Closed
                    && h.metrics.lock().status == HealthStatus::Healthy
            }
        }
    }

    /// Close a solver's breaker and forget its history.
    pub fn reset(&self, name: &str) {
        self.solvers.remove(name);
    }
}

impl Default for HealthManager {
    fn default() -> Self {
        Self::new(CircuitBreakerSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_solver_is_usable_and_closed() {
        let manager = HealthManager::default();
        assert!(manager.is_usable("gurobi"));
        assert!(manager.is_healthy("gurobi"));
        assert_eq!(manager.breaker_state("gurobi"), BreakerState::Closed);
        assert_eq!(manager.reliability("gurobi"), None);
    }

    #[test]
    fn failures_open_the_breaker() {
        let manager = HealthManager::default();
        for _ in 0..3 {
            manager.record_failure("cbc", FailureReason::Error);
        }
        assert!(!manager.is_usable("cbc"));
        assert_eq!(manager.open_breakers(), vec!["cbc".to_string()]);
        assert_eq!(manager.consecutive_failures("cbc"), 3);

        assert!(!manager.admit("cbc"));
        assert!(manager.admit("highs"));
        let rejected = manager.get("cbc").unwrap().breaker().metrics().total_rejected();
        assert_eq!(rejected, 1);
    }

    #[test]
    fn success_updates_reliability() {
        let manager = HealthManager::default();
        manager.record_failure("glop", FailureReason::Timeout);
        let metrics = manager.record_success("glop");
        assert_eq!(metrics.consecutive_failures, 0);
        assert!((manager.reliability("glop").unwrap() - 0.91).abs() < 1e-12);
    }

    #[test]
    fn per_solver_override_applies() {
        let settings: CircuitBreakerSettings = serde_json::from_str(
            r#"{ "overrides": [ { "solver": "gurobi", "failure_threshold": 1 } ] }"#,
        )
        .unwrap();
        let manager = HealthManager::new(settings);
        manager.record_failure("gurobi", FailureReason::Crash);
        manager.record_failure("cbc", FailureReason::Crash);
        assert!(!manager.is_usable("gurobi"));
        assert!(manager.is_usable("cbc"));
    }

    #[test]
    fn reset_forgets_history() {
        let manager = HealthManager::default();
        for _ in 0..3 {
            manager.record_failure("cbc", FailureReason::Error);
        }
        manager.reset("cbc");
        assert!(manager.is_usable("cbc"));
        assert!(manager.metrics("cbc").is_none());
    }
}
