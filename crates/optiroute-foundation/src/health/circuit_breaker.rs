//! Per-solver circuit breaker.
//!
//! ```text
//!     +---------+   failure_count >= threshold   +--------+
//!     | CLOSED  | -----------------------------> |  OPEN  |
//!     +---------+                                +--------+
//!          ^                                      |    ^
//!          | success_threshold                    |    | any failure
//!          | consecutive successes   recovery     v    |
//!          +------------------------ timeout -> +-----------+
//!                                               | HALF-OPEN |
//!                                               +-----------+
//! ```
//!
//! In the closed state a success *decrements* the failure count (floored at
//! zero) rather than resetting it, so an intermittently failing solver still
//! trips the breaker eventually.

use chrono::{DateTime, Utc};
use optiroute_kernel::config::CircuitBreakerSettings;
use optiroute_kernel::health::{BreakerState, CircuitBreakerMetricsSnapshot};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{info, warn};

/// Transitions kept per breaker for observability.
const TRANSITION_HISTORY: usize = 32;

/// State transition event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from_state: BreakerState,
    pub to_state: BreakerState,
    pub at: DateTime<Utc>,
}

/// Counters for one breaker.
#[derive(Debug, Default)]
pub struct CircuitBreakerMetrics {
    total_successes: AtomicU64,
    total_failures: AtomicU64,
    /// Routing decisions turned away while open.
    total_rejected: AtomicU64,
    total_transitions: AtomicU64,
    transitions: RwLock<VecDeque<StateTransition>>,
}

impl CircuitBreakerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_success(&self) {
        self.total_successes.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.total_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn record_rejected(&self) {
        self.total_rejected.fetch_add(1, Ordering::Relaxed);
    }

    fn record_transition(&self, transition: StateTransition) {
        self.total_transitions.fetch_add(1, Ordering::Relaxed);
        let mut history = self.transitions.write();
        if history.len() == TRANSITION_HISTORY {
            history.pop_front();
        }
        history.push_back(transition);
    }

    pub fn total_successes(&self) -> u64 {
        self.total_successes.load(Ordering::Relaxed)
    }

    pub fn total_failures(&self) -> u64 {
        self.total_failures.load(Ordering::Relaxed)
    }

    pub fn total_rejected(&self) -> u64 {
        self.total_rejected.load(Ordering::Relaxed)
    }

    pub fn total_transitions(&self) -> u64 {
        self.total_transitions.load(Ordering::Relaxed)
    }

    /// Most recent transitions, oldest first.
    pub fn transitions(&self) -> Vec<StateTransition> {
        self.transitions.read().iter().cloned().collect()
    }

    pub fn snapshot(&self) -> CircuitBreakerMetricsSnapshot {
        CircuitBreakerMetricsSnapshot {
            total_successes: self.total_successes(),
            total_failures: self.total_failures(),
            total_rejected: self.total_rejected(),
            total_transitions: self.total_transitions(),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    failure_count: u32,
    /// Consecutive successes while half-open.
    success_count: u32,
    opened_at: Option<Instant>,
}

/// Circuit breaker guarding one solver.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    settings: CircuitBreakerSettings,
    inner: Mutex<BreakerInner>,
    metrics: CircuitBreakerMetrics,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, settings: CircuitBreakerSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                failure_count: 0,
                success_count: 0,
                opened_at: None,
            }),
            metrics: CircuitBreakerMetrics::new(),
        }
    }

    pub fn with_default(name: impl Into<String>) -> Self {
        Self::new(name, CircuitBreakerSettings::default())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &CircuitBreakerSettings {
        &self.settings
    }

    pub fn metrics(&self) -> &CircuitBreakerMetrics {
        &self.metrics
    }

    /// Current state. An open breaker whose recovery timeout has elapsed
    /// moves to half-open here.
    pub fn state(&self) -> BreakerState {
        let mut inner = self.inner.lock();
        self.maybe_half_open(&mut inner);
        inner.state
    }

    pub fn failure_count(&self) -> u32 {
        self.inner.lock().failure_count
    }

    /// Whether the selector may route to this solver: closed or half-open.
    /// A read only; see [`admit`](Self::admit) for the counted check.
    pub fn is_usable(&self) -> bool {
        if !self.settings.enabled {
            return true;
        }
        let mut inner = self.inner.lock();
        self.maybe_half_open(&mut inner);
        inner.state != BreakerState::Open
    }

    /// [`is_usable`](Self::is_usable) for one routing decision. An open
    /// breaker counts the rejection.
    pub fn admit(&self) -> bool {
        let usable = self.is_usable();
        if !usable {
            self.metrics.record_rejected();
        }
        usable
    }

    pub fn record_success(&self) {
        if !self.settings.enabled {
            return;
        }
        self.metrics.record_success();
        let mut inner = self.inner.lock();
        self.maybe_half_open(&mut inner);
        match inner.state {
            BreakerState::Closed => {
                inner.failure_count = inner.failure_count.saturating_sub(1);
            }
            BreakerState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.settings.success_threshold {
                    self.transition(&mut inner, BreakerState::Closed);
                }
            }
            // Late report for a request admitted before the breaker opened.
            BreakerState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        if !self.settings.enabled {
            return;
        }
        self.metrics.record_failure();
        let mut inner = self.inner.lock();
        self.maybe_half_open(&mut inner);
        match inner.state {
            BreakerState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.settings.failure_threshold {
                    self.transition(&mut inner, BreakerState::Open);
                }
            }
            BreakerState::HalfOpen => {
                self.transition(&mut inner, BreakerState::Open);
            }
            BreakerState::Open => {}
        }
    }

    /// Force the breaker back to closed.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        self.transition(&mut inner, BreakerState::Closed);
    }

    fn maybe_half_open(&self, inner: &mut BreakerInner) {
        if inner.state != BreakerState::Open {
            return;
        }
        let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
        if elapsed >= self.settings.recovery_timeout() {
            self.transition(inner, BreakerState::HalfOpen);
        }
    }

    fn transition(&self, inner: &mut BreakerInner, to: BreakerState) {
        let from = inner.state;
        if from == to {
            return;
        }
        inner.state = to;
        match to {
            BreakerState::Open => {
                inner.opened_at = Some(Instant::now());
                inner.success_count = 0;
                warn!(
                    solver = %self.name,
                    failures = inner.failure_count,
                    "Circuit breaker opened"
                );
            }
            BreakerState::HalfOpen => {
                inner.success_count = 0;
                info!(solver = %self.name, "Circuit breaker half-open, allowing trial requests");
            }
            BreakerState::Closed => {
                inner.failure_count = 0;
                inner.success_count = 0;
                inner.opened_at = None;
                info!(solver = %self.name, "Circuit breaker closed");
            }
        }
        self.metrics.record_transition(StateTransition {
            from_state: from,
            to_state: to,
            at: Utc::now(),
        });
    }
}
