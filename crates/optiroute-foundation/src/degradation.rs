//! Degradation manager.
//!
//! Turns solve outcomes into health updates, circuit-breaker transitions,
//! audit events and fallback re-selection, and summarises recent failure
//! activity as a system-wide [`DegradationLevel`].

use crate::health::HealthManager;
use crate::prober::AvailabilityProber;
use crate::selector::SolverSelector;
use crate::synthesizer::ConfigurationSynthesizer;
use chrono::{DateTime, Utc};
use optiroute_kernel::config::DegradationSettings;
use optiroute_kernel::error::{SelectionError, SelectionResult, SolveFailure};
use optiroute_kernel::health::{
    BreakerState, DegradationEvent, DegradationLevel, EventOutcome, FailureReport, SolveOutcome,
    SolverStatusReport, SystemStatus,
};
use optiroute_kernel::parameter::ParameterMap;
use optiroute_kernel::problem::{ProblemCharacteristics, ProblemType};
use optiroute_kernel::selection::SolverSelection;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Failures listed in [`SystemStatus::recent_failures`].
const RECENT_FAILURES: usize = 10;

pub struct DegradationManager {
    health: Arc<HealthManager>,
    selector: Arc<SolverSelector>,
    prober: Arc<AvailabilityProber>,
    synthesizer: Arc<ConfigurationSynthesizer>,
    settings: DegradationSettings,
    events: Mutex<VecDeque<DegradationEvent>>,
}

impl DegradationManager {
    pub fn new(
        health: Arc<HealthManager>,
        selector: Arc<SolverSelector>,
        prober: Arc<AvailabilityProber>,
        synthesizer: Arc<ConfigurationSynthesizer>,
        settings: DegradationSettings,
    ) -> Self {
        Self {
            health,
            selector,
            prober,
            synthesizer,
            settings,
            events: Mutex::new(VecDeque::new()),
        }
    }

    pub fn settings(&self) -> &DegradationSettings {
        &self.settings
    }

    /// Record a failed solve and pick the next solver to try.
    ///
    /// Health and the breaker are updated first, so the failed solver is
    /// already excluded (or circuit-open) when re-selection runs. The
    /// re-selection is bounded by `fallback_selection_timeout` and never
    /// returns the failed solver. An event is appended whatever the result.
    pub async fn handle_failure(
        &self,
        solver: &str,
        chars: &ProblemCharacteristics,
        failure: &SolveFailure,
        details: BTreeMap<String, String>,
    ) -> FailureReport {
        let reason = failure.reason();
        let metrics = self.health.record_failure(solver, reason);
        self.synthesizer.record_outcome(
            solver,
            chars.problem_type,
            None,
            &SolveOutcome::failure(failure.clone(), 0.0),
        );

        let reprobe_after = self.prober.settings().reprobe_after_failures;
        if reprobe_after > 0 && metrics.consecutive_failures >= reprobe_after {
            self.prober.invalidate(solver);
        }

        let (fallback, outcome) = match self.reselect(solver, chars).await {
            Ok(selection) => (Some(selection.primary_solver), EventOutcome::FallbackSelected),
            Err(SelectionError::SelectionTimeout(limit)) => {
                warn!(solver, ?limit, "Fallback selection timed out");
                (None, EventOutcome::TimedOut)
            }
            Err(e) => {
                error!(solver, error = %e, "No fallback solver remains");
                (None, EventOutcome::Exhausted)
            }
        };

        let mut details = details;
        details
            .entry("failure".to_string())
            .or_insert_with(|| failure.detail());
        let event = DegradationEvent::new(solver, chars.problem_type, reason, fallback.clone(), outcome)
            .with_details(details);
        info!(
            solver,
            reason = %reason,
            impact = ?event.impact,
            fallback = ?fallback,
            breaker = %self.health.breaker_state(solver),
            "Solver degradation recorded"
        );
        self.record_event(event.clone());

        FailureReport {
            event,
            fallback_solver: fallback,
        }
    }

    /// Record a successful solve.
    pub fn handle_success(
        &self,
        solver: &str,
        problem_type: ProblemType,
        used: Option<&ParameterMap>,
        solve_time_secs: f64,
        quality: f64,
    ) {
        self.health.record_success(solver);
        self.synthesizer.record_outcome(
            solver,
            problem_type,
            used,
            &SolveOutcome::success(solve_time_secs, quality),
        );
    }

    async fn reselect(&self, failed: &str, chars: &ProblemCharacteristics) -> SelectionResult<SolverSelection> {
        let selector = Arc::clone(&self.selector);
        let (problem_type, size) = (chars.problem_type, chars.size);
        let chars = chars.clone();
        let exclude = vec![failed.to_string()];
        let limit = self.settings.fallback_selection_timeout();

        let task = tokio::task::spawn_blocking(move || selector.select_excluding(&chars, &exclude));
        match timeout(limit, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(SelectionError::NoSolverAvailable {
                problem_type,
                size,
                reason: format!("fallback selection aborted: {}", join),
            }),
            Err(_) => Err(SelectionError::SelectionTimeout(limit)),
        }
    }

    /// Append an event to the audit log, dropping the oldest past capacity.
    pub fn record_event(&self, event: DegradationEvent) {
        let mut events = self.events.lock();
        events.push_back(event);
        while events.len() > self.settings.max_events {
            events.pop_front();
        }
    }

    /// Events newer than `window` before `now`, oldest first.
    pub fn events_in_window(&self, now: DateTime<Utc>) -> Vec<DegradationEvent> {
        let cutoff = now - self.window();
        self.events
            .lock()
            .iter()
            .filter(|e| e.timestamp > cutoff && e.timestamp <= now)
            .cloned()
            .collect()
    }

    /// The `limit` most recent events, newest first.
    pub fn recent_events(&self, limit: usize) -> Vec<DegradationEvent> {
        self.events.lock().iter().rev().take(limit).cloned().collect()
    }

    pub fn degradation_level(&self) -> DegradationLevel {
        self.degradation_level_at(Utc::now())
    }

    /// Level computed over the window ending at `now`.
    pub fn degradation_level_at(&self, now: DateTime<Utc>) -> DegradationLevel {
        DegradationLevel::from_impacts(self.events_in_window(now).into_iter().map(|e| e.impact))
    }

    /// Drop every recorded event.
    pub fn clear_events(&self) {
        self.events.lock().clear();
    }

    /// Observability snapshot over every registered solver.
    pub fn system_status(&self) -> SystemStatus {
        let now = Utc::now();
        let registry = self.selector.registry();
        let mut available_count = 0;
        let mut healthy_solvers = Vec::new();
        let mut solvers = Vec::new();

        for name in registry.names() {
            let available = self.prober.is_available_cached(&name);
            if available {
                available_count += 1;
            }
            let health = self.health.get(&name);
            let breaker = health
                .as_ref()
                .map(|h| h.breaker().state())
                .unwrap_or(BreakerState::Closed);
            if available && self.health.is_healthy(&name) {
                healthy_solvers.push(name.clone());
            }
            solvers.push(SolverStatusReport {
                solver_name: name.clone(),
                available,
                breaker,
                breaker_metrics: health
                    .as_ref()
                    .map(|h| h.breaker().metrics().snapshot())
                    .unwrap_or_default(),
                health: health
                    .map(|h| h.metrics())
                    .unwrap_or_else(|| optiroute_kernel::health::SolverHealthMetrics::new(&name)),
            });
        }

        SystemStatus {
            degradation_level: self.degradation_level_at(now),
            available_count,
            healthy_solvers,
            open_circuit_breakers: self.health.open_breakers(),
            recent_failures: self.recent_events(RECENT_FAILURES),
            solvers,
            generated_at: now,
        }
    }

    fn window(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.settings.window()).unwrap_or_else(|_| chrono::Duration::hours(1))
    }
}

impl std::fmt::Debug for DegradationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DegradationManager")
            .field("settings", &self.settings)
            .field("events", &self.events.lock().len())
            .finish_non_exhaustive()
    }
}
