//! `SolverRouter`: the facade consumed by orchestrators.
//!
//! Wires registry, prober, analyzer, selector, synthesizer and degradation
//! manager together and exposes select / synthesize / report-outcome /
//! refresh / status. Outcomes reported through
//! [`SolverRouter::report_outcome`] are queued on a channel and applied by
//! the worker started with [`SolverRouter::spawn_outcome_worker`], so the
//! reporting caller never waits on health bookkeeping.

use crate::analyzer::ProblemAnalyzer;
use crate::degradation::DegradationManager;
use crate::health::HealthManager;
use crate::prober::AvailabilityProber;
use crate::registry::{catalog, SolverRegistry};
use crate::selector::{DecisionTree, SolverSelector};
use crate::synthesizer::ConfigurationSynthesizer;
use optiroute_kernel::config::{ConfigError, RouterConfig};
use optiroute_kernel::error::{RegistryError, SelectionResult, SolveFailure};
use optiroute_kernel::health::{FailureReport, SolveOutcome, SystemStatus};
use optiroute_kernel::parameter::ParameterMap;
use optiroute_kernel::probe::{Predictor, SolverProbe};
use optiroute_kernel::problem::{ProblemCharacteristics, ProblemSpec, ProblemType};
use optiroute_kernel::selection::{SolvePlan, SolverSelection};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Errors raised while assembling a router.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RouterError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// A solve result reported back by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeReport {
    pub solver_name: String,
    /// Characteristics the solver was selected for; re-selection after a
    /// failure uses them.
    pub characteristics: ProblemCharacteristics,
    pub config_used: Option<ParameterMap>,
    pub outcome: SolveOutcome,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl OutcomeReport {
    pub fn new(
        solver_name: impl Into<String>,
        characteristics: ProblemCharacteristics,
        outcome: SolveOutcome,
    ) -> Self {
        Self {
            solver_name: solver_name.into(),
            characteristics,
            config_used: None,
            outcome,
            details: BTreeMap::new(),
        }
    }

    pub fn with_config(mut self, config: ParameterMap) -> Self {
        self.config_used = Some(config);
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Assembles a [`SolverRouter`].
pub struct RouterBuilder {
    config: RouterConfig,
    registry: Option<SolverRegistry>,
    probes: Vec<(String, Arc<dyn SolverProbe>)>,
    decision_tree: Option<DecisionTree>,
    predictor: Option<Arc<dyn Predictor>>,
}

impl RouterBuilder {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            registry: None,
            probes: Vec::new(),
            decision_tree: None,
            predictor: None,
        }
    }

    /// Use `registry` instead of the built-in catalog.
    pub fn registry(mut self, registry: SolverRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn probe(mut self, solver: impl Into<String>, probe: Arc<dyn SolverProbe>) -> Self {
        self.probes.push((solver.into(), probe));
        self
    }

    pub fn probes(mut self, probes: impl IntoIterator<Item = (String, Arc<dyn SolverProbe>)>) -> Self {
        self.probes.extend(probes);
        self
    }

    pub fn decision_tree(mut self, tree: DecisionTree) -> Self {
        self.decision_tree = Some(tree);
        self
    }

    pub fn predictor(mut self, predictor: Arc<dyn Predictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    /// Validate the configuration and wire every component.
    ///
    /// Without an explicit registry the built-in catalog is used, together
    /// with its probes and decision tree (explicit ones take precedence).
    pub fn build(self) -> Result<SolverRouter, RouterError> {
        self.config.validate()?;
        let builtin = self.registry.is_none();
        let registry = Arc::new(match self.registry {
            Some(registry) => registry,
            None => catalog::builtin_registry()?,
        });

        let prober = AvailabilityProber::new(registry.clone(), self.config.prober.clone());
        if builtin {
            for (solver, probe) in catalog::builtin_probes() {
                prober.register_probe(solver, probe);
            }
        }
        for (solver, probe) in self.probes {
            prober.register_probe(solver, probe);
        }
        let prober = Arc::new(prober);

        let tree = match self.decision_tree {
            Some(tree) => tree,
            None if builtin => catalog::builtin_decision_tree(),
            None => DecisionTree::default(),
        };

        let health = Arc::new(HealthManager::new(self.config.circuit_breaker.clone()));
        let selector = Arc::new(
            SolverSelector::new(
                registry.clone(),
                prober.clone(),
                health.clone(),
                self.config.scoring.clone(),
            )
            .with_decision_tree(tree),
        );
        let mut synthesizer = ConfigurationSynthesizer::new(registry.clone(), self.config.synthesis.clone());
        if let Some(predictor) = self.predictor {
            synthesizer = synthesizer.with_predictor(predictor);
        }
        let synthesizer = Arc::new(synthesizer);
        let degradation = DegradationManager::new(
            health.clone(),
            selector.clone(),
            prober.clone(),
            synthesizer.clone(),
            self.config.degradation.clone(),
        );

        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        info!(solvers = registry.len(), builtin, "Solver router ready");

        Ok(SolverRouter {
            config: self.config,
            registry,
            prober,
            health,
            analyzer: ProblemAnalyzer::new(),
            selector,
            synthesizer,
            degradation,
            outcome_tx,
            outcome_rx: Mutex::new(Some(outcome_rx)),
        })
    }
}

pub struct SolverRouter {
    config: RouterConfig,
    registry: Arc<SolverRegistry>,
    prober: Arc<AvailabilityProber>,
    health: Arc<HealthManager>,
    analyzer: ProblemAnalyzer,
    selector: Arc<SolverSelector>,
    synthesizer: Arc<ConfigurationSynthesizer>,
    degradation: DegradationManager,
    outcome_tx: mpsc::UnboundedSender<OutcomeReport>,
    outcome_rx: Mutex<Option<mpsc::UnboundedReceiver<OutcomeReport>>>,
}

impl SolverRouter {
    pub fn builder(config: RouterConfig) -> RouterBuilder {
        RouterBuilder::new(config)
    }

    /// Router over the built-in catalog.
    pub fn with_builtin_catalog(config: RouterConfig) -> Result<Self, RouterError> {
        RouterBuilder::new(config).build()
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SolverRegistry> {
        &self.registry
    }

    pub fn prober(&self) -> &Arc<AvailabilityProber> {
        &self.prober
    }

    pub fn health(&self) -> &Arc<HealthManager> {
        &self.health
    }

    pub fn selector(&self) -> &Arc<SolverSelector> {
        &self.selector
    }

    pub fn synthesizer(&self) -> &Arc<ConfigurationSynthesizer> {
        &self.synthesizer
    }

    pub fn degradation(&self) -> &DegradationManager {
        &self.degradation
    }

    pub fn analyze(&self, spec: &ProblemSpec) -> SelectionResult<ProblemCharacteristics> {
        self.analyzer.analyze(spec)
    }

    pub fn select(
        &self,
        chars: &ProblemCharacteristics,
        preferred: Option<&str>,
    ) -> SelectionResult<SolverSelection> {
        self.selector.select(chars, preferred)
    }

    pub fn synthesize(
        &self,
        solver: &str,
        problem_type: ProblemType,
        chars: &ProblemCharacteristics,
    ) -> ParameterMap {
        self.synthesizer.synthesize(solver, problem_type, chars)
    }

    /// Analyze, select and synthesize in one call.
    pub fn plan(&self, spec: &ProblemSpec, preferred: Option<&str>) -> SelectionResult<SolvePlan> {
        let chars = self.analyze(spec)?;
        let selection = self.select(&chars, preferred)?;
        let parameters = self.synthesize(
            &selection.primary_solver,
            selection.characteristics.problem_type,
            &selection.characteristics,
        );
        Ok(SolvePlan {
            selection,
            parameters,
        })
    }

    /// Queue an outcome for the worker. Never blocks.
    pub fn report_outcome(&self, report: OutcomeReport) {
        if self.outcome_tx.send(report).is_err() {
            warn!("Outcome worker is gone, dropping report");
        }
    }

    /// Apply an outcome immediately. Returns the failure report (with the
    /// fallback solver, if any) for failed solves.
    pub async fn apply_outcome(&self, report: OutcomeReport) -> Option<FailureReport> {
        let OutcomeReport {
            solver_name,
            characteristics,
            config_used,
            outcome,
            details,
        } = report;

        if outcome.success {
            self.degradation.handle_success(
                &solver_name,
                characteristics.problem_type,
                config_used.as_ref(),
                outcome.solve_time_secs,
                outcome.quality.unwrap_or(1.0),
            );
            return None;
        }

        let failure = outcome
            .failure
            .unwrap_or_else(|| SolveFailure::Error("unspecified failure".to_string()));
        let report = self
            .degradation
            .handle_failure(&solver_name, &characteristics, &failure, details)
            .await;
        Some(report)
    }

    /// Start the task that drains [`report_outcome`](Self::report_outcome)
    /// submissions. Only the first call starts a worker; later calls return
    /// `None`.
    pub fn spawn_outcome_worker(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let mut rx = self.outcome_rx.lock().take()?;
        let router = Arc::clone(self);
        Some(tokio::spawn(async move {
            while let Some(report) = rx.recv().await {
                let solver = report.solver_name.clone();
                if let Some(failure) = router.apply_outcome(report).await {
                    debug!(
                        solver = %solver,
                        fallback = ?failure.fallback_solver,
                        "Applied reported failure"
                    );
                }
            }
            debug!("Outcome channel closed");
        }))
    }

    /// Start the periodic availability refresh and the outcome worker.
    pub fn spawn_background(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let mut handles = vec![Arc::clone(&self.prober).spawn_refresh_loop()];
        handles.extend(self.spawn_outcome_worker());
        handles
    }

    pub async fn refresh_availability(&self) -> HashMap<String, bool> {
        self.prober.refresh_all().await
    }

    pub fn system_status(&self) -> SystemStatus {
        self.degradation.system_status()
    }
}

impl std::fmt::Debug for SolverRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolverRouter")
            .field("solvers", &self.registry.len())
            .field("selector", &self.selector)
            .field("degradation", &self.degradation)
            .finish_non_exhaustive()
    }
}
