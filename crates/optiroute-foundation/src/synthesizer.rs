//! Configuration synthesizer.
//!
//! Builds the parameter map for a selected solver in layers: registered
//! defaults, the learned profile for the `(solver, problem type)` pair,
//! predictor hints, size scaling, history-based adjustment and the caller's
//! time budget. Each layer is validated against the parameter schema;
//! values that fail are dropped with a warning. Synthesis never fails.

use crate::registry::SolverRegistry;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use optiroute_kernel::config::SynthesisSettings;
use optiroute_kernel::health::SolveOutcome;
use optiroute_kernel::parameter::{ParameterMap, ParameterRole, ParameterValue};
use optiroute_kernel::probe::{NoopPredictor, PredictionFeatures, Predictor};
use optiroute_kernel::problem::{ProblemCharacteristics, ProblemType, SizeClass};
use optiroute_kernel::solver::SolverCapability;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Weight of the newest outcome in the profile's success-rate average.
const SUCCESS_EMA_ALPHA: f64 = 0.2;

/// Learned configuration and rolling outcome statistics for one solver on
/// one problem type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationProfile {
    pub solver_name: String,
    pub problem_type: ProblemType,
    /// Overlay applied on top of the solver's defaults.
    pub parameters: ParameterMap,
    pub usage_count: u64,
    pub success_count: u64,
    /// Exponential moving average of outcome success.
    pub success_rate: f64,
    /// Mean wall time of successful runs.
    pub average_solve_time_secs: f64,
    pub average_quality: Option<f64>,
    /// Configuration used by the most recent reported run.
    pub last_parameters: Option<ParameterMap>,
    pub updated_at: DateTime<Utc>,
}

impl ConfigurationProfile {
    pub fn new(solver_name: impl Into<String>, problem_type: ProblemType) -> Self {
        Self {
            solver_name: solver_name.into(),
            problem_type,
            parameters: ParameterMap::new(),
            usage_count: 0,
            success_count: 0,
            success_rate: 1.0,
            average_solve_time_secs: 0.0,
            average_quality: None,
            last_parameters: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: ParameterValue) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    fn record(&mut self, outcome: &SolveOutcome, used: Option<&ParameterMap>) {
        let success = if outcome.success { 1.0 } else { 0.0 };
        if self.usage_count == 0 {
            self.success_rate = success;
        } else {
            self.success_rate += SUCCESS_EMA_ALPHA * (success - self.success_rate);
        }
        if outcome.success {
            let n = self.success_count as f64;
            self.average_solve_time_secs =
                (self.average_solve_time_secs * n + outcome.solve_time_secs) / (n + 1.0);
            self.success_count += 1;
        }
        if let Some(q) = outcome.quality {
            self.average_quality = Some(match self.average_quality {
                Some(avg) => avg + SUCCESS_EMA_ALPHA * (q - avg),
                None => q,
            });
        }
        if let Some(used) = used {
            self.last_parameters = Some(used.clone());
        }
        self.usage_count += 1;
        self.updated_at = Utc::now();
    }
}

pub struct ConfigurationSynthesizer {
    registry: Arc<SolverRegistry>,
    profiles: DashMap<(String, ProblemType), ConfigurationProfile>,
    predictor: Arc<dyn Predictor>,
    settings: SynthesisSettings,
}

impl ConfigurationSynthesizer {
    pub fn new(registry: Arc<SolverRegistry>, settings: SynthesisSettings) -> Self {
        Self {
            registry,
            profiles: DashMap::new(),
            predictor: Arc::new(NoopPredictor),
            settings,
        }
    }

    pub fn with_predictor(mut self, predictor: Arc<dyn Predictor>) -> Self {
        self.predictor = predictor;
        self
    }

    pub fn settings(&self) -> &SynthesisSettings {
        &self.settings
    }

    /// Install or replace a profile.
    pub fn set_profile(&self, profile: ConfigurationProfile) {
        self.profiles
            .insert((profile.solver_name.clone(), profile.problem_type), profile);
    }

    pub fn profile(&self, solver: &str, problem_type: ProblemType) -> Option<ConfigurationProfile> {
        self.profiles
            .get(&(solver.to_string(), problem_type))
            .map(|p| p.value().clone())
    }

    /// Every profile, sorted by solver then problem type.
    pub fn profiles(&self) -> Vec<ConfigurationProfile> {
        let mut all: Vec<ConfigurationProfile> = self.profiles.iter().map(|p| p.value().clone()).collect();
        all.sort_by(|a, b| {
            a.solver_name
                .cmp(&b.solver_name)
                .then_with(|| a.problem_type.cmp(&b.problem_type))
        });
        all
    }

    /// Fold a reported outcome into the pair's rolling statistics.
    pub fn record_outcome(
        &self,
        solver: &str,
        problem_type: ProblemType,
        used: Option<&ParameterMap>,
        outcome: &SolveOutcome,
    ) {
        let mut profile = self
            .profiles
            .entry((solver.to_string(), problem_type))
            .or_insert_with(|| ConfigurationProfile::new(solver, problem_type));
        profile.record(outcome, used);
        debug!(
            solver,
            problem_type = %problem_type,
            runs = profile.usage_count,
            success_rate = profile.success_rate,
            "Updated configuration profile"
        );
    }

    /// Parameter map for `solver` on a problem of `problem_type`.
    ///
    /// Unknown solvers yield an empty map. Every returned value passes its
    /// parameter's validation and no time limit exceeds the hard maximum.
    pub fn synthesize(
        &self,
        solver: &str,
        problem_type: ProblemType,
        chars: &ProblemCharacteristics,
    ) -> ParameterMap {
        let capability = match self.registry.get(solver) {
            Ok(capability) => capability,
            Err(e) => {
                warn!(solver, error = %e, "Cannot synthesize configuration");
                return ParameterMap::new();
            }
        };

        let mut params: ParameterMap = capability
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.default.clone()))
            .collect();
        let profile = self.profile(solver, problem_type);

        if let Some(profile) = &profile {
            overlay(&capability, &mut params, &profile.parameters, "profile");
        }
        let hints = self.predictor.predict(&PredictionFeatures {
            solver_name: solver.to_string(),
            problem_type,
            characteristics: chars.clone(),
        });
        overlay(&capability, &mut params, &hints, "predictor");

        self.apply_size(&capability, &mut params, problem_type, chars);
        if let Some(profile) = &profile {
            self.apply_history(&capability, &mut params, profile);
        }
        if let Some(budget) = chars.hints.max_solve_time_secs {
            self.scale_role(&capability, &mut params, ParameterRole::TimeLimit, |limit| {
                limit.min(budget)
            });
        }

        finalize(&capability, params)
    }

    fn apply_size(
        &self,
        capability: &SolverCapability,
        params: &mut ParameterMap,
        problem_type: ProblemType,
        chars: &ProblemCharacteristics,
    ) {
        let factor = self.settings.time_factor(chars.size);
        self.scale_role(capability, params, ParameterRole::TimeLimit, |limit| limit * factor);

        if chars.size.is_large() && capability.parallel_capable {
            let cores = std::thread::available_parallelism()
                .map(|n| n.get() as f64)
                .unwrap_or(4.0);
            self.scale_role(capability, params, ParameterRole::Threads, |threads| {
                threads.max(cores)
            });
        }

        if chars.size == SizeClass::VeryLarge && problem_type == ProblemType::MixedIntegerProgramming {
            self.scale_role(capability, params, ParameterRole::OptimalityGap, |gap| gap.max(0.01));
        }
    }

    fn apply_history(
        &self,
        capability: &SolverCapability,
        params: &mut ParameterMap,
        profile: &ConfigurationProfile,
    ) {
        if profile.usage_count < self.settings.min_runs_for_adjustment {
            return;
        }
        if profile.success_rate < self.settings.low_success_threshold {
            debug!(
                solver = %capability.name,
                success_rate = profile.success_rate,
                "Loosening limits after poor history"
            );
            self.scale_role(capability, params, ParameterRole::TimeLimit, |limit| limit * 1.5);
            self.scale_role(capability, params, ParameterRole::Threads, |threads| threads * 2.0);
        } else if profile.success_rate > self.settings.high_success_threshold {
            let fast = role_value(capability, params, ParameterRole::TimeLimit)
                .is_some_and(|limit| profile.average_solve_time_secs < 0.25 * limit);
            if fast {
                self.scale_role(capability, params, ParameterRole::TimeLimit, |limit| limit * 0.75);
            }
        }
    }

    /// Apply `f` to every numeric parameter with `role`, clamping into the
    /// parameter's bounds. Time limits are additionally held under the
    /// configured hard maximum.
    fn scale_role(
        &self,
        capability: &SolverCapability,
        params: &mut ParameterMap,
        role: ParameterRole,
        f: impl Fn(f64) -> f64,
    ) {
        for spec in capability.parameters.iter().filter(|p| p.role == role) {
            let Some(current) = params.get(&spec.name).and_then(ParameterValue::as_f64) else {
                continue;
            };
            let mut next = f(current);
            if role == ParameterRole::TimeLimit {
                next = next.min(self.settings.hard_max_time_limit_secs);
            }
            if !next.is_finite() {
                continue;
            }
            if let Some(value) = spec.clamp(next) {
                params.insert(spec.name.clone(), value);
            }
        }
    }
}

impl std::fmt::Debug for ConfigurationSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationSynthesizer")
            .field("profiles", &self.profiles.len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn role_value(capability: &SolverCapability, params: &ParameterMap, role: ParameterRole) -> Option<f64> {
    capability
        .parameters
        .iter()
        .find(|p| p.role == role)
        .and_then(|p| params.get(&p.name))
        .and_then(ParameterValue::as_f64)
}

/// Merge `layer` into `params`, dropping unknown names and invalid values.
fn overlay(capability: &SolverCapability, params: &mut ParameterMap, layer: &ParameterMap, source: &str) {
    for (name, value) in layer {
        let Some(spec) = capability.parameter(name) else {
            warn!(solver = %capability.name, parameter = %name, source, "Dropping unknown parameter");
            continue;
        };
        match spec.validate(value) {
            Ok(()) => {
                params.insert(name.clone(), value.clone());
            }
            Err(reason) => {
                warn!(solver = %capability.name, source, %reason, "Dropping invalid parameter");
            }
        }
    }
}

/// Last line of defence: any value that fails validation reverts to the
/// parameter's default.
fn finalize(capability: &SolverCapability, mut params: ParameterMap) -> ParameterMap {
    for spec in &capability.parameters {
        let valid = params
            .get(&spec.name)
            .is_some_and(|value| spec.validate(value).is_ok());
        if !valid {
            warn!(solver = %capability.name, parameter = %spec.name, "Reverting parameter to default");
            params.insert(spec.name.clone(), spec.default.clone());
        }
    }
    params.retain(|name, _| capability.parameter(name).is_some());
    params
}
