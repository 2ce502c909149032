//! OptiRoute foundation: the runtime side of solver selection.
//!
//! [`SolverRouter`] is the entry point; the modules below can also be wired
//! by hand.

// registry module - capability store and built-in catalog
pub mod registry;

// prober module - availability cache and probes
pub mod prober;

// analyzer module - problem spec to characteristics
pub mod analyzer;

// selector module - scoring, ranking, fallback and reformulation
pub mod selector;

// synthesizer module - parameter maps for selected solvers
pub mod synthesizer;

// health module - per-solver metrics and circuit breakers
pub mod health;

// degradation module - failure handling and system status
pub mod degradation;

// router module - facade
pub mod router;

pub use analyzer::ProblemAnalyzer;
pub use degradation::DegradationManager;
pub use health::{CircuitBreaker, HealthManager};
pub use prober::AvailabilityProber;
pub use prober::probes::{CommandProbe, FnProbe, StaticProbe};
pub use registry::SolverRegistry;
pub use router::{OutcomeReport, RouterBuilder, RouterError, SolverRouter};
pub use selector::{DecisionTree, SolverSelector};
pub use synthesizer::{ConfigurationProfile, ConfigurationSynthesizer};
