//! Solver health tracking.
//!
//! Every reported outcome updates an exponentially weighted health record
//! and the solver's [`CircuitBreaker`]. The selector consults
//! [`HealthManager::is_usable`] and [`HealthManager::reliability`] when
//! ranking candidates.

pub mod circuit_breaker;
pub mod manager;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerMetrics, StateTransition};
pub use manager::{HealthManager, SolverHealth};
