//! OptiRoute kernel: the data model and extension contracts shared by every
//! OptiRoute crate.
//!
//! Nothing in here performs I/O except the optional configuration loader.
//! Implementations (registry, prober, selector, health tracking) live in
//! `optiroute-foundation`.

// error module
pub mod error;
pub use error::*;

// problem description & characteristics
pub mod problem;
pub use problem::*;

// solver capabilities
pub mod solver;
pub use solver::*;

// tunable parameters
pub mod parameter;
pub use parameter::*;

// selection results
pub mod selection;
pub use selection::*;

// health, degradation & outcomes
pub mod health;
pub use health::*;

// probe & predictor contracts
pub mod probe;
pub use probe::*;

// configuration
pub mod config;
