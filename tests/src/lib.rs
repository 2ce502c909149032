//! OptiRoute testing utilities
//!
//! Stub probes, fixture registries and a problem-spec builder for exercising
//! the router without any real solver installed.

pub mod fixtures;
pub mod probe;
pub mod spec;

pub use fixtures::{
    lp_registry, profile, rated_solver, router_with, scheduling_registry, scheduling_tree,
};
pub use probe::StubProbe;
pub use spec::ProblemSpecBuilder;
