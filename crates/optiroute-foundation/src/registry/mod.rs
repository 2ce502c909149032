//! In-memory solver capability registry.
//!
//! The registry is written at startup (registration) and by the
//! availability prober (status updates); every other access is a read.
//! Readers get owned clones so no lock is held across selection.

pub mod catalog;

use chrono::{DateTime, Utc};
use optiroute_kernel::error::{RegistryError, RegistryResult};
use optiroute_kernel::problem::{ProblemType, SizeClass};
use optiroute_kernel::solver::{SolverCapability, SolverCategory, SolverStatus};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Minimum size-bucket rating for a solver to be considered compatible.
pub const DEFAULT_MIN_RATING: u8 = 3;

/// [`SolverCapability`] store backed by a `HashMap` behind a read-write lock.
#[derive(Debug, Default)]
pub struct SolverRegistry {
    solvers: RwLock<HashMap<String, SolverCapability>>,
    /// Per-category order in which solvers are tried as fallbacks.
    fallback_order: RwLock<BTreeMap<SolverCategory, Vec<String>>>,
}

impl SolverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a solver. Fails if the name is taken or the record is
    /// inconsistent; the existing entry is left untouched either way.
    pub fn register(&self, capability: SolverCapability) -> RegistryResult<()> {
        capability.validate()?;
        let mut solvers = self.solvers.write();
        if solvers.contains_key(&capability.name) {
            return Err(RegistryError::DuplicateSolver(capability.name));
        }
        info!(
            solver = %capability.name,
            category = %capability.category,
            types = capability.problem_types.len(),
            "Registered solver"
        );
        solvers.insert(capability.name.clone(), capability);
        Ok(())
    }

    pub fn get(&self, name: &str) -> RegistryResult<SolverCapability> {
        self.solvers
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Hold the capability table exclusively, stalling every reader.
    #[cfg(test)]
    pub(crate) fn lock_exclusive(
        &self,
    ) -> parking_lot::RwLockWriteGuard<'_, HashMap<String, SolverCapability>> {
        self.solvers.write()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.solvers.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.solvers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.solvers.read().is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.solvers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Every capability, sorted by name.
    pub fn list_all(&self) -> Vec<SolverCapability> {
        let mut all: Vec<SolverCapability> = self.solvers.read().values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Capabilities in one category, sorted by name.
    pub fn list_by_category(&self, category: SolverCategory) -> Vec<SolverCapability> {
        let mut found: Vec<SolverCapability> = self
            .solvers
            .read()
            .values()
            .filter(|c| c.category == category)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    /// Names of solvers that support `problem_type` with a rating of at
    /// least [`DEFAULT_MIN_RATING`] for `size`, best rated first.
    pub fn list_compatible(&self, problem_type: ProblemType, size: SizeClass) -> Vec<String> {
        self.list_compatible_with(problem_type, size, DEFAULT_MIN_RATING)
    }

    /// [`list_compatible`](Self::list_compatible) with an explicit rating floor.
    /// Ties are broken by name so the order is stable.
    pub fn list_compatible_with(
        &self,
        problem_type: ProblemType,
        size: SizeClass,
        min_rating: u8,
    ) -> Vec<String> {
        let solvers = self.solvers.read();
        let mut compatible: Vec<(u8, &str)> = solvers
            .values()
            .filter(|c| c.supports(problem_type))
            .map(|c| (c.performance.rating_for(size), c.name.as_str()))
            .filter(|(rating, _)| *rating >= min_rating)
            .collect();
        compatible.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        compatible.into_iter().map(|(_, name)| name.to_string()).collect()
    }

    /// Record the outcome of an availability probe.
    pub fn update_status(
        &self,
        name: &str,
        status: SolverStatus,
        version: Option<String>,
        checked_at: DateTime<Utc>,
    ) -> RegistryResult<()> {
        let mut solvers = self.solvers.write();
        let capability = solvers
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        if capability.status != status {
            debug!(solver = name, from = ?capability.status, to = ?status, "Solver status changed");
        }
        capability.status = status;
        capability.last_checked = Some(checked_at);
        if version.is_some() {
            capability.version_info = version;
        }
        Ok(())
    }

    /// Set the order in which solvers of a category are tried as fallbacks.
    /// Names may include solvers of other categories that handle the same
    /// problems; unknown names are kept and simply never match.
    pub fn set_category_fallback(&self, category: SolverCategory, order: Vec<String>) {
        self.fallback_order.write().insert(category, order);
    }

    /// Fallback order for a category. Without an explicit order, the
    /// category's own solvers sorted by robustness, then name.
    pub fn category_fallback(&self, category: SolverCategory) -> Vec<String> {
        if let Some(order) = self.fallback_order.read().get(&category) {
            return order.clone();
        }
        let mut members = self.list_by_category(category);
        members.sort_by(|a, b| {
            b.performance
                .robustness
                .cmp(&a.performance.robustness)
                .then_with(|| a.name.cmp(&b.name))
        });
        members.into_iter().map(|c| c.name).collect()
    }
}
