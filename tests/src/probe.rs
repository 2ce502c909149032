//! A probe whose answer the test controls.

use async_trait::async_trait;
use optiroute_kernel::probe::{ProbeReport, SolverProbe};
use optiroute_kernel::solver::SolverCapability;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Toggleable availability probe. Clones share state, so a test can keep
/// one handle and give another to the router.
#[derive(Debug, Clone)]
pub struct StubProbe {
    available: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
    version: Option<String>,
}

impl StubProbe {
    pub fn new(available: bool) -> Self {
        Self {
            available: Arc::new(AtomicBool::new(available)),
            calls: Arc::new(AtomicUsize::new(0)),
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of times the prober has called this probe.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn shared(&self) -> Arc<dyn SolverProbe> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl SolverProbe for StubProbe {
    async fn probe(&self, capability: &SolverCapability) -> ProbeReport {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.available.load(Ordering::SeqCst) {
            ProbeReport::available(self.version.clone())
        } else {
            ProbeReport::unavailable(format!("{} switched off", capability.name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optiroute_kernel::solver::SolverCategory;

    #[tokio::test]
    async fn toggles_are_shared_between_clones() {
        let probe = StubProbe::new(true).with_version("1.2");
        let handle = probe.shared();
        let cap = SolverCapability::new("stub", SolverCategory::LinearProgramming);

        assert_eq!(handle.probe(&cap).await, ProbeReport::available(Some("1.2".into())));
        probe.set_available(false);
        let report = handle.probe(&cap).await;
        assert!(!report.available);
        assert_eq!(report.detail.as_deref(), Some("stub switched off"));
        assert_eq!(probe.calls(), 2);
    }
}
