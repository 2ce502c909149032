//! Availability prober.
//!
//! Answers "is this solver usable on this host right now?" from a TTL cache.
//! Cache misses run the solver's [`SolverProbe`] under a timeout and write
//! the result back to the registry. Selection only ever reads the cache
//! ([`AvailabilityProber::is_available_cached`]); probing happens here, in
//! the background refresh loop or on explicit request.

pub mod probes;

use crate::registry::SolverRegistry;
use chrono::Utc;
use dashmap::DashMap;
use futures::future::join_all;
use optiroute_kernel::config::ProberSettings;
use optiroute_kernel::probe::{ProbeReport, SolverProbe};
use optiroute_kernel::solver::SolverStatus;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    available: bool,
    checked_at: Instant,
}

pub struct AvailabilityProber {
    registry: Arc<SolverRegistry>,
    probes: DashMap<String, Arc<dyn SolverProbe>>,
    cache: DashMap<String, CacheEntry>,
    settings: ProberSettings,
}

impl AvailabilityProber {
    pub fn new(registry: Arc<SolverRegistry>, settings: ProberSettings) -> Self {
        Self {
            registry,
            probes: DashMap::new(),
            cache: DashMap::new(),
            settings,
        }
    }

    pub fn with_probe(self, solver: impl Into<String>, probe: Arc<dyn SolverProbe>) -> Self {
        self.register_probe(solver, probe);
        self
    }

    /// Attach (or replace) the probe used for a solver.
    pub fn register_probe(&self, solver: impl Into<String>, probe: Arc<dyn SolverProbe>) {
        let solver = solver.into();
        self.cache.remove(&solver);
        self.probes.insert(solver, probe);
    }

    pub fn settings(&self) -> &ProberSettings {
        &self.settings
    }

    /// Whether `name` is usable, probing on a cache miss or expiry.
    /// Never fails: unknown solvers and failed probes read as unavailable.
    pub async fn check_availability(&self, name: &str) -> bool {
        if let Some(available) = self.fresh_entry(name) {
            return available;
        }
        self.probe_solver(name).await
    }

    /// Non-probing read used on the selection path: a fresh cache entry if
    /// there is one, otherwise the last status recorded in the registry.
    pub fn is_available_cached(&self, name: &str) -> bool {
        if let Some(available) = self.fresh_entry(name) {
            return available;
        }
        self.registry
            .get(name)
            .map(|c| c.status == SolverStatus::Available)
            .unwrap_or(false)
    }

    /// Drop a solver's cache entry so the next check re-probes it.
    pub fn invalidate(&self, name: &str) {
        if self.cache.remove(name).is_some() {
            debug!(solver = name, "Availability cache entry invalidated");
        }
    }

    pub fn invalidate_all(&self) {
        self.cache.clear();
    }

    /// Invalidate the whole cache and re-probe every registered solver
    /// concurrently. Each probe is bounded by the probe timeout.
    pub async fn refresh_all(&self) -> HashMap<String, bool> {
        self.invalidate_all();
        let names = self.registry.names();
        let results = join_all(names.iter().map(|name| self.probe_solver(name))).await;
        let availability: HashMap<String, bool> = names.into_iter().zip(results).collect();
        info!(
            total = availability.len(),
            available = availability.values().filter(|a| **a).count(),
            "Refreshed solver availability"
        );
        availability
    }

    /// Run [`refresh_all`](Self::refresh_all) every `refresh_interval`.
    /// The first refresh happens immediately.
    pub fn spawn_refresh_loop(self: Arc<Self>) -> JoinHandle<()> {
        let period = self.settings.refresh_interval();
        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                self.refresh_all().await;
            }
        })
    }

    fn fresh_entry(&self, name: &str) -> Option<bool> {
        let entry = *self.cache.get(name)?;
        (entry.checked_at.elapsed() < self.settings.cache_ttl()).then_some(entry.available)
    }

    async fn probe_solver(&self, name: &str) -> bool {
        let capability = match self.registry.get(name) {
            Ok(capability) => capability,
            Err(_) => {
                warn!(solver = name, "Availability check for unregistered solver");
                return false;
            }
        };

        let probe = self.probes.get(name).map(|p| Arc::clone(p.value()));
        let report = match probe {
            Some(probe) => match timeout(self.settings.probe_timeout(), probe.probe(&capability)).await {
                Ok(report) => report,
                Err(_) => ProbeReport::unavailable(format!(
                    "probe timed out after {:?}",
                    self.settings.probe_timeout()
                )),
            },
            // No probe attached: trust the registered status.
            None => {
                if capability.status == SolverStatus::Available {
                    ProbeReport::available(capability.version_info.clone())
                } else {
                    ProbeReport::unavailable("no probe attached")
                }
            }
        };

        if let Some(detail) = report.detail.as_deref().filter(|_| !report.available) {
            debug!(solver = name, detail, "Solver unavailable");
        }

        let status = if report.available {
            SolverStatus::Available
        } else {
            SolverStatus::Unavailable
        };
        if let Err(e) = self
            .registry
            .update_status(name, status, report.version, Utc::now())
        {
            warn!(solver = name, error = %e, "Failed to record probe result");
        }

        self.cache.insert(
            name.to_string(),
            CacheEntry {
                available: report.available,
                checked_at: Instant::now(),
            },
        );
        report.available
    }
}

impl std::fmt::Debug for AvailabilityProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvailabilityProber")
            .field("probes", &self.probes.len())
            .field("cached", &self.cache.len())
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::probes::StaticProbe;
    use super::*;
    use async_trait::async_trait;
    use optiroute_kernel::problem::ProblemType;
    use optiroute_kernel::solver::{SolverCapability, SolverCategory};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingProbe {
        calls: AtomicUsize,
        available: bool,
    }

    #[async_trait]
    impl SolverProbe for CountingProbe {
        async fn probe(&self, _capability: &SolverCapability) -> ProbeReport {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.available {
                ProbeReport::available(Some("1.0".into()))
            } else {
                ProbeReport::unavailable("not installed")
            }
        }
    }

    struct HangingProbe;

    #[async_trait]
    impl SolverProbe for HangingProbe {
        async fn probe(&self, _capability: &SolverCapability) -> ProbeReport {
            tokio::time::sleep(Duration::from_secs(60)).await;
            ProbeReport::available(None)
        }
    }

    fn registry(names: &[&str]) -> Arc<SolverRegistry> {
        let registry = SolverRegistry::new();
        for name in names {
            registry
                .register(
                    SolverCapability::new(*name, SolverCategory::LinearProgramming)
                        .with_problem_types([ProblemType::LinearProgramming]),
                )
                .unwrap();
        }
        Arc::new(registry)
    }

    fn settings() -> ProberSettings {
        ProberSettings {
            probe_timeout_ms: 50,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_cache_hit_skips_probe() {
        let probe = Arc::new(CountingProbe {
            calls: AtomicUsize::new(0),
            available: true,
        });
        let prober = AvailabilityProber::new(registry(&["glop"]), settings())
            .with_probe("glop", probe.clone());

        assert!(prober.check_availability("glop").await);
        assert!(prober.check_availability("glop").await);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);

        prober.invalidate("glop");
        assert!(prober.check_availability("glop").await);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_probe_updates_registry() {
        let reg = registry(&["glop"]);
        let prober = AvailabilityProber::new(reg.clone(), settings()).with_probe(
            "glop",
            Arc::new(CountingProbe {
                calls: AtomicUsize::new(0),
                available: true,
            }),
        );
        prober.check_availability("glop").await;
        let cap = reg.get("glop").unwrap();
        assert_eq!(cap.status, SolverStatus::Available);
        assert_eq!(cap.version_info.as_deref(), Some("1.0"));
        assert!(cap.last_checked.is_some());
    }

    #[tokio::test]
    async fn test_hung_probe_times_out() {
        let reg = registry(&["stuck", "glop"]);
        let prober = AvailabilityProber::new(reg.clone(), settings())
            .with_probe("stuck", Arc::new(HangingProbe))
            .with_probe("glop", Arc::new(StaticProbe::available()));

        let results = prober.refresh_all().await;
        assert_eq!(results.get("stuck"), Some(&false));
        assert_eq!(results.get("glop"), Some(&true));
        assert_eq!(reg.get("stuck").unwrap().status, SolverStatus::Unavailable);
    }

    #[tokio::test]
    async fn test_unknown_solver_is_unavailable() {
        let prober = AvailabilityProber::new(registry(&[]), settings());
        assert!(!prober.check_availability("nope").await);
        assert!(!prober.is_available_cached("nope"));
    }

    #[tokio::test]
    async fn test_missing_probe_uses_registered_status() {
        let reg = registry(&["glop"]);
        let prober = AvailabilityProber::new(reg.clone(), settings());
        assert!(!prober.check_availability("glop").await);

        reg.update_status("glop", SolverStatus::Available, None, Utc::now())
            .unwrap();
        prober.invalidate("glop");
        assert!(prober.check_availability("glop").await);
    }

    #[tokio::test]
    async fn test_cached_read_never_probes() {
        let probe = Arc::new(CountingProbe {
            calls: AtomicUsize::new(0),
            available: true,
        });
        let prober = AvailabilityProber::new(registry(&["glop"]), settings())
            .with_probe("glop", probe.clone());
        assert!(!prober.is_available_cached("glop"));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);

        prober.refresh_all().await;
        assert!(prober.is_available_cached("glop"));
    }
}
