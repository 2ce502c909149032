//! Concrete [`SolverProbe`] implementations.

use async_trait::async_trait;
use optiroute_kernel::probe::{ProbeReport, SolverProbe};
use optiroute_kernel::solver::SolverCapability;
use regex::Regex;
use std::io::ErrorKind;
use std::sync::{Arc, LazyLock};
use tokio::process::Command;
use tracing::debug;

static VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d+\.\d+(?:\.\d+)?)\b").expect("version pattern is valid")
});

/// Extract the first dotted version number from tool output.
pub fn parse_version(output: &str) -> Option<String> {
    VERSION
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Runs the solver's command-line front-end (typically with a version flag).
///
/// The solver counts as available if the program starts and either exits
/// successfully or prints a version number. The child is killed if the
/// prober's timeout drops the probe.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    program: String,
    args: Vec<String>,
}

impl CommandProbe {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl SolverProbe for CommandProbe {
    async fn probe(&self, capability: &SolverCapability) -> ProbeReport {
        let output = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                let version = parse_version(&stdout).or_else(|| parse_version(&stderr));
                debug!(
                    solver = %capability.name,
                    program = %self.program,
                    status = ?output.status.code(),
                    version = ?version,
                    "Command probe finished"
                );
                if output.status.success() || version.is_some() {
                    ProbeReport::available(version)
                } else {
                    ProbeReport::unavailable(format!(
                        "{} exited with {}",
                        self.program, output.status
                    ))
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                ProbeReport::unavailable(format!("{} not found on PATH", self.program))
            }
            Err(e) => ProbeReport::unavailable(format!("failed to run {}: {}", self.program, e)),
        }
    }
}

type ProbeFn = dyn Fn(&SolverCapability) -> ProbeReport + Send + Sync;

/// In-process probe, e.g. a trivial solve through an embedded solver.
/// The function runs on the blocking pool.
#[derive(Clone)]
pub struct FnProbe {
    f: Arc<ProbeFn>,
}

impl FnProbe {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&SolverCapability) -> ProbeReport + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }
}

impl std::fmt::Debug for FnProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnProbe").finish_non_exhaustive()
    }
}

#[async_trait]
impl SolverProbe for FnProbe {
    async fn probe(&self, capability: &SolverCapability) -> ProbeReport {
        let f = Arc::clone(&self.f);
        let capability = capability.clone();
        match tokio::task::spawn_blocking(move || (f.as_ref())(&capability)).await {
            Ok(report) => report,
            Err(e) => ProbeReport::unavailable(format!("probe panicked: {}", e)),
        }
    }
}

/// Fixed answer. Useful for solvers known to be present (or absent) by
/// deployment, and in tests.
#[derive(Debug, Clone)]
pub struct StaticProbe {
    report: ProbeReport,
}

impl StaticProbe {
    pub fn available() -> Self {
        Self {
            report: ProbeReport::available(None),
        }
    }

    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self {
            report: ProbeReport::unavailable(detail),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.report.version = Some(version.into());
        self
    }
}

#[async_trait]
impl SolverProbe for StaticProbe {
    async fn probe(&self, _capability: &SolverCapability) -> ProbeReport {
        self.report.clone()
    }
}
