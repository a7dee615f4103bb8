//! Sweep driver.
//!
//! Runs a planned sequence of specs one after another. Per-spec failures are
//! logged and counted; only artifact directory failures and shutdown stop the
//! sweep early.

use crate::config::RunConfig;
use crate::error::SweepError;
use crate::generator::{LoadGenerator, RunOutcome, SweepState};
use crate::matrix::PlannedRun;
use crate::report::ReportSink;
use crate::store::StoreFactory;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// What a sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    /// Runs that wrote a new artifact.
    pub completed: usize,
    /// Runs skipped because their artifact already existed.
    pub skipped: usize,
    /// Runs that failed (provisioning, spawn or write faults).
    pub failed: usize,
    /// Whether shutdown cut the sweep short.
    pub interrupted: bool,
    /// Artifacts written by this sweep, in order.
    pub artifacts: Vec<PathBuf>,
}

/// Sequential runner over a sweep plan.
pub struct Sweep {
    config: RunConfig,
    factory: Box<dyn StoreFactory>,
    sink: ReportSink,
    shutdown: Arc<AtomicBool>,
}

impl Sweep {
    pub fn new(config: RunConfig, factory: Box<dyn StoreFactory>) -> Self {
        let sink = ReportSink::new(config.output_dir.clone(), config.host.clone());
        Self {
            config,
            factory,
            sink,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stop between (and inside) runs once `shutdown` is raised.
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn sink(&self) -> &ReportSink {
        &self.sink
    }

    /// Execute every planned run in order.
    ///
    /// Returns `Err` only for faults that make further output impossible.
    pub fn run(&self, plan: &[PlannedRun]) -> Result<SweepSummary, SweepError> {
        self.sink.prepare()?;

        tracing::info!(
            "Sweeping {} runs into {} (host {})",
            plan.len(),
            self.sink.root().display(),
            self.sink.host()
        );

        let mut generator = LoadGenerator::new(&self.config, self.factory.as_ref(), &self.sink)
            .with_shutdown(Arc::clone(&self.shutdown));
        let mut state = SweepState::new();
        let mut summary = SweepSummary::default();

        for (index, planned) in plan.iter().enumerate() {
            tracing::debug!("Run {}/{}: {} ({})", index + 1, plan.len(), planned.shape, planned.spec);

            match generator.run(&planned.spec, &mut state) {
                Ok(RunOutcome::Completed { path, .. }) => {
                    summary.completed += 1;
                    summary.artifacts.push(path);
                }
                Ok(RunOutcome::Skipped { .. }) => summary.skipped += 1,
                Err(SweepError::Interrupted) => {
                    tracing::warn!("Shutdown requested; stopping sweep");
                    summary.interrupted = true;
                    break;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!("{}: {}", planned.spec.store(), error_chain(&e));
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            "Sweep finished: {} completed, {} skipped, {} failed",
            summary.completed,
            summary.skipped,
            summary.failed
        );
        Ok(summary)
    }
}

/// `outer: inner: innermost` rendering of an error and its sources.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ReportError, StoreError};
    use crate::store::StoreKind;

    #[test]
    fn test_error_chain_includes_sources() {
        let err = SweepError::Provisioning {
            spec: "memory sp=0001".to_string(),
            source: StoreError::Unsupported(StoreKind::MySql),
        };
        assert_eq!(
            error_chain(&err),
            "provisioning memory sp=0001 failed: mysql support is not compiled into this build"
        );
    }

    #[test]
    fn test_unwritable_root_is_fatal() {
        let tmp = tempfile::TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let config = RunConfig {
            output_dir: blocker.join("out"),
            ..RunConfig::quick(std::time::Duration::from_millis(10), 1)
        };
        let factory = crate::store::DefaultStoreFactory::new("h", crate::ConnectionSettings::default());
        let err = Sweep::new(config, Box::new(factory)).run(&[]).unwrap_err();
        assert!(matches!(err, SweepError::Report(ReportError::CreateDir { .. })));
        assert!(err.is_fatal());
    }
}
