//! Load generator.
//!
//! Runs one [`WorkloadSpec`] through its full lifecycle:
//!
//! ```text
//! Idle → Provisioning → WarmingUp → Observing → Draining → Closed
//! ```
//!
//! A spec whose artifact already exists never leaves `Idle`. Provisioning
//! failures end that run, not the sweep. Only a complete observation window is
//! persisted; an interrupted run leaves nothing on disk.

use crate::config::RunConfig;
use crate::error::{StoreError, SweepError};
use crate::heap;
use crate::metrics::LoadMetrics;
use crate::progress::TickProgress;
use crate::report::{ReportSink, RunReport};
use crate::spec::WorkloadSpec;
use crate::store::{Store, StoreFactory};
use crate::workers::WorkerSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Ticks between forced heap compactions when that disturbance is enabled.
pub const COMPACTION_EVERY: u32 = 10;

/// Settle time after the pre-window compaction hint.
const SETTLE_AFTER_HINT: Duration = Duration::from_millis(10);

/// Slice length for interruptible pauses.
const PAUSE_SLICE: Duration = Duration::from_millis(100);

/// Lifecycle phase of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Provisioning,
    WarmingUp,
    Observing,
    Draining,
    Closed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Provisioning => "provisioning",
            Self::WarmingUp => "warming up",
            Self::Observing => "observing",
            Self::Draining => "draining",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Process-wide state carried from one run to the next.
#[derive(Debug, Clone, Default)]
pub struct SweepState {
    warmed_up: bool,
}

impl SweepState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether some earlier run already paid the long first warm-up.
    pub fn is_warmed_up(&self) -> bool {
        self.warmed_up
    }

    fn mark_warmed_up(&mut self) {
        self.warmed_up = true;
    }
}

/// Result of a run that did not fail.
#[derive(Debug)]
pub enum RunOutcome {
    /// The artifact already existed; nothing was touched.
    Skipped { path: PathBuf },
    /// The full window was sampled and written to `path`.
    Completed { path: PathBuf, report: RunReport },
}

/// The shared handle plus the handle writers use.
///
/// `write` is a second clone of `shared` unless the workload asks for a dedicated
/// write pool.
struct StoreHandles {
    shared: Arc<dyn Store>,
    write: Arc<dyn Store>,
}

impl StoreHandles {
    fn provision(factory: &dyn StoreFactory, spec: &WorkloadSpec) -> Result<Self, StoreError> {
        let shared = factory.open(spec.store(), spec.shared_pool_size())?;
        let write = if spec.has_dedicated_write_pool() {
            match factory.open(spec.store(), spec.write_pool_size()) {
                Ok(write) => write,
                Err(e) => {
                    shared.close();
                    return Err(e);
                }
            }
        } else {
            Arc::clone(&shared)
        };

        let handles = Self { shared, write };
        if let Err(e) = handles.shared.init() {
            handles.close();
            return Err(e);
        }
        Ok(handles)
    }

    fn is_dedicated(&self) -> bool {
        !Arc::ptr_eq(&self.shared, &self.write)
    }

    /// Close the write handle if it is distinct, then the shared one, once each.
    fn close(&self) {
        if self.is_dedicated() {
            self.write.close();
        }
        self.shared.close();
    }
}

/// Drives single runs. Borrowed configuration, factory and sink are shared by
/// every run of a sweep.
pub struct LoadGenerator<'a> {
    config: &'a RunConfig,
    factory: &'a dyn StoreFactory,
    sink: &'a ReportSink,
    shutdown: Arc<AtomicBool>,
    phase: Phase,
}

impl<'a> LoadGenerator<'a> {
    pub fn new(config: &'a RunConfig, factory: &'a dyn StoreFactory, sink: &'a ReportSink) -> Self {
        Self {
            config,
            factory,
            sink,
            shutdown: Arc::new(AtomicBool::new(false)),
            phase: Phase::Idle,
        }
    }

    /// Observe `shutdown` between ticks and during pauses.
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, phase: Phase) {
        tracing::debug!("Phase {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    fn interrupted(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Sleep for `total`, waking early on shutdown. Returns false if interrupted.
    fn pause(&self, total: Duration) -> bool {
        let deadline = Instant::now() + total;
        loop {
            if self.interrupted() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(PAUSE_SLICE.min(deadline - now));
        }
    }

    /// Execute `spec` end to end.
    pub fn run(&mut self, spec: &WorkloadSpec, state: &mut SweepState) -> Result<RunOutcome, SweepError> {
        self.phase = Phase::Idle;
        let canonical = spec.canonical();
        let name = self.config.log_name(spec);
        let path = self.sink.artifact_path(spec.store(), &canonical);

        if path.exists() {
            tracing::info!("Skip ({}): {} already recorded", spec.store(), name);
            return Ok(RunOutcome::Skipped { path });
        }
        if self.interrupted() {
            return Err(SweepError::Interrupted);
        }

        if state.is_warmed_up() && !self.config.cooldown.is_zero() {
            tracing::debug!("Cooling down for {:?}", self.config.cooldown);
            if !self.pause(self.config.cooldown) {
                return Err(SweepError::Interrupted);
            }
        }

        self.enter(Phase::Provisioning);
        let handles = StoreHandles::provision(self.factory, spec).map_err(|source| {
            self.phase = Phase::Closed;
            SweepError::Provisioning {
                spec: format!("{} {}", spec.store(), name),
                source,
            }
        })?;
        if handles.is_dedicated() {
            tracing::debug!(
                "Dedicated write pool of {} beside shared pool of {}",
                spec.write_pool_size(),
                spec.shared_pool_size()
            );
        }

        let result = self.drive(spec, &name, &handles, state);

        handles.close();
        self.enter(Phase::Closed);

        let report = result?;
        let path = self.sink.persist(spec.store(), &canonical, &report)?;
        tracing::info!("Done ({}): {}", spec.store(), path.display());
        Ok(RunOutcome::Completed { path, report })
    }

    /// Warm up, observe and drain against provisioned handles.
    fn drive(
        &mut self,
        spec: &WorkloadSpec,
        name: &str,
        handles: &StoreHandles,
        state: &mut SweepState,
    ) -> Result<RunReport, SweepError> {
        let spec = Arc::new(spec.clone());
        let metrics = Arc::new(LoadMetrics::new());

        self.enter(Phase::WarmingUp);
        let mut workers = WorkerSet::new();
        workers.spawn_for_spec(
            &spec,
            &handles.shared,
            &handles.write,
            &metrics,
            self.config.yield_between_ops,
        )?;
        if spec.is_idle() {
            tracing::debug!("No workers configured; the window will record zeros");
        }

        let warmup = if state.is_warmed_up() {
            self.config.warmup
        } else {
            tracing::info!("Initial warm-up ({:?})", self.config.first_warmup);
            self.config.first_warmup
        };
        let warmed = self.pause(warmup);
        if warmed {
            state.mark_warmed_up();
        }

        let observed = if warmed {
            heap::compaction_hint();
            thread::sleep(SETTLE_AFTER_HINT);
            self.observe(&spec, name, &metrics)
        } else {
            None
        };

        self.enter(Phase::Draining);
        let drain = workers.drain(self.config.drain_grace);
        tracing::debug!(
            "Drained {} workers ({} detached, {} attempts)",
            drain.joined,
            drain.stragglers,
            drain.attempts
        );

        observed.ok_or(SweepError::Interrupted)
    }

    /// Sample the window. `None` if shutdown was requested mid-window.
    fn observe(&mut self, spec: &WorkloadSpec, name: &str, metrics: &LoadMetrics) -> Option<RunReport> {
        self.enter(Phase::Observing);
        tracing::info!("Start tracking ({}): {}", spec.store(), name);

        let ticks = self.config.observation_ticks;
        let progress = TickProgress::new(spec.store().name(), ticks, self.config.show_progress);
        let mut report = RunReport::with_capacity(ticks as usize);

        for tick in 0..ticks {
            if self.interrupted() {
                progress.finish();
                tracing::warn!("Interrupted after {} of {} ticks; discarding samples", tick, ticks);
                return None;
            }

            if self.config.force_heap_compaction && tick % COMPACTION_EVERY == 0 {
                heap::compaction_hint();
                metrics.reset();
            }

            metrics.reset();
            let started = Instant::now();
            thread::sleep(self.config.tick);
            let snapshot = metrics.snapshot();
            let elapsed = started.elapsed();

            tracing::info!(
                "T {:4}, R {:5}/{:5}, W {:5}/{:5}, dur={:.3}, Pools({}/{})",
                tick,
                snapshot.read_ops,
                snapshot.read_errors,
                snapshot.write_ops,
                snapshot.write_errors,
                elapsed.as_secs_f64(),
                spec.shared_pool_size(),
                spec.write_pool_size()
            );
            progress.tick(&snapshot);
            report.push(tick, snapshot);
        }

        progress.finish();
        Some(report)
    }
}
