//! Load workers.
//!
//! Every worker is a named OS thread running one operation in a loop until the
//! shared stop flag is raised, counting each attempt as a success or failure.
//! Workers never coordinate beyond that flag and their counter pair.
//!
//! Cancellation is cooperative. [`WorkerSet::drain`] raises the flag, waits a
//! grace period and joins whatever has finished; a worker still blocked inside
//! a store call is detached and finishes on its own later. Drain is best
//! effort, not a hard guarantee.

use crate::error::SweepError;
use crate::metrics::{LoadMetrics, OutcomeCounter};
use crate::spec::{RANGE_FROM, WorkloadSpec};
use crate::store::Store;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Worker categories, one per data operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    ReadLite,
    ReadHeavy,
    WriteInsert,
    WriteUpdateTiny,
    WriteUpdateWide,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Self::ReadLite,
        Self::ReadHeavy,
        Self::WriteInsert,
        Self::WriteUpdateTiny,
        Self::WriteUpdateWide,
    ];

    /// Thread name prefix.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadLite => "read-lite",
            Self::ReadHeavy => "read-heavy",
            Self::WriteInsert => "write-insert",
            Self::WriteUpdateTiny => "write-update-tiny",
            Self::WriteUpdateWide => "write-update-wide",
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(self, Self::ReadLite | Self::ReadHeavy)
    }

    /// Configured worker count for this category.
    pub fn threads(&self, spec: &WorkloadSpec) -> u32 {
        match self {
            Self::ReadLite => spec.read_lite_threads(),
            Self::ReadHeavy => spec.read_heavy_threads(),
            Self::WriteInsert => spec.write_insert_threads(),
            Self::WriteUpdateTiny => spec.write_update_tiny_threads(),
            Self::WriteUpdateWide => spec.write_update_wide_threads(),
        }
    }

    /// Perform one attempt of this category's operation.
    pub fn attempt(&self, store: &dyn Store, spec: &WorkloadSpec) -> bool {
        match self {
            Self::ReadLite => store.select_lite(RANGE_FROM, spec.read_range()),
            Self::ReadHeavy => {
                store.select_heavy(RANGE_FROM, spec.read_range(), spec.read_sample_size())
            }
            Self::WriteInsert => store.insert(),
            Self::WriteUpdateTiny => store.update_tiny(RANGE_FROM, spec.update_range()),
            Self::WriteUpdateWide => store.update_wide(RANGE_FROM, spec.update_range()),
        }
    }

    /// The counter pair this category feeds.
    pub fn counter<'a>(&self, metrics: &'a LoadMetrics) -> &'a OutcomeCounter {
        if self.is_read() {
            &metrics.reads
        } else {
            &metrics.writes
        }
    }
}

/// Outcome of [`WorkerSet::drain`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Workers that stopped within the grace period and were joined.
    pub joined: usize,
    /// Workers still running after the grace period, left detached.
    pub stragglers: usize,
    /// Attempts made by the joined workers over their lifetime.
    pub attempts: u64,
}

/// Running workers sharing one stop flag.
pub struct WorkerSet {
    stop: Arc<AtomicBool>,
    handles: Vec<(String, JoinHandle<u64>)>,
}

impl WorkerSet {
    pub fn new() -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            handles: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn is_stopping(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Spawn one worker looping `op` until stopped.
    ///
    /// Each attempt lands on exactly one side of `counter`, picked out of
    /// `metrics`. With `yield_between` the worker yields after every attempt.
    pub fn spawn<F, C>(
        &mut self,
        name: String,
        metrics: Arc<LoadMetrics>,
        counter: C,
        yield_between: bool,
        mut op: F,
    ) -> Result<(), SweepError>
    where
        F: FnMut() -> bool + Send + 'static,
        C: Fn(&LoadMetrics) -> &OutcomeCounter + Send + 'static,
    {
        let stop = Arc::clone(&self.stop);
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let outcome = counter(&metrics);
                let mut attempts = 0u64;
                while !stop.load(Ordering::Relaxed) {
                    outcome.record(op());
                    attempts += 1;
                    if yield_between {
                        thread::yield_now();
                    }
                }
                attempts
            })
            .map_err(|source| SweepError::Spawn {
                name: name.clone(),
                source,
            })?;
        self.handles.push((name, handle));
        Ok(())
    }

    /// Spawn every worker `spec` asks for against the given handles.
    ///
    /// Readers use `shared`; writers use `write`, which is the same handle
    /// unless the workload has a dedicated write pool.
    pub fn spawn_for_spec(
        &mut self,
        spec: &Arc<WorkloadSpec>,
        shared: &Arc<dyn Store>,
        write: &Arc<dyn Store>,
        metrics: &Arc<LoadMetrics>,
        yield_between: bool,
    ) -> Result<(), SweepError> {
        for category in Category::ALL {
            let store = if category.is_read() { shared } else { write };
            for index in 0..category.threads(spec) {
                let store = Arc::clone(store);
                let spec = Arc::clone(spec);
                self.spawn(
                    format!("{}-{index}", category.name()),
                    Arc::clone(metrics),
                    move |m: &LoadMetrics| category.counter(m),
                    yield_between,
                    move || category.attempt(store.as_ref(), &spec),
                )?;
            }
        }
        tracing::debug!("Spawned {} workers", self.handles.len());
        Ok(())
    }

    /// Raise the stop flag, wait `grace`, then join finished workers.
    ///
    /// Workers still inside an operation after `grace` are detached and
    /// counted as stragglers.
    pub fn drain(mut self, grace: Duration) -> DrainReport {
        self.stop.store(true, Ordering::Relaxed);
        thread::sleep(grace);

        let mut report = DrainReport::default();
        for (name, handle) in std::mem::take(&mut self.handles) {
            if handle.is_finished() {
                match handle.join() {
                    Ok(attempts) => report.attempts += attempts,
                    Err(_) => tracing::warn!("Worker {} panicked", name),
                }
                report.joined += 1;
            } else {
                tracing::trace!("Detaching worker {}", name);
                report.stragglers += 1;
            }
        }

        if report.stragglers > 0 {
            tracing::warn!(
                "{} workers still running after {:?} grace period; detached",
                report.stragglers,
                grace
            );
        }
        report
    }
}

impl Default for WorkerSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WorkerSet {
    fn drop(&mut self) {
        // Covers early exits (e.g. a failed spawn) that never reach drain.
        self.stop.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::RangeDefaults;
    use crate::store::{MemoryStore, StoreKind};

    fn spec_with(f: impl FnOnce(&mut crate::spec::WorkloadDraft)) -> Arc<WorkloadSpec> {
        let mut draft = WorkloadSpec::draft(StoreKind::Memory, RangeDefaults::default());
        f(&mut draft);
        Arc::new(draft.build().unwrap())
    }

    #[test]
    fn test_category_partitions() {
        let reads: Vec<_> = Category::ALL.iter().filter(|c| c.is_read()).collect();
        assert_eq!(reads, vec![&Category::ReadLite, &Category::ReadHeavy]);
    }

    #[test]
    fn test_spawns_exact_counts() {
        let spec = spec_with(|d| {
            d.shared_pool_size(4).unwrap();
            d.read_lite_threads(2).unwrap();
            d.write_insert_threads(3).unwrap();
            d.write_update_wide_threads(1).unwrap();
        });
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let metrics = Arc::new(LoadMetrics::new());

        let mut workers = WorkerSet::new();
        workers
            .spawn_for_spec(&spec, &store, &store, &metrics, false)
            .unwrap();
        assert_eq!(workers.len(), 6);

        let report = workers.drain(Duration::from_millis(50));
        assert_eq!(report.joined, 6);
        assert_eq!(report.stragglers, 0);
    }

    #[test]
    fn test_idle_spec_spawns_nothing() {
        let spec = spec_with(|d| {
            d.shared_pool_size(4).unwrap();
        });
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let metrics = Arc::new(LoadMetrics::new());
        let mut workers = WorkerSet::new();
        workers
            .spawn_for_spec(&spec, &store, &store, &metrics, true)
            .unwrap();
        assert!(workers.is_empty());
        assert_eq!(workers.drain(Duration::ZERO), DrainReport::default());
    }

    #[test]
    fn test_attempts_feed_the_right_counter() {
        let metrics = Arc::new(LoadMetrics::new());
        let mut workers = WorkerSet::new();
        workers
            .spawn(
                "always-fails".to_string(),
                Arc::clone(&metrics),
                |m: &LoadMetrics| &m.reads,
                true,
                || false,
            )
            .unwrap();
        thread::sleep(Duration::from_millis(20));
        let report = workers.drain(Duration::from_millis(50));

        let snap = metrics.snapshot();
        assert!(snap.read_errors > 0);
        assert_eq!(snap.read_ops, 0);
        assert_eq!(snap.write_ops + snap.write_errors, 0);
        assert_eq!(report.attempts, snap.read_errors);
    }

    #[test]
    fn test_no_increments_after_drain() {
        let metrics = Arc::new(LoadMetrics::new());
        let mut workers = WorkerSet::new();
        for i in 0..4 {
            workers
                .spawn(
                    format!("w-{i}"),
                    Arc::clone(&metrics),
                    |m: &LoadMetrics| &m.writes,
                    false,
                    || true,
                )
                .unwrap();
        }
        thread::sleep(Duration::from_millis(20));
        let report = workers.drain(Duration::from_millis(100));
        assert_eq!(report.joined, 4);

        let after_drain = metrics.snapshot();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(metrics.snapshot(), after_drain);
    }

    #[test]
    fn test_blocked_worker_is_detached() {
        let metrics = Arc::new(LoadMetrics::new());
        let (entered_tx, entered_rx) = crossbeam_channel::bounded(1);
        let mut workers = WorkerSet::new();
        workers
            .spawn(
                "slow".to_string(),
                Arc::clone(&metrics),
                |m: &LoadMetrics| &m.writes,
                false,
                move || {
                    let _ = entered_tx.try_send(());
                    thread::sleep(Duration::from_millis(500));
                    true
                },
            )
            .unwrap();

        // Drain only once the worker is inside the slow call.
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let report = workers.drain(Duration::from_millis(10));
        assert_eq!(report.joined, 0);
        assert_eq!(report.stragglers, 1);
        assert_eq!(report.attempts, 0);
    }
}
