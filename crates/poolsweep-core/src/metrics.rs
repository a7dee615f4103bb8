//! Shared load counters.
//!
//! Four lock-free counters: read and write attempts, each split into success
//! and failure. Workers are the only incrementers; the tick loop is the only
//! resetter and reader. That split is what makes relaxed atomics sufficient.
//!
//! # Usage
//!
//! ```
//! use poolsweep_core::LoadMetrics;
//! use std::sync::Arc;
//!
//! let metrics = Arc::new(LoadMetrics::new());
//!
//! // Tick: reset, let workers run, then read what accumulated.
//! metrics.reset();
//! metrics.writes.record(true);
//! metrics.writes.record(false);
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.write_ops, 1);
//! assert_eq!(snapshot.write_errors, 1);
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Success and failure counts for one operation group.
#[derive(Debug, Default)]
pub struct OutcomeCounter {
    success: AtomicU64,
    failure: AtomicU64,
}

impl OutcomeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one completed attempt on exactly one side.
    #[inline]
    pub fn record(&self, ok: bool) {
        if ok {
            self.success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failure.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn reset(&self) {
        self.success.store(0, Ordering::Relaxed);
        self.failure.store(0, Ordering::Relaxed);
    }

    /// Current `(success, failure)` counts.
    pub fn load(&self) -> (u64, u64) {
        (
            self.success.load(Ordering::Relaxed),
            self.failure.load(Ordering::Relaxed),
        )
    }
}

/// One sampled interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub read_ops: u64,
    pub read_errors: u64,
    pub write_ops: u64,
    pub write_errors: u64,
}

impl MetricsSnapshot {
    pub fn total_attempts(&self) -> u64 {
        self.read_ops + self.read_errors + self.write_ops + self.write_errors
    }
}

/// Counters shared by every worker of one run.
#[derive(Debug, Default)]
pub struct LoadMetrics {
    pub reads: OutcomeCounter,
    pub writes: OutcomeCounter,
}

impl LoadMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero all four counters.
    pub fn reset(&self) {
        self.reads.reset();
        self.writes.reset();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let (read_ops, read_errors) = self.reads.load();
        let (write_ops, write_errors) = self.writes.load();
        MetricsSnapshot {
            read_ops,
            read_errors,
            write_ops,
            write_errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_record_hits_exactly_one_side() {
        let counter = OutcomeCounter::new();
        counter.record(true);
        counter.record(true);
        counter.record(false);
        assert_eq!(counter.load(), (2, 1));
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let metrics = LoadMetrics::new();
        metrics.reads.record(true);
        metrics.writes.record(false);
        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_groups_are_independent() {
        let metrics = LoadMetrics::new();
        metrics.reads.record(false);
        metrics.writes.record(true);
        let snap = metrics.snapshot();
        assert_eq!(snap.read_ops, 0);
        assert_eq!(snap.read_errors, 1);
        assert_eq!(snap.write_ops, 1);
        assert_eq!(snap.write_errors, 0);
        assert_eq!(snap.total_attempts(), 2);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let metrics = Arc::new(LoadMetrics::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || {
                    for n in 0..10_000 {
                        metrics.writes.record((n + i) % 4 != 0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let snap = metrics.snapshot();
        assert_eq!(snap.write_ops + snap.write_errors, 80_000);
        assert_eq!(snap.write_errors, 20_000);
    }
}
