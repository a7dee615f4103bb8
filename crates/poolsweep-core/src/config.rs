//! Sweep-wide run configuration.

use crate::spec::{RangeDefaults, WorkloadSpec};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Every knob the load generator and sweep driver read.
///
/// `Default` gives the production timings: a 60-tick window of one second,
/// 40 s warm-up before the first run and 15 s before every later one.
#[derive(Debug, Clone, Serialize)]
pub struct RunConfig {
    /// Host identifier; part of every artifact path.
    pub host: String,
    /// Root directory for artifacts.
    pub output_dir: PathBuf,
    /// Key range defaults for new specs.
    pub ranges: RangeDefaults,
    /// Heap compaction hint plus counter reset on every 10th tick.
    pub force_heap_compaction: bool,
    /// Restrict the complex suite to single-category shapes.
    pub simple_only: bool,
    /// Run an insert-only pass over every pool size first.
    pub insert_first: bool,
    /// Workers yield their time slice after every attempt.
    pub yield_between_ops: bool,
    /// Samples per run.
    pub observation_ticks: u32,
    pub tick: Duration,
    /// Warm-up before the first run of the process.
    pub first_warmup: Duration,
    /// Warm-up before every later run.
    pub warmup: Duration,
    /// Pause before provisioning every run but the first.
    pub cooldown: Duration,
    /// Wait after raising the stop flag before joining workers.
    pub drain_grace: Duration,
    pub show_progress: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            output_dir: PathBuf::from("data"),
            ranges: RangeDefaults::default(),
            force_heap_compaction: false,
            simple_only: false,
            insert_first: false,
            yield_between_ops: false,
            observation_ticks: 60,
            tick: Duration::from_secs(1),
            first_warmup: Duration::from_secs(40),
            warmup: Duration::from_secs(15),
            cooldown: Duration::from_secs(5),
            drain_grace: Duration::from_millis(500),
            show_progress: true,
        }
    }
}

impl RunConfig {
    /// Name a run is logged under.
    ///
    /// The canonical spec string, with `,yield=1` appended in yield mode. The
    /// artifact file is always named by the bare canonical string.
    pub fn log_name(&self, spec: &WorkloadSpec) -> String {
        let mut name = spec.canonical();
        if self.yield_between_ops {
            name.push_str(",yield=1");
        }
        name
    }

    /// Timings scaled down for tests and smoke runs: `tick` per sample, no
    /// warm-up or cool-down, a short drain.
    pub fn quick(tick: Duration, observation_ticks: u32) -> Self {
        Self {
            observation_ticks,
            tick,
            first_warmup: Duration::ZERO,
            warmup: Duration::ZERO,
            cooldown: Duration::ZERO,
            drain_grace: tick.min(Duration::from_millis(100)),
            show_progress: false,
            ..Self::default()
        }
    }
}
