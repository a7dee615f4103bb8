//! Connection-pool load sweep engine.
//!
//! This crate drives a backing store with a precise mix of concurrent read and
//! write workers and records throughput and error counts once per second:
//!
//! - **Workload specifications** describe one run (store, pool sizes, worker
//!   counts per category, key ranges) and render a canonical identity string.
//! - **The workload matrix** expands pool sizes × stores × shapes into the
//!   ordered list of specifications for one sweep.
//! - **The load generator** provisions store handles, warms up, samples four
//!   shared counters every tick and writes one CSV artifact per specification.
//! - **Store adapters** implement the six data operations for SQLite,
//!   PostgreSQL, MySQL and an in-process memory table.
//!
//! # Usage
//!
//! ```no_run
//! use poolsweep_core::{
//!     ConnectionSettings, DefaultStoreFactory, RunConfig, StoreKind, Sweep, WorkloadMatrix,
//! };
//!
//! let config = RunConfig::default();
//! let matrix = WorkloadMatrix::new(vec![StoreKind::Sqlite]).with_pool_sizes(vec![1, 2, 4]);
//! let factory = DefaultStoreFactory::new(&config.host, ConnectionSettings::default());
//! let sweep = Sweep::new(config, Box::new(factory));
//! let summary = sweep.run(&matrix.plan()?)?;
//! println!("{} completed, {} skipped", summary.completed, summary.skipped);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod generator;
pub mod heap;
pub mod matrix;
pub mod metrics;
pub mod progress;
pub mod report;
pub mod shape;
pub mod spec;
pub mod store;
pub mod sweep;
pub mod workers;

pub use config::RunConfig;
pub use error::{ReportError, SpecError, StoreError, SweepError};
pub use generator::{LoadGenerator, Phase, RunOutcome, SweepState};
pub use matrix::{PlannedRun, Suite, WorkloadMatrix, DEFAULT_POOL_SIZES};
pub use metrics::{LoadMetrics, MetricsSnapshot, OutcomeCounter};
pub use report::{ReportSink, RunReport, Sample};
pub use shape::{half_split, Shape};
pub use spec::{RangeDefaults, WorkloadDraft, WorkloadSpec};
pub use store::{ConnectionSettings, DefaultStoreFactory, Store, StoreFactory, StoreKind};
pub use sweep::{Sweep, SweepSummary};
