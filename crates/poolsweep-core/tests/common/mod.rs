//! Common test utilities for load generator and sweep integration tests.

#![allow(dead_code)]

pub mod stores;

pub use stores::*;

use poolsweep_core::{RangeDefaults, RunConfig, StoreKind, WorkloadSpec};
use std::path::Path;
use std::time::Duration;

/// Config with no warm-up or cool-down and `ticks` samples of `tick`.
pub fn quick_config(output: &Path, tick: Duration, ticks: u32) -> RunConfig {
    RunConfig {
        output_dir: output.to_path_buf(),
        ..RunConfig::quick(tick, ticks)
    }
}

/// Insert-only spec with `threads` writers on a shared pool of `pool`.
pub fn insert_spec(store: StoreKind, pool: u32, threads: u32) -> WorkloadSpec {
    let mut draft = WorkloadSpec::draft(store, RangeDefaults::default());
    draft
        .shared_pool_size(pool)
        .unwrap()
        .write_insert_threads(threads)
        .unwrap();
    draft.build().unwrap()
}

/// Parse an artifact into its data rows, checking the header.
pub fn read_artifact(path: &Path) -> Vec<[u64; 5]> {
    let text = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("'Time','ReadOps','ReadErr','WriteOps','WriteErr'"),
        "Bad header in {}",
        path.display()
    );
    lines
        .map(|line| {
            let fields: Vec<u64> = line
                .split(',')
                .map(|f| f.parse().unwrap_or_else(|e| panic!("Bad field {f:?}: {e}")))
                .collect();
            fields
                .try_into()
                .unwrap_or_else(|f: Vec<u64>| panic!("Expected 5 fields, got {}", f.len()))
        })
        .collect()
}
