//! Workload matrix.
//!
//! Expands pool sizes × stores × shapes into the ordered list of specs for one
//! sweep. Pool sizes form the outer loop so a long sweep covers every store at
//! small pools before moving on to large ones.

use crate::config::RunConfig;
use crate::error::SpecError;
use crate::shape::Shape;
use crate::spec::{RangeDefaults, WorkloadSpec};
use crate::store::StoreKind;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Default pool size ladder.
pub const DEFAULT_POOL_SIZES: &[u32] = &[
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 20, 24, 28, 32, 48, 64, 96, 128, 192, 256,
];

/// Which shapes a sweep runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Suite {
    /// Every simple shape, then (unless restricted) every mixed shape.
    #[default]
    Complex,
    /// Point reads only.
    SelectLite,
}

impl Suite {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Complex => "complex",
            Self::SelectLite => "select-lite",
        }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Suite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "complex" => Ok(Self::Complex),
            "select-lite" | "select_lite" => Ok(Self::SelectLite),
            _ => Err(format!("Unknown suite: {s}. Valid options: complex, select-lite")),
        }
    }
}

/// One entry of a sweep plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedRun {
    pub shape: Shape,
    pub spec: WorkloadSpec,
}

/// Builder for a sweep plan.
#[derive(Debug, Clone)]
pub struct WorkloadMatrix {
    pool_sizes: Vec<u32>,
    stores: Vec<StoreKind>,
    suite: Suite,
    simple_only: bool,
    insert_first: bool,
    ranges: RangeDefaults,
}

impl WorkloadMatrix {
    /// Matrix over `stores` with the default pool ladder and the complex suite.
    pub fn new(stores: Vec<StoreKind>) -> Self {
        Self {
            pool_sizes: DEFAULT_POOL_SIZES.to_vec(),
            stores,
            suite: Suite::default(),
            simple_only: false,
            insert_first: false,
            ranges: RangeDefaults::default(),
        }
    }

    /// Matrix over `stores` taking shape restrictions and ranges from `config`.
    pub fn from_config(stores: Vec<StoreKind>, config: &RunConfig) -> Self {
        Self::new(stores)
            .with_simple_only(config.simple_only)
            .with_insert_first(config.insert_first)
            .with_ranges(config.ranges)
    }

    pub fn with_pool_sizes(mut self, pool_sizes: Vec<u32>) -> Self {
        self.pool_sizes = pool_sizes;
        self
    }

    pub fn with_suite(mut self, suite: Suite) -> Self {
        self.suite = suite;
        self
    }

    /// Skip the mixed shapes.
    pub fn with_simple_only(mut self, simple_only: bool) -> Self {
        self.simple_only = simple_only;
        self
    }

    /// Run an insert-only pass over every pool size before the full pass.
    pub fn with_insert_first(mut self, insert_first: bool) -> Self {
        self.insert_first = insert_first;
        self
    }

    pub fn with_ranges(mut self, ranges: RangeDefaults) -> Self {
        self.ranges = ranges;
        self
    }

    /// Shapes run for each (pool size, store) cell of the main pass.
    pub fn shapes(&self) -> Vec<Shape> {
        match self.suite {
            Suite::SelectLite => vec![Shape::SelectLiteOnly],
            Suite::Complex if self.simple_only => Shape::SIMPLE.to_vec(),
            Suite::Complex => Shape::SIMPLE.iter().chain(Shape::MIXED.iter()).copied().collect(),
        }
    }

    /// Expand into the ordered sweep.
    ///
    /// A spec that already appeared earlier in the plan for the same store is
    /// dropped: its artifact would exist by the time the repeat came up.
    pub fn plan(&self) -> Result<Vec<PlannedRun>, SpecError> {
        let mut runs = Vec::new();
        let mut seen = HashSet::new();

        let mut push = |shape: Shape, store: StoreKind, pool_size: u32| -> Result<(), SpecError> {
            let spec = shape.build(store, pool_size, self.ranges)?;
            if seen.insert(spec.clone()) {
                runs.push(PlannedRun { shape, spec });
            }
            Ok(())
        };

        if self.insert_first && self.suite == Suite::Complex {
            for &pool_size in &self.pool_sizes {
                for &store in &self.stores {
                    push(Shape::InsertOnly, store, pool_size)?;
                }
            }
        }

        let shapes = self.shapes();
        for &pool_size in &self.pool_sizes {
            for &store in &self.stores {
                for &shape in &shapes {
                    push(shape, store, pool_size)?;
                }
            }
        }

        tracing::debug!(
            "Planned {} runs ({} suite, {} pool sizes, {} stores)",
            runs.len(),
            self.suite,
            self.pool_sizes.len(),
            self.stores.len()
        );
        Ok(runs)
    }
}
