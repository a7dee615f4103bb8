//! Workload shapes.
//!
//! A shape names which worker categories are active and how a pool size is
//! turned into thread counts. Simple shapes put `pool_size` workers on a single
//! category; mixed shapes split the pool between a read and a write role.

use crate::error::SpecError;
use crate::spec::{RangeDefaults, WorkloadSpec};
use crate::store::StoreKind;
use serde::Serialize;
use std::fmt;

/// Half of a pool size, rounded down, never below one.
///
/// ```
/// use poolsweep_core::half_split;
///
/// assert_eq!(half_split(1), 1);
/// assert_eq!(half_split(7), 3);
/// ```
pub fn half_split(pool_size: u32) -> u32 {
    (pool_size / 2).max(1)
}

/// Named combinations of active worker categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Shape {
    InsertOnly,
    UpdateTinyOnly,
    UpdateWideOnly,
    SelectLiteOnly,
    SelectHeavyOnly,
    /// Point reads against inserts, half the pool each.
    SelectLiteInsert,
    /// Point reads against narrow updates, half the pool each.
    SelectLiteUpdateTiny,
    /// Aggregate reads against wide updates, half the pool each.
    SelectHeavyUpdateWide,
    /// Point reads on the shared pool, all three write kinds on a dedicated
    /// write pool of half the size.
    FullMix,
}

impl Shape {
    /// Single-category shapes, in sweep order.
    pub const SIMPLE: [Shape; 5] = [
        Self::InsertOnly,
        Self::UpdateTinyOnly,
        Self::UpdateWideOnly,
        Self::SelectLiteOnly,
        Self::SelectHeavyOnly,
    ];

    /// Mixed shapes, in sweep order.
    pub const MIXED: [Shape; 4] = [
        Self::SelectLiteInsert,
        Self::SelectLiteUpdateTiny,
        Self::SelectHeavyUpdateWide,
        Self::FullMix,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::InsertOnly => "insert",
            Self::UpdateTinyOnly => "update-tiny",
            Self::UpdateWideOnly => "update-wide",
            Self::SelectLiteOnly => "select-lite",
            Self::SelectHeavyOnly => "select-heavy",
            Self::SelectLiteInsert => "select-lite+insert",
            Self::SelectLiteUpdateTiny => "select-lite+update-tiny",
            Self::SelectHeavyUpdateWide => "select-heavy+update-wide",
            Self::FullMix => "full-mix",
        }
    }

    pub fn is_mixed(&self) -> bool {
        Self::MIXED.contains(self)
    }

    /// Build the spec for this shape at `pool_size`.
    pub fn build(
        &self,
        store: StoreKind,
        pool_size: u32,
        ranges: RangeDefaults,
    ) -> Result<WorkloadSpec, SpecError> {
        let mut draft = WorkloadSpec::draft(store, ranges);
        draft.shared_pool_size(pool_size)?;

        match self {
            Self::InsertOnly => {
                draft.write_insert_threads(pool_size)?;
            }
            Self::UpdateTinyOnly => {
                draft.write_update_tiny_threads(pool_size)?;
            }
            Self::UpdateWideOnly => {
                draft.write_update_wide_threads(pool_size)?;
            }
            Self::SelectLiteOnly => {
                draft.read_lite_threads(pool_size)?;
            }
            Self::SelectHeavyOnly => {
                draft.read_heavy_threads(pool_size)?;
            }
            Self::SelectLiteInsert => {
                let half = half_split(pool_size);
                draft.read_lite_threads(half)?.write_insert_threads(half)?;
            }
            Self::SelectLiteUpdateTiny => {
                let half = half_split(pool_size);
                draft.read_lite_threads(half)?.write_update_tiny_threads(half)?;
            }
            Self::SelectHeavyUpdateWide => {
                let half = half_split(pool_size);
                draft.read_heavy_threads(half)?.write_update_wide_threads(half)?;
            }
            Self::FullMix => {
                let write_pool = half_split(pool_size);
                let per_kind = (write_pool / 3).max(1);
                draft
                    .write_pool_size(write_pool)?
                    .read_lite_threads(pool_size)?
                    .write_insert_threads(per_kind)?
                    .write_update_tiny_threads(per_kind)?
                    .write_update_wide_threads(per_kind)?;
            }
        }

        draft.build()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
