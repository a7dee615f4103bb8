//! Workload specifications.
//!
//! A [`WorkloadSpec`] describes one run: the store, pool sizing, how many
//! workers of each category to start and the key ranges they draw from. Specs
//! are immutable; they are assembled through a [`WorkloadDraft`] which is
//! closed by [`WorkloadDraft::build`].

use crate::error::SpecError;
use crate::store::StoreKind;
use serde::Serialize;
use std::fmt;

/// Lowest key any operation draws. Ids start at 1 in every store.
pub const RANGE_FROM: u32 = 1;

/// Key range defaults applied to every new draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RangeDefaults {
    /// Upper bound (exclusive) for point and aggregate reads.
    pub read_range: u32,
    /// Upper bound (exclusive) for narrow and wide updates.
    pub update_range: u32,
    /// Rows covered by one aggregate read.
    pub read_sample_size: u32,
}

impl Default for RangeDefaults {
    fn default() -> Self {
        Self {
            read_range: 100_000,
            update_range: 400_000,
            read_sample_size: 1_000,
        }
    }
}

/// Immutable description of one load run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WorkloadSpec {
    store: StoreKind,
    shared_pool_size: u32,
    write_pool_size: u32,
    read_lite_threads: u32,
    read_heavy_threads: u32,
    write_insert_threads: u32,
    write_update_tiny_threads: u32,
    write_update_wide_threads: u32,
    read_range: u32,
    read_sample_size: u32,
    update_range: u32,
}

impl WorkloadSpec {
    /// Start a draft for `store` with every count at zero and the given ranges.
    pub fn draft(store: StoreKind, ranges: RangeDefaults) -> WorkloadDraft {
        WorkloadDraft::new(store, ranges)
    }

    pub fn store(&self) -> StoreKind {
        self.store
    }

    /// Pool capacity used by readers, and by writers without a dedicated pool.
    pub fn shared_pool_size(&self) -> u32 {
        self.shared_pool_size
    }

    /// Dedicated writer pool capacity; 0 means writers share the shared pool.
    pub fn write_pool_size(&self) -> u32 {
        self.write_pool_size
    }

    pub fn has_dedicated_write_pool(&self) -> bool {
        self.write_pool_size > 0
    }

    pub fn read_lite_threads(&self) -> u32 {
        self.read_lite_threads
    }

    pub fn read_heavy_threads(&self) -> u32 {
        self.read_heavy_threads
    }

    pub fn write_insert_threads(&self) -> u32 {
        self.write_insert_threads
    }

    pub fn write_update_tiny_threads(&self) -> u32 {
        self.write_update_tiny_threads
    }

    pub fn write_update_wide_threads(&self) -> u32 {
        self.write_update_wide_threads
    }

    pub fn read_range(&self) -> u32 {
        self.read_range
    }

    pub fn read_sample_size(&self) -> u32 {
        self.read_sample_size
    }

    pub fn update_range(&self) -> u32 {
        self.update_range
    }

    pub fn read_threads(&self) -> u32 {
        self.read_lite_threads + self.read_heavy_threads
    }

    pub fn write_threads(&self) -> u32 {
        self.write_insert_threads + self.write_update_tiny_threads + self.write_update_wide_threads
    }

    pub fn total_threads(&self) -> u32 {
        self.read_threads() + self.write_threads()
    }

    /// A spec with no workers runs its full window and records zeros.
    pub fn is_idle(&self) -> bool {
        self.total_threads() == 0
    }

    /// Stable identity: pool sizes and thread counts, zero-padded, fixed order.
    ///
    /// The store variant and host are part of the artifact path instead.
    pub fn canonical(&self) -> String {
        format!(
            "sp={:04},wp={:04},r_lite={:04},r_heavy={:04},w_ins={:04},w_up_tiny={:04},w_up_wide={:04}",
            self.shared_pool_size,
            self.write_pool_size,
            self.read_lite_threads,
            self.read_heavy_threads,
            self.write_insert_threads,
            self.write_update_tiny_threads,
            self.write_update_wide_threads,
        )
    }
}

impl fmt::Display for WorkloadSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Mutable draft of a [`WorkloadSpec`].
///
/// Every setter and [`build`](Self::build) fail with
/// [`SpecError::BuilderClosed`] once the draft has been built.
///
/// ```
/// use poolsweep_core::{RangeDefaults, StoreKind, WorkloadSpec};
///
/// let mut draft = WorkloadSpec::draft(StoreKind::Memory, RangeDefaults::default());
/// draft.shared_pool_size(4)?.write_insert_threads(4)?;
/// let spec = draft.build()?;
/// assert_eq!(spec.write_threads(), 4);
/// assert!(draft.build().is_err());
/// # Ok::<(), poolsweep_core::SpecError>(())
/// ```
#[derive(Debug)]
pub struct WorkloadDraft {
    inner: Option<WorkloadSpec>,
}

macro_rules! setter {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub fn $name(&mut self, value: u32) -> Result<&mut Self, SpecError> {
            self.open()?.$name = value;
            Ok(self)
        }
    };
}

impl WorkloadDraft {
    pub fn new(store: StoreKind, ranges: RangeDefaults) -> Self {
        Self {
            inner: Some(WorkloadSpec {
                store,
                shared_pool_size: 0,
                write_pool_size: 0,
                read_lite_threads: 0,
                read_heavy_threads: 0,
                write_insert_threads: 0,
                write_update_tiny_threads: 0,
                write_update_wide_threads: 0,
                read_range: ranges.read_range,
                read_sample_size: ranges.read_sample_size,
                update_range: ranges.update_range,
            }),
        }
    }

    fn open(&mut self) -> Result<&mut WorkloadSpec, SpecError> {
        self.inner.as_mut().ok_or(SpecError::BuilderClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    pub fn store(&mut self, store: StoreKind) -> Result<&mut Self, SpecError> {
        self.open()?.store = store;
        Ok(self)
    }

    setter!(shared_pool_size);
    setter!(
        /// 0 keeps writers on the shared pool.
        write_pool_size
    );
    setter!(read_lite_threads);
    setter!(read_heavy_threads);
    setter!(write_insert_threads);
    setter!(write_update_tiny_threads);
    setter!(write_update_wide_threads);
    setter!(read_range);
    setter!(read_sample_size);
    setter!(update_range);

    /// Finalize the draft. The draft is closed afterwards.
    pub fn build(&mut self) -> Result<WorkloadSpec, SpecError> {
        self.inner.take().ok_or(SpecError::BuilderClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> WorkloadDraft {
        WorkloadSpec::draft(StoreKind::Memory, RangeDefaults::default())
    }

    #[test]
    fn test_defaults() {
        let spec = draft().build().unwrap();
        assert_eq!(spec.shared_pool_size(), 0);
        assert_eq!(spec.write_pool_size(), 0);
        assert!(spec.is_idle());
        assert_eq!(spec.read_range(), 100_000);
        assert_eq!(spec.update_range(), 400_000);
        assert_eq!(spec.read_sample_size(), 1_000);
    }

    #[test]
    fn test_canonical_format() {
        let mut d = draft();
        d.shared_pool_size(16)
            .unwrap()
            .write_pool_size(8)
            .unwrap()
            .read_lite_threads(16)
            .unwrap()
            .write_insert_threads(2)
            .unwrap()
            .write_update_tiny_threads(2)
            .unwrap()
            .write_update_wide_threads(2)
            .unwrap();
        let spec = d.build().unwrap();
        assert_eq!(
            spec.canonical(),
            "sp=0016,wp=0008,r_lite=0016,r_heavy=0000,w_ins=0002,w_up_tiny=0002,w_up_wide=0002"
        );
        assert_eq!(spec.to_string(), spec.canonical());
    }

    #[test]
    fn test_canonical_independent_of_setter_order() {
        let mut a = draft();
        a.shared_pool_size(4).unwrap();
        a.read_heavy_threads(2).unwrap();
        a.write_update_wide_threads(1).unwrap();

        let mut b = draft();
        b.write_update_wide_threads(1).unwrap();
        b.read_heavy_threads(7).unwrap();
        b.shared_pool_size(4).unwrap();
        b.read_heavy_threads(2).unwrap();

        let (a, b) = (a.build().unwrap(), b.build().unwrap());
        assert_eq!(a, b);
        assert_eq!(a.canonical(), b.canonical());
    }

    #[test]
    fn test_build_twice_fails() {
        let mut d = draft();
        d.build().unwrap();
        assert!(d.is_closed());
        assert_eq!(d.build().unwrap_err(), SpecError::BuilderClosed);
    }

    #[test]
    fn test_setter_after_build_fails() {
        let mut d = draft();
        d.build().unwrap();
        assert_eq!(d.shared_pool_size(1).unwrap_err(), SpecError::BuilderClosed);
        assert_eq!(d.read_range(5).unwrap_err(), SpecError::BuilderClosed);
        assert_eq!(d.store(StoreKind::Sqlite).unwrap_err(), SpecError::BuilderClosed);
    }

    #[test]
    fn test_nonsensical_combinations_pass_through() {
        let mut d = draft();
        d.write_insert_threads(8).unwrap();
        let spec = d.build().unwrap();
        assert_eq!(spec.shared_pool_size(), 0);
        assert_eq!(spec.total_threads(), 8);
    }

    #[test]
    fn test_thread_totals() {
        let mut d = draft();
        d.read_lite_threads(3)
            .unwrap()
            .read_heavy_threads(1)
            .unwrap()
            .write_insert_threads(2)
            .unwrap()
            .write_update_wide_threads(5)
            .unwrap();
        let spec = d.build().unwrap();
        assert_eq!(spec.read_threads(), 4);
        assert_eq!(spec.write_threads(), 7);
        assert_eq!(spec.total_threads(), 11);
        assert!(!spec.has_dedicated_write_pool());
    }
}
