//! Heap compaction hint.
//!
//! Used as a deliberate disturbance during observation. With the `mimalloc`
//! feature the hint forces mimalloc to collect and return freed memory; without
//! it there is nothing to compact and the hint does nothing.

/// Ask the allocator to compact the heap now.
#[cfg(feature = "mimalloc")]
pub fn compaction_hint() {
    tracing::trace!("Forcing mimalloc collection");
    // SAFETY: mi_collect takes no pointers and may be called from any thread
    // at any time.
    unsafe { libmimalloc_sys::mi_collect(true) };
}

/// Ask the allocator to compact the heap now.
#[cfg(not(feature = "mimalloc"))]
pub fn compaction_hint() {
    tracing::trace!("Heap compaction hint ignored (built without mimalloc)");
}

/// Whether [`compaction_hint`] does anything in this build.
pub const fn compaction_supported() -> bool {
    cfg!(feature = "mimalloc")
}
