//! Mock stores and fault-injecting factories.

use parking_lot::Mutex;
use poolsweep_core::{Store, StoreError, StoreFactory, StoreKind};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Store whose data operations always succeed instantly.
#[derive(Debug)]
pub struct AlwaysOkStore {
    kind: StoreKind,
    pub pool_size: u32,
    pub fail_init: bool,
    pub ops: AtomicU64,
    pub inits: AtomicUsize,
    pub closes: AtomicUsize,
}

impl AlwaysOkStore {
    pub fn new(kind: StoreKind, pool_size: u32) -> Self {
        Self {
            kind,
            pool_size,
            fail_init: false,
            ops: AtomicU64::new(0),
            inits: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        }
    }

    pub fn ops(&self) -> u64 {
        self.ops.load(Ordering::SeqCst)
    }

    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn op(&self) -> bool {
        self.ops.fetch_add(1, Ordering::Relaxed);
        true
    }
}

impl Store for AlwaysOkStore {
    fn kind(&self) -> StoreKind {
        self.kind
    }

    fn init(&self) -> Result<(), StoreError> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            return Err(StoreError::Init {
                kind: self.kind,
                reason: "injected init failure".to_string(),
            });
        }
        Ok(())
    }

    fn insert(&self) -> bool {
        self.op()
    }

    fn update_tiny(&self, _range_from: u32, _range_to: u32) -> bool {
        self.op()
    }

    fn update_wide(&self, _range_from: u32, _range_to: u32) -> bool {
        self.op()
    }

    fn select_lite(&self, _range_from: u32, _range_to: u32) -> bool {
        self.op()
    }

    fn select_heavy(&self, _range_from: u32, _range_to: u32, _size: u32) -> bool {
        self.op()
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory handing out [`AlwaysOkStore`]s and remembering every one.
///
/// Faults can be injected per store kind, on the n-th open, or at init.
#[derive(Debug, Default)]
pub struct RecordingFactory {
    pub opened: Mutex<Vec<Arc<AlwaysOkStore>>>,
    pub failing_kinds: HashSet<StoreKind>,
    /// Fail the open with this zero-based index (counted across all kinds).
    pub fail_open_at: Option<usize>,
    pub fail_init: bool,
    attempts: AtomicUsize,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(kinds: &[StoreKind]) -> Self {
        Self {
            failing_kinds: kinds.iter().copied().collect(),
            ..Self::default()
        }
    }

    /// Fail the open with this zero-based index.
    pub fn failing_open_at(index: usize) -> Self {
        Self {
            fail_open_at: Some(index),
            ..Self::default()
        }
    }

    /// Every opened store fails `init`.
    pub fn failing_init() -> Self {
        Self {
            fail_init: true,
            ..Self::default()
        }
    }

    pub fn stores(&self) -> Vec<Arc<AlwaysOkStore>> {
        self.opened.lock().clone()
    }

    pub fn open_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl StoreFactory for RecordingFactory {
    fn open(&self, kind: StoreKind, pool_size: u32) -> Result<Arc<dyn Store>, StoreError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing_kinds.contains(&kind) || self.fail_open_at == Some(attempt) {
            return Err(StoreError::Connect {
                kind,
                target: "mock".to_string(),
                reason: "injected connect failure".to_string(),
            });
        }
        let mut store = AlwaysOkStore::new(kind, pool_size);
        store.fail_init = self.fail_init;
        let store = Arc::new(store);
        self.opened.lock().push(Arc::clone(&store));
        Ok(store)
    }
}
