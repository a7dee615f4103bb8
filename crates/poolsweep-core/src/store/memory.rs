//! In-process store.
//!
//! Rows live in a [`MemoryTable`], a `BTreeMap` behind a read/write lock.
//! Each [`MemoryStore`] is a handle onto a table, so a shared pool and a
//! dedicated write pool opened from one factory see the same rows. There is
//! no pool and no I/O, so it measures harness overhead and serves as the
//! fast adapter in tests. Row ids wrap at a fixed capacity so long runs stay
//! bounded in memory.

use super::{Store, StoreKind, pick_key, pick_window, random_val, title_fragment};
use crate::error::StoreError;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Default maximum number of live rows.
pub const DEFAULT_MAX_ROWS: u64 = 1_000_000;

#[derive(Debug, Clone)]
struct Row {
    /// The 8-digit fragment; the full title is this repeated.
    title: String,
    val: i32,
}

/// The rows behind one or more [`MemoryStore`] handles.
///
/// Outlives every handle: closing a handle never drops rows, so a later run
/// against the same factory starts from the data earlier runs left behind.
#[derive(Debug)]
pub struct MemoryTable {
    rows: RwLock<BTreeMap<u32, Row>>,
    inserted: AtomicU64,
    max_rows: u64,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::with_max_rows(DEFAULT_MAX_ROWS)
    }

    /// Create a table whose ids wrap after `max_rows` inserts.
    pub fn with_max_rows(max_rows: u64) -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            inserted: AtomicU64::new(0),
            max_rows: max_rows.max(1),
        }
    }

    /// Number of rows currently held.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl Default for MemoryTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Store handle onto an in-process [`MemoryTable`].
#[derive(Debug)]
pub struct MemoryStore {
    table: Arc<MemoryTable>,
    closed: AtomicBool,
}

impl MemoryStore {
    /// A handle onto a fresh, private table.
    pub fn new() -> Self {
        Self::attach(Arc::new(MemoryTable::new()))
    }

    /// A handle onto a fresh table whose ids wrap after `max_rows` inserts.
    pub fn with_max_rows(max_rows: u64) -> Self {
        Self::attach(Arc::new(MemoryTable::with_max_rows(max_rows)))
    }

    /// A new open handle onto an existing table.
    pub fn attach(table: Arc<MemoryTable>) -> Self {
        Self {
            table,
            closed: AtomicBool::new(false),
        }
    }

    pub fn table(&self) -> &Arc<MemoryTable> {
        &self.table
    }

    /// Number of rows currently held by the table.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }

    fn init(&self) -> Result<(), StoreError> {
        if self.open() {
            Ok(())
        } else {
            Err(StoreError::Init {
                kind: StoreKind::Memory,
                reason: "store is closed".to_string(),
            })
        }
    }

    #[allow(clippy::cast_possible_truncation)] // n % max_rows fits in u32 for sane capacities
    fn insert(&self) -> bool {
        if !self.open() {
            return false;
        }
        let n = self.table.inserted.fetch_add(1, Ordering::Relaxed);
        let id = (n % self.table.max_rows) as u32 + 1;
        let row = Row {
            title: title_fragment(),
            val: random_val(),
        };
        self.table.rows.write().insert(id, row);
        true
    }

    fn update_tiny(&self, range_from: u32, range_to: u32) -> bool {
        let Some(id) = pick_key(range_from, range_to) else {
            return false;
        };
        if !self.open() {
            return false;
        }
        // Like SQL UPDATE, touching a missing id is not an error.
        if let Some(row) = self.table.rows.write().get_mut(&id) {
            row.val = random_val();
        }
        true
    }

    fn update_wide(&self, range_from: u32, range_to: u32) -> bool {
        let Some(id) = pick_key(range_from, range_to) else {
            return false;
        };
        if !self.open() {
            return false;
        }
        let title = title_fragment();
        if let Some(row) = self.table.rows.write().get_mut(&id) {
            row.title = title;
        }
        true
    }

    fn select_lite(&self, range_from: u32, range_to: u32) -> bool {
        let Some(id) = pick_key(range_from, range_to) else {
            return false;
        };
        if !self.open() {
            return false;
        }
        self.table
            .rows
            .read()
            .get(&id)
            .map(|row| std::hint::black_box(row.val))
            .is_some()
    }

    fn select_heavy(&self, range_from: u32, range_to: u32, size: u32) -> bool {
        let Some((start, end)) = pick_window(range_from, range_to, size) else {
            return false;
        };
        if !self.open() {
            return false;
        }
        let rows = self.table.rows.read();
        let (sum, count) = rows
            .range(start..=end)
            .fold((0i64, 0u64), |(sum, count), (_, row)| {
                (sum + i64::from(row.val), count + 1)
            });
        std::hint::black_box(if count == 0 { None } else { Some(sum / count as i64) });
        true
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
