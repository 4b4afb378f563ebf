//
// stamp.rs
//
// Last-processed modification stamps with bounded LRU eviction
//

use std::num::NonZeroUsize;
use std::sync::RwLock;

use lru::LruCache;
use url::Url;

/// Fallback capacity when a caller passes zero.
const DEFAULT_STAMP_CAPACITY: usize = 256;

/// Tracks the last-processed modification stamp per file.
///
/// Bounded: once more than `capacity` files have been observed, the
/// least-recently-touched record is dropped. Losing a record only means the
/// next [`check_and_update`](Self::check_and_update) for that file reports
/// stale again; resolved dependencies live elsewhere and are unaffected.
pub struct StampTable {
    inner: RwLock<LruCache<Url, u64>>,
}

impl std::fmt::Debug for StampTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StampTable").finish_non_exhaustive()
    }
}

impl Default for StampTable {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_STAMP_CAPACITY)
    }
}

impl StampTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        let cap = NonZeroUsize::new(cap)
            .unwrap_or(NonZeroUsize::new(DEFAULT_STAMP_CAPACITY).unwrap());
        Self {
            inner: RwLock::new(LruCache::new(cap)),
        }
    }

    /// Compare `stamp` against the stored record for `uri` and record it.
    ///
    /// Returns true exactly when the stored stamp differs or no record
    /// exists yet. The comparison and the record happen under one write
    /// lock, so two concurrent calls for the same file cannot both observe
    /// the old record. The record is written before any resolution runs, so
    /// a resolution failure does not re-trigger on an unchanged file.
    pub fn check_and_update(&self, uri: &Url, stamp: u64) -> bool {
        let mut guard = self.inner.write().unwrap();
        // get() also refreshes recency, keeping actively checked files
        // resident under capacity pressure.
        let stale = guard.get(uri) != Some(&stamp);
        if stale {
            guard.push(uri.clone(), stamp);
        }
        stale
    }

    /// Last recorded stamp, without touching recency.
    pub fn peek(&self, uri: &Url) -> Option<u64> {
        self.inner.read().unwrap().peek(uri).copied()
    }

    /// Drop the record for a file the host stopped tracking.
    pub fn forget(&self, uri: &Url) {
        self.inner.write().unwrap().pop(uri);
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
