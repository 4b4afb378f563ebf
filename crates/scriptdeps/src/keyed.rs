//
// keyed.rs
//
// Per-file locks so same-file work serializes without a global lock
//

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use url::Url;

/// One async mutex per file key.
///
/// The staleness check, the resolution it triggers, and the matching
/// reconcile assume a consistent prior state, so the sequence must not
/// interleave with itself for one file. Work on different files proceeds in
/// parallel.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    inner: DashMap<Url, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `uri`, creating it on first use.
    pub async fn acquire(&self, uri: &Url) -> OwnedMutexGuard<()> {
        // Clone the Arc out before awaiting; holding the map shard guard
        // across the await would block unrelated keys on the same shard.
        let lock = Arc::clone(self.inner.entry(uri.clone()).or_default().value());
        lock.lock_owned().await
    }

    /// Drop the lock entry for a file no longer tracked. Tasks already
    /// holding or waiting on the old lock are unaffected; the next acquire
    /// starts fresh.
    pub fn discard(&self, uri: &Url) {
        self.inner.remove(uri);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
