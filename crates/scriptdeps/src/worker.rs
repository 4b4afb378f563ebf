//
// worker.rs
//
// Change-event queue driving the reload cycle
//

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::keyed::KeyedLocks;
use crate::tracker::DependencyTracker;
use crate::types::ResolveOutcome;

/// Interval between queue polls.
const POLL_INTERVAL_MS: u64 = 25;

/// Produces dependencies for a script file on demand.
///
/// Resolution failure is expressed in the outcome (absent dependencies plus
/// error reports); the worker never sees a raw error.
#[async_trait]
pub trait DependencyResolver: Send + Sync {
    /// Whether this resolver is responsible for `uri`. Change events for
    /// files it does not handle are dropped at submission.
    fn handles(&self, uri: &Url) -> bool;

    async fn resolve(&self, uri: &Url) -> ResolveOutcome;
}

/// A queued change notification for one file.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub uri: Url,
    pub stamp: u64,
    pub submitted_at: Instant,
}

/// Bounded FIFO of change events, one entry per file.
///
/// A submission for an already queued file collapses into the existing
/// entry, keeping the newest stamp; the reload cycle it eventually triggers
/// reads the file's latest state anyway.
struct ChangeQueue {
    inner: Mutex<VecDeque<ChangeEvent>>,
    max_size: usize,
}

impl ChangeQueue {
    fn new(max_size: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            max_size,
        }
    }

    /// Returns false when the event was dropped because the queue is full.
    fn push(&self, uri: Url, stamp: u64) -> bool {
        let mut queue = self.inner.lock().unwrap();

        if let Some(existing) = queue.iter_mut().find(|event| event.uri == uri) {
            existing.stamp = stamp;
            existing.submitted_at = Instant::now();
            log::trace!("collapsed change event for {} (stamp={})", uri, stamp);
            return true;
        }

        if queue.len() >= self.max_size {
            log::warn!(
                "change queue full, dropping event for {} ({}/{})",
                uri,
                queue.len(),
                self.max_size
            );
            return false;
        }

        queue.push_back(ChangeEvent {
            uri: uri.clone(),
            stamp,
            submitted_at: Instant::now(),
        });
        log::trace!(
            "queued change event for {} (stamp={}, queue_size={})",
            uri,
            stamp,
            queue.len()
        );
        true
    }

    fn pop(&self) -> Option<ChangeEvent> {
        self.inner.lock().unwrap().pop_front()
    }

    fn remove(&self, uri: &Url) {
        let mut queue = self.inner.lock().unwrap();
        let before = queue.len();
        queue.retain(|event| event.uri != *uri);
        if queue.len() < before {
            log::trace!("removed queued change event for {}", uri);
        }
    }

    fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

/// Drives should-reload, resolve, reconcile off a change-event queue.
///
/// Each event is processed on its own task holding that file's key lock, so
/// events for one file serialize while different files resolve in parallel.
/// A periodic tick flushes pending root-change notifications; callers may
/// also flush explicitly via [`flush_now`](Self::flush_now).
pub struct ReloadWorker {
    tracker: Arc<DependencyTracker>,
    resolver: Arc<dyn DependencyResolver>,
    queue: Arc<ChangeQueue>,
    locks: Arc<KeyedLocks>,
    worker_handle: Mutex<Option<JoinHandle<()>>>,
    cancellation_token: CancellationToken,
}

impl ReloadWorker {
    /// Creates the worker and starts its driving loop.
    ///
    /// Must run inside a tokio runtime.
    pub fn new(tracker: Arc<DependencyTracker>, resolver: Arc<dyn DependencyResolver>) -> Self {
        let queue = Arc::new(ChangeQueue::new(tracker.config().max_queue_size));
        let worker = Self {
            tracker,
            resolver,
            queue,
            locks: Arc::new(KeyedLocks::new()),
            worker_handle: Mutex::new(None),
            cancellation_token: CancellationToken::new(),
        };
        worker.start_worker();
        worker
    }

    /// Submit a change notification for `uri` at `stamp`.
    ///
    /// Dropped when no resolver handles the file or the queue is full.
    /// Whether the event actually triggers resolution is decided when it is
    /// dequeued, against the stamp recorded by the last triggered reload.
    pub fn submit(&self, uri: Url, stamp: u64) {
        if !self.resolver.handles(&uri) {
            log::trace!("no resolver handles {}, dropping change event", uri);
            return;
        }
        self.queue.push(uri, stamp);
    }

    /// Withdraw a file the host stopped tracking: its queued event, its
    /// staleness record, and its key lock entry. Cached dependencies stay.
    pub fn cancel(&self, uri: &Url) {
        self.queue.remove(uri);
        self.tracker.forget(uri);
        self.locks.discard(uri);
    }

    /// Deliver a pending roots-change notification without waiting for the
    /// periodic tick.
    pub fn flush_now(&self) -> bool {
        self.tracker.flush_roots_changed()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    fn start_worker(&self) {
        let tracker = self.tracker.clone();
        let resolver = self.resolver.clone();
        let queue = self.queue.clone();
        let locks = self.locks.clone();
        let token = self.cancellation_token.clone();
        let flush_interval = Duration::from_millis(tracker.config().flush_interval_ms.max(1));

        let handle = tokio::spawn(async move {
            log::info!("reload worker started");
            let mut flush_tick = tokio::time::interval(flush_interval);
            flush_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        log::info!("reload worker stopped");
                        break;
                    }
                    _ = flush_tick.tick() => {
                        tracker.flush_roots_changed();
                    }
                    _ = tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)) => {
                        if let Some(event) = queue.pop() {
                            let tracker = tracker.clone();
                            let resolver = resolver.clone();
                            let locks = locks.clone();
                            tokio::spawn(async move {
                                Self::process_event(tracker, resolver, locks, event).await;
                            });
                        }
                    }
                }
            }
        });

        *self.worker_handle.lock().unwrap() = Some(handle);
    }

    /// Runs one reload cycle under the file's key lock.
    async fn process_event(
        tracker: Arc<DependencyTracker>,
        resolver: Arc<dyn DependencyResolver>,
        locks: Arc<KeyedLocks>,
        event: ChangeEvent,
    ) {
        let _guard = locks.acquire(&event.uri).await;

        if !tracker.should_reload(&event.uri, event.stamp) {
            log::trace!(
                "dependencies of {} already current at stamp {}",
                event.uri,
                event.stamp
            );
            return;
        }

        let started = Instant::now();
        let outcome = resolver.resolve(&event.uri).await;
        let disposition = tracker.process(&event.uri, outcome);
        log::debug!(
            "reloaded {} in {:?} ({:?}, queued {:?} ago)",
            event.uri,
            started.elapsed(),
            disposition,
            event.submitted_at.elapsed()
        );
    }

    /// Stops the driving loop. Cycles already in flight run to completion.
    pub fn shutdown(&self) {
        log::info!("shutting down reload worker");
        self.cancellation_token.cancel();

        if let Some(handle) = self.worker_handle.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl Drop for ReloadWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
