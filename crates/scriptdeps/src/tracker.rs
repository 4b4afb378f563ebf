//
// tracker.rs
//
// Staleness gating and reconciliation of resolved script dependencies
//

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use url::Url;

use crate::cache::DependencyCache;
use crate::config::TrackerConfig;
use crate::notify::ReloadNotifier;
use crate::report::ReportSink;
use crate::stamp::StampTable;
use crate::types::{DependencySet, ResolveOutcome, ResolveReport};

/// How `reconcile` disposed of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The set was written to the cache: a first resolution, or a silent
    /// overwrite with prompting disabled.
    Saved,
    /// The new set equals the cached one; nothing was written.
    Unchanged,
    /// The new set differs and the decision now rests with the notifier.
    /// The cache keeps the previous set until the prompt is accepted.
    PendingDecision,
    /// The resolver produced nothing usable; ignored entirely.
    Skipped,
}

/// What became of an accepted prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// The proposed set was written.
    Applied,
    /// The cache moved on since the prompt was computed; nothing written.
    Superseded,
}

/// Receives "dependency roots changed" notifications, typically a build or
/// index subsystem. Delivery failures leave the pending flag armed so the
/// next flush trigger retries.
pub trait RootsChangeSink: Send + Sync {
    fn roots_changed(&self) -> anyhow::Result<()>;
}

struct TrackerShared {
    config: TrackerConfig,
    cache: Arc<dyn DependencyCache>,
    notifier: Arc<dyn ReloadNotifier>,
    reports: Arc<dyn ReportSink>,
    sink: Arc<dyn RootsChangeSink>,
    /// True while an accepted write introduced roots the cache had not seen
    /// and no flush has delivered that news yet.
    roots_changed: AtomicBool,
    /// Bumped on every successful flush.
    root_epoch: AtomicU64,
    /// Digest of the last report set attached per file.
    attached_reports: RwLock<HashMap<Url, u64>>,
}

impl TrackerShared {
    fn save_to_cache(&self, uri: &Url, deps: DependencySet) {
        if self.config.prompt_on_change {
            self.notifier.retract(uri);
        }
        // Compute before the write: once saved, the new roots are cached
        // and the question answers itself.
        let new_roots = self.cache.has_uncached_roots(&deps);
        self.cache.save(uri, deps);
        if new_roots {
            self.roots_changed.store(true, Ordering::SeqCst);
        }
    }

    fn attach_reports_if_changed(&self, uri: &Url, reports: &[ResolveReport]) {
        let digest = report_digest(reports);
        {
            let seen = self.attached_reports.read().unwrap();
            match seen.get(uri) {
                Some(prior) if *prior == digest => return,
                // Nothing attached yet and nothing to attach: no-op, and
                // don't record a digest for it either.
                None if reports.is_empty() => return,
                _ => {}
            }
        }
        self.attached_reports.write().unwrap().insert(uri.clone(), digest);
        self.reports.attach(uri, reports);
    }
}

fn report_digest(reports: &[ResolveReport]) -> u64 {
    let mut hasher = DefaultHasher::new();
    reports.hash(&mut hasher);
    hasher.finish()
}

/// A pending "dependencies changed" decision handed to the notifier.
///
/// Carries the previous and proposed sets; `accept` applies the proposed
/// set, dropping the prompt keeps the previous one. The prompt may be
/// resolved from any task, long after the reconcile that produced it
/// returned.
pub struct ReloadPrompt {
    uri: Url,
    previous: DependencySet,
    proposed: DependencySet,
    reports: Option<Vec<ResolveReport>>,
    shared: Arc<TrackerShared>,
}

impl std::fmt::Debug for ReloadPrompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadPrompt")
            .field("uri", &self.uri)
            .field("previous", &self.previous)
            .field("proposed", &self.proposed)
            .finish_non_exhaustive()
    }
}

impl ReloadPrompt {
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// The set that was cached when the prompt was computed.
    pub fn previous(&self) -> &DependencySet {
        &self.previous
    }

    /// The freshly resolved set awaiting the decision.
    pub fn proposed(&self) -> &DependencySet {
        &self.proposed
    }

    /// Apply the proposed set.
    ///
    /// Re-validates that the cache still holds the set the diff was
    /// computed against; when something newer landed in the meantime the
    /// accept is a no-op rather than clobbering it.
    pub fn accept(self) -> AcceptOutcome {
        if self.shared.cache.get(&self.uri).as_ref() != Some(&self.previous) {
            log::debug!("stale accept for {}, cache moved on", self.uri);
            return AcceptOutcome::Superseded;
        }
        self.shared.save_to_cache(&self.uri, self.proposed);
        if let Some(reports) = &self.reports {
            self.shared.attach_reports_if_changed(&self.uri, reports);
        }
        AcceptOutcome::Applied
    }
}

/// Decides when a file's dependencies must be re-resolved and reconciles
/// freshly resolved results against the cache.
///
/// One tracker serves every file. Callers serialize the
/// should_reload, resolve, process sequence per file key (see
/// [`KeyedLocks`](crate::keyed::KeyedLocks)); calls for different files may
/// run concurrently. Collaborators are injected: the tracker owns no
/// resolver, no UI, and no build system connection.
pub struct DependencyTracker {
    stamps: StampTable,
    shared: Arc<TrackerShared>,
}

impl std::fmt::Debug for DependencyTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyTracker")
            .field("stamps", &self.stamps)
            .finish_non_exhaustive()
    }
}

impl DependencyTracker {
    pub fn new(
        config: TrackerConfig,
        cache: Arc<dyn DependencyCache>,
        notifier: Arc<dyn ReloadNotifier>,
        reports: Arc<dyn ReportSink>,
        sink: Arc<dyn RootsChangeSink>,
    ) -> Self {
        let stamps = StampTable::with_capacity(config.stamp_capacity);
        Self {
            stamps,
            shared: Arc::new(TrackerShared {
                config,
                cache,
                notifier,
                reports,
                sink,
                roots_changed: AtomicBool::new(false),
                root_epoch: AtomicU64::new(0),
                attached_reports: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.shared.config
    }

    /// True when `current_stamp` differs from the last processed stamp for
    /// `uri`, including the first observation of the file.
    ///
    /// Records `current_stamp` immediately, before any resolution runs: a
    /// resolution failure afterwards does not make an unchanged file read
    /// as stale again. Retries are the caller's responsibility.
    pub fn should_reload(&self, uri: &Url, current_stamp: u64) -> bool {
        let stale = self.stamps.check_and_update(uri, current_stamp);
        if stale {
            log::trace!("stamp changed for {}, reload required", uri);
        }
        stale
    }

    /// Reconcile a freshly resolved dependency set against the cache.
    ///
    /// `None` means resolution produced nothing usable and is ignored
    /// outright. A first resolution always saves, without comparison or
    /// prompt. An equal set leaves the cache alone. A differing set
    /// overwrites silently when prompting is disabled; otherwise the
    /// injected notifier receives a [`ReloadPrompt`] and this returns
    /// immediately, the previous set staying cached until the prompt is
    /// accepted.
    pub fn reconcile(&self, uri: &Url, resolved: Option<DependencySet>) -> ReconcileOutcome {
        self.reconcile_inner(uri, resolved, None)
    }

    /// [`reconcile`](Self::reconcile) plus report attachment.
    ///
    /// Reports ride with whichever cache action happens: attached right
    /// away on save, skip, or an unchanged result, but deferred into the
    /// prompt when the decision is pending, so they land together with an
    /// accepted set.
    pub fn process(&self, uri: &Url, outcome: ResolveOutcome) -> ReconcileOutcome {
        let ResolveOutcome {
            dependencies,
            reports,
        } = outcome;
        self.reconcile_inner(uri, dependencies, Some(reports))
    }

    fn reconcile_inner(
        &self,
        uri: &Url,
        resolved: Option<DependencySet>,
        reports: Option<Vec<ResolveReport>>,
    ) -> ReconcileOutcome {
        let Some(new_deps) = resolved else {
            log::trace!("empty resolution for {}, ignoring", uri);
            if let Some(reports) = &reports {
                self.shared.attach_reports_if_changed(uri, reports);
            }
            return ReconcileOutcome::Skipped;
        };

        let Some(previous) = self.shared.cache.get(uri) else {
            // First resolution always wins
            self.shared.save_to_cache(uri, new_deps);
            if let Some(reports) = &reports {
                self.shared.attach_reports_if_changed(uri, reports);
            }
            return ReconcileOutcome::Saved;
        };

        if previous == new_deps {
            if self.shared.config.prompt_on_change {
                // Any outstanding prompt is moot now
                self.shared.notifier.retract(uri);
            }
            if let Some(reports) = &reports {
                self.shared.attach_reports_if_changed(uri, reports);
            }
            return ReconcileOutcome::Unchanged;
        }

        if !self.shared.config.prompt_on_change {
            self.shared.save_to_cache(uri, new_deps);
            if let Some(reports) = &reports {
                self.shared.attach_reports_if_changed(uri, reports);
            }
            return ReconcileOutcome::Saved;
        }

        log::debug!("dependencies changed for {}, deferring to notifier", uri);
        self.shared.notifier.prompt(ReloadPrompt {
            uri: uri.clone(),
            previous,
            proposed: new_deps,
            reports,
            shared: Arc::clone(&self.shared),
        });
        ReconcileOutcome::PendingDecision
    }

    /// Deliver a pending "roots changed" notification, if any.
    ///
    /// Safe to call from any number of triggers (periodic tick, explicit
    /// request): the flag is swapped out atomically, so once cleared the
    /// next call returns false without notifying again. Returns false when
    /// nothing was pending or the sink failed; a failed delivery re-arms
    /// the flag so the next trigger retries.
    pub fn flush_roots_changed(&self) -> bool {
        if !self.shared.roots_changed.swap(false, Ordering::SeqCst) {
            return false;
        }
        match self.shared.sink.roots_changed() {
            Ok(()) => {
                let epoch = self.shared.root_epoch.fetch_add(1, Ordering::SeqCst) + 1;
                log::debug!("dependency roots change delivered (epoch {})", epoch);
                true
            }
            Err(err) => {
                log::warn!("roots change notification failed, will retry: {:#}", err);
                self.shared.roots_changed.store(true, Ordering::SeqCst);
                false
            }
        }
    }

    /// Number of successful root-change flushes so far. Consumers can
    /// compare epochs to cheaply detect that roots moved underneath them.
    pub fn root_epoch(&self) -> u64 {
        self.shared.root_epoch.load(Ordering::SeqCst)
    }

    /// Whether a roots change is waiting to be flushed.
    pub fn roots_change_pending(&self) -> bool {
        self.shared.roots_changed.load(Ordering::SeqCst)
    }

    /// Drop staleness and report state for a file the host stopped
    /// tracking. Cached dependencies stay: the cache is externally owned
    /// and this component never deletes from it.
    pub fn forget(&self, uri: &Url) {
        self.stamps.forget(uri);
        self.shared.attached_reports.write().unwrap().remove(uri);
    }
}
