//
// test_support.rs
//
// Shared test doubles for the tracker's injected collaborators
//

#![cfg(test)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use url::Url;

use crate::cache::InMemoryDependencyCache;
use crate::config::TrackerConfig;
use crate::notify::ReloadNotifier;
use crate::report::ReportSink;
use crate::tracker::{DependencyTracker, ReloadPrompt, RootsChangeSink};
use crate::types::{DependencySet, ResolveReport};

pub fn test_uri(name: &str) -> Url {
    Url::parse(&format!("file:///{}", name)).unwrap()
}

pub fn deps(roots: &[&str]) -> DependencySet {
    DependencySet::new(roots.iter().map(PathBuf::from))
}

/// Notifier that parks every prompt for the test to resolve and counts
/// retractions per file.
#[derive(Default)]
pub struct StashNotifier {
    prompts: Mutex<Vec<ReloadPrompt>>,
    retractions: Mutex<HashMap<Url, usize>>,
}

impl StashNotifier {
    pub fn take_prompts(&self) -> Vec<ReloadPrompt> {
        std::mem::take(&mut *self.prompts.lock().unwrap())
    }

    pub fn retracted(&self, uri: &Url) -> usize {
        self.retractions
            .lock()
            .unwrap()
            .get(uri)
            .copied()
            .unwrap_or(0)
    }
}

impl ReloadNotifier for StashNotifier {
    fn prompt(&self, prompt: ReloadPrompt) {
        self.prompts.lock().unwrap().push(prompt);
    }

    fn retract(&self, uri: &Url) {
        *self
            .retractions
            .lock()
            .unwrap()
            .entry(uri.clone())
            .or_insert(0) += 1;
    }
}

/// Roots-change sink counting deliveries, with a switchable failure mode.
#[derive(Default)]
pub struct CountingSink {
    delivered: AtomicUsize,
    fail_next: AtomicBool,
}

impl CountingSink {
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    pub fn fail_next(&self, fail: bool) {
        self.fail_next.store(fail, Ordering::SeqCst);
    }
}

impl RootsChangeSink for CountingSink {
    fn roots_changed(&self) -> anyhow::Result<()> {
        if self.fail_next.load(Ordering::SeqCst) {
            anyhow::bail!("build system unavailable");
        }
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Report sink recording every attachment per file, in order.
#[derive(Default)]
pub struct RecordingReportSink {
    attachments: Mutex<HashMap<Url, Vec<Vec<ResolveReport>>>>,
}

impl RecordingReportSink {
    pub fn attached(&self, uri: &Url) -> Vec<Vec<ResolveReport>> {
        self.attachments
            .lock()
            .unwrap()
            .get(uri)
            .cloned()
            .unwrap_or_default()
    }

    pub fn last(&self, uri: &Url) -> Option<Vec<ResolveReport>> {
        self.attached(uri).pop()
    }
}

impl ReportSink for RecordingReportSink {
    fn attach(&self, uri: &Url, reports: &[ResolveReport]) {
        self.attachments
            .lock()
            .unwrap()
            .entry(uri.clone())
            .or_default()
            .push(reports.to_vec());
    }
}

/// A tracker wired to recording doubles for every collaborator.
pub struct TrackerHarness {
    pub tracker: DependencyTracker,
    pub cache: Arc<InMemoryDependencyCache>,
    pub notifier: Arc<StashNotifier>,
    pub reports: Arc<RecordingReportSink>,
    pub sink: Arc<CountingSink>,
}

pub fn tracker_with(config: TrackerConfig) -> TrackerHarness {
    let cache = Arc::new(InMemoryDependencyCache::new());
    let notifier = Arc::new(StashNotifier::default());
    let reports = Arc::new(RecordingReportSink::default());
    let sink = Arc::new(CountingSink::default());
    let tracker = DependencyTracker::new(
        config,
        cache.clone(),
        notifier.clone(),
        reports.clone(),
        sink.clone(),
    );
    TrackerHarness {
        tracker,
        cache,
        notifier,
        reports,
        sink,
    }
}
