//
// lib.rs
//
// Staleness-gated script dependency cache with root-change notification.
//
// The tracker decides when a file's dependencies must be re-resolved and
// reconciles resolved results against an externally owned cache; the worker
// drives that cycle off a change-event queue. Resolution, prompting, report
// display, and the build/index connection are injected collaborators.
//

pub mod cache;
pub mod config;
pub mod keyed;
pub mod notify;
pub mod report;
pub mod stamp;
pub mod tracker;
pub mod types;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{DependencyCache, InMemoryDependencyCache};
pub use config::TrackerConfig;
pub use keyed::KeyedLocks;
pub use notify::{AutoAcceptNotifier, KeepOldNotifier, ReloadNotifier};
pub use report::{LogReportSink, ReportSink};
pub use stamp::StampTable;
pub use tracker::{
    AcceptOutcome, DependencyTracker, ReconcileOutcome, ReloadPrompt, RootsChangeSink,
};
pub use types::{DependencySet, ReportSeverity, ResolveOutcome, ResolveReport};
pub use worker::{ChangeEvent, DependencyResolver, ReloadWorker};
