//
// config.rs
//
// Configuration for dependency tracking
//

use serde::Deserialize;

/// Dependency tracking configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackerConfig {
    /// Maximum number of files whose last-processed modification stamps are
    /// remembered. Records beyond the limit are evicted
    /// least-recently-touched first; eviction only forgets staleness state,
    /// never resolved dependencies.
    pub stamp_capacity: usize,
    /// Whether a differing re-resolution asks the notifier before
    /// overwriting previously accepted dependencies. When false, differing
    /// sets overwrite silently.
    pub prompt_on_change: bool,
    /// Interval between periodic root-change flush ticks, in milliseconds.
    pub flush_interval_ms: u64,
    /// Maximum number of queued change events before new submissions are
    /// dropped.
    pub max_queue_size: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            stamp_capacity: 256,
            prompt_on_change: true,
            flush_interval_ms: 200,
            max_queue_size: 50,
        }
    }
}

impl TrackerConfig {
    /// Build a config from editor-supplied JSON settings.
    ///
    /// A missing field takes its default; a malformed payload falls back to
    /// the full default config rather than failing initialization.
    pub fn from_json(value: serde_json::Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}
