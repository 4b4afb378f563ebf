//
// notify.rs
//
// Reload prompting boundary: ask before overwriting accepted dependencies
//

use url::Url;

use crate::tracker::ReloadPrompt;

/// Presents "dependencies changed" prompts to the embedding application.
///
/// `prompt` must not block. An implementation either resolves the decision
/// while the call runs (accept inline, or drop the prompt to keep the old
/// set) or parks the [`ReloadPrompt`] and resolves it later from another
/// task. Whether prompts resolve synchronously or deferred is a property of
/// the injected implementation, not of any process-wide mode.
pub trait ReloadNotifier: Send + Sync {
    /// Present a pending decision for `prompt.uri()`.
    fn prompt(&self, prompt: ReloadPrompt);

    /// Withdraw any outstanding prompt for `uri`. Called when the decision
    /// became moot: the file re-resolved to an unchanged set, or a save
    /// went through.
    fn retract(&self, uri: &Url);
}

/// Notifier that keeps the previous dependencies on every change.
///
/// For embeddings without a UI: a differing re-resolution is dropped until
/// a later resolution agrees with the cache or prompting is turned off.
#[derive(Debug, Default)]
pub struct KeepOldNotifier;

impl ReloadNotifier for KeepOldNotifier {
    fn prompt(&self, prompt: ReloadPrompt) {
        log::debug!("keeping previous dependencies for {}", prompt.uri());
    }

    fn retract(&self, _uri: &Url) {}
}

/// Notifier that accepts every change as soon as it is prompted.
#[derive(Debug, Default)]
pub struct AutoAcceptNotifier;

impl ReloadNotifier for AutoAcceptNotifier {
    fn prompt(&self, prompt: ReloadPrompt) {
        let _ = prompt.accept();
    }

    fn retract(&self, _uri: &Url) {}
}
