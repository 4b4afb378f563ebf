//
// cache.rs
//
// Dependency cache boundary and an in-memory reference implementation
//

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::RwLock;

use url::Url;

use crate::types::DependencySet;

/// Storage for resolved dependencies, owned by the embedding application.
///
/// The tracker only ever reads single entries and writes full replacements;
/// it never iterates entries and never deletes them.
pub trait DependencyCache: Send + Sync {
    fn get(&self, uri: &Url) -> Option<DependencySet>;

    /// Replace the entry for `uri`. Returns false when an equal set was
    /// already stored, so callers can skip downstream work on redundant
    /// writes.
    fn save(&self, uri: &Url, deps: DependencySet) -> bool;

    /// Whether `deps` contains roots this cache has never seen in any
    /// entry. Used to decide if a write warrants a root-change
    /// notification.
    fn has_uncached_roots(&self, deps: &DependencySet) -> bool;
}

/// In-memory [`DependencyCache`].
///
/// Keeps a running union of every root ever saved so `has_uncached_roots`
/// is a membership check rather than a scan over all entries. Roots stay
/// known even after the entry that introduced them is overwritten, matching
/// what a build/index system has already registered.
#[derive(Debug, Default)]
pub struct InMemoryDependencyCache {
    entries: RwLock<HashMap<Url, DependencySet>>,
    known_roots: RwLock<HashSet<PathBuf>>,
}

impl InMemoryDependencyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DependencyCache for InMemoryDependencyCache {
    fn get(&self, uri: &Url) -> Option<DependencySet> {
        self.entries.read().ok()?.get(uri).cloned()
    }

    fn save(&self, uri: &Url, deps: DependencySet) -> bool {
        if let Ok(mut known) = self.known_roots.write() {
            known.extend(deps.roots.iter().cloned());
        }
        if let Ok(mut guard) = self.entries.write() {
            if guard.get(uri) == Some(&deps) {
                return false;
            }
            guard.insert(uri.clone(), deps);
            true
        } else {
            false
        }
    }

    fn has_uncached_roots(&self, deps: &DependencySet) -> bool {
        match self.known_roots.read() {
            Ok(known) => deps.roots.iter().any(|root| !known.contains(root)),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_uri(name: &str) -> Url {
        Url::parse(&format!("file:///{}", name)).unwrap()
    }

    fn deps(roots: &[&str]) -> DependencySet {
        DependencySet::new(roots.iter().map(PathBuf::from))
    }

    #[test]
    fn test_save_and_get() {
        let cache = InMemoryDependencyCache::new();
        let uri = test_uri("a.script");

        assert!(cache.get(&uri).is_none());
        assert!(cache.save(&uri, deps(&["/lib/a"])));
        assert_eq!(cache.get(&uri), Some(deps(&["/lib/a"])));
    }

    #[test]
    fn test_save_equal_set_reports_no_change() {
        let cache = InMemoryDependencyCache::new();
        let uri = test_uri("a.script");

        assert!(cache.save(&uri, deps(&["/lib/a"])));
        assert!(!cache.save(&uri, deps(&["/lib/a"])));
    }

    #[test]
    fn test_save_is_full_replacement() {
        let cache = InMemoryDependencyCache::new();
        let uri = test_uri("a.script");

        cache.save(&uri, deps(&["/lib/a", "/lib/b"]));
        cache.save(&uri, deps(&["/lib/c"]));
        assert_eq!(cache.get(&uri), Some(deps(&["/lib/c"])));
    }

    #[test]
    fn test_uncached_roots_detection() {
        let cache = InMemoryDependencyCache::new();
        let uri = test_uri("a.script");

        assert!(cache.has_uncached_roots(&deps(&["/lib/a"])));
        cache.save(&uri, deps(&["/lib/a"]));

        assert!(!cache.has_uncached_roots(&deps(&["/lib/a"])));
        assert!(cache.has_uncached_roots(&deps(&["/lib/a", "/lib/b"])));
    }

    #[test]
    fn test_roots_stay_known_after_overwrite() {
        let cache = InMemoryDependencyCache::new();
        let uri = test_uri("a.script");

        cache.save(&uri, deps(&["/lib/a"]));
        cache.save(&uri, deps(&["/lib/b"]));

        // /lib/a no longer appears in any entry but was registered once
        assert!(!cache.has_uncached_roots(&deps(&["/lib/a"])));
    }

    #[test]
    fn test_roots_shared_across_files() {
        let cache = InMemoryDependencyCache::new();

        cache.save(&test_uri("a.script"), deps(&["/lib/shared"]));
        assert!(!cache.has_uncached_roots(&deps(&["/lib/shared"])));
    }

    #[test]
    fn test_empty_set_never_has_uncached_roots() {
        let cache = InMemoryDependencyCache::new();
        assert!(!cache.has_uncached_roots(&DependencySet::default()));
    }
}
