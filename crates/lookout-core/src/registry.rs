//! Deduplication registry for observed signals.
//!
//! Every notification the bridge sends is keyed by a short string that
//! identifies the *kind* of problem (same message at the same location),
//! and the registry suppresses repeats of the same key. Keys are
//! namespaced by their source so a whole namespace can be purged at once
//! when the overlay clears.

use std::collections::HashSet;

/// Namespace prefix for keys derived from runtime error events.
pub const RUNTIME_PREFIX: &str = "runtime:";

/// Namespace prefix for keys derived from intercepted console output.
pub const CONSOLE_PREFIX: &str = "console:";

/// Namespace prefix for keys derived from the framework error overlay.
pub const OVERLAY_PREFIX: &str = "overlay:";

/// Page-lifetime set of already-reported signal keys.
///
/// Single-threaded by design: the bridge runs entirely on the page's
/// event loop, so no interior locking is needed. The registry is owned
/// by the [`Bridge`](crate::bridge::Bridge) and reset exactly once at
/// the navigation boundary.
#[derive(Debug, Default)]
pub struct DedupRegistry {
    reported: HashSet<String>,
}

impl DedupRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `key` has already been reported.
    #[must_use]
    pub fn has_reported(&self, key: &str) -> bool {
        self.reported.contains(key)
    }

    /// Records `key` as reported. Idempotent.
    pub fn mark_reported(&mut self, key: impl Into<String>) {
        self.reported.insert(key.into());
    }

    /// Removes every key under `prefix`.
    ///
    /// Used on the overlay present→absent transition so that a
    /// recurring identical overlay error is reported again after a
    /// fix-then-break cycle.
    pub fn clear_namespace(&mut self, prefix: &str) {
        let before = self.reported.len();
        self.reported.retain(|key| !key.starts_with(prefix));
        let purged = before - self.reported.len();
        if purged > 0 {
            tracing::debug!(prefix, purged, "purged dedup namespace");
        }
    }

    /// Drops every recorded key.
    ///
    /// Runs once per page teardown; keys from a previous page are
    /// meaningless afterwards.
    pub fn reset_all(&mut self) {
        self.reported.clear();
    }

    /// Number of recorded keys. Mostly useful in tests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reported.len()
    }

    /// Returns true if nothing has been reported yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reported.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_and_query() {
        let mut registry = DedupRegistry::new();
        assert!(!registry.has_reported("runtime:boom:1:2"));

        registry.mark_reported("runtime:boom:1:2");
        assert!(registry.has_reported("runtime:boom:1:2"));
        assert!(!registry.has_reported("runtime:boom:1:3"));
    }

    #[test]
    fn mark_is_idempotent() {
        let mut registry = DedupRegistry::new();
        registry.mark_reported("console:x");
        registry.mark_reported("console:x");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn clear_namespace_only_touches_prefix() {
        let mut registry = DedupRegistry::new();
        registry.mark_reported("overlay:Type error in page.tsx");
        registry.mark_reported("overlay:Module not found");
        registry.mark_reported("console:Failed to fetch");
        registry.mark_reported("runtime:boom:3:7");

        registry.clear_namespace(OVERLAY_PREFIX);

        assert!(!registry.has_reported("overlay:Type error in page.tsx"));
        assert!(!registry.has_reported("overlay:Module not found"));
        assert!(registry.has_reported("console:Failed to fetch"));
        assert!(registry.has_reported("runtime:boom:3:7"));
    }

    #[test]
    fn reset_all_empties_every_namespace() {
        let mut registry = DedupRegistry::new();
        registry.mark_reported("overlay:a");
        registry.mark_reported("console:b");
        registry.mark_reported("plain rejection message");

        registry.reset_all();

        assert!(registry.is_empty());
        assert!(!registry.has_reported("plain rejection message"));
    }
}
