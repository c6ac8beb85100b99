//! Process-wide dependency cache.
//!
//! Holds the union of every successful resolution. It is never pruned and
//! never invalidated by file changes: keeping the file set current is left
//! to the host tool's own watch invalidation through registered
//! dependencies. Only the per-request `cache` flag decides whether it is
//! consulted at all.

use parking_lot::Mutex;

use super::DependencySet;

#[derive(Debug, Default)]
pub struct DependencyCache {
    inner: Mutex<DependencySet>,
}

impl DependencyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True until the first successful resolution is recorded.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Cached set if non-empty, in one critical section.
    pub fn hit(&self) -> Option<DependencySet> {
        let inner = self.inner.lock();
        (!inner.is_empty()).then(|| inner.clone())
    }

    /// Append a resolution result.
    pub fn record(&self, resolved: &DependencySet) {
        self.inner.lock().extend(resolved);
    }
}
