//! Bounded cache of live view surfaces.
//!
//! Terminal view surfaces are expensive to build and carry session state,
//! so the front end reuses them across navigation instead of rebuilding.
//! This cache bounds how many stay alive: each insertion runs an eviction
//! pass that drops the least-recently-used unpinned entries, while an entry
//! owned by a visible pane is never dropped - even when that keeps the
//! cache above its nominal bound.
//!
//! The cache stores surfaces opaquely; creating one on a miss is the
//! caller's job, and a miss is a normal result, not an error.

use std::collections::HashMap;
use std::fmt;

/// Default maximum number of cached views.
pub const DEFAULT_VIEW_CACHE_CAPACITY: usize = 10;

#[derive(Debug)]
struct CacheEntry<V> {
    view: V,
    /// Monotonic recency stamp; refreshed on every hit.
    last_used: u64,
    /// Pin tag; a present owner makes the entry ineligible for eviction.
    owner: Option<String>,
}

/// Bounded, pin-aware view cache keyed by an opaque string.
///
/// Callers choose the key format (typically a composite identifier naming
/// the resource). Lookups refresh recency; insertion triggers the eviction
/// pass; [`set_owner`](Self::set_owner) only tags entries and never evicts.
pub struct ViewCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    capacity: usize,
    /// Logical clock backing the recency stamps.
    clock: u64,
}

impl<V> ViewCache<V> {
    /// Create a cache with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_VIEW_CACHE_CAPACITY)
    }

    /// Create a cache bounded at `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            clock: 0,
        }
    }

    /// Look up a cached view, refreshing its recency on a hit.
    ///
    /// A miss means the caller creates the view and [`put`](Self::put)s it.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        self.clock += 1;
        let stamp = self.clock;
        let entry = self.entries.get_mut(key)?;
        entry.last_used = stamp;
        Some(&entry.view)
    }

    /// Insert or replace the view for `key`, then run the eviction pass.
    ///
    /// Replacing a key resets its recency and pin state - the new view is a
    /// fresh entry.
    pub fn put(&mut self, key: impl Into<String>, view: V) {
        self.put_owned(key, view, None);
    }

    /// Insert or replace the view for `key` with its pin owner already set,
    /// then run the eviction pass.
    ///
    /// Views created for immediate display arrive pinned and are exempt
    /// from the eviction pass their own insertion triggers.
    pub fn put_owned(&mut self, key: impl Into<String>, view: V, owner: Option<&str>) {
        self.clock += 1;
        let entry = CacheEntry {
            view,
            last_used: self.clock,
            owner: owner.map(String::from),
        };
        self.entries.insert(key.into(), entry);
        self.evict();
    }

    /// Update the pin tag for `key`.
    ///
    /// A present owner marks the entry as actively displayed and exempts it
    /// from eviction; `None` returns it to the eviction pool. Does nothing
    /// for unknown keys and never evicts by itself.
    pub fn set_owner(&mut self, key: &str, owner: Option<&str>) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.owner = owner.map(String::from);
        }
    }

    /// Current pin owner of `key`, if any.
    #[must_use]
    pub fn owner(&self, key: &str) -> Option<&str> {
        self.entries.get(key)?.owner.as_deref()
    }

    /// Drop the entry for `key`, returning its view.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|entry| entry.view)
    }

    /// Whether `key` is cached.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of cached views. May exceed [`capacity`](Self::capacity) when
    /// pinned entries alone overflow the bound.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop least-recently-used unpinned entries until the count is back at
    /// the capacity.
    ///
    /// Candidates are ordered unpinned-before-pinned, oldest first within
    /// each group; pinned entries are skipped outright, so pinned overflow
    /// leaves the cache above its nominal bound.
    fn evict(&mut self) {
        if self.entries.len() <= self.capacity {
            return;
        }

        let mut order: Vec<(String, bool, u64)> = self
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.owner.is_some(), entry.last_used))
            .collect();
        order.sort_by(|a, b| a.1.cmp(&b.1).then(a.2.cmp(&b.2)));

        for (key, pinned, _) in order {
            if self.entries.len() <= self.capacity {
                break;
            }
            if pinned {
                continue;
            }
            self.entries.remove(&key);
            log::debug!("evicted view {key}");
        }

        if self.entries.len() > self.capacity {
            log::debug!(
                "pinned views exceed capacity ({} > {})",
                self.entries.len(),
                self.capacity
            );
        }
    }
}

impl<V> Default for ViewCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for ViewCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewCache")
            .field("len", &self.entries.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
