// =============================================================================
// view_cache.rs — MEMOIZED GROUPED VIEWS
// =============================================================================
//
// Filtering and grouping are pure functions of (catalog, view, query), and
// the same handful of queries come in over and over: the bare home page, a
// country toggle or two. The cache keys on the catalog generation as well,
// so a new fetch cycle makes every old entry unreachable without an explicit
// flush. Stale generations age out through LRU eviction.
// =============================================================================

use lru::LruCache;
use parking_lot::Mutex;
use portable_atomic::{AtomicU64, Ordering};
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::filter::{FilterQuery, ListingView};
use crate::grouping::GroupedView;

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(256) {
    Some(n) => n,
    None => unreachable!(),
};

/// A cached view is only valid for the catalog generation it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ViewKey {
    generation: u64,
    view: ListingView,
    query: FilterQuery,
}

/// Lifetime lookup counters. Never reset, not even by [`ViewCache::clear`].
pub struct ViewCacheStats {
    pub hits: AtomicU64,
    /// Lookups that had to filter and group
    pub misses: AtomicU64,
}

/// The `view_cache` block of `/status`.
#[derive(Debug, Clone, Serialize)]
pub struct ViewCacheSnapshot {
    /// Maximum resident views before LRU eviction
    pub capacity: usize,
    /// Views resident now, stale generations included until evicted
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// LRU of grouped views shared by every endpoint request.
pub struct ViewCache {
    entries: Mutex<LruCache<ViewKey, Arc<GroupedView>>>,
    pub stats: ViewCacheStats,
}

impl ViewCache {
    /// A capacity of zero falls back to the default of 256.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY);
        info!(capacity = capacity.get(), "View cache ready");
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            stats: ViewCacheStats {
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
            },
        }
    }

    /// Grouped view for `(view, query)` over `catalog`, computed at most once
    /// per catalog generation while the entry stays resident.
    pub fn get_or_compute(
        &self,
        catalog: &Catalog,
        view: ListingView,
        query: &FilterQuery,
    ) -> Arc<GroupedView> {
        let key = ViewKey {
            generation: catalog.generation(),
            view,
            query: query.clone(),
        };

        if let Some(hit) = self.entries.lock().get(&key) {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(hit);
        }

        // Computed outside the lock. Racing misses both compute; last put wins.
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        let grouped = Arc::new(catalog.view(view, query));
        debug!(
            generation = key.generation,
            view = %view,
            countries = grouped.len(),
            "View cache miss"
        );
        self.entries.lock().put(key, Arc::clone(&grouped));
        grouped
    }

    /// Drop every resident view. Counters are kept.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn snapshot(&self) -> ViewCacheSnapshot {
        let entries = self.entries.lock();
        ViewCacheSnapshot {
            capacity: entries.cap().get(),
            entries: entries.len(),
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for ViewCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY.get())
    }
}
