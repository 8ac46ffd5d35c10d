//! Fetch-layer cache for matrix pages.
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::debug;
use viewgrid_types::MatrixResponse;

use crate::query_key::MatrixQueryKey;

/// Cache key for one fetched page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatrixCacheKey {
    pub query: MatrixQueryKey,
    pub offset: u32,
    pub limit: u32,
    pub include_historical: bool,
    /// Bumped by [`MatrixCache::invalidate`]; results of older generations are stale.
    pub generation: u64,
}

pub const DEFAULT_CACHE_PAGES: usize = 16;

/// Pages of the current generation, oldest first. Holds at most `capacity` entries.
#[derive(Debug)]
pub struct MatrixCache {
    generation: u64,
    capacity: usize,
    entries: IndexMap<MatrixCacheKey, Arc<MatrixResponse>>,
}

impl Default for MatrixCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_PAGES)
    }
}

impl MatrixCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            generation: 0,
            capacity: capacity.max(1),
            entries: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn key_for(
        &self,
        query: MatrixQueryKey,
        offset: u32,
        limit: u32,
        include_historical: bool,
    ) -> MatrixCacheKey {
        MatrixCacheKey {
            query,
            offset,
            limit,
            include_historical,
            generation: self.generation,
        }
    }

    #[must_use]
    pub fn get(&self, key: &MatrixCacheKey) -> Option<Arc<MatrixResponse>> {
        self.entries.get(key).cloned()
    }

    /// Stores a response as the newest entry, evicting the oldest ones beyond capacity.
    /// Responses for an outdated generation are dropped.
    pub fn insert(&mut self, key: MatrixCacheKey, response: Arc<MatrixResponse>) -> bool {
        if key.generation != self.generation {
            debug!(
                stale = key.generation,
                current = self.generation,
                "dropping matrix response from an older generation"
            );
            return false;
        }
        self.entries.shift_remove(&key);
        self.entries.insert(key, response);
        while self.entries.len() > self.capacity {
            if let Some((evicted, _)) = self.entries.shift_remove_index(0) {
                debug!(offset = evicted.offset, "evicting cached matrix page");
            }
        }
        true
    }

    /// Forgets every cached page, e.g. after the as-of date changed.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
