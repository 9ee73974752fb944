//! Per-owner cache of finished queue results using moka
//!
//! Each owner keeps at most one result: the most recent one. Entries expire
//! after sitting unread for the configured idle time, and the cache as a
//! whole is bounded.

use crate::config::ResultCacheConfig;
use crate::result::ModificationQueueResult;
use moka::notification::RemovalCause;
use moka::sync::Cache;
use rewind_core::Owner;
use std::sync::Arc;
use tracing::debug;

/// Bounded, idle-expiring map from owner to their last queue result
#[derive(Clone)]
pub struct ResultCache {
    cache: Cache<Owner, Arc<ModificationQueueResult>>,
}

impl ResultCache {
    /// Create a new result cache
    pub fn new(config: &ResultCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_idle(config.idle())
            .eviction_listener(
                |owner: Arc<Owner>, result: Arc<ModificationQueueResult>, cause: RemovalCause| {
                    debug!(
                        owner = %owner,
                        queue = %result.queue().id,
                        cause = ?cause,
                        "queue result evicted"
                    );
                },
            )
            .build();

        Self { cache }
    }

    /// Get the cached result for an owner, refreshing its idle timer
    pub fn get(&self, owner: &Owner) -> Option<Arc<ModificationQueueResult>> {
        self.cache.get(owner)
    }

    /// Store a result, replacing any previous one for the same owner
    pub fn insert(&self, owner: Owner, result: Arc<ModificationQueueResult>) {
        self.cache.insert(owner, result);
    }

    /// Remove and return the cached result for an owner
    pub fn remove(&self, owner: &Owner) -> Option<Arc<ModificationQueueResult>> {
        self.cache.remove(owner)
    }

    pub fn contains(&self, owner: &Owner) -> bool {
        self.cache.contains_key(owner)
    }

    /// Approximate number of cached results
    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}
