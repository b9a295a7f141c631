//! Core data types for prediction caching.

use serde::Serialize;
use verdict_abstraction::{CacheKey, ModelId};

/// Key of a memory cache entry: the model and the item's canonical key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoryKey {
    pub model_id: ModelId,
    pub key: CacheKey,
}

impl MemoryKey {
    pub fn new(model_id: &ModelId, key: &CacheKey) -> Self {
        Self {
            model_id: model_id.clone(),
            key: key.clone(),
        }
    }
}

/// Cache statistics for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Total number of cache hits.
    pub total_hits: u64,
    /// Total number of cache misses.
    pub total_misses: u64,
    /// Total number of entries evicted to make room.
    pub total_evictions: u64,
    /// Current number of entries in the cache.
    pub cache_size: usize,
}
