//! Fixed-capacity in-memory cache with least-recently-used eviction.

use super::types::CacheStats;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::num::NonZeroUsize;

#[derive(Debug)]
struct Slot<V> {
    value: V,
    last_used: u64,
}

/// Bounded key/value cache.
///
/// Not synchronized; callers share it behind a lock. `get` updates recency,
/// so it needs `&mut self`.
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    capacity: NonZeroUsize,
    entries: HashMap<K, Slot<V>>,
    /// Access tick -> key, oldest first.
    recency: BTreeMap<u64, K>,
    tick: u64,
    stats: CacheStats,
}

impl<K: Eq + Hash + Clone, V: Clone> BoundedCache<K, V> {
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            tick: 0,
            stats: CacheStats::default(),
        }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        let tick = self.next_tick();
        match self.entries.get_mut(key) {
            Some(slot) => {
                self.recency.remove(&slot.last_used);
                slot.last_used = tick;
                self.recency.insert(tick, key.clone());
                self.stats.total_hits += 1;
                Some(slot.value.clone())
            }
            None => {
                self.stats.total_misses += 1;
                None
            }
        }
    }

    /// Inserts or replaces `key`, evicting the least-recently-used entry when full.
    pub fn set(&mut self, key: K, value: V) {
        let tick = self.next_tick();
        if let Some(slot) = self.entries.get_mut(&key) {
            self.recency.remove(&slot.last_used);
            slot.value = value;
            slot.last_used = tick;
            self.recency.insert(tick, key);
            return;
        }

        if self.entries.len() >= self.capacity.get() {
            self.evict_oldest();
        }
        self.recency.insert(tick, key.clone());
        self.entries.insert(
            key,
            Slot {
                value,
                last_used: tick,
            },
        );
    }

    pub fn current_size(&self) -> usize {
        self.entries.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            cache_size: self.entries.len(),
            ..self.stats.clone()
        }
    }

    fn evict_oldest(&mut self) {
        if let Some((_, key)) = self.recency.pop_first() {
            self.entries.remove(&key);
            self.stats.total_evictions += 1;
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}
