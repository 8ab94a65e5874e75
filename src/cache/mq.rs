//! Multi-queue (MQ) cache implementation for index page caching.
//!
//! The cache keeps a configurable number of FIFO queues, each managed as an
//! LRU. In addition to recency, every entry carries a lifetime access count.
//! An entry's queue is `log2(access_count)`, capped at the highest queue, so
//! frequently read items climb to higher queues while one-shot items stay
//! near the bottom. Entries migrate down a level when their queue is over
//! capacity or when they have not been touched within `life_time` logical
//! ticks. An entry demoted out of queue 0 is evicted.
//!
//! Evicted keys are remembered in a bounded ghost history together with
//! their access counts. Reinserting a remembered key places it directly in
//! the queue its old frequency earned, instead of starting at the bottom.

use crate::error::Result;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Default entry life time, in logical ticks.
pub const DEFAULT_LIFE_TIME: u64 = 32;

/// Default number of queues.
pub const DEFAULT_QUEUE_COUNT: usize = 8;

/// Callback invoked with the key and value of every entry evicted from the
/// cache proper. An error returned here propagates out of [`MqCache::put`].
pub type EvictCallback<K, V> = Box<dyn FnMut(K, V) -> Result<()>>;

/// Statistics for cache performance monitoring.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries evicted from the cache proper.
    pub evictions: u64,
    /// Number of insertions that recovered an access count from the ghost
    /// history.
    pub history_hits: u64,
    /// Number of insertions with no ghost history record.
    pub history_misses: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Access bookkeeping kept for a cached entry and preserved in the ghost
/// history after eviction.
#[derive(Debug, Clone, Copy)]
struct AccessInfo {
    access_count: u64,
    expire_time: u64,
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    level: usize,
    info: AccessInfo,
}

/// Multi-queue cache with frequency-aware promotion and a ghost history.
///
/// All state is owned by the instance; the logical clock advances on every
/// [`get`](MqCache::get). The cache is not thread-safe. Total capacity is
/// distributed evenly across the queues, so each queue holds at most
/// `capacity / queue_count` entries at quiescent times.
pub struct MqCache<K, V> {
    current_time: u64,
    per_queue_capacity: u64,
    life_time: u64,
    queue_count: usize,

    cache: HashMap<K, CacheEntry<V>>,
    /// One FIFO queue of keys per level, oldest at the front.
    queues: Vec<VecDeque<K>>,

    history: HashMap<K, AccessInfo>,
    history_queue: VecDeque<K>,

    on_evict: Option<EvictCallback<K, V>>,

    stats: CacheStats,
}

impl<K, V> MqCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache with the given total capacity and the default life
    /// time and queue count.
    pub fn new(capacity: u64) -> Self {
        Self::with_params(capacity, DEFAULT_LIFE_TIME, DEFAULT_QUEUE_COUNT)
    }

    /// Create a cache with explicit capacity, life time, and queue count.
    ///
    /// # Panics
    ///
    /// Panics if `queue_count` is zero.
    pub fn with_params(capacity: u64, life_time: u64, queue_count: usize) -> Self {
        assert!(queue_count > 0, "queue_count must be at least 1");

        Self {
            current_time: 0,
            per_queue_capacity: capacity / queue_count as u64,
            life_time,
            queue_count,
            cache: HashMap::new(),
            queues: (0..queue_count).map(|_| VecDeque::new()).collect(),
            history: HashMap::new(),
            history_queue: VecDeque::new(),
            on_evict: None,
            stats: CacheStats::default(),
        }
    }

    /// Sets the eviction handler.
    pub fn set_on_evict(&mut self, on_evict: EvictCallback<K, V>) {
        self.on_evict = Some(on_evict);
    }

    /// Look up `key`, returning a clone of its value on a hit.
    ///
    /// Advances the logical clock, refreshes the entry's expiry, and bumps
    /// its access count. If the new count earns a higher queue the entry is
    /// promoted immediately; promotion is monotonic and never moves an
    /// entry down.
    pub fn get(&mut self, key: &K) -> Option<V> {
        self.current_time += 1;

        let (value, promotion) = match self.cache.get_mut(key) {
            Some(entry) => {
                entry.info.expire_time = self.current_time + self.life_time;
                entry.info.access_count += 1;

                let requested = level_for(entry.info.access_count, self.queue_count);
                let promotion = if requested > entry.level {
                    let from = entry.level;
                    entry.level = requested;
                    Some((from, requested))
                } else {
                    None
                };
                (entry.value.clone(), promotion)
            }
            None => {
                self.stats.misses += 1;
                return None;
            }
        };

        if let Some((from, to)) = promotion {
            if let Some(pos) = self.queues[from].iter().position(|k| k == key) {
                self.queues[from].remove(pos);
            }
            self.queues[to].push_back(key.clone());
        }

        self.stats.hits += 1;
        Some(value)
    }

    /// Store `value` under `key`.
    ///
    /// A key remembered in the ghost history re-enters at the queue its old
    /// access count earned; a fresh key starts at queue 0. The insertion is
    /// followed by a demotion sweep, which may evict an entry and run the
    /// eviction handler. Handler errors propagate to the caller.
    pub fn put(&mut self, key: K, value: V) -> Result<()> {
        let access_count = match self.history.remove(&key) {
            Some(info) => {
                if let Some(pos) = self.history_queue.iter().position(|k| *k == key) {
                    self.history_queue.remove(pos);
                }
                self.stats.history_hits += 1;
                info.access_count
            }
            None => {
                self.stats.history_misses += 1;
                1
            }
        };

        // A re-put of a cached key must not leave a stale slot in its old
        // queue behind.
        if let Some(old) = self.cache.get(&key) {
            let level = old.level;
            if let Some(pos) = self.queues[level].iter().position(|k| *k == key) {
                self.queues[level].remove(pos);
            }
        }

        let level = level_for(access_count, self.queue_count);
        self.queues[level].push_back(key.clone());
        self.cache.insert(
            key,
            CacheEntry {
                value,
                level,
                info: AccessInfo {
                    access_count,
                    expire_time: self.current_time + self.life_time,
                },
            },
        );

        self.check_for_demotion()
    }

    /// Checks the queue levels to see if an entry needs to demote a level,
    /// or to be evicted from the cache. Called only from `put`.
    ///
    /// Each queue is visited once, top level first, and contributes at most
    /// one candidate: its front (oldest) key. The front moves down a level
    /// when the queue is over capacity or the entry has expired. A key
    /// pushed out of queue 0 is evicted, recorded in the ghost history, and
    /// handed to the eviction handler.
    fn check_for_demotion(&mut self) -> Result<()> {
        for level in (0..self.queue_count).rev() {
            let demote = match self.queues[level].front() {
                Some(front) => {
                    self.queues[level].len() as u64 > self.per_queue_capacity
                        || self
                            .cache
                            .get(front)
                            .map(|e| e.info.expire_time < self.current_time)
                            .unwrap_or(false)
                }
                None => false,
            };
            if !demote {
                continue;
            }

            let key = match self.queues[level].pop_front() {
                Some(key) => key,
                None => continue,
            };

            if level > 0 {
                self.queues[level - 1].push_back(key.clone());
                if let Some(entry) = self.cache.get_mut(&key) {
                    entry.level = level - 1;
                }
            } else if let Some(entry) = self.cache.remove(&key) {
                self.stats.evictions += 1;

                // Save the access count for this key. If it is loaded again
                // before the history fills up, it can be promoted straight
                // into the right level.
                self.history.insert(key.clone(), entry.info);
                self.history_queue.push_back(key.clone());
                if self.history.len() as u64 > self.per_queue_capacity * 2 {
                    if let Some(oldest) = self.history_queue.pop_front() {
                        self.history.remove(&oldest);
                    }
                }

                if let Some(on_evict) = self.on_evict.as_mut() {
                    on_evict(key, entry.value)?;
                }
            }
        }

        Ok(())
    }

    /// Iterate over the cached key/value pairs, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.cache.iter().map(|(key, entry)| (key, &entry.value))
    }

    /// Get current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    /// Get the number of entries in the cache.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    #[cfg(test)]
    fn level_of(&self, key: &K) -> Option<usize> {
        self.cache.get(key).map(|entry| entry.level)
    }

    #[cfg(test)]
    fn queue_len(&self, level: usize) -> usize {
        self.queues[level].len()
    }

    #[cfg(test)]
    fn queue_occurrences(&self, key: &K) -> usize {
        self.queues
            .iter()
            .map(|q| q.iter().filter(|k| *k == key).count())
            .sum()
    }

    #[cfg(test)]
    fn history_len(&self) -> usize {
        self.history.len()
    }
}

/// Queue level earned by an access count: `log2(count)` capped at the top
/// queue. `count` is always at least 1.
fn level_for(access_count: u64, queue_count: usize) -> usize {
    (access_count.ilog2() as usize).min(queue_count - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(1, 8), 0);
        assert_eq!(level_for(2, 8), 1);
        assert_eq!(level_for(3, 8), 1);
        assert_eq!(level_for(4, 8), 2);
        assert_eq!(level_for(8, 8), 3);
        assert_eq!(level_for(1 << 20, 8), 7);
    }

    #[test]
    fn test_basic_hit() {
        let mut cache: MqCache<i32, i32> = MqCache::new(1024);
        cache.put(1, 10).unwrap();

        assert_eq!(cache.get(&1), Some(10));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 0);
    }

    #[test]
    fn test_miss_on_empty() {
        let mut cache: MqCache<i32, i32> = MqCache::new(1024);
        assert_eq!(cache.get(&42), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_repeated_hits_reach_top_level() {
        let mut cache: MqCache<i32, i32> = MqCache::new(1024);
        cache.put(1, 10).unwrap();

        for _ in 0..1025 {
            assert_eq!(cache.get(&1), Some(10));
        }

        assert_eq!(cache.stats().hits, 1025);
        assert_eq!(cache.level_of(&1), Some(DEFAULT_QUEUE_COUNT - 1));
        assert_eq!(cache.queue_occurrences(&1), 1);
    }

    #[test]
    fn test_eviction_under_overload() {
        // Capacity 1024 over 8 queues leaves 128 slots per queue. Fresh
        // puts all land in queue 0, so only the last 128 keys survive.
        let mut cache: MqCache<u64, u64> = MqCache::new(1024);
        for i in 0..100_000u64 {
            cache.put(i, i * 100).unwrap();
        }

        assert_eq!(cache.len(), 128);

        for i in 0..99_872u64 {
            assert_eq!(cache.get(&i), None);
        }
        for i in 99_872..100_000u64 {
            assert_eq!(cache.get(&i), Some(i * 100));
        }

        let stats = cache.stats();
        assert_eq!(stats.hits, 128);
        assert_eq!(stats.misses, 99_872);
        assert_eq!(stats.evictions, 100_000 - 128);
    }

    #[test]
    fn test_promotion_through_levels() {
        // A long life time keeps expiry out of the picture.
        let mut cache: MqCache<u64, u64> = MqCache::with_params(1024, 1_000_000, 8);
        for i in 0..64u64 {
            cache.put(i, i << 16).unwrap();
        }

        // One hit apiece moves every key to the second level.
        for i in 0..64u64 {
            assert_eq!(cache.get(&i), Some(i << 16));
        }
        assert_eq!(cache.queue_len(1), 64);

        // Two more hits apiece move every key to the third level.
        for i in 0..64u64 {
            for _ in 0..2 {
                assert_eq!(cache.get(&i), Some(i << 16));
            }
        }
        assert_eq!(cache.queue_len(2), 64);

        // Fresh keys land in the bottom level.
        for i in 64..128u64 {
            cache.put(i, i << 16).unwrap();
        }
        assert_eq!(cache.queue_len(0), 64);
        assert_eq!(cache.queue_len(2), 64);
    }

    #[test]
    fn test_expiry_demotes_and_evicts() {
        let mut cache: MqCache<i32, i32> = MqCache::with_params(1024, 2, 8);
        cache.put(1, 10).unwrap();

        // Advance the clock past the entry's expiry with unrelated misses.
        for _ in 0..3 {
            assert_eq!(cache.get(&99), None);
        }

        // The next put sweeps queue 0 and pushes the expired key out.
        cache.put(2, 20).unwrap();
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some(20));
    }

    #[test]
    fn test_history_restores_access_count() {
        let mut cache: MqCache<i32, i32> = MqCache::with_params(1024, 2, 8);
        cache.put(1, 10).unwrap();

        // Three hits bring the access count to 4 and the level to 2.
        for _ in 0..3 {
            assert_eq!(cache.get(&1), Some(10));
        }
        assert_eq!(cache.level_of(&1), Some(2));

        // Let the entry expire, then cascade it down with a sweep. A single
        // sweep walks it all the way to queue 0 because it lands at the
        // front of each successive queue.
        for _ in 0..40 {
            cache.get(&99);
        }
        cache.put(2, 20).unwrap();
        assert_eq!(cache.level_of(&1), Some(0));

        // Promote the helper key out of queue 0 so the expired key is at
        // the front, then sweep again to evict it.
        assert_eq!(cache.get(&2), Some(20));
        cache.put(3, 30).unwrap();
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.get(&1), None);

        // Reinsertion recovers the old access count and the level it earns.
        cache.put(1, 11).unwrap();
        assert_eq!(cache.stats().history_hits, 1);
        assert_eq!(cache.level_of(&1), Some(2));
        assert_eq!(cache.get(&1), Some(11));
    }

    #[test]
    fn test_demotion_updates_level() {
        // Capacity 8 over 4 queues leaves 2 slots per queue.
        let mut cache: MqCache<i32, i32> = MqCache::with_params(8, 1_000_000, 4);
        for i in 0..3 {
            cache.put(i, i).unwrap();
            // One hit promotes each key to level 1.
            assert_eq!(cache.get(&i), Some(i));
        }
        assert_eq!(cache.queue_len(1), 3);

        // The next put sweeps the over-capacity queue 1 and demotes its
        // oldest key back to queue 0.
        cache.put(3, 3).unwrap();
        assert_eq!(cache.level_of(&0), Some(0));
        assert_eq!(cache.queue_occurrences(&0), 1);

        // A hit promotes the demoted key out of its recorded queue and
        // leaves no stale slot behind.
        assert_eq!(cache.get(&0), Some(0));
        assert_eq!(cache.level_of(&0), Some(1));
        assert_eq!(cache.queue_occurrences(&0), 1);
    }

    #[test]
    fn test_history_is_bounded() {
        // Capacity 16 over 8 queues leaves 2 per queue, and a history bound
        // of 4.
        let mut cache: MqCache<u64, u64> = MqCache::with_params(16, 32, 8);
        for i in 0..100u64 {
            cache.put(i, i).unwrap();
        }
        assert!(cache.history_len() <= 4);
    }

    #[test]
    fn test_evict_callback_receives_entries() {
        let evicted = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&evicted);

        let mut cache: MqCache<u64, u64> = MqCache::with_params(16, 32, 8);
        cache.set_on_evict(Box::new(move |key, value| {
            sink.borrow_mut().push((key, value));
            Ok(())
        }));

        for i in 0..10u64 {
            cache.put(i, i * 2).unwrap();
        }

        let evicted = evicted.borrow();
        assert_eq!(evicted.len() as u64, cache.stats().evictions);
        // Oldest keys go first.
        assert_eq!(evicted[0], (0, 0));
    }

    #[test]
    fn test_evict_callback_error_propagates() {
        let mut cache: MqCache<u64, u64> = MqCache::with_params(8, 32, 8);
        cache.set_on_evict(Box::new(|_key, _value| {
            Err(crate::Error::invalid_argument("sink full"))
        }));

        // Queue 0 holds one entry; the second put forces an eviction.
        cache.put(0, 0).unwrap();
        assert!(cache.put(1, 1).is_err());
    }

    #[test]
    fn test_counters_sum_to_lookups() {
        let mut cache: MqCache<i32, i32> = MqCache::new(64);
        for i in 0..32 {
            cache.put(i, i).unwrap();
        }
        for i in 0..64 {
            cache.get(&i);
        }
        let stats = cache.stats();
        assert_eq!(stats.hits + stats.misses, 64);
    }
}
