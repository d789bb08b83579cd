//! Bounded LRU cache
//!
//! Generic building block for the datastore's memory caches. Strict LRU
//! ordering is tracked with a logical clock per entry; eviction scans for
//! the minimum clock, which keeps the hot paths allocation-free and is
//! cheap at the cache sizes the datastore runs with.
//!
//! Beyond the entry cap the cache supports:
//! - a per-entry size cap: oversize values silently bypass the cache
//!   (and drop any stale entry under the same key),
//! - an optional time-to-idle window with an exemption predicate for
//!   keys that must stay resident,
//! - an optional eviction callback. Callbacks run under the cache lock
//!   and must not re-enter the cache.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

type Weigher<V> = Box<dyn Fn(&V) -> usize + Send + Sync>;
type ExemptFn<K> = Box<dyn Fn(&K) -> bool + Send + Sync>;
type EvictedFn<K, V> = Box<dyn Fn(&K, &V) + Send + Sync>;

struct Entry<V> {
    value: V,
    /// LRU position; larger is more recently used
    clock: u64,
    /// Last access time, for idle expiry
    touched: Instant,
}

struct LruState<K, V> {
    entries: HashMap<K, Entry<V>>,
    clock: u64,
    max_entries: usize,
    /// Per-entry byte cap; 0 disables the check
    max_item_bytes: usize,
    weigher: Option<Weigher<V>>,
    time_to_idle: Option<Duration>,
    exempt: Option<ExemptFn<K>>,
    evicted_fn: Option<EvictedFn<K, V>>,
}

impl<K, V> LruState<K, V>
where
    K: Eq + Hash + Clone,
{
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn is_expired(&self, key: &K, entry: &Entry<V>, now: Instant) -> bool {
        match self.time_to_idle {
            Some(window) => {
                now.duration_since(entry.touched) > window
                    && !self.exempt.as_ref().is_some_and(|exempt| exempt(key))
            }
            None => false,
        }
    }

    fn notify_evicted(&self, key: &K, value: &V) {
        if let Some(evicted_fn) = &self.evicted_fn {
            evicted_fn(key, value);
        }
    }

    /// Drop every idle-expired entry
    fn expire_idle(&mut self, now: Instant) {
        if self.time_to_idle.is_none() {
            return;
        }
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|(key, entry)| self.is_expired(key, entry, now))
            .map(|(key, _)| (*key).clone())
            .collect();
        for key in expired {
            if let Some(entry) = self.entries.remove(&key) {
                self.notify_evicted(&key, &entry.value);
            }
        }
    }

    /// Evict the least-recently-used entry
    fn evict_lru(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.clock)
            .map(|(key, _)| key.clone());
        if let Some(key) = victim {
            if let Some(entry) = self.entries.remove(&key) {
                self.notify_evicted(&key, &entry.value);
            }
        }
    }
}

/// Size- and count-bounded LRU cache
pub struct BoundedLru<K, V> {
    state: Mutex<LruState<K, V>>,
}

impl<K, V> BoundedLru<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache bounded by entry count only
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: Mutex::new(LruState {
                entries: HashMap::new(),
                clock: 0,
                max_entries,
                max_item_bytes: 0,
                weigher: None,
                time_to_idle: None,
                exempt: None,
                evicted_fn: None,
            }),
        }
    }

    /// Create a cache with a per-entry size cap. Values the weigher
    /// reports above `max_item_bytes` are not cached.
    pub fn with_item_cap(
        max_entries: usize,
        max_item_bytes: usize,
        weigher: impl Fn(&V) -> usize + Send + Sync + 'static,
    ) -> Self {
        let cache = Self::new(max_entries);
        {
            let mut state = cache.state.lock();
            state.max_item_bytes = max_item_bytes;
            state.weigher = Some(Box::new(weigher));
        }
        cache
    }

    /// Configure idle expiry: entries not touched within `window` are
    /// dropped on the next access or insertion unless exempted.
    pub fn set_time_to_idle(&self, window: Duration) {
        self.state.lock().time_to_idle = Some(window);
    }

    /// Install the expiry-exemption predicate
    pub fn set_exemption(&self, exempt: impl Fn(&K) -> bool + Send + Sync + 'static) {
        self.state.lock().exempt = Some(Box::new(exempt));
    }

    /// Install an eviction callback. The callback runs under the cache
    /// lock and must not call back into this cache.
    pub fn set_evicted_fn(&self, evicted_fn: impl Fn(&K, &V) + Send + Sync + 'static) {
        self.state.lock().evicted_fn = Some(Box::new(evicted_fn));
    }

    /// Look up a value, marking it most recently used
    pub fn get(&self, key: &K) -> Option<V> {
        let mut state = self.state.lock();
        let clock = state.tick();
        let now = Instant::now();

        let state = &mut *state;
        let expired = match state.entries.get(key) {
            None => return None,
            Some(entry) => state.is_expired(key, entry, now),
        };
        if expired {
            if let Some(entry) = state.entries.remove(key) {
                state.notify_evicted(key, &entry.value);
            }
            return None;
        }

        let entry = state.entries.get_mut(key)?;
        entry.clock = clock;
        entry.touched = now;
        Some(entry.value.clone())
    }

    /// Insert or replace a value at the most-recently-used position
    pub fn insert(&self, key: K, value: V) {
        let mut state = self.state.lock();
        let clock = state.tick();
        let now = Instant::now();

        let state = &mut *state;
        if state.max_item_bytes > 0 {
            if let Some(weigher) = &state.weigher {
                if weigher(&value) > state.max_item_bytes {
                    // Oversize values pass through uncached. Any stale
                    // entry under the key must go so readers fall back
                    // to the ground truth.
                    state.entries.remove(&key);
                    return;
                }
            }
        }

        if state.max_entries == 0 {
            // Zero capacity retains nothing; a stale entry under the key
            // must not stay visible either.
            state.entries.remove(&key);
            return;
        }

        if !state.entries.contains_key(&key) {
            state.expire_idle(now);
            while state.entries.len() >= state.max_entries {
                state.evict_lru();
            }
        }

        state.entries.insert(
            key,
            Entry {
                value,
                clock,
                touched: now,
            },
        );
    }

    /// Remove an entry, returning its value
    pub fn remove(&self, key: &K) -> Option<V> {
        self.state.lock().entries.remove(key).map(|entry| entry.value)
    }

    /// Remove an entry only when the predicate holds for its value
    pub fn remove_if(&self, key: &K, pred: impl FnOnce(&V) -> bool) -> bool {
        let mut state = self.state.lock();
        if state.entries.get(key).is_some_and(|entry| pred(&entry.value)) {
            state.entries.remove(key);
            true
        } else {
            false
        }
    }

    /// Mutate a resident value in place, marking it most recently used.
    /// Returns false when the key is absent.
    pub fn update(&self, key: &K, mutate: impl FnOnce(&mut V)) -> bool {
        let mut state = self.state.lock();
        let clock = state.tick();
        match state.entries.get_mut(key) {
            Some(entry) => {
                entry.clock = clock;
                entry.touched = Instant::now();
                mutate(&mut entry.value);
                true
            }
            None => false,
        }
    }

    /// Touch an entry without cloning its value. Returns presence.
    pub fn touch(&self, key: &K) -> bool {
        let mut state = self.state.lock();
        let clock = state.tick();
        match state.entries.get_mut(key) {
            Some(entry) => {
                entry.clock = clock;
                entry.touched = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Drop all entries
    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    /// Current number of resident entries
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the resident keys, in no particular order
    pub fn keys(&self) -> Vec<K> {
        self.state.lock().entries.keys().cloned().collect()
    }
}
