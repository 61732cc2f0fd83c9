//! Time-to-live memoization for expensive collaborator calls.
//!
//! The cache is owned by the presentation layer and injected where needed;
//! the engine never sees it. Time comes from a [`Clock`] so expiry can be
//! driven deterministically in tests.

use super::provider::{DataError, HistoryRequest, PriceProvider};
use crate::domain::PriceSeries;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Monotonic time source.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// Key/value cache whose entries expire `ttl` after insertion.
#[derive(Debug)]
pub struct TtlCache<K, V, C = SystemClock> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    ttl: Duration,
    clock: C,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V, SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<K: Eq + Hash, V: Clone, C: Clock> TtlCache<K, V, C> {
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_fresh(&self, entry: &Entry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted_at) < self.ttl
    }

    /// Fresh value for `key`, if any. Expired entries are evicted on read.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if self.is_fresh(entry, now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Whether a fresh entry exists for `key`. Does not evict.
    pub fn contains(&self, key: &K) -> bool {
        let now = self.clock.now();
        self.lock()
            .get(key)
            .is_some_and(|entry| self.is_fresh(entry, now))
    }

    pub fn insert(&self, key: K, value: V) {
        let inserted_at = self.clock.now();
        self.lock().insert(key, Entry { value, inserted_at });
    }

    /// Cached value, or compute and cache it. Errors are returned uncached.
    ///
    /// The lock is not held while `compute` runs.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| now.saturating_duration_since(entry.inserted_at) < self.ttl);
        before - entries.len()
    }

    /// Entry count, including entries that expired but were not yet evicted.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Memoizes successful fetches of an inner provider per (symbol, request).
pub struct CachedProvider<P, C: Clock = SystemClock> {
    inner: P,
    cache: TtlCache<(String, HistoryRequest), PriceSeries, C>,
}

impl<P: PriceProvider> CachedProvider<P, SystemClock> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self::with_cache(inner, TtlCache::new(ttl))
    }
}

impl<P: PriceProvider, C: Clock> CachedProvider<P, C> {
    pub fn with_cache(inner: P, cache: TtlCache<(String, HistoryRequest), PriceSeries, C>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &TtlCache<(String, HistoryRequest), PriceSeries, C> {
        &self.cache
    }
}

impl<P: PriceProvider, C: Clock> PriceProvider for CachedProvider<P, C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch(&self, symbol: &str, request: &HistoryRequest) -> Result<PriceSeries, DataError> {
        let mut hit = true;
        let result = self
            .cache
            .get_or_try_insert_with((symbol.to_string(), *request), || {
                hit = false;
                self.inner.fetch(symbol, request)
            });
        if hit {
            debug!(symbol, request = %request, "price cache hit");
        }
        result
    }

    fn is_cached(&self, symbol: &str, request: &HistoryRequest) -> bool {
        self.cache.contains(&(symbol.to_string(), *request))
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn entries_expire_after_ttl() {
        let clock = ManualClock::new();
        let cache: TtlCache<&str, u32, _> = TtlCache::with_clock(Duration::from_secs(60), clock.clone());
        cache.insert("a", 1);
        clock.advance(Duration::from_secs(59));
        assert_eq!(cache.get(&"a"), Some(1));
        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get(&"a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn get_or_try_insert_computes_once_while_fresh() {
        let cache: TtlCache<u8, String, _> =
            TtlCache::with_clock(Duration::from_secs(10), ManualClock::new());
        let calls = Cell::new(0);
        let compute = || -> Result<String, ()> {
            calls.set(calls.get() + 1);
            Ok("v".into())
        };
        assert_eq!(cache.get_or_try_insert_with(1, compute).unwrap(), "v");
        assert_eq!(cache.get_or_try_insert_with(1, compute).unwrap(), "v");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn errors_are_not_cached() {
        let cache: TtlCache<u8, u8, _> = TtlCache::with_clock(Duration::from_secs(10), ManualClock::new());
        let err: Result<u8, &str> = cache.get_or_try_insert_with(1, || Err("boom"));
        assert!(err.is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.get_or_try_insert_with(1, || Ok::<_, &str>(7)), Ok(7));
    }

    #[test]
    fn purge_drops_only_expired() {
        let clock = ManualClock::new();
        let cache: TtlCache<u8, u8, _> = TtlCache::with_clock(Duration::from_secs(10), clock.clone());
        cache.insert(1, 1);
        clock.advance(Duration::from_secs(6));
        cache.insert(2, 2);
        clock.advance(Duration::from_secs(6));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.get(&2), Some(2));
    }

    #[test]
    fn contains_tracks_freshness_without_evicting() {
        let clock = ManualClock::new();
        let cache: TtlCache<u8, u8, _> = TtlCache::with_clock(Duration::from_secs(10), clock.clone());
        assert!(!cache.contains(&1));
        cache.insert(1, 1);
        assert!(cache.contains(&1));
        clock.advance(Duration::from_secs(10));
        assert!(!cache.contains(&1));
        assert_eq!(cache.len(), 1);
    }
}
