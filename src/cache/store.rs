//! Read-through pagination cache with tag invalidation.
//!
//! Entries are serialized listing pages keyed by [`CacheKey`] and filed under
//! one or more [`CacheTag`]s. Each tag carries a generation counter that is
//! bumped on invalidation; a computation that started under an older
//! generation never gets stored, so a page read before a write cannot
//! resurface after the write's invalidation.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Mutex;
use std::time::Instant;

use bytes::Bytes;
use lru::LruCache;
use metrics::{counter, gauge, histogram};
use tracing::{debug, info};

use super::config::CacheConfig;
use super::flight::FlightGroup;
use super::keys::{CacheKey, CacheTag};
use super::lock::mutex_lock;

const SOURCE: &str = "cache::store";

const METRIC_CACHE_HIT: &str = "bookapi_cache_hit_total";
const METRIC_CACHE_MISS: &str = "bookapi_cache_miss_total";
const METRIC_CACHE_EVICT: &str = "bookapi_cache_evict_total";
const METRIC_CACHE_INVALIDATED: &str = "bookapi_cache_invalidated_total";
const METRIC_CACHE_STALE_FILL: &str = "bookapi_cache_stale_fill_total";
const METRIC_CACHE_COMPUTE_MS: &str = "bookapi_cache_compute_ms";
const METRIC_CACHE_ENTRIES: &str = "bookapi_cache_entries";

struct CacheEntry {
    payload: Bytes,
    tags: Vec<CacheTag>,
    stored_at: Instant,
}

/// Tag generations observed before a computation started.
struct Fence(Vec<(CacheTag, u64)>);

struct CacheInner {
    entries: LruCache<CacheKey, CacheEntry>,
    by_tag: HashMap<CacheTag, HashSet<CacheKey>>,
    generations: HashMap<CacheTag, u64>,
}

impl CacheInner {
    fn fence(&self, tags: &[CacheTag]) -> Fence {
        Fence(
            tags.iter()
                .map(|tag| (*tag, self.generations.get(tag).copied().unwrap_or(0)))
                .collect(),
        )
    }

    fn is_current(&self, fence: &Fence) -> bool {
        fence
            .0
            .iter()
            .all(|(tag, seen)| self.generations.get(tag).copied().unwrap_or(0) == *seen)
    }

    fn unindex(&mut self, key: &CacheKey, tags: &[CacheTag]) {
        for tag in tags {
            if let Some(keys) = self.by_tag.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.by_tag.remove(tag);
                }
            }
        }
    }

    fn remove(&mut self, key: &CacheKey) -> bool {
        match self.entries.pop(key) {
            Some(entry) => {
                self.unindex(key, &entry.tags);
                true
            }
            None => false,
        }
    }

    /// Store an entry, returning how many other entries were evicted for room.
    fn insert(&mut self, key: CacheKey, entry: CacheEntry) -> usize {
        self.remove(&key);

        for tag in &entry.tags {
            self.by_tag.entry(*tag).or_default().insert(key.clone());
        }

        match self.entries.push(key, entry) {
            Some((evicted_key, evicted)) => {
                self.unindex(&evicted_key, &evicted.tags);
                1
            }
            None => 0,
        }
    }

    /// Drop every entry filed under `tag` and advance the tag's generation.
    fn invalidate(&mut self, tag: CacheTag) -> usize {
        *self.generations.entry(tag).or_insert(0) += 1;

        let Some(keys) = self.by_tag.remove(&tag) else {
            return 0;
        };

        keys.iter().filter(|key| self.remove(key)).count()
    }
}

/// Shared pagination cache used by the resource services.
pub struct PaginationCache {
    config: CacheConfig,
    inner: Mutex<CacheInner>,
    flights: FlightGroup,
}

impl PaginationCache {
    pub fn new(config: CacheConfig) -> Self {
        let inner = CacheInner {
            entries: LruCache::new(config.capacity_non_zero()),
            by_tag: HashMap::new(),
            generations: HashMap::new(),
        };

        Self {
            config,
            inner: Mutex::new(inner),
            flights: FlightGroup::new(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Return the cached payload for `key`, or run `compute`, store its result
    /// under `tags` and return it.
    ///
    /// A failed computation is returned as-is and leaves no entry behind. With
    /// the cache disabled this is a plain call to `compute`.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &CacheKey,
        tags: &[CacheTag],
        compute: F,
    ) -> Result<Bytes, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, E>>,
    {
        if !self.config.enabled {
            return compute().await;
        }

        if let Some(payload) = self.lookup(key) {
            return Ok(payload);
        }

        let _flight = if self.config.single_flight {
            let flight = self.flights.enter(key).await;
            // The previous holder may have filled the entry while we waited.
            if let Some(payload) = self.lookup(key) {
                return Ok(payload);
            }
            Some(flight)
        } else {
            None
        };

        counter!(METRIC_CACHE_MISS).increment(1);
        debug!(cache_key = %key, outcome = "miss", "pagination cache lookup");

        let fence = mutex_lock(&self.inner, SOURCE, "fence").fence(tags);
        let started_at = Instant::now();
        let payload = compute().await?;
        histogram!(METRIC_CACHE_COMPUTE_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        self.fill(key, tags, &fence, payload.clone());
        Ok(payload)
    }

    /// Remove every entry carrying any of `tags`. Returns the number removed.
    pub fn invalidate_tags(&self, tags: &[CacheTag]) -> usize {
        let mut inner = mutex_lock(&self.inner, SOURCE, "invalidate_tags");
        let mut removed = 0;
        for tag in tags {
            let count = inner.invalidate(*tag);
            counter!(METRIC_CACHE_INVALIDATED, "tag" => tag.as_str()).increment(count as u64);
            info!(tag = %tag, removed = count, "pagination cache invalidated");
            removed += count;
        }
        gauge!(METRIC_CACHE_ENTRIES).set(inner.entries.len() as f64);
        removed
    }

    /// Peek at a stored payload without computing.
    pub fn get(&self, key: &CacheKey) -> Option<Bytes> {
        let mut inner = mutex_lock(&self.inner, SOURCE, "get");
        self.live_payload(&mut inner, key)
    }

    /// Number of entries currently filed under `tag`.
    pub fn tagged(&self, tag: CacheTag) -> usize {
        mutex_lock(&self.inner, SOURCE, "tagged")
            .by_tag
            .get(&tag)
            .map_or(0, HashSet::len)
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.inner, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &CacheKey) -> Option<Bytes> {
        let mut inner = mutex_lock(&self.inner, SOURCE, "lookup");
        let payload = self.live_payload(&mut inner, key)?;
        counter!(METRIC_CACHE_HIT).increment(1);
        debug!(cache_key = %key, outcome = "hit", "pagination cache lookup");
        Some(payload)
    }

    fn live_payload(&self, inner: &mut CacheInner, key: &CacheKey) -> Option<Bytes> {
        let expired = match (inner.entries.get(key), self.config.ttl) {
            (None, _) => return None,
            (Some(entry), Some(ttl)) => entry.stored_at.elapsed() >= ttl,
            (Some(_), None) => false,
        };

        if expired {
            inner.remove(key);
            return None;
        }

        inner.entries.get(key).map(|entry| entry.payload.clone())
    }

    fn fill(&self, key: &CacheKey, tags: &[CacheTag], fence: &Fence, payload: Bytes) {
        let mut inner = mutex_lock(&self.inner, SOURCE, "fill");

        if !inner.is_current(fence) {
            counter!(METRIC_CACHE_STALE_FILL).increment(1);
            debug!(cache_key = %key, "discarding page computed before invalidation");
            return;
        }

        let entry = CacheEntry {
            payload,
            tags: tags.to_vec(),
            stored_at: Instant::now(),
        };
        let evicted = inner.insert(key.clone(), entry);
        if evicted > 0 {
            counter!(METRIC_CACHE_EVICT).increment(evicted as u64);
        }
        gauge!(METRIC_CACHE_ENTRIES).set(inner.entries.len() as f64);
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::*;
    use crate::cache::keys::ListingOperation;

    fn authors_key(page: u32) -> CacheKey {
        CacheKey::listing(ListingOperation::AllAuthors, page, 3)
    }

    fn books_key(page: u32) -> CacheKey {
        CacheKey::listing(ListingOperation::BookList, page, 3)
    }

    async fn fill(cache: &PaginationCache, key: &CacheKey, tag: CacheTag, body: &'static str) {
        let payload = cache
            .get_or_compute(key, &[tag], || async {
                Ok::<_, Infallible>(Bytes::from_static(body.as_bytes()))
            })
            .await
            .expect("infallible");
        assert_eq!(payload, body.as_bytes());
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let cache = PaginationCache::new(CacheConfig::default());
        let calls = AtomicUsize::new(0);
        let key = authors_key(1);

        for _ in 0..3 {
            let payload = cache
                .get_or_compute(&key, &[CacheTag::Authors], || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Infallible>(Bytes::from_static(b"[]"))
                })
                .await
                .expect("infallible");
            assert_eq!(payload, Bytes::from_static(b"[]"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn failed_computation_is_not_cached() {
        let cache = PaginationCache::new(CacheConfig::default());
        let key = books_key(1);

        let result = cache
            .get_or_compute(&key, &[CacheTag::Books], || async { Err::<Bytes, _>("db down") })
            .await;
        assert_eq!(result, Err("db down"));
        assert!(cache.get(&key).is_none());

        fill(&cache, &key, CacheTag::Books, "recovered").await;
        assert_eq!(cache.get(&key), Some(Bytes::from_static(b"recovered")));
    }

    #[tokio::test]
    async fn invalidation_is_scoped_to_its_tag() {
        let cache = PaginationCache::new(CacheConfig::default());
        fill(&cache, &authors_key(1), CacheTag::Authors, "a1").await;
        fill(&cache, &authors_key(2), CacheTag::Authors, "a2").await;
        fill(&cache, &books_key(1), CacheTag::Books, "b1").await;

        assert_eq!(cache.invalidate_tags(&[CacheTag::Books]), 1);

        assert!(cache.get(&books_key(1)).is_none());
        assert!(cache.get(&authors_key(1)).is_some());
        assert!(cache.get(&authors_key(2)).is_some());
        assert_eq!(cache.tagged(CacheTag::Books), 0);
        assert_eq!(cache.tagged(CacheTag::Authors), 2);
    }

    #[tokio::test]
    async fn invalidating_twice_equals_once() {
        let cache = PaginationCache::new(CacheConfig::default());
        fill(&cache, &authors_key(1), CacheTag::Authors, "a1").await;

        assert_eq!(cache.invalidate_tags(&[CacheTag::Authors]), 1);
        assert_eq!(cache.invalidate_tags(&[CacheTag::Authors]), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn invalidating_an_unused_tag_is_a_no_op() {
        let cache = PaginationCache::new(CacheConfig::default());
        assert_eq!(cache.invalidate_tags(&[CacheTag::Authors, CacheTag::Books]), 0);
    }

    #[tokio::test]
    async fn entry_with_several_tags_goes_with_any_of_them() {
        let cache = PaginationCache::new(CacheConfig::default());
        let key = books_key(1);
        cache
            .get_or_compute(&key, &[CacheTag::Books, CacheTag::Authors], || async {
                Ok::<_, Infallible>(Bytes::from_static(b"joined"))
            })
            .await
            .expect("infallible");

        assert_eq!(cache.invalidate_tags(&[CacheTag::Authors]), 1);
        assert!(cache.get(&key).is_none());
        assert_eq!(cache.tagged(CacheTag::Books), 0);
    }

    #[tokio::test]
    async fn page_computed_before_invalidation_is_not_stored() {
        let cache = Arc::new(PaginationCache::new(CacheConfig::default()));
        let key = books_key(1);
        let (started_tx, started_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let reader = tokio::spawn({
            let cache = Arc::clone(&cache);
            let key = key.clone();
            async move {
                cache
                    .get_or_compute(&key, &[CacheTag::Books], move || async move {
                        let _ = started_tx.send(());
                        let _ = release_rx.await;
                        Ok::<_, Infallible>(Bytes::from_static(b"before-write"))
                    })
                    .await
            }
        });

        started_rx.await.expect("reader should start computing");
        cache.invalidate_tags(&[CacheTag::Books]);
        release_tx.send(()).expect("reader should be waiting");

        let served = reader.await.expect("reader task").expect("infallible");
        assert_eq!(served, Bytes::from_static(b"before-write"));
        assert!(cache.get(&key).is_none());

        fill(&cache, &key, CacheTag::Books, "after-write").await;
        assert_eq!(cache.get(&key), Some(Bytes::from_static(b"after-write")));
    }

    #[tokio::test]
    async fn concurrent_misses_compute_once() {
        let cache = Arc::new(PaginationCache::new(CacheConfig::default()));
        let calls = Arc::new(AtomicUsize::new(0));
        let key = authors_key(1);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                let key = key.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_compute(&key, &[CacheTag::Authors], || async {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok::<_, Infallible>(Bytes::from_static(b"page"))
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            let payload = task.await.expect("task").expect("infallible");
            assert_eq!(payload, Bytes::from_static(b"page"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn evicted_entries_leave_the_tag_index() {
        let config = CacheConfig {
            capacity: 1,
            ..Default::default()
        };
        let cache = PaginationCache::new(config);
        fill(&cache, &authors_key(1), CacheTag::Authors, "a1").await;
        fill(&cache, &books_key(1), CacheTag::Books, "b1").await;

        assert!(cache.get(&authors_key(1)).is_none());
        assert_eq!(cache.tagged(CacheTag::Authors), 0);
        assert_eq!(cache.tagged(CacheTag::Books), 1);
    }

    #[tokio::test]
    async fn expired_entries_are_recomputed() {
        let config = CacheConfig {
            ttl: Some(Duration::from_millis(10)),
            ..Default::default()
        };
        let cache = PaginationCache::new(config);
        let key = authors_key(1);
        fill(&cache, &key, CacheTag::Authors, "old").await;

        tokio::time::sleep(Duration::from_millis(25)).await;

        assert!(cache.get(&key).is_none());
        assert_eq!(cache.tagged(CacheTag::Authors), 0);
        fill(&cache, &key, CacheTag::Authors, "new").await;
    }

    #[tokio::test]
    async fn disabled_cache_always_computes() {
        let config = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        let cache = PaginationCache::new(config);
        let calls = AtomicUsize::new(0);
        let key = books_key(1);

        for _ in 0..2 {
            cache
                .get_or_compute(&key, &[CacheTag::Books], || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Infallible>(Bytes::new())
                })
                .await
                .expect("infallible");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn store_recovers_from_poisoned_lock() {
        let cache = PaginationCache::new(CacheConfig::default());

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = cache.inner.lock().expect("cache lock should be acquired");
            panic!("poison cache lock");
        }));

        fill(&cache, &authors_key(1), CacheTag::Authors, "a1").await;
        assert_eq!(cache.invalidate_tags(&[CacheTag::Authors]), 1);
    }
}
