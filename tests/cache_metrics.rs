use std::collections::{HashMap, HashSet};
use std::convert::Infallible;

use bytes::Bytes;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use bookapi::cache::{CacheConfig, CacheKey, CacheTag, ListingOperation, PaginationCache};
use bookapi::infra::telemetry;

fn key(page: u32) -> CacheKey {
    CacheKey::listing(ListingOperation::AllAuthors, page, 3)
}

async fn fill(cache: &PaginationCache, page: u32) {
    cache
        .get_or_compute(&key(page), &[CacheTag::Authors], || async {
            Ok::<_, Infallible>(Bytes::from(format!("[{page}]")))
        })
        .await
        .expect("infallible");
}

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let cache = PaginationCache::new(CacheConfig {
        capacity: 1,
        ..Default::default()
    });

    // miss, hit, then a second key evicts the first
    fill(&cache, 1).await;
    fill(&cache, 1).await;
    fill(&cache, 2).await;

    // two entries removed across both calls
    assert_eq!(cache.invalidate_tags(&[CacheTag::Authors]), 1);
    fill(&cache, 3).await;
    assert_eq!(cache.invalidate_tags(&[CacheTag::Authors, CacheTag::Books]), 1);

    // a write landing mid-computation keeps the page out of the cache
    let stale_key = key(4);
    cache
        .get_or_compute(&stale_key, &[CacheTag::Authors], || async {
            cache.invalidate_tags(&[CacheTag::Authors]);
            Ok::<_, Infallible>(Bytes::from_static(b"[]"))
        })
        .await
        .expect("infallible");
    assert!(cache.get(&stale_key).is_none());

    let snapshot = snapshotter.snapshot().into_vec();

    let names: HashSet<String> = snapshot
        .iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();
    let expected = [
        "bookapi_cache_hit_total",
        "bookapi_cache_miss_total",
        "bookapi_cache_evict_total",
        "bookapi_cache_invalidated_total",
        "bookapi_cache_stale_fill_total",
        "bookapi_cache_compute_ms",
        "bookapi_cache_entries",
    ];
    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }

    let mut counters: HashMap<String, u64> = HashMap::new();
    for (composite_key, _, description, value) in &snapshot {
        let name = composite_key.key().name();
        if let DebugValue::Counter(count) = value {
            let label = composite_key
                .key()
                .labels()
                .find(|label| label.key() == "tag")
                .map(|label| format!("{name}{{tag={}}}", label.value()));
            *counters.entry(label.unwrap_or_else(|| name.to_string())).or_default() += count;
        }
        if name == "bookapi_cache_hit_total" {
            assert!(description.is_some(), "hit counter should be described");
        }
    }

    assert_eq!(counters.get("bookapi_cache_miss_total"), Some(&4));
    assert_eq!(counters.get("bookapi_cache_hit_total"), Some(&1));
    assert_eq!(counters.get("bookapi_cache_evict_total"), Some(&1));
    assert_eq!(counters.get("bookapi_cache_stale_fill_total"), Some(&1));
    assert_eq!(
        counters.get("bookapi_cache_invalidated_total{tag=authorsCache}"),
        Some(&2)
    );
    assert_eq!(
        counters.get("bookapi_cache_invalidated_total{tag=booksCache}"),
        Some(&0)
    );
}
