//! Integration test: read-through catalog refresh.
//!
//! The cache never fetches on its own; `read_or_refresh` goes to the
//! provider boundary only when the entry is absent, stale, or a forced
//! refresh is requested.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use atelier_catalog::CatalogCache;
use atelier_jobs::catalog_sync::read_or_refresh;
use atelier_types::job::JobStatus;

use atelier_integration_tests::support::{job, ScriptedApi};

const TTL_MS: u64 = 600_000;

#[tokio::test]
async fn absent_entry_triggers_fetch_then_cache_serves() {
    let api = Arc::new(ScriptedApi::new(vec![job(JobStatus::Queued)]));
    let cache = CatalogCache::ephemeral().expect("cache");

    let entry = read_or_refresh(&*api, &cache, "together", "secret-abc", false, TTL_MS)
        .await
        .expect("refresh");
    assert_eq!(entry.models.len(), 1);
    assert_eq!(api.models_fetch_count.load(Ordering::SeqCst), 1);

    // Fresh entry: second read is served from the cache.
    read_or_refresh(&*api, &cache, "together", "secret-abc", false, TTL_MS)
        .await
        .expect("cached read");
    assert_eq!(api.models_fetch_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn force_bypasses_fresh_cache_and_restamps() {
    let api = Arc::new(ScriptedApi::new(vec![job(JobStatus::Queued)]));
    let cache = CatalogCache::ephemeral().expect("cache");

    let first = read_or_refresh(&*api, &cache, "together", "secret-abc", false, TTL_MS)
        .await
        .expect("initial");

    let forced = read_or_refresh(&*api, &cache, "together", "secret-abc", true, TTL_MS)
        .await
        .expect("forced");
    assert_eq!(api.models_fetch_count.load(Ordering::SeqCst), 2);
    assert!(forced.fetched_at >= first.fetched_at);

    let cached = cache
        .read("together")
        .await
        .expect("read")
        .expect("entry present");
    assert_eq!(cached.fetched_at, forced.fetched_at);
}

#[tokio::test]
async fn stale_entry_is_refreshed() {
    let api = Arc::new(ScriptedApi::new(vec![job(JobStatus::Queued)]));
    let cache = CatalogCache::ephemeral().expect("cache");

    // An entry fetched long ago, past its TTL.
    cache
        .write("together", vec![], TTL_MS, 0)
        .await
        .expect("seed stale entry");

    let entry = read_or_refresh(&*api, &cache, "together", "secret-abc", false, TTL_MS)
        .await
        .expect("refresh");
    assert_eq!(api.models_fetch_count.load(Ordering::SeqCst), 1);
    assert_eq!(entry.models.len(), 1, "stale empty entry was replaced");
}
