//! Read-through cache behavior under concurrency and time.

use std::sync::Arc;
use std::time::Duration;

use scenelock::application::cache::ReadThroughCache;
use scenelock::infrastructure::config::CacheConfig;
use scenelock::testkit::config::short_ttl_cache;
use scenelock::testkit::loader::{CountingLoader, FailingLoader};
use tokio::task::JoinSet;

fn key(s: &str) -> String {
    s.to_string()
}

async fn concurrent_gets(
    cache: Arc<ReadThroughCache<String, String>>,
    loader: &CountingLoader,
    readers: usize,
) -> Vec<String> {
    let mut set = JoinSet::new();
    for _ in 0..readers {
        let cache = Arc::clone(&cache);
        let loader = loader.clone();
        set.spawn(async move {
            cache
                .get(&key("scene-1"), |k| async move { loader.load(k).await })
                .await
        });
    }

    let mut values = Vec::with_capacity(readers);
    while let Some(joined) = set.join_next().await {
        values.push(joined.unwrap().unwrap());
    }
    values
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cold_reads_trigger_one_load() {
    let cache: Arc<ReadThroughCache<String, String>> =
        Arc::new(ReadThroughCache::new(CacheConfig::default()).unwrap());
    let loader = CountingLoader::with_delay(Duration::from_millis(100));

    let values = concurrent_gets(Arc::clone(&cache), &loader, 16).await;

    assert_eq!(loader.calls(), 1);
    assert_eq!(values.len(), 16);
    assert!(values.iter().all(|v| v == "scene-1#1"), "{values:?}");
    assert_eq!(cache.stats().loads, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sharded_locks_keep_single_flight() {
    let config = CacheConfig {
        lock_shards: Some(2),
        ..Default::default()
    };
    let cache: Arc<ReadThroughCache<String, String>> =
        Arc::new(ReadThroughCache::new(config).unwrap());
    let loader = CountingLoader::with_delay(Duration::from_millis(50));

    let values = concurrent_gets(Arc::clone(&cache), &loader, 8).await;

    assert_eq!(loader.calls(), 1);
    assert!(values.iter().all(|v| v == "scene-1#1"));
    assert_eq!(cache.lock_count(), 2);
}

#[tokio::test]
async fn invalidate_forces_reload() {
    let cache = ReadThroughCache::new(CacheConfig::default()).unwrap();
    let loader = CountingLoader::new();
    let k = key("item-7");

    let first = cache.get(&k, |k| loader.load(k)).await.unwrap();
    let cached = cache.get(&k, |k| loader.load(k)).await.unwrap();
    cache.invalidate(&k).await;
    let reloaded = cache.get(&k, |k| loader.load(k)).await.unwrap();

    assert_eq!(first, "item-7#1");
    assert_eq!(cached, "item-7#1");
    assert_eq!(reloaded, "item-7#2");
    assert_eq!(loader.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn entry_older_than_ttl_is_a_miss() {
    let cache = ReadThroughCache::new(short_ttl_cache()).unwrap();
    let loader = CountingLoader::new();
    let k = key("scene-1");

    assert_eq!(cache.get(&k, |k| loader.load(k)).await.unwrap(), "scene-1#1");

    tokio::time::advance(Duration::from_secs(59)).await;
    assert_eq!(cache.get(&k, |k| loader.load(k)).await.unwrap(), "scene-1#1");

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(cache.get(&k, |k| loader.load(k)).await.unwrap(), "scene-1#2");

    // The stale entry was overwritten, not swept
    assert_eq!(cache.stats().evictions, 0);
}

#[tokio::test(start_paused = true)]
async fn slow_load_for_one_key_does_not_block_another() {
    let cache = Arc::new(ReadThroughCache::<String, String>::new(CacheConfig::default()).unwrap());
    let slow = CountingLoader::with_delay(Duration::from_secs(10));
    let fast = CountingLoader::new();

    let pending = {
        let cache = Arc::clone(&cache);
        let slow = slow.clone();
        tokio::spawn(async move {
            cache
                .get(&key("a"), |k| async move { slow.load(k).await })
                .await
        })
    };

    // Let the slow load take the lock for "a"
    while slow.calls() == 0 {
        tokio::task::yield_now().await;
    }

    let started = tokio::time::Instant::now();
    let value = cache.get(&key("b"), |k| fast.load(k)).await.unwrap();

    assert_eq!(value, "b#1");
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert!(!pending.is_finished());

    assert_eq!(pending.await.unwrap().unwrap(), "a#1");
}

#[tokio::test]
async fn failed_load_is_retried_next_time() {
    let cache = ReadThroughCache::new(CacheConfig::default()).unwrap();
    let failing = FailingLoader::new("scene file is corrupt");
    let k = key("scene-9");

    for _ in 0..3 {
        let err = cache.get(&k, |k| failing.load(k)).await.unwrap_err();
        assert_eq!(err, "scene file is corrupt");
    }
    assert_eq!(failing.calls(), 3);
    assert!(cache.is_empty());

    let loader = CountingLoader::new();
    assert_eq!(cache.get(&k, |k| loader.load(k)).await.unwrap(), "scene-9#1");
}

#[tokio::test(start_paused = true)]
async fn invalidate_during_load_waits_then_clears() {
    let cache = Arc::new(ReadThroughCache::<String, String>::new(CacheConfig::default()).unwrap());
    let loader = CountingLoader::with_delay(Duration::from_secs(5));

    let load = {
        let cache = Arc::clone(&cache);
        let loader = loader.clone();
        tokio::spawn(async move {
            cache
                .get(&key("a"), |k| async move { loader.load(k).await })
                .await
        })
    };

    while loader.calls() == 0 {
        tokio::task::yield_now().await;
    }

    // Blocks on the key's write lock until the load stores its value
    cache.invalidate(&key("a")).await;

    assert_eq!(load.await.unwrap().unwrap(), "a#1");
    assert!(cache.peek(&key("a")).await.is_none());
    assert_eq!(cache.get(&key("a"), |k| loader.load(k)).await.unwrap(), "a#2");
}
