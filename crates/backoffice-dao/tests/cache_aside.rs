//! Read-path behavior of the cache-aside DAO.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use backoffice_cache::{CacheStore, EntityCache};
use backoffice_core::{Config, Role};
use backoffice_dao::DaoError;
use common::{CountingStore, FailingCache, cached_dao, dao_with_cache, uncached_dao};
use futures_util::future::join_all;

fn config(key: &str, value: &str) -> Config {
    Config {
        name: format!("{key} setting"),
        key: key.into(),
        value: value.into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_cold_miss_then_warm_hit() {
    let store = CountingStore::new();
    let (dao, _) = cached_dao::<Config>(&store);
    let created = dao.create(&config("siteName", "Acme")).await.unwrap();

    let first = dao.get_by_id(created.id).await.unwrap();
    assert_eq!(first.value, "Acme");
    assert_eq!(store.reads(), 1);

    let second = dao.get_by_id(created.id).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(store.reads(), 1, "warm read must not touch the store");
}

#[tokio::test]
async fn test_missing_row_writes_placeholder() {
    let store = CountingStore::new();
    let (dao, cache) = cached_dao::<Config>(&store);

    let err = dao.get_by_id(404).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(store.reads(), 1);

    let cached = EntityCache::<Config>::new(cache).get(404).await.unwrap_err();
    assert!(cached.is_placeholder());
}

#[tokio::test]
async fn test_placeholder_short_circuits_store() {
    let store = CountingStore::new();
    let (dao, _) = cached_dao::<Config>(&store);

    assert!(dao.get_by_id(404).await.unwrap_err().is_not_found());
    store.reset();

    for _ in 0..3 {
        let err = dao.get_by_id(404).await.unwrap_err();
        assert_eq!(err, DaoError::not_found("config", 404));
    }
    assert_eq!(store.reads(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_share_one_load() {
    let store = CountingStore::with_delay(Duration::from_millis(50));
    let (dao, _) = cached_dao::<Config>(&store);
    let created = dao.create(&config("siteName", "Acme")).await.unwrap();

    let calls = (0..16).map(|_| {
        let dao = dao.clone();
        tokio::spawn(async move { dao.get_by_id(created.id).await })
    });
    let results = join_all(calls).await;

    for result in results {
        assert_eq!(result.unwrap().unwrap().value, "Acme");
    }
    assert_eq!(store.reads(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_on_absent_row_share_one_load() {
    let store = CountingStore::with_delay(Duration::from_millis(50));
    let (dao, _) = cached_dao::<Config>(&store);

    let calls = (0..8).map(|_| {
        let dao = dao.clone();
        tokio::spawn(async move { dao.get_by_id(77).await })
    });
    for result in join_all(calls).await {
        assert!(result.unwrap().unwrap_err().is_not_found());
    }
    assert_eq!(store.reads(), 1);
}

#[tokio::test]
async fn test_store_failure_is_not_cached() {
    let store = CountingStore::new();
    let (dao, cache) = cached_dao::<Config>(&store);
    let created = dao.create(&config("siteName", "Acme")).await.unwrap();

    store.set_failing(true);
    let err = dao.get_by_id(created.id).await.unwrap_err();
    assert!(matches!(err, DaoError::Store(_)));
    assert!(
        EntityCache::<Config>::new(cache)
            .get(created.id)
            .await
            .unwrap_err()
            .is_miss()
    );

    store.set_failing(false);
    assert_eq!(dao.get_by_id(created.id).await.unwrap().value, "Acme");
    assert_eq!(store.reads(), 2);
}

#[tokio::test]
async fn test_cache_backend_failure_fails_fast() {
    let store = CountingStore::new();
    let dao = dao_with_cache::<Config>(&store, Arc::new(FailingCache::everything()));

    let err = dao.get_by_id(1).await.unwrap_err();
    assert!(matches!(err, DaoError::Cache(_)));
    let err = dao.get_by_ids(&[1, 2]).await.unwrap_err();
    assert!(matches!(err, DaoError::Cache(_)));
    let err = dao.get_by_key("siteName").await.unwrap_err();
    assert!(matches!(err, DaoError::Cache(_)));
    assert_eq!(store.reads(), 0);
}

#[tokio::test]
async fn test_cache_write_failure_is_swallowed() {
    let store = CountingStore::new();
    let cache = Arc::new(FailingCache::writes());
    let dao = dao_with_cache::<Config>(&store, cache.clone());
    let created = dao.create(&config("siteName", "Acme")).await.unwrap();

    assert_eq!(dao.get_by_id(created.id).await.unwrap().value, "Acme");
    assert!(dao.get_by_id(999).await.unwrap_err().is_not_found());
    assert_eq!(dao.get_by_key("siteName").await.unwrap().id, created.id);
    assert_eq!(dao.get_by_ids(&[created.id, 999]).await.unwrap().len(), 1);
    assert!(cache.write_attempts.load(Ordering::SeqCst) >= 4);
}

#[tokio::test]
async fn test_get_by_ids_dedupes_and_skips_placeholders() {
    let store = CountingStore::new();
    let (dao, _) = cached_dao::<Config>(&store);
    let a = dao.create(&config("a", "1")).await.unwrap();
    let b = dao.create(&config("b", "2")).await.unwrap();

    // seed a placeholder for 99
    tokio_test::assert_err!(dao.get_by_id(99).await);
    store.reset();

    let rows = dao.get_by_ids(&[a.id, b.id, 99, a.id]).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[&a.id].key, "a");
    assert_eq!(rows[&b.id].key, "b");
    assert_eq!(store.reads(), 1, "one batch load for the two real misses");

    let again = dao.get_by_ids(&[a.id, b.id, 99]).await.unwrap();
    assert_eq!(again.len(), 2);
    assert_eq!(store.reads(), 1);
}

#[tokio::test]
async fn test_get_by_ids_placeholders_unknown_ids() {
    let store = CountingStore::new();
    let (dao, _) = cached_dao::<Config>(&store);

    assert!(dao.get_by_ids(&[500, 501]).await.unwrap().is_empty());
    store.reset();

    assert!(dao.get_by_id(500).await.unwrap_err().is_not_found());
    assert!(dao.get_by_id(501).await.unwrap_err().is_not_found());
    assert_eq!(store.reads(), 0);
}

#[tokio::test]
async fn test_get_by_ids_empty_input() {
    let store = CountingStore::new();
    let (dao, _) = cached_dao::<Config>(&store);
    assert!(dao.get_by_ids(&[]).await.unwrap().is_empty());
    assert_eq!(store.reads(), 0);
}

#[tokio::test]
async fn test_get_by_key_hit_miss_and_placeholder() {
    let store = CountingStore::new();
    let (dao, cache) = cached_dao::<Config>(&store);
    let created = dao.create(&config("imageDomain", "https://cdn.example.com")).await.unwrap();

    assert_eq!(dao.get_by_key("imageDomain").await.unwrap().id, created.id);
    assert_eq!(dao.get_by_key("imageDomain").await.unwrap().id, created.id);
    assert_eq!(store.reads(), 1);

    assert!(dao.get_by_key("nope").await.unwrap_err().is_not_found());
    assert!(dao.get_by_key("nope").await.unwrap_err().is_not_found());
    assert_eq!(store.reads(), 2);

    let cached: Arc<dyn CacheStore> = cache;
    let entry = cached.get(&EntityCache::<Config>::secondary_key("nope")).await.unwrap_err();
    assert!(entry.is_placeholder());
}

#[tokio::test]
async fn test_get_by_key_rejects_bad_input() {
    let store = CountingStore::new();
    let (configs, _) = cached_dao::<Config>(&store);
    assert!(configs.get_by_key("").await.unwrap_err().is_validation());

    let (roles, _) = cached_dao::<Role>(&store);
    assert!(roles.get_by_key("admin").await.unwrap_err().is_validation());
}

#[tokio::test]
async fn test_uncached_dao_reads_store_every_time() {
    let store = CountingStore::new();
    let dao = uncached_dao::<Config>(&store);
    assert!(!dao.is_cached());
    let created = dao.create(&config("siteName", "Acme")).await.unwrap();

    for _ in 0..3 {
        assert_eq!(dao.get_by_id(created.id).await.unwrap().value, "Acme");
    }
    assert_eq!(store.reads(), 3);
    assert!(dao.get_by_id(404).await.unwrap_err().is_not_found());
    assert!(dao.get_by_id(404).await.unwrap_err().is_not_found());
    assert_eq!(store.reads(), 5);
}

#[tokio::test]
async fn test_cached_and_uncached_agree() {
    let store = CountingStore::new();
    let (cached, _) = cached_dao::<Config>(&store);
    let plain = uncached_dao::<Config>(&store);
    let a = plain.create(&config("a", "1")).await.unwrap();
    let b = plain.create(&config("b", "2")).await.unwrap();

    for id in [a.id, b.id, 42] {
        assert_eq!(cached.get_by_id(id).await, plain.get_by_id(id).await);
    }
    assert_eq!(
        cached.get_by_ids(&[a.id, b.id, 42]).await.unwrap(),
        plain.get_by_ids(&[a.id, b.id, 42]).await.unwrap()
    );
    assert_eq!(cached.get_by_key("b").await, plain.get_by_key("b").await);
}
