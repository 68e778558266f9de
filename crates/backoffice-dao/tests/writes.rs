//! Write path: sparse updates, deletes and cache invalidation.

mod common;

use std::sync::Arc;

use backoffice_cache::EntityCache;
use backoffice_core::{Config, Role};
use common::{CountingStore, FailingCache, cached_dao, dao_with_cache, uncached_dao};

fn config(key: &str, value: &str) -> Config {
    Config {
        name: "Setting".into(),
        description: "kept across patches".into(),
        key: key.into(),
        value: value.into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_update_invalidates_cached_row() {
    let store = CountingStore::new();
    let (dao, cache) = cached_dao::<Config>(&store);
    let created = dao.create(&config("siteName", "Acme")).await.unwrap();
    dao.get_by_id(created.id).await.unwrap();

    let patch = Config {
        id: created.id,
        value: "Globex".into(),
        ..Default::default()
    };
    dao.update_by_id(&patch).await.unwrap();

    assert!(
        EntityCache::<Config>::new(cache)
            .get(created.id)
            .await
            .unwrap_err()
            .is_miss()
    );
    assert_eq!(dao.get_by_id(created.id).await.unwrap().value, "Globex");
}

#[tokio::test]
async fn test_update_is_sparse() {
    let store = CountingStore::new();
    let dao = uncached_dao::<Config>(&store);
    let created = dao.create(&config("siteName", "Acme")).await.unwrap();

    dao.update_by_id(&Config {
        id: created.id,
        value: "Globex".into(),
        ..Default::default()
    })
    .await
    .unwrap();

    let row = dao.get_by_id(created.id).await.unwrap();
    assert_eq!(row.value, "Globex");
    assert_eq!(row.name, "Setting");
    assert_eq!(row.description, "kept across patches");
    assert_eq!(row.key, "siteName");
}

#[tokio::test]
async fn test_update_requires_id() {
    let store = CountingStore::new();
    let (dao, _) = cached_dao::<Config>(&store);
    let err = dao.update_by_id(&config("siteName", "Acme")).await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_update_missing_row_is_not_found() {
    let store = CountingStore::new();
    let (dao, _) = cached_dao::<Role>(&store);
    let patch = Role {
        id: 12,
        name: "ghost".into(),
        ..Default::default()
    };
    assert!(dao.update_by_id(&patch).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_update_drops_old_and_new_secondary_keys() {
    let store = CountingStore::new();
    let (dao, _) = cached_dao::<Config>(&store);
    let created = dao.create(&config("oldKey", "v")).await.unwrap();

    dao.get_by_key("oldKey").await.unwrap();
    // placeholder for the key the row is about to take
    assert!(dao.get_by_key("newKey").await.unwrap_err().is_not_found());

    dao.update_by_id(&Config {
        id: created.id,
        key: "newKey".into(),
        ..Default::default()
    })
    .await
    .unwrap();

    assert!(dao.get_by_key("oldKey").await.unwrap_err().is_not_found());
    assert_eq!(dao.get_by_key("newKey").await.unwrap().id, created.id);
}

#[tokio::test]
async fn test_failed_update_still_invalidates() {
    let store = CountingStore::new();
    let (dao, cache) = cached_dao::<Config>(&store);
    let a = dao.create(&config("a", "1")).await.unwrap();
    dao.create(&config("b", "2")).await.unwrap();
    dao.get_by_id(a.id).await.unwrap();

    // unique violation on key
    let err = dao
        .update_by_id(&Config {
            id: a.id,
            key: "b".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(!err.is_not_found());
    assert!(
        EntityCache::<Config>::new(cache)
            .get(a.id)
            .await
            .unwrap_err()
            .is_miss()
    );
    assert_eq!(dao.get_by_key("b").await.unwrap().value, "2");
}

#[tokio::test]
async fn test_delete_invalidates_id_and_secondary_key() {
    let store = CountingStore::new();
    let (dao, _) = cached_dao::<Config>(&store);
    let created = dao.create(&config("siteName", "Acme")).await.unwrap();
    dao.get_by_id(created.id).await.unwrap();
    dao.get_by_key("siteName").await.unwrap();

    dao.delete_by_id(created.id).await.unwrap();

    assert!(dao.get_by_id(created.id).await.unwrap_err().is_not_found());
    assert!(dao.get_by_key("siteName").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let store = CountingStore::new();
    let (dao, _) = cached_dao::<Config>(&store);
    dao.delete_by_id(404).await.unwrap();
    assert_eq!(dao.delete_by_ids(&[404, 405]).await.unwrap(), 0);
    assert_eq!(dao.delete_by_ids(&[]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_by_ids_invalidates_every_row() {
    let store = CountingStore::new();
    let (dao, _) = cached_dao::<Config>(&store);
    let a = dao.create(&config("a", "1")).await.unwrap();
    let b = dao.create(&config("b", "2")).await.unwrap();
    let c = dao.create(&config("c", "3")).await.unwrap();
    dao.get_by_ids(&[a.id, b.id, c.id]).await.unwrap();
    dao.get_by_key("a").await.unwrap();

    assert_eq!(dao.delete_by_ids(&[a.id, b.id]).await.unwrap(), 2);

    let left = dao.get_by_ids(&[a.id, b.id, c.id]).await.unwrap();
    assert_eq!(left.keys().copied().collect::<Vec<_>>(), vec![c.id]);
    assert!(dao.get_by_key("a").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_writes_succeed_when_invalidation_fails() {
    let store = CountingStore::new();
    let dao = dao_with_cache::<Config>(&store, Arc::new(FailingCache::writes()));
    let created = dao.create(&config("siteName", "Acme")).await.unwrap();

    dao.update_by_id(&Config {
        id: created.id,
        value: "Globex".into(),
        ..Default::default()
    })
    .await
    .unwrap();
    dao.delete_by_id(created.id).await.unwrap();
    assert!(dao.get_by_id(created.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_update_by_tx_invalidates_and_commits() {
    let store = CountingStore::new();
    let (dao, _) = cached_dao::<Config>(&store);
    let created = dao.create(&config("siteName", "Acme")).await.unwrap();
    dao.get_by_id(created.id).await.unwrap();
    dao.get_by_key("siteName").await.unwrap();

    let mut tx = dao.begin().await.unwrap();
    dao.update_by_tx(
        tx.as_mut(),
        &Config {
            id: created.id,
            key: "title".into(),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(dao.get_by_id(created.id).await.unwrap().key, "title");
    assert!(dao.get_by_key("siteName").await.unwrap_err().is_not_found());
    assert_eq!(dao.get_by_key("title").await.unwrap().id, created.id);
}

#[tokio::test]
async fn test_delete_by_tx_rolled_back_keeps_row() {
    let store = CountingStore::new();
    let (dao, _) = cached_dao::<Config>(&store);
    let created = dao.create(&config("siteName", "Acme")).await.unwrap();
    dao.get_by_id(created.id).await.unwrap();

    let mut tx = dao.begin().await.unwrap();
    dao.delete_by_tx(tx.as_mut(), created.id).await.unwrap();
    tx.rollback().await.unwrap();

    // the entry was dropped eagerly, the next read reloads the surviving row
    assert_eq!(dao.get_by_id(created.id).await.unwrap().value, "Acme");
}

#[tokio::test]
async fn test_create_by_tx_visible_after_commit() {
    let store = CountingStore::new();
    let (dao, _) = cached_dao::<Role>(&store);

    let mut tx = dao.begin().await.unwrap();
    let role = dao
        .create_by_tx(
            tx.as_mut(),
            &Role {
                name: "Editor".into(),
                code: "editor".into(),
                status: 1,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(dao.get_by_id(role.id).await.unwrap().code, "editor");
}
