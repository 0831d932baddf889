//! Named pool registry.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::Duration;

use connpool::{Pool, PoolConfig, PoolRegistry};
use connpool_testing::{MockConfig, MockConnector, init_tracing};

fn pool(min: usize, database: u32) -> (Pool<MockConnector>, MockConnector) {
    let mock = MockConnector::new();
    let config = PoolConfig::new()
        .min_active(min)
        .max_active(4)
        .max_wait_time(Duration::from_millis(100));
    let pool = Pool::new(config, mock.clone(), MockConfig { database }).unwrap();
    (pool, mock)
}

#[tokio::test(start_paused = true)]
async fn test_start_and_stop_all_pools() {
    init_tracing();
    let registry = PoolRegistry::new();
    let (cache, cache_mock) = pool(1, 0);
    let (db, db_mock) = pool(2, 3);
    assert!(registry.insert("redis", cache).is_none());
    assert!(registry.insert("mysql", db).is_none());

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.names(), vec!["mysql".to_owned(), "redis".to_owned()]);

    assert_eq!(registry.start().await.unwrap(), 2);
    assert_eq!(registry.start().await.unwrap(), 0);
    assert_eq!(cache_mock.connects(), 1);
    assert_eq!(db_mock.connects(), 2);

    let status = registry.get_managed("mysql").unwrap().status();
    assert_eq!(status.total, 2);

    assert_eq!(registry.stop().await, 2);
    assert_eq!(registry.stop().await, 0);
    assert_eq!(cache_mock.disconnects(), 1);
    assert_eq!(db_mock.disconnects(), 2);
    assert!(registry.get_managed("redis").unwrap().is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_typed_lookup() {
    let registry = PoolRegistry::new();
    let (db, _mock) = pool(1, 7);
    registry.insert("mysql", db);
    registry.start().await.unwrap();

    let typed = registry.get::<MockConnector>("mysql").unwrap();
    assert_eq!(typed.connector_config().database, 7);
    let handle = typed.borrow().await.unwrap();
    assert_eq!(handle.get_ref().database(), 7);
    assert!(typed.return_connection(handle).await.unwrap());

    assert!(registry.get::<MockConnector>("postgres").is_none());
    registry.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_close_and_remove_by_name() {
    let registry = PoolRegistry::new();
    let (a, _) = pool(0, 0);
    let (b, _) = pool(0, 0);
    registry.insert("a", a);
    registry.insert("b", b.clone());
    registry.start().await.unwrap();

    assert_eq!(registry.close("a").await, Some(true));
    assert_eq!(registry.close("a").await, Some(false));
    assert_eq!(registry.close("missing").await, None);

    let removed = registry.remove("b").unwrap();
    assert!(!removed.is_closed());
    assert!(registry.get_managed("b").is_none());
    assert_eq!(registry.names(), vec!["a".to_owned()]);
    assert!(b.close().await);
    assert!(removed.is_closed());

    let (c, _) = pool(0, 0);
    assert!(registry.insert("a", c).is_some());
    assert!(!registry.is_empty());
}
