//! Benchmark: borrow/return round trips on a warm pool

#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]

use std::hint::black_box;
use std::time::Duration;

use connpool::{Pool, PoolConfig};
use connpool_testing::{MockConfig, MockConnector};
use criterion::{Criterion, criterion_group, criterion_main};

fn warm_pool(rt: &tokio::runtime::Runtime, size: usize) -> Pool<MockConnector> {
    let config = PoolConfig::new()
        .min_active(size)
        .max_active(size)
        .max_wait_time(Duration::from_secs(5));
    let pool = Pool::new(config, MockConnector::new(), MockConfig::default()).unwrap();
    rt.block_on(pool.init()).unwrap();
    pool
}

fn benchmark_borrow_return(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let pool = warm_pool(&rt, 4);

    c.bench_function("borrow_return_single", |b| {
        b.to_async(&rt).iter(|| async {
            let handle = pool.borrow().await.unwrap();
            black_box(handle.get_ref().id());
            pool.return_connection(handle).await.unwrap()
        });
    });

    rt.block_on(pool.close());
}

fn benchmark_contended_borrow(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let pool = warm_pool(&rt, 4);

    // 16 tasks competing for 4 connections
    c.bench_function("borrow_return_contended_16_tasks", |b| {
        b.to_async(&rt).iter(|| async {
            let tasks: Vec<_> = (0..16)
                .map(|_| {
                    let pool = pool.clone();
                    tokio::spawn(async move {
                        let handle = pool.borrow().await.unwrap();
                        tokio::task::yield_now().await;
                        pool.return_connection(handle).await.unwrap()
                    })
                })
                .collect();

            for task in tasks {
                black_box(task.await.unwrap());
            }
        });
    });

    rt.block_on(pool.close());
}

fn benchmark_guard_roundtrip(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let pool = warm_pool(&rt, 4);

    c.bench_function("pooled_connection_release", |b| {
        b.to_async(&rt).iter(|| async {
            let conn = pool.get().await.unwrap();
            conn.release().await.unwrap()
        });
    });

    rt.block_on(pool.close());
}

criterion_group!(
    benches,
    benchmark_borrow_return,
    benchmark_contended_borrow,
    benchmark_guard_roundtrip
);
criterion_main!(benches);
