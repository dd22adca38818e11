/*
 * Copyright (c) Huawei Technologies Co., Ltd. 2025. All rights reserved.
 * Global Trust Authority is licensed under the Mulan PSL v2.
 * You can use this software according to the terms and conditions of the Mulan PSL v2.
 * You may obtain a copy of Mulan PSL v2 at:
 *     http://license.coscl.org.cn/MulanPSL2
 * THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR
 * PURPOSE.
 * See the Mulan PSL v2 for more details.
 */

use std::sync::Arc;
use std::time::{Duration, Instant};

use cache::memory::MemoryStore;
use cache::store::KvStore;
use distributed_lock::{AcquireOptions, DistributedLock, LockStore, ReleaseStatus};
use futures::future::join_all;

fn lock_over(store: &MemoryStore) -> DistributedLock {
    DistributedLock::new(Arc::new(store.clone()))
}

#[tokio::test]
async fn test_only_one_contender_wins() {
    let store = MemoryStore::new();
    let contenders: Vec<DistributedLock> = (0..16).map(|_| lock_over(&store)).collect();

    let results = join_all(contenders.iter().map(|lock| lock.acquire_with_attempts("orders:42", 5, 1))).await;
    assert_eq!(results.iter().filter(|won| **won).count(), 1);

    let winner = contenders.iter().find(|lock| lock.is_held("orders:42")).unwrap();
    assert_eq!(winner.release("orders:42").await, ReleaseStatus::Released);
    assert!(!store.exists("LOCK:orders:42").await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mutual_exclusion_across_tasks() {
    let store = MemoryStore::new();
    let inside = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let lock = lock_over(&store);
        let inside = inside.clone();
        handles.push(tokio::spawn(async move {
            let options = AcquireOptions::new(5)
                .with_interval(Duration::from_millis(5))
                .with_jitter_bound(Duration::from_millis(5))
                .with_max_attempts(1_000);
            assert!(lock.acquire_with_options("shared", &options).await);
            let now_inside = inside.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            assert_eq!(now_inside, 1);
            tokio::time::sleep(Duration::from_millis(10)).await;
            inside.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
            assert_eq!(lock.release("shared").await, ReleaseStatus::Released);
        }));
    }
    for handle in join_all(handles).await {
        handle.unwrap();
    }
}

#[tokio::test]
async fn test_orders_scenario() {
    let store = MemoryStore::new();
    let first = lock_over(&store);
    let second = lock_over(&store);

    assert!(first.acquire("orders:42", 5).await);
    assert!(!second.acquire_with_attempts("orders:42", 5, 1).await);
    assert_eq!(first.release("orders:42").await, ReleaseStatus::Released);
    assert!(second.acquire_with_attempts("orders:42", 5, 1).await);
}

#[tokio::test]
async fn test_bounded_polling_gives_up_in_time() {
    let store = MemoryStore::new();
    let holder = lock_over(&store);
    let waiter = lock_over(&store);
    assert!(holder.acquire("busy", 30).await);

    let options = AcquireOptions::new(30)
        .with_interval(Duration::from_millis(50))
        .with_jitter_bound(Duration::from_millis(10))
        .with_max_attempts(4);
    let started = Instant::now();
    assert!(!waiter.acquire_with_options("busy", &options).await);
    let elapsed = started.elapsed();
    // three pauses between four attempts, none after the last
    assert!(elapsed >= Duration::from_millis(150), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(400), "{:?}", elapsed);
    assert!(!waiter.is_held("busy"));
}

#[tokio::test]
async fn test_expired_lock_can_be_taken() {
    let store = MemoryStore::new();
    let crashed = lock_over(&store);
    let next = lock_over(&store);

    assert!(crashed.acquire_with("job:1", "crashed-holder", 1, 100, 20).await);
    tokio::time::sleep(Duration::from_millis(1_200)).await;
    assert!(next.acquire_with_attempts("job:1", 1, 1).await);
}

#[tokio::test]
async fn test_waiter_gets_lock_when_ttl_runs_out() {
    let store = MemoryStore::new();
    let crashed = lock_over(&store);
    let waiter = lock_over(&store);

    assert!(crashed.acquire("job:2", 1).await);
    let started = Instant::now();
    assert!(waiter.acquire_with("job:2", "waiter", 1, 100, 20).await);
    assert!(started.elapsed() >= Duration::from_millis(800));
}

#[tokio::test]
async fn test_release_is_idempotent() {
    let store = MemoryStore::new();
    let lock = lock_over(&store);
    assert_eq!(lock.release("never").await, ReleaseStatus::NotHeld);

    assert!(lock.acquire("once", 5).await);
    assert_eq!(lock.release("once").await, ReleaseStatus::Released);
    assert_eq!(lock.release("once").await, ReleaseStatus::NotHeld);
    assert!(!store.exists("LOCK:once").await.unwrap());
}

#[tokio::test]
async fn test_stale_release_leaves_new_holder_alone() {
    let store = MemoryStore::new();
    let a = lock_over(&store);
    let b = lock_over(&store);

    assert!(a.acquire("report", 1).await);
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert!(b.acquire_with_attempts("report", 5, 1).await);

    assert_eq!(a.release("report").await, ReleaseStatus::Mismatch);
    assert!(!a.is_held("report"));
    let value = store.get("LOCK:report").await.unwrap().unwrap();
    assert!(value.starts_with(b.holder_id()));
    assert!(!b.acquire_with_attempts("report", 5, 1).await);
    assert_eq!(b.release("report").await, ReleaseStatus::Released);
}

#[tokio::test]
async fn test_names_are_independent_on_one_instance() {
    let store = MemoryStore::new();
    let lock = lock_over(&store);

    assert!(lock.acquire("a", 5).await);
    assert!(lock.acquire("b", 5).await);
    assert_eq!(lock.release("a").await, ReleaseStatus::Released);

    assert!(lock.is_held("b"));
    assert!(store.exists("LOCK:b").await.unwrap());
    assert_eq!(lock.release("b").await, ReleaseStatus::Released);
}

#[tokio::test]
async fn test_cancel_abandons_the_poll() {
    let store = MemoryStore::new();
    let holder = lock_over(&store);
    let waiter = lock_over(&store);
    assert!(holder.acquire("slow", 30).await);

    let options = AcquireOptions::new(30).with_max_attempts(10_000);
    let started = Instant::now();
    let acquired = waiter
        .acquire_until("slow", &options, tokio::time::sleep(Duration::from_millis(150)))
        .await;
    assert!(!acquired);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!waiter.is_held("slow"));
}

#[tokio::test]
async fn test_wait_budget_limits_the_poll() {
    let store = MemoryStore::new();
    let holder = lock_over(&store);
    let waiter = lock_over(&store);
    assert!(holder.acquire("slow", 30).await);

    let options = AcquireOptions::new(30).with_wait(Duration::from_millis(150));
    let started = Instant::now();
    assert!(!waiter.acquire_with_options("slow", &options).await);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(150) && elapsed < Duration::from_secs(1), "{:?}", elapsed);
}

#[tokio::test]
async fn test_custom_namespace_and_extend() {
    let store = MemoryStore::new();
    let settings = config_manager::LockSettings {
        namespace: "JOBS".to_string(),
        retry_interval_millis: 10,
        jitter_bound_millis: 10,
    };
    let lock = DistributedLock::from_settings(Arc::new(store.clone()), &settings);

    assert!(lock.acquire("nightly", 2).await);
    assert!(store.exists("JOBS:nightly").await.unwrap());
    assert!(lock.extend("nightly", 60).await);
    assert!(lock.ttl("nightly").await.unwrap() > Duration::from_secs(55));
    assert!(LockStore::lock_ttl(&store, "JOBS:nightly").await.unwrap().remaining().is_some());
    assert_eq!(lock.release("nightly").await, ReleaseStatus::Released);
    assert_eq!(lock.ttl("nightly").await, None);
}
