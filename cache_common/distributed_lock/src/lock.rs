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

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cache::client::RedisClient;
use cache::error::CacheError;
use cache::expiry::KeyTtl;
use cache::key::KeyBuilder;
use config_manager::types::context::{LockSettings, CONFIG};
use log::{debug, error, warn};
use parking_lot::Mutex;
use rand::Rng;
use uuid::Uuid;

use super::client::LockStore;
use super::error::{DistributedLockError, Result};
use super::options::{default_attempts, saturating_millis, AcquireOptions, DEFAULT_INTERVAL_MILLIS};

/// Outcome of `DistributedLock::release`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStatus {
    /// The key held our token and was deleted
    Released,
    /// This instance holds no lock under that name; nothing was sent to the store
    NotHeld,
    /// The key had expired or was taken by another holder; it was left untouched
    Mismatch,
    /// The store could not be reached; the key expires on its own
    Failed,
}

impl ReleaseStatus {
    pub fn is_released(&self) -> bool {
        matches!(self, ReleaseStatus::Released)
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            ReleaseStatus::Released => Ok(()),
            ReleaseStatus::NotHeld => Err(DistributedLockError::LockNotExists),
            ReleaseStatus::Mismatch => Err(DistributedLockError::InvalidLockOwner),
            ReleaseStatus::Failed => Err(DistributedLockError::StoreError(CacheError::OperationError(
                "lock release failed".to_string(),
            ))),
        }
    }
}

/// Mutual exclusion across processes, keyed by name.
///
/// A lock is the key `{namespace}:{name}` holding a token unique to one acquisition, created
/// with a TTL so a crashed holder cannot block others forever. Each instance remembers the
/// tokens it holds, so several names can be held at once and releasing one never touches
/// another. Release only deletes the key while it still holds our token.
///
/// There is no fairness between waiters, and a critical section that outlives the TTL is no
/// longer exclusive.
pub struct DistributedLock {
    store: Arc<dyn LockStore>,
    keys: KeyBuilder,
    interval: Duration,
    jitter_bound: Duration,
    holder_id: String,
    counter: AtomicU64,
    holders: Mutex<HashMap<String, String>>,
}

impl fmt::Debug for DistributedLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributedLock")
            .field("namespace", &self.keys.namespace())
            .field("holder_id", &self.holder_id)
            .field("held", &self.holders.lock().len())
            .finish()
    }
}

impl DistributedLock {
    /// Lock over `store` with the default namespace and polling.
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self::from_settings(store, &LockSettings::default())
    }

    pub fn from_settings(store: Arc<dyn LockStore>, settings: &LockSettings) -> Self {
        let interval_millis = if settings.retry_interval_millis == 0 {
            DEFAULT_INTERVAL_MILLIS
        } else {
            settings.retry_interval_millis
        };
        Self {
            store,
            keys: KeyBuilder::new(settings.namespace.clone()),
            interval: Duration::from_millis(interval_millis),
            jitter_bound: Duration::from_millis(settings.jitter_bound_millis),
            holder_id: Uuid::new_v4().to_string(),
            counter: AtomicU64::new(0),
            holders: Mutex::new(HashMap::new()),
        }
    }

    /// Lock over the global Redis client, configured from the loaded `CacheConfig`.
    pub fn from_global() -> Result<Self> {
        let client = RedisClient::get_instance()?;
        Ok(Self::from_settings(Arc::new(client), &CONFIG.get_or_default().lock))
    }

    /// Identifies this instance; every token it generates starts with it.
    pub fn holder_id(&self) -> &str {
        &self.holder_id
    }

    pub fn namespace(&self) -> &str {
        self.keys.namespace()
    }

    /// Store key of the lock called `name`.
    pub fn lock_key(&self, name: &str) -> String {
        self.keys.key(name)
    }

    /// Polling options of this instance for a lock held up to `ttl_secs`.
    pub fn options(&self, ttl_secs: u64) -> AcquireOptions {
        let interval_millis = saturating_millis(self.interval);
        AcquireOptions::new(ttl_secs)
            .with_interval(self.interval)
            .with_jitter_bound(self.jitter_bound)
            .with_max_attempts(default_attempts(ttl_secs, interval_millis))
    }

    /// Acquires `name` for up to `ttl_secs`, polling for about as long as the TTL.
    pub async fn acquire(&self, name: &str, ttl_secs: u64) -> bool {
        self.acquire_with_options(name, &self.options(ttl_secs)).await
    }

    pub async fn acquire_with_attempts(&self, name: &str, ttl_secs: u64, max_attempts: u32) -> bool {
        let options = self.options(ttl_secs).with_max_attempts(max_attempts);
        self.acquire_with_options(name, &options).await
    }

    /// Fully parameterised acquire; `token` is stored verbatim as the lock value.
    pub async fn acquire_with(
        &self,
        name: &str,
        token: &str,
        ttl_secs: u64,
        interval_millis: u64,
        max_attempts: u32,
    ) -> bool {
        let options = self
            .options(ttl_secs)
            .with_token(token)
            .with_interval(Duration::from_millis(interval_millis))
            .with_max_attempts(max_attempts);
        self.acquire_with_options(name, &options).await
    }

    pub async fn acquire_with_options(&self, name: &str, options: &AcquireOptions) -> bool {
        self.acquire_until(name, options, std::future::pending::<()>()).await
    }

    /// Like `acquire_with_options`, but gives up as soon as `cancel` completes.
    ///
    /// Returns false when the attempts run out, the `wait` budget elapses, `cancel`
    /// completes, or the store fails.
    pub async fn acquire_until<C>(&self, name: &str, options: &AcquireOptions, cancel: C) -> bool
    where
        C: Future,
    {
        if let Err(e) = options.validate() {
            error!("Invalid options for lock {}: {}", name, e);
            return false;
        }
        let key = self.keys.key(name);
        let token = options.token.clone().unwrap_or_else(|| self.next_token());
        let budget = async {
            match options.wait {
                Some(wait) => tokio::time::sleep(wait).await,
                None => std::future::pending::<()>().await,
            }
        };

        let acquired = tokio::select! {
            biased;
            acquired = self.poll(&key, &token, options) => acquired,
            _ = cancel => {
                debug!("Acquisition of lock {} cancelled", key);
                false
            }
            _ = budget => {
                debug!("Wait budget for lock {} elapsed", key);
                false
            }
        };

        if acquired {
            self.holders.lock().insert(name.to_string(), token);
        }
        acquired
    }

    async fn poll(&self, key: &str, token: &str, options: &AcquireOptions) -> bool {
        let attempts = options.attempts();
        for attempt in 1..=attempts {
            match self.store.try_lock(key, token, options.ttl).await {
                Ok(true) => {
                    debug!("Acquired lock {} (attempt {}/{})", key, attempt, attempts);
                    return true;
                }
                Ok(false) => {}
                Err(e) => {
                    error!("Failed to acquire lock {}: {}", key, e);
                    return false;
                }
            }
            if attempt < attempts {
                let pause = options.interval + jitter(options.jitter_bound);
                debug!("Lock {} is held, retrying in {:?} (attempt {}/{})", key, pause, attempt, attempts);
                tokio::time::sleep(pause).await;
            }
        }
        debug!("Gave up on lock {} after {} attempts", key, attempts);
        false
    }

    /// Releases `name` if this instance holds it.
    ///
    /// The local record is dropped whatever the store answers, except for `NotHeld`.
    pub async fn release(&self, name: &str) -> ReleaseStatus {
        let recorded = self.holders.lock().remove(name);
        let token = match recorded {
            Some(token) => token,
            None => {
                debug!("Lock {} is not held by this instance", name);
                return ReleaseStatus::NotHeld;
            }
        };
        let key = self.keys.key(name);
        match self.store.unlock(&key, &token).await {
            Ok(true) => {
                debug!("Released lock {}", key);
                ReleaseStatus::Released
            }
            Ok(false) => {
                warn!("Lock {} expired or changed hands before release; left untouched", key);
                ReleaseStatus::Mismatch
            }
            Err(e) => {
                error!("Failed to release lock {}: {}", key, e);
                ReleaseStatus::Failed
            }
        }
    }

    /// Resets the TTL of a lock this instance holds. False if not held or no longer ours.
    pub async fn extend(&self, name: &str, ttl_secs: u64) -> bool {
        let recorded = self.holders.lock().get(name).cloned();
        let Some(token) = recorded else {
            return false;
        };
        let key = self.keys.key(name);
        match self.store.extend(&key, &token, Duration::from_secs(ttl_secs)).await {
            Ok(extended) => {
                if !extended {
                    warn!("Lock {} is no longer held, cannot extend", key);
                }
                extended
            }
            Err(e) => {
                error!("Failed to extend lock {}: {}", key, e);
                false
            }
        }
    }

    /// Remaining TTL of the lock key, whoever holds it.
    pub async fn ttl(&self, name: &str) -> Option<Duration> {
        let key = self.keys.key(name);
        match self.store.lock_ttl(&key).await {
            Ok(KeyTtl::Expires(left)) => Some(left),
            Ok(_) => None,
            Err(e) => {
                error!("Failed to read ttl of lock {}: {}", key, e);
                None
            }
        }
    }

    /// Whether this instance believes it holds `name`. The TTL may have run out since.
    pub fn is_held(&self, name: &str) -> bool {
        self.holders.lock().contains_key(name)
    }

    fn next_token(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}:{}", self.holder_id, n)
    }
}

fn jitter(bound: Duration) -> Duration {
    let bound_millis = saturating_millis(bound);
    if bound_millis == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..bound_millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockLockStore;
    use cache::memory::MemoryStore;
    use config_manager::types::context::REDIS_URL_ENV;
    use serial_test::serial;

    fn memory_lock() -> (MemoryStore, DistributedLock) {
        let store = MemoryStore::new();
        let lock = DistributedLock::new(Arc::new(store.clone()));
        (store, lock)
    }

    #[test]
    fn test_tokens_are_unique_per_acquisition() {
        let (_, lock) = memory_lock();
        let first = lock.next_token();
        let second = lock.next_token();
        assert_ne!(first, second);
        assert!(first.starts_with(lock.holder_id()));
        assert_eq!(first, format!("{}:1", lock.holder_id()));
    }

    #[test]
    fn test_from_settings() {
        let settings = LockSettings {
            namespace: "JOBS".to_string(),
            retry_interval_millis: 20,
            jitter_bound_millis: 0,
        };
        let lock = DistributedLock::from_settings(Arc::new(MemoryStore::new()), &settings);
        assert_eq!(lock.lock_key("a"), "JOBS:a");
        let options = lock.options(1);
        assert_eq!(options.interval, Duration::from_millis(20));
        assert_eq!(options.jitter_bound, Duration::ZERO);
        assert_eq!(options.max_attempts, 51);
    }

    #[test]
    fn test_jitter_stays_below_bound() {
        assert_eq!(jitter(Duration::ZERO), Duration::ZERO);
        for _ in 0..100 {
            assert!(jitter(Duration::from_millis(10)) < Duration::from_millis(10));
        }
    }

    #[tokio::test]
    async fn test_acquire_records_token() {
        let (store, lock) = memory_lock();
        assert!(lock.acquire("orders:42", 5).await);
        assert!(lock.is_held("orders:42"));
        let value = cache::store::KvStore::get(&store, "LOCK:orders:42").await.unwrap().unwrap();
        assert!(value.starts_with(lock.holder_id()));
        assert!(lock.ttl("orders:42").await.unwrap() <= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_caller_token_is_stored_verbatim() {
        let (store, lock) = memory_lock();
        assert!(lock.acquire_with("job", "worker-7", 5, 10, 1).await);
        let value = cache::store::KvStore::get(&store, "LOCK:job").await.unwrap();
        assert_eq!(value.as_deref(), Some("worker-7"));
        assert_eq!(lock.release("job").await, ReleaseStatus::Released);
    }

    #[tokio::test]
    async fn test_zero_ttl_is_rejected_without_store_call() {
        let mut store = MockLockStore::new();
        store.expect_try_lock().never();
        let lock = DistributedLock::new(Arc::new(store));
        assert!(!lock.acquire("a", 0).await);
    }

    #[tokio::test]
    async fn test_store_error_stops_polling() {
        let mut store = MockLockStore::new();
        store
            .expect_try_lock()
            .times(1)
            .returning(|_, _, _| Err(CacheError::OperationError("connection refused".to_string()).into()));
        let lock = DistributedLock::new(Arc::new(store));
        assert!(!lock.acquire_with_attempts("a", 5, 10).await);
        assert!(!lock.is_held("a"));
    }

    #[tokio::test]
    async fn test_exact_attempt_count() {
        let mut store = MockLockStore::new();
        store.expect_try_lock().times(3).returning(|_, _, _| Ok(false));
        let lock = DistributedLock::new(Arc::new(store));
        let options = lock
            .options(5)
            .with_interval(Duration::from_millis(1))
            .with_jitter_bound(Duration::ZERO)
            .with_max_attempts(3);
        assert!(!lock.acquire_with_options("a", &options).await);
    }

    #[tokio::test]
    async fn test_release_failure_drops_record() {
        let mut store = MockLockStore::new();
        store.expect_try_lock().returning(|_, _, _| Ok(true));
        store
            .expect_unlock()
            .times(1)
            .returning(|_, _| Err(CacheError::OperationError("broken pipe".to_string()).into()));
        let lock = DistributedLock::new(Arc::new(store));
        assert!(lock.acquire("a", 5).await);
        assert_eq!(lock.release("a").await, ReleaseStatus::Failed);
        assert!(!lock.is_held("a"));
        assert_eq!(lock.release("a").await, ReleaseStatus::NotHeld);
    }

    #[tokio::test]
    async fn test_extend_requires_record() {
        let (_, lock) = memory_lock();
        assert!(!lock.extend("a", 10).await);
        assert!(lock.acquire("a", 1).await);
        assert!(lock.extend("a", 30).await);
        assert!(lock.ttl("a").await.unwrap() > Duration::from_secs(25));
    }

    #[test]
    fn test_release_status_into_result() {
        assert!(ReleaseStatus::Released.into_result().is_ok());
        assert!(matches!(ReleaseStatus::NotHeld.into_result(), Err(DistributedLockError::LockNotExists)));
        assert!(matches!(ReleaseStatus::Mismatch.into_result(), Err(DistributedLockError::InvalidLockOwner)));
        assert!(matches!(ReleaseStatus::Failed.into_result(), Err(DistributedLockError::StoreError(_))));
    }

    #[tokio::test]
    async fn test_out_of_range_ttl_is_not_acquired() {
        let (store, lock) = memory_lock();
        let options = lock.options(u64::MAX / 1000 + 1).with_max_attempts(1);
        assert!(!lock.acquire_with_options("big", &options).await);
        assert!(!lock.is_held("big"));
        assert!(!cache::store::KvStore::exists(&store, "LOCK:big").await.unwrap());
        assert_eq!(lock.ttl("big").await, None);
    }

    #[test]
    fn test_huge_interval_does_not_wrap() {
        let settings = LockSettings {
            namespace: "LOCK".to_string(),
            retry_interval_millis: u64::MAX,
            jitter_bound_millis: 0,
        };
        let lock = DistributedLock::from_settings(Arc::new(MemoryStore::new()), &settings);
        assert_eq!(lock.options(5).max_attempts, 1);
        assert!(jitter(Duration::MAX) < Duration::MAX);
    }

    #[test]
    #[serial]
    fn test_from_global_uses_redis_url() {
        std::env::set_var(REDIS_URL_ENV, "redis://127.0.0.1:6379/3");
        let lock = DistributedLock::from_global().unwrap();
        assert_eq!(lock.namespace(), "LOCK");
        assert_eq!(lock.lock_key("job"), "LOCK:job");
        std::env::remove_var(REDIS_URL_ENV);
    }
}
