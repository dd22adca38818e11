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

use std::time::Duration;

use async_trait::async_trait;
use cache::client::RedisClient;
use cache::expiry::KeyTtl;
use cache::memory::MemoryStore;
use cache::store::KvStore;
use mockall::automock;

use super::error::Result;
use super::options::{saturating_millis, MAX_TTL_MILLIS};
use super::scripts::{EXTEND_LOCK, RELEASE_LOCK};

fn ttl_millis(ttl: Duration) -> u64 {
    saturating_millis(ttl).clamp(1, MAX_TTL_MILLIS)
}

/// Store operations the lock is built on. Each one is a single atomic step on the store.
#[automock]
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Creates `key = token` with `ttl` if the key is absent; `true` if it was created.
    async fn try_lock(&self, key: &str, token: &str, ttl: Duration) -> Result<bool>;

    /// Deletes `key` if it still holds `token`; `true` if it was deleted.
    async fn unlock(&self, key: &str, token: &str) -> Result<bool>;

    /// Resets the expiration of `key` to `ttl` if it still holds `token`.
    async fn extend(&self, key: &str, token: &str, ttl: Duration) -> Result<bool>;

    async fn lock_ttl(&self, key: &str) -> Result<KeyTtl>;
}

#[async_trait]
impl LockStore for RedisClient {
    async fn try_lock(&self, key: &str, token: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.connection().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn unlock(&self, key: &str, token: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let script = redis::Script::new(RELEASE_LOCK);
        let result: i32 = script.key(key).arg(token).invoke_async(&mut conn).await?;
        Ok(result == 1)
    }

    async fn extend(&self, key: &str, token: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.connection().await?;
        let script = redis::Script::new(EXTEND_LOCK);
        let result: i32 = script
            .key(key)
            .arg(token)
            .arg(ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await?;
        Ok(result == 1)
    }

    async fn lock_ttl(&self, key: &str) -> Result<KeyTtl> {
        Ok(KvStore::ttl(self, key).await?)
    }
}

#[async_trait]
impl LockStore for MemoryStore {
    async fn try_lock(&self, key: &str, token: &str, ttl: Duration) -> Result<bool> {
        let ttl = Duration::from_millis(ttl_millis(ttl));
        Ok(KvStore::set_nx(self, key, token, Some(ttl)).await?)
    }

    async fn unlock(&self, key: &str, token: &str) -> Result<bool> {
        Ok(self.compare_and_delete(key, token))
    }

    async fn extend(&self, key: &str, token: &str, ttl: Duration) -> Result<bool> {
        Ok(self.compare_and_expire(key, token, Duration::from_millis(ttl_millis(ttl))))
    }

    async fn lock_ttl(&self, key: &str) -> Result<KeyTtl> {
        Ok(KvStore::ttl(self, key).await?)
    }
}
