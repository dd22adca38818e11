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
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;

use crate::error::CacheError;
use crate::expiry::{Expiry, KeyTtl};

/// Primitive commands of the backing key-value store.
///
/// Every method maps to a single store command (or an atomic transaction), so each call is
/// atomic with respect to other clients. `RedisClient` talks to a Redis server;
/// `MemoryStore` keeps the data in process.
#[automock]
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, expiry: Option<Expiry>) -> Result<(), CacheError>;

    /// Writes only when the key is absent; `true` iff this call created it.
    async fn set_nx(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool, CacheError>;

    /// Stores `value` and returns the previous one.
    async fn get_set(&self, key: &str, value: &str) -> Result<Option<String>, CacheError>;

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, CacheError>;

    async fn incr_by_float(&self, key: &str, delta: f64) -> Result<f64, CacheError>;

    /// `true` if a key was removed.
    async fn del(&self, key: &str) -> Result<bool, CacheError>;

    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError>;

    async fn expire_at(&self, key: &str, at: DateTime<Utc>) -> Result<bool, CacheError>;

    async fn ttl(&self, key: &str) -> Result<KeyTtl, CacheError>;

    // hash

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError>;

    async fn hset_multiple(&self, key: &str, entries: &[(String, String)]) -> Result<(), CacheError>;

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, CacheError>;

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, CacheError>;

    async fn hdel(&self, key: &str, field: &str) -> Result<bool, CacheError>;

    async fn hexists(&self, key: &str, field: &str) -> Result<bool, CacheError>;

    // list

    /// Appends to the tail; returns the new length.
    async fn rpush(&self, key: &str, values: &[String]) -> Result<u64, CacheError>;

    async fn llen(&self, key: &str) -> Result<u64, CacheError>;

    /// Inclusive range, negative indexes count from the tail.
    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, CacheError>;

    async fn lindex(&self, key: &str, index: i64) -> Result<Option<String>, CacheError>;

    async fn lset(&self, key: &str, index: i64, value: &str) -> Result<(), CacheError>;

    /// count > 0 from the head, count < 0 from the tail, 0 removes all occurrences.
    async fn lrem(&self, key: &str, count: i64, value: &str) -> Result<u64, CacheError>;

    // set

    async fn sadd(&self, key: &str, members: &[String]) -> Result<u64, CacheError>;

    async fn srem(&self, key: &str, members: &[String]) -> Result<u64, CacheError>;

    async fn scard(&self, key: &str) -> Result<u64, CacheError>;

    async fn smembers(&self, key: &str) -> Result<Vec<String>, CacheError>;

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, CacheError>;

    // bits

    /// Returns the previous bit value.
    async fn setbit(&self, key: &str, offset: u64, value: bool) -> Result<bool, CacheError>;

    async fn getbit(&self, key: &str, offset: u64) -> Result<bool, CacheError>;
}
