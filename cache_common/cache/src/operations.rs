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
use redis::AsyncCommands;

use crate::client::RedisClient;
use crate::error::CacheError;
use crate::expiry::{millis_arg, Expiry, KeyTtl};
use crate::store::KvStore;

fn timestamp_millis(at: DateTime<Utc>) -> u64 {
    at.timestamp_millis().max(0) as u64
}

#[async_trait]
impl KvStore for RedisClient {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, expiry: Option<Expiry>) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        match expiry {
            None => {
                let _: () = conn.set(key, value).await?;
            }
            Some(Expiry::After(ttl)) => {
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("PX")
                    .arg(millis_arg(ttl))
                    .query_async::<_, ()>(&mut conn)
                    .await?;
            }
            Some(Expiry::At(at)) => {
                redis::pipe()
                    .atomic()
                    .set(key, value)
                    .ignore()
                    .cmd("PEXPIREAT")
                    .arg(key)
                    .arg(timestamp_millis(at))
                    .ignore()
                    .query_async::<_, ()>(&mut conn)
                    .await?;
            }
        }
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        match ttl {
            // SET NX PX is a single command, so creation and expiry cannot be split
            Some(ttl) => {
                let reply: Option<String> = redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("NX")
                    .arg("PX")
                    .arg(millis_arg(ttl))
                    .query_async(&mut conn)
                    .await?;
                Ok(reply.is_some())
            }
            None => {
                let created: bool = conn.set_nx(key, value).await?;
                Ok(created)
            }
        }
    }

    async fn get_set(&self, key: &str, value: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        let previous: Option<String> = conn.getset(key, value).await?;
        Ok(previous)
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, CacheError> {
        let mut conn = self.connection().await?;
        let value: i64 = conn.incr(key, delta).await?;
        Ok(value)
    }

    async fn incr_by_float(&self, key: &str, delta: f64) -> Result<f64, CacheError> {
        let mut conn = self.connection().await?;
        let value: f64 = redis::cmd("INCRBYFLOAT")
            .arg(key)
            .arg(delta)
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn del(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        let applied: bool = conn.pexpire(key, millis_arg(ttl) as usize).await?;
        Ok(applied)
    }

    async fn expire_at(&self, key: &str, at: DateTime<Utc>) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        let applied: bool = conn.pexpire_at(key, timestamp_millis(at) as usize).await?;
        Ok(applied)
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, CacheError> {
        let mut conn = self.connection().await?;
        let raw: i64 = conn.pttl(key).await?;
        Ok(KeyTtl::from_millis(raw))
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: () = conn.hset(key, field, value).await?;
        Ok(())
    }

    async fn hset_multiple(&self, key: &str, entries: &[(String, String)]) -> Result<(), CacheError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        let _: () = conn.hset_multiple(key, entries).await?;
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.hget(key, field).await?;
        Ok(value)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, CacheError> {
        let mut conn = self.connection().await?;
        let entries: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(entries)
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        let removed: i64 = conn.hdel(key, field).await?;
        Ok(removed > 0)
    }

    async fn hexists(&self, key: &str, field: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        let exists: bool = conn.hexists(key, field).await?;
        Ok(exists)
    }

    async fn rpush(&self, key: &str, values: &[String]) -> Result<u64, CacheError> {
        if values.is_empty() {
            return self.llen(key).await;
        }
        let mut conn = self.connection().await?;
        let len: u64 = conn.rpush(key, values).await?;
        Ok(len)
    }

    async fn llen(&self, key: &str) -> Result<u64, CacheError> {
        let mut conn = self.connection().await?;
        let len: u64 = conn.llen(key).await?;
        Ok(len)
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, CacheError> {
        let mut conn = self.connection().await?;
        let values: Vec<String> = conn.lrange(key, start as isize, stop as isize).await?;
        Ok(values)
    }

    async fn lindex(&self, key: &str, index: i64) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.lindex(key, index as isize).await?;
        Ok(value)
    }

    async fn lset(&self, key: &str, index: i64, value: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: () = conn.lset(key, index as isize, value).await?;
        Ok(())
    }

    async fn lrem(&self, key: &str, count: i64, value: &str) -> Result<u64, CacheError> {
        let mut conn = self.connection().await?;
        let removed: u64 = conn.lrem(key, count as isize, value).await?;
        Ok(removed)
    }

    async fn sadd(&self, key: &str, members: &[String]) -> Result<u64, CacheError> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        let added: u64 = conn.sadd(key, members).await?;
        Ok(added)
    }

    async fn srem(&self, key: &str, members: &[String]) -> Result<u64, CacheError> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        let removed: u64 = conn.srem(key, members).await?;
        Ok(removed)
    }

    async fn scard(&self, key: &str) -> Result<u64, CacheError> {
        let mut conn = self.connection().await?;
        let size: u64 = conn.scard(key).await?;
        Ok(size)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.connection().await?;
        let members: Vec<String> = conn.smembers(key).await?;
        Ok(members)
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        let is_member: bool = conn.sismember(key, member).await?;
        Ok(is_member)
    }

    async fn setbit(&self, key: &str, offset: u64, value: bool) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        let previous: bool = conn.setbit(key, offset as usize, value).await?;
        Ok(previous)
    }

    async fn getbit(&self, key: &str, offset: u64) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        let bit: bool = conn.getbit(key, offset as usize).await?;
        Ok(bit)
    }
}
