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
use std::sync::Arc;
use std::time::Duration;

use log::error;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::bloom::BloomFilterHelper;
use crate::error::CacheError;
use crate::expiry::{Expiry, KeyTtl};
use crate::lookup::{decode, Lookup};
use crate::store::KvStore;

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, CacheError> {
    serde_json::to_string(value).map_err(|e| CacheError::SerializationError(e.to_string()))
}

fn encode_all<T: Serialize>(values: &[T]) -> Result<Vec<String>, CacheError> {
    values.iter().map(|v| encode(v)).collect()
}

/// Decodes every raw element, logging and skipping the ones that do not fit `T`.
fn decode_all<T: DeserializeOwned>(key: &str, raw: Vec<String>) -> Vec<T> {
    raw.into_iter()
        .filter_map(|item| decode(key, Some(item)).into_option())
        .collect()
}

/// Typed cache operations over a `KvStore`.
///
/// Values are stored as JSON; the `*_string` operations store text as is. Reads return
/// `None` for a missing key and also for a value that cannot be decoded (the failure is
/// logged); the `*lookup*` variants keep the two apart.
#[derive(Clone)]
pub struct CacheFacade {
    store: Arc<dyn KvStore>,
}

impl CacheFacade {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    // ----- scalar ------

    pub async fn set_string(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.store.set(key, value, None).await
    }

    /// `expire` is in seconds.
    pub async fn set_string_ex(&self, key: &str, value: &str, expire: u64) -> Result<(), CacheError> {
        self.store.set(key, value, Some(Expiry::secs(expire))).await
    }

    pub async fn get_string(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.store.get(key).await
    }

    pub async fn set_value<T: Serialize + ?Sized + Sync>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        self.store.set(key, &encode(value)?, None).await
    }

    /// `expire` is in seconds.
    pub async fn set_value_ex<T: Serialize + ?Sized + Sync>(
        &self,
        key: &str,
        value: &T,
        expire: u64,
    ) -> Result<(), CacheError> {
        self.set_value_with(key, value, Expiry::secs(expire)).await
    }

    pub async fn set_value_with<T: Serialize + ?Sized + Sync>(
        &self,
        key: &str,
        value: &T,
        expiry: Expiry,
    ) -> Result<(), CacheError> {
        self.store.set(key, &encode(value)?, Some(expiry)).await
    }

    pub async fn get_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        Ok(self.lookup_value(key).await?.into_option())
    }

    pub async fn lookup_value<T: DeserializeOwned>(&self, key: &str) -> Result<Lookup<T>, CacheError> {
        let raw = self.store.get(key).await?;
        Ok(decode(key, raw))
    }

    /// Adds 1; a missing key counts as 0.
    pub async fn increment(&self, key: &str) -> Result<i64, CacheError> {
        self.store.incr_by(key, 1).await
    }

    pub async fn increment_by(&self, key: &str, delta: i64) -> Result<i64, CacheError> {
        self.store.incr_by(key, delta).await
    }

    pub async fn increment_by_float(&self, key: &str, delta: f64) -> Result<f64, CacheError> {
        self.store.incr_by_float(key, delta).await
    }

    pub async fn decrement(&self, key: &str) -> Result<i64, CacheError> {
        self.store.incr_by(key, -1).await
    }

    pub async fn decrement_by(&self, key: &str, delta: i64) -> Result<i64, CacheError> {
        let delta = delta
            .checked_neg()
            .ok_or_else(|| CacheError::OperationError("decrement would overflow".to_string()))?;
        self.store.incr_by(key, delta).await
    }

    /// Stores `value` and returns the previous text, if any.
    pub async fn get_and_set(&self, key: &str, value: &str) -> Result<Option<String>, CacheError> {
        self.store.get_set(key, value).await
    }

    /// Atomic set-if-absent; `true` iff this call created the key. `expire` is in seconds.
    pub async fn set_if_absent(&self, key: &str, value: &str, expire: Option<u64>) -> Result<bool, CacheError> {
        self.store.set_nx(key, value, expire.map(Duration::from_secs)).await
    }

    pub async fn set_if_absent_value<T: Serialize + ?Sized + Sync>(
        &self,
        key: &str,
        value: &T,
        expire: Option<u64>,
    ) -> Result<bool, CacheError> {
        self.set_if_absent(key, &encode(value)?, expire).await
    }

    // ----- map ------

    pub async fn map_put_value<T: Serialize + ?Sized + Sync>(
        &self,
        key: &str,
        field: &str,
        value: &T,
    ) -> Result<(), CacheError> {
        self.store.hset(key, field, &encode(value)?).await
    }

    /// Puts the field, then (re)sets the expiration of the whole hash.
    pub async fn map_put_value_with<T: Serialize + ?Sized + Sync>(
        &self,
        key: &str,
        field: &str,
        value: &T,
        expiry: Expiry,
    ) -> Result<(), CacheError> {
        self.map_put_value(key, field, value).await?;
        self.expire_with(key, expiry).await.map(|_| ())
    }

    pub async fn map_put_map<T: Serialize>(&self, key: &str, map: &HashMap<String, T>) -> Result<(), CacheError> {
        let entries = map
            .iter()
            .map(|(field, value)| Ok((field.clone(), encode(value)?)))
            .collect::<Result<Vec<_>, CacheError>>()?;
        self.store.hset_multiple(key, &entries).await
    }

    pub async fn map_put_map_with<T: Serialize>(
        &self,
        key: &str,
        map: &HashMap<String, T>,
        expiry: Expiry,
    ) -> Result<(), CacheError> {
        self.map_put_map(key, map).await?;
        self.expire_with(key, expiry).await.map(|_| ())
    }

    /// Raw field values as stored.
    pub async fn map_get_raw(&self, key: &str) -> Result<HashMap<String, String>, CacheError> {
        self.store.hgetall(key).await
    }

    /// Decoded hash; fields that do not decode are logged and left out.
    pub async fn map_get_map<T: DeserializeOwned>(&self, key: &str) -> Result<HashMap<String, T>, CacheError> {
        let raw = self.store.hgetall(key).await?;
        Ok(raw
            .into_iter()
            .filter_map(|(field, value)| decode(key, Some(value)).into_option().map(|v| (field, v)))
            .collect())
    }

    pub async fn map_get_value<T: DeserializeOwned>(&self, key: &str, field: &str) -> Result<Option<T>, CacheError> {
        Ok(self.map_lookup_value(key, field).await?.into_option())
    }

    pub async fn map_lookup_value<T: DeserializeOwned>(&self, key: &str, field: &str) -> Result<Lookup<T>, CacheError> {
        let raw = self.store.hget(key, field).await?;
        Ok(decode(key, raw))
    }

    /// `true` if the field existed.
    pub async fn map_delete_value(&self, key: &str, field: &str) -> Result<bool, CacheError> {
        self.store.hdel(key, field).await
    }

    // ----- list ------

    pub async fn list_right_push<T: Serialize + ?Sized + Sync>(&self, key: &str, value: &T) -> Result<u64, CacheError> {
        self.store.rpush(key, &[encode(value)?]).await
    }

    /// `expire` is in seconds and applies to the whole list.
    pub async fn list_right_push_ex<T: Serialize + ?Sized + Sync>(
        &self,
        key: &str,
        value: &T,
        expire: u64,
    ) -> Result<u64, CacheError> {
        let len = self.list_right_push(key, value).await?;
        self.expire(key, expire).await?;
        Ok(len)
    }

    pub async fn list_right_push_all<T: Serialize + Sync>(&self, key: &str, values: &[T]) -> Result<u64, CacheError> {
        self.store.rpush(key, &encode_all(values)?).await
    }

    pub async fn list_right_push_all_ex<T: Serialize + Sync>(
        &self,
        key: &str,
        values: &[T],
        expire: u64,
    ) -> Result<u64, CacheError> {
        let len = self.list_right_push_all(key, values).await?;
        self.expire(key, expire).await?;
        Ok(len)
    }

    pub async fn list_size(&self, key: &str) -> Result<u64, CacheError> {
        self.store.llen(key).await
    }

    /// Inclusive range; `0, -1` returns the whole list.
    pub async fn list_range<T: DeserializeOwned>(&self, key: &str, start: i64, end: i64) -> Result<Vec<T>, CacheError> {
        let raw = self.store.lrange(key, start, end).await?;
        Ok(decode_all(key, raw))
    }

    /// index >= 0 counts from the head, -1 is the last element.
    pub async fn list_index<T: DeserializeOwned>(&self, key: &str, index: i64) -> Result<Option<T>, CacheError> {
        let raw = self.store.lindex(key, index).await?;
        Ok(decode(key, raw).into_option())
    }

    pub async fn list_update_index<T: Serialize + ?Sized + Sync>(
        &self,
        key: &str,
        index: i64,
        value: &T,
    ) -> Result<(), CacheError> {
        self.store.lset(key, index, &encode(value)?).await
    }

    /// Removes up to `count` occurrences of `value`; returns how many were removed.
    pub async fn list_remove<T: Serialize + ?Sized + Sync>(
        &self,
        key: &str,
        count: i64,
        value: &T,
    ) -> Result<u64, CacheError> {
        self.store.lrem(key, count, &encode(value)?).await
    }

    // ----- set ------

    /// Returns how many members were new.
    pub async fn set_add<T: Serialize + Sync>(&self, key: &str, values: &[T]) -> Result<u64, CacheError> {
        self.store.sadd(key, &encode_all(values)?).await
    }

    pub async fn set_add_ex<T: Serialize + Sync>(&self, key: &str, expire: u64, values: &[T]) -> Result<u64, CacheError> {
        let count = self.set_add(key, values).await?;
        self.expire(key, expire).await?;
        Ok(count)
    }

    pub async fn set_remove<T: Serialize + Sync>(&self, key: &str, values: &[T]) -> Result<u64, CacheError> {
        self.store.srem(key, &encode_all(values)?).await
    }

    pub async fn set_size(&self, key: &str) -> Result<u64, CacheError> {
        self.store.scard(key).await
    }

    pub async fn set_members<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, CacheError> {
        let raw = self.store.smembers(key).await?;
        Ok(decode_all(key, raw))
    }

    pub async fn set_is_member<T: Serialize + ?Sized + Sync>(&self, key: &str, value: &T) -> Result<bool, CacheError> {
        self.store.sismember(key, &encode(value)?).await
    }

    // ----- common ------

    pub async fn has_key(&self, key: &str) -> Result<bool, CacheError> {
        self.store.exists(key).await
    }

    /// Idempotent; a missing key is not an error.
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store.del(key).await.map(|_| ())
    }

    /// `timeout` is in seconds; `false` if the key does not exist.
    pub async fn expire(&self, key: &str, timeout: u64) -> Result<bool, CacheError> {
        self.expire_with(key, Expiry::secs(timeout)).await
    }

    pub async fn expire_with(&self, key: &str, expiry: Expiry) -> Result<bool, CacheError> {
        match expiry {
            Expiry::After(ttl) => self.store.expire(key, ttl).await,
            Expiry::At(at) => self.store.expire_at(key, at).await,
        }
    }

    /// Remaining lifetime; `KeyTtl::as_seconds` gives the -1 / -2 sentinels.
    pub async fn expire_time(&self, key: &str) -> Result<KeyTtl, CacheError> {
        self.store.ttl(key).await
    }

    // ----- bloom filter ------

    /// Sets every bit of `value` in the filter stored at `key`.
    pub async fn add_by_bloom_filter<V: AsRef<[u8]> + ?Sized>(
        &self,
        helper: &BloomFilterHelper,
        key: &str,
        value: &V,
    ) -> Result<(), CacheError> {
        for offset in helper.offsets(value) {
            self.store.setbit(key, offset, true).await?;
        }
        Ok(())
    }

    /// `true` only if every bit of `value` is set; an unreadable bit counts as unset.
    pub async fn include_by_bloom_filter<V: AsRef<[u8]> + ?Sized>(
        &self,
        helper: &BloomFilterHelper,
        key: &str,
        value: &V,
    ) -> bool {
        for offset in helper.offsets(value) {
            match self.store.getbit(key, offset).await {
                Ok(true) => continue,
                Ok(false) => return false,
                Err(e) => {
                    error!("Failed to read bloom filter {} at {}: {}", key, offset, e);
                    return false;
                }
            }
        }
        true
    }
}

impl std::fmt::Debug for CacheFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheFacade").finish_non_exhaustive()
    }
}
