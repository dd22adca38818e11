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

//! In-process store with the same command semantics as the Redis server.
//!
//! All data sits behind one mutex, so every command is atomic with respect to the others.
//! Expired keys are dropped lazily when a command touches them.

use std::collections::hash_map::Entry as MapEntry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::CacheError;
use crate::expiry::{Expiry, KeyTtl};
use crate::store::KvStore;

const WRONG_TYPE: &str = "Operation against a key holding the wrong kind of value";
/// Same limit as the server: bitmaps are capped at 512MB
const MAX_BIT_OFFSET: u64 = (1 << 32) - 1;

#[derive(Debug, Clone)]
enum Value {
    Str(Vec<u8>),
    Hash(HashMap<String, String>),
    List(Vec<String>),
    Set(HashSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Value) -> Self {
        Self { value, expires_at: None }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |at| at <= now)
    }
}

#[derive(Debug, Default)]
struct Keyspace {
    entries: HashMap<String, Entry>,
}

impl Keyspace {
    fn live(&mut self, key: &str) -> Option<&mut Entry> {
        let now = Instant::now();
        if self.entries.get(key).map_or(false, |e| e.is_expired(now)) {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    fn live_ref(&mut self, key: &str) -> Option<&Entry> {
        self.live(key).map(|entry| &*entry)
    }

    fn or_insert(&mut self, key: &str, value: fn() -> Value) -> &mut Entry {
        let _ = self.live(key);
        match self.entries.entry(key.to_string()) {
            MapEntry::Occupied(slot) => slot.into_mut(),
            MapEntry::Vacant(slot) => slot.insert(Entry::new(value())),
        }
    }

    /// Containers that become empty disappear, like on the server.
    fn drop_if_empty(&mut self, key: &str) {
        let empty = match self.entries.get(key).map(|e| &e.value) {
            Some(Value::Hash(h)) => h.is_empty(),
            Some(Value::List(l)) => l.is_empty(),
            Some(Value::Set(s)) => s.is_empty(),
            _ => false,
        };
        if empty {
            self.entries.remove(key);
        }
    }

    fn string(&mut self, key: &str) -> Result<Option<&Vec<u8>>, CacheError> {
        match self.live_ref(key).map(|e| &e.value) {
            None => Ok(None),
            Some(Value::Str(bytes)) => Ok(Some(bytes)),
            Some(_) => Err(wrong_type()),
        }
    }

    fn write_string(&mut self, key: &str, value: &str, expires_at: Option<Instant>) {
        self.entries.insert(
            key.to_string(),
            Entry { value: Value::Str(value.as_bytes().to_vec()), expires_at },
        );
    }
}

fn wrong_type() -> CacheError {
    CacheError::WrongType(WRONG_TYPE.to_string())
}

/// Cap for deadlines that do not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

fn deadline(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl).unwrap_or_else(|| now + FAR_FUTURE)
}

fn deadline_at(at: DateTime<Utc>) -> Instant {
    deadline(Expiry::At(at).remaining_from(Utc::now()))
}

/// Resolves a possibly negative index against `len`.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let resolved = if index < 0 { len + index } else { index };
    (0..len).contains(&resolved).then_some(resolved as usize)
}

/// Shared in-memory keyspace. Clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Keyspace>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let mut keyspace = self.inner.lock();
        keyspace.entries.retain(|_, entry| !entry.is_expired(now));
        keyspace.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn flush(&self) {
        self.inner.lock().entries.clear();
    }

    /// Deletes `key` only while it still holds `expected`.
    pub fn compare_and_delete(&self, key: &str, expected: &str) -> bool {
        let mut keyspace = self.inner.lock();
        let matches = matches!(
            keyspace.live_ref(key).map(|e| &e.value),
            Some(Value::Str(bytes)) if bytes.as_slice() == expected.as_bytes()
        );
        if matches {
            keyspace.entries.remove(key);
        }
        matches
    }

    /// Resets the TTL of `key` only while it still holds `expected`.
    pub fn compare_and_expire(&self, key: &str, expected: &str, ttl: Duration) -> bool {
        let mut keyspace = self.inner.lock();
        match keyspace.live(key) {
            Some(entry) if matches!(&entry.value, Value::Str(bytes) if bytes.as_slice() == expected.as_bytes()) => {
                entry.expires_at = Some(deadline(ttl));
                true
            }
            _ => false,
        }
    }

    fn try_set_nx(&self, key: &str, value: &str, ttl: Option<Duration>) -> bool {
        let mut keyspace = self.inner.lock();
        if keyspace.live(key).is_some() {
            return false;
        }
        keyspace.write_string(key, value, ttl.map(deadline));
        true
    }

    fn ttl_of(&self, key: &str) -> KeyTtl {
        let mut keyspace = self.inner.lock();
        match keyspace.live_ref(key) {
            None => KeyTtl::Missing,
            Some(Entry { expires_at: None, .. }) => KeyTtl::Persistent,
            Some(Entry { expires_at: Some(at), .. }) => {
                KeyTtl::Expires(at.saturating_duration_since(Instant::now()))
            }
        }
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut keyspace = self.inner.lock();
        Ok(keyspace.string(key)?.map(|bytes| String::from_utf8_lossy(bytes).into_owned()))
    }

    async fn set(&self, key: &str, value: &str, expiry: Option<Expiry>) -> Result<(), CacheError> {
        let expires_at = match expiry {
            None => None,
            Some(Expiry::After(ttl)) => Some(deadline(ttl)),
            Some(Expiry::At(at)) => Some(deadline_at(at)),
        };
        self.inner.lock().write_string(key, value, expires_at);
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool, CacheError> {
        Ok(self.try_set_nx(key, value, ttl))
    }

    async fn get_set(&self, key: &str, value: &str) -> Result<Option<String>, CacheError> {
        let mut keyspace = self.inner.lock();
        let previous = keyspace
            .string(key)?
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned());
        keyspace.write_string(key, value, None);
        Ok(previous)
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, CacheError> {
        let mut keyspace = self.inner.lock();
        let current = match keyspace.string(key)? {
            None => 0,
            Some(bytes) => String::from_utf8_lossy(bytes).parse::<i64>().map_err(|_| {
                CacheError::OperationError("value is not an integer or out of range".to_string())
            })?,
        };
        let next = current
            .checked_add(delta)
            .ok_or_else(|| CacheError::OperationError("increment or decrement would overflow".to_string()))?;
        let expires_at = keyspace.live_ref(key).and_then(|e| e.expires_at);
        keyspace.write_string(key, &next.to_string(), expires_at);
        Ok(next)
    }

    async fn incr_by_float(&self, key: &str, delta: f64) -> Result<f64, CacheError> {
        let mut keyspace = self.inner.lock();
        let current = match keyspace.string(key)? {
            None => 0.0,
            Some(bytes) => String::from_utf8_lossy(bytes)
                .parse::<f64>()
                .map_err(|_| CacheError::OperationError("value is not a valid float".to_string()))?,
        };
        let next = current + delta;
        if !next.is_finite() {
            return Err(CacheError::OperationError("increment would produce NaN or Infinity".to_string()));
        }
        let expires_at = keyspace.live_ref(key).and_then(|e| e.expires_at);
        keyspace.write_string(key, &next.to_string(), expires_at);
        Ok(next)
    }

    async fn del(&self, key: &str) -> Result<bool, CacheError> {
        let mut keyspace = self.inner.lock();
        let existed = keyspace.live(key).is_some();
        keyspace.entries.remove(key);
        Ok(existed)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.inner.lock().live(key).is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let mut keyspace = self.inner.lock();
        match keyspace.live(key) {
            Some(entry) => {
                entry.expires_at = Some(deadline(ttl));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn expire_at(&self, key: &str, at: DateTime<Utc>) -> Result<bool, CacheError> {
        let mut keyspace = self.inner.lock();
        match keyspace.live(key) {
            Some(entry) => {
                entry.expires_at = Some(deadline_at(at));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, CacheError> {
        Ok(self.ttl_of(key))
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError> {
        let mut keyspace = self.inner.lock();
        match &mut keyspace.or_insert(key, || Value::Hash(HashMap::new())).value {
            Value::Hash(hash) => {
                hash.insert(field.to_string(), value.to_string());
                Ok(())
            }
            _ => Err(wrong_type()),
        }
    }

    async fn hset_multiple(&self, key: &str, entries: &[(String, String)]) -> Result<(), CacheError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut keyspace = self.inner.lock();
        match &mut keyspace.or_insert(key, || Value::Hash(HashMap::new())).value {
            Value::Hash(hash) => {
                hash.extend(entries.iter().cloned());
                Ok(())
            }
            _ => Err(wrong_type()),
        }
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, CacheError> {
        let mut keyspace = self.inner.lock();
        match keyspace.live_ref(key).map(|e| &e.value) {
            None => Ok(None),
            Some(Value::Hash(hash)) => Ok(hash.get(field).cloned()),
            Some(_) => Err(wrong_type()),
        }
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, CacheError> {
        let mut keyspace = self.inner.lock();
        match keyspace.live_ref(key).map(|e| &e.value) {
            None => Ok(HashMap::new()),
            Some(Value::Hash(hash)) => Ok(hash.clone()),
            Some(_) => Err(wrong_type()),
        }
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<bool, CacheError> {
        let mut keyspace = self.inner.lock();
        let removed = match keyspace.live(key).map(|e| &mut e.value) {
            None => false,
            Some(Value::Hash(hash)) => hash.remove(field).is_some(),
            Some(_) => return Err(wrong_type()),
        };
        keyspace.drop_if_empty(key);
        Ok(removed)
    }

    async fn hexists(&self, key: &str, field: &str) -> Result<bool, CacheError> {
        let mut keyspace = self.inner.lock();
        match keyspace.live_ref(key).map(|e| &e.value) {
            None => Ok(false),
            Some(Value::Hash(hash)) => Ok(hash.contains_key(field)),
            Some(_) => Err(wrong_type()),
        }
    }

    async fn rpush(&self, key: &str, values: &[String]) -> Result<u64, CacheError> {
        if values.is_empty() {
            return self.llen(key).await;
        }
        let mut keyspace = self.inner.lock();
        match &mut keyspace.or_insert(key, || Value::List(Vec::new())).value {
            Value::List(list) => {
                list.extend(values.iter().cloned());
                Ok(list.len() as u64)
            }
            _ => Err(wrong_type()),
        }
    }

    async fn llen(&self, key: &str) -> Result<u64, CacheError> {
        let mut keyspace = self.inner.lock();
        match keyspace.live_ref(key).map(|e| &e.value) {
            None => Ok(0),
            Some(Value::List(list)) => Ok(list.len() as u64),
            Some(_) => Err(wrong_type()),
        }
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, CacheError> {
        let mut keyspace = self.inner.lock();
        let list = match keyspace.live_ref(key).map(|e| &e.value) {
            None => return Ok(Vec::new()),
            Some(Value::List(list)) => list,
            Some(_) => return Err(wrong_type()),
        };
        let len = list.len() as i64;
        let start = if start < 0 { (len + start).max(0) } else { start };
        let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
        if start > stop || start >= len {
            return Ok(Vec::new());
        }
        Ok(list[start as usize..=stop as usize].to_vec())
    }

    async fn lindex(&self, key: &str, index: i64) -> Result<Option<String>, CacheError> {
        let mut keyspace = self.inner.lock();
        match keyspace.live_ref(key).map(|e| &e.value) {
            None => Ok(None),
            Some(Value::List(list)) => Ok(resolve_index(index, list.len()).map(|i| list[i].clone())),
            Some(_) => Err(wrong_type()),
        }
    }

    async fn lset(&self, key: &str, index: i64, value: &str) -> Result<(), CacheError> {
        let mut keyspace = self.inner.lock();
        match keyspace.live(key).map(|e| &mut e.value) {
            None => Err(CacheError::KeyNotFound),
            Some(Value::List(list)) => {
                let i = resolve_index(index, list.len())
                    .ok_or_else(|| CacheError::OperationError("index out of range".to_string()))?;
                list[i] = value.to_string();
                Ok(())
            }
            Some(_) => Err(wrong_type()),
        }
    }

    async fn lrem(&self, key: &str, count: i64, value: &str) -> Result<u64, CacheError> {
        let mut keyspace = self.inner.lock();
        let removed = match keyspace.live(key).map(|e| &mut e.value) {
            None => 0,
            Some(Value::List(list)) => {
                let limit = if count == 0 { usize::MAX } else { count.unsigned_abs() as usize };
                let mut removed = 0usize;
                if count < 0 {
                    let mut i = list.len();
                    while i > 0 && removed < limit {
                        i -= 1;
                        if list[i] == value {
                            list.remove(i);
                            removed += 1;
                        }
                    }
                } else {
                    let mut i = 0;
                    while i < list.len() && removed < limit {
                        if list[i] == value {
                            list.remove(i);
                            removed += 1;
                        } else {
                            i += 1;
                        }
                    }
                }
                removed as u64
            }
            Some(_) => return Err(wrong_type()),
        };
        keyspace.drop_if_empty(key);
        Ok(removed)
    }

    async fn sadd(&self, key: &str, members: &[String]) -> Result<u64, CacheError> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut keyspace = self.inner.lock();
        match &mut keyspace.or_insert(key, || Value::Set(HashSet::new())).value {
            Value::Set(set) => Ok(members.iter().filter(|m| set.insert((*m).clone())).count() as u64),
            _ => Err(wrong_type()),
        }
    }

    async fn srem(&self, key: &str, members: &[String]) -> Result<u64, CacheError> {
        let mut keyspace = self.inner.lock();
        let removed = match keyspace.live(key).map(|e| &mut e.value) {
            None => 0,
            Some(Value::Set(set)) => members.iter().filter(|m| set.remove(m.as_str())).count() as u64,
            Some(_) => return Err(wrong_type()),
        };
        keyspace.drop_if_empty(key);
        Ok(removed)
    }

    async fn scard(&self, key: &str) -> Result<u64, CacheError> {
        let mut keyspace = self.inner.lock();
        match keyspace.live_ref(key).map(|e| &e.value) {
            None => Ok(0),
            Some(Value::Set(set)) => Ok(set.len() as u64),
            Some(_) => Err(wrong_type()),
        }
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, CacheError> {
        let mut keyspace = self.inner.lock();
        match keyspace.live_ref(key).map(|e| &e.value) {
            None => Ok(Vec::new()),
            Some(Value::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(wrong_type()),
        }
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        let mut keyspace = self.inner.lock();
        match keyspace.live_ref(key).map(|e| &e.value) {
            None => Ok(false),
            Some(Value::Set(set)) => Ok(set.contains(member)),
            Some(_) => Err(wrong_type()),
        }
    }

    async fn setbit(&self, key: &str, offset: u64, value: bool) -> Result<bool, CacheError> {
        if offset > MAX_BIT_OFFSET {
            return Err(CacheError::OperationError("bit offset is not an integer or out of range".to_string()));
        }
        let mut keyspace = self.inner.lock();
        match &mut keyspace.or_insert(key, || Value::Str(Vec::new())).value {
            Value::Str(bytes) => {
                let byte = (offset / 8) as usize;
                // bit 0 is the most significant bit of the first byte
                let mask = 0x80u8 >> (offset % 8);
                if bytes.len() <= byte {
                    bytes.resize(byte + 1, 0);
                }
                let previous = bytes[byte] & mask != 0;
                if value {
                    bytes[byte] |= mask;
                } else {
                    bytes[byte] &= !mask;
                }
                Ok(previous)
            }
            _ => Err(wrong_type()),
        }
    }

    async fn getbit(&self, key: &str, offset: u64) -> Result<bool, CacheError> {
        if offset > MAX_BIT_OFFSET {
            return Err(CacheError::OperationError("bit offset is not an integer or out of range".to_string()));
        }
        let mut keyspace = self.inner.lock();
        let bytes = match keyspace.string(key)? {
            None => return Ok(false),
            Some(bytes) => bytes,
        };
        let mask = 0x80u8 >> (offset % 8);
        Ok(bytes.get((offset / 8) as usize).map_or(false, |b| b & mask != 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_nx_only_first_wins() {
        let store = MemoryStore::new();
        assert!(store.set_nx("k", "a", None).await.unwrap());
        assert!(!store.set_nx("k", "b", None).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_expired_key_is_absent() {
        let store = MemoryStore::new();
        store.set("k", "v", Some(Expiry::after(Duration::from_millis(30)))).await.unwrap();
        assert!(store.exists("k").await.unwrap());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!store.exists("k").await.unwrap());
        assert_eq!(store.ttl("k").await.unwrap(), KeyTtl::Missing);
        assert!(store.set_nx("k", "again", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_ttl_states() {
        let store = MemoryStore::new();
        store.set("plain", "v", None).await.unwrap();
        store.set("timed", "v", Some(Expiry::secs(10))).await.unwrap();
        assert_eq!(store.ttl("plain").await.unwrap(), KeyTtl::Persistent);
        assert_eq!(store.ttl("none").await.unwrap(), KeyTtl::Missing);
        let left = store.ttl("timed").await.unwrap().remaining().unwrap();
        assert!(left > Duration::from_secs(9) && left <= Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_expire_at_past_instant_removes_key() {
        let store = MemoryStore::new();
        store.set("k", "v", None).await.unwrap();
        assert!(store.expire_at("k", Utc::now() - chrono::Duration::seconds(5)).await.unwrap());
        assert!(!store.exists("k").await.unwrap());
        assert!(!store.expire("k", Duration::from_secs(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_compare_and_delete() {
        let store = MemoryStore::new();
        store.set("lock", "owner-a", None).await.unwrap();
        assert!(!store.compare_and_delete("lock", "owner-b"));
        assert!(store.exists("lock").await.unwrap());
        assert!(store.compare_and_delete("lock", "owner-a"));
        assert!(!store.exists("lock").await.unwrap());
        assert!(!store.compare_and_delete("lock", "owner-a"));
    }

    #[tokio::test]
    async fn test_compare_and_expire() {
        let store = MemoryStore::new();
        store.set("lock", "owner-a", Some(Expiry::secs(1))).await.unwrap();
        assert!(!store.compare_and_expire("lock", "owner-b", Duration::from_secs(60)));
        assert!(store.compare_and_expire("lock", "owner-a", Duration::from_secs(60)));
        assert!(store.ttl("lock").await.unwrap().remaining().unwrap() > Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_counters() {
        let store = MemoryStore::new();
        assert_eq!(store.incr_by("n", 1).await.unwrap(), 1);
        assert_eq!(store.incr_by("n", -3).await.unwrap(), -2);
        assert_eq!(store.incr_by_float("f", 1.5).await.unwrap(), 1.5);
        store.set("s", "abc", None).await.unwrap();
        assert!(matches!(store.incr_by("s", 1).await, Err(CacheError::OperationError(_))));
    }

    #[tokio::test]
    async fn test_wrong_type() {
        let store = MemoryStore::new();
        store.sadd("set", &["a".to_string()]).await.unwrap();
        assert!(matches!(store.get("set").await, Err(CacheError::WrongType(_))));
        assert!(matches!(store.rpush("set", &["x".to_string()]).await, Err(CacheError::WrongType(_))));
    }

    #[tokio::test]
    async fn test_list_commands() {
        let store = MemoryStore::new();
        let values: Vec<String> = ["a", "b", "a", "c", "a"].iter().map(|s| s.to_string()).collect();
        assert_eq!(store.rpush("l", &values).await.unwrap(), 5);
        assert_eq!(store.lrange("l", 0, -1).await.unwrap(), values);
        assert_eq!(store.lrange("l", -2, 100).await.unwrap(), vec!["c", "a"]);
        assert!(store.lrange("l", 3, 1).await.unwrap().is_empty());
        assert_eq!(store.lindex("l", -1).await.unwrap().as_deref(), Some("a"));
        assert_eq!(store.lindex("l", 9).await.unwrap(), None);

        store.lset("l", 1, "B").await.unwrap();
        assert!(store.lset("l", 10, "x").await.is_err());
        assert!(matches!(store.lset("missing", 0, "x").await, Err(CacheError::KeyNotFound)));

        assert_eq!(store.lrem("l", -1, "a").await.unwrap(), 1);
        assert_eq!(store.lrange("l", 0, -1).await.unwrap(), vec!["a", "B", "a", "c"]);
        assert_eq!(store.lrem("l", 0, "a").await.unwrap(), 2);
        assert_eq!(store.lrem("l", 0, "B").await.unwrap(), 1);
        assert_eq!(store.lrem("l", 0, "c").await.unwrap(), 1);
        assert!(!store.exists("l").await.unwrap());
    }

    #[tokio::test]
    async fn test_hash_and_set_commands() {
        let store = MemoryStore::new();
        store.hset_multiple("h", &[("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())]).await.unwrap();
        assert_eq!(store.hgetall("h").await.unwrap().len(), 2);
        assert!(store.hexists("h", "a").await.unwrap());
        assert!(store.hdel("h", "a").await.unwrap());
        assert!(!store.hdel("h", "a").await.unwrap());
        assert!(store.hdel("h", "b").await.unwrap());
        assert!(!store.exists("h").await.unwrap());

        let members = vec!["x".to_string(), "y".to_string(), "x".to_string()];
        assert_eq!(store.sadd("s", &members).await.unwrap(), 2);
        assert_eq!(store.scard("s").await.unwrap(), 2);
        assert!(store.sismember("s", "y").await.unwrap());
        assert_eq!(store.srem("s", &["y".to_string(), "z".to_string()]).await.unwrap(), 1);
        assert_eq!(store.smembers("s").await.unwrap(), vec!["x".to_string()]);
    }

    #[tokio::test]
    async fn test_bits_use_server_bit_order() {
        let store = MemoryStore::new();
        assert!(!store.setbit("b", 0, true).await.unwrap());
        assert!(store.setbit("b", 0, true).await.unwrap());
        store.setbit("b", 9, true).await.unwrap();
        assert!(store.getbit("b", 9).await.unwrap());
        assert!(!store.getbit("b", 8).await.unwrap());
        assert!(!store.getbit("b", 1_000).await.unwrap());
        assert!(store.setbit("b", MAX_BIT_OFFSET + 1, true).await.is_err());

        let raw = store.inner.lock().entries.get("b").cloned().unwrap();
        match raw.value {
            Value::Str(bytes) => assert_eq!(bytes, vec![0x80, 0x40]),
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_clones_share_data() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set("k", "v", None).await.unwrap();
        assert_eq!(other.len(), 1);
        other.flush();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_huge_ttl_does_not_overflow() {
        let store = MemoryStore::new();
        store.set("k", "v", Some(Expiry::after(Duration::MAX))).await.unwrap();
        assert!(store.ttl("k").await.unwrap().remaining().unwrap() > Duration::from_secs(3600));
        assert!(store.expire("k", Duration::MAX).await.unwrap());
        assert!(store.exists("k").await.unwrap());
    }
}
