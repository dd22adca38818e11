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

//! Redis-backed cache with a typed facade.
//!
//! `RedisClient` talks to the server, `MemoryStore` keeps the same semantics in process.
//! Both implement `KvStore`, which `CacheFacade` builds on.

pub mod bloom;
pub mod client;
pub mod error;
pub mod expiry;
pub mod facade;
pub mod key;
pub mod lookup;
pub mod memory;
pub mod operations;
pub mod store;

pub use bloom::BloomFilterHelper;
pub use client::RedisClient;
pub use error::CacheError;
pub use expiry::{Expiry, KeyTtl, DAY, HOUR, MINUTE, MINUTES_30, MONTH, WEEK};
pub use facade::CacheFacade;
pub use key::KeyBuilder;
pub use lookup::Lookup;
pub use memory::MemoryStore;
pub use store::KvStore;
