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

//! Distributed lock module, providing a distributed lock implementation based on Redis
//!
//! `DistributedLock` works over any `LockStore`; `RedisClient` and `MemoryStore` from the
//! `cache` crate both implement it.

pub mod client;
pub mod error;
pub mod exclusive;
pub mod lock;
pub mod options;
pub mod scripts;

pub use client::LockStore;
pub use error::{DistributedLockError, Result};
pub use lock::{DistributedLock, ReleaseStatus};
pub use options::{AcquireOptions, DEFAULT_INTERVAL_MILLIS, DEFAULT_JITTER_BOUND_MILLIS};
