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

use config_manager::types::context::DEFAULT_RETRY_INTERVAL_MILLIS;

use super::error::{DistributedLockError, Result};

/// Pause between two acquisition attempts.
pub const DEFAULT_INTERVAL_MILLIS: u64 = DEFAULT_RETRY_INTERVAL_MILLIS;
/// Upper bound (exclusive) of the random delay added to each pause.
pub use config_manager::types::context::DEFAULT_JITTER_BOUND_MILLIS;

/// Longest hold time the store accepts; PX/PEXPIRE take a signed 64-bit millisecond count.
pub const MAX_TTL_MILLIS: u64 = i64::MAX as u64;

/// Whole milliseconds in `duration`, saturating instead of wrapping.
pub fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Attempt count that keeps polling for about as long as the lock can be held:
/// `ttl_secs * 1000 / interval_millis + 1`.
pub fn default_attempts(ttl_secs: u64, interval_millis: u64) -> u32 {
    let polls = ttl_secs.saturating_mul(1000) / interval_millis.max(1);
    u32::try_from(polls.saturating_add(1)).unwrap_or(u32::MAX)
}

/// How a single acquisition polls the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquireOptions {
    /// How long the lock is held before the store expires it
    pub ttl: Duration,
    pub interval: Duration,
    pub jitter_bound: Duration,
    /// Total attempts, the first one included. 0 is treated as 1.
    pub max_attempts: u32,
    /// Token stored as the lock value; generated per acquisition when `None`
    pub token: Option<String>,
    /// Overall time budget for the poll loop
    pub wait: Option<Duration>,
}

impl AcquireOptions {
    /// Default polling for a lock held up to `ttl_secs`.
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_secs),
            interval: Duration::from_millis(DEFAULT_INTERVAL_MILLIS),
            jitter_bound: Duration::from_millis(DEFAULT_JITTER_BOUND_MILLIS),
            max_attempts: default_attempts(ttl_secs, DEFAULT_INTERVAL_MILLIS),
            token: None,
            wait: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_jitter_bound(mut self, jitter_bound: Duration) -> Self {
        self.jitter_bound = jitter_bound;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = Some(wait);
        self
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// A lock that expires immediately or an empty token can never be held meaningfully.
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(DistributedLockError::InvalidArgument("ttl must be greater than 0".to_string()));
        }
        if saturating_millis(self.ttl) > MAX_TTL_MILLIS {
            return Err(DistributedLockError::InvalidArgument(format!(
                "ttl must not exceed {} milliseconds",
                MAX_TTL_MILLIS
            )));
        }
        if matches!(&self.token, Some(token) if token.is_empty()) {
            return Err(DistributedLockError::InvalidArgument("token must not be empty".to_string()));
        }
        Ok(())
    }
}
