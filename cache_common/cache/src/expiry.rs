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

//! Expiration helpers shared by the facade and the store implementations.

use std::time::Duration;
use chrono::{DateTime, Utc};

/// 30 minutes, in seconds
pub const MINUTES_30: u64 = 30 * 60;
/// 1 minute, in seconds
pub const MINUTE: u64 = 60;
/// 1 hour, in seconds
pub const HOUR: u64 = 60 * 60;
/// 1 day, in seconds
pub const DAY: u64 = 24 * 60 * 60;
/// 7 days, in seconds
pub const WEEK: u64 = 7 * 24 * 60 * 60;
/// 30 days, in seconds
pub const MONTH: u64 = 30 * 24 * 60 * 60;

/// When a key should expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Relative to the moment the command runs
    After(Duration),
    /// Absolute instant
    At(DateTime<Utc>),
}

impl Expiry {
    pub fn secs(seconds: u64) -> Self {
        Expiry::After(Duration::from_secs(seconds))
    }

    pub fn after(duration: Duration) -> Self {
        Expiry::After(duration)
    }

    pub fn at(instant: DateTime<Utc>) -> Self {
        Expiry::At(instant)
    }

    /// Time left from `now`; zero when the instant is already in the past.
    pub fn remaining_from(&self, now: DateTime<Utc>) -> Duration {
        match self {
            Expiry::After(duration) => *duration,
            Expiry::At(instant) => (*instant - now).to_std().unwrap_or(Duration::ZERO),
        }
    }
}

impl From<Duration> for Expiry {
    fn from(duration: Duration) -> Self {
        Expiry::After(duration)
    }
}

impl From<DateTime<Utc>> for Expiry {
    fn from(instant: DateTime<Utc>) -> Self {
        Expiry::At(instant)
    }
}

/// Remaining lifetime of a key as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist
    Missing,
    /// The key exists without an expiration
    Persistent,
    /// The key expires after the given duration
    Expires(Duration),
}

impl KeyTtl {
    /// Interprets a raw PTTL reply: -2 missing, -1 persistent.
    pub fn from_millis(raw: i64) -> Self {
        match raw {
            -1 => KeyTtl::Persistent,
            n if n >= 0 => KeyTtl::Expires(Duration::from_millis(n as u64)),
            _ => KeyTtl::Missing,
        }
    }

    /// Seconds left rounded to the nearest second, like the server's TTL command.
    /// Sentinels: -1 no expiration, -2 no key.
    pub fn as_seconds(&self) -> i64 {
        match self {
            KeyTtl::Missing => -2,
            KeyTtl::Persistent => -1,
            KeyTtl::Expires(left) => ((left.as_millis() + 500) / 1000) as i64,
        }
    }

    pub fn remaining(&self) -> Option<Duration> {
        match self {
            KeyTtl::Expires(left) => Some(*left),
            _ => None,
        }
    }
}

/// Milliseconds for a PX/PEXPIRE argument; the store rejects zero.
pub(crate) fn millis_arg(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).clamp(1, i64::MAX as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_ttl_sentinels() {
        assert_eq!(KeyTtl::from_millis(-2), KeyTtl::Missing);
        assert_eq!(KeyTtl::from_millis(-1), KeyTtl::Persistent);
        assert_eq!(KeyTtl::from_millis(1400).as_seconds(), 1);
        assert_eq!(KeyTtl::from_millis(9_998).as_seconds(), 10);
        assert_eq!(KeyTtl::Missing.as_seconds(), -2);
        assert_eq!(KeyTtl::Persistent.as_seconds(), -1);
        assert!(KeyTtl::Persistent.remaining().is_none());
    }

    #[test]
    fn test_absolute_expiry_in_the_past() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let past = Utc.with_ymd_and_hms(2025, 1, 1, 11, 0, 0).unwrap();
        assert_eq!(Expiry::at(past).remaining_from(now), Duration::ZERO);
        assert_eq!(Expiry::at(now + chrono::Duration::seconds(90)).remaining_from(now), Duration::from_secs(90));
        assert_eq!(Expiry::secs(HOUR).remaining_from(now), Duration::from_secs(3600));
    }

    #[test]
    fn test_millis_arg_never_zero() {
        assert_eq!(millis_arg(Duration::ZERO), 1);
        assert_eq!(millis_arg(Duration::from_secs(2)), 2000);
        assert_eq!(millis_arg(Duration::from_secs(u64::MAX / 1000 + 1)), i64::MAX as u64);
        assert_eq!(millis_arg(Duration::MAX), i64::MAX as u64);
    }
}
