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

use serde::Deserialize;
use crate::ConfigSingleton;

/// Environment variable that overrides `redis.url`.
pub const REDIS_URL_ENV: &str = "REDIS_URL";
/// Default prefix of lock keys
pub const DEFAULT_LOCK_NAMESPACE: &str = "LOCK";
/// Default wait between two lock acquisition attempts (milliseconds)
pub const DEFAULT_RETRY_INTERVAL_MILLIS: u64 = 100;
/// Default upper bound of the random jitter added to each wait (milliseconds)
pub const DEFAULT_JITTER_BOUND_MILLIS: u64 = 100;

/// Main configuration structure that matches the cache_config.yaml file structure.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CacheConfig {
    /// Redis connection settings
    #[serde(default)]
    pub redis: RedisSettings,
    /// Distributed lock settings
    #[serde(default)]
    pub lock: LockSettings,
}

/// Redis connection settings
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedisSettings {
    /// Connection url, e.g. redis://127.0.0.1:6379/0
    pub url: Option<String>,
}

/// Distributed lock settings
#[derive(Debug, Deserialize, Clone)]
pub struct LockSettings {
    /// Prefix of every lock key
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Base wait between two acquisition attempts (milliseconds)
    #[serde(default = "default_retry_interval_millis")]
    pub retry_interval_millis: u64,
    /// Upper bound (exclusive) of the random jitter added to each wait (milliseconds)
    #[serde(default = "default_jitter_bound_millis")]
    pub jitter_bound_millis: u64,
}

fn default_namespace() -> String {
    DEFAULT_LOCK_NAMESPACE.to_string()
}

fn default_retry_interval_millis() -> u64 {
    DEFAULT_RETRY_INTERVAL_MILLIS
}

fn default_jitter_bound_millis() -> u64 {
    DEFAULT_JITTER_BOUND_MILLIS
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            retry_interval_millis: default_retry_interval_millis(),
            jitter_bound_millis: default_jitter_bound_millis(),
        }
    }
}

impl RedisSettings {
    /// Resolves the connection url.
    ///
    /// `REDIS_URL` (after loading `.env`) takes precedence over the configured value.
    pub fn resolve_url(&self) -> Option<String> {
        let _ = dotenv::dotenv();
        std::env::var(REDIS_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.url.clone())
    }
}

impl CacheConfig {
    /// Validates the configuration values
    ///
    /// # Errors
    ///
    /// * the lock namespace is empty
    /// * `retry_interval_millis` is zero, which would make the default attempt count unbounded
    pub fn validate(&self) -> Result<(), String> {
        if self.lock.namespace.trim().is_empty() {
            return Err("Invalid configuration: lock.namespace must not be empty".to_string());
        }
        if self.lock.retry_interval_millis == 0 {
            return Err("Invalid configuration: lock.retry_interval_millis must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Global configuration singleton instance
///
/// Call `CONFIG.initialize(path)` once at startup; `CONFIG.get_or_default()` falls back to
/// the built-in defaults when no file was loaded.
pub static CONFIG: ConfigSingleton<CacheConfig> = ConfigSingleton::new();

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::parse_yaml;
    use serial_test::serial;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config: CacheConfig = parse_yaml("{}").unwrap();
        assert!(config.redis.url.is_none());
        assert_eq!(config.lock.namespace, "LOCK");
        assert_eq!(config.lock.retry_interval_millis, 100);
        assert_eq!(config.lock.jitter_bound_millis, 100);
    }

    #[test]
    fn test_full_document() {
        let yaml = r#"
redis:
  url: redis://cache.internal:6379/2
lock:
  namespace: JOBS
  retry_interval_millis: 50
  jitter_bound_millis: 0
"#;
        let config: CacheConfig = parse_yaml(yaml).unwrap();
        assert_eq!(config.redis.url.as_deref(), Some("redis://cache.internal:6379/2"));
        assert_eq!(config.lock.namespace, "JOBS");
        assert_eq!(config.lock.retry_interval_millis, 50);
        assert_eq!(config.lock.jitter_bound_millis, 0);
    }

    #[test]
    fn test_empty_namespace_rejected() {
        let err = parse_yaml::<CacheConfig>("lock:\n  namespace: ''\n").unwrap_err();
        assert!(err.contains("namespace"));
    }

    #[test]
    #[serial]
    fn test_env_overrides_configured_url() {
        let settings = RedisSettings { url: Some("redis://from-yaml:6379".to_string()) };

        std::env::set_var(REDIS_URL_ENV, "redis://from-env:6379");
        assert_eq!(settings.resolve_url().as_deref(), Some("redis://from-env:6379"));

        std::env::remove_var(REDIS_URL_ENV);
        assert_eq!(settings.resolve_url().as_deref(), Some("redis://from-yaml:6379"));
    }
}
