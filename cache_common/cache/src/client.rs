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

use std::fmt;
use std::sync::{Arc, Mutex};

use config_manager::types::context::{CONFIG, RedisSettings};
use lazy_static::lazy_static;
use redis::aio::ConnectionManager;
use redis::Client;
use tokio::sync::OnceCell;

use crate::error::CacheError;

lazy_static! {
    static ref REDIS_CLIENT: Arc<Mutex<Option<RedisClient>>> = Arc::new(Mutex::new(None));
}

/// Redis-backed store. Cloning is cheap and clones share one multiplexed connection.
#[derive(Clone)]
pub struct RedisClient {
    pub(crate) client: Client,
    manager: Arc<OnceCell<ConnectionManager>>,
}

impl fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisClient")
            .field("client", &self.client)
            .field("connected", &self.manager.initialized())
            .finish()
    }
}

impl RedisClient {
    /// Creates a client for `url`. No connection is made until the first command.
    pub fn open(url: &str) -> Result<RedisClient, CacheError> {
        let client = Client::open(url).map_err(CacheError::ConnectionError)?;
        Ok(RedisClient {
            client,
            manager: Arc::new(OnceCell::new()),
        })
    }

    /// Creates a client from settings; `REDIS_URL` overrides the configured url.
    pub fn from_settings(settings: &RedisSettings) -> Result<RedisClient, CacheError> {
        let url = settings.resolve_url().ok_or_else(|| {
            CacheError::OperationError("REDIS_URL environment variable not set".to_string())
        })?;
        Self::open(&url)
    }

    ///Get the RedisClient instance and automatically initialize it if the instance does not exist
    ///
    ///The connection address comes from the environment variable REDIS_URL, falling back to
    ///`redis.url` of the loaded configuration.
    ///If the instance does not exist, a new instance will be automatically created and saved to the global static variable
    pub fn get_instance() -> Result<RedisClient, CacheError> {
        let mut global_client = REDIS_CLIENT.lock().map_err(|_|
            CacheError::OperationError("Failed to acquire lock".to_string()))?;

        if global_client.is_none() {
            let redis_client = Self::from_settings(&CONFIG.get_or_default().redis)?;
            *global_client = Some(redis_client);
        }

        global_client
            .as_ref()
            .cloned()
            .ok_or_else(|| CacheError::OperationError("Redis client initialization failed".to_string()))
    }

    /// Shared connection, established on first use and reconnected by the manager afterwards.
    pub async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let manager = self
            .manager
            .get_or_try_init(|| async { self.client.get_tokio_connection_manager().await })
            .await
            .map_err(CacheError::ConnectionError)?;
        Ok(manager.clone())
    }
}
