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

use std::future::Future;

use log::{info, warn};

use super::error::{DistributedLockError, Result};
use super::lock::{DistributedLock, ReleaseStatus};
use super::options::AcquireOptions;

impl DistributedLock {
    /// Runs `section` while holding `name`, releasing the lock afterwards.
    ///
    /// Returns `AcquireTimeout` without running `section` if the lock cannot be acquired.
    pub async fn run_exclusive<F, Fut, T>(&self, name: &str, ttl_secs: u64, section: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let options = self.options(ttl_secs);
        self.run_exclusive_with(name, &options, section).await
    }

    /// `run_exclusive` with explicit polling options. Invalid options are reported as such.
    pub async fn run_exclusive_with<F, Fut, T>(&self, name: &str, options: &AcquireOptions, section: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        options.validate()?;
        if !self.acquire_with_options(name, options).await {
            info!("Failed to acquire lock {}, section skipped", name);
            return Err(DistributedLockError::AcquireTimeout);
        }

        let output = section().await;

        match self.release(name).await {
            ReleaseStatus::Released => {}
            status => warn!("Lock {} was not released cleanly: {:?}", name, status),
        }
        Ok(output)
    }
}
