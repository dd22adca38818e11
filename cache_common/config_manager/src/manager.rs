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
use std::fs::File;
use std::io::{Read, BufReader};
use std::path::Path;
use std::sync::OnceLock;

use crate::types::context::CacheConfig;

/// A thread-safe singleton configuration manager that loads and provides access to configuration data.
///
/// The value is stored in a `OnceLock`, so it is parsed at most once and can be read from
/// any thread afterwards. Any `Deserialize` type can be held; `CacheConfig` is additionally
/// validated before it is stored.
///
/// # Type Parameters
///
/// * `T` - The configuration type that must implement `Deserialize`, `Send`, `Sync`, and have a static lifetime.
pub struct ConfigSingleton<T: for<'a> Deserialize<'a> + Send + Sync + 'static> {
    instance: OnceLock<T>,
}

impl <T: for<'a> Deserialize<'a> + Send + Sync + 'static> ConfigSingleton<T> {
    /// Creates a new, uninitialized `ConfigSingleton` instance.
    ///
    /// Call `initialize` (or `initialize_from_str`) before `get_instance`.
    pub const fn new() -> Self {
        ConfigSingleton {
            instance: OnceLock::new(),
        }
    }

    /// Loads and parses a YAML configuration file into the singleton.
    ///
    /// If the singleton has already been initialized this returns `Ok(())` and keeps the
    /// existing configuration.
    ///
    /// # Errors
    ///
    /// * The file cannot be opened or read
    /// * The YAML content cannot be parsed into `T`
    /// * `T` is `CacheConfig` and fails validation
    pub fn initialize<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        if self.instance.get().is_some() {
            return Ok(());
        }

        let file = File::open(path).map_err(|e| format!("Failed to open config file: {}", e))?;

        let mut contents = String::new();
        let mut reader = BufReader::new(file);
        reader.read_to_string(&mut contents).map_err(|e| format!("Failed to read config file: {}", e))?;

        self.initialize_from_str(&contents)
    }

    /// Same as `initialize`, but parses YAML that is already in memory.
    pub fn initialize_from_str(&self, contents: &str) -> Result<(), String> {
        if self.instance.get().is_some() {
            return Ok(());
        }

        let config = parse_yaml::<T>(contents)?;
        let _ = self.instance.set(config);
        Ok(())
    }

    /// Retrieves a reference to the initialized configuration instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the singleton has not been initialized yet.
    pub fn get_instance(&self) -> Result<&T, String> {
        self.instance.get().ok_or_else(|| "Configuration not initialized".to_string())
    }

    /// Returns the loaded configuration, or `T::default()` when nothing was loaded.
    pub fn get_or_default(&self) -> T
    where
        T: Clone + Default,
    {
        self.instance.get().cloned().unwrap_or_default()
    }
}

impl<T: for<'a> Deserialize<'a> + Send + Sync + 'static> Default for ConfigSingleton<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses YAML into `T`, validating it when `T` is `CacheConfig`.
pub fn parse_yaml<T: for<'a> Deserialize<'a> + 'static>(contents: &str) -> Result<T, String> {
    let config: T = serde_yaml::from_str(contents).map_err(|e| format!("Failed to parse YAML: {}", e))?;

    if let Some(cache_config) = (&config as &dyn std::any::Any).downcast_ref::<CacheConfig>() {
        cache_config.validate()?;
    }

    Ok(config)
}
