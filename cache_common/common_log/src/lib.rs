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

pub mod config;
pub mod logger;

use std::{path::PathBuf, sync::OnceLock};

static LOGGER: OnceLock<logger::Logger> = OnceLock::new();

/// Initialize logging system using default configuration file path "logging.yaml"
///
/// # Example
/// ```no_run
/// common_log::init().expect("Failed to initialize logger");
/// log::info!("Logger initialized");
/// ```
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    init_with_yaml("logging.yaml")
}

/// Initialize logging system
///
/// # Arguments
/// * `config_path` - Path to the logging configuration file
pub fn init_with_yaml(config_path: impl Into<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = LogConfig::from_yaml(config_path)?;
    init_with_config(config)
}

/// Initialize logging system with config
///
/// # Example
/// ```no_run
/// use common_log::config::{LogConfig, LoggerConfig};
/// use common_log::init_with_config;
///
/// let config = LogConfig {
///     loggers: vec![LoggerConfig {
///         path_prefix: "root".to_string(),
///         log_directory: "logs".to_string(),
///         log_file_name: "root-cache.log".to_string(),
///         max_file_size: 10480,
///         max_zip_count: 6,
///         level: "info".to_string(),
///     }],
/// };
/// init_with_config(config).expect("Failed to initialize logger");
/// log::info!("Logger initialized");
/// ```
pub fn init_with_config(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    if LOGGER.get().is_some() {
        return Err("Logger already initialized".into());
    }
    let logger = logger::Logger::new_from_config(config)?;
    if LOGGER.set(logger).is_err() {
        return Err("Logger already initialized".into());
    }
    Ok(())
}

/// Swap the configuration of the running logger, e.g. to change levels at runtime
pub fn reload(config: &LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    match LOGGER.get() {
        Some(logger) => logger.reload(config),
        None => Err("Logger not initialized".into()),
    }
}

// Re-export log macros for convenient use in other modules
pub use log::{debug, error, info, trace, warn};
use crate::config::LogConfig;
