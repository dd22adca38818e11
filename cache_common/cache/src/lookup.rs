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

use log::error;
use serde::de::DeserializeOwned;

use crate::error::CacheError;

/// Result of a typed read: a missing key and an unreadable value are different outcomes.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Present(T),
    Absent,
    /// The stored value could not be decoded into the requested type
    DecodeError(String),
}

impl<T> Lookup<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Lookup::Present(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Lookup::Absent)
    }

    pub fn is_decode_error(&self) -> bool {
        matches!(self, Lookup::DecodeError(_))
    }

    /// Collapses to the legacy null-on-miss shape.
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Present(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<Option<T>, CacheError> {
        match self {
            Lookup::Present(value) => Ok(Some(value)),
            Lookup::Absent => Ok(None),
            Lookup::DecodeError(message) => Err(CacheError::DeserializationError(message)),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Lookup<U> {
        match self {
            Lookup::Present(value) => Lookup::Present(f(value)),
            Lookup::Absent => Lookup::Absent,
            Lookup::DecodeError(message) => Lookup::DecodeError(message),
        }
    }
}

/// Decodes a raw JSON value read from `key`, logging decode failures.
pub(crate) fn decode<T: DeserializeOwned>(key: &str, raw: Option<String>) -> Lookup<T> {
    match raw {
        None => Lookup::Absent,
        Some(raw) => match serde_json::from_str(&raw) {
            Ok(value) => Lookup::Present(value),
            Err(e) => {
                error!("Failed to decode value of {}: {}", key, e);
                Lookup::DecodeError(e.to_string())
            }
        },
    }
}
