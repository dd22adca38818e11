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

/// Separator between the segments of a key.
pub const KEY_SEPARATOR: &str = ":";

/// Formats logical identifiers into namespaced store keys, e.g. `LOCK:orders:42`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBuilder {
    namespace: String,
}

impl KeyBuilder {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self { namespace: namespace.into() }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `{namespace}:{name}`
    pub fn key(&self, name: &str) -> String {
        format!("{}{}{}", self.namespace, KEY_SEPARATOR, name)
    }

    /// `{namespace}:{part1}:{part2}...`
    pub fn key_of(&self, parts: &[&str]) -> String {
        let mut key = self.namespace.clone();
        for part in parts {
            key.push_str(KEY_SEPARATOR);
            key.push_str(part);
        }
        key
    }
}

/// Builds a key from a format string, e.g. `cache_key!("user:{}:profile", id)`.
#[macro_export]
macro_rules! cache_key {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        format!($fmt $(, $arg)*)
    };
}
