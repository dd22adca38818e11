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

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis connect error: {0}")]
    ConnectionError(#[from] redis::RedisError),

    #[error("Redis key not exist")]
    KeyNotFound,

    #[error("Redis value serialization error: {0}")]
    SerializationError(String),

    #[error("Redis value deserialization error: {0}")]
    DeserializationError(String),

    #[error("Redis operation error: {0}")]
    OperationError(String),

    #[error("Redis wrong type: {0}")]
    WrongType(String),
}
