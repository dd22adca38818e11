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

use std::f64::consts::LN_2;

use sha2::{Digest, Sha256};

use crate::error::CacheError;

/// Largest bitmap the store accepts (2^32 bits)
pub const MAX_NUM_BITS: u64 = 1 << 32;

/// Sizing and hashing strategy of a store-backed bloom filter.
///
/// The helper is pure: it turns a value into bit offsets. `CacheFacade` sets and reads
/// those bits in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BloomFilterHelper {
    num_bits: u64,
    num_hash_functions: u32,
}

impl BloomFilterHelper {
    /// Sizes a filter for `expected_insertions` values at false-positive probability `fpp`.
    pub fn new(expected_insertions: u64, fpp: f64) -> Result<Self, CacheError> {
        if expected_insertions == 0 {
            return Err(CacheError::OperationError("expected_insertions must be positive".to_string()));
        }
        if !(fpp > 0.0 && fpp < 1.0) {
            return Err(CacheError::OperationError(format!("fpp must be in (0, 1), got {}", fpp)));
        }
        let num_bits = optimal_num_of_bits(expected_insertions, fpp);
        let num_hash_functions = optimal_num_of_hash_functions(expected_insertions, num_bits);
        Self::with_parameters(num_bits, num_hash_functions)
    }

    pub fn with_parameters(num_bits: u64, num_hash_functions: u32) -> Result<Self, CacheError> {
        if num_bits == 0 || num_bits > MAX_NUM_BITS {
            return Err(CacheError::OperationError(format!(
                "num_bits must be in 1..={}, got {}", MAX_NUM_BITS, num_bits
            )));
        }
        if num_hash_functions == 0 {
            return Err(CacheError::OperationError("num_hash_functions must be positive".to_string()));
        }
        Ok(Self { num_bits, num_hash_functions })
    }

    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    pub fn num_hash_functions(&self) -> u32 {
        self.num_hash_functions
    }

    /// Bit offsets for `value`, one per hash function, all below `num_bits`.
    ///
    /// Double hashing over a SHA-256 digest: `h1 + i * h2` for i in 1..=k. The digest keeps
    /// offsets identical across processes and platforms.
    pub fn offsets<V: AsRef<[u8]> + ?Sized>(&self, value: &V) -> Vec<u64> {
        let digest = Sha256::digest(value.as_ref());
        let mut low = [0u8; 8];
        let mut high = [0u8; 8];
        low.copy_from_slice(&digest[0..8]);
        high.copy_from_slice(&digest[8..16]);
        let hash1 = i64::from_le_bytes(low);
        let hash2 = i64::from_le_bytes(high);

        (1..=self.num_hash_functions as i64)
            .map(|i| {
                let mut combined = hash1.wrapping_add(i.wrapping_mul(hash2));
                if combined < 0 {
                    combined = !combined;
                }
                combined as u64 % self.num_bits
            })
            .collect()
    }
}

fn optimal_num_of_bits(expected_insertions: u64, fpp: f64) -> u64 {
    let bits = -(expected_insertions as f64) * fpp.ln() / (LN_2 * LN_2);
    (bits as u64).clamp(1, MAX_NUM_BITS)
}

fn optimal_num_of_hash_functions(expected_insertions: u64, num_bits: u64) -> u32 {
    let k = (num_bits as f64 / expected_insertions as f64 * LN_2).round();
    (k as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizing_matches_standard_formulas() {
        let helper = BloomFilterHelper::new(1_000_000, 0.01).unwrap();
        assert_eq!(helper.num_bits(), 9_585_058);
        assert_eq!(helper.num_hash_functions(), 7);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(BloomFilterHelper::new(0, 0.01).is_err());
        assert!(BloomFilterHelper::new(10, 0.0).is_err());
        assert!(BloomFilterHelper::new(10, 1.0).is_err());
        assert!(BloomFilterHelper::with_parameters(0, 3).is_err());
        assert!(BloomFilterHelper::with_parameters(MAX_NUM_BITS + 1, 3).is_err());
        assert!(BloomFilterHelper::with_parameters(64, 0).is_err());
    }

    #[test]
    fn test_offsets_are_deterministic_and_bounded() {
        let helper = BloomFilterHelper::with_parameters(1000, 5).unwrap();
        let first = helper.offsets("user:42");
        assert_eq!(first.len(), 5);
        assert!(first.iter().all(|offset| *offset < 1000));
        assert_eq!(first, helper.offsets("user:42".as_bytes()));
        assert_eq!(first, helper.offsets(&"user:42".to_string()));
        assert_ne!(first, helper.offsets("user:43"));
    }
}
