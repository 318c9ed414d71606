// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Address decomposition
//!
//! ```text
//!  31                      idx+off  off          0
//! ┌───────────────────────────┬────────┬──────────┐
//! │            tag            │  index │  offset  │
//! └───────────────────────────┴────────┴──────────┘
//! offset bits = log2(line_size_words * 4)
//! index bits  = set_size_log2_kb + 8 - log2(line_size_words)
//! tag bits    = 32 - index bits - offset bits
//! ```

use crate::core::config::CacheConfig;

/// Derived address layout of one cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheGeometry {
    pub line_size_words: u32,
    pub offset_bits: u32,
    pub idx_bits: u32,
    pub tag_bits: u32,
}

impl CacheGeometry {
    pub fn new(config: &CacheConfig) -> Self {
        let words_log2 = config.line_size_words.trailing_zeros();
        let offset_bits = words_log2 + 2;
        let idx_bits = config.set_size_log2_kb + 8 - words_log2;

        Self {
            line_size_words: config.line_size_words,
            offset_bits,
            idx_bits,
            tag_bits: 32 - idx_bits - offset_bits,
        }
    }

    /// Lines in one way
    #[inline(always)]
    pub fn lines_per_way(&self) -> usize {
        1 << self.idx_bits
    }

    #[inline(always)]
    pub fn line_bytes(&self) -> usize {
        (self.line_size_words * 4) as usize
    }

    #[inline(always)]
    pub fn tag(&self, address: u32) -> u32 {
        address >> (self.idx_bits + self.offset_bits)
    }

    #[inline(always)]
    pub fn index(&self, address: u32) -> usize {
        ((address >> self.offset_bits) & ((1 << self.idx_bits) - 1)) as usize
    }

    /// Byte offset inside the line
    #[inline(always)]
    pub fn offset(&self, address: u32) -> usize {
        (address & ((1 << self.offset_bits) - 1)) as usize
    }

    /// First address of the line holding `address`
    #[inline(always)]
    pub fn line_base(&self, address: u32) -> u32 {
        address & !((1 << self.offset_bits) - 1)
    }

    /// Rebuild an address from its fields
    #[inline(always)]
    pub fn compose(&self, tag: u32, index: usize, offset: usize) -> u32 {
        let tag_part = if self.tag_bits == 0 {
            0
        } else {
            tag << (self.idx_bits + self.offset_bits)
        };
        tag_part | ((index as u32) << self.offset_bits) | offset as u32
    }

    /// Valid bits of the words covered by `[offset, offset + len)`
    ///
    /// Returns `None` for an empty access or one that leaves the line.
    ///
    /// # Example
    ///
    /// ```
    /// use sparcvp::core::cache::CacheGeometry;
    /// use sparcvp::core::config::CacheConfig;
    ///
    /// let geometry = CacheGeometry::new(&CacheConfig::default());
    /// assert_eq!(geometry.valid_mask(0, 4), Some(0b0000_0001));
    /// assert_eq!(geometry.valid_mask(8, 8), Some(0b0000_1100));
    /// assert_eq!(geometry.valid_mask(3, 2), Some(0b0000_0011));
    /// assert_eq!(geometry.valid_mask(30, 4), None);
    /// ```
    pub fn valid_mask(&self, offset: usize, len: usize) -> Option<u8> {
        if len == 0 || offset + len > self.line_bytes() {
            return None;
        }

        let first = offset >> 2;
        let last = (offset + len - 1) >> 2;
        let words = last - first + 1;
        Some((((1u16 << words) - 1) << first) as u8)
    }

    /// Valid bits of every word of a line
    #[inline(always)]
    pub fn full_mask(&self) -> u8 {
        ((1u16 << self.line_size_words) - 1) as u8
    }
}
