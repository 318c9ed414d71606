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

//! Bit-packed cache registers
//!
//! # Cache Configuration Register (ASI 0x2, 0x8 icache / 0xC dcache)
//!
//! ```text
//! Bit    | Field       | Description
//! -------|-------------|----------------------------------------------
//! 3      | M           | MMU present
//! 11-4   | LRSTART     | Scratchpad start address [31:24]
//! 15-12  | LRSIZE      | Scratchpad size, 2^n KB
//! 18-16  | LSIZE       | Line size, 2^n words (2 or 3)
//! 19     | LR          | Scratchpad present
//! 23-20  | SSIZE       | Way size, 2^n KB
//! 26-24  | SETS        | Number of ways - 1
//! 29-28  | REPL        | 0 direct, 1 LRU, 2 LRR, 3 random
//! ```
//!
//! # Diagnostic Tag Word (ASI 0xC icache / 0xE dcache)
//!
//! ```text
//! Bit    | Field       | Description
//! -------|-------------|----------------------------------------------
//! 31-10  | ATAG        | Address tag (right-aligned in the field)
//! 9      | LRR         | LRR history bit
//! 8      | LOCK        | Line locked
//! 7-0    | VALID       | Per-word valid bits
//! ```

use super::line::CacheLineTag;
use super::replacement::ReplacementPolicy;
use crate::core::config::CacheConfig;

/// Cache configuration register fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigRegister {
    pub mmu: bool,
    pub lram_start: u8,
    pub lram_size: u8,
    pub line_size: u8,
    pub lram: bool,
    pub set_size: u8,
    pub sets: u8,
    pub repl: u8,
}

impl ConfigRegister {
    pub fn from_config(config: &CacheConfig) -> Self {
        let repl = if config.ways == 1 {
            0
        } else {
            config.replacement.code() as u8
        };

        Self {
            mmu: config.mmu_enabled,
            lram_start: config.scratchpad.start,
            lram_size: (config.scratchpad.size_log2_kb & 0xF) as u8,
            line_size: config.line_size_words.trailing_zeros() as u8,
            lram: config.scratchpad.enabled,
            set_size: (config.set_size_log2_kb & 0xF) as u8,
            sets: (config.ways.saturating_sub(1) & 0x7) as u8,
            repl,
        }
    }

    /// Register value
    ///
    /// # Example
    ///
    /// ```
    /// use sparcvp::core::cache::{ConfigRegister, ReplacementPolicy};
    /// use sparcvp::core::config::CacheConfig;
    ///
    /// let config = CacheConfig {
    ///     ways: 2,
    ///     set_size_log2_kb: 0,
    ///     line_size_words: 4,
    ///     replacement: ReplacementPolicy::Lru,
    ///     ..CacheConfig::default()
    /// };
    /// let value = ConfigRegister::from_config(&config).pack();
    /// assert_eq!(value & 0x3707_0000, 0x1102_0000);
    /// ```
    pub fn pack(&self) -> u32 {
        (u32::from(self.mmu) << 3)
            | (u32::from(self.lram_start) << 4)
            | (u32::from(self.lram_size & 0xF) << 12)
            | (u32::from(self.line_size & 0x7) << 16)
            | (u32::from(self.lram) << 19)
            | (u32::from(self.set_size & 0xF) << 20)
            | (u32::from(self.sets & 0x7) << 24)
            | (u32::from(self.repl & 0x3) << 28)
    }

    pub fn unpack(value: u32) -> Self {
        Self {
            mmu: value & (1 << 3) != 0,
            lram_start: ((value >> 4) & 0xFF) as u8,
            lram_size: ((value >> 12) & 0xF) as u8,
            line_size: ((value >> 16) & 0x7) as u8,
            lram: value & (1 << 19) != 0,
            set_size: ((value >> 20) & 0xF) as u8,
            sets: ((value >> 24) & 0x7) as u8,
            repl: ((value >> 28) & 0x3) as u8,
        }
    }

    pub fn policy(&self) -> ReplacementPolicy {
        ReplacementPolicy::from_code(u32::from(self.repl))
    }
}

/// Diagnostic view of a line tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagRegister {
    pub atag: u32,
    pub lrr: bool,
    pub lock: bool,
    pub valid: u8,
}

impl TagRegister {
    /// Largest tag the ATAG field can hold
    pub const ATAG_MASK: u32 = 0x003F_FFFF;

    pub fn pack(&self) -> u32 {
        ((self.atag & Self::ATAG_MASK) << 10)
            | (u32::from(self.lrr) << 9)
            | (u32::from(self.lock) << 8)
            | u32::from(self.valid)
    }

    pub fn unpack(value: u32) -> Self {
        Self {
            atag: value >> 10,
            lrr: value & (1 << 9) != 0,
            lock: value & (1 << 8) != 0,
            valid: (value & 0xFF) as u8,
        }
    }
}

impl From<&CacheLineTag> for TagRegister {
    fn from(tag: &CacheLineTag) -> Self {
        Self {
            atag: tag.atag,
            lrr: tag.lrr,
            lock: tag.lock,
            valid: tag.valid,
        }
    }
}
