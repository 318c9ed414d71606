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

//! Platform configuration
//!
//! Every parameter of the platform is fixed at construction time. The
//! configuration is read from a TOML file; missing fields fall back to a
//! LEON3-like default (4 x 4 KB LRU caches, 4 MB of RAM at 0x40000000).
//!
//! ```toml
//! [mmu_cache]
//! dsnoop = true
//! master_id = 0
//! ccr_reset = 0x0000000F
//!
//! [mmu_cache.icache]
//! ways = 2
//! set_size_log2_kb = 0
//! line_size_words = 4
//! replacement = "lrr"
//!
//! [memory]
//! ram_start = 0x40000000
//! ram_size_kb = 1024
//! ```
//!
//! Cache geometry is validated by [`CacheConfig::validate`]; an invalid
//! geometry is fatal and the platform is never built.

use crate::core::cache::ReplacementPolicy;
use crate::core::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Scratchpad (local RAM) attached to one cache channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScratchpadConfig {
    /// Scratchpad present
    pub enabled: bool,
    /// Eight most significant address bits of the 16 MB window
    pub start: u8,
    /// Size as 2^n KB
    pub size_log2_kb: u32,
}

impl Default for ScratchpadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            start: 0x8e,
            size_log2_kb: 3,
        }
    }
}

impl ScratchpadConfig {
    /// Scratchpad size in bytes
    #[inline(always)]
    pub fn size_bytes(&self) -> usize {
        1024 << self.size_log2_kb
    }

    /// First address of the scratchpad window
    #[inline(always)]
    pub fn base_address(&self) -> u32 {
        u32::from(self.start) << 24
    }
}

/// Geometry and behaviour of one cache engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Associativity (1-4)
    pub ways: u32,
    /// Way size as 2^n KB (0-8)
    pub set_size_log2_kb: u32,
    /// Line size in 32-bit words (4 or 8)
    pub line_size_words: u32,
    /// Victim selection policy
    pub replacement: ReplacementPolicy,
    /// Diagnostic writes may lock lines
    pub locking: bool,
    /// Burst refill allowed (effective when CCR.IB is set)
    pub burst: bool,
    /// Refill always fetches a whole line and tracks one valid bit per line
    pub new_line_fetch: bool,
    /// MMU present (reported in the configuration register only)
    pub mmu_enabled: bool,
    /// Local scratchpad RAM
    pub scratchpad: ScratchpadConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ways: 4,
            set_size_log2_kb: 2,
            line_size_words: 8,
            replacement: ReplacementPolicy::Lru,
            locking: false,
            burst: false,
            new_line_fetch: false,
            mmu_enabled: false,
            scratchpad: ScratchpadConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Check the geometry invariants
    ///
    /// # Errors
    ///
    /// - `InvalidWays` if `ways` is not in 1..=4
    /// - `InvalidLineSize` if the line is not 4 or 8 words
    /// - `InvalidWaySize` if the way is larger than 256 KB
    /// - `LrrRequiresTwoWays` if LRR is used with `ways != 2`
    /// - `AssociativeNeedsPolicy` if a 1-way cache is not direct-mapped
    /// - `DirectMappedMultiWay` if a multi-way cache is direct-mapped
    /// - `InvalidScratchpad` if an enabled scratchpad exceeds 512 KB
    ///
    /// # Example
    ///
    /// ```
    /// use sparcvp::core::cache::ReplacementPolicy;
    /// use sparcvp::core::config::CacheConfig;
    ///
    /// let config = CacheConfig {
    ///     ways: 4,
    ///     replacement: ReplacementPolicy::Lrr,
    ///     ..CacheConfig::default()
    /// };
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        if !(1..=4).contains(&self.ways) {
            return Err(SimError::InvalidWays { ways: self.ways });
        }
        if self.line_size_words != 4 && self.line_size_words != 8 {
            return Err(SimError::InvalidLineSize {
                words: self.line_size_words,
            });
        }
        if self.set_size_log2_kb > 8 {
            return Err(SimError::InvalidWaySize {
                log2_kb: self.set_size_log2_kb,
            });
        }

        match self.replacement {
            ReplacementPolicy::Lrr if self.ways != 2 => {
                return Err(SimError::LrrRequiresTwoWays { ways: self.ways });
            }
            ReplacementPolicy::DirectMapped if self.ways > 1 => {
                return Err(SimError::DirectMappedMultiWay { ways: self.ways });
            }
            policy if self.ways == 1 && policy != ReplacementPolicy::DirectMapped => {
                return Err(SimError::AssociativeNeedsPolicy {
                    policy: format!("{:?}", policy),
                });
            }
            _ => {}
        }

        if self.scratchpad.enabled && self.scratchpad.size_log2_kb > 9 {
            return Err(SimError::InvalidScratchpad {
                log2_kb: self.scratchpad.size_log2_kb,
            });
        }

        Ok(())
    }

    /// Way size in KB
    #[inline(always)]
    pub fn way_size_kb(&self) -> u32 {
        1 << self.set_size_log2_kb
    }
}

/// Downstream memory map and timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Boot ROM base address
    pub rom_start: u32,
    /// Boot ROM size in KB (0 disables the ROM)
    pub rom_size_kb: u32,
    /// SDRAM base address
    pub ram_start: u32,
    /// SDRAM size in KB
    pub ram_size_kb: u32,
    /// Uncacheable I/O window base address
    pub io_start: u32,
    /// I/O window size in KB (0 disables the window)
    pub io_size_kb: u32,
    /// Cycles added to every non-debug read
    pub read_latency: u64,
    /// Cycles added to every non-debug write
    pub write_latency: u64,
    /// One bit per 256 MB segment marking it cacheable; 0 uses the region defaults
    pub cached_mask: u16,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            rom_start: 0x0000_0000,
            rom_size_kb: 512,
            ram_start: 0x4000_0000,
            ram_size_kb: 4096,
            io_start: 0x8000_0000,
            io_size_kb: 64,
            read_latency: 4,
            write_latency: 2,
            cached_mask: 0,
        }
    }
}

/// Cache front-end configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MmuCacheConfig {
    /// Instruction cache geometry
    pub icache: CacheConfig,
    /// Data cache geometry
    pub dcache: CacheConfig,
    /// Data cache snooping present
    pub dsnoop: bool,
    /// Bus master id of this CPU; snoops from it are ignored
    pub master_id: u32,
    /// Cache control register value at reset
    pub ccr_reset: u32,
}

impl Default for MmuCacheConfig {
    fn default() -> Self {
        Self {
            icache: CacheConfig::default(),
            dcache: CacheConfig {
                line_size_words: 4,
                ..CacheConfig::default()
            },
            dsnoop: false,
            master_id: 0,
            ccr_reset: 0,
        }
    }
}

impl MmuCacheConfig {
    pub fn validate(&self) -> Result<()> {
        self.icache.validate()?;
        self.dcache.validate()
    }
}

/// Complete platform configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub mmu_cache: MmuCacheConfig,
    pub memory: MemoryConfig,
}

impl PlatformConfig {
    /// Load and validate a configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, `TomlParse` if it is not
    /// valid TOML for this schema, and any geometry error from
    /// [`CacheConfig::validate`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&contents)?;
        log::info!("Loaded platform configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Parse and validate a configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.mmu_cache.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| SimError::ConfigLoad(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
