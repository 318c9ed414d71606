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

//! Set-associative cache engine
//!
//! One engine models either the instruction or the data cache of a LEON3
//! core. Both share the same algorithms and differ only in configuration
//! and in which field of the cache control register they take their mode
//! from.
//!
//! # Hardware Specifications
//!
//! - 1 to 4 ways, 1 KB to 256 KB per way
//! - 4 or 8 words per line, one valid bit per word
//! - Write-through, no write-allocate
//! - Replacement: direct-mapped, LRU, LRR (2-way) or random
//! - Optional line locking through diagnostic tag writes
//! - Refill of the missed word(s), or of the whole line in burst or
//!   new-line-fetch mode
//!
//! # Access Flow
//!
//! ```text
//!   read/write ──► bypass? ──yes──► downstream memory (+1 cycle)
//!                    │ no
//!                    ▼
//!              tag + valid check ──hit──► serve from line
//!                    │ miss
//!                    ▼
//!              refill window from downstream (+1 cycle)
//!                    │
//!                    ▼
//!              allocate (not frozen, cacheable) ──► serve from window
//! ```
//!
//! A cache is bypassed for debug accesses, for ASI 0x1C and while it is
//! disabled. ASIs 0-3 always miss but still refresh a matching line.
//!
//! # Example
//!
//! ```
//! use sparcvp::core::cache::CacheEngine;
//! use sparcvp::core::config::{CacheConfig, MemoryConfig};
//! use sparcvp::core::control::{CacheControl, Channel};
//! use sparcvp::core::debug_info::DebugInfo;
//! use sparcvp::core::memory::{Bus, MemRequest, SharedMemory};
//! use std::cell::{Cell, RefCell};
//! use std::rc::Rc;
//!
//! let bus = Rc::new(RefCell::new(Bus::new(MemoryConfig::default())));
//! bus.borrow_mut().write32(0x4000_0000, 0xCAFE_F00D).unwrap();
//! let memory: SharedMemory = bus.clone();
//!
//! let control = Rc::new(Cell::new(CacheControl::DCS_ENABLE | CacheControl::DCS_ALLOCATE));
//! let mut dcache =
//!     CacheEngine::new("dcache", Channel::Data, CacheConfig::default(), memory, control).unwrap();
//!
//! let mut data = [0u8; 4];
//! let mut delay = 0;
//! let mut debug = DebugInfo::new();
//! let request = MemRequest::new(0x4000_0000, 0xA);
//!
//! dcache.mem_read(&request, &mut data, &mut delay, &mut debug).unwrap();
//! assert_eq!(u32::from_be_bytes(data), 0xCAFE_F00D);
//! assert_eq!(dcache.statistics().read_misses, 1);
//!
//! dcache.mem_read(&request, &mut data, &mut delay, &mut debug).unwrap();
//! assert_eq!(dcache.statistics().total_read_hits(), 1);
//! ```

mod diagnostic;
mod geometry;
mod line;
mod registers;
mod replacement;
mod stats;


pub use geometry::CacheGeometry;
pub use line::{CacheLine, CacheLineTag, CacheMemory, CacheSet, MAX_LINE_BYTES};
pub use registers::{ConfigRegister, TagRegister};
pub use replacement::{max_lru, Replacement, ReplacementPolicy};
pub use stats::CacheStatistics;

use crate::core::config::CacheConfig;
use crate::core::control::{CacheControl, CacheMode, Channel, SharedControl};
use crate::core::debug_info::{AccessKind, DebugFlags, DebugInfo};
use crate::core::error::Result;
use crate::core::memory::{MemRequest, SharedMemory};
use crate::core::timing::TickCount;

/// ASI that always bypasses the caches
pub const ASI_BYPASS: u8 = 0x1C;

/// Highest ASI that forces a cache miss
pub const ASI_FORCE_MISS_MAX: u8 = 0x3;

/// Line returned for out-of-range lookups
const EMPTY_LINE: CacheLine = CacheLine {
    tag: CacheLineTag {
        atag: 0,
        valid: 0,
        lru: 0,
        lrr: false,
        lock: false,
    },
    data: [0; MAX_LINE_BYTES],
};

/// Set-associative cache engine
pub struct CacheEngine {
    name: String,
    channel: Channel,
    config: CacheConfig,
    geometry: CacheGeometry,
    memory: CacheMemory,
    replacement: Replacement,

    /// Target of out-of-range diagnostic writes, zeroed before each use
    scratch: CacheLine,

    /// Packed configuration register
    config_reg: u32,

    stats: CacheStatistics,
    downstream: SharedMemory,
    control: SharedControl,
}

impl CacheEngine {
    /// Build an engine
    ///
    /// # Arguments
    ///
    /// * `name` - Instance name used in logs
    /// * `channel` - Selects the mode field of the control register
    /// * `config` - Geometry and behaviour
    /// * `downstream` - Memory used on misses, bypasses and write-through
    /// * `control` - Shared cache control register
    ///
    /// # Errors
    ///
    /// Any error of [`CacheConfig::validate`]; the engine is not built.
    pub fn new(
        name: &str,
        channel: Channel,
        config: CacheConfig,
        downstream: SharedMemory,
        control: SharedControl,
    ) -> Result<Self> {
        config.validate()?;

        let geometry = CacheGeometry::new(&config);
        let ways = config.ways as usize;
        let config_reg = ConfigRegister::from_config(&config).pack();

        log::info!(
            "{}: {} way(s) x {} KB, {} words/line, {:?} replacement (config 0x{:08X})",
            name,
            ways,
            config.way_size_kb(),
            config.line_size_words,
            config.replacement,
            config_reg
        );
        log::debug!(
            "{}: {} lines/way, tag {} bits, index {} bits, offset {} bits",
            name,
            geometry.lines_per_way(),
            geometry.tag_bits,
            geometry.idx_bits,
            geometry.offset_bits
        );

        Ok(Self {
            name: name.to_string(),
            channel,
            memory: CacheMemory::new(ways, geometry.lines_per_way()),
            replacement: Replacement::new(config.replacement, ways),
            geometry,
            scratch: CacheLine::default(),
            config_reg,
            stats: CacheStatistics::new(ways),
            config,
            downstream,
            control,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn geometry(&self) -> &CacheGeometry {
        &self.geometry
    }

    pub fn statistics(&self) -> &CacheStatistics {
        &self.stats
    }

    pub fn reset_statistics(&mut self) {
        self.stats.reset();
    }

    /// Current mode from the cache control register
    #[inline(always)]
    pub fn mode(&self) -> CacheMode {
        self.control.get().mode(self.channel)
    }

    #[inline(always)]
    fn ways(&self) -> usize {
        self.memory.ways()
    }

    /// Line at `way`/`index`, or an empty line if out of range
    pub fn lookup(&self, way: usize, index: usize) -> &CacheLine {
        match self.memory.line(way, index) {
            Some(line) => line,
            None => {
                log::error!(
                    "{}: lookup of way {} line {} out of range",
                    self.name,
                    way,
                    index
                );
                &EMPTY_LINE
            }
        }
    }

    fn lookup_mut(&mut self, way: usize, index: usize) -> &mut CacheLine {
        if let Some(line) = self.memory.line_mut(way, index) {
            return line;
        }
        log::error!(
            "{}: lookup of way {} line {} out of range",
            self.name,
            way,
            index
        );
        self.scratch = CacheLine::default();
        &mut self.scratch
    }

    /// Valid bits that must be set for `[offset, offset + len)` to hit
    #[inline(always)]
    fn access_mask(&self, offset: usize, len: usize) -> Option<u8> {
        let mask = self.geometry.valid_mask(offset, len)?;
        Some(if self.config.new_line_fetch { 0x1 } else { mask })
    }

    /// Way holding `tag` at `index` with all `mask` bits valid
    fn locate(&self, tag: u32, index: usize, mask: u8) -> Option<usize> {
        self.memory
            .tags(index)
            .position(|t| t.atag == tag && t.valid & mask == mask)
    }

    /// Refill window for a miss: (start address, length)
    fn fetch_window(&self, address: u32, len: usize) -> (u32, usize) {
        let burst = self.config.burst && self.control.get().contains(CacheControl::IB);
        if self.config.new_line_fetch || burst {
            return (self.geometry.line_base(address), self.geometry.line_bytes());
        }

        let start = address & !0x3;
        let end = (address as usize + len + 3) & !0x3;
        (start, end - start as usize)
    }

    /// Read through the cache
    ///
    /// # Arguments
    ///
    /// * `request` - Address, ASI and debug/lock attributes
    /// * `data` - Destination, `data.len()` bytes
    /// * `delay` - Accumulated delay in cycles
    /// * `debug` - Debug information word
    ///
    /// # Returns
    ///
    /// Whether the data is cacheable. Downstream errors are returned as-is.
    pub fn mem_read(
        &mut self,
        request: &MemRequest,
        data: &mut [u8],
        delay: &mut TickCount,
        debug: &mut DebugInfo,
    ) -> Result<bool> {
        let mode = self.mode();
        if request.is_debug || request.asi == ASI_BYPASS || !mode.is_enabled() {
            return self.bypass_read(request, data, delay, debug);
        }

        let address = request.address;
        let len = data.len();
        let tag = self.geometry.tag(address);
        let index = self.geometry.index(address);
        let offset = self.geometry.offset(address);

        let Some(mask) = self.access_mask(offset, len) else {
            log::warn!(
                "{}: read of {} bytes at 0x{:08X} leaves the line, bypassing",
                self.name,
                len,
                address
            );
            return self.bypass_read(request, data, delay, debug);
        };

        let present = self.locate(tag, index, mask);

        if let Some(way) = present.filter(|_| request.asi > ASI_FORCE_MISS_MAX) {
            data.copy_from_slice(&self.lookup(way, index).data[offset..offset + len]);
            self.replacement.hit(&mut self.memory, index, way);

            *delay += ((len - 1) >> 2) as TickCount;
            self.stats.read_hits[way] += 1;
            debug.set_access(AccessKind::ReadHit, way);

            log::trace!("{}: read hit at 0x{:08X} way {}", self.name, address, way);
            return Ok(true);
        }

        // Miss: refill window from downstream
        *delay += 1;
        let (window_start, window_len) = self.fetch_window(address, len);
        let mut window = [0u8; MAX_LINE_BYTES];
        let window = &mut window[..window_len];
        let cacheable = self.downstream.borrow_mut().mem_read(
            &request.at(window_start),
            window,
            delay,
            debug,
        )?;

        let window_offset = self.geometry.offset(window_start);
        let window_mask = self
            .access_mask(window_offset, window_len)
            .unwrap_or_default();

        let filled = match present {
            // Forced miss on a present line: keep it coherent
            Some(way) => {
                self.fill(way, index, window_offset, window, window_mask);
                Some(way)
            }
            None if cacheable && mode.is_allocating() => {
                let way = self.allocate(tag, index, window_mask);
                self.install(way, tag, index);
                self.fill(way, index, window_offset, window, window_mask);
                Some(way)
            }
            None if cacheable => {
                // Frozen: only complete a line that already holds the tag
                let way = self
                    .memory
                    .tags(index)
                    .position(|t| t.atag == tag && t.valid & window_mask != window_mask);
                if let Some(way) = way {
                    self.fill(way, index, window_offset, window, window_mask);
                }
                way
            }
            None => None,
        };

        let start = (address - window_start) as usize;
        data.copy_from_slice(&window[start..start + len]);

        self.stats.read_misses += 1;
        debug.set_access(AccessKind::ReadMiss, filled.unwrap_or(0));
        if mode.is_frozen() {
            debug.set(DebugFlags::FROZEN_MISS);
        }

        log::trace!(
            "{}: read miss at 0x{:08X}, refilled {} bytes from 0x{:08X} into {:?}",
            self.name,
            address,
            window_len,
            window_start,
            filled
        );
        Ok(cacheable)
    }

    /// Write through the cache
    ///
    /// Hits update the line; misses never allocate. The write always goes
    /// downstream.
    pub fn mem_write(
        &mut self,
        request: &MemRequest,
        data: &[u8],
        delay: &mut TickCount,
        debug: &mut DebugInfo,
    ) -> Result<()> {
        let mode = self.mode();
        if request.is_debug || request.asi == ASI_BYPASS || !mode.is_enabled() {
            return self.bypass_write(request, data, delay, debug);
        }

        let address = request.address;
        let len = data.len();
        let tag = self.geometry.tag(address);
        let index = self.geometry.index(address);
        let offset = self.geometry.offset(address);

        let Some(mask) = self.access_mask(offset, len) else {
            log::warn!(
                "{}: write of {} bytes at 0x{:08X} leaves the line, bypassing",
                self.name,
                len,
                address
            );
            return self.bypass_write(request, data, delay, debug);
        };

        // Any valid covered word makes a hit, so no cached word goes stale
        let present = self
            .memory
            .tags(index)
            .position(|t| t.atag == tag && t.valid & mask != 0);
        match present {
            Some(way) => {
                let line = self.lookup_mut(way, index);
                line.data[offset..offset + len].copy_from_slice(data);

                // Words that were invalid stay invalid; valid bits only come from refills
                let stale = mask & !line.tag.valid;
                if stale != 0 {
                    log::trace!(
                        "write at 0x{:08X} leaves words 0x{:02X} invalid",
                        address,
                        stale
                    );
                }

                self.replacement.hit(&mut self.memory, index, way);
                *delay += ((len - 1) >> 2) as TickCount;
                self.stats.write_hits[way] += 1;
                debug.set_access(AccessKind::WriteHit, way);
                log::trace!("{}: write hit at 0x{:08X} way {}", self.name, address, way);
            }
            None => {
                self.stats.write_misses += 1;
                debug.set_access(AccessKind::WriteMiss, 0);
                log::trace!("{}: write miss at 0x{:08X}", self.name, address);
            }
        }

        self.downstream
            .borrow_mut()
            .mem_write(request, data, delay, debug)
    }

    fn bypass_read(
        &mut self,
        request: &MemRequest,
        data: &mut [u8],
        delay: &mut TickCount,
        debug: &mut DebugInfo,
    ) -> Result<bool> {
        if !request.is_debug {
            *delay += 1;
        }
        let cacheable = self
            .downstream
            .borrow_mut()
            .mem_read(request, data, delay, debug)?;

        self.stats.bypass_ops += 1;
        debug.set(DebugFlags::BYPASS);
        log::trace!("{}: bypass read at 0x{:08X}", self.name, request.address);
        Ok(cacheable)
    }

    fn bypass_write(
        &mut self,
        request: &MemRequest,
        data: &[u8],
        delay: &mut TickCount,
        debug: &mut DebugInfo,
    ) -> Result<()> {
        if !request.is_debug {
            *delay += 1;
        }
        self.downstream
            .borrow_mut()
            .mem_write(request, data, delay, debug)?;

        self.stats.bypass_ops += 1;
        debug.set(DebugFlags::BYPASS);
        log::trace!("{}: bypass write at 0x{:08X}", self.name, request.address);
        Ok(())
    }

    /// Choose the way that receives a refill at `index`
    fn allocate(&mut self, tag: u32, index: usize, mask: u8) -> usize {
        // A partially valid copy of the same line is completed in place
        if let Some(way) = self.memory.tags(index).position(|t| t.atag == tag && t.valid != 0) {
            return way;
        }

        if let Some(way) = self
            .memory
            .tags(index)
            .position(|t| t.valid & mask == 0 && !t.lock)
        {
            log::trace!("{}: refill into invalid way {}", self.name, way);
            return way;
        }

        let way = self.replacement.select(&self.memory, index);
        log::trace!("{}: refill into way {} by replacement", self.name, way);
        way
    }

    /// Give `way` at `index` the new tag, resetting it if the tag changes
    fn install(&mut self, way: usize, tag: u32, index: usize) {
        let line = self.lookup_mut(way, index);
        if line.tag.atag == tag && line.tag.valid != 0 {
            return;
        }

        line.tag.atag = tag;
        line.tag.valid = 0;
        self.replacement.installed(&mut self.memory, index, way);
    }

    /// Copy refill data into a line and mark it valid
    fn fill(&mut self, way: usize, index: usize, offset: usize, window: &[u8], mask: u8) {
        let line = self.lookup_mut(way, index);
        line.data[offset..offset + window.len()].copy_from_slice(window);
        line.tag.valid |= mask;
    }

    /// Invalidate every line
    pub fn flush(&mut self, debug: &mut DebugInfo) {
        self.memory.invalidate_all();
        debug.set(DebugFlags::FLUSH);
        log::debug!("{}: flushed", self.name);
    }

    /// Invalidate cached copies of `[address, address + length)`
    ///
    /// Only acts while the cache is enabled and allocating.
    ///
    /// # Returns
    ///
    /// Number of words invalidated
    pub fn snoop_invalidate(&mut self, address: u32, length: u32) -> usize {
        if !self.mode().is_allocating() {
            return 0;
        }

        let first = u64::from(address & !0x3);
        let end = u64::from(address) + u64::from(length);
        let way_bytes = (self.geometry.lines_per_way() * self.geometry.line_bytes()) as u64;

        let invalidated = if end - first > way_bytes {
            self.snoop_scan(first, end)
        } else {
            self.snoop_walk(first, end)
        };

        if invalidated > 0 {
            log::debug!(
                "{}: snoop 0x{:08X}+{} invalidated {} word(s)",
                self.name,
                address,
                length,
                invalidated
            );
        }
        invalidated
    }

    /// Snoop by walking the range one word at a time
    fn snoop_walk(&mut self, first: u64, end: u64) -> usize {
        let mut invalidated = 0;
        let mut current = first;

        while current < end {
            let snooped = current as u32;
            let tag = self.geometry.tag(snooped);
            let index = self.geometry.index(snooped);
            let bit = if self.config.new_line_fetch {
                0xFF
            } else {
                1u8 << (self.geometry.offset(snooped) >> 2)
            };

            for way in 0..self.ways() {
                let line = self.lookup_mut(way, index);
                if line.tag.atag == tag && line.tag.valid & bit != 0 {
                    line.tag.valid &= !bit;
                    invalidated += 1;
                }
            }
            current += 4;
        }
        invalidated
    }

    /// Snoop a range larger than a way by checking every cached word once
    fn snoop_scan(&mut self, first: u64, end: u64) -> usize {
        let geometry = self.geometry;
        let whole_line = self.config.new_line_fetch;
        let mut invalidated = 0;

        for way in 0..self.ways() {
            for index in 0..geometry.lines_per_way() {
                let line = self.lookup_mut(way, index);
                let base = u64::from(geometry.compose(line.tag.atag, index, 0));
                let in_range = (0..geometry.line_size_words)
                    .filter(|word| {
                        let word_address = base + u64::from(word * 4);
                        word_address >= first && word_address < end
                    })
                    .fold(0u8, |mask, word| mask | (1 << word));

                if whole_line {
                    if in_range != 0 && line.tag.valid != 0 {
                        line.tag.valid = 0;
                        invalidated += 1;
                    }
                } else {
                    let hit = line.tag.valid & in_range;
                    line.tag.valid &= !hit;
                    invalidated += hit.count_ones() as usize;
                }
            }
        }
        invalidated
    }

    /// Log the statistics
    pub fn report(&self) {
        self.stats.report(&self.name);
    }
}
