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

//! Diagnostic cache access
//!
//! Tags and data words are addressed directly, without hit/miss logic:
//!
//! ```text
//!  31          idx+off+2  idx+off      off   2  0
//! ┌──────────────┬─────────┬──────────┬──────┬──┐
//! │   (ignored)  │   way   │  index   │ word │  │
//! └──────────────┴─────────┴──────────┴──────┴──┘
//! ```
//!
//! Every diagnostic access takes one cycle.

use super::registers::TagRegister;
use super::CacheEngine;
use crate::core::timing::TickCount;

impl CacheEngine {
    #[inline(always)]
    fn diagnostic_target(&self, address: u32) -> (usize, usize, usize) {
        let way = (self.geometry.tag(address) & 0x3) as usize;
        let index = self.geometry.index(address);
        let word = self.geometry.offset(address) >> 2;
        (way, index, word)
    }

    /// Read a packed tag word
    ///
    /// # Example
    ///
    /// ```
    /// # use sparcvp::core::cache::CacheEngine;
    /// # use sparcvp::core::config::{CacheConfig, MemoryConfig};
    /// # use sparcvp::core::control::{CacheControl, Channel};
    /// # use sparcvp::core::memory::{Bus, SharedMemory};
    /// # use std::cell::{Cell, RefCell};
    /// # use std::rc::Rc;
    /// # let memory: SharedMemory = Rc::new(RefCell::new(Bus::new(MemoryConfig::default())));
    /// # let control = Rc::new(Cell::new(CacheControl::empty()));
    /// let mut icache =
    ///     CacheEngine::new("icache", Channel::Instruction, CacheConfig::default(), memory, control)
    ///         .unwrap();
    ///
    /// let mut delay = 0;
    /// // Way 1 (bit 12 for a 4 KB way with 8-word lines), line 2
    /// let address = (1 << 12) | (2 << 5);
    /// icache.write_cache_tag(address, 0x0040_0203, &mut delay);
    /// assert_eq!(icache.read_cache_tag(address, &mut delay), 0x0040_0203);
    /// assert_eq!(delay, 2);
    /// ```
    pub fn read_cache_tag(&self, address: u32, delay: &mut TickCount) -> u32 {
        let (way, index, _) = self.diagnostic_target(address);
        *delay += 1;

        let value = TagRegister::from(&self.lookup(way, index).tag).pack();
        log::debug!(
            "{}: diagnostic tag read way {} line {} = 0x{:08X}",
            self.name,
            way,
            index,
            value
        );
        value
    }

    /// Write a packed tag word
    ///
    /// The lock bit is only stored if locking is configured and the target
    /// is not the last way. The tag is truncated to the tag width.
    pub fn write_cache_tag(&mut self, address: u32, value: u32, delay: &mut TickCount) {
        let (way, index, _) = self.diagnostic_target(address);
        *delay += 1;

        let reg = TagRegister::unpack(value);
        let lockable = self.config.locking && way + 1 < self.ways();
        let tag_mask = if self.geometry.tag_bits >= 32 {
            u32::MAX
        } else {
            (1 << self.geometry.tag_bits) - 1
        };

        let line = self.lookup_mut(way, index);
        line.tag.atag = reg.atag & tag_mask;
        line.tag.lrr = reg.lrr;
        line.tag.lock = reg.lock && lockable;
        line.tag.valid = reg.valid;

        log::debug!(
            "{}: diagnostic tag write way {} line {} = 0x{:08X}",
            self.name,
            way,
            index,
            value
        );
    }

    /// Read one data word of a line
    pub fn read_cache_entry(&self, address: u32, delay: &mut TickCount) -> u32 {
        let (way, index, word) = self.diagnostic_target(address);
        *delay += 1;
        self.lookup(way, index).word(word)
    }

    /// Write one data word of a line
    ///
    /// Valid bits are not touched.
    pub fn write_cache_entry(&mut self, address: u32, value: u32, delay: &mut TickCount) {
        let (way, index, word) = self.diagnostic_target(address);
        *delay += 1;
        self.lookup_mut(way, index).set_word(word, value);
        log::debug!(
            "{}: diagnostic entry write way {} line {} word {} = 0x{:08X}",
            self.name,
            way,
            index,
            word,
            value
        );
    }

    /// Cache configuration register
    pub fn read_config_reg(&self, delay: &mut TickCount) -> u32 {
        *delay += 1;
        self.config_reg
    }
}
