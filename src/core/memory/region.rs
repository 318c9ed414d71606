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

//! Memory region identification
//!
//! Regions are configured by base address and size; the first region that
//! contains an address wins (ROM, then RAM, then I/O).

use super::Bus;

/// Memory region identification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryRegion {
    /// Boot PROM
    Rom,
    /// SDRAM
    Ram,
    /// Memory-mapped I/O
    Io,
    /// Unmapped region
    Unmapped,
}

impl MemoryRegion {
    /// Default cacheability of the region
    #[inline(always)]
    pub fn is_cacheable(self) -> bool {
        matches!(self, MemoryRegion::Rom | MemoryRegion::Ram)
    }
}

#[inline(always)]
fn in_window(address: u32, start: u32, size_kb: u32) -> bool {
    let size = u64::from(size_kb) * 1024;
    address >= start && u64::from(address - start) < size
}

impl Bus {
    /// Identify memory region for an address
    ///
    /// # Arguments
    ///
    /// * `address` - Byte address
    ///
    /// # Returns
    ///
    /// The memory region that contains this address
    ///
    /// # Example
    ///
    /// ```
    /// use sparcvp::core::memory::{Bus, MemoryRegion};
    ///
    /// let bus = Bus::default();
    ///
    /// assert_eq!(bus.identify_region(0x0000_0000), MemoryRegion::Rom);
    /// assert_eq!(bus.identify_region(0x4000_0000), MemoryRegion::Ram);
    /// assert_eq!(bus.identify_region(0x8000_0000), MemoryRegion::Io);
    /// assert_eq!(bus.identify_region(0xF000_0000), MemoryRegion::Unmapped);
    /// ```
    pub fn identify_region(&self, address: u32) -> MemoryRegion {
        let config = self.config();

        if in_window(address, config.rom_start, config.rom_size_kb) {
            MemoryRegion::Rom
        } else if in_window(address, config.ram_start, config.ram_size_kb) {
            MemoryRegion::Ram
        } else if in_window(address, config.io_start, config.io_size_kb) {
            MemoryRegion::Io
        } else {
            MemoryRegion::Unmapped
        }
    }
}
