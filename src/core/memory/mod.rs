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

//! Downstream memory interface and AHB memory bus
//!
//! The cache engines talk to memory only through [`MemoryInterface`]. The
//! [`Bus`] is the stock implementation: a flat memory map with a boot ROM,
//! SDRAM and an uncacheable I/O window.
//!
//! # Memory Map (default configuration)
//!
//! | Address Range           | Region | Size   | Cacheable | Access |
//! |-------------------------|--------|--------|-----------|--------|
//! | 0x00000000-0x0007FFFF   | ROM    | 512KB  | yes       | R only |
//! | 0x40000000-0x403FFFFF   | RAM    | 4MB    | yes       | R/W    |
//! | 0x80000000-0x8000FFFF   | I/O    | 64KB   | no        | R/W    |
//!
//! A non-zero `cached_mask` in [`MemoryConfig`] overrides the per-region
//! cacheability: bit `n` marks the 256 MB segment `n` cacheable.
//!
//! All data buffers are in SPARC (big-endian) byte order.
//!
//! # Example
//!
//! ```
//! use sparcvp::core::config::MemoryConfig;
//! use sparcvp::core::debug_info::DebugInfo;
//! use sparcvp::core::memory::{Bus, MemRequest, MemoryInterface};
//!
//! let mut bus = Bus::new(MemoryConfig::default());
//! bus.write32(0x4000_0000, 0x1234_5678).unwrap();
//!
//! let mut data = [0u8; 4];
//! let mut delay = 0;
//! let mut debug = DebugInfo::new();
//! let cacheable = bus
//!     .mem_read(&MemRequest::new(0x4000_0000, 0xA), &mut data, &mut delay, &mut debug)
//!     .unwrap();
//!
//! assert!(cacheable);
//! assert_eq!(data, [0x12, 0x34, 0x56, 0x78]);
//! assert_eq!(delay, 4);
//! ```

use crate::core::config::MemoryConfig;
use crate::core::debug_info::DebugInfo;
use crate::core::error::{Result, SimError};
use crate::core::timing::TickCount;
use serde::Serialize;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

// Sub-modules
mod localram;
mod region;

// Re-export public types
pub use localram::{LocalRam, LocalRamStatistics};
pub use region::MemoryRegion;

/// Attributes of one memory access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemRequest {
    /// Byte address
    pub address: u32,
    /// SPARC address space identifier
    pub asi: u8,
    /// Debug access: no timing, no cache state change
    pub is_debug: bool,
    /// Part of a locked (atomic) sequence
    pub is_locked: bool,
}

impl MemRequest {
    pub fn new(address: u32, asi: u8) -> Self {
        Self {
            address,
            asi,
            is_debug: false,
            is_locked: false,
        }
    }

    pub fn debug(mut self, is_debug: bool) -> Self {
        self.is_debug = is_debug;
        self
    }

    pub fn locked(mut self, is_locked: bool) -> Self {
        self.is_locked = is_locked;
        self
    }

    /// Same attributes at another address
    pub fn at(mut self, address: u32) -> Self {
        self.address = address;
        self
    }
}

/// Memory seen below a cache engine
///
/// Implementations add their own access latency to `delay` and may annotate
/// `debug`. Errors travel back to the initiator as a non-OK response.
pub trait MemoryInterface {
    /// Read `data.len()` bytes
    ///
    /// # Returns
    ///
    /// Whether the data may be cached
    fn mem_read(
        &mut self,
        request: &MemRequest,
        data: &mut [u8],
        delay: &mut TickCount,
        debug: &mut DebugInfo,
    ) -> Result<bool>;

    /// Write `data.len()` bytes
    fn mem_write(
        &mut self,
        request: &MemRequest,
        data: &[u8],
        delay: &mut TickCount,
        debug: &mut DebugInfo,
    ) -> Result<()>;
}

/// Memory shared between both cache engines and the bypass path
pub type SharedMemory = Rc<RefCell<dyn MemoryInterface>>;

/// Access counters of the bus
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BusStatistics {
    pub reads: u64,
    pub writes: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub locked_accesses: u64,
    pub debug_accesses: u64,
}

/// AHB memory bus
pub struct Bus {
    config: MemoryConfig,

    /// Boot ROM, writable only through [`Bus::write_bytes`]
    rom: Vec<u8>,

    /// SDRAM
    ram: Vec<u8>,

    /// Plain register storage for the I/O window
    io: Vec<u8>,

    stats: BusStatistics,
}

impl Bus {
    /// Create a bus with zero-initialized memories
    pub fn new(config: MemoryConfig) -> Self {
        log::info!(
            "Bus: ROM {}KB @ 0x{:08X}, RAM {}KB @ 0x{:08X}, I/O {}KB @ 0x{:08X}",
            config.rom_size_kb,
            config.rom_start,
            config.ram_size_kb,
            config.ram_start,
            config.io_size_kb,
            config.io_start
        );

        Self {
            rom: vec![0u8; config.rom_size_kb as usize * 1024],
            ram: vec![0u8; config.ram_size_kb as usize * 1024],
            io: vec![0u8; config.io_size_kb as usize * 1024],
            config,
            stats: BusStatistics::default(),
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn statistics(&self) -> BusStatistics {
        self.stats
    }

    /// Whether data at `address` may be cached
    ///
    /// # Example
    ///
    /// ```
    /// use sparcvp::core::config::MemoryConfig;
    /// use sparcvp::core::memory::Bus;
    ///
    /// let bus = Bus::new(MemoryConfig::default());
    /// assert!(bus.is_cacheable(0x4000_0000));
    /// assert!(!bus.is_cacheable(0x8000_0000));
    /// ```
    pub fn is_cacheable(&self, address: u32) -> bool {
        if self.config.cached_mask != 0 {
            (self.config.cached_mask >> (address >> 28)) & 1 != 0
        } else {
            self.identify_region(address).is_cacheable()
        }
    }

    /// Backing storage and offset for `[address, address + len)`
    fn backing(&self, address: u32, len: usize) -> Result<(MemoryRegion, usize)> {
        let region = self.identify_region(address);
        let (base, size) = match region {
            MemoryRegion::Rom => (self.config.rom_start, self.rom.len()),
            MemoryRegion::Ram => (self.config.ram_start, self.ram.len()),
            MemoryRegion::Io => (self.config.io_start, self.io.len()),
            MemoryRegion::Unmapped => return Err(SimError::AddressError { address }),
        };

        let offset = address.wrapping_sub(base) as usize;
        if offset + len > size {
            return Err(SimError::AddressError { address });
        }
        Ok((region, offset))
    }

    fn storage(&self, region: MemoryRegion) -> &[u8] {
        match region {
            MemoryRegion::Rom => &self.rom,
            MemoryRegion::Ram => &self.ram,
            MemoryRegion::Io | MemoryRegion::Unmapped => &self.io,
        }
    }

    fn storage_mut(&mut self, region: MemoryRegion) -> &mut [u8] {
        match region {
            MemoryRegion::Rom => &mut self.rom,
            MemoryRegion::Ram => &mut self.ram,
            MemoryRegion::Io | MemoryRegion::Unmapped => &mut self.io,
        }
    }

    /// Copy bytes out of memory without timing or statistics
    pub fn read_bytes(&self, address: u32, data: &mut [u8]) -> Result<()> {
        let (region, offset) = self.backing(address, data.len())?;
        data.copy_from_slice(&self.storage(region)[offset..offset + data.len()]);
        Ok(())
    }

    /// Copy bytes into memory without timing or statistics
    ///
    /// ROM is writable here, which is how boot images are installed.
    pub fn write_bytes(&mut self, address: u32, data: &[u8]) -> Result<()> {
        let (region, offset) = self.backing(address, data.len())?;
        self.storage_mut(region)[offset..offset + data.len()].copy_from_slice(data);
        log::trace!("Bus: wrote {} bytes at 0x{:08X}", data.len(), address);
        Ok(())
    }

    /// Read a big-endian word (backdoor)
    pub fn read32(&self, address: u32) -> Result<u32> {
        let mut data = [0u8; 4];
        self.read_bytes(address, &mut data)?;
        Ok(u32::from_be_bytes(data))
    }

    /// Write a big-endian word (backdoor)
    pub fn write32(&mut self, address: u32, value: u32) -> Result<()> {
        self.write_bytes(address, &value.to_be_bytes())
    }

    /// Load a binary image file at `address`
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read and `AddressError` if the
    /// image does not fit in one region.
    pub fn load_image<P: AsRef<Path>>(&mut self, path: P, address: u32) -> Result<usize> {
        let image = std::fs::read(path.as_ref())?;
        self.write_bytes(address, &image)?;
        log::info!(
            "Bus: loaded {} bytes from {} at 0x{:08X}",
            image.len(),
            path.as_ref().display(),
            address
        );
        Ok(image.len())
    }

    fn count_access(&mut self, request: &MemRequest) {
        if request.is_locked {
            self.stats.locked_accesses += 1;
        }
        if request.is_debug {
            self.stats.debug_accesses += 1;
        }
    }
}

impl MemoryInterface for Bus {
    fn mem_read(
        &mut self,
        request: &MemRequest,
        data: &mut [u8],
        delay: &mut TickCount,
        _debug: &mut DebugInfo,
    ) -> Result<bool> {
        if let Err(e) = self.read_bytes(request.address, data) {
            log::warn!(
                "Bus: read of {} bytes at unmapped address 0x{:08X}",
                data.len(),
                request.address
            );
            return Err(e);
        }

        self.count_access(request);
        self.stats.reads += 1;
        self.stats.bytes_read += data.len() as u64;
        if !request.is_debug {
            *delay += self.config.read_latency;
        }

        log::trace!(
            "Bus: read {} bytes at 0x{:08X} (asi=0x{:X})",
            data.len(),
            request.address,
            request.asi
        );
        Ok(self.is_cacheable(request.address))
    }

    fn mem_write(
        &mut self,
        request: &MemRequest,
        data: &[u8],
        delay: &mut TickCount,
        _debug: &mut DebugInfo,
    ) -> Result<()> {
        let (region, offset) = match self.backing(request.address, data.len()) {
            Ok(found) => found,
            Err(e) => {
                log::warn!(
                    "Bus: write of {} bytes at unmapped address 0x{:08X}",
                    data.len(),
                    request.address
                );
                return Err(e);
            }
        };

        self.count_access(request);
        self.stats.writes += 1;
        self.stats.bytes_written += data.len() as u64;
        if !request.is_debug {
            *delay += self.config.write_latency;
        }

        if region == MemoryRegion::Rom {
            log::warn!("Bus: ignoring write to ROM at 0x{:08X}", request.address);
            return Ok(());
        }

        self.storage_mut(region)[offset..offset + data.len()].copy_from_slice(data);
        log::trace!(
            "Bus: wrote {} bytes at 0x{:08X} (asi=0x{:X})",
            data.len(),
            request.address,
            request.asi
        );
        Ok(())
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_bus() -> Bus {
        Bus::new(MemoryConfig {
            rom_size_kb: 4,
            ram_size_kb: 64,
            io_size_kb: 4,
            ..MemoryConfig::default()
        })
    }

    #[test]
    fn test_read_write_timing() {
        let mut bus = small_bus();
        let mut delay = 0;
        let mut debug = DebugInfo::new();

        let request = MemRequest::new(0x4000_0010, 0xB);
        bus.mem_write(&request, &[1, 2, 3, 4], &mut delay, &mut debug)
            .unwrap();
        assert_eq!(delay, 2);

        let mut data = [0u8; 4];
        assert!(bus.mem_read(&request, &mut data, &mut delay, &mut debug).unwrap());
        assert_eq!(data, [1, 2, 3, 4]);
        assert_eq!(delay, 6);

        let stats = bus.statistics();
        assert_eq!(stats.reads, 1);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.bytes_read, 4);
    }

    #[test]
    fn test_debug_access_is_untimed() {
        let mut bus = small_bus();
        let mut delay = 0;
        let mut debug = DebugInfo::new();
        let mut data = [0u8; 8];

        bus.mem_read(
            &MemRequest::new(0x4000_0000, 0x8).debug(true),
            &mut data,
            &mut delay,
            &mut debug,
        )
        .unwrap();
        assert_eq!(delay, 0);
        assert_eq!(bus.statistics().debug_accesses, 1);
    }

    #[test]
    fn test_unmapped_is_address_error() {
        let mut bus = small_bus();
        let mut delay = 0;
        let mut debug = DebugInfo::new();
        let mut data = [0u8; 4];

        let err = bus
            .mem_read(&MemRequest::new(0x2000_0000, 0xA), &mut data, &mut delay, &mut debug)
            .unwrap_err();
        assert!(matches!(err, SimError::AddressError { address: 0x2000_0000 }));

        // Straddling the end of RAM
        let end = 0x4000_0000 + 64 * 1024 - 2;
        assert!(bus
            .mem_write(&MemRequest::new(end, 0xA), &[0; 4], &mut delay, &mut debug)
            .is_err());
        assert_eq!(delay, 0);
    }

    #[test]
    fn test_rom_ignores_bus_writes() {
        let mut bus = small_bus();
        bus.write32(0x0000_0100, 0xDEAD_BEEF).unwrap();

        let mut delay = 0;
        let mut debug = DebugInfo::new();
        bus.mem_write(&MemRequest::new(0x100, 0xB), &[0; 4], &mut delay, &mut debug)
            .unwrap();
        assert_eq!(bus.read32(0x100).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn test_cacheability() {
        let bus = small_bus();
        assert!(bus.is_cacheable(0x0000_0000));
        assert!(bus.is_cacheable(0x4000_0000));
        assert!(!bus.is_cacheable(0x8000_0000));

        let masked = Bus::new(MemoryConfig {
            cached_mask: 0x0001,
            ram_size_kb: 4,
            ..MemoryConfig::default()
        });
        assert!(masked.is_cacheable(0x0000_0000));
        assert!(!masked.is_cacheable(0x4000_0000));
    }

    #[test]
    fn test_load_image() {
        let mut bus = small_bus();
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), [0xAA, 0xBB, 0xCC, 0xDD]).unwrap();

        assert_eq!(bus.load_image(file.path(), 0x4000_0020).unwrap(), 4);
        assert_eq!(bus.read32(0x4000_0020).unwrap(), 0xAABB_CCDD);
    }
}
