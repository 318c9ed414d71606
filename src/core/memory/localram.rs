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

//! Scratchpad local RAM
//!
//! A small single-cycle RAM sitting next to a cache. It decodes a 16 MB
//! window selected by the eight most significant address bits; only the
//! first `2^size_log2_kb` KB of that window are backed.
//!
//! Scratchpad data is never cached, and every access takes one cycle per
//! additional word beyond the first.

use super::MemRequest;
use crate::core::config::ScratchpadConfig;
use crate::core::debug_info::{DebugFlags, DebugInfo};
use crate::core::error::{Result, SimError};
use crate::core::timing::TickCount;
use serde::Serialize;

/// Access counters of a scratchpad
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LocalRamStatistics {
    pub reads: u64,
    pub writes: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

/// Scratchpad RAM
///
/// # Example
///
/// ```
/// use sparcvp::core::config::ScratchpadConfig;
/// use sparcvp::core::debug_info::DebugInfo;
/// use sparcvp::core::memory::{LocalRam, MemRequest};
///
/// let mut lram = LocalRam::new("dlocalram", &ScratchpadConfig {
///     enabled: true,
///     start: 0x8f,
///     size_log2_kb: 0,
/// });
///
/// let mut delay = 0;
/// let mut debug = DebugInfo::new();
/// let request = MemRequest::new(0x8f00_0010, 0xB);
/// lram.write(&request, &[1, 2, 3, 4, 5, 6, 7, 8], &mut delay, &mut debug).unwrap();
///
/// let mut data = [0u8; 8];
/// lram.read(&request, &mut data, &mut delay, &mut debug).unwrap();
/// assert_eq!(data, [1, 2, 3, 4, 5, 6, 7, 8]);
/// assert_eq!(delay, 2);
/// ```
pub struct LocalRam {
    name: String,
    base: u32,
    start: u8,
    data: Vec<u8>,
    stats: LocalRamStatistics,
}

impl LocalRam {
    pub fn new(name: &str, config: &ScratchpadConfig) -> Self {
        log::info!(
            "{}: {} KB scratchpad at 0x{:08X}",
            name,
            config.size_bytes() / 1024,
            config.base_address()
        );

        Self {
            name: name.to_string(),
            base: config.base_address(),
            start: config.start,
            data: vec![0u8; config.size_bytes()],
            stats: LocalRamStatistics::default(),
        }
    }

    /// Whether the address decodes to this scratchpad's 16 MB window
    #[inline(always)]
    pub fn decodes(&self, address: u32) -> bool {
        (address >> 24) as u8 == self.start
    }

    pub fn statistics(&self) -> LocalRamStatistics {
        self.stats
    }

    fn offset(&self, address: u32, len: usize) -> Result<usize> {
        let offset = address.wrapping_sub(self.base) as usize;
        if !self.decodes(address) || offset + len > self.data.len() {
            log::error!(
                "{}: access to 0x{:08X} ({} bytes) out of range",
                self.name,
                address,
                len
            );
            return Err(SimError::AddressError { address });
        }
        Ok(offset)
    }

    #[inline(always)]
    fn access_delay(len: usize) -> TickCount {
        (len.saturating_sub(1) >> 2) as TickCount
    }

    pub fn read(
        &mut self,
        request: &MemRequest,
        data: &mut [u8],
        delay: &mut TickCount,
        debug: &mut DebugInfo,
    ) -> Result<()> {
        let offset = self.offset(request.address, data.len())?;
        data.copy_from_slice(&self.data[offset..offset + data.len()]);

        self.stats.reads += 1;
        self.stats.bytes_read += data.len() as u64;
        debug.set(DebugFlags::SCRATCHPAD);
        if !request.is_debug {
            *delay += Self::access_delay(data.len());
        }

        log::debug!("{}: read from 0x{:08X}", self.name, request.address);
        Ok(())
    }

    pub fn write(
        &mut self,
        request: &MemRequest,
        data: &[u8],
        delay: &mut TickCount,
        debug: &mut DebugInfo,
    ) -> Result<()> {
        let offset = self.offset(request.address, data.len())?;
        self.data[offset..offset + data.len()].copy_from_slice(data);

        self.stats.writes += 1;
        self.stats.bytes_written += data.len() as u64;
        debug.set(DebugFlags::SCRATCHPAD);
        if !request.is_debug {
            *delay += Self::access_delay(data.len());
        }

        log::debug!("{}: write to 0x{:08X}", self.name, request.address);
        Ok(())
    }

    /// Log the access counters
    pub fn report(&self) {
        log::info!("{} * Read accesses:  {} (Bytes: {})", self.name, self.stats.reads, self.stats.bytes_read);
        log::info!(
            "{} * Write accesses: {} (Bytes: {})",
            self.name,
            self.stats.writes,
            self.stats.bytes_written
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lram() -> LocalRam {
        LocalRam::new(
            "test",
            &ScratchpadConfig {
                enabled: true,
                start: 0x8e,
                size_log2_kb: 0,
            },
        )
    }

    #[test]
    fn test_word_access_is_single_cycle() {
        let mut lram = lram();
        let mut delay = 0;
        let mut debug = DebugInfo::new();

        lram.write(&MemRequest::new(0x8e00_0000, 0xB), &[9, 8, 7, 6], &mut delay, &mut debug)
            .unwrap();
        assert_eq!(delay, 0);
        assert!(debug.contains(DebugFlags::SCRATCHPAD));
        assert_eq!(lram.statistics().bytes_written, 4);
    }

    #[test]
    fn test_out_of_range() {
        let mut lram = lram();
        let mut delay = 0;
        let mut debug = DebugInfo::new();
        let mut data = [0u8; 4];

        // Inside the 16 MB window but beyond the 1 KB backing
        let err = lram
            .read(&MemRequest::new(0x8e00_0400, 0xA), &mut data, &mut delay, &mut debug)
            .unwrap_err();
        assert!(matches!(err, SimError::AddressError { address: 0x8e00_0400 }));

        assert!(!lram.decodes(0x8f00_0000));
        assert!(lram
            .read(&MemRequest::new(0x8f00_0000, 0xA), &mut data, &mut delay, &mut debug)
            .is_err());
        assert_eq!(lram.statistics().reads, 0);
    }
}
