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

//! Cache front-end of a LEON3 core
//!
//! [`MmuCache`] owns the instruction and data cache engines, the optional
//! scratchpads and the cache control register. It accepts CPU accesses on
//! two independent channels and routes them by channel and ASI:
//!
//! ```text
//!                    ┌──────────────── MmuCache ────────────────┐
//!  instruction ────► │ flush? ─► both engines                   │
//!                    │ ilocalram window? ─► ilocalram           │
//!                    │ else ─► icache ──────────────┐           │
//!                    │                              ├─► memory  │
//!  data ─────────►   │ ASI 0x2 ─► CCR / config regs │           │
//!                    │ ASI 0xC-0xF ─► diagnostics   │           │
//!                    │ ASI 0x11/0x15/0x16 ─► flush  │           │
//!                    │ ASI 0x1C ─► memory ──────────┤           │
//!                    │ i/dlocalram window? ─► scratchpad        │
//!                    │ else ─► dcache ──────────────┘           │
//!                    └──────────────────────────────────────────┘
//! ```
//!
//! Accesses run either atomically ([`MmuCache::b_transport`]) or in split
//! phases through a per-channel service driven by [`MmuCache::run_until`].
//! Both modes execute the same functional path and yield the same delay.

pub mod asi;
mod payload;
mod service;

#[cfg(test)]
mod tests;

pub use payload::{
    Command, DataExtension, Extension, InstructionExtension, Phase, ResponseStatus, SyncStatus,
    Transaction, DEFAULT_DATA_ASI,
};
pub use service::{ChannelState, Initiator};

use crate::core::cache::{CacheEngine, CacheStatistics};
use crate::core::config::{CacheConfig, MmuCacheConfig};
use crate::core::control::{CacheControl, Channel, SharedControl};
use crate::core::debug_info::DebugInfo;
use crate::core::error::{Result, SimError};
use crate::core::memory::{LocalRam, LocalRamStatistics, MemRequest, SharedMemory};
use crate::core::timing::{TickCount, TimingEventManager};
use serde::Serialize;
use service::ChannelService;
use std::cell::Cell;
use std::rc::Rc;

/// Bus snoop notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnoopRequest {
    /// Bus master that performed the write
    pub master_id: u32,
    pub address: u32,
    /// Bytes written
    pub length: u32,
}

/// Front-end transaction counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrontEndStatistics {
    pub transactions: u64,
    pub successful: u64,
    pub snoops: u64,
}

/// Statistics of the front-end and everything behind it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MmuCacheReport {
    pub frontend: FrontEndStatistics,
    pub icache: CacheStatistics,
    pub dcache: CacheStatistics,
    pub ilocalram: Option<LocalRamStatistics>,
    pub dlocalram: Option<LocalRamStatistics>,
}

/// Cache front-end
pub struct MmuCache {
    name: String,
    config: MmuCacheConfig,
    control: SharedControl,
    memory: SharedMemory,

    icache: CacheEngine,
    dcache: CacheEngine,
    ilocalram: Option<LocalRam>,
    dlocalram: Option<LocalRam>,

    /// Drives the split-phase channel services
    timing: TimingEventManager,
    icio: ChannelService,
    dcio: ChannelService,

    stats: FrontEndStatistics,
}

impl MmuCache {
    /// Build the front-end and both engines
    ///
    /// # Arguments
    ///
    /// * `name` - Instance name, engines are named `<name>.icache` etc.
    /// * `config` - Geometry of both caches, snooping and CCR reset value
    /// * `memory` - Downstream memory shared by both engines
    ///
    /// # Errors
    ///
    /// Any cache configuration error.
    pub fn new(name: &str, config: MmuCacheConfig, memory: SharedMemory) -> Result<Self> {
        config.validate()?;

        let control: SharedControl = Rc::new(Cell::new(CacheControl::from_write(config.ccr_reset)));
        let icache = CacheEngine::new(
            &format!("{}.icache", name),
            Channel::Instruction,
            config.icache.clone(),
            memory.clone(),
            control.clone(),
        )?;
        let dcache = CacheEngine::new(
            &format!("{}.dcache", name),
            Channel::Data,
            config.dcache.clone(),
            memory.clone(),
            control.clone(),
        )?;

        let ilocalram = Self::scratchpad(&format!("{}.ilocalram", name), &config.icache);
        let dlocalram = Self::scratchpad(&format!("{}.dlocalram", name), &config.dcache);

        let mut timing = TimingEventManager::new();
        let icio = ChannelService::new(Channel::Instruction, &mut timing);
        let dcio = ChannelService::new(Channel::Data, &mut timing);

        log::info!(
            "{}: CCR 0x{:08X}, data snooping {}, master id {}",
            name,
            control.get().bits(),
            if config.dsnoop { "enabled" } else { "disabled" },
            config.master_id
        );

        Ok(Self {
            name: name.to_string(),
            config,
            control,
            memory,
            icache,
            dcache,
            ilocalram,
            dlocalram,
            timing,
            icio,
            dcio,
            stats: FrontEndStatistics::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &MmuCacheConfig {
        &self.config
    }

    pub fn icache(&self) -> &CacheEngine {
        &self.icache
    }

    pub fn dcache(&self) -> &CacheEngine {
        &self.dcache
    }

    /// Engine serving `channel`
    pub fn engine(&self, channel: Channel) -> &CacheEngine {
        match channel {
            Channel::Instruction => &self.icache,
            Channel::Data => &self.dcache,
        }
    }

    pub fn ilocalram(&self) -> Option<&LocalRam> {
        self.ilocalram.as_ref()
    }

    pub fn dlocalram(&self) -> Option<&LocalRam> {
        self.dlocalram.as_ref()
    }

    pub fn statistics(&self) -> FrontEndStatistics {
        self.stats
    }

    /// Current simulated time of the split-phase services
    #[inline(always)]
    pub fn now(&self) -> TickCount {
        self.timing.global_tick_counter
    }

    /// Cache control register
    #[inline(always)]
    pub fn read_ccr(&self) -> u32 {
        self.control.get().bits()
    }

    /// Write the cache control register
    ///
    /// FI and FD flush the instruction and data cache; neither reads back.
    pub fn write_ccr(&mut self, value: u32, debug: &mut DebugInfo) {
        let requested = CacheControl::from_bits_retain(value);
        if requested.contains(CacheControl::FD) {
            self.dcache.flush(debug);
        }
        if requested.contains(CacheControl::FI) {
            self.icache.flush(debug);
        }

        self.control.set(CacheControl::from_write(value));
        log::debug!("{}: CCR = 0x{:08X}", self.name, self.read_ccr());
    }

    /// Invalidate both caches
    pub fn flush_all(&mut self, debug: &mut DebugInfo) {
        self.icache.flush(debug);
        self.dcache.flush(debug);
    }

    /// Atomic transport
    ///
    /// Runs the access to completion, sets `trans.response` and adds the
    /// access time to `delay`.
    ///
    /// # Example
    ///
    /// ```
    /// use sparcvp::core::config::{MemoryConfig, MmuCacheConfig};
    /// use sparcvp::core::control::Channel;
    /// use sparcvp::core::memory::{Bus, SharedMemory};
    /// use sparcvp::core::mmu_cache::{MmuCache, ResponseStatus, Transaction};
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    ///
    /// let memory: SharedMemory = Rc::new(RefCell::new(Bus::new(MemoryConfig::default())));
    /// let config = MmuCacheConfig { ccr_reset: 0xF, ..MmuCacheConfig::default() };
    /// let mut cpu_cache = MmuCache::new("leon3", config, memory).unwrap();
    ///
    /// let mut delay = 0;
    /// let mut trans = Transaction::read(0x4000_0000, 4).with_asi(0xA);
    /// cpu_cache.b_transport(Channel::Data, &mut trans, &mut delay);
    ///
    /// assert_eq!(trans.response, ResponseStatus::Ok);
    /// assert_eq!(cpu_cache.dcache().statistics().read_misses, 1);
    /// ```
    pub fn b_transport(&mut self, channel: Channel, trans: &mut Transaction, delay: &mut TickCount) {
        self.stats.transactions += 1;
        self.execute(channel, trans, delay, false);
        if trans.response.is_ok() {
            self.stats.successful += 1;
        }
    }

    /// Debug transport
    ///
    /// Bypasses both caches and takes no time.
    ///
    /// # Returns
    ///
    /// Number of bytes transferred, 0 on error
    pub fn transport_dbg(&mut self, channel: Channel, trans: &mut Transaction) -> usize {
        let mut delay = 0;
        self.execute(channel, trans, &mut delay, true);
        if trans.response.is_ok() {
            trans.data.len()
        } else {
            0
        }
    }

    fn execute(
        &mut self,
        channel: Channel,
        trans: &mut Transaction,
        delay: &mut TickCount,
        is_debug: bool,
    ) {
        match channel {
            Channel::Instruction => self.exec_instr(trans, delay, is_debug),
            Channel::Data => self.exec_data(trans, delay, is_debug),
        }

        log::trace!(
            "{}: {} {:?} 0x{:08X} ({} bytes) -> {:?}, delay {}",
            self.name,
            channel.name(),
            trans.command,
            trans.address,
            trans.data.len(),
            trans.response,
            delay
        );
    }

    fn exec_instr(&mut self, trans: &mut Transaction, delay: &mut TickCount, is_debug: bool) {
        let mut ext = match trans.extension {
            Some(Extension::Instruction(ext)) => ext,
            _ => {
                log::error!(
                    "{}: instruction access to 0x{:08X} without instruction extension",
                    self.name,
                    trans.address
                );
                InstructionExtension::default()
            }
        };

        let result = if ext.flush {
            self.flush_all(&mut ext.debug);
            Ok(())
        } else {
            match trans.command {
                Command::Read => {
                    self.fetch(trans.address, &mut trans.data, delay, is_debug, &mut ext.debug)
                }
                Command::Write => {
                    log::error!(
                        "{}: write to 0x{:08X} on the instruction channel",
                        self.name,
                        trans.address
                    );
                    Err(SimError::CommandError(format!(
                        "write to 0x{:08X} on the instruction channel",
                        trans.address
                    )))
                }
                Command::Ignore => Ok(()),
            }
        };

        trans.response = ResponseStatus::from_result(&result);
        if let Some(Extension::Instruction(stored)) = trans.extension.as_mut() {
            stored.debug = ext.debug;
        }
    }

    /// Scratchpads only exist on cores without an MMU
    fn scratchpad(name: &str, config: &CacheConfig) -> Option<LocalRam> {
        if !config.scratchpad.enabled {
            return None;
        }
        if config.mmu_enabled {
            log::warn!("{}: scratchpad disabled, MMU is present", name);
            return None;
        }
        Some(LocalRam::new(name, &config.scratchpad))
    }

    /// Scratchpad decoding `address` for a data access, instruction window first
    fn local_ram(&mut self, address: u32) -> Option<&mut LocalRam> {
        if let Some(lram) = self.ilocalram.as_mut().filter(|l| l.decodes(address)) {
            return Some(lram);
        }
        self.dlocalram.as_mut().filter(|l| l.decodes(address))
    }

    fn fetch(
        &mut self,
        address: u32,
        data: &mut [u8],
        delay: &mut TickCount,
        is_debug: bool,
        debug: &mut DebugInfo,
    ) -> Result<()> {
        let request = MemRequest::new(address, asi::USER_INSTRUCTION).debug(is_debug);
        match self.ilocalram.as_mut() {
            Some(lram) if lram.decodes(address) => lram.read(&request, data, delay, debug),
            _ => self.icache.mem_read(&request, data, delay, debug).map(|_| ()),
        }
    }

    fn exec_data(&mut self, trans: &mut Transaction, delay: &mut TickCount, is_debug: bool) {
        let mut ext = match trans.extension {
            Some(Extension::Data(ext)) => ext,
            _ => {
                log::error!(
                    "{}: data access to 0x{:08X} without data extension, using ASI 0x{:X}",
                    self.name,
                    trans.address,
                    DEFAULT_DATA_ASI
                );
                DataExtension::default()
            }
        };

        let result = if ext.flush {
            self.flush_all(&mut ext.debug);
            Ok(())
        } else {
            match trans.command {
                Command::Read => {
                    self.data_read(trans.address, &mut trans.data, &mut ext, delay, is_debug)
                }
                Command::Write => {
                    self.data_write(trans.address, &trans.data, &mut ext, delay, is_debug)
                }
                Command::Ignore => Ok(()),
            }
        };

        trans.response = ResponseStatus::from_result(&result);
        if let Some(Extension::Data(stored)) = trans.extension.as_mut() {
            stored.debug = ext.debug;
        }
    }

    fn data_read(
        &mut self,
        address: u32,
        data: &mut [u8],
        ext: &mut DataExtension,
        delay: &mut TickCount,
        is_debug: bool,
    ) -> Result<()> {
        let request = MemRequest::new(address, ext.asi)
            .debug(is_debug)
            .locked(ext.lock);

        match ext.asi {
            asi::SYSTEM_REGISTERS => {
                let value = match address {
                    asi::CCR_ADDRESS => {
                        *delay += 1;
                        self.read_ccr()
                    }
                    asi::ICACHE_CONFIG_ADDRESS => self.icache.read_config_reg(delay),
                    asi::DCACHE_CONFIG_ADDRESS => self.dcache.read_config_reg(delay),
                    _ => {
                        log::error!(
                            "{}: address 0x{:X} not valid for read with ASI 0x2",
                            self.name,
                            address
                        );
                        return Err(SimError::AddressError { address });
                    }
                };
                store_word(data, value);
                Ok(())
            }
            asi::ICACHE_TAGS => {
                store_word(data, self.icache.read_cache_tag(address, delay));
                Ok(())
            }
            asi::ICACHE_DATA => {
                store_word(data, self.icache.read_cache_entry(address, delay));
                Ok(())
            }
            asi::DCACHE_TAGS => {
                store_word(data, self.dcache.read_cache_tag(address, delay));
                Ok(())
            }
            asi::DCACHE_DATA => {
                store_word(data, self.dcache.read_cache_entry(address, delay));
                Ok(())
            }
            asi::CACHE_BYPASS => self
                .memory
                .borrow_mut()
                .mem_read(&request, data, delay, &mut ext.debug)
                .map(|_| ()),
            code if asi::is_memory_access(code) => match self.local_ram(address) {
                Some(lram) => lram.read(&request, data, delay, &mut ext.debug),
                None => self
                    .dcache
                    .mem_read(&request, data, delay, &mut ext.debug)
                    .map(|_| ()),
            },
            code if asi::is_mmu(code) => {
                log::warn!("{}: MMU ASI 0x{:X} is not modelled", self.name, code);
                Err(SimError::AddressError { address })
            }
            code => {
                log::error!("{}: ASI 0x{:X} not recognized for read", self.name, code);
                Err(SimError::AddressError { address })
            }
        }
    }

    fn data_write(
        &mut self,
        address: u32,
        data: &[u8],
        ext: &mut DataExtension,
        delay: &mut TickCount,
        is_debug: bool,
    ) -> Result<()> {
        let request = MemRequest::new(address, ext.asi)
            .debug(is_debug)
            .locked(ext.lock);

        match ext.asi {
            asi::SYSTEM_REGISTERS => {
                *delay += 1;
                if address == asi::CCR_ADDRESS {
                    self.write_ccr(load_word(data), &mut ext.debug);
                    Ok(())
                } else {
                    log::error!(
                        "{}: address 0x{:X} not valid for write with ASI 0x2 (or read only)",
                        self.name,
                        address
                    );
                    Err(SimError::AddressError { address })
                }
            }
            asi::ICACHE_TAGS => {
                self.icache.write_cache_tag(address, load_word(data), delay);
                Ok(())
            }
            asi::ICACHE_DATA => {
                self.icache.write_cache_entry(address, load_word(data), delay);
                Ok(())
            }
            asi::DCACHE_TAGS => {
                self.dcache.write_cache_tag(address, load_word(data), delay);
                Ok(())
            }
            asi::DCACHE_DATA => {
                self.dcache.write_cache_entry(address, load_word(data), delay);
                Ok(())
            }
            asi::FLUSH_ALL => {
                self.flush_all(&mut ext.debug);
                Ok(())
            }
            asi::FLUSH_ICACHE => {
                self.icache.flush(&mut ext.debug);
                Ok(())
            }
            asi::FLUSH_DCACHE => {
                self.dcache.flush(&mut ext.debug);
                Ok(())
            }
            asi::CACHE_BYPASS => self
                .memory
                .borrow_mut()
                .mem_write(&request, data, delay, &mut ext.debug),
            code if asi::is_memory_access(code) => match self.local_ram(address) {
                Some(lram) => lram.write(&request, data, delay, &mut ext.debug),
                None => self.dcache.mem_write(&request, data, delay, &mut ext.debug),
            },
            code if asi::is_mmu(code) => {
                log::warn!("{}: MMU ASI 0x{:X} is not modelled", self.name, code);
                Err(SimError::AddressError { address })
            }
            code => {
                log::error!("{}: ASI 0x{:X} not recognized for write", self.name, code);
                Err(SimError::AddressError { address })
            }
        }
    }

    /// Bus snoop
    ///
    /// Invalidates data cache words written by another master. Ignored
    /// unless data snooping is configured.
    ///
    /// # Returns
    ///
    /// Number of words invalidated
    pub fn snoop(&mut self, snoop: &SnoopRequest) -> usize {
        if snoop.master_id == self.config.master_id || !self.config.dsnoop {
            return 0;
        }

        self.stats.snoops += 1;
        log::trace!(
            "{}: snoop from master {} at 0x{:08X}+{}",
            self.name,
            snoop.master_id,
            snoop.address,
            snoop.length
        );
        self.dcache.snoop_invalidate(snoop.address, snoop.length)
    }

    /// Snapshot of all counters
    pub fn report_data(&self) -> MmuCacheReport {
        MmuCacheReport {
            frontend: self.stats,
            icache: self.icache.statistics().clone(),
            dcache: self.dcache.statistics().clone(),
            ilocalram: self.ilocalram.as_ref().map(LocalRam::statistics),
            dlocalram: self.dlocalram.as_ref().map(LocalRam::statistics),
        }
    }

    pub fn reset_statistics(&mut self) {
        self.stats = FrontEndStatistics::default();
        self.icache.reset_statistics();
        self.dcache.reset_statistics();
    }

    /// Log all counters
    pub fn report(&self) {
        log::info!("{} * Total transactions: {}", self.name, self.stats.transactions);
        log::info!("{} * Successful transactions: {}", self.name, self.stats.successful);
        log::info!("{} * Snoops: {}", self.name, self.stats.snoops);
        self.icache.report();
        self.dcache.report();
        if let Some(lram) = &self.ilocalram {
            lram.report();
        }
        if let Some(lram) = &self.dlocalram {
            lram.report();
        }
    }
}

/// Big-endian word from the first four bytes, zero padded
fn load_word(data: &[u8]) -> u32 {
    let mut bytes = [0u8; 4];
    let len = data.len().min(4);
    bytes[..len].copy_from_slice(&data[..len]);
    u32::from_be_bytes(bytes)
}

fn store_word(data: &mut [u8], value: u32) {
    let len = data.len().min(4);
    data[..len].copy_from_slice(&value.to_be_bytes()[..len]);
}
