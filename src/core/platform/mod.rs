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

//! Trace-driven platform
//!
//! A [`Platform`] wires a [`Bus`] below an [`MmuCache`] and replays a
//! transaction trace through it, either with atomic transport or through
//! the split-phase channel services.

mod trace;

pub use trace::{load_trace, parse_trace, TraceEntry, TraceOp};

use crate::core::config::PlatformConfig;
use crate::core::control::Channel;
use crate::core::error::Result;
use crate::core::memory::{Bus, BusStatistics, SharedMemory};
use crate::core::mmu_cache::{Initiator, MmuCache, MmuCacheReport, SyncStatus, Transaction};
use crate::core::timing::TickCount;
use serde::Serialize;
use std::cell::{Ref, RefCell};
use std::path::Path;
use std::rc::Rc;

/// How a trace is driven through the front-end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Atomic,
    SplitPhase,
}

/// Outcome of a trace replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub transactions: u64,
    /// Transactions that completed with a non-OK response
    pub errors: u64,
    /// Data cache words invalidated by snoops
    pub snoop_invalidations: u64,
    /// Cycle at which the last transaction completed
    pub end_cycle: TickCount,
}

/// Full statistics report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformReport {
    pub mode: TransportMode,
    pub run: RunSummary,
    pub mmu_cache: MmuCacheReport,
    pub bus: BusStatistics,
}

/// Bus and cache front-end of one core
pub struct Platform {
    config: PlatformConfig,
    bus: Rc<RefCell<Bus>>,
    mmu_cache: MmuCache,
}

impl Platform {
    /// Build the platform
    ///
    /// # Errors
    ///
    /// Any cache configuration error.
    pub fn new(config: PlatformConfig) -> Result<Self> {
        let bus = Rc::new(RefCell::new(Bus::new(config.memory.clone())));
        let memory: SharedMemory = bus.clone();
        let mmu_cache = MmuCache::new("leon3", config.mmu_cache.clone(), memory)?;

        Ok(Self {
            config,
            bus,
            mmu_cache,
        })
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub fn bus(&self) -> Ref<'_, Bus> {
        self.bus.borrow()
    }

    pub fn mmu_cache(&self) -> &MmuCache {
        &self.mmu_cache
    }

    pub fn mmu_cache_mut(&mut self) -> &mut MmuCache {
        &mut self.mmu_cache
    }

    /// Preload a binary image into memory
    pub fn load_image<P: AsRef<Path>>(&mut self, path: P, address: u32) -> Result<usize> {
        self.bus.borrow_mut().load_image(path, address)
    }

    /// Replay a trace in the given mode
    pub fn run(&mut self, trace: &[TraceEntry], mode: TransportMode) -> RunSummary {
        let summary = match mode {
            TransportMode::Atomic => self.run_atomic(trace),
            TransportMode::SplitPhase => self.run_split_phase(trace),
        };
        log::info!(
            "Replayed {} transactions ({} errors) in {} cycles ({:?})",
            summary.transactions,
            summary.errors,
            summary.end_cycle,
            mode
        );
        summary
    }

    /// Replay back to back with atomic transport
    ///
    /// An access starts at its trace cycle or when the previous one
    /// finished, whichever is later.
    pub fn run_atomic(&mut self, trace: &[TraceEntry]) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut now: TickCount = 0;

        for entry in trace {
            now = now.max(entry.cycle);
            match &entry.op {
                TraceOp::Access { channel, trans } => {
                    let mut trans = trans.clone();
                    let mut delay = 0;
                    self.mmu_cache.b_transport(*channel, &mut trans, &mut delay);
                    now += delay;

                    summary.transactions += 1;
                    if !trans.response.is_ok() {
                        summary.errors += 1;
                        log::warn!(
                            "Transaction {} at 0x{:08X} failed: {:?}",
                            trans.id,
                            trans.address,
                            trans.response
                        );
                    }
                }
                TraceOp::Snoop(snoop) => {
                    summary.snoop_invalidations += self.mmu_cache.snoop(snoop) as u64;
                }
            }
        }

        summary.end_cycle = now;
        summary
    }

    /// Replay through the split-phase channel services
    ///
    /// Each access is issued at its trace cycle; both channels run
    /// concurrently.
    pub fn run_split_phase(&mut self, trace: &[TraceEntry]) -> RunSummary {
        let mut collector = ResponseCollector::default();
        let mut summary = RunSummary::default();

        for entry in trace {
            let issue = entry.cycle.max(self.mmu_cache.now());
            self.mmu_cache.run_until(issue, &mut collector);

            match &entry.op {
                TraceOp::Access { channel, trans } => {
                    let mut delay = 0;
                    self.mmu_cache.begin_request(*channel, trans.clone(), &mut delay);
                    summary.transactions += 1;
                }
                TraceOp::Snoop(snoop) => {
                    summary.snoop_invalidations += self.mmu_cache.snoop(snoop) as u64;
                }
            }
        }

        while let Some(next) = self.mmu_cache.next_event_time() {
            self.mmu_cache.run_until(next, &mut collector);
        }

        summary.errors = collector.errors;
        summary.end_cycle = collector.last_response;
        summary
    }

    /// Statistics of the last run and of every component
    pub fn report_data(&self, mode: TransportMode, run: RunSummary) -> PlatformReport {
        PlatformReport {
            mode,
            run,
            mmu_cache: self.mmu_cache.report_data(),
            bus: self.bus.borrow().statistics(),
        }
    }

    /// Statistics report as pretty-printed JSON
    pub fn report_json(&self, mode: TransportMode, run: RunSummary) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.report_data(mode, run))?)
    }

    /// Log the statistics of every component
    pub fn report(&self) {
        self.mmu_cache.report();
        let stats = self.bus.borrow().statistics();
        log::info!(
            "Bus * Reads: {} ({} bytes), writes: {} ({} bytes)",
            stats.reads,
            stats.bytes_read,
            stats.writes,
            stats.bytes_written
        );
    }
}

/// Split-phase initiator that only counts responses
#[derive(Default)]
struct ResponseCollector {
    errors: u64,
    last_response: TickCount,
}

impl Initiator for ResponseCollector {
    fn begin_response(
        &mut self,
        channel: Channel,
        trans: Transaction,
        now: TickCount,
        _delay: &mut TickCount,
    ) -> SyncStatus {
        if !trans.response.is_ok() {
            self.errors += 1;
            log::warn!(
                "{}: transaction {} at 0x{:08X} failed: {:?}",
                channel.name(),
                trans.id,
                trans.address,
                trans.response
            );
        }
        log::trace!("{}: response {} at cycle {}", channel.name(), trans.id, now);
        self.last_response = self.last_response.max(now);
        SyncStatus::Completed
    }
}
