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

//! Front-end scenarios on a small RAM whose words hold their own address

use super::*;
use crate::core::cache::ConfigRegister;
use crate::core::config::{MemoryConfig, ScratchpadConfig};
use crate::core::debug_info::{AccessKind, DebugFlags};
use crate::core::memory::Bus;
use std::cell::RefCell;

const RAM: u32 = 0x4000_0000;
const ENABLED: u32 = 0xF;

fn bus() -> Rc<RefCell<Bus>> {
    let mut bus = Bus::new(MemoryConfig {
        ram_size_kb: 64,
        ..MemoryConfig::default()
    });
    for address in (RAM..RAM + 0x1_0000).step_by(4) {
        bus.write32(address, address).unwrap();
    }
    Rc::new(RefCell::new(bus))
}

fn enabled() -> MmuCacheConfig {
    MmuCacheConfig {
        ccr_reset: ENABLED,
        ..MmuCacheConfig::default()
    }
}

fn fixture(config: MmuCacheConfig) -> (MmuCache, Rc<RefCell<Bus>>) {
    let bus = bus();
    let memory: SharedMemory = bus.clone();
    let cache = MmuCache::new("leon3", config, memory).unwrap();
    (cache, bus)
}

fn data_read(cache: &mut MmuCache, asi: u8, address: u32) -> (Transaction, TickCount) {
    let mut trans = Transaction::read(address, 4).with_asi(asi);
    let mut delay = 0;
    cache.b_transport(Channel::Data, &mut trans, &mut delay);
    (trans, delay)
}

fn data_write(cache: &mut MmuCache, asi: u8, address: u32, value: u32) -> (Transaction, TickCount) {
    let mut trans = Transaction::write_word(address, value).with_asi(asi);
    let mut delay = 0;
    cache.b_transport(Channel::Data, &mut trans, &mut delay);
    (trans, delay)
}

fn fetch(cache: &mut MmuCache, address: u32) -> (Transaction, TickCount) {
    let mut trans = Transaction::read(address, 4).with_instruction(false);
    let mut delay = 0;
    cache.b_transport(Channel::Instruction, &mut trans, &mut delay);
    (trans, delay)
}

// Atomic transport

#[test]
fn test_data_read_miss_then_hit() {
    let (mut cache, _) = fixture(enabled());

    let (trans, delay) = data_read(&mut cache, asi::USER_DATA, RAM + 0x20);
    assert_eq!(trans.response, ResponseStatus::Ok);
    assert_eq!(trans.word(), RAM + 0x20);
    assert_eq!(delay, 5);

    let (trans, delay) = data_read(&mut cache, asi::USER_DATA, RAM + 0x20);
    assert_eq!(trans.word(), RAM + 0x20);
    assert_eq!(delay, 0);

    assert_eq!(cache.dcache().statistics().read_misses, 1);
    assert_eq!(cache.dcache().statistics().total_read_hits(), 1);
    assert_eq!(
        cache.statistics(),
        FrontEndStatistics {
            transactions: 2,
            successful: 2,
            snoops: 0
        }
    );
}

#[test]
fn test_debug_word_is_returned() {
    let (mut cache, _) = fixture(enabled());

    let (trans, _) = data_read(&mut cache, asi::USER_DATA, RAM);
    let debug = trans.debug_info().unwrap();
    assert_eq!(debug.access_kind(), AccessKind::ReadMiss);

    let (trans, _) = data_read(&mut cache, asi::USER_DATA, RAM);
    assert_eq!(trans.debug_info().unwrap().access_kind(), AccessKind::ReadHit);
}

#[test]
fn test_missing_data_extension_uses_user_data() {
    let (mut cache, _) = fixture(enabled());

    let mut trans = Transaction::read(RAM, 4);
    let mut delay = 0;
    cache.b_transport(Channel::Data, &mut trans, &mut delay);

    assert_eq!(trans.response, ResponseStatus::Ok);
    assert_eq!(trans.word(), RAM);
    assert_eq!(trans.extension, None);
    assert_eq!(cache.dcache().statistics().read_misses, 1);
}

#[test]
fn test_data_write_is_write_through() {
    let (mut cache, bus) = fixture(enabled());

    let (trans, delay) = data_write(&mut cache, asi::USER_DATA, RAM + 0x40, 0x1234_5678);
    assert_eq!(trans.response, ResponseStatus::Ok);
    assert_eq!(delay, 2);
    assert_eq!(bus.borrow().read32(RAM + 0x40).unwrap(), 0x1234_5678);
    assert_eq!(cache.dcache().statistics().write_misses, 1);

    let (trans, _) = data_read(&mut cache, asi::USER_DATA, RAM + 0x40);
    assert_eq!(trans.word(), 0x1234_5678);
}

#[test]
fn test_instruction_fetch() {
    let (mut cache, _) = fixture(enabled());

    let (trans, delay) = fetch(&mut cache, RAM + 0x100);
    assert_eq!(trans.response, ResponseStatus::Ok);
    assert_eq!(trans.word(), RAM + 0x100);
    assert_eq!(delay, 5);

    let (_, delay) = fetch(&mut cache, RAM + 0x100);
    assert_eq!(delay, 0);
    assert_eq!(cache.icache().statistics().total_read_hits(), 1);
    assert_eq!(cache.dcache().statistics().read_misses, 0);
}

#[test]
fn test_instruction_without_extension_still_fetches() {
    let (mut cache, _) = fixture(enabled());

    let mut trans = Transaction::read(RAM, 4);
    let mut delay = 0;
    cache.b_transport(Channel::Instruction, &mut trans, &mut delay);

    assert_eq!(trans.response, ResponseStatus::Ok);
    assert_eq!(cache.icache().statistics().read_misses, 1);
}

#[test]
fn test_instruction_write_is_command_error() {
    let (mut cache, bus) = fixture(enabled());

    let mut trans = Transaction::write_word(RAM, 0).with_instruction(false);
    let mut delay = 0;
    cache.b_transport(Channel::Instruction, &mut trans, &mut delay);

    assert_eq!(trans.response, ResponseStatus::CommandError);
    assert_eq!(bus.borrow().read32(RAM).unwrap(), RAM);
    assert_eq!(cache.statistics().transactions, 1);
    assert_eq!(cache.statistics().successful, 0);
}

#[test]
fn test_flush_flag_flushes_both_caches() {
    let (mut cache, _) = fixture(enabled());
    data_read(&mut cache, asi::USER_DATA, RAM);
    fetch(&mut cache, RAM);

    let mut trans = Transaction::read(RAM, 4).with_instruction(true);
    let mut delay = 0;
    cache.b_transport(Channel::Instruction, &mut trans, &mut delay);
    assert_eq!(trans.response, ResponseStatus::Ok);
    assert!(trans.debug_info().unwrap().contains(DebugFlags::FLUSH));
    assert_eq!(delay, 0);

    data_read(&mut cache, asi::USER_DATA, RAM);
    fetch(&mut cache, RAM);
    assert_eq!(cache.dcache().statistics().read_misses, 2);
    assert_eq!(cache.icache().statistics().read_misses, 2);
}

#[test]
fn test_data_flush_flag_skips_memory() {
    let (mut cache, bus) = fixture(enabled());
    data_read(&mut cache, asi::USER_DATA, RAM);

    let mut trans = Transaction::write_word(RAM, 0).with_extension(Extension::Data(DataExtension {
        flush: true,
        ..DataExtension::default()
    }));
    let mut delay = 0;
    cache.b_transport(Channel::Data, &mut trans, &mut delay);

    assert_eq!(trans.response, ResponseStatus::Ok);
    assert_eq!(bus.borrow().read32(RAM).unwrap(), RAM);
    let (_, delay) = data_read(&mut cache, asi::USER_DATA, RAM);
    assert_eq!(delay, 5);
}

#[test]
fn test_downstream_error_becomes_response() {
    let (mut cache, _) = fixture(enabled());

    let (trans, _) = data_read(&mut cache, asi::USER_DATA, 0x2000_0000);
    assert_eq!(trans.response, ResponseStatus::AddressError);
    assert_eq!(cache.statistics().successful, 0);
}

// System registers

#[test]
fn test_ccr_read_write() {
    let (mut cache, _) = fixture(enabled());

    let (trans, delay) = data_read(&mut cache, asi::SYSTEM_REGISTERS, asi::CCR_ADDRESS);
    assert_eq!(trans.word(), ENABLED);
    assert_eq!(delay, 1);

    let (trans, delay) = data_write(&mut cache, asi::SYSTEM_REGISTERS, asi::CCR_ADDRESS, 0);
    assert_eq!(trans.response, ResponseStatus::Ok);
    assert_eq!(delay, 1);
    assert_eq!(cache.read_ccr(), 0);

    data_read(&mut cache, asi::USER_DATA, RAM);
    assert_eq!(cache.dcache().statistics().bypass_ops, 1);
    assert_eq!(cache.dcache().statistics().read_misses, 0);
}

#[test]
fn test_ccr_flush_bits() {
    let (mut cache, _) = fixture(enabled());
    data_read(&mut cache, asi::USER_DATA, RAM);
    fetch(&mut cache, RAM);

    let value = ENABLED | CacheControl::FD.bits();
    data_write(&mut cache, asi::SYSTEM_REGISTERS, asi::CCR_ADDRESS, value);
    assert_eq!(cache.read_ccr(), ENABLED);

    data_read(&mut cache, asi::USER_DATA, RAM);
    fetch(&mut cache, RAM);
    assert_eq!(cache.dcache().statistics().read_misses, 2);
    assert_eq!(cache.icache().statistics().total_read_hits(), 1);
}

#[test]
fn test_config_registers() {
    let config = enabled();
    let (mut cache, _) = fixture(config.clone());

    let (trans, delay) = data_read(&mut cache, asi::SYSTEM_REGISTERS, asi::ICACHE_CONFIG_ADDRESS);
    assert_eq!(trans.word(), ConfigRegister::from_config(&config.icache).pack());
    assert_eq!(delay, 1);

    let (trans, _) = data_read(&mut cache, asi::SYSTEM_REGISTERS, asi::DCACHE_CONFIG_ADDRESS);
    assert_eq!(trans.word(), ConfigRegister::from_config(&config.dcache).pack());

    let (trans, _) = data_read(&mut cache, asi::SYSTEM_REGISTERS, 0x4);
    assert_eq!(trans.response, ResponseStatus::AddressError);

    let (trans, _) = data_write(&mut cache, asi::SYSTEM_REGISTERS, asi::ICACHE_CONFIG_ADDRESS, 0);
    assert_eq!(trans.response, ResponseStatus::AddressError);
}

// Diagnostics and flush ASIs

#[test]
fn test_dcache_diagnostics() {
    let (mut cache, _) = fixture(enabled());
    data_read(&mut cache, asi::USER_DATA, RAM);

    // Way 0, line 0 of a 4 KB way
    let (trans, delay) = data_read(&mut cache, asi::DCACHE_TAGS, 0x0);
    assert_eq!(trans.word(), ((RAM >> 12) << 10) | 0x1);
    assert_eq!(delay, 1);

    let (trans, _) = data_read(&mut cache, asi::DCACHE_DATA, 0x0);
    assert_eq!(trans.word(), RAM);

    data_write(&mut cache, asi::DCACHE_DATA, 0x0, 0xABCD_0123);
    let (trans, delay) = data_read(&mut cache, asi::USER_DATA, RAM);
    assert_eq!(trans.word(), 0xABCD_0123);
    assert_eq!(delay, 0);
}

#[test]
fn test_icache_diagnostics() {
    let (mut cache, _) = fixture(enabled());

    data_write(&mut cache, asi::ICACHE_DATA, 0x4, 0x0102_0304);
    let (trans, _) = data_read(&mut cache, asi::ICACHE_DATA, 0x4);
    assert_eq!(trans.word(), 0x0102_0304);

    // Tag written through ASI 0xC makes the line hit
    let tag = ((RAM >> 12) << 10) | 0x3;
    data_write(&mut cache, asi::ICACHE_TAGS, 0x0, tag);
    let (trans, _) = data_read(&mut cache, asi::ICACHE_TAGS, 0x0);
    assert_eq!(trans.word(), tag);

    let (trans, delay) = fetch(&mut cache, RAM + 4);
    assert_eq!(trans.word(), 0x0102_0304);
    assert_eq!(delay, 0);
}

#[test]
fn test_flush_asis() {
    let (mut cache, _) = fixture(enabled());
    data_read(&mut cache, asi::USER_DATA, RAM);
    fetch(&mut cache, RAM);

    let (trans, _) = data_write(&mut cache, asi::FLUSH_DCACHE, 0, 0);
    assert_eq!(trans.response, ResponseStatus::Ok);
    data_read(&mut cache, asi::USER_DATA, RAM);
    fetch(&mut cache, RAM);
    assert_eq!(cache.dcache().statistics().read_misses, 2);
    assert_eq!(cache.icache().statistics().read_misses, 1);

    data_write(&mut cache, asi::FLUSH_ICACHE, 0, 0);
    fetch(&mut cache, RAM);
    assert_eq!(cache.icache().statistics().read_misses, 2);

    data_write(&mut cache, asi::FLUSH_ALL, 0, 0);
    data_read(&mut cache, asi::USER_DATA, RAM);
    fetch(&mut cache, RAM);
    assert_eq!(cache.dcache().statistics().read_misses, 3);
    assert_eq!(cache.icache().statistics().read_misses, 3);
}

#[test]
fn test_cache_bypass_asi_goes_to_memory() {
    let (mut cache, _) = fixture(enabled());

    let (trans, delay) = data_read(&mut cache, asi::CACHE_BYPASS, RAM + 8);
    assert_eq!(trans.word(), RAM + 8);
    assert_eq!(delay, 4);
    assert_eq!(cache.dcache().statistics().read_misses, 0);
    assert_eq!(cache.dcache().statistics().bypass_ops, 0);
}

#[test]
fn test_unsupported_asis_are_address_errors() {
    let (mut cache, _) = fixture(enabled());

    for asi in [
        asi::MMU_FLUSH_PROBE,
        asi::MMU_DIAGNOSTIC,
        asi::MMU_REGISTERS,
        asi::MMU_BYPASS,
        0x13,
        asi::FLUSH_ALL,
    ] {
        let (trans, _) = data_read(&mut cache, asi, RAM);
        assert_eq!(trans.response, ResponseStatus::AddressError, "asi 0x{:X}", asi);
    }
    let (trans, _) = data_write(&mut cache, asi::MMU_REGISTERS, 0, 0);
    assert_eq!(trans.response, ResponseStatus::AddressError);
}

// Scratchpads

fn with_scratchpads() -> MmuCacheConfig {
    let mut config = enabled();
    config.icache.scratchpad = ScratchpadConfig {
        enabled: true,
        start: 0x8e,
        size_log2_kb: 0,
    };
    config.dcache.scratchpad = ScratchpadConfig {
        enabled: true,
        start: 0x8f,
        size_log2_kb: 0,
    };
    config
}

#[test]
fn test_data_scratchpad_routing() {
    let (mut cache, _) = fixture(with_scratchpads());

    let (trans, _) = data_write(&mut cache, asi::USER_DATA, 0x8f00_0010, 0x5555_AAAA);
    assert_eq!(trans.response, ResponseStatus::Ok);
    assert!(trans.debug_info().unwrap().contains(DebugFlags::SCRATCHPAD));

    let (trans, delay) = data_read(&mut cache, asi::SUPERVISOR_DATA, 0x8f00_0010);
    assert_eq!(trans.word(), 0x5555_AAAA);
    assert_eq!(delay, 0);

    assert_eq!(cache.dcache().statistics().read_misses, 0);
    assert_eq!(cache.dcache().statistics().write_misses, 0);
    assert_eq!(cache.dlocalram().unwrap().statistics().writes, 1);

    // Past the end of the 1 KB scratchpad
    let (trans, _) = data_read(&mut cache, asi::USER_DATA, 0x8f00_0800);
    assert_eq!(trans.response, ResponseStatus::AddressError);
}

#[test]
fn test_instruction_scratchpad_routing() {
    let (mut cache, _) = fixture(with_scratchpads());

    let (trans, _) = fetch(&mut cache, 0x8e00_0000);
    assert_eq!(trans.response, ResponseStatus::Ok);
    assert_eq!(trans.word(), 0);
    assert_eq!(cache.ilocalram().unwrap().statistics().reads, 1);
    assert_eq!(cache.icache().statistics().read_misses, 0);
}

#[test]
fn test_instruction_scratchpad_loaded_through_data_channel() {
    let (mut cache, _) = fixture(with_scratchpads());

    let (trans, delay) = data_write(&mut cache, asi::SUPERVISOR_DATA, 0x8e00_0010, 0x0100_0000);
    assert_eq!(trans.response, ResponseStatus::Ok);
    assert!(trans.debug_info().unwrap().contains(DebugFlags::SCRATCHPAD));
    assert_eq!(delay, 0);

    let (trans, _) = fetch(&mut cache, 0x8e00_0010);
    assert_eq!(trans.response, ResponseStatus::Ok);
    assert_eq!(trans.word(), 0x0100_0000);

    let (trans, _) = data_read(&mut cache, asi::USER_DATA, 0x8e00_0010);
    assert_eq!(trans.word(), 0x0100_0000);

    let ilram = cache.ilocalram().unwrap().statistics();
    assert_eq!(ilram.writes, 1);
    assert_eq!(ilram.reads, 2);
    assert_eq!(cache.dlocalram().unwrap().statistics().writes, 0);
    assert_eq!(cache.dcache().statistics().write_misses, 0);
}

#[test]
fn test_scratchpads_absent_with_mmu() {
    let mut config = with_scratchpads();
    config.icache.mmu_enabled = true;
    config.dcache.mmu_enabled = true;
    let (mut cache, _) = fixture(config);

    assert!(cache.ilocalram().is_none());
    assert!(cache.dlocalram().is_none());

    // The window is plain unmapped memory now
    let (trans, _) = data_write(&mut cache, asi::USER_DATA, 0x8f00_0010, 1);
    assert_eq!(trans.response, ResponseStatus::AddressError);
}

#[test]
fn test_no_scratchpad_by_default() {
    let (cache, _) = fixture(enabled());
    assert!(cache.ilocalram().is_none());
    assert!(cache.dlocalram().is_none());
}

// Snooping

#[test]
fn test_snoop_from_other_master() {
    let config = MmuCacheConfig {
        dsnoop: true,
        master_id: 1,
        ..enabled()
    };
    let (mut cache, _) = fixture(config);
    data_read(&mut cache, asi::USER_DATA, RAM);

    let own = SnoopRequest {
        master_id: 1,
        address: RAM,
        length: 4,
    };
    assert_eq!(cache.snoop(&own), 0);

    let other = SnoopRequest { master_id: 2, ..own };
    assert_eq!(cache.snoop(&other), 1);
    assert_eq!(cache.statistics().snoops, 1);

    let (_, delay) = data_read(&mut cache, asi::USER_DATA, RAM);
    assert_eq!(delay, 5);
}

#[test]
fn test_snoop_disabled() {
    let (mut cache, _) = fixture(enabled());
    data_read(&mut cache, asi::USER_DATA, RAM);

    let snoop = SnoopRequest {
        master_id: 3,
        address: RAM,
        length: 4,
    };
    assert_eq!(cache.snoop(&snoop), 0);
    let (_, delay) = data_read(&mut cache, asi::USER_DATA, RAM);
    assert_eq!(delay, 0);
}

// Debug transport

#[test]
fn test_transport_dbg() {
    let (mut cache, _) = fixture(enabled());

    let mut trans = Transaction::read(RAM + 4, 4).with_asi(asi::USER_DATA);
    assert_eq!(cache.transport_dbg(Channel::Data, &mut trans), 4);
    assert_eq!(trans.word(), RAM + 4);
    assert_eq!(cache.dcache().statistics().bypass_ops, 1);
    assert_eq!(cache.dcache().statistics().read_misses, 0);
    assert_eq!(cache.statistics().transactions, 0);

    let mut trans = Transaction::read(0x2000_0000, 4).with_asi(asi::USER_DATA);
    assert_eq!(cache.transport_dbg(Channel::Data, &mut trans), 0);
}

#[test]
fn test_invalid_configuration() {
    let mut config = enabled();
    config.dcache.ways = 3;
    config.dcache.replacement = crate::core::cache::ReplacementPolicy::Lrr;

    let memory: SharedMemory = bus();
    assert!(matches!(
        MmuCache::new("leon3", config, memory),
        Err(SimError::LrrRequiresTwoWays { ways: 3 })
    ));
}

// Split-phase transport

#[derive(Debug)]
struct Response {
    channel: Channel,
    trans: Transaction,
    time: TickCount,
}

#[derive(Default)]
struct Recorder {
    responses: Vec<Response>,
    extra_delay: TickCount,
}

impl Initiator for Recorder {
    fn begin_response(
        &mut self,
        channel: Channel,
        trans: Transaction,
        now: TickCount,
        delay: &mut TickCount,
    ) -> SyncStatus {
        self.responses.push(Response {
            channel,
            trans,
            time: now,
        });
        *delay += self.extra_delay;
        SyncStatus::Completed
    }
}

fn request(cache: &mut MmuCache, channel: Channel, trans: Transaction, delay: TickCount) {
    let mut delay = delay;
    let (phase, status) = cache.begin_request(channel, trans, &mut delay);
    assert_eq!(phase, Phase::EndReq);
    assert_eq!(status, SyncStatus::Updated);
    assert_eq!(delay, 0);
}

#[test]
fn test_split_phase_matches_atomic() {
    let (mut atomic, _) = fixture(enabled());
    let (first, first_delay) = data_read(&mut atomic, asi::USER_DATA, RAM);
    let (second, second_delay) = data_read(&mut atomic, asi::USER_DATA, RAM + 0x100);

    let (mut cache, _) = fixture(enabled());
    let mut recorder = Recorder::default();

    request(
        &mut cache,
        Channel::Data,
        Transaction::read(RAM, 4).with_asi(asi::USER_DATA).with_id(1),
        0,
    );
    cache.run_until(0, &mut recorder);
    cache.run_until(1, &mut recorder);
    request(
        &mut cache,
        Channel::Data,
        Transaction::read(RAM + 0x100, 4)
            .with_asi(asi::USER_DATA)
            .with_id(2),
        0,
    );
    cache.run_until(100, &mut recorder);

    let responses = &recorder.responses;
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].trans.id, 1);
    assert_eq!(responses[1].trans.id, 2);
    assert_eq!(responses[0].time, first_delay);
    assert_eq!(responses[1].time, first_delay + second_delay);
    assert_eq!(responses[0].trans.data, first.data);
    assert_eq!(responses[1].trans.data, second.data);
    assert!(responses.iter().all(|r| r.trans.response.is_ok()));
    assert_eq!(cache.now(), 100);
    assert!(cache.is_quiescent());
}

#[test]
fn test_split_phase_same_cycle_is_fifo() {
    let (mut cache, _) = fixture(enabled());
    let mut recorder = Recorder::default();

    for id in 0..3 {
        let trans = Transaction::read(RAM + id as u32 * 0x10, 4)
            .with_asi(asi::USER_DATA)
            .with_id(id);
        request(&mut cache, Channel::Data, trans, 2);
    }
    assert_eq!(cache.queued_requests(Channel::Data), 3);
    cache.run_until(50, &mut recorder);

    let ids: Vec<u64> = recorder.responses.iter().map(|r| r.trans.id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
    let times: Vec<TickCount> = recorder.responses.iter().map(|r| r.time).collect();
    assert_eq!(times, vec![7, 12, 17]);
}

#[test]
fn test_request_waits_until_due() {
    let (mut cache, _) = fixture(enabled());
    let mut recorder = Recorder::default();

    request(
        &mut cache,
        Channel::Data,
        Transaction::read(RAM, 4).with_asi(asi::USER_DATA).with_id(4),
        10,
    );
    cache.run_until(9, &mut recorder);
    assert!(recorder.responses.is_empty());
    assert_eq!(cache.queued_requests(Channel::Data), 1);
    assert_eq!(cache.channel_state(Channel::Data), ChannelState::Accepted);

    cache.run_until(100, &mut recorder);
    assert_eq!(recorder.responses.len(), 1);
    assert_eq!(recorder.responses[0].time, 15);
    assert_eq!(cache.queued_requests(Channel::Data), 0);
}

#[test]
fn test_split_phase_channels_are_independent() {
    let (mut cache, _) = fixture(enabled());
    let mut recorder = Recorder::default();

    request(
        &mut cache,
        Channel::Instruction,
        Transaction::read(RAM, 4).with_instruction(false).with_id(10),
        0,
    );
    request(
        &mut cache,
        Channel::Data,
        Transaction::read(RAM + 0x200, 4).with_asi(asi::USER_DATA).with_id(20),
        0,
    );
    cache.run_until(20, &mut recorder);

    assert_eq!(recorder.responses.len(), 2);
    for response in &recorder.responses {
        assert_eq!(response.time, 5);
    }
    assert!(recorder
        .responses
        .iter()
        .any(|r| r.channel == Channel::Instruction && r.trans.id == 10));
    assert!(recorder
        .responses
        .iter()
        .any(|r| r.channel == Channel::Data && r.trans.id == 20));
}

#[test]
fn test_initiator_delay_holds_the_channel() {
    let (mut cache, _) = fixture(enabled());
    let mut recorder = Recorder {
        extra_delay: 3,
        ..Recorder::default()
    };

    request(
        &mut cache,
        Channel::Data,
        Transaction::read(RAM, 4).with_asi(asi::USER_DATA),
        0,
    );
    request(
        &mut cache,
        Channel::Data,
        Transaction::read(RAM + 0x100, 4).with_asi(asi::USER_DATA),
        0,
    );

    cache.run_until(0, &mut recorder);
    assert_eq!(cache.channel_state(Channel::Data), ChannelState::Processing);

    cache.run_until(5, &mut recorder);
    assert_eq!(recorder.responses.len(), 1);
    assert_eq!(
        cache.channel_state(Channel::Data),
        ChannelState::ResponsePending
    );

    cache.run_until(50, &mut recorder);
    assert_eq!(recorder.responses[1].time, 5 + 3 + 5);
    assert_eq!(cache.channel_state(Channel::Data), ChannelState::Idle);
}

#[test]
fn test_channel_states() {
    let (mut cache, _) = fixture(enabled());
    let mut recorder = Recorder::default();
    assert!(cache.is_quiescent());

    request(
        &mut cache,
        Channel::Data,
        Transaction::read(RAM, 4).with_asi(asi::USER_DATA),
        4,
    );
    assert_eq!(cache.channel_state(Channel::Data), ChannelState::Accepted);
    assert_eq!(cache.next_event_time(), Some(4));

    cache.run_until(3, &mut recorder);
    assert_eq!(cache.channel_state(Channel::Data), ChannelState::Accepted);
    assert!(recorder.responses.is_empty());

    cache.run_until(9, &mut recorder);
    assert_eq!(recorder.responses[0].time, 9);
    assert!(cache.is_quiescent());
    assert_eq!(cache.end_response(Channel::Data), SyncStatus::Completed);
}

#[test]
fn test_split_phase_errors_are_responses() {
    let (mut cache, _) = fixture(enabled());
    let mut recorder = Recorder::default();

    request(
        &mut cache,
        Channel::Instruction,
        Transaction::write_word(RAM, 0).with_instruction(false),
        0,
    );
    cache.run_until(10, &mut recorder);

    assert_eq!(recorder.responses.len(), 1);
    assert_eq!(
        recorder.responses[0].trans.response,
        ResponseStatus::CommandError
    );
    assert_eq!(recorder.responses[0].time, 0);
}

#[test]
fn test_report_data() {
    let (mut cache, _) = fixture(with_scratchpads());
    data_read(&mut cache, asi::USER_DATA, RAM);

    let report = cache.report_data();
    assert_eq!(report.frontend.transactions, 1);
    assert_eq!(report.dcache.read_misses, 1);
    assert!(report.dlocalram.is_some());

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["frontend"]["successful"], 1);

    cache.reset_statistics();
    assert_eq!(cache.report_data().dcache.read_misses, 0);
}
