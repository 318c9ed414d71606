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

//! SPARC address space identifiers decoded by the front-end

/// Forced cache miss (replace if cacheable)
pub const FORCE_MISS_0: u8 = 0x0;
pub const FORCE_MISS_1: u8 = 0x1;
/// System registers: CCR and cache configuration registers
pub const SYSTEM_REGISTERS: u8 = 0x2;
pub const FORCE_MISS_3: u8 = 0x3;
/// MMU flush/probe
pub const MMU_FLUSH_PROBE: u8 = 0x5;
/// MMU diagnostic
pub const MMU_DIAGNOSTIC: u8 = 0x6;
pub const USER_INSTRUCTION: u8 = 0x8;
pub const SUPERVISOR_INSTRUCTION: u8 = 0x9;
pub const USER_DATA: u8 = 0xA;
pub const SUPERVISOR_DATA: u8 = 0xB;
pub const ICACHE_TAGS: u8 = 0xC;
pub const ICACHE_DATA: u8 = 0xD;
pub const DCACHE_TAGS: u8 = 0xE;
pub const DCACHE_DATA: u8 = 0xF;
/// Flush both caches
pub const FLUSH_ALL: u8 = 0x11;
pub const FLUSH_ICACHE: u8 = 0x15;
pub const FLUSH_DCACHE: u8 = 0x16;
/// MMU registers
pub const MMU_REGISTERS: u8 = 0x18;
/// MMU bypass
pub const MMU_BYPASS: u8 = 0x19;
/// MMU and cache bypass
pub const CACHE_BYPASS: u8 = 0x1C;

/// System register offsets within ASI 0x2
pub const CCR_ADDRESS: u32 = 0x0;
pub const ICACHE_CONFIG_ADDRESS: u32 = 0x8;
pub const DCACHE_CONFIG_ADDRESS: u32 = 0xC;

/// ASIs that reach the scratchpad or the data cache
#[inline(always)]
pub fn is_memory_access(asi: u8) -> bool {
    matches!(
        asi,
        FORCE_MISS_0
            | FORCE_MISS_1
            | FORCE_MISS_3
            | USER_INSTRUCTION
            | SUPERVISOR_INSTRUCTION
            | USER_DATA
            | SUPERVISOR_DATA
    )
}

/// ASIs belonging to the (unmodelled) MMU
#[inline(always)]
pub fn is_mmu(asi: u8) -> bool {
    matches!(asi, MMU_FLUSH_PROBE | MMU_DIAGNOSTIC | MMU_REGISTERS | MMU_BYPASS)
}
