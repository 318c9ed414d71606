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

//! Per-access debug information word
//!
//! Every memory access carries a 32-bit word that the cache engines and
//! memory models annotate with what happened to it.
//!
//! ```text
//! Bit   | Meaning
//! ------|-----------------------------------------------
//! 1-0   | Way that served the access
//! 3-2   | 00 read hit, 01 read miss, 10 write hit, 11 write miss
//! 4     | Cache flushed
//! 11    | Served by scratchpad
//! 12    | Cache bypassed
//! 13    | Miss while frozen
//! ```

use bitflags::bitflags;

bitflags! {
    /// Single-bit annotations
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DebugFlags: u32 {
        const FLUSH = 1 << 4;
        const SCRATCHPAD = 1 << 11;
        const BYPASS = 1 << 12;
        const FROZEN_MISS = 1 << 13;
    }
}

/// Outcome of a cached access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    ReadHit = 0,
    ReadMiss = 1,
    WriteHit = 2,
    WriteMiss = 3,
}

/// Debug information word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebugInfo(u32);

impl DebugInfo {
    /// Bits cleared when an access outcome is recorded
    const OUTCOME_CLEAR: u32 = 0xffff_f7f0;

    pub fn new() -> Self {
        Self(0)
    }

    #[inline(always)]
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Record the outcome of a cached access
    ///
    /// Clears the previous way, kind and scratchpad annotation.
    #[inline(always)]
    pub fn set_access(&mut self, kind: AccessKind, way: usize) {
        self.0 = (self.0 & Self::OUTCOME_CLEAR) | ((kind as u32) << 2) | (way as u32 & 0x3);
    }

    #[inline(always)]
    pub fn set(&mut self, flags: DebugFlags) {
        self.0 |= flags.bits();
    }

    #[inline(always)]
    pub fn contains(self, flags: DebugFlags) -> bool {
        self.0 & flags.bits() == flags.bits()
    }

    pub fn access_kind(self) -> AccessKind {
        match (self.0 >> 2) & 0x3 {
            0 => AccessKind::ReadHit,
            1 => AccessKind::ReadMiss,
            2 => AccessKind::WriteHit,
            _ => AccessKind::WriteMiss,
        }
    }

    #[inline(always)]
    pub fn way(self) -> usize {
        (self.0 & 0x3) as usize
    }
}
