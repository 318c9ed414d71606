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

//! Cache control register (CCR)
//!
//! The CCR is read and written through ASI 0x2, address 0. Both cache
//! engines read their mode from it on every access.
//!
//! # Register Layout
//!
//! ```text
//! Bit   | Field | Description
//! ------|-------|--------------------------------------------------
//! 1-0   | ICS   | Instruction cache state (bit 0 enable, bit 1 not frozen)
//! 3-2   | DCS   | Data cache state (bit 2 enable, bit 3 not frozen)
//! 4     | IF    | Freeze icache on interrupt
//! 5     | DF    | Freeze dcache on interrupt
//! 14    | DP    | Dcache flush pending (reads as 0)
//! 15    | IP    | Icache flush pending (reads as 0)
//! 16    | IB    | Instruction burst fetch
//! 21    | FI    | Flush icache (write only)
//! 22    | FD    | Flush dcache (write only)
//! 23    | DS    | Data cache snoop enable
//! ```
//!
//! Cache state encoding: `00`/`10` disabled, `01` frozen, `11` enabled.

use bitflags::bitflags;
use std::cell::Cell;
use std::rc::Rc;

bitflags! {
    /// Cache control register
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CacheControl: u32 {
        /// Instruction cache enabled
        const ICS_ENABLE = 1 << 0;
        /// Instruction cache allocating (not frozen)
        const ICS_ALLOCATE = 1 << 1;
        /// Data cache enabled
        const DCS_ENABLE = 1 << 2;
        /// Data cache allocating (not frozen)
        const DCS_ALLOCATE = 1 << 3;
        /// Freeze icache on interrupt
        const IF = 1 << 4;
        /// Freeze dcache on interrupt
        const DF = 1 << 5;
        /// Dcache flush pending
        const DP = 1 << 14;
        /// Icache flush pending
        const IP = 1 << 15;
        /// Instruction burst fetch
        const IB = 1 << 16;
        /// Flush icache
        const FI = 1 << 21;
        /// Flush dcache
        const FD = 1 << 22;
        /// Data cache snooping
        const DS = 1 << 23;

        const _ = !0;
    }
}

impl CacheControl {
    /// Bits that keep their value after a register write
    pub const WRITE_MASK: u32 = 0xff9f_3fff;

    /// Register value stored for a software write
    ///
    /// Flush requests and flush-pending flags never read back.
    ///
    /// # Example
    ///
    /// ```
    /// use sparcvp::core::control::CacheControl;
    ///
    /// let ccr = CacheControl::from_write(0x0060_000F);
    /// assert_eq!(ccr.bits(), 0x0000_000F);
    /// ```
    #[inline(always)]
    pub fn from_write(value: u32) -> Self {
        Self::from_bits_retain(value & Self::WRITE_MASK)
    }

    /// Two-bit mode field of a channel
    #[inline(always)]
    pub fn mode(self, channel: Channel) -> CacheMode {
        CacheMode((self.bits() >> channel.mode_shift()) & 0x3)
    }
}

/// Shared register holder read by both engines
pub type SharedControl = Rc<Cell<CacheControl>>;

/// Cache channel of the CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Instruction fetch
    Instruction,
    /// Data load/store
    Data,
}

impl Channel {
    #[inline(always)]
    fn mode_shift(self) -> u32 {
        match self {
            Channel::Instruction => 0,
            Channel::Data => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::Instruction => "icache",
            Channel::Data => "dcache",
        }
    }
}

/// Mode predicate of one cache: bit 0 enabled, bit 1 not frozen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheMode(u32);

impl CacheMode {
    pub const DISABLED: CacheMode = CacheMode(0b00);
    pub const FROZEN: CacheMode = CacheMode(0b01);
    pub const ENABLED: CacheMode = CacheMode(0b11);

    /// Lookups are performed
    #[inline(always)]
    pub fn is_enabled(self) -> bool {
        self.0 & 0b01 != 0
    }

    /// Enabled and allocating new lines on miss
    #[inline(always)]
    pub fn is_allocating(self) -> bool {
        self.0 == 0b11
    }

    /// Enabled but not allocating
    #[inline(always)]
    pub fn is_frozen(self) -> bool {
        self.0 == 0b01
    }

    #[inline(always)]
    pub fn bits(self) -> u32 {
        self.0
    }
}
