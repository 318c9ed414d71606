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

//! Transactions exchanged with the cache front-end
//!
//! A [`Transaction`] carries one CPU access. Its extension tells the
//! front-end how to treat it:
//!
//! | Channel     | Extension                       |
//! |-------------|---------------------------------|
//! | Instruction | `flush`, `debug`                |
//! | Data        | `asi`, `flush`, `lock`, `debug` |
//!
//! The `debug` field of the extension receives the [`DebugInfo`] word
//! produced while the transaction runs.

use crate::core::debug_info::DebugInfo;
use crate::core::error::{Result, SimError};

/// Default data ASI (user data)
pub const DEFAULT_DATA_ASI: u8 = 0xA;

/// Transaction command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Read,
    Write,
    /// No data transfer
    Ignore,
}

/// Completion status of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseStatus {
    #[default]
    Incomplete,
    Ok,
    AddressError,
    CommandError,
    GenericError,
}

impl ResponseStatus {
    /// Status reported for the outcome of an access
    pub fn from_result<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => ResponseStatus::Ok,
            Err(SimError::AddressError { .. }) => ResponseStatus::AddressError,
            Err(SimError::CommandError(_)) => ResponseStatus::CommandError,
            Err(_) => ResponseStatus::GenericError,
        }
    }

    #[inline(always)]
    pub fn is_ok(self) -> bool {
        self == ResponseStatus::Ok
    }
}

/// Attributes of an instruction fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstructionExtension {
    /// Flush both caches instead of fetching
    pub flush: bool,
    pub debug: DebugInfo,
}

/// Attributes of a data access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataExtension {
    /// Address space identifier
    pub asi: u8,
    /// Flush both caches instead of accessing memory
    pub flush: bool,
    /// Part of an atomic (locked) bus sequence
    pub lock: bool,
    pub debug: DebugInfo,
}

impl Default for DataExtension {
    fn default() -> Self {
        Self {
            asi: DEFAULT_DATA_ASI,
            flush: false,
            lock: false,
            debug: DebugInfo::new(),
        }
    }
}

impl DataExtension {
    pub fn with_asi(asi: u8) -> Self {
        Self {
            asi,
            ..Self::default()
        }
    }
}

/// Channel-specific transaction attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Instruction(InstructionExtension),
    Data(DataExtension),
}

/// A CPU access travelling through the front-end
///
/// # Example
///
/// ```
/// use sparcvp::core::mmu_cache::{Command, ResponseStatus, Transaction};
///
/// let trans = Transaction::read(0x4000_0000, 4).with_asi(0xB);
/// assert_eq!(trans.command, Command::Read);
/// assert_eq!(trans.data.len(), 4);
/// assert_eq!(trans.response, ResponseStatus::Incomplete);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Caller-chosen identifier, carried unchanged
    pub id: u64,
    pub command: Command,
    pub address: u32,
    /// Read destination or write source; its length is the access size
    pub data: Vec<u8>,
    pub response: ResponseStatus,
    pub extension: Option<Extension>,
}

impl Transaction {
    /// Read of `len` bytes without extension
    pub fn read(address: u32, len: usize) -> Self {
        Self {
            id: 0,
            command: Command::Read,
            address,
            data: vec![0; len],
            response: ResponseStatus::Incomplete,
            extension: None,
        }
    }

    /// Write of `data` without extension
    pub fn write(address: u32, data: &[u8]) -> Self {
        Self {
            command: Command::Write,
            data: data.to_vec(),
            ..Self::read(address, 0)
        }
    }

    /// Write of one big-endian word
    pub fn write_word(address: u32, value: u32) -> Self {
        Self::write(address, &value.to_be_bytes())
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    /// Attach a data extension with the given ASI
    pub fn with_asi(mut self, asi: u8) -> Self {
        self.extension = Some(Extension::Data(DataExtension::with_asi(asi)));
        self
    }

    /// Attach an instruction extension
    pub fn with_instruction(mut self, flush: bool) -> Self {
        self.extension = Some(Extension::Instruction(InstructionExtension {
            flush,
            debug: DebugInfo::new(),
        }));
        self
    }

    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extension = Some(extension);
        self
    }

    /// First four data bytes as a big-endian word, zero padded
    pub fn word(&self) -> u32 {
        super::load_word(&self.data)
    }

    /// Debug word left by the last execution
    pub fn debug_info(&self) -> Option<DebugInfo> {
        match self.extension {
            Some(Extension::Instruction(ext)) => Some(ext.debug),
            Some(Extension::Data(ext)) => Some(ext.debug),
            None => None,
        }
    }
}

/// Phase of a split-phase exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    BeginReq,
    EndReq,
    BeginResp,
    EndResp,
}

/// Return status of a split-phase call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Callee will answer later
    Accepted,
    /// Callee moved the phase forward
    Updated,
    /// Exchange is over
    Completed,
}
