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

//! Error types for the virtual prototype
//!
//! Configuration errors are raised while the platform is being built and
//! abort the run before any simulated time elapses. Access errors are raised
//! by downstream memory and travel back to the initiator as a non-OK
//! response status.

use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors raised by the cache subsystem and its collaborators
#[derive(Debug, Error)]
pub enum SimError {
    /// Number of cache ways outside of 1..=4
    #[error("invalid number of cache ways: {ways} (expected 1-4)")]
    InvalidWays { ways: u32 },

    /// Line size is neither 4 nor 8 words
    #[error("invalid cache line size: {words} words (expected 4 or 8)")]
    InvalidLineSize { words: u32 },

    /// Way size exponent outside of 0..=8 (1 KB - 256 KB)
    #[error("invalid way size: 2^{log2_kb} KB (expected 2^0 - 2^8 KB)")]
    InvalidWaySize { log2_kb: u32 },

    /// LRR replacement requested on a cache that is not 2-way associative
    #[error("LRR replacement requires exactly 2 ways, got {ways}")]
    LrrRequiresTwoWays { ways: u32 },

    /// Direct-mapped replacement requested on a multi-way cache
    #[error("direct-mapped replacement is only valid for 1 way, got {ways}")]
    DirectMappedMultiWay { ways: u32 },

    /// Associative replacement policy requested on a 1-way cache
    #[error("a 1-way cache must use direct-mapped replacement, got {policy}")]
    AssociativeNeedsPolicy { policy: String },

    /// Scratchpad size exponent outside of 0..=9 (1 KB - 512 KB)
    #[error("invalid scratchpad size: 2^{log2_kb} KB (expected 2^0 - 2^9 KB)")]
    InvalidScratchpad { log2_kb: u32 },

    /// Access to an address no target responds to
    #[error("address error at 0x{address:08X}")]
    AddressError { address: u32 },

    /// Command not supported by the target (e.g. write on instruction channel)
    #[error("command error: {0}")]
    CommandError(String),

    /// Configuration file could not be interpreted
    #[error("configuration error: {0}")]
    ConfigLoad(String),

    /// Malformed line in a transaction trace
    #[error("trace line {line}: {message}")]
    TraceParse { line: usize, message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Statistics report could not be encoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    /// Whether this error is a configuration error that must stop the run
    ///
    /// # Example
    ///
    /// ```
    /// use sparcvp::SimError;
    ///
    /// assert!(SimError::InvalidWays { ways: 5 }.is_fatal());
    /// assert!(!SimError::AddressError { address: 0 }.is_fatal());
    /// ```
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            SimError::AddressError { .. } | SimError::CommandError(_)
        )
    }
}
