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

//! sparcvp: A LEON3-style SPARC SoC virtual prototype
//!
//! This crate models the cache subsystem of a LEON3 processor core at
//! clock-cycle granularity.
//!
//! # Architecture
//!
//! The model is organized into the following modules:
//!
//! - [`core`]: Core components (cache engine, cache front-end, memory, timing)
//!
//! # Example
//!
//! ```
//! use sparcvp::core::config::PlatformConfig;
//! use sparcvp::core::platform::{parse_trace, Platform, TransportMode};
//!
//! let mut config = PlatformConfig::default();
//! config.mmu_cache.ccr_reset = 0xF; // both caches enabled
//!
//! let mut platform = Platform::new(config)?;
//! let trace = parse_trace("0 d r 0x40000000 4\n1 d r 0x40000000 4\n")?;
//! let summary = platform.run(&trace, TransportMode::Atomic);
//!
//! assert_eq!(summary.errors, 0);
//! assert_eq!(platform.mmu_cache().dcache().statistics().total_read_hits(), 1);
//! # Ok::<(), sparcvp::SimError>(())
//! ```
//!
//! # Getting Started
//!
//! 1. Load a [`core::config::PlatformConfig`] from TOML
//! 2. Create a [`core::platform::Platform`]
//! 3. Replay a transaction trace in atomic or split-phase mode
//!
//! # Modules
//!
//! - [`core::cache`]: Set-associative cache engine
//! - [`core::mmu_cache`]: Cache front-end with ASI decoding and split-phase transport
//! - [`core::memory`]: Memory bus and scratchpad RAM
//! - [`core::timing`]: Discrete-event scheduler
//! - [`core::platform`]: Trace-driven platform
//!
//! # Error Handling
//!
//! All fallible operations return [`core::error::Result<T>`] which is an alias for
//! `Result<T, SimError>`.

pub mod core;

// Re-export commonly used types
pub use core::error::{Result, SimError};
