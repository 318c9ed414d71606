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

//! Victim selection
//!
//! Selection runs only when no way at the index has the refill words
//! invalid. The highest way can never be locked, so every policy finds an
//! unlocked victim.
//!
//! | Policy       | Code | Victim                                                  |
//! |--------------|------|---------------------------------------------------------|
//! | DirectMapped | 0    | way 0                                                   |
//! | Lru          | 1    | lowest age among unlocked ways, ties to the highest way |
//! | Lrr          | 2    | first unlocked way with `lrr == 0`, else way 1          |
//! | Random       | 3    | free-running counter modulo ways, skipping locked ways  |

use super::line::CacheMemory;
use serde::{Deserialize, Serialize};

/// Replacement policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementPolicy {
    DirectMapped,
    Lru,
    Lrr,
    Random,
}

impl ReplacementPolicy {
    /// Encoding in the cache configuration register
    #[inline(always)]
    pub fn code(self) -> u32 {
        match self {
            ReplacementPolicy::DirectMapped => 0,
            ReplacementPolicy::Lru => 1,
            ReplacementPolicy::Lrr => 2,
            ReplacementPolicy::Random => 3,
        }
    }

    pub fn from_code(code: u32) -> Self {
        match code & 0x3 {
            0 => ReplacementPolicy::DirectMapped,
            1 => ReplacementPolicy::Lru,
            2 => ReplacementPolicy::Lrr,
            _ => ReplacementPolicy::Random,
        }
    }
}

/// Saturation value of the LRU age for a given associativity
#[inline(always)]
pub fn max_lru(ways: usize) -> u8 {
    match ways {
        2 => 1,
        3 => 7,
        4 => 31,
        _ => 0,
    }
}

/// Replacement state of one cache
#[derive(Debug, Clone)]
pub struct Replacement {
    policy: ReplacementPolicy,
    ways: usize,
    max_lru: u8,
    pseudo_rand: u32,
}

impl Replacement {
    pub fn new(policy: ReplacementPolicy, ways: usize) -> Self {
        Self {
            policy,
            ways,
            max_lru: max_lru(ways),
            pseudo_rand: 0,
        }
    }

    #[inline(always)]
    pub fn policy(&self) -> ReplacementPolicy {
        self.policy
    }

    #[inline(always)]
    pub fn max_lru(&self) -> u8 {
        self.max_lru
    }

    /// Choose the way to evict at `index`
    pub fn select(&mut self, memory: &CacheMemory, index: usize) -> usize {
        let locked = |way: usize| memory.line(way, index).is_some_and(|line| line.tag.lock);

        match self.policy {
            ReplacementPolicy::DirectMapped => 0,
            ReplacementPolicy::Lru => {
                let mut min_lru = self.max_lru;
                let mut selected = self.ways - 1;
                for (way, tag) in memory.tags(index).enumerate() {
                    // Non-strict: equal ages move the choice to the higher way
                    if tag.lru <= min_lru && !tag.lock {
                        min_lru = tag.lru;
                        selected = way;
                    }
                }
                selected
            }
            ReplacementPolicy::Lrr => memory
                .tags(index)
                .take(2)
                .position(|tag| !tag.lrr && !tag.lock)
                .unwrap_or(1),
            ReplacementPolicy::Random => {
                for _ in 0..self.ways {
                    let way = (self.pseudo_rand % self.ways as u32) as usize;
                    self.pseudo_rand = self.pseudo_rand.wrapping_add(1);
                    if !locked(way) {
                        return way;
                    }
                }
                self.ways - 1
            }
        }
    }

    /// Make `way` the most recently used at `index`
    ///
    /// Every other way ages by one, saturating at zero.
    pub fn touch(&self, memory: &mut CacheMemory, index: usize, way: usize) {
        for w in 0..self.ways {
            if let Some(line) = memory.line_mut(w, index) {
                line.tag.lru = if w == way {
                    self.max_lru
                } else {
                    line.tag.lru.saturating_sub(1)
                };
            }
        }
    }

    /// Update history after a new tag was installed in `way`
    pub fn installed(&self, memory: &mut CacheMemory, index: usize, way: usize) {
        match self.policy {
            ReplacementPolicy::Lru => self.touch(memory, index, way),
            ReplacementPolicy::Lrr => {
                for w in 0..self.ways.min(2) {
                    if let Some(line) = memory.line_mut(w, index) {
                        line.tag.lrr = w == way;
                    }
                }
            }
            ReplacementPolicy::DirectMapped | ReplacementPolicy::Random => {}
        }
    }

    /// Record a hit on `way`
    #[inline(always)]
    pub fn hit(&self, memory: &mut CacheMemory, index: usize, way: usize) {
        if self.policy == ReplacementPolicy::Lru {
            self.touch(memory, index, way);
        }
    }
}
