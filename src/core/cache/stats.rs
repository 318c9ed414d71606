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

//! Cache access statistics

use serde::Serialize;

/// Hit/miss counters of one cache engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatistics {
    /// Read hits per way
    pub read_hits: Vec<u64>,
    pub read_misses: u64,
    /// Write hits per way
    pub write_hits: Vec<u64>,
    pub write_misses: u64,
    /// Accesses that skipped the cache (debug, ASI 0x1C, cache disabled)
    pub bypass_ops: u64,
}

impl CacheStatistics {
    pub fn new(ways: usize) -> Self {
        Self {
            read_hits: vec![0; ways],
            write_hits: vec![0; ways],
            ..Self::default()
        }
    }

    pub fn total_read_hits(&self) -> u64 {
        self.read_hits.iter().sum()
    }

    pub fn total_write_hits(&self) -> u64 {
        self.write_hits.iter().sum()
    }

    /// Read hit rate in percent
    pub fn read_hit_rate(&self) -> f64 {
        Self::rate(self.total_read_hits(), self.read_misses)
    }

    /// Write hit rate in percent
    pub fn write_hit_rate(&self) -> f64 {
        Self::rate(self.total_write_hits(), self.write_misses)
    }

    fn rate(hits: u64, misses: u64) -> f64 {
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 * 100.0 / total as f64
        }
    }

    pub fn reset(&mut self) {
        let ways = self.read_hits.len();
        *self = Self::new(ways);
    }

    /// Log the counters under `name`
    pub fn report(&self, name: &str) {
        for (way, hits) in self.read_hits.iter().enumerate() {
            log::info!("{} * Read hits set{}: {}", name, way, hits);
        }
        for (way, hits) in self.write_hits.iter().enumerate() {
            log::info!("{} * Write hits set{}: {}", name, way, hits);
        }
        log::info!("{} * Total read hits: {}", name, self.total_read_hits());
        log::info!("{} * Total read misses: {}", name, self.read_misses);
        log::info!("{} * Read hit rate: {:.2}%", name, self.read_hit_rate());
        log::info!("{} * Total write hits: {}", name, self.total_write_hits());
        log::info!("{} * Total write misses: {}", name, self.write_misses);
        log::info!("{} * Write hit rate: {:.2}%", name, self.write_hit_rate());
        log::info!("{} * Bypass operations: {}", name, self.bypass_ops);
    }
}
