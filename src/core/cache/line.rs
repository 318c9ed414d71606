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

//! Cache tag and data storage

/// Largest supported line, in bytes (8 words)
pub const MAX_LINE_BYTES: usize = 32;

/// Tag of one cache line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheLineTag {
    /// Address tag
    pub atag: u32,
    /// One bit per word (bit 0 only in new-line-fetch mode)
    pub valid: u8,
    /// LRU age; the most recently used way holds the maximum
    pub lru: u8,
    /// LRR history bit (2-way only)
    pub lrr: bool,
    /// Line is locked against replacement
    pub lock: bool,
}

/// One cache line: tag plus up to 8 words of data
///
/// Data is held in SPARC (big-endian) byte order so byte, half-word and
/// word accesses can slice it directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheLine {
    pub tag: CacheLineTag,
    pub data: [u8; MAX_LINE_BYTES],
}

impl CacheLine {
    /// Word `index` of the line
    #[inline(always)]
    pub fn word(&self, index: usize) -> u32 {
        let start = (index * 4) % MAX_LINE_BYTES;
        u32::from_be_bytes([
            self.data[start],
            self.data[start + 1],
            self.data[start + 2],
            self.data[start + 3],
        ])
    }

    #[inline(always)]
    pub fn set_word(&mut self, index: usize, value: u32) {
        let start = (index * 4) % MAX_LINE_BYTES;
        self.data[start..start + 4].copy_from_slice(&value.to_be_bytes());
    }
}

/// All lines of one way
#[derive(Debug, Clone)]
pub struct CacheSet {
    lines: Vec<CacheLine>,
}

impl CacheSet {
    pub fn new(lines: usize) -> Self {
        Self {
            lines: vec![CacheLine::default(); lines],
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[inline(always)]
    pub fn get(&self, index: usize) -> Option<&CacheLine> {
        self.lines.get(index)
    }

    #[inline(always)]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut CacheLine> {
        self.lines.get_mut(index)
    }

    fn invalidate(&mut self) {
        for line in &mut self.lines {
            line.tag.valid = 0;
        }
    }
}

/// The ways of one cache
///
/// Created once at construction and never resized.
#[derive(Debug, Clone)]
pub struct CacheMemory {
    sets: Vec<CacheSet>,
}

impl CacheMemory {
    pub fn new(ways: usize, lines_per_way: usize) -> Self {
        Self {
            sets: (0..ways).map(|_| CacheSet::new(lines_per_way)).collect(),
        }
    }

    #[inline(always)]
    pub fn ways(&self) -> usize {
        self.sets.len()
    }

    #[inline(always)]
    pub fn contains(&self, way: usize, index: usize) -> bool {
        self.sets.get(way).is_some_and(|set| index < set.len())
    }

    #[inline(always)]
    pub fn line(&self, way: usize, index: usize) -> Option<&CacheLine> {
        self.sets.get(way).and_then(|set| set.get(index))
    }

    #[inline(always)]
    pub fn line_mut(&mut self, way: usize, index: usize) -> Option<&mut CacheLine> {
        self.sets.get_mut(way).and_then(|set| set.get_mut(index))
    }

    /// Tags of the line at `index` in every way
    pub fn tags(&self, index: usize) -> impl Iterator<Item = CacheLineTag> + '_ {
        self.sets
            .iter()
            .filter_map(move |set| set.get(index).map(|line| line.tag))
    }

    /// Clear every valid mask
    pub fn invalidate_all(&mut self) {
        for set in &mut self.sets {
            set.invalidate();
        }
    }
}
