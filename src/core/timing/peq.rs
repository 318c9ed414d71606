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

//! Payload event queue
//!
//! Holds payloads until a given simulated time. Payloads that become due at
//! the same cycle are released in notification order.

use super::TickCount;
use std::collections::BTreeMap;

/// Time-keyed FIFO of payloads
///
/// # Example
///
/// ```
/// use sparcvp::core::timing::PayloadEventQueue;
///
/// let mut peq = PayloadEventQueue::new();
/// peq.notify("late", 10);
/// peq.notify("early", 2);
///
/// assert_eq!(peq.get_next_transaction(1), None);
/// assert_eq!(peq.get_next_transaction(10), Some("early"));
/// assert_eq!(peq.get_next_transaction(10), Some("late"));
/// ```
#[derive(Debug)]
pub struct PayloadEventQueue<T> {
    entries: BTreeMap<(TickCount, u64), T>,
    sequence: u64,
}

impl<T> PayloadEventQueue<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            sequence: 0,
        }
    }

    /// Make `payload` available at absolute time `at`
    pub fn notify(&mut self, payload: T, at: TickCount) {
        self.entries.insert((at, self.sequence), payload);
        self.sequence += 1;
    }

    /// Take the oldest payload due at or before `now`
    pub fn get_next_transaction(&mut self, now: TickCount) -> Option<T> {
        let key = *self.entries.keys().next()?;
        if key.0 > now {
            return None;
        }
        self.entries.remove(&key)
    }

    /// Due time of the oldest payload
    pub fn next_time(&self) -> Option<TickCount> {
        self.entries.keys().next().map(|(time, _)| *time)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for PayloadEventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
