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

//! Discrete-event timing substrate
//!
//! All simulated time is counted in whole clock cycles. Components register
//! named events with the [`TimingEventManager`] and schedule them relative to
//! the current time; the owner pumps the manager, which hands back due events
//! strictly in time order. Events due at the same cycle come back in the
//! order they were scheduled.
//!
//! ```text
//!   schedule(h, 5) ──►  ┌───────────────────────────────┐
//!   schedule(g, 5) ──►  │ (time, seq) ordered queue     │ ──► pop_event(limit)
//!   schedule(k, 2) ──►  └───────────────────────────────┘      k, h, g
//! ```
//!
//! [`PayloadEventQueue`] is the per-channel companion: it holds payloads that
//! become available at a given time, used by the split-phase cache front-end
//! to hold accepted requests until their service time.
//!
//! # Example
//!
//! ```
//! use sparcvp::core::timing::TimingEventManager;
//!
//! let mut timing = TimingEventManager::new();
//! let tick = timing.register_event("tick");
//! timing.schedule(tick, 10);
//!
//! assert_eq!(timing.pop_event(5), None);
//! assert_eq!(timing.pop_event(20), Some(tick));
//! assert_eq!(timing.global_tick_counter, 10);
//! ```

mod peq;

pub use peq::PayloadEventQueue;

use std::collections::BTreeMap;

/// Cycle count type
pub type TickCount = u64;

/// Handle to a registered timing event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle(usize);

/// Book-keeping for one registered event
#[derive(Debug)]
struct TimingEvent {
    name: String,
    /// Queue key while the event is pending
    pending: Option<(TickCount, u64)>,
}

/// Time-ordered event scheduler
pub struct TimingEventManager {
    /// Current simulated time in cycles
    pub global_tick_counter: TickCount,

    /// Registered events, indexed by handle
    events: Vec<TimingEvent>,

    /// Pending events keyed by (due time, insertion sequence)
    queue: BTreeMap<(TickCount, u64), EventHandle>,

    /// Monotonic insertion counter for FIFO ordering on equal due times
    sequence: u64,
}

impl TimingEventManager {
    /// Create an empty scheduler at time 0
    pub fn new() -> Self {
        Self {
            global_tick_counter: 0,
            events: Vec::new(),
            queue: BTreeMap::new(),
            sequence: 0,
        }
    }

    /// Register a named event
    ///
    /// # Arguments
    ///
    /// * `name` - Human-readable name, used in trace logs
    ///
    /// # Returns
    ///
    /// Handle used to schedule the event
    pub fn register_event(&mut self, name: &str) -> EventHandle {
        let handle = EventHandle(self.events.len());
        self.events.push(TimingEvent {
            name: name.to_string(),
            pending: None,
        });
        log::debug!("Timing: registered event '{}' as {:?}", name, handle);
        handle
    }

    /// Schedule an event `ticks` cycles from now
    ///
    /// A pending event is moved to the new time.
    #[inline(always)]
    pub fn schedule(&mut self, handle: EventHandle, ticks: TickCount) {
        self.schedule_at(handle, self.global_tick_counter + ticks);
    }

    /// Schedule an event at an absolute time
    ///
    /// Times in the past are clamped to the current time.
    pub fn schedule_at(&mut self, handle: EventHandle, time: TickCount) {
        self.deschedule(handle);

        let time = time.max(self.global_tick_counter);
        let key = (time, self.sequence);
        self.sequence += 1;

        if let Some(event) = self.events.get_mut(handle.0) {
            event.pending = Some(key);
            self.queue.insert(key, handle);
            log::trace!("Timing: '{}' scheduled at cycle {}", event.name, time);
        } else {
            log::error!("Timing: schedule of unknown event {:?}", handle);
        }
    }

    /// Remove a pending event, if any
    pub fn deschedule(&mut self, handle: EventHandle) {
        if let Some(event) = self.events.get_mut(handle.0) {
            if let Some(key) = event.pending.take() {
                self.queue.remove(&key);
            }
        }
    }

    /// Whether the event is currently pending
    pub fn is_scheduled(&self, handle: EventHandle) -> bool {
        self.scheduled_time(handle).is_some()
    }

    /// Due time of a pending event
    pub fn scheduled_time(&self, handle: EventHandle) -> Option<TickCount> {
        self.events
            .get(handle.0)
            .and_then(|event| event.pending)
            .map(|(time, _)| time)
    }

    /// Due time of the earliest pending event
    pub fn next_event_time(&self) -> Option<TickCount> {
        self.queue.keys().next().map(|(time, _)| *time)
    }

    /// Pop the earliest event due at or before `limit`
    ///
    /// Advances the current time to the event's due time.
    pub fn pop_event(&mut self, limit: TickCount) -> Option<EventHandle> {
        let (&key, &handle) = self.queue.iter().next()?;
        if key.0 > limit {
            return None;
        }

        self.queue.remove(&key);
        if let Some(event) = self.events.get_mut(handle.0) {
            event.pending = None;
            log::trace!("Timing: '{}' fired at cycle {}", event.name, key.0);
        }
        self.global_tick_counter = self.global_tick_counter.max(key.0);
        Some(handle)
    }

    /// Advance the current time without firing anything
    ///
    /// Time never moves backwards.
    pub fn advance_to(&mut self, time: TickCount) {
        self.global_tick_counter = self.global_tick_counter.max(time);
    }

    /// Name of a registered event
    pub fn event_name(&self, handle: EventHandle) -> Option<&str> {
        self.events.get(handle.0).map(|event| event.name.as_str())
    }
}

impl Default for TimingEventManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_fire_in_time_order() {
        let mut timing = TimingEventManager::new();
        let a = timing.register_event("a");
        let b = timing.register_event("b");

        timing.schedule(a, 20);
        timing.schedule(b, 10);

        assert_eq!(timing.next_event_time(), Some(10));
        assert_eq!(timing.pop_event(100), Some(b));
        assert_eq!(timing.global_tick_counter, 10);
        assert_eq!(timing.pop_event(100), Some(a));
        assert_eq!(timing.global_tick_counter, 20);
        assert_eq!(timing.pop_event(100), None);
    }

    #[test]
    fn test_same_time_is_fifo() {
        let mut timing = TimingEventManager::new();
        let a = timing.register_event("a");
        let b = timing.register_event("b");
        let c = timing.register_event("c");

        timing.schedule(b, 5);
        timing.schedule(c, 5);
        timing.schedule(a, 5);

        assert_eq!(timing.pop_event(5), Some(b));
        assert_eq!(timing.pop_event(5), Some(c));
        assert_eq!(timing.pop_event(5), Some(a));
    }

    #[test]
    fn test_reschedule_replaces_pending() {
        let mut timing = TimingEventManager::new();
        let a = timing.register_event("a");

        timing.schedule(a, 50);
        timing.schedule(a, 3);

        assert_eq!(timing.scheduled_time(a), Some(3));
        assert_eq!(timing.pop_event(100), Some(a));
        assert_eq!(timing.pop_event(100), None);
        assert!(!timing.is_scheduled(a));
    }

    #[test]
    fn test_limit_and_advance() {
        let mut timing = TimingEventManager::new();
        let a = timing.register_event("a");
        timing.schedule(a, 8);

        assert_eq!(timing.pop_event(7), None);
        timing.advance_to(7);
        assert_eq!(timing.global_tick_counter, 7);

        // Past times clamp to now
        timing.advance_to(3);
        assert_eq!(timing.global_tick_counter, 7);
        timing.schedule_at(a, 1);
        assert_eq!(timing.scheduled_time(a), Some(7));
    }

    #[test]
    fn test_deschedule() {
        let mut timing = TimingEventManager::new();
        let a = timing.register_event("a");
        timing.schedule(a, 1);
        timing.deschedule(a);
        assert_eq!(timing.pop_event(10), None);
        assert_eq!(timing.event_name(a), Some("a"));
    }
}
