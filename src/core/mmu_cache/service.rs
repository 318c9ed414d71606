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

//! Split-phase channel services
//!
//! Each channel runs a small state machine on the front-end's
//! [`TimingEventManager`]:
//!
//! ```text
//!            begin_request              dequeue + execute
//!   Idle ───────────────────► Accepted ───────────────────► Processing
//!    ▲                                                           │
//!    │          response delay          access delay elapsed     │
//!    └──────────────────── ResponsePending ◄── begin_response ◄──┘
//! ```
//!
//! Requests are served strictly in acceptance order; two requests accepted
//! at the same cycle keep the order of their `begin_request` calls. The
//! instruction and data channels never wait on each other.

use super::payload::{Phase, SyncStatus, Transaction};
use super::MmuCache;
use crate::core::control::Channel;
use crate::core::timing::{EventHandle, PayloadEventQueue, TickCount, TimingEventManager};

/// Receiver of split-phase responses
pub trait Initiator {
    /// Response phase of `trans`
    ///
    /// `now` is the cycle the response is delivered. The initiator may add
    /// cycles to `delay` before the channel serves its next request.
    fn begin_response(
        &mut self,
        channel: Channel,
        trans: Transaction,
        now: TickCount,
        delay: &mut TickCount,
    ) -> SyncStatus;
}

/// Observable state of a channel service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    /// Requests queued, none in progress
    Accepted,
    Processing,
    ResponsePending,
}

#[derive(Debug)]
struct PendingRequest {
    trans: Transaction,
    due: TickCount,
    sequence: u64,
}

#[derive(Debug)]
enum ServiceState {
    Idle,
    /// Executed, waiting out the access delay
    Processing(Transaction),
    /// Response delivered, waiting out the initiator's delay
    ResponsePending,
}

/// Queue and state of one channel
pub(super) struct ChannelService {
    event: EventHandle,
    peq: PayloadEventQueue<PendingRequest>,
    state: ServiceState,
    sequence: u64,
}

impl ChannelService {
    pub(super) fn new(channel: Channel, timing: &mut TimingEventManager) -> Self {
        Self {
            event: timing.register_event(&format!("{} service", channel.name())),
            peq: PayloadEventQueue::new(),
            state: ServiceState::Idle,
            sequence: 0,
        }
    }

    fn state(&self) -> ChannelState {
        match self.state {
            ServiceState::Idle if self.peq.is_empty() => ChannelState::Idle,
            ServiceState::Idle => ChannelState::Accepted,
            ServiceState::Processing(_) => ChannelState::Processing,
            ServiceState::ResponsePending => ChannelState::ResponsePending,
        }
    }
}

impl MmuCache {
    #[inline(always)]
    fn port(&self, channel: Channel) -> &ChannelService {
        match channel {
            Channel::Instruction => &self.icio,
            Channel::Data => &self.dcio,
        }
    }

    #[inline(always)]
    fn port_mut(&mut self, channel: Channel) -> &mut ChannelService {
        match channel {
            Channel::Instruction => &mut self.icio,
            Channel::Data => &mut self.dcio,
        }
    }

    /// State of a channel service
    pub fn channel_state(&self, channel: Channel) -> ChannelState {
        self.port(channel).state()
    }

    /// Requests accepted but not yet executed
    pub fn queued_requests(&self, channel: Channel) -> usize {
        self.port(channel).peq.len()
    }

    /// Request phase of a split-phase access
    ///
    /// The transaction is queued for service `delay` cycles from now and the
    /// request phase ends at once; `delay` is consumed.
    ///
    /// # Returns
    ///
    /// `(EndReq, Updated)`
    pub fn begin_request(
        &mut self,
        channel: Channel,
        trans: Transaction,
        delay: &mut TickCount,
    ) -> (Phase, SyncStatus) {
        let due = self.timing.global_tick_counter + *delay;
        *delay = 0;

        let port = self.port_mut(channel);
        let sequence = port.sequence;
        port.sequence += 1;
        log::trace!(
            "{}: request {} (#{}) queued for cycle {}",
            channel.name(),
            trans.id,
            sequence,
            due
        );
        port.peq.notify(
            PendingRequest {
                trans,
                due,
                sequence,
            },
            due,
        );

        self.wake(channel, due);
        (Phase::EndReq, SyncStatus::Updated)
    }

    /// Response acknowledge of a split-phase access
    pub fn end_response(&mut self, channel: Channel) -> SyncStatus {
        log::trace!("{}: response acknowledged", channel.name());
        SyncStatus::Completed
    }

    /// Pump both channel services up to and including cycle `limit`
    ///
    /// Responses are delivered to `initiator` as they become due. On return
    /// the current time is `limit`.
    pub fn run_until(&mut self, limit: TickCount, initiator: &mut dyn Initiator) {
        while let Some(event) = self.timing.pop_event(limit) {
            let channel = if event == self.icio.event {
                Channel::Instruction
            } else if event == self.dcio.event {
                Channel::Data
            } else {
                log::warn!("{}: unexpected timing event {:?}", self.name, event);
                continue;
            };
            self.service(channel, initiator);
        }
        self.timing.advance_to(limit);
    }

    /// Cycle of the next pending service step
    pub fn next_event_time(&self) -> Option<TickCount> {
        self.timing.next_event_time()
    }

    /// Whether both channels are idle with nothing queued
    pub fn is_quiescent(&self) -> bool {
        self.channel_state(Channel::Instruction) == ChannelState::Idle
            && self.channel_state(Channel::Data) == ChannelState::Idle
    }

    /// Make sure an idle channel wakes up no later than `due`
    fn wake(&mut self, channel: Channel, due: TickCount) {
        let port = self.port(channel);
        if !matches!(port.state, ServiceState::Idle) {
            return;
        }

        let event = port.event;
        match self.timing.scheduled_time(event) {
            Some(time) if time <= due => {}
            _ => self.timing.schedule_at(event, due),
        }
    }

    fn service(&mut self, channel: Channel, initiator: &mut dyn Initiator) {
        let now = self.timing.global_tick_counter;
        let event = self.port(channel).event;
        let state = std::mem::replace(&mut self.port_mut(channel).state, ServiceState::Idle);

        match state {
            ServiceState::Idle => self.dequeue(channel),
            ServiceState::Processing(trans) => {
                let mut delay = 0;
                let status = initiator.begin_response(channel, trans, now, &mut delay);
                if status == SyncStatus::Updated {
                    log::warn!("{}: unexpected Updated in response phase", channel.name());
                }
                self.port_mut(channel).state = ServiceState::ResponsePending;
                self.timing.schedule(event, delay);
            }
            ServiceState::ResponsePending => self.dequeue(channel),
        }
    }

    /// Execute the oldest due request, or sleep until the next one
    fn dequeue(&mut self, channel: Channel) {
        let now = self.timing.global_tick_counter;
        let port = self.port_mut(channel);
        let event = port.event;

        let Some(pending) = port.peq.get_next_transaction(now) else {
            if let Some(due) = port.peq.next_time() {
                self.wake(channel, due);
            }
            return;
        };

        let mut trans = pending.trans;
        let mut delay = 0;
        self.b_transport(channel, &mut trans, &mut delay);
        log::trace!(
            "{}: request {} (#{}, due {}) executed at {}, delay {}",
            channel.name(),
            trans.id,
            pending.sequence,
            pending.due,
            now,
            delay
        );

        self.port_mut(channel).state = ServiceState::Processing(trans);
        self.timing.schedule(event, delay);
    }
}
