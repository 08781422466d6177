// RouteSim: Discrete-event routing protocol simulator written in Rust
// Copyright (C) 2024 The RouteSim Authors
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! The discrete-event scheduler. It is the only source of simulated time.

use std::{cmp::Reverse, collections::HashMap};

use ordered_float::NotNan;
use priority_queue::PriorityQueue;

use super::{Event, ScheduledEvent};
use crate::types::{SchedulerError, SimTime};

/// Priority queue of all future events, ordered by their timestamp. Events with equal timestamps
/// are popped in the order in which they were scheduled, which makes every run reproducible.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    q: PriorityQueue<u64, Reverse<(NotNan<SimTime>, u64)>>,
    events: HashMap<u64, Event>,
    next_seq: u64,
    now: NotNan<SimTime>,
}

impl Scheduler {
    /// Create a new, empty scheduler at time 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `event` at `time`. The time must not lie before [`Scheduler::now`]. Returns the
    /// sequence number of the event.
    pub fn schedule(&mut self, time: SimTime, event: Event) -> Result<u64, SchedulerError> {
        let t = NotNan::new(time).map_err(|_| SchedulerError::InvalidTime(time))?;
        if !time.is_finite() {
            return Err(SchedulerError::InvalidTime(time));
        }
        if t < self.now {
            return Err(SchedulerError::InThePast {
                time,
                now: self.now(),
            });
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.insert(seq, event);
        self.q.push(seq, Reverse((t, seq)));
        Ok(seq)
    }

    /// Remove and return the earliest event, and move the clock to its timestamp.
    pub fn pop_next(&mut self) -> Result<ScheduledEvent, SchedulerError> {
        let (seq, Reverse((time, _))) = self.q.pop().ok_or(SchedulerError::EmptyQueue)?;
        let event = self
            .events
            .remove(&seq)
            .ok_or(SchedulerError::EmptyQueue)?;
        self.now = time;
        Ok(ScheduledEvent {
            time: time.into_inner(),
            seq,
            event,
        })
    }

    /// Timestamp of the last popped event (or the time set by [`Scheduler::advance_to`]).
    pub fn now(&self) -> SimTime {
        self.now.into_inner()
    }

    /// Timestamp of the next event, without removing it.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.q.peek().map(|(_, Reverse((t, _)))| t.into_inner())
    }

    /// Get a reference to the next event, without removing it.
    pub fn peek(&self) -> Option<&Event> {
        self.q.peek().and_then(|(seq, _)| self.events.get(seq))
    }

    /// Move the clock forward to `time` without processing an event. This is only possible if no
    /// event is scheduled before `time`.
    pub fn advance_to(&mut self, time: SimTime) -> Result<(), SchedulerError> {
        let t = NotNan::new(time).map_err(|_| SchedulerError::InvalidTime(time))?;
        if t < self.now {
            return Err(SchedulerError::InThePast {
                time,
                now: self.now(),
            });
        }
        if let Some(next) = self.peek_time() {
            if time > next {
                return Err(SchedulerError::SkipsEvent { time, next });
            }
        }
        self.now = t;
        Ok(())
    }

    /// Remove all events for which `keep` returns `false`. Returns the number of removed events.
    pub fn retain(&mut self, mut keep: impl FnMut(&Event) -> bool) -> usize {
        let remove: Vec<u64> = self
            .events
            .iter()
            .filter(|(_, e)| !keep(e))
            .map(|(seq, _)| *seq)
            .collect();
        for seq in remove.iter() {
            self.events.remove(seq);
            self.q.remove(seq);
        }
        remove.len()
    }

    /// Get the number of enqueued events
    pub fn len(&self) -> usize {
        self.q.len()
    }

    /// Return `true` if no event is enqueued.
    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }
}
