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

//! Module for defining events

use serde::{Deserialize, Serialize};

mod scheduler;
pub use scheduler::Scheduler;

use crate::{
    packet::Packet,
    topology::TopologyChange,
    types::{NodeId, SimTime},
};

/// Event to handle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Packet arriving at `to`, sent by the neighbor `from`.
    Packet {
        /// Neighbor that sent the packet over the link
        from: NodeId,
        /// Node at which the packet arrives
        to: NodeId,
        /// The packet itself
        packet: Packet,
    },
    /// A change of the topology becomes due.
    TopologyChange(TopologyChange),
    /// Periodic timer of a node fires.
    Timer(NodeId),
}

impl Event {
    /// Return the node where the event is processed. Topology changes concern two nodes and return
    /// `None`.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Event::Packet { to, .. } => Some(*to),
            Event::TopologyChange(_) => None,
            Event::Timer(node) => Some(*node),
        }
    }

    /// Returns `true` if the event is the arrival of a packet.
    pub fn is_packet(&self) -> bool {
        matches!(self, Event::Packet { .. })
    }

    /// Returns `true` if the event is a topology change.
    pub fn is_topology_change(&self) -> bool {
        matches!(self, Event::TopologyChange(_))
    }

    /// Returns `true` if the event is a periodic timer.
    pub fn is_timer(&self) -> bool {
        matches!(self, Event::Timer(_))
    }
}

/// An event together with its timestamp and insertion sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    /// Time at which the event happens
    pub time: SimTime,
    /// Insertion sequence number, used to break ties between events with equal time.
    pub seq: u64,
    /// The event
    pub event: Event,
}
