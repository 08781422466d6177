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

//! Packets exchanged between nodes.

use serde::{Deserialize, Serialize};

use crate::types::NodeId;

/// Initial TTL of every packet, unless configured otherwise.
pub const DEFAULT_TTL: u8 = 64;

/// A packet traveling through the simulated network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Node that created the packet.
    pub src: NodeId,
    /// Node to which the packet is addressed.
    pub dst: NodeId,
    /// Remaining number of hops. Data packets are dropped once it reaches zero.
    pub ttl: u8,
    /// Content of the packet.
    pub payload: Payload,
}

/// Content of a packet. The engine never looks into control messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// User data. The engine forwards it using the forwarding tables and appends every node it
    /// arrives at to `trace`.
    Data {
        /// Nodes visited so far, starting with the source.
        trace: Vec<NodeId>,
    },
    /// Routing-protocol message, opaque to the engine.
    Control(serde_json::Value),
}

impl Packet {
    /// Create a new routing-protocol message from `src` to the neighbor `dst`.
    pub fn control(src: NodeId, dst: NodeId, content: serde_json::Value) -> Self {
        Self {
            src,
            dst,
            ttl: DEFAULT_TTL,
            payload: Payload::Control(content),
        }
    }

    /// Create a new data packet from `src` to `dst`.
    pub fn data(src: NodeId, dst: NodeId, ttl: u8) -> Self {
        Self {
            src,
            dst,
            ttl,
            payload: Payload::Data { trace: vec![src] },
        }
    }

    /// Returns `true` if the packet carries user data.
    pub fn is_data(&self) -> bool {
        matches!(self.payload, Payload::Data { .. })
    }

    /// Returns `true` if the packet is a routing-protocol message.
    pub fn is_control(&self) -> bool {
        matches!(self.payload, Payload::Control(_))
    }

    /// Get the content of a control message.
    pub fn content(&self) -> Option<&serde_json::Value> {
        match &self.payload {
            Payload::Control(v) => Some(v),
            Payload::Data { .. } => None,
        }
    }

    /// Get the trace of a data packet.
    pub fn trace(&self) -> Option<&[NodeId]> {
        match &self.payload {
            Payload::Data { trace } => Some(trace),
            Payload::Control(_) => None,
        }
    }
}
