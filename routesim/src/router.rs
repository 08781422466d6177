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

//! # Pluggable Router Interface
//!
//! Every node in the simulation runs one instance of a [`RoutingAlgorithm`]. The engine only talks
//! to the algorithm through this trait. An algorithm never gets access to the network: it learns
//! about its neighbors in [`RoutingAlgorithm::init`] and through link notifications, and it sends
//! packets by pushing them into the [`RouterCtx`] it receives on every call. Packets pushed into the
//! context are handed to the links after the call returns, so delivery is never synchronous.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    packet::Packet,
    types::{LinkWeight, NodeId, SimTime},
};

/// Forwarding table of a single node: destination -> entry.
pub type ForwardingTable = BTreeMap<NodeId, FwEntry>;

/// Single entry of a forwarding table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FwEntry {
    /// Neighbor to which packets for the destination are sent.
    pub next_hop: NodeId,
    /// Cost to reach the destination, as advertised by the algorithm.
    pub cost: LinkWeight,
}

impl FwEntry {
    /// Create a new entry.
    pub fn new(next_hop: NodeId, cost: LinkWeight) -> Self {
        Self { next_hop, cost }
    }
}

/// Error returned by a routing algorithm. Any error disables the node for the rest of the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmError {
    /// A control message could not be understood.
    #[error("Malformed control message: {0}")]
    MalformedPacket(String),
    /// The algorithm was notified about a node it does not know.
    #[error("Unknown neighbor: {0:?}")]
    UnknownNeighbor(NodeId),
    /// Any other error
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AlgorithmError {
    fn from(value: serde_json::Error) -> Self {
        Self::MalformedPacket(value.to_string())
    }
}

/// Context passed to every invocation of a [`RoutingAlgorithm`]. It tells the algorithm who it is
/// and what time it is, and collects the packets it wants to send.
#[derive(Debug)]
pub struct RouterCtx {
    node: NodeId,
    now: SimTime,
    outbox: Vec<(NodeId, Packet)>,
    num_sent: usize,
    limit: usize,
}

impl RouterCtx {
    /// Create a new context for `node` at time `now`, accepting at most `limit` packets.
    pub(crate) fn new(node: NodeId, now: SimTime, limit: usize) -> Self {
        Self {
            node,
            now,
            outbox: Vec::new(),
            num_sent: 0,
            limit,
        }
    }

    /// The node running the algorithm.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Send a control message with the given content to the neighbor `to`.
    pub fn send(&mut self, to: NodeId, content: serde_json::Value) {
        let packet = Packet::control(self.node, to, content);
        self.send_packet(to, packet)
    }

    /// Send an arbitrary packet to the neighbor `to`.
    pub fn send_packet(&mut self, to: NodeId, packet: Packet) {
        self.num_sent += 1;
        // keep the memory bounded, the host reports the overflow after the call returns.
        if self.num_sent <= self.limit {
            self.outbox.push((to, packet));
        }
    }

    /// Number of packets sent during this invocation (including those beyond the limit).
    pub fn num_sent(&self) -> usize {
        self.num_sent
    }

    pub(crate) fn into_outbox(self) -> Vec<(NodeId, Packet)> {
        self.outbox
    }
}

/// A routing algorithm that runs on a single node. Implementations must be deterministic given the
/// same sequence of calls.
///
/// All handlers may send packets through `ctx`. The engine calls [`RoutingAlgorithm::handle_time`]
/// periodically, which is the place for periodic advertisements. Link cost changes are reported
/// through [`RoutingAlgorithm::handle_new_link`] with the new cost.
pub trait RoutingAlgorithm: std::fmt::Debug {
    /// Short name of the algorithm, used in logs and reports.
    fn name(&self) -> &'static str;

    /// Called once before the simulation starts, with all live neighbors and the cost of the link
    /// to them.
    fn init(
        &mut self,
        ctx: &mut RouterCtx,
        neighbors: &[(NodeId, LinkWeight)],
    ) -> Result<(), AlgorithmError>;

    /// A packet sent by the neighbor `from` has arrived.
    fn handle_packet(
        &mut self,
        ctx: &mut RouterCtx,
        from: NodeId,
        packet: &Packet,
    ) -> Result<(), AlgorithmError>;

    /// The link to `neighbor` came up, or its cost changed to `cost`.
    fn handle_new_link(
        &mut self,
        ctx: &mut RouterCtx,
        neighbor: NodeId,
        cost: LinkWeight,
    ) -> Result<(), AlgorithmError>;

    /// The link to `neighbor` went down.
    fn handle_remove_link(
        &mut self,
        ctx: &mut RouterCtx,
        neighbor: NodeId,
    ) -> Result<(), AlgorithmError>;

    /// Periodic timer.
    fn handle_time(&mut self, ctx: &mut RouterCtx, now: SimTime) -> Result<(), AlgorithmError>;

    /// Current forwarding table. Destinations without a route must either be absent, or have an
    /// infinite cost.
    fn forwarding_table(&self) -> ForwardingTable;

    /// Lookup a single destination.
    fn next_hop(&self, dst: NodeId) -> Option<FwEntry> {
        self.forwarding_table().get(&dst).copied()
    }
}
