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

//! # Router Host
//!
//! The [`RouterHost`] wraps a single [`RoutingAlgorithm`] and isolates it from the rest of the
//! simulation. Every call into the algorithm is guarded: a panic, a returned error, a packet sent to
//! a node that is not adjacent, or too many packets in a single invocation disables the node. A
//! disabled node ignores all further events, but the simulation of all other nodes continues.
//! The network then takes all links of the disabled node down and notifies its neighbors.
//!
//! A call that never returns (for instance, an algorithm stuck in an endless loop) cannot be
//! interrupted from within the host, and is therefore *not* turned into a [`RouterFault`]. Such a
//! run only ends when the wall-clock limit of the caller expires, or when the cancellation flag is
//! raised. The whole run is then reported as non-convergent, and not just the stuck node.
//!
//! The host also forwards data packets. Algorithms only maintain their forwarding table; the host
//! looks up the next hop and decrements the TTL.

use std::{
    collections::BTreeSet,
    panic::{catch_unwind, AssertUnwindSafe},
};

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    packet::{Packet, Payload},
    router::{AlgorithmError, ForwardingTable, FwEntry, RouterCtx, RoutingAlgorithm},
    types::{LinkWeight, NodeId, RouterFault, SimTime},
};

/// Change of a link, as seen from one of its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LinkEvent {
    /// The link came up with the given cost.
    Up(LinkWeight),
    /// The link went down.
    Down,
    /// The link changed its cost.
    Cost(LinkWeight),
}

/// What the host decides to do with a data packet.
#[derive(Debug, Clone, PartialEq)]
pub enum DataAction {
    /// The packet has reached its destination.
    Deliver(Packet),
    /// Send the packet to the given neighbor.
    Forward(NodeId, Packet),
    /// The TTL of the packet expired.
    TtlExpired(Packet),
    /// The node has no (valid) route towards the destination.
    NoRoute(Packet),
}

/// Counters of a single host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostStats {
    /// Number of calls into the algorithm.
    pub invocations: usize,
    /// Number of packets emitted by the algorithm.
    pub emitted: usize,
    /// Number of events ignored because the node is disabled.
    pub ignored: usize,
}

/// Host for a single routing algorithm.
#[derive(Debug)]
pub struct RouterHost {
    id: NodeId,
    algo: Box<dyn RoutingAlgorithm>,
    adjacent: BTreeSet<NodeId>,
    max_outbound: usize,
    fault: Option<RouterFault>,
    stats: HostStats,
}

impl RouterHost {
    /// Create a new host for node `id`. `adjacent` are all nodes with which `id` shares a link, no
    /// matter whether the link is live. The algorithm may emit at most `max_outbound` packets per
    /// invocation.
    pub fn new(
        id: NodeId,
        algo: Box<dyn RoutingAlgorithm>,
        adjacent: impl IntoIterator<Item = NodeId>,
        max_outbound: usize,
    ) -> Self {
        Self {
            id,
            algo,
            adjacent: adjacent.into_iter().collect(),
            max_outbound,
            fault: None,
            stats: HostStats::default(),
        }
    }

    /// Id of the node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Name of the hosted algorithm.
    pub fn algorithm_name(&self) -> &'static str {
        self.algo.name()
    }

    /// The fault that disabled this node, if any.
    pub fn fault(&self) -> Option<&RouterFault> {
        self.fault.as_ref()
    }

    /// Returns `true` if the node was disabled by a fault.
    pub fn is_disabled(&self) -> bool {
        self.fault.is_some()
    }

    /// Counters of this host.
    pub fn stats(&self) -> HostStats {
        self.stats
    }

    /// Initialize the algorithm with its live neighbors.
    pub fn init(
        &mut self,
        now: SimTime,
        neighbors: &[(NodeId, LinkWeight)],
    ) -> Result<Vec<(NodeId, Packet)>, RouterFault> {
        self.invoke(now, |algo, ctx| algo.init(ctx, neighbors))
    }

    /// A control packet arrived from the neighbor `from`.
    pub fn on_packet(
        &mut self,
        now: SimTime,
        from: NodeId,
        packet: &Packet,
    ) -> Result<Vec<(NodeId, Packet)>, RouterFault> {
        self.invoke(now, |algo, ctx| algo.handle_packet(ctx, from, packet))
    }

    /// The link to `neighbor` changed.
    pub fn on_link_change(
        &mut self,
        now: SimTime,
        neighbor: NodeId,
        change: LinkEvent,
    ) -> Result<Vec<(NodeId, Packet)>, RouterFault> {
        self.invoke(now, |algo, ctx| match change {
            LinkEvent::Up(cost) | LinkEvent::Cost(cost) => algo.handle_new_link(ctx, neighbor, cost),
            LinkEvent::Down => algo.handle_remove_link(ctx, neighbor),
        })
    }

    /// The periodic timer fired.
    pub fn on_timer(&mut self, now: SimTime) -> Result<Vec<(NodeId, Packet)>, RouterFault> {
        self.invoke(now, |algo, ctx| algo.handle_time(ctx, now))
    }

    /// Get a copy of the current forwarding table. A disabled node has an empty table. Entries
    /// towards the node itself are removed.
    pub fn snapshot_forwarding_table(&mut self) -> Result<ForwardingTable, RouterFault> {
        if self.fault.is_some() {
            return Ok(ForwardingTable::new());
        }
        let algo = &self.algo;
        match catch_unwind(AssertUnwindSafe(|| algo.forwarding_table())) {
            Ok(mut table) => {
                table.remove(&self.id);
                Ok(table)
            }
            Err(e) => Err(self.disable(RouterFault::Panicked(panic_message(e)))),
        }
    }

    /// Decide what to do with a data packet that arrived at this node. The TTL is decremented
    /// before the packet is forwarded.
    pub fn forward_data(&mut self, mut packet: Packet) -> Result<DataAction, RouterFault> {
        if packet.dst == self.id {
            return Ok(DataAction::Deliver(packet));
        }
        if self.fault.is_some() {
            self.stats.ignored += 1;
            return Ok(DataAction::NoRoute(packet));
        }
        if packet.ttl <= 1 {
            packet.ttl = 0;
            return Ok(DataAction::TtlExpired(packet));
        }
        let dst = packet.dst;
        let algo = &self.algo;
        let entry: Option<FwEntry> = match catch_unwind(AssertUnwindSafe(|| algo.next_hop(dst))) {
            Ok(entry) => entry,
            Err(e) => return Err(self.disable(RouterFault::Panicked(panic_message(e)))),
        };
        match entry {
            Some(FwEntry { next_hop, cost })
                if cost.is_finite() && next_hop != self.id && self.adjacent.contains(&next_hop) =>
            {
                packet.ttl -= 1;
                Ok(DataAction::Forward(next_hop, packet))
            }
            _ => Ok(DataAction::NoRoute(packet)),
        }
    }

    /// Call the algorithm, guarding against any misbehavior.
    fn invoke<F>(&mut self, now: SimTime, f: F) -> Result<Vec<(NodeId, Packet)>, RouterFault>
    where
        F: FnOnce(&mut dyn RoutingAlgorithm, &mut RouterCtx) -> Result<(), AlgorithmError>,
    {
        if self.fault.is_some() {
            self.stats.ignored += 1;
            return Ok(Vec::new());
        }
        self.stats.invocations += 1;

        let mut ctx = RouterCtx::new(self.id, now, self.max_outbound);
        let algo = self.algo.as_mut();
        let result = catch_unwind(AssertUnwindSafe(|| f(algo, &mut ctx)));

        match result {
            Err(e) => return Err(self.disable(RouterFault::Panicked(panic_message(e)))),
            Ok(Err(e)) => return Err(self.disable(RouterFault::Algorithm(e.to_string()))),
            Ok(Ok(())) => {}
        }

        if ctx.num_sent() > self.max_outbound {
            let num = ctx.num_sent();
            return Err(self.disable(RouterFault::OutboundFlood(num)));
        }

        let outbox = ctx.into_outbox();
        if let Some((to, _)) = outbox
            .iter()
            .find(|(to, _)| *to == self.id || !self.adjacent.contains(to))
        {
            let to = *to;
            return Err(self.disable(RouterFault::UnknownNeighbor(to)));
        }

        // only the host creates data packets.
        let outbox: Vec<_> = outbox
            .into_iter()
            .filter(|(_, p)| {
                let forged = matches!(p.payload, Payload::Data { .. });
                if forged {
                    debug!("Node {} sent a data packet, discarding it", self.id.index());
                }
                !forged
            })
            .collect();

        self.stats.emitted += outbox.len();
        Ok(outbox)
    }

    fn disable(&mut self, fault: RouterFault) -> RouterFault {
        warn!("Node {} disabled: {}", self.id.index(), fault);
        self.fault = Some(fault.clone());
        fault
    }
}

/// Extract the message of a panic payload.
fn panic_message(e: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = e.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = e.downcast_ref::<String>() {
        s.clone()
    } else {
        String::from("unknown panic")
    }
}
