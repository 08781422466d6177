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

//! Distance-vector routing.
//!
//! Every node keeps the last vector received from each neighbor, and recomputes its entire table
//! (Bellman-Ford) whenever a vector or a link changes. Vectors are sent with poisoned reverse: a
//! node advertises infinity to the neighbor it uses as next hop. Counting to infinity terminates at
//! the configured infinity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    packet::Packet,
    router::{AlgorithmError, ForwardingTable, FwEntry, RouterCtx, RoutingAlgorithm},
    types::{LinkWeight, NodeId, SimTime},
};

/// Default value for infinity.
pub const DEFAULT_INFINITY: LinkWeight = 64.0;

/// Vector sent to a neighbor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DvMessage {
    /// Advertised cost per destination.
    pub dv: Vec<(NodeId, LinkWeight)>,
}

/// Distance-vector routing algorithm.
#[derive(Debug, Clone)]
pub struct DistanceVector {
    id: NodeId,
    infinity: LinkWeight,
    links: BTreeMap<NodeId, LinkWeight>,
    vectors: BTreeMap<NodeId, BTreeMap<NodeId, LinkWeight>>,
    table: ForwardingTable,
}

impl DistanceVector {
    /// Create a new instance with the default infinity.
    pub fn new(id: NodeId) -> Self {
        Self::with_infinity(id, DEFAULT_INFINITY)
    }

    /// Create a new instance. Costs of `infinity` and above are considered unreachable.
    pub fn with_infinity(id: NodeId, infinity: LinkWeight) -> Self {
        Self {
            id,
            infinity,
            links: BTreeMap::new(),
            vectors: BTreeMap::new(),
            table: ForwardingTable::new(),
        }
    }

    /// The value used as infinity.
    pub fn infinity(&self) -> LinkWeight {
        self.infinity
    }

    /// Recompute the table from the stored vectors. Returns `true` if the table changed.
    fn recompute(&mut self) -> bool {
        let mut table = ForwardingTable::new();
        for (n, c) in self.links.iter() {
            let direct = std::iter::once((*n, 0.0));
            let learned = self
                .vectors
                .get(n)
                .into_iter()
                .flat_map(|v| v.iter().map(|(d, x)| (*d, *x)));
            for (dst, dist) in direct.chain(learned) {
                if dst == self.id {
                    continue;
                }
                let cost = c + dist;
                if cost >= self.infinity {
                    continue;
                }
                // neighbors are visited in ascending order, so ties go to the lowest id.
                match table.get(&dst) {
                    Some(e) if e.cost <= cost => {}
                    _ => {
                        table.insert(dst, FwEntry::new(*n, cost));
                    }
                }
            }
        }
        let changed = table != self.table;
        self.table = table;
        changed
    }

    /// Send the vector to all neighbors, with poisoned reverse.
    fn broadcast(&self, ctx: &mut RouterCtx) -> Result<(), AlgorithmError> {
        for n in self.links.keys() {
            let dv = std::iter::once((self.id, 0.0))
                .chain(self.table.iter().map(|(dst, e)| {
                    let cost = if e.next_hop == *n { self.infinity } else { e.cost };
                    (*dst, cost)
                }))
                .collect();
            let content = serde_json::to_value(DvMessage { dv })?;
            ctx.send(*n, content);
        }
        Ok(())
    }
}

impl RoutingAlgorithm for DistanceVector {
    fn name(&self) -> &'static str {
        "DV"
    }

    fn init(
        &mut self,
        ctx: &mut RouterCtx,
        neighbors: &[(NodeId, LinkWeight)],
    ) -> Result<(), AlgorithmError> {
        self.links = neighbors.iter().copied().collect();
        self.recompute();
        self.broadcast(ctx)
    }

    fn handle_packet(
        &mut self,
        ctx: &mut RouterCtx,
        from: NodeId,
        packet: &Packet,
    ) -> Result<(), AlgorithmError> {
        if !self.links.contains_key(&from) {
            // stale message over a link that went down in the meantime.
            return Ok(());
        }
        let content = packet
            .content()
            .ok_or_else(|| AlgorithmError::MalformedPacket("expected a control message".into()))?;
        let msg: DvMessage = serde_json::from_value(content.clone())?;
        self.vectors.insert(from, msg.dv.into_iter().collect());
        if self.recompute() {
            self.broadcast(ctx)?;
        }
        Ok(())
    }

    fn handle_new_link(
        &mut self,
        ctx: &mut RouterCtx,
        neighbor: NodeId,
        cost: LinkWeight,
    ) -> Result<(), AlgorithmError> {
        self.links.insert(neighbor, cost);
        self.recompute();
        self.broadcast(ctx)
    }

    fn handle_remove_link(
        &mut self,
        ctx: &mut RouterCtx,
        neighbor: NodeId,
    ) -> Result<(), AlgorithmError> {
        if self.links.remove(&neighbor).is_none() {
            return Err(AlgorithmError::UnknownNeighbor(neighbor));
        }
        self.vectors.remove(&neighbor);
        if self.recompute() {
            self.broadcast(ctx)?;
        }
        Ok(())
    }

    fn handle_time(&mut self, ctx: &mut RouterCtx, _now: SimTime) -> Result<(), AlgorithmError> {
        self.broadcast(ctx)
    }

    fn forwarding_table(&self) -> ForwardingTable {
        self.table.clone()
    }

    fn next_hop(&self, dst: NodeId) -> Option<FwEntry> {
        self.table.get(&dst).copied()
    }
}
