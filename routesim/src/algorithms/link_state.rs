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

//! Link-state routing.
//!
//! Every node floods a link-state advertisement ([`Lsa`]) containing its live links. Each
//! advertisement carries a sequence number, and a node only accepts (and forwards) advertisements
//! that are newer than the one it already knows. Nodes re-advertise their own links periodically.
//!
//! The forwarding table is computed from the link-state database. A link is only used if both
//! endpoints advertise it. For each destination, the next hop is the neighbor `n` minimizing
//! `cost(self, n) + dist(n, dst)`, where `dist` is computed on the graph without `self`.

use std::collections::{BTreeMap, HashMap};

use petgraph::{algo::dijkstra, graph::UnGraph, visit::EdgeRef};
use serde::{Deserialize, Serialize};

use crate::{
    packet::Packet,
    router::{AlgorithmError, ForwardingTable, FwEntry, RouterCtx, RoutingAlgorithm},
    types::{LinkWeight, NodeId, SimTime},
};

/// Link-state advertisement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lsa {
    /// Node that originated the advertisement
    pub source: NodeId,
    /// Sequence number, increased by the source on every change.
    pub seq: u64,
    /// Live links of the source with their cost.
    pub links: Vec<(NodeId, LinkWeight)>,
}

/// Link-state routing algorithm.
#[derive(Debug, Clone)]
pub struct LinkState {
    id: NodeId,
    seq: u64,
    links: BTreeMap<NodeId, LinkWeight>,
    lsdb: BTreeMap<NodeId, Lsa>,
    table: ForwardingTable,
}

impl LinkState {
    /// Create a new instance.
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            seq: 0,
            links: BTreeMap::new(),
            lsdb: BTreeMap::new(),
            table: ForwardingTable::new(),
        }
    }

    /// The link-state database.
    pub fn lsdb(&self) -> &BTreeMap<NodeId, Lsa> {
        &self.lsdb
    }

    /// Create a new advertisement of the own links and store it in the database.
    fn originate(&mut self) -> Lsa {
        self.seq += 1;
        let lsa = Lsa {
            source: self.id,
            seq: self.seq,
            links: self.links.iter().map(|(n, c)| (*n, *c)).collect(),
        };
        self.lsdb.insert(self.id, lsa.clone());
        lsa
    }

    /// Send the advertisement to all neighbors, except `except`.
    fn flood(
        &self,
        ctx: &mut RouterCtx,
        lsa: &Lsa,
        except: Option<NodeId>,
    ) -> Result<(), AlgorithmError> {
        let content = serde_json::to_value(lsa)?;
        for n in self.links.keys().filter(|n| Some(**n) != except) {
            ctx.send(*n, content.clone());
        }
        Ok(())
    }

    /// Link cost advertised by `a` towards `b`, if `a` knows about it.
    fn advertised(&self, a: NodeId, b: NodeId) -> Option<LinkWeight> {
        self.lsdb
            .get(&a)
            .and_then(|lsa| lsa.links.iter().find(|(n, _)| *n == b).map(|(_, c)| *c))
    }

    /// Recompute the forwarding table from the database.
    fn recompute(&mut self) {
        // graph of all other nodes, with all links advertised by both endpoints.
        let mut g: UnGraph<NodeId, LinkWeight> = UnGraph::default();
        let mut idx = HashMap::new();
        for node in self.lsdb.keys().filter(|n| **n != self.id) {
            idx.insert(*node, g.add_node(*node));
        }
        for lsa in self.lsdb.values().filter(|l| l.source != self.id) {
            for (n, c) in lsa.links.iter() {
                // add each link once, from its smaller endpoint.
                if *n == self.id || lsa.source > *n {
                    continue;
                }
                if self.advertised(*n, lsa.source).is_none() {
                    continue;
                }
                if let (Some(a), Some(b)) = (idx.get(&lsa.source), idx.get(n)) {
                    g.add_edge(*a, *b, *c);
                }
            }
        }

        let mut table = ForwardingTable::new();
        for (n, c) in self.links.iter() {
            // the neighbor must confirm the link as well.
            if self.advertised(*n, self.id).is_none() {
                continue;
            }
            let start = match idx.get(n) {
                Some(s) => *s,
                None => continue,
            };
            let dist = dijkstra(&g, start, None, |e| *e.weight());
            // iterate in the order of the node ids for a deterministic outcome.
            let dist: BTreeMap<NodeId, LinkWeight> =
                dist.into_iter().map(|(i, d)| (g[i], d)).collect();
            for (dst, d) in dist {
                let cost = c + d;
                match table.get(&dst) {
                    Some(e) if e.cost <= cost => {}
                    _ => {
                        table.insert(dst, FwEntry::new(*n, cost));
                    }
                }
            }
        }
        self.table = table;
    }
}

impl RoutingAlgorithm for LinkState {
    fn name(&self) -> &'static str {
        "LS"
    }

    fn init(
        &mut self,
        ctx: &mut RouterCtx,
        neighbors: &[(NodeId, LinkWeight)],
    ) -> Result<(), AlgorithmError> {
        self.links = neighbors.iter().copied().collect();
        let lsa = self.originate();
        self.recompute();
        self.flood(ctx, &lsa, None)
    }

    fn handle_packet(
        &mut self,
        ctx: &mut RouterCtx,
        from: NodeId,
        packet: &Packet,
    ) -> Result<(), AlgorithmError> {
        let content = packet
            .content()
            .ok_or_else(|| AlgorithmError::MalformedPacket("expected a control message".into()))?;
        let lsa: Lsa = serde_json::from_value(content.clone())?;
        if lsa.source == self.id {
            return Ok(());
        }
        let newer = self
            .lsdb
            .get(&lsa.source)
            .map(|old| lsa.seq > old.seq)
            .unwrap_or(true);
        if newer {
            self.lsdb.insert(lsa.source, lsa.clone());
            self.recompute();
            self.flood(ctx, &lsa, Some(from))?;
        }
        Ok(())
    }

    fn handle_new_link(
        &mut self,
        ctx: &mut RouterCtx,
        neighbor: NodeId,
        cost: LinkWeight,
    ) -> Result<(), AlgorithmError> {
        let is_new = self.links.insert(neighbor, cost).is_none();
        let lsa = self.originate();
        self.recompute();
        self.flood(ctx, &lsa, None)?;
        if is_new {
            // synchronize the database with the new neighbor.
            for other in self.lsdb.values().filter(|l| l.source != self.id) {
                ctx.send(neighbor, serde_json::to_value(other)?);
            }
        }
        Ok(())
    }

    fn handle_remove_link(
        &mut self,
        ctx: &mut RouterCtx,
        neighbor: NodeId,
    ) -> Result<(), AlgorithmError> {
        if self.links.remove(&neighbor).is_none() {
            return Err(AlgorithmError::UnknownNeighbor(neighbor));
        }
        let lsa = self.originate();
        self.recompute();
        self.flood(ctx, &lsa, None)
    }

    fn handle_time(&mut self, ctx: &mut RouterCtx, _now: SimTime) -> Result<(), AlgorithmError> {
        let lsa = self.originate();
        self.flood(ctx, &lsa, None)
    }

    fn forwarding_table(&self) -> ForwardingTable {
        self.table.clone()
    }

    fn next_hop(&self, dst: NodeId) -> Option<FwEntry> {
        self.table.get(&dst).copied()
    }
}
