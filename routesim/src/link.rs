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

//! # Link Model
//!
//! Links carry packets between two neighbors with a fixed propagation delay. A link that is down
//! drops every packet handed to it, but keeps its cost such that it can be brought back up later.
//! Packets that are already in flight when a link goes down are still delivered.

use std::collections::BTreeMap;

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    event::{Event, Scheduler},
    packet::Packet,
    topology::Topology,
    types::{LinkKey, LinkWeight, NetworkError, NodeId, SimTime},
};

/// Runtime state of a single link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Both endpoints
    pub key: LinkKey,
    /// Current cost.
    pub cost: LinkWeight,
    /// Propagation delay.
    pub delay: SimTime,
    /// Whether the link currently delivers packets.
    pub live: bool,
}

/// What happened to a packet handed to a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SendOutcome {
    /// The packet is in flight and will arrive at the far endpoint.
    Scheduled,
    /// The link is down.
    LinkDown,
    /// The packet was lost on a live link.
    Lost,
}

/// Counters of the link model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStats {
    /// Packets put on a live link.
    pub sent: usize,
    /// Packets dropped because the link was down.
    pub dropped: usize,
    /// Packets lost on a live link due to the configured loss probability.
    pub lost: usize,
}

/// All links of the network, ordered by their key.
#[derive(Debug, Clone)]
pub struct LinkTable {
    links: BTreeMap<LinkKey, Link>,
    loss: f64,
    rng: StdRng,
    stats: LinkStats,
}

impl LinkTable {
    /// Create the link table from the topology. `loss` is the probability with which a packet on a
    /// live link is lost. The random numbers are drawn from a generator seeded with `seed`.
    pub fn new(topo: &Topology, loss: f64, seed: u64) -> Self {
        let links = topo
            .links()
            .into_iter()
            .map(|(key, spec)| {
                (
                    key,
                    Link {
                        key,
                        cost: spec.cost,
                        delay: spec.delay,
                        live: spec.live,
                    },
                )
            })
            .collect();
        Self {
            links,
            loss,
            rng: StdRng::seed_from_u64(seed),
            stats: LinkStats::default(),
        }
    }

    /// Send `packet` from `from` to its neighbor `to` at time `send_time`. If the link is live, the
    /// arrival is scheduled at `send_time + delay`.
    pub fn send(
        &mut self,
        sched: &mut Scheduler,
        from: NodeId,
        to: NodeId,
        packet: Packet,
        send_time: SimTime,
    ) -> Result<SendOutcome, NetworkError> {
        let link = self
            .links
            .get(&LinkKey::new(from, to))
            .ok_or(NetworkError::LinkNotFound(from, to))?;
        if !link.live {
            self.stats.dropped += 1;
            return Ok(SendOutcome::LinkDown);
        }
        if self.loss > 0.0 && self.rng.gen_bool(self.loss) {
            self.stats.lost += 1;
            return Ok(SendOutcome::Lost);
        }
        let arrival = send_time + link.delay;
        sched.schedule(arrival, Event::Packet { from, to, packet })?;
        self.stats.sent += 1;
        Ok(SendOutcome::Scheduled)
    }

    /// Change the cost of a link. Returns the old cost.
    pub fn set_cost(
        &mut self,
        a: NodeId,
        b: NodeId,
        cost: LinkWeight,
    ) -> Result<LinkWeight, NetworkError> {
        let link = self.get_mut(a, b)?;
        Ok(std::mem::replace(&mut link.cost, cost))
    }

    /// Set the liveness of a link. Returns the old liveness.
    pub fn set_liveness(&mut self, a: NodeId, b: NodeId, live: bool) -> Result<bool, NetworkError> {
        let link = self.get_mut(a, b)?;
        Ok(std::mem::replace(&mut link.live, live))
    }

    /// Get the link between `a` and `b`.
    pub fn get(&self, a: NodeId, b: NodeId) -> Option<&Link> {
        self.links.get(&LinkKey::new(a, b))
    }

    fn get_mut(&mut self, a: NodeId, b: NodeId) -> Result<&mut Link, NetworkError> {
        self.links
            .get_mut(&LinkKey::new(a, b))
            .ok_or(NetworkError::LinkNotFound(a, b))
    }

    /// Returns `true` if `a` and `b` share a live link.
    pub fn is_live(&self, a: NodeId, b: NodeId) -> bool {
        self.get(a, b).map(|l| l.live).unwrap_or(false)
    }

    /// All live neighbors of `node`, together with the cost of the link, ordered by the neighbor id.
    pub fn neighbors(&self, node: NodeId) -> Vec<(NodeId, LinkWeight)> {
        let mut neighbors: Vec<_> = self
            .links
            .values()
            .filter(|l| l.live)
            .filter_map(|l| l.key.other(node).map(|n| (n, l.cost)))
            .collect();
        neighbors.sort_by_key(|(n, _)| *n);
        neighbors
    }

    /// Iterate over all links.
    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Copy of all live links with their current cost.
    pub fn live_links(&self) -> BTreeMap<LinkKey, LinkWeight> {
        self.links
            .values()
            .filter(|l| l.live)
            .map(|l| (l.key, l.cost))
            .collect()
    }

    /// Counters of sent, dropped and lost packets.
    pub fn stats(&self) -> LinkStats {
        self.stats
    }
}
