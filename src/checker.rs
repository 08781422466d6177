// RouteGrade: Grading harness for pluggable routing protocols
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

//! # Convergence and correctness checker
//!
//! The checker compares every captured [`PhaseRecord`] against the true shortest paths. The ground
//! truth is computed with Dijkstra on the live links of the phase, without any knowledge of the
//! algorithm that produced the forwarding state. Faulted nodes are removed from the ground truth.
//!
//! For every pair of a source and a (non-faulted) destination, the checker reports at most one
//! [`RouteFailure`], using the following precedence:
//!
//! 1. The source has faulted ([`FailureKind::FaultedSource`]).
//! 2. The next-hop chain revisits a node ([`FailureKind::Loop`]), regardless of the cost.
//! 3. The destination is unreachable, but the source advertises a route
//!    ([`FailureKind::UnexpectedRoute`]).
//! 4. The destination is reachable, but the source has no route ([`FailureKind::MissingRoute`]).
//! 5. The advertised cost differs from the true cost ([`FailureKind::WrongCost`]).
//! 6. The next hop is not a live neighbor on any shortest path ([`FailureKind::WrongNextHop`]).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use itertools::Itertools;
use log::*;
use petgraph::{algo::dijkstra, graphmap::UnGraphMap};
use routesim::{
    formatter::NetworkFormatter,
    prelude::*,
    types::{cost_eq, LinkKey},
};
use serde::{Deserialize, Serialize};

/// Why a single route is incorrect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The source node was disabled because of a fault.
    FaultedSource,
    /// Following the next hops revisits a node. The path ends with the first repeated node.
    Loop(Vec<NodeId>),
    /// The destination is unreachable, but the source advertises a route.
    UnexpectedRoute {
        /// Advertised cost
        cost: LinkWeight,
    },
    /// The destination is reachable, but the source has no route.
    MissingRoute {
        /// Cost of the shortest path
        expected: LinkWeight,
    },
    /// The advertised cost is different from the cost of the shortest path.
    WrongCost {
        /// Cost of the shortest path
        expected: LinkWeight,
        /// Advertised cost
        actual: LinkWeight,
    },
    /// The next hop is not on any shortest path.
    WrongNextHop {
        /// The selected next hop
        next_hop: NodeId,
    },
}

/// An incorrect route from `src` towards `dst`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteFailure {
    /// Source of the route
    pub src: NodeId,
    /// Destination of the route
    pub dst: NodeId,
    /// What is wrong
    pub kind: FailureKind,
}

impl RouteFailure {
    /// Returns `true` if the failure is a forwarding loop.
    pub fn is_loop(&self) -> bool {
        matches!(self.kind, FailureKind::Loop(_))
    }
}

/// Result of checking a single phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseCheck {
    /// Index of the phase
    pub index: usize,
    /// Whether this is the final phase of the run
    pub is_final: bool,
    /// Number of routes that were checked
    pub checked: usize,
    /// All incorrect routes
    pub failures: Vec<RouteFailure>,
}

impl PhaseCheck {
    /// Returns `true` if all routes are correct.
    pub fn is_correct(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of incorrect routes.
    pub fn incorrect(&self) -> usize {
        self.failures.len()
    }

    /// Iterate over all forwarding loops.
    pub fn loops(&self) -> impl Iterator<Item = &RouteFailure> {
        self.failures.iter().filter(|f| f.is_loop())
    }
}

/// Summary of the probe traffic sent at the end of the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeSummary {
    /// Number of probes that reached their destination
    pub delivered: usize,
    /// Number of probes whose TTL expired
    pub looped: usize,
    /// Number of probes that were dropped, either by a node without a route or by a link.
    pub dropped: usize,
    /// Probes that were delivered over a path that is more expensive than the shortest path, with
    /// the cost of the path taken and the optimal cost.
    pub suboptimal: Vec<(NodeId, NodeId, LinkWeight, LinkWeight)>,
}

/// Result of checking an entire run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckReport {
    /// One entry per captured phase.
    pub phases: Vec<PhaseCheck>,
    /// Summary of the probe traffic.
    pub probes: ProbeSummary,
}

impl CheckReport {
    /// The result of the final phase.
    pub fn final_phase(&self) -> Option<&PhaseCheck> {
        self.phases.iter().rev().find(|p| p.is_final)
    }

    /// The first intermediate phase that has incorrect routes.
    pub fn first_failed_intermediate(&self) -> Option<&PhaseCheck> {
        self.phases
            .iter()
            .find(|p| !p.is_final && !p.is_correct())
    }

    /// Returns `true` if any phase contains a forwarding loop.
    pub fn has_loops(&self) -> bool {
        self.phases.iter().any(|p| p.loops().next().is_some())
    }
}

/// Shortest-path distances between all pairs of nodes in a single phase.
#[derive(Debug, Clone)]
pub struct GroundTruth {
    links: BTreeMap<LinkKey, LinkWeight>,
    nodes: BTreeSet<NodeId>,
    /// `dist[dst][src]`; unreachable pairs are missing.
    dist: BTreeMap<NodeId, HashMap<NodeId, LinkWeight>>,
}

impl GroundTruth {
    /// Compute the shortest paths on the live `links`, without the nodes in `faulted`.
    pub fn new(
        nodes: impl IntoIterator<Item = NodeId>,
        links: &BTreeMap<LinkKey, LinkWeight>,
        faulted: &BTreeSet<NodeId>,
    ) -> Self {
        let nodes: BTreeSet<NodeId> = nodes.into_iter().filter(|n| !faulted.contains(n)).collect();
        let links: BTreeMap<LinkKey, LinkWeight> = links
            .iter()
            .filter(|(k, _)| {
                let (a, b) = k.endpoints();
                nodes.contains(&a) && nodes.contains(&b)
            })
            .map(|(k, c)| (*k, *c))
            .collect();

        let mut g: UnGraphMap<NodeId, LinkWeight> = UnGraphMap::new();
        for n in nodes.iter() {
            g.add_node(*n);
        }
        for (k, c) in links.iter() {
            let (a, b) = k.endpoints();
            g.add_edge(a, b, *c);
        }

        let dist = nodes
            .iter()
            .map(|dst| (*dst, dijkstra(&g, *dst, None, |(_, _, c)| *c)))
            .collect();

        Self { links, nodes, dist }
    }

    /// Cost of the shortest path from `src` to `dst`, or `None` if `dst` is unreachable.
    pub fn cost(&self, src: NodeId, dst: NodeId) -> Option<LinkWeight> {
        self.dist.get(&dst).and_then(|d| d.get(&src)).copied()
    }

    /// Returns `true` if `next_hop` is a live neighbor of `src` that lies on some shortest path
    /// towards `dst`.
    pub fn is_shortest_next_hop(&self, src: NodeId, dst: NodeId, next_hop: NodeId) -> bool {
        match (
            self.links.get(&LinkKey::new(src, next_hop)),
            self.cost(src, dst),
            self.cost(next_hop, dst),
        ) {
            (Some(link), Some(total), Some(rest)) => cost_eq(link + rest, total),
            _ => false,
        }
    }

    /// All nodes that are part of the ground truth.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }
}

/// Check the forwarding state of every phase, and summarize the probe traffic.
pub fn check(topo: &Topology, outcome: &SimOutcome) -> CheckReport {
    let phases = outcome
        .phases
        .iter()
        .map(|p| check_phase(topo, p))
        .collect();

    let probes = match outcome.final_phase() {
        Some(p) => summarize_probes(topo, p, &outcome.probes),
        None => ProbeSummary::default(),
    };

    CheckReport { phases, probes }
}

/// Check the forwarding state of a single phase against the true shortest paths.
pub fn check_phase(topo: &Topology, phase: &PhaseRecord) -> PhaseCheck {
    let truth = GroundTruth::new(topo.nodes(), &phase.links, &phase.faulted);
    let mut failures = Vec::new();
    let mut checked = 0;

    for (src, dst) in topo
        .nodes()
        .into_iter()
        .cartesian_product(truth.nodes().collect_vec())
        .filter(|(s, d)| s != d)
    {
        checked += 1;
        if let Some(kind) = check_route(&truth, phase, src, dst) {
            trace!(
                "phase {}: route {} -> {} is incorrect: {:?}",
                phase.index,
                src.fmt(topo),
                dst.fmt(topo),
                kind
            );
            failures.push(RouteFailure { src, dst, kind });
        }
    }

    if !failures.is_empty() {
        debug!(
            "phase {}: {} of {} routes are incorrect",
            phase.index,
            failures.len(),
            checked
        );
    }

    PhaseCheck {
        index: phase.index,
        is_final: phase.is_final,
        checked,
        failures,
    }
}

fn check_route(
    truth: &GroundTruth,
    phase: &PhaseRecord,
    src: NodeId,
    dst: NodeId,
) -> Option<FailureKind> {
    if phase.faulted.contains(&src) {
        return Some(FailureKind::FaultedSource);
    }
    if let Err(NetworkError::ForwardingLoop(path)) = phase.fw_state.get_path(src, dst) {
        return Some(FailureKind::Loop(path));
    }

    let entry = phase.fw_state.get_entry(src, dst);
    match (truth.cost(src, dst), entry) {
        (None, None) => None,
        (None, Some(e)) => Some(FailureKind::UnexpectedRoute { cost: e.cost }),
        (Some(expected), None) => Some(FailureKind::MissingRoute { expected }),
        (Some(expected), Some(e)) if !cost_eq(expected, e.cost) => Some(FailureKind::WrongCost {
            expected,
            actual: e.cost,
        }),
        (Some(_), Some(e)) if !truth.is_shortest_next_hop(src, dst, e.next_hop) => {
            Some(FailureKind::WrongNextHop {
                next_hop: e.next_hop,
            })
        }
        _ => None,
    }
}

fn summarize_probes(
    topo: &Topology,
    phase: &PhaseRecord,
    probes: &BTreeMap<(NodeId, NodeId), ProbeOutcome>,
) -> ProbeSummary {
    let truth = GroundTruth::new(topo.nodes(), &phase.links, &phase.faulted);
    let mut summary = ProbeSummary::default();
    for ((src, dst), probe) in probes {
        match probe {
            ProbeOutcome::Delivered { cost, .. } => {
                summary.delivered += 1;
                match truth.cost(*src, *dst) {
                    Some(optimal) if cost_eq(optimal, *cost) => {}
                    Some(optimal) => summary.suboptimal.push((*src, *dst, *cost, optimal)),
                    // delivered over a faulted node
                    None => summary
                        .suboptimal
                        .push((*src, *dst, *cost, LinkWeight::INFINITY)),
                }
            }
            ProbeOutcome::TtlExpired { .. } => summary.looped += 1,
            ProbeOutcome::NoRoute { .. } | ProbeOutcome::Dropped { .. } => summary.dropped += 1,
        }
    }
    summary
}

impl<'a, 'n> NetworkFormatter<'a, 'n> for RouteFailure {
    type Formatter = String;

    fn fmt(&'a self, topo: &'n Topology) -> Self::Formatter {
        let route = format!("{} -> {}", self.src.fmt(topo), self.dst.fmt(topo));
        match &self.kind {
            FailureKind::FaultedSource => format!("{route}: source has faulted"),
            FailureKind::Loop(path) => format!("{route}: forwarding loop {}", path.fmt(topo)),
            FailureKind::UnexpectedRoute { cost } => {
                format!("{route}: destination is unreachable, but advertised with cost {cost}")
            }
            FailureKind::MissingRoute { expected } => {
                format!("{route}: no route (expected cost {expected})")
            }
            FailureKind::WrongCost { expected, actual } => {
                format!("{route}: cost {actual} (expected {expected})")
            }
            FailureKind::WrongNextHop { next_hop } => format!(
                "{route}: next hop {} is not on a shortest path",
                next_hop.fmt(topo)
            ),
        }
    }
}
