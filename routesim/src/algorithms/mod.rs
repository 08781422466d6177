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

//! Reference implementations of the [`RoutingAlgorithm`] trait.
//!
//! - [`DistanceVector`]: Bellman-Ford with poisoned reverse and a finite infinity.
//! - [`LinkState`]: Flooding of link-state advertisements and shortest paths using Dijkstra.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

mod distance_vector;
mod link_state;

pub use distance_vector::{DistanceVector, DvMessage, DEFAULT_INFINITY};
pub use link_state::{LinkState, Lsa};

use crate::{
    router::RoutingAlgorithm,
    topology::{LinkChange, Topology},
    types::{LinkWeight, NodeId},
};

/// Kind of reference algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlgorithmKind {
    /// Distance-vector routing
    DistanceVector,
    /// Link-state routing
    LinkState,
}

impl AlgorithmKind {
    /// All reference algorithms.
    pub const ALL: [AlgorithmKind; 2] = [AlgorithmKind::DistanceVector, AlgorithmKind::LinkState];

    /// Short name of the algorithm.
    pub fn short_name(&self) -> &'static str {
        match self {
            AlgorithmKind::DistanceVector => "DV",
            AlgorithmKind::LinkState => "LS",
        }
    }

    /// Create an instance of the algorithm for `node` in the given topology.
    pub fn build(&self, node: NodeId, topo: &Topology) -> Box<dyn RoutingAlgorithm> {
        match self {
            AlgorithmKind::DistanceVector => {
                Box::new(DistanceVector::with_infinity(node, dv_infinity(topo)))
            }
            AlgorithmKind::LinkState => Box::new(LinkState::new(node)),
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for AlgorithmKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dv" | "distance-vector" | "distance_vector" => Ok(AlgorithmKind::DistanceVector),
            "ls" | "link-state" | "link_state" => Ok(AlgorithmKind::LinkState),
            _ => Err(format!("unknown algorithm: {s}")),
        }
    }
}

/// Infinity of the distance-vector algorithm for the given topology. It must be larger than the
/// cost of any loop-free path, in any phase of the simulation.
pub fn dv_infinity(topo: &Topology) -> LinkWeight {
    let link_sum: LinkWeight = topo.links().iter().map(|(_, l)| l.cost).sum();
    let change_sum: LinkWeight = topo
        .changes()
        .iter()
        .filter_map(|c| match c.change {
            LinkChange::Cost(c) => Some(c),
            _ => None,
        })
        .sum();
    (link_sum + change_sum + 1.0).max(DEFAULT_INFINITY)
}
