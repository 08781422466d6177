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

//! Test module

use crate::{
    algorithms::{AlgorithmKind, DistanceVector, LinkState},
    config::SimConfig,
    network::Network,
    record::SimOutcome,
    topology::Topology,
    types::NodeId,
};

mod test_host;
mod test_scheduler;
mod test_topology;

/// Reference algorithm that can be used as a type parameter in generic tests.
pub(crate) trait Reference {
    const KIND: AlgorithmKind;
}

impl Reference for DistanceVector {
    const KIND: AlgorithmKind = AlgorithmKind::DistanceVector;
}

impl Reference for LinkState {
    const KIND: AlgorithmKind = AlgorithmKind::LinkState;
}

/// Build a network running the reference algorithm `A` on every node.
pub(crate) fn build_net<A: Reference>(topo: &Topology, config: SimConfig) -> Network {
    let factory_topo = topo.clone();
    Network::new(topo.clone(), config, move |n| A::KIND.build(n, &factory_topo)).unwrap()
}

/// Run the reference algorithm `A` on the topology with the default configuration.
pub(crate) fn run<A: Reference>(topo: &Topology) -> SimOutcome {
    build_net::<A>(topo, SimConfig::default()).run().unwrap()
}

/// Show the log output of the simulation when running tests with `RUST_LOG` set.
pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Translate a path into the node names.
pub(crate) fn path_names<'n>(path: &[NodeId], topo: &'n Topology) -> Vec<&'n str> {
    path.iter().map(|n| topo.node_name(*n).unwrap()).collect()
}
