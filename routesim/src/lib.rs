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

#![deny(missing_docs, missing_debug_implementations)]

//! # RouteSim
//!
//! This is a library for simulating routing protocols on a network topology, using a
//! deterministic discrete-event simulation.
//!
//! ## Main Concepts
//!
//! The [`topology::Topology`] describes the network: nodes, links with a cost and a propagation
//! delay, and a timed schedule of link changes. The [`network::Network`] simulates a routing
//! algorithm on that topology. Each node runs its own instance of a
//! [`router::RoutingAlgorithm`], wrapped in a [`host::RouterHost`] that isolates it from the rest
//! of the simulation. All packets travel over the [`link::LinkTable`], and all events are ordered
//! by the [`event::Scheduler`]. Events with the same timestamp are processed in the order they were
//! scheduled, so every run is reproducible.
//!
//! The network records the [`forwarding_state::ForwardingState`] whenever it becomes quiescent
//! (see [`record::PhaseRecord`]), such that the state can be checked against the true shortest
//! paths afterwards.
//!
//! Two reference algorithms are included in [`algorithms`].
//!
//! ## Example usage
//!
//! ```
//! use routesim::prelude::*;
//!
//! fn main() -> Result<(), NetworkError> {
//!     let mut topo = Topology::new("line");
//!     let a = topo.add_node("A")?;
//!     let b = topo.add_node("B")?;
//!     let c = topo.add_node("C")?;
//!     topo.add_link(a, b, 1.0, 1.0)?;
//!     topo.add_link(b, c, 2.0, 1.0)?;
//!
//!     let kind = AlgorithmKind::DistanceVector;
//!     let factory_topo = topo.clone();
//!     let mut net = Network::new(topo, SimConfig::default(), |n| kind.build(n, &factory_topo))?;
//!     let outcome = net.run()?;
//!
//!     assert!(outcome.finished());
//!     let state = &outcome.final_phase().unwrap().fw_state;
//!     assert_eq!(state.get_path(a, c)?, vec![a, b, c]);
//!     Ok(())
//! }
//! ```

pub mod algorithms;
pub mod config;
pub mod event;
pub mod formatter;
pub mod forwarding_state;
pub mod host;
pub mod link;
pub mod network;
pub mod packet;
pub mod prelude;
pub mod record;
pub mod router;
pub mod topology;
pub mod types;

#[cfg(test)]
mod test;
