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

//! Convenience re-export of common members.

pub use crate::algorithms::AlgorithmKind;
pub use crate::config::SimConfig;
pub use crate::formatter::NetworkFormatter;
pub use crate::forwarding_state::ForwardingState;
pub use crate::network::{Network, SimState};
pub use crate::packet::Packet;
pub use crate::record::{PhaseRecord, ProbeOutcome, SimOutcome};
pub use crate::router::{AlgorithmError, ForwardingTable, FwEntry, RouterCtx, RoutingAlgorithm};
pub use crate::topology::{LinkChange, Topology};
pub use crate::types::{ConfigError, LinkWeight, NetworkError, NodeId, RouterFault, SimTime};
