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

//! Module that introduces a formatter to display all types containing `NodeId`.

use std::{collections::BTreeSet, fmt::Write};

use itertools::Itertools;

use crate::{
    event::Event,
    forwarding_state::{ForwardingState, FwDelta},
    packet::{Packet, Payload},
    record::ProbeOutcome,
    router::{ForwardingTable, FwEntry},
    topology::{LinkChange, Topology, TopologyChange},
    types::{LinkKey, NetworkError, NodeId},
};

/// Trait to format a type that contains NodeIds
pub trait NetworkFormatter<'a, 'n> {
    /// Type that is returned, which implements `std::fmt::Display`.
    type Formatter;

    /// Return a struct that can be formatted and displayed. Unknown node ids are shown as `?`.
    fn fmt(&'a self, topo: &'n Topology) -> Self::Formatter;
}

impl<'a, 'n> NetworkFormatter<'a, 'n> for NodeId {
    type Formatter = &'n str;

    fn fmt(&'a self, topo: &'n Topology) -> Self::Formatter {
        topo.node_name(*self).unwrap_or("?")
    }
}

impl<'a, 'n> NetworkFormatter<'a, 'n> for BTreeSet<NodeId> {
    type Formatter = String;

    fn fmt(&'a self, topo: &'n Topology) -> Self::Formatter {
        format!("{{{}}}", self.iter().map(|r| r.fmt(topo)).join(", "))
    }
}

//
// Individual Path
//

impl<'a, 'n> NetworkFormatter<'a, 'n> for [NodeId] {
    type Formatter = String;

    fn fmt(&'a self, topo: &'n Topology) -> Self::Formatter {
        self.iter().map(|r| r.fmt(topo)).join(" -> ")
    }
}

impl<'a, 'n> NetworkFormatter<'a, 'n> for Vec<NodeId> {
    type Formatter = String;

    fn fmt(&'a self, topo: &'n Topology) -> Self::Formatter {
        self.as_slice().fmt(topo)
    }
}

impl<'a, 'n> NetworkFormatter<'a, 'n> for LinkKey {
    type Formatter = String;

    fn fmt(&'a self, topo: &'n Topology) -> Self::Formatter {
        let (a, b) = self.endpoints();
        format!("{} -- {}", a.fmt(topo), b.fmt(topo))
    }
}

//
// Forwarding State
//

impl<'a, 'n> NetworkFormatter<'a, 'n> for FwEntry {
    type Formatter = String;

    fn fmt(&'a self, topo: &'n Topology) -> Self::Formatter {
        format!("{} (cost {})", self.next_hop.fmt(topo), self.cost)
    }
}

impl<'a, 'n> NetworkFormatter<'a, 'n> for ForwardingTable {
    type Formatter = String;

    fn fmt(&'a self, topo: &'n Topology) -> Self::Formatter {
        self.iter()
            .map(|(dst, e)| format!("{} => {}", dst.fmt(topo), e.fmt(topo)))
            .join("\n")
    }
}

impl<'a, 'n> NetworkFormatter<'a, 'n> for ForwardingState {
    type Formatter = String;

    fn fmt(&'a self, topo: &'n Topology) -> Self::Formatter {
        let mut result = String::new();
        let f = &mut result;
        for (node, table) in self.state.iter() {
            writeln!(f, "{}:", node.fmt(topo)).unwrap_or_default();
            for (dst, entry) in table.iter() {
                writeln!(f, "  {} => {}", dst.fmt(topo), entry.fmt(topo)).unwrap_or_default();
            }
        }
        result
    }
}

impl<'a, 'n> NetworkFormatter<'a, 'n> for FwDelta {
    type Formatter = String;

    fn fmt(&'a self, topo: &'n Topology) -> Self::Formatter {
        format!(
            "{} towards {}: {} => {}",
            self.node.fmt(topo),
            self.dst.fmt(topo),
            self.old.map(|e| e.fmt(topo)).unwrap_or_else(|| "XX".to_string()),
            self.new.map(|e| e.fmt(topo)).unwrap_or_else(|| "XX".to_string()),
        )
    }
}

//
// Events
//

impl<'a, 'n> NetworkFormatter<'a, 'n> for TopologyChange {
    type Formatter = String;

    fn fmt(&'a self, topo: &'n Topology) -> Self::Formatter {
        let change = match self.change {
            LinkChange::Cost(c) => format!("cost {c}"),
            LinkChange::Down => String::from("down"),
            LinkChange::Up => String::from("up"),
        };
        format!("{} {} (at {})", self.link.fmt(topo), change, self.time)
    }
}

impl<'a, 'n> NetworkFormatter<'a, 'n> for Packet {
    type Formatter = String;

    fn fmt(&'a self, topo: &'n Topology) -> Self::Formatter {
        match &self.payload {
            Payload::Data { trace } => format!(
                "Data {} => {} (ttl {}, trace {})",
                self.src.fmt(topo),
                self.dst.fmt(topo),
                self.ttl,
                trace.fmt(topo)
            ),
            Payload::Control(content) => format!(
                "Control {} => {}: {}",
                self.src.fmt(topo),
                self.dst.fmt(topo),
                content
            ),
        }
    }
}

impl<'a, 'n> NetworkFormatter<'a, 'n> for Event {
    type Formatter = String;

    fn fmt(&'a self, topo: &'n Topology) -> Self::Formatter {
        match self {
            Event::Packet { from, to, packet } => format!(
                "Packet {} -> {}: {}",
                from.fmt(topo),
                to.fmt(topo),
                packet.fmt(topo)
            ),
            Event::TopologyChange(c) => format!("Change: {}", c.fmt(topo)),
            Event::Timer(n) => format!("Timer at {}", n.fmt(topo)),
        }
    }
}

impl<'a, 'n> NetworkFormatter<'a, 'n> for ProbeOutcome {
    type Formatter = String;

    fn fmt(&'a self, topo: &'n Topology) -> Self::Formatter {
        match self {
            ProbeOutcome::Delivered { path, cost } => {
                format!("delivered via {} (cost {})", path.fmt(topo), cost)
            }
            ProbeOutcome::TtlExpired { path } => format!("ttl expired: {}", path.fmt(topo)),
            ProbeOutcome::NoRoute { path } => format!("no route: {}", path.fmt(topo)),
            ProbeOutcome::Dropped { path } => format!("dropped: {}", path.fmt(topo)),
        }
    }
}

//
// Errors
//

impl<'a, 'n> NetworkFormatter<'a, 'n> for NetworkError {
    type Formatter = String;

    fn fmt(&'a self, topo: &'n Topology) -> Self::Formatter {
        match self {
            NetworkError::NodeNotFound(r) => format!("Node was not found: {}", r.fmt(topo)),
            NetworkError::LinkNotFound(a, b) => {
                format!("Link does not exist: {} -- {}", a.fmt(topo), b.fmt(topo))
            }
            NetworkError::ForwardingLoop(p) => {
                format!("Forwarding loop found! {}", p.fmt(topo))
            }
            NetworkError::ForwardingBlackHole(p) => {
                format!("Black hole found! {}", p.fmt(topo))
            }
            e => e.to_string(),
        }
    }
}
