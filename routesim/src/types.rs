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

//! Module containing all type definitions

use petgraph::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub(crate) type IndexType = u32;
/// Node identification (and index into the topology graph)
pub type NodeId = NodeIndex<IndexType>;

/// Cost of a link, as advertised by the topology and as used by the routing algorithms.
pub type LinkWeight = f64;

/// Simulated time. The unit is arbitrary; propagation delays in the topology file use the same
/// unit.
pub type SimTime = f64;

/// Key of an undirected link. The endpoint with the smaller index is always stored first, such that
/// `LinkKey::new(a, b) == LinkKey::new(b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkKey(NodeId, NodeId);

impl LinkKey {
    /// Create the key for the link between `a` and `b`.
    pub fn new(a: NodeId, b: NodeId) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    /// Both endpoints, the smaller index first.
    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.0, self.1)
    }

    /// Returns `true` if `node` is one of the two endpoints.
    pub fn contains(&self, node: NodeId) -> bool {
        self.0 == node || self.1 == node
    }

    /// Given one endpoint, return the other one. Returns `None` if `node` is not an endpoint.
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if self.0 == node {
            Some(self.1)
        } else if self.1 == node {
            Some(self.0)
        } else {
            None
        }
    }
}

/// Returns `true` if both costs are equal up to a relative tolerance of `1e-9`. Two infinite costs
/// are considered equal.
pub fn cost_eq(a: LinkWeight, b: LinkWeight) -> bool {
    if a.is_infinite() || b.is_infinite() {
        return a == b;
    }
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

/// Error raised while loading or validating a topology. Such an error is fatal for the run, and is
/// raised before any simulation takes place.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConfigError {
    /// Two nodes share the same name.
    #[error("Node name is used more than once: {0}")]
    DuplicateNode(String),
    /// A link or change refers to an unknown node name.
    #[error("Unknown node: {0}")]
    UnknownNode(String),
    /// A link connects a node with itself.
    #[error("Link connects {0} with itself")]
    SelfLoop(String),
    /// The same pair of nodes is connected twice.
    #[error("Link {0} -- {1} is defined more than once")]
    DuplicateLink(String, String),
    /// A change refers to a link that is not part of the topology.
    #[error("Change at time {0} refers to the missing link {1} -- {2}")]
    UnknownLink(SimTime, String, String),
    /// Link cost is negative or not a number.
    #[error("Invalid cost {2} on link {0} -- {1}")]
    InvalidCost(String, String, LinkWeight),
    /// Link delay is negative or not a number.
    #[error("Invalid delay {2} on link {0} -- {1}")]
    InvalidDelay(String, String, SimTime),
    /// A change is scheduled at a negative or non-finite time.
    #[error("Invalid change time: {0}")]
    InvalidTime(SimTime),
    /// A simulation parameter is out of range.
    #[error("Invalid simulation parameter `{0}`: {1}")]
    InvalidParameter(&'static str, String),
    /// The file could not be parsed.
    #[error("Cannot parse the topology: {0}")]
    Parse(String),
    /// The file could not be read.
    #[error("Cannot read the topology file: {0}")]
    Io(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

/// Errors of the event scheduler.
#[derive(Error, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SchedulerError {
    /// No event is enqueued.
    #[error("The event queue is empty")]
    EmptyQueue,
    /// The event would be scheduled before the current time.
    #[error("Cannot schedule an event at {time}, as the current time is {now}")]
    InThePast {
        /// Requested time
        time: SimTime,
        /// Current time of the scheduler
        now: SimTime,
    },
    /// The timestamp is not a finite number.
    #[error("Invalid timestamp: {0}")]
    InvalidTime(SimTime),
    /// Cannot advance the clock past an enqueued event.
    #[error("Cannot advance the clock to {time}, as an event is scheduled at {next}")]
    SkipsEvent {
        /// Requested time
        time: SimTime,
        /// Time of the next enqueued event
        next: SimTime,
    },
}

/// Fault of a routing algorithm. A fault disables the affected node for the rest of the run, but
/// never aborts the run itself.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouterFault {
    /// The algorithm panicked.
    #[error("algorithm panicked: {0}")]
    Panicked(String),
    /// The algorithm returned an error.
    #[error("algorithm error: {0}")]
    Algorithm(String),
    /// The algorithm tried to send a packet to a node that is not a neighbor.
    #[error("sent a packet to node {0:?}, which is not a neighbor")]
    UnknownNeighbor(NodeId),
    /// The algorithm emitted too many packets in a single invocation.
    #[error("emitted {0} packets in a single invocation")]
    OutboundFlood(usize),
}

/// Network Errors
#[derive(Error, Debug, PartialEq)]
pub enum NetworkError {
    /// Topology is invalid.
    #[error("Configuration Error: {0}")]
    ConfigError(#[from] ConfigError),
    /// Scheduler error that cannot be handled
    #[error("Scheduler Error: {0}")]
    SchedulerError(#[from] SchedulerError),
    /// Node is not present in the topology
    #[error("Node was not found in the topology: {0:?}")]
    NodeNotFound(NodeId),
    /// Node name is not present in the topology
    #[error("Node name was not found in the topology: {0}")]
    NodeNameNotFound(String),
    /// Link does not exist
    #[error("Link does not exist: {0:?} -- {1:?}")]
    LinkNotFound(NodeId, NodeId),
    /// Forwarding loop detected
    #[error("Forwarding Loop occurred! path: {0:?}")]
    ForwardingLoop(Vec<NodeId>),
    /// Black hole detected
    #[error("Black hole occurred! path: {0:?}")]
    ForwardingBlackHole(Vec<NodeId>),
    /// The driver was asked to run after it has already terminated.
    #[error("The simulation has already terminated")]
    AlreadyTerminated,
}
