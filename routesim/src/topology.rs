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

//! # Topology Model
//!
//! The topology is the pure data description of a network: its nodes, the links between them
//! (with cost, propagation delay and initial liveness), and a timed schedule of link changes. It
//! contains no behavior; the [`crate::network::Network`] builds its runtime state from it.
//!
//! Topologies are usually loaded from a JSON file (see [`TopologyFile`]):
//!
//! ```json
//! {
//!     "name": "line",
//!     "nodes": ["A", "B", "C"],
//!     "links": [
//!         {"a": "A", "b": "B", "cost": 1},
//!         {"a": "B", "b": "C", "cost": 2, "delay": 5}
//!     ],
//!     "changes": [
//!         {"time": 100, "a": "B", "b": "C", "change": "down"},
//!         {"time": 200, "a": "B", "b": "C", "change": {"cost": 4}}
//!     ]
//! }
//! ```

use std::{collections::HashMap, path::Path};

use petgraph::{
    stable_graph::StableGraph,
    visit::{EdgeRef, IntoEdgeReferences},
    Undirected,
};
use serde::{Deserialize, Serialize};

use crate::types::{ConfigError, IndexType, LinkKey, LinkWeight, NodeId, SimTime};

/// Default propagation delay of a link, if the topology file does not specify any.
pub const DEFAULT_DELAY: SimTime = 1.0;

/// Graph storing the node names and the link attributes.
pub type TopologyGraph = StableGraph<String, LinkSpec, Undirected, IndexType>;

/// Static attributes of a link, as described in the topology.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    /// Cost of the link (same in both directions).
    pub cost: LinkWeight,
    /// Propagation delay of the link.
    pub delay: SimTime,
    /// Whether the link is up when the simulation starts.
    pub live: bool,
}

/// Change applied to a single link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkChange {
    /// Set a new cost.
    Cost(LinkWeight),
    /// Take the link down.
    Down,
    /// Bring the link back up, with its last known cost.
    Up,
}

/// A scheduled change of a link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopologyChange {
    /// Simulated time at which the change is scheduled.
    pub time: SimTime,
    /// The link that is modified.
    pub link: LinkKey,
    /// The modification.
    pub change: LinkChange,
}

/// In-memory representation of the network that should be simulated.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    name: String,
    graph: TopologyGraph,
    names: HashMap<String, NodeId>,
    changes: Vec<TopologyChange>,
}

impl Topology {
    /// Create an empty topology.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Load a topology from a JSON file. See [`TopologyFile`] for the format.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a topology from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let file: TopologyFile = serde_json::from_str(json)?;
        Self::from_spec(&file)
    }

    /// Build and validate the topology described by `file`.
    pub fn from_spec(file: &TopologyFile) -> Result<Self, ConfigError> {
        let mut topo = Topology::new(file.name.clone());
        for node in file.nodes.iter() {
            topo.add_node(node)?;
        }
        for l in file.links.iter() {
            let a = topo.get_node_id(&l.a)?;
            let b = topo.get_node_id(&l.b)?;
            topo.add_link_with(a, b, l.cost, l.delay, l.live)?;
        }
        for c in file.changes.iter() {
            let a = topo.get_node_id(&c.a)?;
            let b = topo.get_node_id(&c.b)?;
            topo.add_change(c.time, a, b, c.change)?;
        }
        Ok(topo)
    }

    /// Name of the topology.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a node with a unique name.
    pub fn add_node(&mut self, name: impl Into<String>) -> Result<NodeId, ConfigError> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(ConfigError::DuplicateNode(name));
        }
        let id = self.graph.add_node(name.clone());
        self.names.insert(name, id);
        Ok(id)
    }

    /// Add a live link with the given cost and delay.
    pub fn add_link(
        &mut self,
        a: NodeId,
        b: NodeId,
        cost: LinkWeight,
        delay: SimTime,
    ) -> Result<(), ConfigError> {
        self.add_link_with(a, b, cost, delay, true)
    }

    /// Add a link, specifying whether it is live when the simulation starts.
    pub fn add_link_with(
        &mut self,
        a: NodeId,
        b: NodeId,
        cost: LinkWeight,
        delay: SimTime,
        live: bool,
    ) -> Result<(), ConfigError> {
        let name_a = self.node_name_or_err(a)?.to_string();
        let name_b = self.node_name_or_err(b)?.to_string();
        if a == b {
            return Err(ConfigError::SelfLoop(name_a));
        }
        if self.graph.find_edge(a, b).is_some() {
            return Err(ConfigError::DuplicateLink(name_a, name_b));
        }
        if !valid_cost(cost) {
            return Err(ConfigError::InvalidCost(name_a, name_b, cost));
        }
        if !(delay.is_finite() && delay >= 0.0) {
            return Err(ConfigError::InvalidDelay(name_a, name_b, delay));
        }
        self.graph.add_edge(a, b, LinkSpec { cost, delay, live });
        Ok(())
    }

    /// Schedule a change on the link `a -- b` at time `time`. Changes with the same time keep the
    /// order in which they were added.
    pub fn add_change(
        &mut self,
        time: SimTime,
        a: NodeId,
        b: NodeId,
        change: LinkChange,
    ) -> Result<(), ConfigError> {
        if !(time.is_finite() && time >= 0.0) {
            return Err(ConfigError::InvalidTime(time));
        }
        let name_a = self.node_name_or_err(a)?.to_string();
        let name_b = self.node_name_or_err(b)?.to_string();
        if self.graph.find_edge(a, b).is_none() {
            return Err(ConfigError::UnknownLink(time, name_a, name_b));
        }
        if let LinkChange::Cost(cost) = change {
            if !valid_cost(cost) {
                return Err(ConfigError::InvalidCost(name_a, name_b, cost));
            }
        }
        let pos = self.changes.partition_point(|c| c.time <= time);
        self.changes.insert(
            pos,
            TopologyChange {
                time,
                link: LinkKey::new(a, b),
                change,
            },
        );
        Ok(())
    }

    /// Get the id of the node with the given name.
    pub fn get_node_id(&self, name: impl AsRef<str>) -> Result<NodeId, ConfigError> {
        self.names
            .get(name.as_ref())
            .copied()
            .ok_or_else(|| ConfigError::UnknownNode(name.as_ref().to_string()))
    }

    /// Get the name of a node.
    pub fn node_name(&self, node: NodeId) -> Option<&str> {
        self.graph.node_weight(node).map(|s| s.as_str())
    }

    fn node_name_or_err(&self, node: NodeId) -> Result<&str, ConfigError> {
        self.node_name(node)
            .ok_or_else(|| ConfigError::UnknownNode(format!("{}", node.index())))
    }

    /// All nodes, sorted by their id.
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.graph.node_indices().collect();
        nodes.sort();
        nodes
    }

    /// Number of nodes in the topology.
    pub fn num_nodes(&self) -> usize {
        self.graph.node_count()
    }

    /// All links with their attributes, sorted by their key.
    pub fn links(&self) -> Vec<(LinkKey, LinkSpec)> {
        let mut links: Vec<(LinkKey, LinkSpec)> = self
            .graph
            .edge_references()
            .map(|e| (LinkKey::new(e.source(), e.target()), *e.weight()))
            .collect();
        links.sort_by_key(|(k, _)| *k);
        links
    }

    /// Get the attributes of the link between `a` and `b`.
    pub fn get_link(&self, a: NodeId, b: NodeId) -> Option<&LinkSpec> {
        self.graph
            .find_edge(a, b)
            .and_then(|e| self.graph.edge_weight(e))
    }

    /// The schedule of link changes, ordered by time.
    pub fn changes(&self) -> &[TopologyChange] {
        &self.changes
    }

    /// Reference to the underlying graph.
    pub fn graph(&self) -> &TopologyGraph {
        &self.graph
    }
}

fn valid_cost(cost: LinkWeight) -> bool {
    !cost.is_nan() && cost >= 0.0
}

/// Declarative description of a topology, as stored in a JSON file. Nodes are referenced by their
/// name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TopologyFile {
    /// Name of the topology
    #[serde(default)]
    pub name: String,
    /// Names of all nodes
    pub nodes: Vec<String>,
    /// All links
    #[serde(default)]
    pub links: Vec<LinkEntry>,
    /// Timed link changes
    #[serde(default)]
    pub changes: Vec<ChangeEntry>,
}

/// Link in a [`TopologyFile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkEntry {
    /// First endpoint
    pub a: String,
    /// Second endpoint
    pub b: String,
    /// Cost of the link
    pub cost: LinkWeight,
    /// Propagation delay
    #[serde(default = "default_delay")]
    pub delay: SimTime,
    /// Liveness when the simulation starts
    #[serde(default = "default_live")]
    pub live: bool,
}

/// Timed change in a [`TopologyFile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    /// Time of the change
    pub time: SimTime,
    /// First endpoint of the link
    pub a: String,
    /// Second endpoint of the link
    pub b: String,
    /// What changes
    pub change: LinkChange,
}

fn default_delay() -> SimTime {
    DEFAULT_DELAY
}

fn default_live() -> bool {
    true
}
