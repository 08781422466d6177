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

//! # This module contains the implementation of the global forwarding state. This is a structure
//! containing the forwarding tables of all nodes at a single point in time, and providing some
//! helper functions to extract information about that state.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    router::{ForwardingTable, FwEntry},
    types::{NetworkError, NodeId},
};

/// # Forwarding State
///
/// Snapshot of the forwarding tables of all nodes. Entries with an infinite cost are treated as
/// absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForwardingState {
    pub(crate) state: BTreeMap<NodeId, ForwardingTable>,
}

/// Change of a single forwarding entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FwDelta {
    /// Node whose table changed
    pub node: NodeId,
    /// Destination of the entry
    pub dst: NodeId,
    /// Entry before the change
    pub old: Option<FwEntry>,
    /// Entry after the change
    pub new: Option<FwEntry>,
}

impl ForwardingState {
    /// Build the forwarding state from the tables of all nodes.
    pub fn from_tables(tables: impl IntoIterator<Item = (NodeId, ForwardingTable)>) -> Self {
        Self {
            state: tables.into_iter().collect(),
        }
    }

    /// Insert or replace the table of a single node. Returns all entries that changed.
    pub fn update(&mut self, node: NodeId, table: ForwardingTable) -> Vec<FwDelta> {
        let old = self.state.remove(&node).unwrap_or_default();
        let deltas = table_diff(node, &old, &table);
        self.state.insert(node, table);
        deltas
    }

    /// Get the table of a node.
    pub fn get_table(&self, node: NodeId) -> Option<&ForwardingTable> {
        self.state.get(&node)
    }

    /// All nodes for which a table is stored.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.state.keys().copied()
    }

    /// Get the entry of `node` towards `dst`. Returns `None` if the node has no entry, or if the
    /// advertised cost is infinite.
    pub fn get_entry(&self, node: NodeId, dst: NodeId) -> Option<FwEntry> {
        self.state
            .get(&node)
            .and_then(|t| t.get(&dst))
            .filter(|e| e.cost.is_finite())
            .copied()
    }

    /// Get the next hop of `node` towards `dst`.
    pub fn get_next_hop(&self, node: NodeId, dst: NodeId) -> Option<NodeId> {
        self.get_entry(node, dst).map(|e| e.next_hop)
    }

    /// Returns `true` if `node` drops packets towards `dst`.
    pub fn is_black_hole(&self, node: NodeId, dst: NodeId) -> bool {
        node != dst && self.get_next_hop(node, dst).is_none()
    }

    /// Follow the next hops from `source` towards `dst`. The returned path starts at `source` and
    /// ends at `dst`.
    ///
    /// If the next-hop chain revisits a node, [`NetworkError::ForwardingLoop`] is returned with the
    /// path up to (and including) the second visit of the first repeated node. If a node on the
    /// path has no entry, [`NetworkError::ForwardingBlackHole`] is returned with the path up to that
    /// node.
    pub fn get_path(&self, source: NodeId, dst: NodeId) -> Result<Vec<NodeId>, NetworkError> {
        let mut visited = HashSet::new();
        let mut path = vec![source];
        visited.insert(source);
        let mut cur = source;

        while cur != dst {
            let nh = match self.get_next_hop(cur, dst) {
                Some(nh) => nh,
                None => return Err(NetworkError::ForwardingBlackHole(path)),
            };
            path.push(nh);
            if !visited.insert(nh) {
                return Err(NetworkError::ForwardingLoop(path));
            }
            cur = nh;
        }

        Ok(path)
    }

    /// Returns the set of all nodes that lie on the forwarding path from `source` towards `dst`,
    /// including `source` itself. In case of a loop, the set contains all nodes of the loop.
    pub fn get_nodes_along_path(&self, source: NodeId, dst: NodeId) -> BTreeSet<NodeId> {
        match self.get_path(source, dst) {
            Ok(p)
            | Err(NetworkError::ForwardingLoop(p))
            | Err(NetworkError::ForwardingBlackHole(p)) => p.into_iter().collect(),
            Err(_) => BTreeSet::new(),
        }
    }

    /// Get all entries that differ between `self` and `other`. `old` refers to `self`, and `new`
    /// refers to `other`.
    pub fn diff(&self, other: &Self) -> Vec<FwDelta> {
        let empty = ForwardingTable::new();
        let nodes: BTreeSet<NodeId> = self.state.keys().chain(other.state.keys()).copied().collect();
        nodes
            .into_iter()
            .flat_map(|n| {
                table_diff(
                    n,
                    self.state.get(&n).unwrap_or(&empty),
                    other.state.get(&n).unwrap_or(&empty),
                )
            })
            .collect()
    }
}

/// Compute the entries that differ between two tables of the same node.
pub(crate) fn table_diff(node: NodeId, old: &ForwardingTable, new: &ForwardingTable) -> Vec<FwDelta> {
    let dsts: BTreeSet<NodeId> = old.keys().chain(new.keys()).copied().collect();
    dsts.into_iter()
        .filter_map(|dst| {
            let o = old.get(&dst).copied();
            let n = new.get(&dst).copied();
            if o == n {
                None
            } else {
                Some(FwDelta {
                    node,
                    dst,
                    old: o,
                    new: n,
                })
            }
        })
        .collect()
}
