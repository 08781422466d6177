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

//! # Recording of a simulation run
//!
//! While the simulation runs, the driver captures a [`PhaseRecord`] at every quiescence checkpoint.
//! Together with the outcome of the probe traffic and some counters, they form the
//! [`SimOutcome`] that is handed to the checker.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    forwarding_state::ForwardingState,
    link::LinkStats,
    topology::TopologyChange,
    types::{LinkKey, LinkWeight, NodeId, RouterFault, SimTime},
};

/// A topology change, together with the time it was actually applied. A change that becomes due
/// while the network is still converging is applied later.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AppliedChange {
    /// The scheduled change
    pub change: TopologyChange,
    /// Time at which the change was applied
    pub applied_at: SimTime,
}

impl AppliedChange {
    /// Returns `true` if the change was applied later than scheduled.
    pub fn deferred(&self) -> bool {
        self.applied_at > self.change.time
    }
}

/// Snapshot of a single phase of the simulation. A phase starts at the beginning of the simulation
/// or when a topology change is applied, and ends when the next change is applied or the simulation
/// finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseRecord {
    /// Index of the phase, starting at 0.
    pub index: usize,
    /// Time when the phase started.
    pub start: SimTime,
    /// The change that started this phase. `None` for the initial phase.
    pub change: Option<AppliedChange>,
    /// Time of the last forwarding-table change within the phase.
    pub converged_at: SimTime,
    /// Time at which quiescence was detected, or `None` if the phase never became quiescent.
    pub quiescent_at: Option<SimTime>,
    /// Number of forwarding entries that changed during this phase.
    pub fw_changes: usize,
    /// Whether this is the last phase of the run.
    pub is_final: bool,
    /// The forwarding state at the end of the phase.
    pub fw_state: ForwardingState,
    /// All live links with their cost during this phase.
    pub links: BTreeMap<LinkKey, LinkWeight>,
    /// Nodes that were disabled at the end of the phase.
    pub faulted: BTreeSet<NodeId>,
}

impl PhaseRecord {
    /// Returns `true` if the phase reached quiescence.
    pub fn quiescent(&self) -> bool {
        self.quiescent_at.is_some()
    }

    /// Time needed to converge after the phase started.
    pub fn convergence_time(&self) -> SimTime {
        self.converged_at - self.start
    }
}

/// Reason for aborting a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExhaustReason {
    /// Processed the maximum number of events.
    MaxEvents,
    /// Reached the maximum simulated time.
    MaxTime,
    /// Exceeded the wall-clock limit.
    WallClock,
    /// The run was cancelled from the outside.
    Cancelled,
}

impl std::fmt::Display for ExhaustReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExhaustReason::MaxEvents => write!(f, "event budget exhausted"),
            ExhaustReason::MaxTime => write!(f, "time budget exhausted"),
            ExhaustReason::WallClock => write!(f, "wall-clock limit exceeded"),
            ExhaustReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// What happened to a probe packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProbeOutcome {
    /// The packet reached its destination over `path`, with the total link cost `cost`.
    Delivered {
        /// Visited nodes, from the source to the destination
        path: Vec<NodeId>,
        /// Sum of the link costs along the path
        cost: LinkWeight,
    },
    /// The TTL expired.
    TtlExpired {
        /// Visited nodes
        path: Vec<NodeId>,
    },
    /// A node on the path had no route.
    NoRoute {
        /// Visited nodes, ending at the node without a route
        path: Vec<NodeId>,
    },
    /// The packet was dropped by a link that is down, or lost.
    Dropped {
        /// Visited nodes, ending at the node that sent the packet on the link
        path: Vec<NodeId>,
    },
}

impl ProbeOutcome {
    /// Returns `true` if the probe reached its destination.
    pub fn is_delivered(&self) -> bool {
        matches!(self, ProbeOutcome::Delivered { .. })
    }

    /// Path taken by the probe.
    pub fn path(&self) -> &[NodeId] {
        match self {
            ProbeOutcome::Delivered { path, .. }
            | ProbeOutcome::TtlExpired { path }
            | ProbeOutcome::NoRoute { path }
            | ProbeOutcome::Dropped { path } => path,
        }
    }
}

/// Counters collected during the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimStats {
    /// Number of processed events.
    pub events: usize,
    /// Number of control packets delivered to a node.
    pub control_delivered: usize,
    /// Number of topology changes that were applied later than scheduled.
    pub deferred_changes: usize,
    /// Number of packets emitted while draining, which were not sent.
    pub suppressed: usize,
    /// Number of timers discarded when the network started draining.
    pub discarded_timers: usize,
    /// Counters of the links.
    pub links: LinkStats,
}

/// Everything the driver observed during a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimOutcome {
    /// Name of the topology
    pub topology: String,
    /// Name of the simulated algorithm
    pub algorithm: String,
    /// Why the run was aborted, or `None` if it finished.
    pub exhausted: Option<ExhaustReason>,
    /// All captured phases, in order.
    pub phases: Vec<PhaseRecord>,
    /// All nodes that were disabled, with the fault that disabled them.
    pub faults: BTreeMap<NodeId, RouterFault>,
    /// Outcome of the probe traffic, per (source, destination).
    pub probes: BTreeMap<(NodeId, NodeId), ProbeOutcome>,
    /// Counters
    pub stats: SimStats,
    /// Simulated time when the run ended.
    pub end_time: SimTime,
}

impl SimOutcome {
    /// Returns `true` if the run finished without exhausting its budget.
    pub fn finished(&self) -> bool {
        self.exhausted.is_none()
    }

    /// The last phase, if any was captured.
    pub fn final_phase(&self) -> Option<&PhaseRecord> {
        self.phases.last()
    }

    /// Largest convergence time over all phases.
    pub fn max_convergence_time(&self) -> SimTime {
        self.phases
            .iter()
            .map(|p| p.convergence_time())
            .fold(0.0, f64::max)
    }
}
