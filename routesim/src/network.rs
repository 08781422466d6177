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

//! # Top-level Network module
//!
//! This module represents the simulation driver. The [`Network`] owns the scheduler, the links and
//! one [`RouterHost`] per node for the duration of a single run. It moves through the following
//! states:
//!
//! - [`SimState::Loading`]: All nodes are initialized (in the order of their id), all topology
//!   changes are scheduled, and the first periodic timer of every node is scheduled.
//! - [`SimState::Warming`]: Events are processed until no forwarding table changed for the
//!   quiescence window. The clock is then moved to the end of that window.
//! - [`SimState::SteadyStateWait`]: The network is quiescent. Timers keep firing until the next
//!   topology change becomes due. If any forwarding table changes in this state, the network falls
//!   back to `Warming`.
//! - [`SimState::ChangeApplied`]: The current phase is captured, the link is modified, and both
//!   endpoints are notified. Afterwards, the network is `Warming` again. A topology change that
//!   becomes due while the network is `Warming` is held back until the network is quiescent.
//! - [`SimState::Draining`]: No topology change remains. Packets already in flight are delivered
//!   (without sending the responses), timers are discarded, the final phase is captured, and
//!   data packets are sent between all pairs of nodes.
//! - [`SimState::Finished`] or [`SimState::Exhausted`]: The run is over.

use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use itertools::Itertools;
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    config::SimConfig,
    event::{Event, ScheduledEvent, Scheduler},
    formatter::NetworkFormatter,
    forwarding_state::ForwardingState,
    host::{DataAction, LinkEvent, RouterHost},
    link::{LinkTable, SendOutcome},
    packet::{Packet, Payload},
    record::{AppliedChange, ExhaustReason, PhaseRecord, ProbeOutcome, SimOutcome, SimStats},
    router::{ForwardingTable, RoutingAlgorithm},
    topology::{LinkChange, Topology, TopologyChange},
    types::{LinkWeight, NetworkError, NodeId, RouterFault, SimTime},
};

/// State of the simulation driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimState {
    /// Nodes are not yet initialized.
    Loading,
    /// Waiting for the forwarding state to become quiescent.
    Warming,
    /// Quiescent, waiting for the next topology change.
    SteadyStateWait,
    /// A topology change is being applied.
    ChangeApplied,
    /// Delivering the remaining packets, and sending probe traffic.
    Draining,
    /// The run has finished.
    Finished,
    /// The run was aborted.
    Exhausted(ExhaustReason),
}

impl SimState {
    /// Returns `true` if the run is over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SimState::Finished | SimState::Exhausted(_))
    }
}

/// # Network struct
/// The struct contains all information about the simulated network during a single run.
#[derive(Debug)]
pub struct Network {
    topo: Topology,
    config: SimConfig,
    sched: Scheduler,
    links: LinkTable,
    hosts: BTreeMap<NodeId, RouterHost>,
    fw_state: ForwardingState,
    state: SimState,
    phases: Vec<PhaseRecord>,
    phase_start: SimTime,
    phase_change: Option<AppliedChange>,
    phase_fw_changes: usize,
    last_fw_change: SimTime,
    quiescent_at: Option<SimTime>,
    deferred: VecDeque<TopologyChange>,
    pending_changes: usize,
    faults: BTreeMap<NodeId, RouterFault>,
    probes: BTreeMap<(NodeId, NodeId), ProbeOutcome>,
    stats: SimStats,
    algorithm: String,
    cancel: Option<Arc<AtomicBool>>,
    wall_clock: Option<Duration>,
    started: Option<Instant>,
}

impl Network {
    /// Create a new network from the topology, running the algorithm created by `factory` on every
    /// node. The factory is called once per node, in the order of the node ids.
    pub fn new<F>(topo: Topology, config: SimConfig, mut factory: F) -> Result<Self, NetworkError>
    where
        F: FnMut(NodeId) -> Box<dyn RoutingAlgorithm>,
    {
        config.validate_for(&topo)?;
        let links = LinkTable::new(&topo, config.loss, config.seed);
        let hosts: BTreeMap<NodeId, RouterHost> = topo
            .nodes()
            .into_iter()
            .map(|n| {
                let adjacent = topo.graph().neighbors(n).collect_vec();
                (
                    n,
                    RouterHost::new(n, factory(n), adjacent, config.max_outbound_per_call),
                )
            })
            .collect();
        let algorithm = hosts
            .values()
            .map(|h| h.algorithm_name())
            .unique()
            .join("+");

        Ok(Self {
            topo,
            config,
            sched: Scheduler::new(),
            links,
            hosts,
            fw_state: ForwardingState::default(),
            state: SimState::Loading,
            phases: Vec::new(),
            phase_start: 0.0,
            phase_change: None,
            phase_fw_changes: 0,
            last_fw_change: 0.0,
            quiescent_at: None,
            deferred: VecDeque::new(),
            pending_changes: 0,
            faults: BTreeMap::new(),
            probes: BTreeMap::new(),
            stats: SimStats::default(),
            algorithm,
            cancel: None,
            wall_clock: None,
            started: None,
        })
    }

    /// Abort the run as soon as `flag` is set.
    pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
        self.cancel = Some(flag);
    }

    /// Abort the run once it took longer than `limit` (measured in real time).
    pub fn set_wall_clock_limit(&mut self, limit: Duration) {
        self.wall_clock = Some(limit);
    }

    /// The simulated topology.
    pub fn topology(&self) -> &Topology {
        &self.topo
    }

    /// The parameters of this run.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Current state of the driver.
    pub fn state(&self) -> SimState {
        self.state
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.sched.now()
    }

    /// The current forwarding state of all nodes.
    pub fn fw_state(&self) -> &ForwardingState {
        &self.fw_state
    }

    /// The host of a node.
    pub fn get_host(&self, node: NodeId) -> Result<&RouterHost, NetworkError> {
        self.hosts.get(&node).ok_or(NetworkError::NodeNotFound(node))
    }

    /// The links of the network.
    pub fn links(&self) -> &LinkTable {
        &self.links
    }

    /// All phases captured so far.
    pub fn phases(&self) -> &[PhaseRecord] {
        &self.phases
    }

    /// Run the simulation until it finishes or its budget is exhausted.
    pub fn run(&mut self) -> Result<SimOutcome, NetworkError> {
        if self.state.is_terminal() {
            return Err(NetworkError::AlreadyTerminated);
        }
        self.started = Some(Instant::now());
        while !self.state.is_terminal() {
            self.step()?;
        }
        Ok(self.outcome())
    }

    /// Perform a single step of the state machine. Most steps process a single event.
    pub fn step(&mut self) -> Result<(), NetworkError> {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
        match self.state {
            SimState::Loading => self.load(),
            SimState::Warming | SimState::SteadyStateWait => self.step_converging(),
            SimState::ChangeApplied => {
                self.set_state(SimState::Warming);
                Ok(())
            }
            SimState::Draining => self.drain(),
            SimState::Finished | SimState::Exhausted(_) => Err(NetworkError::AlreadyTerminated),
        }
    }

    /// Collect the result of the run.
    pub fn outcome(&self) -> SimOutcome {
        let mut stats = self.stats;
        stats.links = self.links.stats();
        SimOutcome {
            topology: self.topo.name().to_string(),
            algorithm: self.algorithm.clone(),
            exhausted: match self.state {
                SimState::Exhausted(r) => Some(r),
                _ => None,
            },
            phases: self.phases.clone(),
            faults: self.faults.clone(),
            probes: self.probes.clone(),
            stats,
            end_time: self.sched.now(),
        }
    }

    /// Initialize all nodes, and schedule the topology changes and the first timers.
    fn load(&mut self) -> Result<(), NetworkError> {
        debug!("Loading topology {}", self.topo.name());
        let nodes = self.topo.nodes();
        for node in nodes.iter().copied() {
            let neighbors = self.links.neighbors(node);
            let result = self.host_mut(node)?.init(0.0, &neighbors);
            self.handle_output(node, result)?;
        }
        for change in self.topo.changes().to_vec() {
            self.sched.schedule(change.time, Event::TopologyChange(change))?;
            self.pending_changes += 1;
        }
        for node in nodes {
            if !self.host_mut(node)?.is_disabled() {
                self.sched.schedule(self.config.heartbeat, Event::Timer(node))?;
            }
        }
        self.phase_start = 0.0;
        self.last_fw_change = 0.0;
        self.set_state(SimState::Warming);
        Ok(())
    }

    /// Process the next event, or detect quiescence.
    fn step_converging(&mut self) -> Result<(), NetworkError> {
        if self.state == SimState::Warming {
            let deadline = self.last_fw_change + self.config.quiescence_window;
            if self.sched.peek_time().map(|t| t > deadline).unwrap_or(true) {
                self.sched.advance_to(deadline)?;
                return self.on_quiescence();
            }
        } else if self.sched.is_empty() {
            // nothing can happen anymore.
            return self.on_quiescence();
        }

        if let Some(reason) = self.check_budget() {
            self.exhaust(reason);
            return Ok(());
        }

        let ScheduledEvent { time, event, .. } = self.sched.pop_next()?;
        self.stats.events += 1;
        trace!("[{:.3}] {}", time, event.fmt(&self.topo));

        match event {
            Event::Packet { from, to, packet } => {
                if packet.is_data() {
                    self.on_data_arrival(from, to, packet)?;
                } else {
                    self.stats.control_delivered += 1;
                    let result = self.host_mut(to)?.on_packet(time, from, &packet);
                    self.handle_output(to, result)?;
                }
            }
            Event::Timer(node) => {
                let result = self.host_mut(node)?.on_timer(time);
                self.handle_output(node, result)?;
                if !self.host_mut(node)?.is_disabled() {
                    self.sched
                        .schedule(time + self.config.heartbeat, Event::Timer(node))?;
                }
            }
            Event::TopologyChange(change) => {
                self.pending_changes = self.pending_changes.saturating_sub(1);
                if self.state == SimState::SteadyStateWait {
                    self.apply_change(change)?;
                } else {
                    debug!(
                        "Change {} becomes due while converging. Defer it.",
                        change.fmt(&self.topo)
                    );
                    self.stats.deferred_changes += 1;
                    self.deferred.push_back(change);
                }
            }
        }
        Ok(())
    }

    /// The network has been quiescent for the entire window.
    fn on_quiescence(&mut self) -> Result<(), NetworkError> {
        let now = self.sched.now();
        if self.quiescent_at.is_none() {
            debug!(
                "Quiescent at {:.3} (last forwarding change at {:.3})",
                now, self.last_fw_change
            );
            self.quiescent_at = Some(now);
        }
        if let Some(change) = self.deferred.pop_front() {
            self.set_state(SimState::SteadyStateWait);
            self.apply_change(change)
        } else if self.pending_changes == 0 {
            self.set_state(SimState::Draining);
            Ok(())
        } else {
            self.set_state(SimState::SteadyStateWait);
            Ok(())
        }
    }

    /// Capture the current phase, apply the change, and notify both endpoints.
    fn apply_change(&mut self, change: TopologyChange) -> Result<(), NetworkError> {
        let now = self.sched.now();
        self.capture_phase(false);
        self.set_state(SimState::ChangeApplied);
        info!("[{:.3}] Apply {}", now, change.fmt(&self.topo));

        let (a, b) = change.link.endpoints();
        let event = match change.change {
            LinkChange::Down => {
                let was_live = self.links.set_liveness(a, b, false)?;
                was_live.then_some(LinkEvent::Down)
            }
            LinkChange::Up if self.faults.contains_key(&a) || self.faults.contains_key(&b) => {
                debug!("Link stays down, as one endpoint has faulted");
                None
            }
            LinkChange::Up => {
                let was_live = self.links.set_liveness(a, b, true)?;
                let cost = self.links.get(a, b).map(|l| l.cost).unwrap_or_default();
                (!was_live).then_some(LinkEvent::Up(cost))
            }
            LinkChange::Cost(cost) => {
                self.links.set_cost(a, b, cost)?;
                self.links.is_live(a, b).then_some(LinkEvent::Cost(cost))
            }
        };

        self.phase_start = now;
        self.phase_change = Some(AppliedChange {
            change,
            applied_at: now,
        });
        self.phase_fw_changes = 0;
        self.last_fw_change = now;
        self.quiescent_at = None;

        match event {
            Some(event) => {
                for (node, neighbor) in [(a, b), (b, a)] {
                    let result = self.host_mut(node)?.on_link_change(now, neighbor, event);
                    self.handle_output(node, result)?;
                }
            }
            None => debug!("Change does not affect the live topology"),
        }

        self.set_state(SimState::Warming);
        Ok(())
    }

    /// Deliver all packets in flight, capture the final phase, and send probe traffic.
    fn drain(&mut self) -> Result<(), NetworkError> {
        let discarded = self.sched.retain(|e| e.is_packet());
        self.stats.discarded_timers += discarded;

        while !self.sched.is_empty() {
            if let Some(reason) = self.check_abort() {
                self.exhaust(reason);
                return Ok(());
            }
            let ScheduledEvent { time, event, .. } = self.sched.pop_next()?;
            self.stats.events += 1;
            trace!("[{:.3}] (draining) {}", time, event.fmt(&self.topo));
            if let Event::Packet { from, to, packet } = event {
                self.stats.control_delivered += 1;
                let result = self.host_mut(to)?.on_packet(time, from, &packet);
                match result {
                    Ok(out) => {
                        self.stats.suppressed += out.len();
                        self.refresh_table(to)?;
                    }
                    Err(fault) => self.record_fault(to, fault)?,
                }
            }
        }

        self.capture_phase(true);

        if self.config.probes {
            self.send_probes()?;
        }
        if self.state == SimState::Draining {
            self.set_state(SimState::Finished);
        }
        Ok(())
    }

    /// Send one data packet between every ordered pair of distinct nodes, and forward them until
    /// they are delivered or dropped.
    fn send_probes(&mut self) -> Result<(), NetworkError> {
        let nodes = self.topo.nodes();
        let now = self.sched.now();
        for (src, dst) in nodes.iter().copied().tuple_combinations() {
            for (s, d) in [(src, dst), (dst, src)] {
                let packet = Packet::data(s, d, self.config.ttl);
                self.route_data(s, packet, now)?;
            }
        }
        while !self.sched.is_empty() {
            if let Some(reason) = self.check_abort() {
                self.exhaust(reason);
                return Ok(());
            }
            let ScheduledEvent { event, .. } = self.sched.pop_next()?;
            if let Event::Packet { from, to, packet } = event {
                self.on_data_arrival(from, to, packet)?;
            }
        }
        let delivered = self.probes.values().filter(|p| p.is_delivered()).count();
        debug!("{} of {} probes delivered", delivered, self.probes.len());
        Ok(())
    }

    /// A data packet arrived at `to`.
    fn on_data_arrival(
        &mut self,
        _from: NodeId,
        to: NodeId,
        mut packet: Packet,
    ) -> Result<(), NetworkError> {
        if let Payload::Data { trace } = &mut packet.payload {
            trace.push(to);
        }
        let now = self.sched.now();
        self.route_data(to, packet, now)
    }

    /// Decide what to do with a data packet at `node`, and either send it or record its outcome.
    fn route_data(
        &mut self,
        node: NodeId,
        packet: Packet,
        now: SimTime,
    ) -> Result<(), NetworkError> {
        let action = match self.host_mut(node)?.forward_data(packet) {
            Ok(action) => action,
            Err(fault) => return self.record_fault(node, fault),
        };
        match action {
            DataAction::Forward(next_hop, packet) => {
                let key = (packet.src, packet.dst);
                let path = packet.trace().map(|t| t.to_vec()).unwrap_or_default();
                match self.links.send(&mut self.sched, node, next_hop, packet, now)? {
                    SendOutcome::Scheduled => {}
                    SendOutcome::LinkDown | SendOutcome::Lost => {
                        self.probes.insert(key, ProbeOutcome::Dropped { path });
                    }
                }
            }
            DataAction::Deliver(packet) => {
                let path = packet.trace().map(|t| t.to_vec()).unwrap_or_default();
                let cost = self.path_cost(&path);
                self.probes.insert(
                    (packet.src, packet.dst),
                    ProbeOutcome::Delivered { path, cost },
                );
            }
            DataAction::TtlExpired(packet) => {
                let path = packet.trace().map(|t| t.to_vec()).unwrap_or_default();
                self.probes
                    .insert((packet.src, packet.dst), ProbeOutcome::TtlExpired { path });
            }
            DataAction::NoRoute(packet) => {
                let path = packet.trace().map(|t| t.to_vec()).unwrap_or_default();
                self.probes
                    .insert((packet.src, packet.dst), ProbeOutcome::NoRoute { path });
            }
        }
        Ok(())
    }

    /// Sum of the current link costs along `path`.
    fn path_cost(&self, path: &[NodeId]) -> LinkWeight {
        path.iter()
            .tuple_windows()
            .map(|(a, b)| {
                self.links
                    .get(*a, *b)
                    .map(|l| l.cost)
                    .unwrap_or(LinkWeight::INFINITY)
            })
            .sum()
    }

    /// Send all packets emitted by a node, or record its fault. Then, update its forwarding table.
    fn handle_output(
        &mut self,
        node: NodeId,
        result: Result<Vec<(NodeId, Packet)>, RouterFault>,
    ) -> Result<(), NetworkError> {
        match result {
            Ok(out) => {
                let now = self.sched.now();
                for (to, packet) in out {
                    self.links.send(&mut self.sched, node, to, packet, now)?;
                }
                self.refresh_table(node)
            }
            Err(fault) => self.record_fault(node, fault),
        }
    }

    /// Disable a node: remember the fault, clear its forwarding table, and take all its links
    /// down. Every live neighbor is notified, such that it can route around the faulted node.
    fn record_fault(&mut self, node: NodeId, fault: RouterFault) -> Result<(), NetworkError> {
        if self.faults.contains_key(&node) {
            return Ok(());
        }
        let now = self.sched.now();
        warn!("[{:.3}] {} faulted: {}", now, node.fmt(&self.topo), fault);
        self.faults.insert(node, fault);
        let deltas = self.fw_state.update(node, ForwardingTable::new());
        self.on_fw_change(deltas.len());

        for (neighbor, _) in self.links.neighbors(node) {
            self.links.set_liveness(node, neighbor, false)?;
            debug!(
                "[{:.3}] Take down {} -- {}",
                now,
                node.fmt(&self.topo),
                neighbor.fmt(&self.topo)
            );
            let loading = self.state == SimState::Loading;
            let host = self.host_mut(neighbor)?;
            // a node that is not yet initialized learns about its live neighbors in `init`.
            if loading && host.stats().invocations == 0 {
                continue;
            }
            let result = host.on_link_change(now, node, LinkEvent::Down);
            if self.state == SimState::Draining {
                // no new control traffic once the network drains.
                match result {
                    Ok(out) => {
                        self.stats.suppressed += out.len();
                        self.refresh_table(neighbor)?;
                    }
                    Err(fault) => self.record_fault(neighbor, fault)?,
                }
            } else {
                self.handle_output(neighbor, result)?;
            }
        }
        Ok(())
    }

    /// Read the forwarding table of a node and remember whether it has changed.
    fn refresh_table(&mut self, node: NodeId) -> Result<(), NetworkError> {
        let table = match self.host_mut(node)?.snapshot_forwarding_table() {
            Ok(table) => table,
            Err(fault) => return self.record_fault(node, fault),
        };
        let deltas = self.fw_state.update(node, table);
        for delta in deltas.iter() {
            trace!("[{:.3}] {}", self.sched.now(), delta.fmt(&self.topo));
        }
        self.on_fw_change(deltas.len());
        Ok(())
    }

    fn on_fw_change(&mut self, num: usize) {
        if num == 0 {
            return;
        }
        self.phase_fw_changes += num;
        self.last_fw_change = self.sched.now();
        if self.state == SimState::SteadyStateWait {
            debug!(
                "[{:.3}] Forwarding state changed while quiescent",
                self.sched.now()
            );
            self.quiescent_at = None;
            self.set_state(SimState::Warming);
        }
    }

    /// Store the current forwarding state as a phase record.
    fn capture_phase(&mut self, is_final: bool) {
        let faulted: BTreeSet<NodeId> = self.faults.keys().copied().collect();
        let record = PhaseRecord {
            index: self.phases.len(),
            start: self.phase_start,
            change: self.phase_change,
            converged_at: self.last_fw_change.max(self.phase_start),
            quiescent_at: self.quiescent_at,
            fw_changes: self.phase_fw_changes,
            is_final,
            fw_state: self.fw_state.clone(),
            links: self.links.live_links(),
            faulted,
        };
        debug!(
            "Captured phase {} (converged after {:.3}, {} changes)",
            record.index,
            record.convergence_time(),
            record.fw_changes
        );
        self.phases.push(record);
    }

    /// Check the budget of the run before processing the next event.
    fn check_budget(&self) -> Option<ExhaustReason> {
        if self.stats.events >= self.config.max_events {
            return Some(ExhaustReason::MaxEvents);
        }
        if self
            .sched
            .peek_time()
            .map(|t| t > self.config.max_time)
            .unwrap_or(false)
        {
            return Some(ExhaustReason::MaxTime);
        }
        self.check_abort()
    }

    /// Check the wall-clock limit and the cancellation flag.
    fn check_abort(&self) -> Option<ExhaustReason> {
        if self
            .cancel
            .as_ref()
            .map(|f| f.load(Ordering::Relaxed))
            .unwrap_or(false)
        {
            return Some(ExhaustReason::Cancelled);
        }
        match (self.wall_clock, self.started) {
            (Some(limit), Some(start)) if start.elapsed() > limit => Some(ExhaustReason::WallClock),
            _ => None,
        }
    }

    fn exhaust(&mut self, reason: ExhaustReason) {
        warn!(
            "[{:.3}] Simulation of {} aborted: {}",
            self.sched.now(),
            self.topo.name(),
            reason
        );
        if !self.phases.last().map(|p| p.is_final).unwrap_or(false) {
            self.capture_phase(true);
        }
        self.set_state(SimState::Exhausted(reason));
    }

    fn set_state(&mut self, state: SimState) {
        if self.state != state {
            debug!(
                "[{:.3}] {:?} -> {:?}",
                self.sched.now(),
                self.state,
                state
            );
            self.state = state;
        }
    }

    fn host_mut(&mut self, node: NodeId) -> Result<&mut RouterHost, NetworkError> {
        self.hosts
            .get_mut(&node)
            .ok_or(NetworkError::NodeNotFound(node))
    }
}
