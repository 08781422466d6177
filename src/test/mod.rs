// RouteGrade: Grading harness for pluggable routing protocols
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

use std::{thread, time::Duration};

use routesim::{packet::Packet, prelude::*};

mod test_checker;
mod test_scoring;

/// Algorithm with a fixed forwarding table, which never sends any packet.
#[derive(Debug, Clone, Default)]
pub(crate) struct Static {
    /// The table returned by the algorithm
    pub table: ForwardingTable,
    /// Panic on every timer
    pub crash: bool,
    /// Sleep on every timer
    pub sleep: Option<Duration>,
}

impl Static {
    pub(crate) fn new(table: ForwardingTable) -> Self {
        Self {
            table,
            ..Default::default()
        }
    }

    pub(crate) fn crash() -> Self {
        Self {
            crash: true,
            ..Default::default()
        }
    }

    pub(crate) fn sleep(duration: Duration) -> Self {
        Self {
            sleep: Some(duration),
            ..Default::default()
        }
    }
}

impl RoutingAlgorithm for Static {
    fn name(&self) -> &'static str {
        "static"
    }

    fn init(&mut self, _: &mut RouterCtx, _: &[(NodeId, LinkWeight)]) -> Result<(), AlgorithmError> {
        Ok(())
    }

    fn handle_packet(
        &mut self,
        _: &mut RouterCtx,
        _: NodeId,
        _: &Packet,
    ) -> Result<(), AlgorithmError> {
        Ok(())
    }

    fn handle_new_link(
        &mut self,
        _: &mut RouterCtx,
        _: NodeId,
        _: LinkWeight,
    ) -> Result<(), AlgorithmError> {
        Ok(())
    }

    fn handle_remove_link(&mut self, _: &mut RouterCtx, _: NodeId) -> Result<(), AlgorithmError> {
        Ok(())
    }

    fn handle_time(&mut self, _: &mut RouterCtx, _: SimTime) -> Result<(), AlgorithmError> {
        if self.crash {
            panic!("crashed on purpose");
        }
        if let Some(d) = self.sleep {
            thread::sleep(d);
        }
        Ok(())
    }

    fn forwarding_table(&self) -> ForwardingTable {
        self.table.clone()
    }
}

/// Wraps another algorithm, and panics on every timer from `at` on.
#[derive(Debug)]
pub(crate) struct CrashLater {
    pub inner: Box<dyn RoutingAlgorithm>,
    pub at: SimTime,
}

impl RoutingAlgorithm for CrashLater {
    fn name(&self) -> &'static str {
        "crash-later"
    }

    fn init(
        &mut self,
        ctx: &mut RouterCtx,
        neighbors: &[(NodeId, LinkWeight)],
    ) -> Result<(), AlgorithmError> {
        self.inner.init(ctx, neighbors)
    }

    fn handle_packet(
        &mut self,
        ctx: &mut RouterCtx,
        from: NodeId,
        packet: &Packet,
    ) -> Result<(), AlgorithmError> {
        self.inner.handle_packet(ctx, from, packet)
    }

    fn handle_new_link(
        &mut self,
        ctx: &mut RouterCtx,
        neighbor: NodeId,
        cost: LinkWeight,
    ) -> Result<(), AlgorithmError> {
        self.inner.handle_new_link(ctx, neighbor, cost)
    }

    fn handle_remove_link(
        &mut self,
        ctx: &mut RouterCtx,
        neighbor: NodeId,
    ) -> Result<(), AlgorithmError> {
        self.inner.handle_remove_link(ctx, neighbor)
    }

    fn handle_time(&mut self, ctx: &mut RouterCtx, now: SimTime) -> Result<(), AlgorithmError> {
        if now >= self.at {
            panic!("crashed on purpose");
        }
        self.inner.handle_time(ctx, now)
    }

    fn forwarding_table(&self) -> ForwardingTable {
        self.inner.forwarding_table()
    }
}

/// ```text
/// A --- B
/// |     |
/// D --- C
/// ```
pub(crate) fn square() -> Topology {
    let mut t = Topology::new("square");
    let a = t.add_node("A").unwrap();
    let b = t.add_node("B").unwrap();
    let c = t.add_node("C").unwrap();
    let d = t.add_node("D").unwrap();
    t.add_link(a, b, 1.0, 1.0).unwrap();
    t.add_link(b, c, 1.0, 1.0).unwrap();
    t.add_link(c, d, 1.0, 1.0).unwrap();
    t.add_link(d, a, 1.0, 1.0).unwrap();
    t
}
