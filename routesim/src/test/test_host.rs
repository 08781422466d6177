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

use lazy_static::lazy_static;
use maplit::btreemap;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::{
    host::{DataAction, LinkEvent, RouterHost},
    packet::Packet,
    router::{AlgorithmError, ForwardingTable, FwEntry, RouterCtx, RoutingAlgorithm},
    types::{LinkWeight, NodeId, RouterFault, SimTime},
};

lazy_static! {
    static ref A: NodeId = 0.into();
    static ref B: NodeId = 1.into();
    static ref C: NodeId = 2.into();
    static ref X: NodeId = 9.into();
}

/// How the stub algorithm misbehaves when it receives a timer.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Behavior {
    Good,
    Panic,
    Error,
    Flood(usize),
    SendTo(NodeId),
}

#[derive(Debug)]
struct Stub {
    behavior: Behavior,
    table: ForwardingTable,
}

impl Stub {
    fn new(behavior: Behavior) -> Box<dyn RoutingAlgorithm> {
        Box::new(Self {
            behavior,
            table: btreemap! { *C => FwEntry::new(*B, 2.0), *B => FwEntry::new(*B, 1.0) },
        })
    }
}

impl RoutingAlgorithm for Stub {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn init(
        &mut self,
        ctx: &mut RouterCtx,
        neighbors: &[(NodeId, LinkWeight)],
    ) -> Result<(), AlgorithmError> {
        for (n, _) in neighbors {
            ctx.send(*n, json!("hello"));
        }
        Ok(())
    }

    fn handle_packet(
        &mut self,
        _ctx: &mut RouterCtx,
        _from: NodeId,
        _packet: &Packet,
    ) -> Result<(), AlgorithmError> {
        Ok(())
    }

    fn handle_new_link(
        &mut self,
        _ctx: &mut RouterCtx,
        neighbor: NodeId,
        cost: LinkWeight,
    ) -> Result<(), AlgorithmError> {
        self.table.insert(neighbor, FwEntry::new(neighbor, cost));
        Ok(())
    }

    fn handle_remove_link(
        &mut self,
        _ctx: &mut RouterCtx,
        neighbor: NodeId,
    ) -> Result<(), AlgorithmError> {
        self.table.retain(|_, e| e.next_hop != neighbor);
        Ok(())
    }

    fn handle_time(&mut self, ctx: &mut RouterCtx, _now: SimTime) -> Result<(), AlgorithmError> {
        match self.behavior {
            Behavior::Good => {}
            Behavior::Panic => panic!("boom"),
            Behavior::Error => return Err(AlgorithmError::Other("failed".to_string())),
            Behavior::Flood(n) => (0..n).for_each(|_| ctx.send(*B, json!(null))),
            Behavior::SendTo(to) => ctx.send(to, json!(null)),
        }
        Ok(())
    }

    fn forwarding_table(&self) -> ForwardingTable {
        self.table.clone()
    }
}

fn host(behavior: Behavior) -> RouterHost {
    RouterHost::new(*A, Stub::new(behavior), [*B], 10)
}

#[test]
fn good_host() {
    let mut h = host(Behavior::Good);
    let out = h.init(0.0, &[(*B, 1.0)]).unwrap();
    assert_eq!(out, vec![(*B, Packet::control(*A, *B, json!("hello")))]);
    assert_eq!(h.on_timer(10.0), Ok(vec![]));
    assert!(!h.is_disabled());
    assert_eq!(h.stats().invocations, 2);
    assert_eq!(h.stats().emitted, 1);

    h.on_link_change(11.0, *B, LinkEvent::Cost(4.0)).unwrap();
    assert_eq!(
        h.snapshot_forwarding_table().unwrap().get(&*B),
        Some(&FwEntry::new(*B, 4.0))
    );
    h.on_link_change(12.0, *B, LinkEvent::Down).unwrap();
    assert_eq!(h.snapshot_forwarding_table(), Ok(ForwardingTable::new()));
}

#[test]
fn panic_disables_node() {
    let mut h = host(Behavior::Panic);
    assert_eq!(
        h.on_timer(10.0),
        Err(RouterFault::Panicked("boom".to_string()))
    );
    assert!(h.is_disabled());
    assert_eq!(h.fault(), Some(&RouterFault::Panicked("boom".to_string())));
    // further events are ignored
    assert_eq!(h.on_timer(20.0), Ok(vec![]));
    assert_eq!(h.stats().ignored, 1);
    assert_eq!(h.snapshot_forwarding_table(), Ok(ForwardingTable::new()));
}

#[test]
fn error_disables_node() {
    let mut h = host(Behavior::Error);
    assert_eq!(
        h.on_timer(10.0),
        Err(RouterFault::Algorithm("failed".to_string()))
    );
    assert!(h.is_disabled());
}

#[test]
fn flood_disables_node() {
    let mut h = host(Behavior::Flood(10));
    assert_eq!(h.on_timer(10.0).map(|o| o.len()), Ok(10));
    let mut h = host(Behavior::Flood(11));
    assert_eq!(h.on_timer(10.0), Err(RouterFault::OutboundFlood(11)));
}

#[test]
fn non_neighbor_disables_node() {
    let mut h = host(Behavior::SendTo(*X));
    assert_eq!(h.on_timer(10.0), Err(RouterFault::UnknownNeighbor(*X)));
    let mut h = host(Behavior::SendTo(*A));
    assert_eq!(h.on_timer(10.0), Err(RouterFault::UnknownNeighbor(*A)));
}

#[test]
fn forward_data() {
    let mut h = host(Behavior::Good);

    let p = Packet::data(*C, *A, 5);
    assert_eq!(h.forward_data(p.clone()), Ok(DataAction::Deliver(p)));

    let p = Packet::data(*A, *C, 5);
    let mut expected = p.clone();
    expected.ttl = 4;
    assert_eq!(h.forward_data(p), Ok(DataAction::Forward(*B, expected)));

    let p = Packet::data(*A, *C, 1);
    let mut expected = p.clone();
    expected.ttl = 0;
    assert_eq!(h.forward_data(p), Ok(DataAction::TtlExpired(expected)));

    let p = Packet::data(*A, *X, 5);
    assert_eq!(h.forward_data(p.clone()), Ok(DataAction::NoRoute(p)));
}
