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

use std::collections::{BTreeMap, BTreeSet};

use maplit::{btreemap, btreeset};
use pretty_assertions_sorted::assert_eq;
use routesim::{prelude::*, record::PhaseRecord, types::LinkKey};
use test_log::test;

use super::square;
use crate::checker::{check_phase, FailureKind, GroundTruth, RouteFailure};

fn e(next_hop: NodeId, cost: LinkWeight) -> FwEntry {
    FwEntry::new(next_hop, cost)
}

fn live_links(topo: &Topology) -> BTreeMap<LinkKey, LinkWeight> {
    topo.links()
        .into_iter()
        .filter(|(_, l)| l.live)
        .map(|(k, l)| (k, l.cost))
        .collect()
}

fn phase(
    topo: &Topology,
    tables: BTreeMap<NodeId, ForwardingTable>,
    faulted: BTreeSet<NodeId>,
) -> PhaseRecord {
    PhaseRecord {
        index: 0,
        start: 0.0,
        change: None,
        converged_at: 0.0,
        quiescent_at: Some(50.0),
        fw_changes: 0,
        is_final: true,
        fw_state: ForwardingState::from_tables(tables),
        links: live_links(topo),
        faulted,
    }
}

/// All shortest paths of the square, with A and C breaking ties towards B.
fn correct_tables(topo: &Topology) -> BTreeMap<NodeId, ForwardingTable> {
    let id = |n| topo.get_node_id(n).unwrap();
    let (a, b, c, d) = (id("A"), id("B"), id("C"), id("D"));
    btreemap! {
        a => btreemap! { b => e(b, 1.0), c => e(b, 2.0), d => e(d, 1.0) },
        b => btreemap! { a => e(a, 1.0), c => e(c, 1.0), d => e(c, 2.0) },
        c => btreemap! { a => e(b, 2.0), b => e(b, 1.0), d => e(d, 1.0) },
        d => btreemap! { a => e(a, 1.0), b => e(a, 2.0), c => e(c, 1.0) },
    }
}

#[test]
fn ground_truth() {
    let topo = square();
    let id = |n| topo.get_node_id(n).unwrap();
    let (a, b, c, d) = (id("A"), id("B"), id("C"), id("D"));

    let truth = GroundTruth::new(topo.nodes(), &live_links(&topo), &BTreeSet::new());
    assert_eq!(truth.cost(a, c), Some(2.0));
    assert_eq!(truth.cost(c, a), Some(2.0));
    assert_eq!(truth.cost(a, a), Some(0.0));
    // both ways around the square are shortest paths
    assert!(truth.is_shortest_next_hop(a, c, b));
    assert!(truth.is_shortest_next_hop(a, c, d));
    assert!(!truth.is_shortest_next_hop(a, b, d));
    // not a neighbor
    assert!(!truth.is_shortest_next_hop(a, c, c));

    let truth = GroundTruth::new(topo.nodes(), &live_links(&topo), &btreeset! {b});
    assert_eq!(truth.cost(a, c), Some(2.0));
    assert_eq!(truth.cost(a, b), None);
    assert!(!truth.is_shortest_next_hop(a, c, b));
    assert!(truth.is_shortest_next_hop(a, c, d));
}

#[test]
fn correct_state() {
    let topo = square();
    let result = check_phase(&topo, &phase(&topo, correct_tables(&topo), BTreeSet::new()));
    assert!(result.is_correct());
    assert_eq!(result.checked, 12);
}

#[test]
fn any_tie_is_accepted() {
    let topo = square();
    let a = topo.get_node_id("A").unwrap();
    let c = topo.get_node_id("C").unwrap();
    let d = topo.get_node_id("D").unwrap();
    let mut tables = correct_tables(&topo);
    tables.get_mut(&a).unwrap().insert(c, e(d, 2.0));
    let result = check_phase(&topo, &phase(&topo, tables, BTreeSet::new()));
    assert!(result.is_correct());
}

#[test]
fn incorrect_routes() {
    let topo = square();
    let id = |n| topo.get_node_id(n).unwrap();
    let (a, b, c, d) = (id("A"), id("B"), id("C"), id("D"));
    let mut tables = correct_tables(&topo);
    // wrong cost
    tables.get_mut(&a).unwrap().insert(c, e(b, 3.0));
    // next hop not on a shortest path, with the correct cost
    tables.get_mut(&d).unwrap().insert(c, e(a, 1.0));
    // missing route
    tables.get_mut(&d).unwrap().remove(&b);

    let result = check_phase(&topo, &phase(&topo, tables, BTreeSet::new()));
    assert_eq!(
        result.failures,
        vec![
            RouteFailure {
                src: a,
                dst: c,
                kind: FailureKind::WrongCost {
                    expected: 2.0,
                    actual: 3.0
                }
            },
            RouteFailure {
                src: d,
                dst: b,
                kind: FailureKind::MissingRoute { expected: 2.0 }
            },
            RouteFailure {
                src: d,
                dst: c,
                kind: FailureKind::WrongNextHop { next_hop: a }
            },
        ]
    );
    assert_eq!(result.loops().count(), 0);
}

#[test]
fn loop_regardless_of_cost() {
    let topo = square();
    let id = |n| topo.get_node_id(n).unwrap();
    let (a, b, c, d) = (id("A"), id("B"), id("C"), id("D"));
    let mut tables = correct_tables(&topo);
    // B sends traffic for D back to A, while A sends it to B. Both costs are correct.
    tables.get_mut(&a).unwrap().insert(d, e(b, 1.0));
    tables.get_mut(&b).unwrap().insert(d, e(a, 2.0));

    let result = check_phase(&topo, &phase(&topo, tables, BTreeSet::new()));
    assert_eq!(
        result.loops().cloned().collect::<Vec<_>>(),
        vec![
            RouteFailure {
                src: a,
                dst: d,
                kind: FailureKind::Loop(vec![a, b, a])
            },
            RouteFailure {
                src: b,
                dst: d,
                kind: FailureKind::Loop(vec![b, a, b])
            },
        ]
    );
    // C reaches D directly
    assert!(result.failures.iter().all(|f| f.src != c));
}

#[test]
fn unreachable_destination() {
    let mut topo = square();
    let x = topo.add_node("E").unwrap();
    let a = topo.get_node_id("A").unwrap();
    let b = topo.get_node_id("B").unwrap();

    let mut tables = correct_tables(&topo);
    tables.insert(x, ForwardingTable::new());
    // an infinite cost is the same as no entry
    tables
        .get_mut(&b)
        .unwrap()
        .insert(x, e(a, LinkWeight::INFINITY));
    tables.get_mut(&a).unwrap().insert(x, e(b, 5.0));

    let result = check_phase(&topo, &phase(&topo, tables, BTreeSet::new()));
    assert_eq!(
        result.failures,
        vec![RouteFailure {
            src: a,
            dst: x,
            kind: FailureKind::UnexpectedRoute { cost: 5.0 }
        }]
    );
}

#[test]
fn faulted_source() {
    let topo = square();
    let id = |n| topo.get_node_id(n).unwrap();
    let (a, b, c, d) = (id("A"), id("B"), id("C"), id("D"));
    let mut tables = correct_tables(&topo);
    tables.insert(b, ForwardingTable::new());
    // without B, A and C must go through D
    tables.get_mut(&a).unwrap().insert(c, e(d, 2.0));
    tables.get_mut(&c).unwrap().insert(a, e(d, 2.0));

    let result = check_phase(&topo, &phase(&topo, tables, btreeset! {b}));
    // routes towards B are not checked
    assert_eq!(result.checked, 9);
    assert_eq!(
        result
            .failures
            .iter()
            .map(|f| (f.src, f.dst, f.kind.clone()))
            .collect::<Vec<_>>(),
        vec![
            (b, a, FailureKind::FaultedSource),
            (b, c, FailureKind::FaultedSource),
            (b, d, FailureKind::FaultedSource),
        ]
    );
}
