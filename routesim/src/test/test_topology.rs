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

use pretty_assertions::assert_eq;

use crate::{
    topology::{LinkChange, LinkSpec, Topology, DEFAULT_DELAY},
    types::{ConfigError, LinkKey},
};

const SQUARE: &str = r#"{
    "name": "square",
    "nodes": ["A", "B", "C", "D"],
    "links": [
        {"a": "A", "b": "B", "cost": 1},
        {"a": "B", "b": "C", "cost": 2, "delay": 3},
        {"a": "C", "b": "D", "cost": 1, "live": false},
        {"a": "D", "b": "A", "cost": 5}
    ],
    "changes": [
        {"time": 400, "a": "A", "b": "B", "change": {"cost": 7}},
        {"time": 200, "a": "A", "b": "B", "change": "down"},
        {"time": 200, "a": "D", "b": "C", "change": "up"}
    ]
}"#;

#[test]
fn parse_square() {
    let topo = Topology::from_json(SQUARE).unwrap();
    assert_eq!(topo.name(), "square");
    assert_eq!(topo.num_nodes(), 4);

    let a = topo.get_node_id("A").unwrap();
    let b = topo.get_node_id("B").unwrap();
    let c = topo.get_node_id("C").unwrap();
    let d = topo.get_node_id("D").unwrap();
    assert_eq!(topo.node_name(c), Some("C"));

    assert_eq!(
        topo.get_link(b, a),
        Some(&LinkSpec {
            cost: 1.0,
            delay: DEFAULT_DELAY,
            live: true
        })
    );
    assert_eq!(topo.get_link(b, c).map(|l| l.delay), Some(3.0));
    assert_eq!(topo.get_link(c, d).map(|l| l.live), Some(false));
    assert_eq!(topo.get_link(a, c), None);
    assert_eq!(topo.links().len(), 4);

    // changes are sorted by time, keeping the order of changes with the same time.
    let changes = topo
        .changes()
        .iter()
        .map(|c| (c.time, c.link, c.change))
        .collect::<Vec<_>>();
    assert_eq!(
        changes,
        vec![
            (200.0, LinkKey::new(a, b), LinkChange::Down),
            (200.0, LinkKey::new(c, d), LinkChange::Up),
            (400.0, LinkKey::new(a, b), LinkChange::Cost(7.0)),
        ]
    );
}

#[test]
fn link_key_is_unordered() {
    let topo = Topology::from_json(SQUARE).unwrap();
    let a = topo.get_node_id("A").unwrap();
    let d = topo.get_node_id("D").unwrap();
    let k = LinkKey::new(d, a);
    assert_eq!(k, LinkKey::new(a, d));
    assert_eq!(k.endpoints(), (a, d));
    assert_eq!(k.other(a), Some(d));
    assert_eq!(k.other(d), Some(a));
    assert!(k.contains(a));
}

#[test]
fn duplicate_node() {
    let mut topo = Topology::new("t");
    topo.add_node("A").unwrap();
    assert_eq!(
        topo.add_node("A"),
        Err(ConfigError::DuplicateNode("A".to_string()))
    );
}

#[test]
fn invalid_links() {
    let mut topo = Topology::new("t");
    let a = topo.add_node("A").unwrap();
    let b = topo.add_node("B").unwrap();
    assert_eq!(
        topo.add_link(a, a, 1.0, 1.0),
        Err(ConfigError::SelfLoop("A".to_string()))
    );
    assert!(matches!(
        topo.add_link(a, b, -1.0, 1.0),
        Err(ConfigError::InvalidCost(_, _, _))
    ));
    assert!(matches!(
        topo.add_link(a, b, f64::NAN, 1.0),
        Err(ConfigError::InvalidCost(_, _, _))
    ));
    assert!(matches!(
        topo.add_link(a, b, 1.0, -2.0),
        Err(ConfigError::InvalidDelay(_, _, _))
    ));
    topo.add_link(a, b, 1.0, 1.0).unwrap();
    assert_eq!(
        topo.add_link(b, a, 1.0, 1.0),
        Err(ConfigError::DuplicateLink("B".to_string(), "A".to_string()))
    );
}

#[test]
fn invalid_files() {
    let unknown_node = r#"{"nodes": ["A"], "links": [{"a": "A", "b": "X", "cost": 1}]}"#;
    assert_eq!(
        Topology::from_json(unknown_node).unwrap_err(),
        ConfigError::UnknownNode("X".to_string())
    );

    let unknown_link = r#"{
        "nodes": ["A", "B", "C"],
        "links": [{"a": "A", "b": "B", "cost": 1}],
        "changes": [{"time": 10, "a": "A", "b": "C", "change": "down"}]
    }"#;
    assert_eq!(
        Topology::from_json(unknown_link).unwrap_err(),
        ConfigError::UnknownLink(10.0, "A".to_string(), "C".to_string())
    );

    let negative_time = r#"{
        "nodes": ["A", "B"],
        "links": [{"a": "A", "b": "B", "cost": 1}],
        "changes": [{"time": -1, "a": "A", "b": "B", "change": "up"}]
    }"#;
    assert_eq!(
        Topology::from_json(negative_time).unwrap_err(),
        ConfigError::InvalidTime(-1.0)
    );

    assert!(matches!(
        Topology::from_json("{\"nodes\": 3}"),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        Topology::from_file("/this/file/does/not/exist.json"),
        Err(ConfigError::Io(_))
    ));
}
