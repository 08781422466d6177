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
    event::{Event, Scheduler},
    types::{NodeId, SchedulerError},
};

fn timer(n: u32) -> Event {
    Event::Timer(NodeId::new(n as usize))
}

#[test]
fn pops_in_time_order() {
    let mut s = Scheduler::new();
    s.schedule(3.0, timer(0)).unwrap();
    s.schedule(1.0, timer(1)).unwrap();
    s.schedule(2.0, timer(2)).unwrap();
    assert_eq!(s.len(), 3);

    let order: Vec<(f64, Event)> = std::iter::from_fn(|| s.pop_next().ok())
        .map(|e| (e.time, e.event))
        .collect();
    assert_eq!(
        order,
        vec![(1.0, timer(1)), (2.0, timer(2)), (3.0, timer(0))]
    );
    assert!(s.is_empty());
    assert_eq!(s.now(), 3.0);
}

#[test]
fn ties_pop_in_insertion_order() {
    let mut s = Scheduler::new();
    for n in [4, 2, 7, 1, 0] {
        s.schedule(5.0, timer(n)).unwrap();
    }
    s.schedule(1.0, timer(9)).unwrap();

    let order: Vec<Event> = std::iter::from_fn(|| s.pop_next().ok())
        .map(|e| e.event)
        .collect();
    assert_eq!(
        order,
        vec![timer(9), timer(4), timer(2), timer(7), timer(1), timer(0)]
    );
}

#[test]
fn rejects_the_past() {
    let mut s = Scheduler::new();
    s.schedule(10.0, timer(0)).unwrap();
    s.pop_next().unwrap();
    assert_eq!(
        s.schedule(5.0, timer(0)),
        Err(SchedulerError::InThePast {
            time: 5.0,
            now: 10.0
        })
    );
    // the current time itself is fine.
    assert!(s.schedule(10.0, timer(0)).is_ok());
}

#[test]
fn rejects_invalid_time() {
    let mut s = Scheduler::new();
    assert!(matches!(
        s.schedule(f64::NAN, timer(0)),
        Err(SchedulerError::InvalidTime(_))
    ));
    assert!(matches!(
        s.schedule(f64::INFINITY, timer(0)),
        Err(SchedulerError::InvalidTime(_))
    ));
    assert!(s.is_empty());
}

#[test]
fn empty_queue() {
    let mut s = Scheduler::new();
    assert_eq!(s.pop_next(), Err(SchedulerError::EmptyQueue));
    assert_eq!(s.peek_time(), None);
}

#[test]
fn advance_clock() {
    let mut s = Scheduler::new();
    s.schedule(10.0, timer(0)).unwrap();
    s.advance_to(4.0).unwrap();
    assert_eq!(s.now(), 4.0);
    assert_eq!(
        s.advance_to(11.0),
        Err(SchedulerError::SkipsEvent {
            time: 11.0,
            next: 10.0
        })
    );
    assert_eq!(
        s.advance_to(3.0),
        Err(SchedulerError::InThePast {
            time: 3.0,
            now: 4.0
        })
    );
    s.advance_to(10.0).unwrap();
    assert_eq!(s.pop_next().unwrap().time, 10.0);
}

#[test]
fn retain_events() {
    let mut s = Scheduler::new();
    s.schedule(1.0, timer(0)).unwrap();
    s.schedule(2.0, timer(1)).unwrap();
    s.schedule(3.0, timer(0)).unwrap();
    let removed = s.retain(|e| e != &timer(0));
    assert_eq!(removed, 2);
    assert_eq!(s.len(), 1);
    assert_eq!(s.peek(), Some(&timer(1)));
}
