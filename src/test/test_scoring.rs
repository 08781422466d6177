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

use std::collections::BTreeMap;

use maplit::btreemap;
use pretty_assertions_sorted::assert_eq;
use test_log::test;

use crate::{
    report::{RunResult, Verdict},
    scoring::{grade, Rubric, PERFECT_BONUS},
};

fn run(case: &str, variant: &str, verdict: Verdict) -> RunResult {
    RunResult::failed(case, variant, verdict, 0.0)
}

fn rubrics() -> BTreeMap<String, Rubric> {
    btreemap! {
        "line".to_string() => Rubric { full: 5, partial: btreemap! { 1 => 3, 2 => 1 } },
        "square".to_string() => Rubric { full: 10, partial: BTreeMap::new() },
    }
}

#[test]
fn rubric_points() {
    let rubrics = rubrics();
    let rubric = &rubrics["line"];
    assert_eq!(rubric.points(&Verdict::Pass), 5);
    assert_eq!(
        rubric.points(&Verdict::CorrectnessMismatch { incorrect: 1 }),
        3
    );
    assert_eq!(
        rubric.points(&Verdict::CorrectnessMismatch { incorrect: 2 }),
        1
    );
    assert_eq!(
        rubric.points(&Verdict::CorrectnessMismatch { incorrect: 7 }),
        0
    );
    assert_eq!(rubric.points(&Verdict::NonConvergence), 0);
    assert_eq!(rubric.points(&Verdict::ForwardingLoop), 0);
    assert_eq!(rubric.points(&Verdict::ConvergenceFailure { phase: 1 }), 0);
    assert_eq!(rubric.points(&Verdict::ConfigError(String::new())), 0);
}

#[test]
fn all_perfect_gets_bonus() {
    let results = vec![
        run("line", "DV", Verdict::Pass),
        run("line", "LS", Verdict::Pass),
        run("square", "DV", Verdict::Pass),
        run("square", "LS", Verdict::Pass),
    ];
    let sheet = grade(&results, &rubrics());
    assert_eq!(sheet.max_per_variant, 15);
    assert_eq!(
        sheet.variant_totals,
        btreemap! {"DV".to_string() => 15, "LS".to_string() => 15}
    );
    assert_eq!(sheet.bonus, PERFECT_BONUS);
    assert_eq!(sheet.total, 15 + PERFECT_BONUS);
}

#[test]
fn best_variant_counts() {
    let results = vec![
        run("line", "DV", Verdict::CorrectnessMismatch { incorrect: 1 }),
        run("line", "LS", Verdict::Pass),
        run("square", "DV", Verdict::Pass),
        run("square", "LS", Verdict::ForwardingLoop),
    ];
    let sheet = grade(&results, &rubrics());
    assert_eq!(
        sheet.variant_totals,
        btreemap! {"DV".to_string() => 13, "LS".to_string() => 5}
    );
    assert_eq!(sheet.bonus, 0);
    assert_eq!(sheet.total, 13);
    assert_eq!(sheet.cases[0].points, 3);
    assert_eq!(sheet.cases[0].max, 5);
}

#[test]
fn missing_rubric_uses_default() {
    let results = vec![
        run("unknown", "DV", Verdict::Pass),
        run("unknown", "LS", Verdict::NonConvergence),
    ];
    let sheet = grade(&results, &BTreeMap::new());
    assert_eq!(sheet.max_per_variant, Rubric::default().full);
    assert_eq!(sheet.total, Rubric::default().full);
    assert_eq!(sheet.bonus, 0);
}
