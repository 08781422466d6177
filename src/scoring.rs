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

//! # Scoring
//!
//! Map the verdicts of all runs to points. Each test case has a [`Rubric`]; points are summed per
//! algorithm variant, and the final grade is the best variant total. If every variant reaches the
//! maximum, [`PERFECT_BONUS`] is added on top.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::report::{RunResult, Verdict};

/// Bonus points awarded if every variant scores full points on every test case.
pub const PERFECT_BONUS: u32 = 10;

/// Points awarded for a single test case.
///
/// ```
/// use routegrade::{report::Verdict, scoring::Rubric};
///
/// let rubric: Rubric = serde_json::from_str(r#"{"full": 5, "partial": {"1": 3, "2": 1}}"#).unwrap();
/// assert_eq!(rubric.points(&Verdict::Pass), 5);
/// assert_eq!(rubric.points(&Verdict::CorrectnessMismatch { incorrect: 2 }), 1);
/// assert_eq!(rubric.points(&Verdict::CorrectnessMismatch { incorrect: 3 }), 0);
/// assert_eq!(rubric.points(&Verdict::ForwardingLoop), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rubric {
    /// Points if all routes are correct.
    pub full: u32,
    /// Points for the exact number of incorrect routes in the final phase.
    pub partial: BTreeMap<usize, u32>,
}

impl Default for Rubric {
    fn default() -> Self {
        Self {
            full: 1,
            partial: BTreeMap::new(),
        }
    }
}

impl Rubric {
    /// Points for a run with the given verdict.
    pub fn points(&self, verdict: &Verdict) -> u32 {
        match verdict {
            Verdict::Pass => self.full,
            Verdict::CorrectnessMismatch { incorrect } => {
                self.partial.get(incorrect).copied().unwrap_or(0)
            }
            Verdict::ForwardingLoop
            | Verdict::NonConvergence
            | Verdict::ConvergenceFailure { .. }
            | Verdict::ConfigError(_)
            | Verdict::InternalError(_) => 0,
        }
    }
}

/// Points of a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseGrade {
    /// Name of the test case
    pub case: String,
    /// Name of the variant
    pub variant: String,
    /// Awarded points
    pub points: u32,
    /// Maximum points of the test case
    pub max: u32,
}

/// The grade of an entire suite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeSheet {
    /// Points of every run
    pub cases: Vec<CaseGrade>,
    /// Sum of the points for each variant
    pub variant_totals: BTreeMap<String, u32>,
    /// Maximum points a single variant can get
    pub max_per_variant: u32,
    /// Bonus points
    pub bonus: u32,
    /// Final grade: the best variant total plus the bonus
    pub total: u32,
}

/// Grade all runs. `rubrics` maps the name of a test case to its rubric; cases without a rubric
/// use [`Rubric::default`].
pub fn grade(results: &[RunResult], rubrics: &BTreeMap<String, Rubric>) -> GradeSheet {
    let default = Rubric::default();
    let rubric = |case: &str| rubrics.get(case).unwrap_or(&default);

    let cases: Vec<CaseGrade> = results
        .iter()
        .map(|r| {
            let rubric = rubric(&r.case);
            CaseGrade {
                case: r.case.clone(),
                variant: r.variant.clone(),
                points: rubric.points(&r.verdict),
                max: rubric.full,
            }
        })
        .collect();

    let mut variant_totals: BTreeMap<String, u32> = BTreeMap::new();
    for c in cases.iter() {
        *variant_totals.entry(c.variant.clone()).or_default() += c.points;
    }

    let case_names: BTreeSet<&str> = results.iter().map(|r| r.case.as_str()).collect();
    let max_per_variant: u32 = case_names.iter().map(|c| rubric(c).full).sum();

    let best = variant_totals.values().copied().max().unwrap_or(0);
    let all_perfect = !variant_totals.is_empty()
        && max_per_variant > 0
        && cases.iter().all(|c| c.points == c.max)
        && variant_totals.values().all(|t| *t == max_per_variant);
    let bonus = if all_perfect { PERFECT_BONUS } else { 0 };

    GradeSheet {
        cases,
        variant_totals,
        max_per_variant,
        bonus,
        total: best + bonus,
    }
}
