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

//! # Run reports
//!
//! A [`RunResult`] is the outcome of running one test case with one algorithm variant. It refers to
//! nodes by their names, such that it can be written to a JSON report and printed as a table.

use std::{collections::BTreeMap, fmt, fs::OpenOptions, io::Write, path::Path};

use itertools::Itertools;
use routesim::{formatter::NetworkFormatter, prelude::*, record::ExhaustReason};
use serde::{Deserialize, Serialize};

use crate::{
    checker::{CheckReport, ProbeSummary},
    scoring::GradeSheet,
    GradeError,
};

/// Verdict of a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// All routes of all phases are correct.
    Pass,
    /// Some routes of the final phase are incorrect.
    CorrectnessMismatch {
        /// Number of incorrect routes
        incorrect: usize,
    },
    /// A forwarding loop was observed in some phase.
    ForwardingLoop,
    /// The simulation did not converge within its budget.
    NonConvergence,
    /// Some routes were incorrect when the network became quiescent before a topology change.
    ConvergenceFailure {
        /// Index of the first phase with incorrect routes
        phase: usize,
    },
    /// The test case is invalid.
    ConfigError(String),
    /// The simulation could not be executed.
    InternalError(String),
}

impl Verdict {
    /// Returns `true` if the run passed.
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    /// Derive the verdict from the outcome of a simulation and its check report.
    pub fn from_check(outcome: &SimOutcome, check: &CheckReport) -> Self {
        if outcome.exhausted.is_some() {
            return Verdict::NonConvergence;
        }
        if check.has_loops() {
            return Verdict::ForwardingLoop;
        }
        if let Some(p) = check.first_failed_intermediate() {
            return Verdict::ConvergenceFailure { phase: p.index };
        }
        match check.final_phase() {
            Some(p) if !p.is_correct() => Verdict::CorrectnessMismatch {
                incorrect: p.incorrect(),
            },
            Some(_) => Verdict::Pass,
            None => Verdict::NonConvergence,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "pass"),
            Verdict::CorrectnessMismatch { incorrect } => {
                write!(f, "{incorrect} incorrect routes")
            }
            Verdict::ForwardingLoop => write!(f, "forwarding loop"),
            Verdict::NonConvergence => write!(f, "did not converge"),
            Verdict::ConvergenceFailure { phase } => {
                write!(f, "incorrect routes in phase {phase}")
            }
            Verdict::ConfigError(e) => write!(f, "invalid test case: {e}"),
            Verdict::InternalError(e) => write!(f, "error: {e}"),
        }
    }
}

/// Summary of a single phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    /// Index of the phase
    pub index: usize,
    /// The change that started the phase
    pub change: Option<String>,
    /// Time when the phase started
    pub start: SimTime,
    /// Whether the change was applied later than scheduled
    pub deferred: bool,
    /// Time from the start of the phase until the last forwarding change
    pub convergence_time: SimTime,
    /// Whether the network became quiescent
    pub quiescent: bool,
    /// Number of forwarding entries that changed
    pub fw_changes: usize,
    /// Number of incorrect routes
    pub incorrect: usize,
    /// Description of all incorrect routes
    pub failures: Vec<String>,
}

/// Summary of the probe traffic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    /// Delivered probes
    pub delivered: usize,
    /// Probes whose TTL expired
    pub looped: usize,
    /// Dropped probes
    pub dropped: usize,
    /// Probes delivered over a more expensive path than necessary
    pub suboptimal: Vec<String>,
}

impl ProbeReport {
    fn new(summary: &ProbeSummary, topo: &Topology) -> Self {
        Self {
            delivered: summary.delivered,
            looped: summary.looped,
            dropped: summary.dropped,
            suboptimal: summary
                .suboptimal
                .iter()
                .map(|(s, d, cost, optimal)| {
                    format!(
                        "{} -> {}: cost {cost} (optimal {optimal})",
                        s.fmt(topo),
                        d.fmt(topo)
                    )
                })
                .collect(),
        }
    }
}

/// Result of running a single test case with a single algorithm variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Name of the test case
    pub case: String,
    /// Name of the algorithm variant
    pub variant: String,
    /// The verdict
    pub verdict: Verdict,
    /// Largest convergence time of all phases
    pub convergence_time: Option<SimTime>,
    /// Why the simulation was aborted
    pub exhausted: Option<ExhaustReason>,
    /// Summary of each phase
    pub phases: Vec<PhaseReport>,
    /// Faulted nodes, with the reason
    pub faults: BTreeMap<String, String>,
    /// Summary of the probe traffic
    pub probes: Option<ProbeReport>,
    /// Number of processed events
    pub events: usize,
    /// Real time spent on the run, in seconds
    pub wall_time: f64,
}

impl RunResult {
    /// Build the result of a simulation that has finished, or was aborted.
    pub fn new(
        case: impl Into<String>,
        variant: impl Into<String>,
        topo: &Topology,
        outcome: &SimOutcome,
        check: &CheckReport,
        wall_time: f64,
    ) -> Self {
        let phases = outcome
            .phases
            .iter()
            .zip(check.phases.iter())
            .map(|(p, c)| PhaseReport {
                index: p.index,
                change: p.change.map(|a| a.change.fmt(topo)),
                start: p.start,
                deferred: p.change.map(|a| a.deferred()).unwrap_or(false),
                convergence_time: p.convergence_time(),
                quiescent: p.quiescent(),
                fw_changes: p.fw_changes,
                incorrect: c.incorrect(),
                failures: c.failures.iter().map(|f| f.fmt(topo)).collect(),
            })
            .collect();

        Self {
            case: case.into(),
            variant: variant.into(),
            verdict: Verdict::from_check(outcome, check),
            convergence_time: Some(outcome.max_convergence_time()),
            exhausted: outcome.exhausted,
            phases,
            faults: outcome
                .faults
                .iter()
                .map(|(n, f)| (n.fmt(topo).to_string(), f.to_string()))
                .collect(),
            probes: Some(ProbeReport::new(&check.probes, topo)),
            events: outcome.stats.events,
            wall_time,
        }
    }

    /// Build the result of a run that did not produce any outcome.
    pub fn failed(
        case: impl Into<String>,
        variant: impl Into<String>,
        verdict: Verdict,
        wall_time: f64,
    ) -> Self {
        Self {
            case: case.into(),
            variant: variant.into(),
            verdict,
            convergence_time: None,
            exhausted: None,
            phases: Vec::new(),
            faults: BTreeMap::new(),
            probes: None,
            events: 0,
            wall_time,
        }
    }
}

/// All results of a suite, together with the grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Results of all runs
    pub runs: Vec<RunResult>,
    /// The grade
    pub grade: GradeSheet,
}

impl SuiteReport {
    /// Write the report as JSON. An existing file is overwritten.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), GradeError> {
        let s = serde_json::to_string_pretty(self)?;
        let mut f = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(path)?;
        writeln!(f, "{s}")?;
        Ok(())
    }

    /// Render the human-readable summary table.
    pub fn summary_table(&self) -> String {
        let case_width = self
            .runs
            .iter()
            .map(|r| r.case.len())
            .chain(std::iter::once(4))
            .max()
            .unwrap_or(4);
        let variant_width = self
            .runs
            .iter()
            .map(|r| r.variant.len())
            .chain(std::iter::once(7))
            .max()
            .unwrap_or(7);

        let mut lines = vec![format!(
            "{:case_width$}  {:variant_width$}  {:>6}  {:>11}  verdict",
            "case", "variant", "points", "convergence"
        )];
        for r in self.runs.iter() {
            let points = self
                .grade
                .cases
                .iter()
                .find(|g| g.case == r.case && g.variant == r.variant)
                .map(|g| format!("{}/{}", g.points, g.max))
                .unwrap_or_default();
            let convergence = r
                .convergence_time
                .map(|t| format!("{t:.1}"))
                .unwrap_or_else(|| String::from("-"));
            lines.push(format!(
                "{:case_width$}  {:variant_width$}  {:>6}  {:>11}  {}",
                r.case, r.variant, points, convergence, r.verdict
            ));
        }
        lines.push(String::new());
        for (variant, total) in self.grade.variant_totals.iter() {
            lines.push(format!(
                "{variant}: {total}/{}",
                self.grade.max_per_variant
            ));
        }
        if self.grade.bonus > 0 {
            lines.push(format!("bonus: {}", self.grade.bonus));
        }
        lines.push(format!("grade: {}", self.grade.total));
        lines.into_iter().join("\n")
    }
}
