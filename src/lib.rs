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

//! # RouteGrade: Grading harness for pluggable routing protocols
//!
//! This crate evaluates implementations of the [`routesim::router::RoutingAlgorithm`] trait on a
//! set of test cases. Each test case is a topology with a timed schedule of link changes. The
//! network is simulated with [`routesim`], and the forwarding state captured at every quiescence
//! checkpoint is compared against the true shortest paths.
//!
//! ## Structure
//! - The module [`runner`] loads the test cases ([`runner::TestCase`]) and runs them for every
//!   algorithm variant ([`runner::Variant`]) in parallel, each run guarded by a wall-clock
//!   watchdog.
//! - The module [`checker`] recomputes the shortest paths of every phase and reports all incorrect
//!   routes and forwarding loops.
//! - The module [`report`] turns the outcome of a run into a [`report::Verdict`] and a
//!   [`report::RunResult`] that can be written to JSON.
//! - The module [`scoring`] maps the verdicts to points using the [`scoring::Rubric`] of each test
//!   case.
//!
//! ## Example
//!
//! ```
//! use routegrade::{
//!     report::Verdict,
//!     runner::{run_case, RunOptions, TestCase, Variant},
//! };
//! use routesim::prelude::*;
//!
//! let case = TestCase::from_json(
//!     r#"{
//!         "name": "line",
//!         "nodes": ["A", "B", "C"],
//!         "links": [{"a": "A", "b": "B", "cost": 1}, {"a": "B", "b": "C", "cost": 2}],
//!         "changes": [{"time": 200, "a": "A", "b": "B", "change": {"cost": 4}}]
//!     }"#,
//!     "line",
//! )
//! .unwrap();
//! let variant = Variant::reference(AlgorithmKind::LinkState);
//! let result = run_case(&case, &variant, &RunOptions::default());
//! assert_eq!(result.verdict, Verdict::Pass);
//! assert_eq!(result.phases.len(), 2);
//! ```

#![deny(missing_docs, missing_debug_implementations, rust_2018_idioms)]

use thiserror::Error;

pub mod checker;
pub mod report;
pub mod runner;
pub mod scoring;
#[cfg(test)]
mod test;

pub use report::{RunResult, Verdict};
pub use runner::{run_case, run_suite, TestCase, Variant};
pub use scoring::{grade, GradeSheet, Rubric};

/// Error of the grading harness. Errors of a single run never abort the suite; they are reported
/// as a [`Verdict`] instead.
#[derive(Debug, Error)]
pub enum GradeError {
    /// A test case is invalid.
    #[error("{0}")]
    Config(#[from] routesim::types::ConfigError),
    /// Cannot read or write a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Cannot serialize the report.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Cannot create the thread pool.
    #[error("Cannot create the thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
