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

//! # Suite runner
//!
//! Runs every [`TestCase`] with every [`Variant`]. Runs are independent, and are executed in
//! parallel on a rayon thread pool. Every run executes on its own worker thread, guarded by a
//! wall-clock watchdog. If the watchdog fires, the run is cancelled and reported as
//! [`Verdict::NonConvergence`].

use std::{
    collections::BTreeMap,
    fmt,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    thread,
    time::{Duration, Instant},
};

use itertools::{iproduct, Itertools};
use log::*;
use rayon::prelude::*;
use routesim::{prelude::*, topology::TopologyFile};
use serde::Serialize;
use serde_json::Value;

use crate::{
    checker::check,
    report::{RunResult, Verdict},
    scoring::Rubric,
    GradeError,
};

/// Default wall-clock limit of a single run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Content of a scenario file: a topology, with an optional rubric and optional simulation
/// parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioFile {
    /// The topology and its changes
    #[serde(flatten)]
    pub topology: TopologyFile,
    /// Points awarded for this scenario
    pub rubric: Option<Rubric>,
    /// Parameters of the simulation
    pub simulation: Option<SimConfig>,
}

impl ScenarioFile {
    /// Parse a scenario file. The keys `rubric` and `simulation` are optional, all other keys
    /// describe the topology.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut value: Value = serde_json::from_str(json)?;
        let mut take = |key: &str| value.as_object_mut().and_then(|o| o.remove(key));
        let rubric: Option<Rubric> = take("rubric").map(serde_json::from_value).transpose()?;
        let simulation: Option<SimConfig> = take("simulation").map(serde_json::from_value).transpose()?;
        let topology: TopologyFile = serde_json::from_value(value)?;
        Ok(Self {
            topology,
            rubric,
            simulation,
        })
    }
}

/// A single test case.
#[derive(Debug, Clone)]
pub struct TestCase {
    /// Name of the test case
    pub name: String,
    /// The simulated topology
    pub topology: Topology,
    /// Points awarded for this case
    pub rubric: Rubric,
    /// Parameters of the simulation
    pub config: SimConfig,
}

impl TestCase {
    /// Create a test case with the default rubric and the default parameters.
    pub fn new(topology: Topology) -> Self {
        Self {
            name: topology.name().to_string(),
            topology,
            rubric: Rubric::default(),
            config: SimConfig::default(),
        }
    }

    /// Parse a scenario file. If the topology has no name, `fallback_name` is used.
    pub fn from_json(json: &str, fallback_name: &str) -> Result<Self, ConfigError> {
        let mut file = ScenarioFile::from_json(json)?;
        if file.topology.name.is_empty() {
            file.topology.name = fallback_name.to_string();
        }
        let topology = Topology::from_spec(&file.topology)?;
        let config = file.simulation.unwrap_or_default();
        config.validate_for(&topology)?;
        Ok(Self {
            name: topology.name().to_string(),
            topology,
            rubric: file.rubric.unwrap_or_default(),
            config,
        })
    }

}

/// A scenario file that cannot be loaded. It is still graded (with zero points), such that the
/// maximum score does not depend on whether the scenarios are valid.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidCase {
    /// Name of the scenario
    pub name: String,
    /// Points the scenario would award
    pub rubric: Rubric,
    /// Why the scenario cannot be loaded
    pub error: ConfigError,
}

impl InvalidCase {
    /// Recover the name and the rubric from a scenario that failed to load. Falls back to
    /// `fallback_name` and the default rubric if they cannot be read.
    pub fn from_json(json: &str, fallback_name: &str, error: ConfigError) -> Self {
        let value: Option<Value> = serde_json::from_str(json).ok();
        let name = value
            .as_ref()
            .and_then(|v| v.get("name"))
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .unwrap_or(fallback_name)
            .to_string();
        let rubric = match value.as_ref().and_then(|v| v.get("rubric")) {
            Some(r) => serde_json::from_value(r.clone()).unwrap_or_else(|e| {
                warn!("{name}: cannot read the rubric ({e}), using the default");
                Rubric::default()
            }),
            None => Rubric::default(),
        };
        Self {
            name,
            rubric,
            error,
        }
    }

    /// A failed result for every variant.
    pub fn results(&self, variants: &[Variant]) -> Vec<RunResult> {
        variants
            .iter()
            .map(|v| {
                RunResult::failed(
                    &self.name,
                    v.name(),
                    Verdict::ConfigError(self.error.to_string()),
                    0.0,
                )
            })
            .collect()
    }
}

/// Load all scenario files. Scenarios that cannot be loaded do not prevent the others from
/// loading, and are returned separately.
pub fn load_scenarios(files: &[PathBuf]) -> (Vec<TestCase>, Vec<InvalidCase>) {
    let mut cases = Vec::new();
    let mut invalid = Vec::new();
    for path in files {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) => {
                error!("Cannot read {}: {e}", path.display());
                invalid.push(InvalidCase {
                    name: stem,
                    rubric: Rubric::default(),
                    error: e.into(),
                });
                continue;
            }
        };
        match TestCase::from_json(&json, &stem) {
            Ok(case) => cases.push(case),
            Err(e) => {
                error!("Cannot load {}: {e}", path.display());
                invalid.push(InvalidCase::from_json(&json, &stem, e));
            }
        }
    }
    (cases, invalid)
}

/// Collect all scenario files. Directories are searched (non-recursively) for `.json` files.
pub fn collect_scenarios(paths: &[PathBuf]) -> Result<Vec<PathBuf>, GradeError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries = std::fs::read_dir(path)?
                .map(|e| e.map(|e| e.path()))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
                .collect_vec();
            entries.sort();
            files.extend(entries);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

/// Function that creates the algorithm of a node.
pub type AlgorithmFactory =
    Arc<dyn Fn(NodeId, &Topology) -> Box<dyn RoutingAlgorithm> + Send + Sync>;

/// A variant of the algorithm under test.
#[derive(Clone)]
pub struct Variant {
    name: String,
    factory: AlgorithmFactory,
}

impl Variant {
    /// Create a new variant.
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(NodeId, &Topology) -> Box<dyn RoutingAlgorithm> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
        }
    }

    /// The variant that runs one of the reference algorithms.
    pub fn reference(kind: AlgorithmKind) -> Self {
        Self::new(kind.short_name(), move |n, topo| kind.build(n, topo))
    }

    /// Name of the variant.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variant").field("name", &self.name).finish()
    }
}

/// Options that apply to all runs of a suite.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Wall-clock limit of a single run.
    pub timeout: Duration,
    /// Overwrite the quiescence window of all test cases.
    pub quiescence_window: Option<SimTime>,
    /// Number of runs executed in parallel. If `None`, use the number of CPUs.
    pub threads: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            quiescence_window: None,
            threads: None,
        }
    }
}

/// Run a single test case with a single variant.
pub fn run_case(case: &TestCase, variant: &Variant, options: &RunOptions) -> RunResult {
    let start = Instant::now();
    let elapsed = || start.elapsed().as_secs_f64();

    let mut config = case.config.clone();
    if let Some(window) = options.quiescence_window {
        config.quiescence_window = window;
    }
    if let Err(e) = config.validate_for(&case.topology) {
        warn!("{} [{}]: {}", case.name, variant.name, e);
        return RunResult::failed(
            &case.name,
            &variant.name,
            Verdict::ConfigError(e.to_string()),
            elapsed(),
        );
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();
    let topo = case.topology.clone();
    let factory = variant.factory.clone();
    let flag = cancel.clone();
    let timeout = options.timeout;

    let spawned = thread::Builder::new()
        .name(format!("{}-{}", case.name, variant.name))
        .spawn(move || {
            let factory_topo = topo.clone();
            let result = Network::new(topo, config, |n| factory(n, &factory_topo)).and_then(
                |mut net| {
                    net.set_cancel_flag(flag);
                    net.set_wall_clock_limit(timeout);
                    net.run()
                },
            );
            // the receiver is gone if the watchdog already fired.
            let _ = tx.send(result);
        });
    if let Err(e) = spawned {
        return RunResult::failed(
            &case.name,
            &variant.name,
            Verdict::InternalError(e.to_string()),
            elapsed(),
        );
    }

    // give the run a little more time than its own limit to finish cleanly.
    let result = match rx.recv_timeout(timeout + timeout / 10) {
        Ok(Ok(outcome)) => {
            let report = check(&case.topology, &outcome);
            RunResult::new(
                &case.name,
                &variant.name,
                &case.topology,
                &outcome,
                &report,
                elapsed(),
            )
        }
        Ok(Err(NetworkError::ConfigError(e))) => RunResult::failed(
            &case.name,
            &variant.name,
            Verdict::ConfigError(e.to_string()),
            elapsed(),
        ),
        Ok(Err(e)) => RunResult::failed(
            &case.name,
            &variant.name,
            Verdict::InternalError(e.to_string()),
            elapsed(),
        ),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            warn!(
                "{} [{}]: no result after {:?}. Cancel the run.",
                case.name, variant.name, timeout
            );
            cancel.store(true, Ordering::Relaxed);
            RunResult::failed(
                &case.name,
                &variant.name,
                Verdict::NonConvergence,
                elapsed(),
            )
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => RunResult::failed(
            &case.name,
            &variant.name,
            Verdict::InternalError(String::from("the simulation thread panicked")),
            elapsed(),
        ),
    };

    info!(
        "{} [{}]: {} ({:.2}s)",
        case.name, variant.name, result.verdict, result.wall_time
    );
    result
}

/// Run all test cases with all variants. The results are ordered by test case first, and by
/// variant second.
pub fn run_suite(
    cases: &[TestCase],
    variants: &[Variant],
    options: &RunOptions,
) -> Result<Vec<RunResult>, GradeError> {
    let threads = options.threads.unwrap_or_else(num_cpus::get);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()?;

    let jobs = iproduct!(cases.iter(), variants.iter()).collect_vec();
    debug!("Running {} jobs on {} threads", jobs.len(), threads);

    let mut results: Vec<RunResult> = Vec::new();
    pool.install(|| {
        jobs.into_par_iter()
            .map(|(case, variant)| run_case(case, variant, options))
            .collect_into_vec(&mut results)
    });
    Ok(results)
}

/// The rubric of every test case.
pub fn rubrics(cases: &[TestCase], invalid: &[InvalidCase]) -> BTreeMap<String, Rubric> {
    invalid
        .iter()
        .map(|c| (c.name.clone(), c.rubric.clone()))
        .chain(cases.iter().map(|c| (c.name.clone(), c.rubric.clone())))
        .collect()
}
