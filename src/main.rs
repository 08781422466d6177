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

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use log::*;

use routegrade::{
    grade,
    report::SuiteReport,
    runner::{collect_scenarios, load_scenarios, rubrics, run_suite, RunOptions, Variant},
};
use routesim::algorithms::AlgorithmKind;

/// Grade routing algorithms on a set of scenario files.
#[derive(Debug, Parser)]
struct Cli {
    /// Scenario files, or directories containing scenario files.
    #[clap(required = true)]
    scenarios: Vec<PathBuf>,
    /// Algorithm variants to run (dv, ls). Runs all variants if not specified.
    #[clap(short = 'a', long = "variant", value_delimiter = ',')]
    variants: Vec<AlgorithmKind>,
    /// Number of runs executed in parallel. If not specified, it will use all available workers.
    #[clap(short, long)]
    threads: Option<usize>,
    /// Wall-clock limit of a single run, in seconds.
    #[clap(long, default_value = "60")]
    timeout: u64,
    /// Write the full report as JSON to this file.
    #[clap(long)]
    json: Option<PathBuf>,
    /// Overwrite the quiescence window of all scenarios.
    #[clap(short, long)]
    quiescence: Option<f64>,
    /// Print every incorrect route.
    #[clap(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_timed();

    let args = Cli::parse();

    let variants: Vec<Variant> = if args.variants.is_empty() {
        AlgorithmKind::ALL.iter().map(|k| Variant::reference(*k)).collect()
    } else {
        args.variants.iter().map(|k| Variant::reference(*k)).collect()
    };

    // load all scenarios. An invalid scenario does not prevent the others from running.
    let (cases, invalid) = load_scenarios(&collect_scenarios(&args.scenarios)?);
    info!("Loaded {} scenarios", cases.len());

    let options = RunOptions {
        timeout: Duration::from_secs(args.timeout),
        quiescence_window: args.quiescence,
        threads: args.threads,
    };
    let mut runs = run_suite(&cases, &variants, &options)?;
    runs.extend(invalid.iter().flat_map(|c| c.results(&variants)));

    let grade = grade(&runs, &rubrics(&cases, &invalid));
    let report = SuiteReport { runs, grade };

    if args.verbose {
        for run in report.runs.iter().filter(|r| !r.verdict.is_pass()) {
            println!("{} [{}]: {}", run.case, run.variant, run.verdict);
            for phase in run.phases.iter().filter(|p| p.incorrect > 0) {
                println!("  phase {}:", phase.index);
                for failure in phase.failures.iter() {
                    println!("    {failure}");
                }
            }
            for (node, fault) in run.faults.iter() {
                println!("  {node} faulted: {fault}");
            }
        }
        println!();
    }

    println!("{}", report.summary_table());

    if let Some(path) = args.json {
        report.write_json(&path)?;
        info!("Report written to {}", path.display());
    }

    Ok(())
}
