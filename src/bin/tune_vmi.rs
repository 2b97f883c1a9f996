// SPDX-License-Identifier: AGPL-3.0-only

//! Operator entry point: tune VMI lens voltages against SIMION.
//!
//! Optionally renders the electrode geometry and builds/refines the
//! potential arrays, then runs the Nelder-Mead voltage search and writes a
//! JSON run report. Every search iteration triggers at least one full
//! external simulation; budget accordingly.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vmi_tuner::error::VmiError;
use vmi_tuner::focus::FocusObjective;
use vmi_tuner::geometry;
use vmi_tuner::instrument::InstrumentSpec;
use vmi_tuner::optimize::{optimize_voltages, FailurePolicy, FocusReport, SearchConfig};
use vmi_tuner::simion::SimionCli;

#[derive(Debug, Parser)]
#[command(name = "tune_vmi", about = "SIMION-driven VMI lens voltage tuner")]
struct Args {
    /// Workspace stem (`{workspace}.iob`, `{workspace}.pa0`).
    #[arg(long, default_value = "test")]
    workspace: String,

    /// Recording configuration stem (`{recording}.rec`).
    #[arg(long, default_value = "data")]
    recording: String,

    /// Flight-data output stem (`{data}.txt`).
    #[arg(long, default_value = "data")]
    data: String,

    /// Initial voltage ladder guess, comma separated.
    #[arg(long, value_delimiter = ',', default_values_t = [3000.0, 100.0])]
    initial: Vec<f64>,

    /// Maximum search iterations.
    #[arg(long, default_value_t = 200)]
    max_iters: usize,

    /// Stop early once the penalty reaches this value.
    #[arg(long)]
    target_penalty: Option<f64>,

    /// Mid-search failure handling: abort | penalize.
    #[arg(long, default_value = "abort")]
    on_failure: FailurePolicy,

    /// SIMION executable.
    #[arg(long, default_value = "simion")]
    simion: PathBuf,

    /// Directory holding all workspace artifacts.
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,

    /// Render the geometry and build/refine potential arrays first.
    #[arg(long)]
    build_geometry: bool,

    /// Instrument spec JSON (defaults to the reference five-electrode stack).
    #[arg(long)]
    instrument: Option<PathBuf>,

    /// Where to write the JSON run report.
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("tune_vmi: {e}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), VmiError> {
    println!("═══════════════════════════════════════════════════");
    println!("  VMI voltage tuner — workspace `{}`", args.workspace);
    println!("═══════════════════════════════════════════════════");
    println!();

    let sim = SimionCli::new(&args.simion, &args.work_dir);

    if args.build_geometry {
        let spec = match &args.instrument {
            Some(path) => InstrumentSpec::from_json(path)?,
            None => InstrumentSpec::default(),
        };
        println!(
            "  Geometry: {} electrodes, {} x {} workspace",
            spec.n_electrodes(),
            spec.total_length(),
            spec.radius
        );
        geometry::write_gem(&spec, &args.work_dir.join(&args.workspace))?;
        sim.build_arrays(&args.workspace)?;
        println!("  Potential arrays built and refined");
        println!();
    }

    let objective = FocusObjective::new(
        &sim,
        &args.work_dir,
        &args.workspace,
        &args.recording,
        &args.data,
    );
    let config = SearchConfig {
        max_iters: args.max_iters,
        target_penalty: args.target_penalty,
        failure_policy: args.on_failure,
    };

    println!(
        "  Search: initial ladder {:?}, {} iterations max",
        args.initial, args.max_iters
    );
    println!();

    let result = optimize_voltages(&objective, &args.initial, &config)?;

    println!();
    println!("  Best ladder:   {:?}", result.voltages);
    println!("  Best penalty:  {:.6}", result.penalty);
    println!("  Iterations:    {}", result.iterations);

    let report = FocusReport::new(&args.workspace, &args.initial, result);
    let report_path = args
        .report
        .clone()
        .unwrap_or_else(|| args.work_dir.join(format!("{}_report.json", args.data)));
    report.write_json(&report_path)?;
    println!("  Report:        {}", report_path.display());

    Ok(())
}
